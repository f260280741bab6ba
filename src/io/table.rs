//! Reading track tables (CSV/TSV metadata sheets) into [`Track`]s.
//!
//! A track table has a header row, one row per track, and a required file
//! column (`fn` by default). The columns `name`, `ext`/`track_type` and
//! `color` are mapped onto [`Track`] fields; every other non-empty cell
//! becomes a metadata entry.

use csv::{Reader, ReaderBuilder};
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::{
    error::TrackHubError,
    formats::TrackFormat,
    io::file::{base_extension, InputFile, OutputFile},
    track::{Metadata, Track},
};

/// The default name of the file reference column.
pub const DEFAULT_FILE_COLUMN: &str = "fn";

/// Columns of the table written by [`write_template`].
pub const TEMPLATE_COLUMNS: [&str; 7] = [
    "fn",
    "name",
    "track_type",
    "color",
    "supertrack",
    "composite",
    "overlay",
];

/// Columns that map onto [`Track`] fields, and so are not metadata.
const RESERVED_COLUMNS: [&str; 5] = ["ext", "track_type", "path", "name", "color"];

/// Build a reader for a track table. Tab-delimited for `.tsv`, `.tab` and
/// `.txt` files (ignoring a `.gz` suffix), comma-delimited otherwise. Gzip
/// input is detected and decompressed.
pub fn build_table_reader(
    filepath: impl Into<PathBuf>,
) -> Result<Reader<Box<dyn Read>>, TrackHubError> {
    let filepath = filepath.into();
    let delimiter = match base_extension(&filepath).as_deref() {
        Some("tsv") | Some("tab") | Some("txt") => b'\t',
        _ => b',',
    };
    let stream: Box<dyn Read> = Box::new(InputFile::new(&filepath).reader()?);
    let reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .comment(Some(b'#'))
        .from_reader(stream);
    Ok(reader)
}

/// Read a track table into tracks, one per row.
///
/// Relative file references are kept as written. Rows with an empty file
/// cell are skipped with a warning.
pub fn read_track_table(
    filepath: impl AsRef<Path>,
    file_column: &str,
) -> Result<Vec<Track>, TrackHubError> {
    let filepath = filepath.as_ref();
    let mut reader = build_table_reader(filepath)?;
    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|header| header.trim().to_string())
        .collect();

    let Some(file_index) = headers.iter().position(|h| h == file_column) else {
        return Err(TrackHubError::MissingFileColumn(
            filepath.to_path_buf(),
            file_column.to_string(),
        ));
    };

    let mut tracks = Vec::new();
    for (line, result) in reader.records().enumerate() {
        let record = result?;
        let file_reference = record.get(file_index).unwrap_or("").trim();
        if file_reference.is_empty() {
            tracing::warn!(
                "row {} of {} has no '{}' value and is skipped",
                line + 1,
                filepath.display(),
                file_column
            );
            continue;
        }

        let mut track = Track::new(file_reference);
        let mut metadata = Metadata::new();
        for (column, cell) in headers.iter().zip(record.iter()) {
            let cell = cell.trim();
            if cell.is_empty() || column == file_column {
                continue;
            }
            match column.as_str() {
                "name" => track.name = Some(cell.to_string()),
                "ext" | "track_type" => track.track_type = Some(TrackFormat::from_alias(cell)),
                "color" => track.color = Some(cell.parse()?),
                other if RESERVED_COLUMNS.contains(&other) => {}
                other => {
                    metadata.insert(other.to_string(), cell.to_string());
                }
            }
        }
        track.metadata = metadata;
        tracks.push(track);
    }

    tracing::info!("read {} tracks from {}", tracks.len(), filepath.display());
    Ok(tracks)
}

/// Write an empty track table (header only) to `filepath`.
pub fn write_template(filepath: impl Into<PathBuf>) -> Result<(), TrackHubError> {
    let writer = OutputFile::new(filepath).writer()?;
    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record(TEMPLATE_COLUMNS)?;
    writer.flush()?;
    Ok(())
}
