//! The metadata table: a flat, row-per-track view of a set of [`Track`]s.
//!
//! Each [`TrackRow`] has a fixed set of well-known columns (`name`, `path`,
//! `file_name`, `ext`) plus an open extension map of metadata columns. Grouping
//! axes are validated against the columns actually present in the table, see
//! [`MetadataTable::missing_columns`].

use indexmap::IndexSet;
use std::path::PathBuf;

use crate::{
    formats::TrackFormat,
    track::{Metadata, Rgb, Track},
    unique_name::UniqueNames,
};

/// Columns every row has, addressable by grouping axes like metadata keys.
pub const WELL_KNOWN_COLUMNS: [&str; 4] = ["name", "path", "file_name", "ext"];

/// A single row of the metadata table.
#[derive(Clone, Debug, PartialEq)]
pub struct TrackRow {
    /// Track display name.
    pub name: String,
    /// The file reference as registered.
    pub file_reference: PathBuf,
    /// The absolute file path.
    pub path: PathBuf,
    /// The file basename, made unique across the table.
    pub file_name: String,
    /// The normalized format tag.
    pub ext: TrackFormat,
    pub metadata: Metadata,
    pub color: Option<Rgb>,
    /// The pre-conversion file, for converted tracks.
    pub original_path: Option<PathBuf>,
}

impl TrackRow {
    /// Look up a column value. Well-known columns shadow metadata keys of the
    /// same name; absent metadata keys are null (`None`).
    pub fn get(&self, column: &str) -> Option<&str> {
        match column {
            "name" => Some(&self.name),
            "path" => self.path.to_str(),
            "file_name" => Some(&self.file_name),
            "ext" => Some(self.ext.as_str()),
            key => self.metadata.get(key).map(|value| value.as_str()),
        }
    }

    /// The values of `columns` for this row, in the given order.
    pub fn values<'a>(&'a self, columns: &[String]) -> Vec<Option<&'a str>> {
        columns.iter().map(|column| self.get(column)).collect()
    }

    /// Whether every one of `columns` is non-null for this row.
    pub fn has_all(&self, columns: &[String]) -> bool {
        columns.iter().all(|column| self.get(column).is_some())
    }
}

/// The table of track rows that the hierarchy compiler works on.
#[derive(Clone, Debug, Default)]
pub struct MetadataTable {
    rows: Vec<TrackRow>,
    columns: IndexSet<String>,
}

impl MetadataTable {
    /// Materialize the table from a set of tracks. Tracks sharing a basename get
    /// an occurrence counter appended to their `file_name`.
    pub fn from_tracks(tracks: &[Track]) -> Self {
        let mut columns: IndexSet<String> =
            WELL_KNOWN_COLUMNS.iter().map(|c| c.to_string()).collect();
        let mut file_names = UniqueNames::new();

        let rows = tracks
            .iter()
            .map(|track| {
                let basename = track
                    .path
                    .file_name()
                    .map(|name| name.to_string_lossy().to_string())
                    .unwrap_or_default();
                columns.extend(track.metadata.keys().cloned());

                TrackRow {
                    name: track.display_name(),
                    file_reference: track.path.clone(),
                    path: std::path::absolute(&track.path).unwrap_or_else(|_| track.path.clone()),
                    file_name: file_names.unique_file_name(&basename),
                    ext: track.format().normalized(),
                    metadata: track.metadata.clone(),
                    color: track.color,
                    original_path: track.original_path.clone(),
                }
            })
            .collect();

        Self { rows, columns }
    }

    pub fn rows(&self) -> &[TrackRow] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> Option<&TrackRow> {
        self.rows.get(index)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// All column names: well-known columns first, then metadata keys in
    /// order of first appearance.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.as_str())
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.contains(column)
    }

    /// The subset of `columns` that no row carries.
    pub fn missing_columns(&self, columns: &[String]) -> Vec<String> {
        columns
            .iter()
            .filter(|column| !self.has_column(column))
            .cloned()
            .collect()
    }
}
