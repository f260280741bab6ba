//! The [`HubBuilder`]: fluent hub configuration, merging, the JSON sidecar,
//! and the build lifecycle.
//!
//! A builder is configured (tracks, extractors, grouping axes, conversion
//! settings) in any order, then built into an output directory:
//!
//!  1. non-native tracks are converted, if conversion is enabled;
//!  2. the builder state is saved as the sidecar, `tracknado_config.json`;
//!  3. metadata extractors run over every track;
//!  4. the metadata table is materialized and compiled into a [`TrackDesign`];
//!  5. the design is handed to the [`HubRenderer`].
//!
//! Building does not modify the builder, so one builder can be built into
//! several output directories. The sidecar holds everything except the
//! extractor functions and the converter/renderer, which the caller
//! re-attaches after [`HubBuilder::from_json`].
//!
//! ```no_run
//! use tracknado::prelude::*;
//!
//! let built = HubBuilder::new()
//!     .add_tracks(["ATAC/CPM/s1.bigWig", "ATAC/CPM/s2.bigWig"], [("assay", "ATAC")])
//!     .with_metadata_extractor(from_parent_dirs(1, vec!["norm".to_string()]))
//!     .group_by(["norm"], false)
//!     .build(&BuildOptions::new("HUB", "hg38", "hub_out"))?;
//! println!("{} composites", built.design.composites().len());
//! # Ok::<(), TrackHubError>(())
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::{
    convert::{converted_path, Converter, UcscConverter},
    design::{GroupingAxes, TrackDesign},
    error::TrackHubError,
    extractors::MetadataExtractor,
    io::{read_track_table, InputFile, OutputFile},
    palette::DEFAULT_PALETTE,
    render::{CustomGenome, HubRenderer, HubSpec, StagedHub, TrackDbRenderer},
    reporting::Report,
    table::MetadataTable,
    track::Track,
    unique_name::UniqueNames,
};

/// The name of the sidecar written into every output directory.
pub const SIDECAR_FILE_NAME: &str = "tracknado_config.json";

/// Settings of a single build.
#[derive(Clone, Debug, PartialEq)]
pub struct BuildOptions {
    pub hub_name: String,
    pub genome: String,
    pub outdir: PathBuf,
    pub hub_email: String,
    pub description_html: Option<PathBuf>,
}

impl BuildOptions {
    pub fn new(
        hub_name: impl Into<String>,
        genome: impl Into<String>,
        outdir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            hub_name: hub_name.into(),
            genome: genome.into(),
            outdir: outdir.into(),
            hub_email: String::new(),
            description_html: None,
        }
    }

    pub fn with_email(mut self, hub_email: impl Into<String>) -> Self {
        self.hub_email = hub_email.into();
        self
    }

    pub fn with_description(mut self, description_html: Option<PathBuf>) -> Self {
        self.description_html = description_html;
        self
    }

    pub fn sidecar_path(&self) -> PathBuf {
        self.outdir.join(SIDECAR_FILE_NAME)
    }
}

/// The result of [`HubBuilder::build`].
#[derive(Debug)]
pub struct BuiltHub {
    /// The tracks as built: converted paths swapped in, metadata extracted.
    pub tracks: Vec<Track>,
    pub design: TrackDesign,
    pub staged: StagedHub,
    /// Every recoverable issue raised during the build.
    pub report: Report,
}

/// Fluent configuration of a track hub.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HubBuilder {
    pub tracks: Vec<Track>,
    #[serde(alias = "supergroup_by_cols")]
    pub supergroup_columns: Vec<String>,
    #[serde(alias = "group_by_cols")]
    pub group_columns: Vec<String>,
    #[serde(alias = "overlay_by_cols")]
    pub overlay_columns: Vec<String>,
    pub color_columns: Vec<String>,
    #[serde(alias = "color_palette")]
    pub palette: String,
    pub convert_files: bool,
    pub chrom_sizes: Option<PathBuf>,
    pub custom_genome: Option<CustomGenome>,
    #[serde(skip)]
    extractors: Vec<MetadataExtractor>,
    #[serde(skip)]
    converter: Option<Arc<dyn Converter>>,
    #[serde(skip)]
    renderer: Option<Arc<dyn HubRenderer>>,
}

impl Default for HubBuilder {
    fn default() -> Self {
        Self {
            tracks: Vec::new(),
            supergroup_columns: Vec::new(),
            group_columns: Vec::new(),
            overlay_columns: Vec::new(),
            color_columns: Vec::new(),
            palette: DEFAULT_PALETTE.to_string(),
            convert_files: false,
            chrom_sizes: None,
            custom_genome: None,
            extractors: Vec::new(),
            converter: None,
            renderer: None,
        }
    }
}

impl fmt::Debug for HubBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HubBuilder")
            .field("tracks", &self.tracks.len())
            .field("supergroup_columns", &self.supergroup_columns)
            .field("group_columns", &self.group_columns)
            .field("overlay_columns", &self.overlay_columns)
            .field("color_columns", &self.color_columns)
            .field("palette", &self.palette)
            .field("convert_files", &self.convert_files)
            .field("chrom_sizes", &self.chrom_sizes)
            .field("custom_genome", &self.custom_genome)
            .field("extractors", &self.extractors)
            .finish_non_exhaustive()
    }
}

fn to_strings<S: Into<String>>(values: impl IntoIterator<Item = S>) -> Vec<String> {
    values.into_iter().map(Into::into).collect()
}

/// Sorted set union of two column lists.
fn union(a: &[String], b: &[String]) -> Vec<String> {
    a.iter()
        .chain(b)
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

impl HubBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one track per path, each with the same static metadata.
    pub fn add_tracks<P, K, V>(
        mut self,
        paths: impl IntoIterator<Item = P>,
        metadata: impl IntoIterator<Item = (K, V)>,
    ) -> Self
    where
        P: Into<PathBuf>,
        K: Into<String>,
        V: Into<String>,
    {
        let metadata: Vec<(String, String)> = metadata
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        for path in paths {
            let mut track = Track::new(path);
            track.metadata.extend(metadata.iter().cloned());
            self.tracks.push(track);
        }
        self
    }

    /// Register already-constructed tracks.
    pub fn add_track_records(mut self, tracks: impl IntoIterator<Item = Track>) -> Self {
        self.tracks.extend(tracks);
        self
    }

    /// Register tracks from a CSV/TSV table, see [`read_track_table`].
    pub fn add_tracks_from_table(
        self,
        path: impl AsRef<Path>,
        file_column: &str,
    ) -> Result<Self, TrackHubError> {
        let tracks = read_track_table(path, file_column)?;
        Ok(self.add_track_records(tracks))
    }

    /// Register a metadata extractor. Extractors run in registration order,
    /// later ones overwriting keys set by earlier ones.
    pub fn with_metadata_extractor(mut self, extractor: MetadataExtractor) -> Self {
        self.extractors.push(extractor);
        self
    }

    /// Append grouping columns: SuperTrack columns if `as_supertrack`,
    /// otherwise composite dimension columns.
    pub fn group_by<S: Into<String>>(
        mut self,
        columns: impl IntoIterator<Item = S>,
        as_supertrack: bool,
    ) -> Self {
        let columns = to_strings(columns);
        if as_supertrack {
            self.supergroup_columns.extend(columns);
        } else {
            self.group_columns.extend(columns);
        }
        self
    }

    /// Append overlay columns.
    pub fn overlay_by<S: Into<String>>(mut self, columns: impl IntoIterator<Item = S>) -> Self {
        self.overlay_columns.extend(to_strings(columns));
        self
    }

    /// Set the color axis and its palette, replacing any previous color axis.
    pub fn color_by<S: Into<String>>(
        mut self,
        columns: impl IntoIterator<Item = S>,
        palette: &str,
    ) -> Self {
        self.color_columns = to_strings(columns);
        self.palette = palette.to_string();
        self
    }

    pub fn with_convert_files(mut self, enabled: bool) -> Self {
        self.convert_files = enabled;
        self
    }

    pub fn with_chrom_sizes(mut self, path: impl Into<PathBuf>) -> Self {
        self.chrom_sizes = Some(path.into());
        self
    }

    /// Build an assembly hub for a custom genome sequence.
    pub fn with_custom_genome(
        mut self,
        twobit: impl Into<PathBuf>,
        organism: impl Into<String>,
        default_position: Option<String>,
    ) -> Self {
        self.custom_genome = Some(CustomGenome::new(twobit, organism, default_position));
        self
    }

    /// Replace the default [`UcscConverter`].
    pub fn with_converter(mut self, converter: impl Converter + 'static) -> Self {
        self.converter = Some(Arc::new(converter));
        self
    }

    /// Replace the default [`TrackDbRenderer`].
    pub fn with_renderer(mut self, renderer: impl HubRenderer + 'static) -> Self {
        self.renderer = Some(Arc::new(renderer));
        self
    }

    pub fn extractors(&self) -> &[MetadataExtractor] {
        &self.extractors
    }

    /// The declared grouping axes.
    pub fn axes(&self) -> GroupingAxes {
        GroupingAxes {
            supergroup_columns: self.supergroup_columns.clone(),
            group_columns: self.group_columns.clone(),
            overlay_columns: self.overlay_columns.clone(),
            color_columns: self.color_columns.clone(),
            palette: self.palette.clone(),
        }
    }

    /// Merge other builders into this one.
    ///
    /// Tracks are concatenated as-is. Each grouping axis becomes the sorted set
    /// union of both axes. Extractors are appended unless already registered.
    /// The color axis is kept if set here, otherwise the other's is adopted.
    pub fn merge(mut self, others: impl IntoIterator<Item = HubBuilder>) -> Self {
        for other in others {
            self.tracks.extend(other.tracks);
            self.supergroup_columns = union(&self.supergroup_columns, &other.supergroup_columns);
            self.group_columns = union(&self.group_columns, &other.group_columns);
            self.overlay_columns = union(&self.overlay_columns, &other.overlay_columns);
            for extractor in other.extractors {
                if !self.extractors.contains(&extractor) {
                    self.extractors.push(extractor);
                }
            }
            if self.color_columns.is_empty() {
                self.color_columns = other.color_columns;
                self.palette = other.palette;
            }
        }
        self
    }

    /// Serialize the builder state to JSON, also writing it to `path` if given.
    pub fn to_json(&self, path: Option<&Path>) -> Result<String, TrackHubError> {
        let json = serde_json::to_string_pretty(self)?;
        if let Some(path) = path {
            OutputFile::new(path).write_string(&json)?;
        }
        Ok(json)
    }

    /// Reconstruct a builder from a JSON sidecar document. Extractors are not
    /// restored.
    pub fn from_json(json: &str) -> Result<Self, TrackHubError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reconstruct a builder from a sidecar file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, TrackHubError> {
        let reader = InputFile::new(path.as_ref()).reader()?;
        Ok(serde_json::from_reader(reader)?)
    }

    /// Run every extractor over every track, on the pre-conversion path.
    pub fn extract_metadata(&self, tracks: &mut [Track]) {
        if self.extractors.is_empty() {
            return;
        }
        for track in tracks.iter_mut() {
            for extractor in &self.extractors {
                let extracted = extractor.extract(track.extraction_path());
                track.metadata.extend(extracted);
            }
        }
    }

    /// The metadata table of this builder's tracks, after extraction.
    pub fn prepare_table(&self) -> MetadataTable {
        let mut tracks = self.tracks.clone();
        self.extract_metadata(&mut tracks);
        MetadataTable::from_tracks(&tracks)
    }

    /// Compile the hierarchy without converting or rendering anything.
    pub fn compile(&self) -> Result<TrackDesign, TrackHubError> {
        TrackDesign::compile(self.prepare_table(), &self.axes())
    }

    /// Convert every non-native track, returning the converted track list.
    fn convert_tracks(&self, outdir: &Path, report: &mut Report) -> Result<Vec<Track>, TrackHubError> {
        let mut tracks = self.tracks.clone();
        let pending = tracks.iter().filter(|t| t.needs_conversion()).count();
        if pending == 0 {
            return Ok(tracks);
        }
        if !self.convert_files {
            for track in tracks.iter().filter(|t| t.needs_conversion()) {
                report.add_issue(format!(
                    "Track {} is not in a browser-native format and conversion is disabled",
                    track.path.display()
                ));
            }
            return Ok(tracks);
        }

        let chrom_sizes = match &self.chrom_sizes {
            Some(path) if path.exists() => path.clone(),
            other => return Err(TrackHubError::MissingChromSizes(other.clone())),
        };
        let default_converter: Arc<dyn Converter> = Arc::new(UcscConverter::new());
        let converter = self.converter.as_ref().unwrap_or(&default_converter);

        tracing::info!("converting {} tracks", pending);
        let mut names = UniqueNames::new();
        for track in tracks.iter_mut().filter(|t| t.needs_conversion()) {
            let format = track.format().normalized();
            let output = converted_path(outdir, &track.path, &mut names);
            let converted = converter.convert(&track.path, &chrom_sizes, &output)?;
            if track.original_path.is_none() {
                track.original_path = Some(track.path.clone());
            }
            track.path = converted;
            track.track_type = Some(format);
        }
        Ok(tracks)
    }

    /// Convert, save the sidecar, extract, compile and render into
    /// `options.outdir`.
    pub fn build(&self, options: &BuildOptions) -> Result<BuiltHub, TrackHubError> {
        fs::create_dir_all(&options.outdir)?;
        if let Some(custom) = &self.custom_genome {
            custom.validate()?;
        }
        let mut report = Report::new();

        let mut tracks = self.convert_tracks(&options.outdir, &mut report)?;

        let sidecar = HubBuilder {
            tracks: tracks.clone(),
            ..self.clone()
        };
        sidecar.to_json(Some(&options.sidecar_path()))?;
        tracing::info!("saved builder state to {}", options.sidecar_path().display());

        self.extract_metadata(&mut tracks);
        let table = MetadataTable::from_tracks(&tracks);
        let design = TrackDesign::compile(table, &self.axes())?;
        report.extend(design.report().clone());

        let spec = HubSpec {
            hub_name: options.hub_name.clone(),
            genome: options.genome.clone(),
            outdir: options.outdir.clone(),
            hub_email: options.hub_email.clone(),
            description_html: options.description_html.clone(),
            custom_genome: self.custom_genome.clone(),
        };
        let staged = match &self.renderer {
            Some(renderer) => renderer.render(&design, &spec)?,
            None => TrackDbRenderer::new().render(&design, &spec)?,
        };
        report.extend(staged.report.clone());

        Ok(BuiltHub {
            tracks,
            design,
            staged,
            report,
        })
    }
}
