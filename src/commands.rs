//! The functions behind the `tracknado` subcommands.
//!
//! Each returns a [`CommandOutput`], pairing the command's value with a
//! [`Report`] of recoverable issues for the user.

use std::path::{Path, PathBuf};

use crate::{
    builder::{BuildOptions, HubBuilder},
    convert::ToolFinder,
    error::TrackHubError,
    extractors::from_seqnado_path,
    io::{write_template, DEFAULT_FILE_COLUMN},
    render::{CustomGenome, StagedHub},
    reporting::{CommandOutput, Report},
    validate::{run_hub_check, HubValidator},
};

/// Where the tracks of a new hub come from.
#[derive(Clone, Debug, PartialEq)]
pub enum TrackSource {
    /// Track files, with no metadata beyond what extractors find.
    Files(Vec<PathBuf>),
    /// A CSV/TSV metadata table with a `fn` column.
    Table(PathBuf),
}

/// Grouping and conversion settings of `tracknado create`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CreateConfig {
    /// Extract metadata from seqnado output paths.
    pub seqnado: bool,
    pub supergroup_by: Vec<String>,
    pub subgroup_by: Vec<String>,
    pub overlay_by: Vec<String>,
    pub color_by: Vec<String>,
    pub palette: Option<String>,
    pub convert: bool,
    pub chrom_sizes: Option<PathBuf>,
    pub custom_genome: Option<CustomGenome>,
}

impl CreateConfig {
    /// Configure a builder with these settings.
    pub fn apply(&self, mut builder: HubBuilder) -> HubBuilder {
        if self.seqnado {
            builder = builder.with_metadata_extractor(from_seqnado_path());
        }
        builder = builder
            .group_by(self.supergroup_by.iter().cloned(), true)
            .group_by(self.subgroup_by.iter().cloned(), false)
            .overlay_by(self.overlay_by.iter().cloned())
            .with_convert_files(self.convert);
        if !self.color_by.is_empty() {
            let palette = self.palette.clone().unwrap_or(builder.palette.clone());
            builder = builder.color_by(self.color_by.iter().cloned(), &palette);
        }
        if let Some(chrom_sizes) = &self.chrom_sizes {
            builder = builder.with_chrom_sizes(chrom_sizes);
        }
        builder.custom_genome = self.custom_genome.clone();
        builder
    }
}

/// Write an empty metadata table template.
pub fn tracknado_template(output: &Path) -> Result<CommandOutput<()>, TrackHubError> {
    write_template(output)?;
    tracing::info!("created template metadata file at {}", output.display());
    Ok(CommandOutput::new((), Report::new()))
}

/// Create and stage a hub.
pub fn tracknado_create(
    source: &TrackSource,
    config: &CreateConfig,
    options: &BuildOptions,
    url_prefix: Option<&str>,
) -> Result<CommandOutput<StagedHub>, TrackHubError> {
    let builder = match source {
        TrackSource::Table(path) => {
            tracing::info!("loading metadata from {}", path.display());
            HubBuilder::new().add_tracks_from_table(path, DEFAULT_FILE_COLUMN)?
        }
        TrackSource::Files(files) if !files.is_empty() => {
            tracing::info!("adding {} input files", files.len());
            HubBuilder::new().add_tracks(files.iter().cloned(), Vec::<(String, String)>::new())
        }
        TrackSource::Files(_) => return Err(TrackHubError::NoInputTracks),
    };
    let builder = config.apply(builder);

    tracing::info!("building hub '{}' for {}", options.hub_name, options.genome);
    let built = builder.build(options)?;
    tracing::info!("hub created at {}", options.outdir.display());
    if let Some(prefix) = url_prefix {
        tracing::info!("hub URL: {}", built.staged.url(prefix, &options.hub_name));
    }
    Ok(CommandOutput::new(built.staged, built.report))
}

/// Merge hubs from their sidecar files, and stage the merged hub.
pub fn tracknado_merge(
    configs: &[PathBuf],
    seqnado: bool,
    options: &BuildOptions,
) -> Result<CommandOutput<StagedHub>, TrackHubError> {
    tracing::info!("merging {} hub configurations", configs.len());
    let mut builders = configs
        .iter()
        .map(HubBuilder::from_json_file)
        .collect::<Result<Vec<_>, _>>()?
        .into_iter();
    let Some(first) = builders.next() else {
        return Err(TrackHubError::NoInputTracks);
    };
    let mut merged = first.merge(builders);
    if seqnado {
        merged = merged.with_metadata_extractor(from_seqnado_path());
    }

    let built = merged.build(options)?;
    tracing::info!("merged hub created at {}", options.outdir.display());
    Ok(CommandOutput::new(built.staged, built.report))
}

/// The first `*.hub.txt` file, by name, at the top of a hub directory.
fn find_hub_txt(dir: &Path) -> Result<Option<PathBuf>, TrackHubError> {
    let mut hub_files = std::fs::read_dir(dir)?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .file_name()
                    .map_or(false, |name| name.to_string_lossy().ends_with(".hub.txt"))
        })
        .collect::<Vec<_>>();
    hub_files.sort();
    Ok(hub_files.into_iter().next())
}

/// Validate a hub directory or hub file. Uses `hubCheck` when it is
/// installed and a hub file is found, else the structural validator.
///
/// The value is whether the hub is valid.
pub fn tracknado_validate(path: &Path, strict: bool) -> Result<CommandOutput<bool>, TrackHubError> {
    let mut report = Report::new();
    let (hub_dir, hub_txt) = if path.is_dir() {
        (path.to_path_buf(), find_hub_txt(path)?)
    } else {
        let dir = path.parent().unwrap_or(Path::new(".")).to_path_buf();
        (dir, Some(path.to_path_buf()))
    };

    if let Some(hub_txt) = hub_txt.filter(|_| ToolFinder::find_local("hubCheck").is_some()) {
        let check = run_hub_check(&hub_txt, strict)?;
        if check.valid {
            tracing::info!("{}", check.message);
        } else {
            tracing::error!("validation failed: {}", check.message);
        }
        return Ok(CommandOutput::new(check.valid, report));
    }

    tracing::info!("hubCheck not available, checking the hub structure");
    let mut validator = HubValidator::new(&hub_dir);
    let mut valid = validator.validate_all()?;
    for warning in &validator.warnings {
        report.add_issue(warning.clone());
    }
    if strict && !validator.warnings.is_empty() {
        valid = false;
    }
    if valid {
        tracing::info!("hub structure is valid");
    }
    Ok(CommandOutput::new(valid, report))
}
