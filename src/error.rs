//! The [`TrackHubError`] `enum` definition and error messages.
//!
use std::path::PathBuf;
use thiserror::Error;

/// The [`TrackHubError`] defines the standard set of errors that should
/// be passed to the user.
#[derive(Debug, Error)]
pub enum TrackHubError {
    // IO related errors
    #[error("File reading error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Metadata table error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("Sidecar configuration error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("Invalid filename pattern: {0}")]
    RegexError(#[from] regex::Error),
    #[error("Metadata table '{0}' has no file column '{1}'")]
    MissingFileColumn(PathBuf, String),

    // Track construction errors
    #[error("Color values must be 0-255, got ({0}, {1}, {2})")]
    InvalidColor(i64, i64, i64),
    #[error("Could not parse color '{0}': expected 'r,g,b' or '#rrggbb'")]
    UnparsableColor(String),

    // Configuration errors, raised before any container is built
    #[error("{role} columns {columns:?} missing from the track table")]
    MissingColumns {
        role: &'static str,
        columns: Vec<String>,
    },
    #[error("SubGroup columns {0:?} cannot be in SuperGroup columns")]
    ColumnRoleConflict(Vec<String>),
    #[error("At most {max} subgroup columns are supported, {found} were declared")]
    TooManyDimensions { max: usize, found: usize },
    #[error("Palette '{0}' not found. Try one of the following: {1}")]
    UnknownPalette(String, String),
    #[error("chrom_sizes must be provided and exist for track conversion (got {0:?})")]
    MissingChromSizes(Option<PathBuf>),
    #[error("Custom genome is invalid: {0}")]
    InvalidCustomGenome(String),

    // Fatal defects: an inconsistent hierarchy was produced
    #[error("Track hierarchy invariant violated: {0}")]
    InvariantViolation(String),

    // External tool errors
    #[error("{0} not found locally and no container engine (Apptainer/Docker) detected. Please install {0} or a container engine.")]
    ToolNotFound(String),
    #[error("{tool} exited with status {status}: {stderr}")]
    ToolFailed {
        tool: String,
        status: String,
        stderr: String,
    },

    // Command line tool related errors
    #[error("Must provide --input-files or --metadata")]
    NoInputTracks,
    #[error("Command line argument error: {0}")]
    ArgumentError(#[from] clap::error::Error),
}
