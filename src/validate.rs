//! Checks of a staged hub: a structural check run in-process, and a wrapper
//! around UCSC's `hubCheck` for when it is installed.

use lazy_static::lazy_static;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use walkdir::WalkDir;

use crate::{convert::ToolFinder, error::TrackHubError};

lazy_static! {
    static ref BIG_DATA_URL: Regex = Regex::new(r"(?m)^\s*bigDataUrl\s+(\S.*?)\s*$")
        .expect("bigDataUrl pattern is valid");
}

/// Structural validation of a hub directory, without external tools.
///
/// Missing hub files are errors; broken track references are only warnings.
#[derive(Clone, Debug, Default)]
pub struct HubValidator {
    hub_dir: PathBuf,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl HubValidator {
    pub fn new(hub_dir: impl Into<PathBuf>) -> Self {
        Self {
            hub_dir: hub_dir.into(),
            ..Default::default()
        }
    }

    pub fn hub_dir(&self) -> &Path {
        &self.hub_dir
    }

    fn files_named<F>(&self, max_depth: usize, predicate: F) -> Vec<PathBuf>
    where
        F: Fn(&str) -> bool,
    {
        WalkDir::new(&self.hub_dir)
            .max_depth(max_depth)
            .sort_by_file_name()
            .into_iter()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file())
            .filter(|entry| predicate(&entry.file_name().to_string_lossy()))
            .map(|entry| entry.into_path())
            .collect()
    }

    fn trackdb_files(&self) -> Vec<PathBuf> {
        self.files_named(usize::MAX, |name| name == "trackDb.txt")
    }

    /// Check the hub has a `*.hub.txt` at its top level, and a genomes file
    /// and a `trackDb.txt` somewhere below it.
    pub fn validate_structure(&mut self) -> &[String] {
        if self.files_named(1, |name| name.ends_with(".hub.txt")).is_empty() {
            self.errors.push("No hub.txt file found in directory.".to_string());
        }
        let genomes = self.files_named(usize::MAX, |name| {
            name == "genomes.txt" || name.ends_with(".genomes.txt")
        });
        if genomes.is_empty() {
            self.errors.push("No genomes.txt file found.".to_string());
        }
        if self.trackdb_files().is_empty() {
            self.errors.push("No trackDb.txt file found.".to_string());
        }
        &self.errors
    }

    /// Check every `bigDataUrl`, resolved relative to its `trackDb.txt`,
    /// points at an existing file. Remote URLs are not checked.
    pub fn validate_track_files_exist(&mut self) -> Result<&[String], TrackHubError> {
        for trackdb in self.trackdb_files() {
            let contents = fs::read_to_string(&trackdb)?;
            let base = trackdb.parent().unwrap_or(&self.hub_dir).to_path_buf();
            for capture in BIG_DATA_URL.captures_iter(&contents) {
                let url = &capture[1];
                if url.contains("://") {
                    continue;
                }
                if !base.join(url).exists() {
                    self.warnings.push(format!(
                        "Track file not found: {} (referenced in {})",
                        url,
                        trackdb.display()
                    ));
                }
            }
        }
        Ok(&self.warnings)
    }

    /// Run all checks; true if there are no errors.
    pub fn validate_all(&mut self) -> Result<bool, TrackHubError> {
        self.validate_structure();
        self.validate_track_files_exist()?;
        for error in &self.errors {
            tracing::error!("{}", error);
        }
        Ok(self.errors.is_empty())
    }
}

/// The outcome of a `hubCheck` run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HubCheck {
    pub valid: bool,
    pub message: String,
}

/// Validate a hub file with UCSC's `hubCheck`, looked up on `PATH` or in
/// `~/bin`. A missing `hubCheck` is reported as [`TrackHubError::ToolNotFound`].
pub fn run_hub_check(hub_txt: &Path, strict: bool) -> Result<HubCheck, TrackHubError> {
    if !hub_txt.exists() {
        return Ok(HubCheck {
            valid: false,
            message: format!("Hub file not found: {}", hub_txt.display()),
        });
    }
    let hub_check = ToolFinder::find_local("hubCheck")
        .ok_or_else(|| TrackHubError::ToolNotFound("hubCheck".to_string()))?;

    let mut command = Command::new(hub_check);
    if strict {
        command.arg("-strict");
    }
    let output = command.arg(hub_txt).output()?;
    let valid = output.status.success();
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
    let message = match (stderr.is_empty(), stdout.is_empty()) {
        (false, _) => stderr,
        (true, false) => stdout,
        (true, true) if valid => "Hub is valid.".to_string(),
        (true, true) => String::new(),
    };
    Ok(HubCheck { valid, message })
}
