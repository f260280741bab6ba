//! The [`Track`] record and its supporting types.
//!
//! A [`Track`] is a single file together with its free-form key/value metadata.
//! Tracks are only mutated to attach extracted metadata, and to swap in a new
//! path and format after conversion.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::{error::TrackHubError, formats::TrackFormat};

/// Free-form track metadata. A key that is absent is a null value.
pub type Metadata = IndexMap<String, String>;

/// An RGB color, with each channel in `[0, 255]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "(i64, i64, i64)", into = "(u8, u8, u8)")]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    /// Build a color, failing if any channel is outside `[0, 255]`.
    pub fn new(r: i64, g: i64, b: i64) -> Result<Self, TrackHubError> {
        let channel = |c: i64| u8::try_from(c).map_err(|_| TrackHubError::InvalidColor(r, g, b));
        Ok(Self {
            r: channel(r)?,
            g: channel(g)?,
            b: channel(b)?,
        })
    }

    /// Parse a `#rrggbb` hex color.
    pub fn from_hex(hex: &str) -> Result<Self, TrackHubError> {
        let digits = hex.trim().trim_start_matches('#');
        if digits.len() != 6 || !digits.is_ascii() {
            return Err(TrackHubError::UnparsableColor(hex.to_string()));
        }
        let channel = |i: usize| {
            i64::from_str_radix(&digits[i..i + 2], 16)
                .map_err(|_| TrackHubError::UnparsableColor(hex.to_string()))
        };
        Self::new(channel(0)?, channel(2)?, channel(4)?)
    }
}

impl FromStr for Rgb {
    type Err = TrackHubError;

    /// Parse either `r,g,b` or `#rrggbb`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.starts_with('#') {
            return Self::from_hex(s);
        }
        let channels = s
            .split(',')
            .map(|c| c.trim().parse::<i64>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| TrackHubError::UnparsableColor(s.to_string()))?;
        match channels.as_slice() {
            [r, g, b] => Self::new(*r, *g, *b),
            _ => Err(TrackHubError::UnparsableColor(s.to_string())),
        }
    }
}

impl TryFrom<(i64, i64, i64)> for Rgb {
    type Error = TrackHubError;

    fn try_from(value: (i64, i64, i64)) -> Result<Self, Self::Error> {
        Self::new(value.0, value.1, value.2)
    }
}

impl From<Rgb> for (u8, u8, u8) {
    fn from(value: Rgb) -> Self {
        (value.r, value.g, value.b)
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.r, self.g, self.b)
    }
}

/// A single track file with its metadata.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub path: PathBuf,
    /// Display name; derived from the path stem when not set.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub color: Option<Rgb>,
    /// Explicit format, overriding the path suffix (e.g. `bigWig`).
    #[serde(default)]
    pub track_type: Option<TrackFormat>,
    /// The path before conversion, kept so extractors see the original name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_path: Option<PathBuf>,
}

impl Track {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            name: None,
            metadata: Metadata::new(),
            color: None,
            track_type: None,
            original_path: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Set the color, failing on channels outside `[0, 255]`.
    pub fn with_color(mut self, r: i64, g: i64, b: i64) -> Result<Self, TrackHubError> {
        self.color = Some(Rgb::new(r, g, b)?);
        Ok(self)
    }

    pub fn with_track_type(mut self, track_type: TrackFormat) -> Self {
        self.track_type = Some(track_type);
        self
    }

    /// The explicit name, or the path's file stem.
    pub fn display_name(&self) -> String {
        self.name.clone().unwrap_or_else(|| {
            self.path
                .file_stem()
                .map(|stem| stem.to_string_lossy().to_string())
                .unwrap_or_default()
        })
    }

    /// The raw (un-normalized) format: the explicit track type, else the path suffix.
    pub fn format(&self) -> TrackFormat {
        self.track_type
            .clone()
            .unwrap_or_else(|| TrackFormat::from_path(&self.path))
    }

    /// Whether this track's file needs conversion before the browser can read it.
    pub fn needs_conversion(&self) -> bool {
        !TrackFormat::from_path(&self.path).is_native()
    }

    /// The path metadata extractors should look at.
    pub fn extraction_path(&self) -> &Path {
        self.original_path.as_deref().unwrap_or(&self.path)
    }
}

/// A plain, recursive named grouping of tracks.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackGroup {
    pub name: String,
    #[serde(default)]
    pub tracks: Vec<Track>,
    #[serde(default)]
    pub subgroups: Vec<TrackGroup>,
    #[serde(default)]
    pub metadata: Metadata,
}

impl TrackGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Total number of tracks in this group and all of its subgroups.
    pub fn total_tracks(&self) -> usize {
        self.tracks.len()
            + self
                .subgroups
                .iter()
                .map(|group| group.total_tracks())
                .sum::<usize>()
    }

    /// Find a direct subgroup by name.
    pub fn subgroup(&self, name: &str) -> Option<&TrackGroup> {
        self.subgroups.iter().find(|group| group.name == name)
    }
}
