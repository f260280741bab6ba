//! Track file formats and extension alias resolution.

use lazy_static::lazy_static;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// The format of a track file, after alias resolution.
///
/// Raw formats that the genome browser cannot display directly ([`TrackFormat::Bed`],
/// [`TrackFormat::Gtf`]) only appear before conversion; [`TrackFormat::normalized`]
/// maps them onto the browser format they will be converted into.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TrackFormat {
    BigWig,
    BigBed,
    BigGenePred,
    NarrowPeak,
    BroadPeak,
    Bed,
    Gtf,
    Other(String),
}

lazy_static! {
    /// Lowercased extension (or track type) to format.
    static ref FORMAT_ALIASES: HashMap<&'static str, TrackFormat> = {
        let mut aliases = HashMap::new();
        aliases.insert("bw", TrackFormat::BigWig);
        aliases.insert("bigwig", TrackFormat::BigWig);
        aliases.insert("bb", TrackFormat::BigBed);
        aliases.insert("bigbed", TrackFormat::BigBed);
        aliases.insert("biggenepred", TrackFormat::BigGenePred);
        aliases.insert("narrowpeak", TrackFormat::NarrowPeak);
        aliases.insert("broadpeak", TrackFormat::BroadPeak);
        aliases.insert("bed", TrackFormat::Bed);
        aliases.insert("gtf", TrackFormat::Gtf);
        aliases.insert("gff", TrackFormat::Gtf);
        aliases
    };
}

impl TrackFormat {
    /// Resolve an extension or track type string, e.g. `"bw"` or `".bigWig"`.
    pub fn from_alias(alias: &str) -> Self {
        let trimmed = alias.trim().trim_start_matches('.');
        FORMAT_ALIASES
            .get(trimmed.to_lowercase().as_str())
            .cloned()
            .unwrap_or_else(|| TrackFormat::Other(trimmed.to_string()))
    }

    /// The format implied by a path's suffix.
    pub fn from_path(path: &Path) -> Self {
        let extension = path
            .extension()
            .map(|ext| ext.to_string_lossy().to_string())
            .unwrap_or_default();
        Self::from_alias(&extension)
    }

    /// The browser format this format is displayed as: BED is displayed as
    /// bigBed and GTF/GFF as bigGenePred (assuming conversion).
    pub fn normalized(&self) -> Self {
        match self {
            TrackFormat::Bed => TrackFormat::BigBed,
            TrackFormat::Gtf => TrackFormat::BigGenePred,
            other => other.clone(),
        }
    }

    /// Whether the genome browser can read this format directly.
    pub fn is_native(&self) -> bool {
        !matches!(self, TrackFormat::Bed | TrackFormat::Gtf)
    }

    /// Whether tracks of this format can be layered in an overlay container.
    pub fn is_signal(&self) -> bool {
        matches!(self, TrackFormat::BigWig)
    }

    pub fn as_str(&self) -> &str {
        match self {
            TrackFormat::BigWig => "bigWig",
            TrackFormat::BigBed => "bigBed",
            TrackFormat::BigGenePred => "bigGenePred",
            TrackFormat::NarrowPeak => "narrowPeak",
            TrackFormat::BroadPeak => "broadPeak",
            TrackFormat::Bed => "bed",
            TrackFormat::Gtf => "gtf",
            TrackFormat::Other(name) => name,
        }
    }
}

impl fmt::Display for TrackFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TrackFormat {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from_alias(s))
    }
}

impl Serialize for TrackFormat {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for TrackFormat {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Self::from_alias(&s))
    }
}
