//! Test cases and test utility functions.
//!

use rand::{seq::SliceRandom, thread_rng, Rng};
use std::fs;
use std::path::{Path, PathBuf};

use crate::{convert::Converter, error::TrackHubError, table::MetadataTable, track::Track};

// Stochastic test table defaults
//
// This is the number of random tracks to use in tests and benchmarks.
// The tradeoff is catching stochastic errors vs test time.
pub const NRANDOM_TRACKS: usize = 10000;

// metadata value pools
pub const ASSAYS: [&str; 4] = ["ATAC", "ChIP", "RNA", "MCC"];
pub const SAMPLES: [&str; 6] = ["S1", "S2", "S3", "S4", "S5", "S6"];
pub const MARKS: [&str; 5] = ["CTCF", "H3K4me3", "H3K27ac", "H3K27me3", "input"];
pub const EXTENSIONS: [&str; 3] = ["bigWig", "bigBed", "bed"];

// the chance a metadata value is left null
pub const NULL_RATE: f64 = 0.05;

/// Create an empty file `name` in `dir` (creating `dir` if needed), and
/// return its path.
pub fn touch(dir: &Path, name: &str) -> PathBuf {
    fs::create_dir_all(dir).expect("could not create test directory");
    let path = dir.join(name);
    fs::write(&path, b"").expect("could not create test file");
    path
}

/// Sample a value from `pool`, or `None` at [`NULL_RATE`].
fn random_value(pool: &[&str]) -> Option<String> {
    let mut rng = thread_rng();
    if rng.gen_bool(NULL_RATE) {
        return None;
    }
    pool.choose(&mut rng).map(|value| value.to_string())
}

/// Build a random track with `assay`, `sample` and `mark` metadata, any of
/// which may be null.
pub fn random_track(i: usize) -> Track {
    let mut rng = thread_rng();
    let ext = EXTENSIONS[rng.gen_range(0..EXTENSIONS.len())];
    let mut track = Track::new(format!("/data/track_{}.{}", i, ext));
    for (key, pool) in [("assay", &ASSAYS[..]), ("sample", &SAMPLES[..]), ("mark", &MARKS[..])] {
        if let Some(value) = random_value(pool) {
            track.metadata.insert(key.to_string(), value);
        }
    }
    track
}

/// Build `n` random tracks.
pub fn random_tracks(n: usize) -> Vec<Track> {
    (0..n).map(random_track).collect()
}

/// Build a random [`MetadataTable`] of `n` tracks.
pub fn random_table(n: usize) -> MetadataTable {
    MetadataTable::from_tracks(&random_tracks(n))
}

/// A [`Converter`] that copies its input to the output path, standing in
/// for the UCSC tools.
#[derive(Clone, Debug, Default)]
pub struct CopyConverter;

impl Converter for CopyConverter {
    fn convert(
        &self,
        input: &Path,
        chrom_sizes: &Path,
        output: &Path,
    ) -> Result<PathBuf, TrackHubError> {
        if !chrom_sizes.exists() {
            return Err(TrackHubError::MissingChromSizes(Some(chrom_sizes.to_path_buf())));
        }
        if let Some(parent) = output.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(input, output)?;
        Ok(output.to_path_buf())
    }
}
