//! # tracknado: compile UCSC track hubs from annotated track files
//!
//! Tracks (bigWig, bigBed, BED, GTF, ...) carry a path and free-form
//! metadata. Metadata is attached explicitly, read from a CSV/TSV table, or
//! pulled from file paths by [`extractors`]. A [`HubBuilder`] collects the
//! tracks and the grouping axes:
//!
//!  - **supergroup** columns partition tracks into SuperTracks;
//!  - **group** columns become the dimensions of composite tracks;
//!  - **overlay** columns merge signal tracks into overlay tracks;
//!  - **color** columns assign palette colors.
//!
//! The builder materializes a [`MetadataTable`] and compiles it into a
//! [`TrackDesign`], a flat registry of containers. Every track lands in
//! exactly one leaf container, and every container key is a stable
//! [`GroupKey`]. A [`HubRenderer`] then stages the design as a hub directory.
//!
//! ```no_run
//! use tracknado::prelude::*;
//!
//! let built = HubBuilder::new()
//!     .add_tracks(["ATAC/s1.bigWig", "ChIP/s1.bigWig"], Vec::<(String, String)>::new())
//!     .with_metadata_extractor(from_parent_dirs(1, vec!["assay".to_string()]))
//!     .group_by(["assay"], true)
//!     .build(&BuildOptions::new("HUB", "hg38", "hub_out"))?;
//! assert_eq!(built.design.supertracks().len(), 2);
//! # Ok::<(), TrackHubError>(())
//! ```
//!
//! [`HubBuilder`]: crate::builder::HubBuilder
//! [`MetadataTable`]: crate::table::MetadataTable
//! [`TrackDesign`]: crate::design::TrackDesign
//! [`GroupKey`]: crate::key::GroupKey
//! [`HubRenderer`]: crate::render::HubRenderer

pub mod builder;
pub mod commands;
pub mod convert;
pub mod design;
pub mod error;
pub mod extractors;
pub mod formats;
pub mod io;
pub mod key;
pub mod palette;
pub mod render;
pub mod reporting;
pub mod table;
pub mod test_utilities;
pub mod track;
pub mod unique_name;
pub mod validate;

pub mod prelude {
    pub use crate::builder::{BuildOptions, BuiltHub, HubBuilder};
    pub use crate::convert::{Converter, UcscConverter};
    pub use crate::design::{Container, GroupingAxes, Node, TrackDesign};
    pub use crate::error::TrackHubError;
    pub use crate::extractors::{
        compose, from_filename_pattern, from_parent_dirs, from_seqnado_path,
        with_static_metadata, MetadataExtractor,
    };
    pub use crate::formats::TrackFormat;
    pub use crate::key::GroupKey;
    pub use crate::palette::Palette;
    pub use crate::render::{CustomGenome, HubRenderer, TrackDbRenderer};
    pub use crate::reporting::Report;
    pub use crate::table::MetadataTable;
    pub use crate::track::{Rgb, Track, TrackGroup};
    pub use crate::validate::HubValidator;
}
