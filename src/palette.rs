//! Named qualitative color palettes used to color tracks by metadata.
//!
//! Palettes are finite, ordered lists. When more colors are requested than a
//! palette holds, colors *cycle*: the `i`-th distinct group gets color
//! `i mod len`. This matches the behavior of the plotting libraries these
//! palettes come from, and is never a silent truncation.

use indexmap::IndexMap;
use lazy_static::lazy_static;

use crate::{error::TrackHubError, track::Rgb};

/// The palette used when none is given.
pub const DEFAULT_PALETTE: &str = "tab20";

lazy_static! {
    static ref PALETTES: IndexMap<&'static str, Vec<&'static str>> = {
        let mut palettes = IndexMap::new();
        palettes.insert("tab10", vec![
            "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd",
            "#8c564b", "#e377c2", "#7f7f7f", "#bcbd22", "#17becf",
        ]);
        palettes.insert("tab20", vec![
            "#1f77b4", "#aec7e8", "#ff7f0e", "#ffbb78", "#2ca02c",
            "#98df8a", "#d62728", "#ff9896", "#9467bd", "#c5b0d5",
            "#8c564b", "#c49c94", "#e377c2", "#f7b6d2", "#7f7f7f",
            "#c7c7c7", "#bcbd22", "#dbdb8d", "#17becf", "#9edae5",
        ]);
        palettes.insert("tab20b", vec![
            "#393b79", "#5254a3", "#6b6ecf", "#9c9ede", "#637939",
            "#8ca252", "#b5cf6b", "#cedb9c", "#8c6d31", "#bd9e39",
            "#e7ba52", "#e7cb94", "#843c39", "#ad494a", "#d6616b",
            "#e7969c", "#7b4173", "#a55194", "#ce6dbd", "#de9ed6",
        ]);
        palettes.insert("tab20c", vec![
            "#3182bd", "#6baed6", "#9ecae1", "#c6dbef", "#e6550d",
            "#fd8d3c", "#fdae6b", "#fdd0a2", "#31a354", "#74c476",
            "#a1d99b", "#c7e9c0", "#756bb1", "#9e9ac8", "#bcbddc",
            "#dadaeb", "#636363", "#969696", "#bdbdbd", "#d9d9d9",
        ]);
        palettes.insert("set1", vec![
            "#e41a1c", "#377eb8", "#4daf4a", "#984ea3", "#ff7f00",
            "#ffff33", "#a65628", "#f781bf", "#999999",
        ]);
        palettes.insert("set2", vec![
            "#66c2a5", "#fc8d62", "#8da0cb", "#e78ac3", "#a6d854",
            "#ffd92f", "#e5c494", "#b3b3b3",
        ]);
        palettes.insert("dark2", vec![
            "#1b9e77", "#d95f02", "#7570b3", "#e7298a", "#66a61e",
            "#e6ab02", "#a6761d", "#666666",
        ]);
        palettes.insert("paired", vec![
            "#a6cee3", "#1f78b4", "#b2df8a", "#33a02c", "#fb9a99",
            "#e31a1c", "#fdbf6f", "#ff7f00", "#cab2d6", "#6a3d9a",
            "#ffff99", "#b15928",
        ]);
        palettes
    };
}

/// An ordered, finite list of colors.
#[derive(Clone, Debug, PartialEq)]
pub struct Palette {
    name: String,
    colors: Vec<Rgb>,
}

impl Palette {
    /// Look up a palette by (case-insensitive) name.
    pub fn named(name: &str) -> Result<Self, TrackHubError> {
        let hexes = PALETTES.get(name.to_lowercase().as_str()).ok_or_else(|| {
            TrackHubError::UnknownPalette(name.to_string(), Self::available().join(", "))
        })?;
        let colors = hexes
            .iter()
            .map(|hex| Rgb::from_hex(hex))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            name: name.to_string(),
            colors,
        })
    }

    /// Names of all built-in palettes.
    pub fn available() -> Vec<&'static str> {
        PALETTES.keys().copied().collect()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// The color of the `index`-th group, cycling past the end of the palette.
    pub fn color(&self, index: usize) -> Rgb {
        if index >= self.colors.len() {
            tracing::debug!(
                "palette '{}' has {} colors; group {} reuses color {}",
                self.name,
                self.colors.len(),
                index,
                index % self.colors.len()
            );
        }
        self.colors[index % self.colors.len()]
    }
}
