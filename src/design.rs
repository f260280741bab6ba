//! # The track hierarchy compiler
//!
//! [`TrackDesign::compile`] turns a [`MetadataTable`] and a set of
//! [`GroupingAxes`] into a nested hierarchy of containers:
//!
//! ```text
//! root
//! ├── SuperTrack            (one per distinct supergroup tuple)
//! │   ├── Composite         (one per (supertrack, ext) pair)
//! │   │   └── tracks …      (subtracks, placed along the declared dimensions)
//! │   └── Overlay           (one per (supertrack, overlay tuple), bigWig only)
//! │       └── tracks …
//! ├── Composite / Overlay   (when no supergroup axis applies)
//! └── tracks …              (rows with no container membership)
//! ```
//!
//! Containers are not nested objects. They are kept in flat registries keyed
//! by their [`GroupKey`], and refer to their children through [`Node`] values,
//! which are either keys into a registry or row indices into the table. Every
//! row is also annotated with [`RowTags`] recording the containers it belongs to.
//!
//! Compilation proceeds in a fixed order:
//!
//!  1. Subgroup dimensions are collected, per supergroup partition.
//!  2. SuperTracks are derived from the supergroup columns.
//!  3. Composites are derived from `(supertrack, ext)`.
//!  4. Overlays are derived from `(supertrack, overlay columns)`.
//!  5. Colors are assigned from the color axis, independently of steps 1 to 4.
//!
//! Configuration errors (missing columns, a column used both as a supergroup
//! and a subgroup, too many dimensions, an unknown palette) are raised before
//! anything is built. Inconsistencies in the built hierarchy are raised as
//! [`TrackHubError::InvariantViolation`]. Rows that cannot join an overlay are
//! skipped and reported in the design's [`Report`].

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

use crate::{
    error::TrackHubError,
    formats::TrackFormat,
    key::GroupKey,
    palette::{Palette, DEFAULT_PALETTE},
    reporting::Report,
    table::{MetadataTable, TrackRow},
    track::{Metadata, Rgb, Track, TrackGroup},
};

/// Dimension slots of a composite track, in the order they are filled.
pub const DIMENSION_SLOTS: [&str; 6] = ["X", "Y", "A", "B", "C", "D"];

/// The subgroup value used for rows with no value in a dimension column.
pub const MISSING_VALUE: &str = "NA";

/// The declared grouping axes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupingAxes {
    /// Columns defining SuperTrack partitioning.
    pub supergroup_columns: Vec<String>,
    /// Columns defining the dimensions of each Composite.
    pub group_columns: Vec<String>,
    /// Columns defining Overlay partitioning.
    pub overlay_columns: Vec<String>,
    /// Columns whose value tuples are colored from `palette`.
    pub color_columns: Vec<String>,
    pub palette: String,
}

impl Default for GroupingAxes {
    fn default() -> Self {
        Self {
            supergroup_columns: Vec::new(),
            group_columns: Vec::new(),
            overlay_columns: Vec::new(),
            color_columns: Vec::new(),
            palette: DEFAULT_PALETTE.to_string(),
        }
    }
}

impl GroupingAxes {
    /// Check the axes against a table. This is done before any container is
    /// built, so a configuration error never leaves a partial hierarchy.
    pub fn validate(&self, table: &MetadataTable) -> Result<(), TrackHubError> {
        let conflicts: Vec<String> = self
            .group_columns
            .iter()
            .filter(|column| self.supergroup_columns.contains(column))
            .cloned()
            .collect();
        if !conflicts.is_empty() {
            return Err(TrackHubError::ColumnRoleConflict(conflicts));
        }

        if self.group_columns.len() > DIMENSION_SLOTS.len() {
            return Err(TrackHubError::TooManyDimensions {
                max: DIMENSION_SLOTS.len(),
                found: self.group_columns.len(),
            });
        }

        let roles = [
            ("SuperGroup", &self.supergroup_columns),
            ("SubGroup", &self.group_columns),
            ("Overlay", &self.overlay_columns),
            ("Color-By", &self.color_columns),
        ];
        for (role, columns) in roles {
            let missing = table.missing_columns(columns);
            if !missing.is_empty() {
                return Err(TrackHubError::MissingColumns {
                    role,
                    columns: missing,
                });
            }
        }
        Ok(())
    }

    fn has_supergroups(&self) -> bool {
        !self.supergroup_columns.is_empty()
    }

    fn has_composites(&self) -> bool {
        !self.group_columns.is_empty() || !self.supergroup_columns.is_empty()
    }
}

/// One dimension of a composite track: a column and its distinct values.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Dimension {
    pub column: String,
    pub label: String,
    pub values: BTreeSet<String>,
}

/// A reference to a child of a container.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Node {
    SuperTrack(GroupKey),
    Composite(GroupKey),
    Overlay(GroupKey),
    /// A row index into the design's table.
    Track(usize),
}

/// A top-level grouping container.
#[derive(Clone, Debug, PartialEq)]
pub struct SuperTrack {
    pub key: GroupKey,
    pub name: String,
    /// The supergroup column values this SuperTrack was built from.
    pub values: Vec<String>,
    /// Composite and Overlay children.
    pub children: Vec<Node>,
}

/// A container of same-format tracks, laid out along declared dimensions.
#[derive(Clone, Debug, PartialEq)]
pub struct Composite {
    pub key: GroupKey,
    pub name: String,
    pub supertrack: Option<GroupKey>,
    pub ext: TrackFormat,
    pub dimensions: Vec<Dimension>,
    /// E.g. `dimX=sample dimY=mark`; `None` without group columns.
    pub dimension_string: Option<String>,
    /// E.g. `sample=+ mark=+`; `None` without group columns.
    pub sort_order: Option<String>,
    /// Row indices of the subtracks.
    pub subtracks: Vec<usize>,
}

/// A container layering signal tracks on top of each other.
#[derive(Clone, Debug, PartialEq)]
pub struct Overlay {
    pub key: GroupKey,
    pub name: String,
    pub supertrack: Option<GroupKey>,
    pub values: Vec<String>,
    /// Row indices of the layered tracks.
    pub subtracks: Vec<usize>,
}

/// A resolved container.
#[derive(Clone, Copy, Debug)]
pub enum Container<'a> {
    Root(&'a [Node]),
    SuperTrack(&'a SuperTrack),
    Composite(&'a Composite),
    Overlay(&'a Overlay),
}

/// The containers (and color) a row was assigned to.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RowTags {
    pub supertrack: Option<GroupKey>,
    pub composite: Option<GroupKey>,
    pub overlay: Option<GroupKey>,
    pub color: Option<Rgb>,
}

/// A compiled track hierarchy.
#[derive(Clone, Debug)]
pub struct TrackDesign {
    table: MetadataTable,
    axes: GroupingAxes,
    supertracks: IndexMap<GroupKey, SuperTrack>,
    composites: IndexMap<GroupKey, Composite>,
    overlays: IndexMap<GroupKey, Overlay>,
    root: Vec<Node>,
    tags: Vec<RowTags>,
    report: Report,
}

impl TrackDesign {
    /// Compile a table into a track hierarchy, according to `axes`.
    pub fn compile(table: MetadataTable, axes: &GroupingAxes) -> Result<Self, TrackHubError> {
        axes.validate(&table)?;
        let palette = if axes.color_columns.is_empty() {
            None
        } else {
            Some(Palette::named(&axes.palette)?)
        };

        let mut design = Self {
            tags: vec![RowTags::default(); table.len()],
            table,
            axes: axes.clone(),
            supertracks: IndexMap::new(),
            composites: IndexMap::new(),
            overlays: IndexMap::new(),
            root: Vec::new(),
            report: Report::new(),
        };

        let dimensions = design.collect_dimensions();
        design.derive_supertracks();
        design.derive_composites(&dimensions)?;
        design.derive_overlays();
        design.assign_colors(palette.as_ref());
        design.assemble_root();
        design.check_invariants()?;

        tracing::info!(
            "compiled {} tracks into {} supertracks, {} composites, {} overlays",
            design.table.len(),
            design.supertracks.len(),
            design.composites.len(),
            design.overlays.len()
        );
        Ok(design)
    }

    /// The SuperTrack key of a row, if it has a value for every supergroup column.
    fn supertrack_key(&self, row: &TrackRow) -> Option<GroupKey> {
        if !self.axes.has_supergroups() || !row.has_all(&self.axes.supergroup_columns) {
            return None;
        }
        Some(GroupKey::of(row.values(&self.axes.supergroup_columns)))
    }

    /// Step 1: per supergroup partition, the distinct values of each group column.
    fn collect_dimensions(&self) -> HashMap<Option<GroupKey>, Vec<Dimension>> {
        let mut partitions: HashMap<Option<GroupKey>, Vec<Dimension>> = HashMap::new();
        if self.axes.group_columns.is_empty() {
            return partitions;
        }

        for row in self.table.rows() {
            let dimensions = partitions
                .entry(self.supertrack_key(row))
                .or_insert_with(|| {
                    self.axes
                        .group_columns
                        .iter()
                        .map(|column| Dimension {
                            column: column.clone(),
                            label: column.clone(),
                            values: BTreeSet::new(),
                        })
                        .collect()
                });
            for dimension in dimensions.iter_mut() {
                let value = row.get(&dimension.column).unwrap_or(MISSING_VALUE);
                dimension.values.insert(value.to_string());
            }
        }
        partitions
    }

    /// Step 2: one SuperTrack per distinct supergroup tuple.
    fn derive_supertracks(&mut self) {
        if !self.axes.has_supergroups() {
            return;
        }
        for index in 0..self.table.len() {
            let row = &self.table.rows()[index];
            let Some(key) = self.supertrack_key(row) else {
                tracing::debug!(
                    "track '{}' is missing a supergroup value and is not in a SuperTrack",
                    row.name
                );
                continue;
            };
            let values: Vec<String> = row
                .values(&self.axes.supergroup_columns)
                .into_iter()
                .flatten()
                .map(|value| value.to_string())
                .collect();
            self.supertracks
                .entry(key.clone())
                .or_insert_with(|| SuperTrack {
                    key: key.clone(),
                    name: values.join("_"),
                    values,
                    children: Vec::new(),
                });
            self.tags[index].supertrack = Some(key);
        }
    }

    /// Step 3: one Composite per `(supertrack, ext)` pair.
    fn derive_composites(
        &mut self,
        dimensions: &HashMap<Option<GroupKey>, Vec<Dimension>>,
    ) -> Result<(), TrackHubError> {
        if !self.axes.has_composites() {
            return Ok(());
        }
        let group_columns = &self.axes.group_columns;
        let dimension_string = (!group_columns.is_empty()).then(|| {
            DIMENSION_SLOTS
                .iter()
                .zip(group_columns)
                .map(|(slot, column)| format!("dim{}={}", slot, column))
                .collect::<Vec<_>>()
                .join(" ")
        });
        let sort_order = (!group_columns.is_empty()).then(|| {
            group_columns
                .iter()
                .map(|column| format!("{}=+", column))
                .collect::<Vec<_>>()
                .join(" ")
        });

        for index in 0..self.table.len() {
            let ext = self.table.rows()[index].ext.clone();
            let supertrack = self.tags[index].supertrack.clone();

            let key = if self.axes.has_supergroups() {
                GroupKey::of([supertrack.as_ref().map(|k| k.as_str()), Some(ext.as_str())])
            } else {
                GroupKey::of([Some(ext.as_str())])
            };

            if !self.composites.contains_key(&key) {
                let name = match supertrack.as_ref().and_then(|k| self.supertracks.get(k)) {
                    Some(parent) => format!("{}_{}", parent.name, ext),
                    None => ext.to_string(),
                };
                if let Some(parent) = supertrack.as_ref().and_then(|k| self.supertracks.get_mut(k)) {
                    parent.children.push(Node::Composite(key.clone()));
                }
                self.composites.insert(
                    key.clone(),
                    Composite {
                        key: key.clone(),
                        name,
                        supertrack: supertrack.clone(),
                        ext,
                        dimensions: dimensions.get(&supertrack).cloned().unwrap_or_default(),
                        dimension_string: dimension_string.clone(),
                        sort_order: sort_order.clone(),
                        subtracks: Vec::new(),
                    },
                );
            }

            if let Some(composite) = self.composites.get_mut(&key) {
                composite.subtracks.push(index);
            }
            self.tags[index].composite = Some(key);
        }

        // every composite tag must resolve
        for (index, tags) in self.tags.iter().enumerate() {
            if let Some(key) = &tags.composite {
                if !self.composites.contains_key(key) {
                    return Err(TrackHubError::InvariantViolation(format!(
                        "composite {} of track '{}' was not created",
                        key,
                        self.table.rows()[index].name
                    )));
                }
            }
        }
        Ok(())
    }

    /// Step 4: one Overlay per `(supertrack, overlay tuple)`, for rows with a
    /// value in every overlay column. Every such row is tagged; only bigWig
    /// rows become subtracks.
    fn derive_overlays(&mut self) {
        if self.axes.overlay_columns.is_empty() {
            return;
        }
        let overlay_columns = self.axes.overlay_columns.clone();

        for index in 0..self.table.len() {
            let row = &self.table.rows()[index];
            if !row.has_all(&overlay_columns) {
                tracing::debug!(
                    "track '{}' is missing an overlay value and is not overlaid",
                    row.name
                );
                continue;
            }
            let values: Vec<String> = row
                .values(&overlay_columns)
                .into_iter()
                .flatten()
                .map(|value| value.to_string())
                .collect();
            let supertrack = self.tags[index].supertrack.clone();

            let mut tuple: Vec<Option<&str>> = Vec::new();
            if self.axes.has_supergroups() {
                tuple.push(supertrack.as_ref().map(|k| k.as_str()));
            }
            tuple.extend(values.iter().map(|v| Some(v.as_str())));
            let key = GroupKey::of(tuple);

            if !self.overlays.contains_key(&key) {
                let parent_name = supertrack
                    .as_ref()
                    .and_then(|k| self.supertracks.get(k))
                    .map(|parent| parent.name.clone());
                let name = match &parent_name {
                    Some(parent) => format!("{}_{}_overlay", parent, values.join("_")),
                    None => format!("{}_overlay", values.join("_")),
                };
                if let Some(parent) = supertrack.as_ref().and_then(|k| self.supertracks.get_mut(k)) {
                    parent.children.push(Node::Overlay(key.clone()));
                }
                self.overlays.insert(
                    key.clone(),
                    Overlay {
                        key: key.clone(),
                        name,
                        supertrack,
                        values,
                        subtracks: Vec::new(),
                    },
                );
            }
            self.tags[index].overlay = Some(key);
        }

        // Unresolvable overlay tags are dropped rather than failing the compile.
        for index in 0..self.tags.len() {
            let Some(key) = self.tags[index].overlay.clone() else {
                continue;
            };
            let row = &self.table.rows()[index];
            match self.overlays.get_mut(&key) {
                Some(overlay) if row.ext.is_signal() => overlay.subtracks.push(index),
                Some(overlay) => {
                    let message = format!(
                        "Track {} is not a signal track and will be ignored for the overlay track {}",
                        row.name, overlay.name
                    );
                    self.report.add_issue(message);
                }
                None => {
                    let message = format!(
                        "Overlay track not found for index {} (track '{}'); track is not overlaid",
                        key, row.name
                    );
                    self.tags[index].overlay = None;
                    self.report.add_issue(message);
                }
            }
        }
    }

    /// Step 5: one palette color per distinct color-column tuple.
    fn assign_colors(&mut self, palette: Option<&Palette>) {
        let Some(palette) = palette else {
            for (tags, row) in self.tags.iter_mut().zip(self.table.rows()) {
                tags.color = row.color;
            }
            return;
        };

        let mut assigned: IndexMap<Vec<Option<&str>>, Rgb> = IndexMap::new();
        for (tags, row) in self.tags.iter_mut().zip(self.table.rows()) {
            let tuple = row.values(&self.axes.color_columns);
            let next = assigned.len();
            let color = *assigned
                .entry(tuple)
                .or_insert_with(|| palette.color(next));
            tags.color = Some(color);
        }
    }

    /// Fill the root container: SuperTracks, parentless Composites and
    /// Overlays, and rows in no container.
    fn assemble_root(&mut self) {
        let mut root: Vec<Node> = self
            .supertracks
            .keys()
            .map(|key| Node::SuperTrack(key.clone()))
            .collect();
        root.extend(
            self.composites
                .values()
                .filter(|c| c.supertrack.is_none())
                .map(|c| Node::Composite(c.key.clone())),
        );
        root.extend(
            self.overlays
                .values()
                .filter(|o| o.supertrack.is_none())
                .map(|o| Node::Overlay(o.key.clone())),
        );
        root.extend(
            self.tags
                .iter()
                .enumerate()
                .filter(|(index, tags)| tags.composite.is_none() && !self.in_overlay(*index))
                .map(|(index, _)| Node::Track(index)),
        );
        self.root = root;
    }

    /// Whether a row is a subtrack of its overlay. Non-signal rows keep their
    /// overlay tag without being layered.
    fn in_overlay(&self, index: usize) -> bool {
        self.tags[index].overlay.is_some() && self.table.rows()[index].ext.is_signal()
    }

    /// Post-construction checks. A failure here is a defect in the steps above.
    fn check_invariants(&self) -> Result<(), TrackHubError> {
        let violation = |message: String| Err(TrackHubError::InvariantViolation(message));

        for supertrack in self.supertracks.values() {
            for child in &supertrack.children {
                if self.container(child).is_none() {
                    return violation(format!(
                        "child {:?} of supertrack '{}' does not exist",
                        child, supertrack.name
                    ));
                }
            }
        }
        for composite in self.composites.values() {
            for &index in &composite.subtracks {
                if self.tags[index].composite.as_ref() != Some(&composite.key) {
                    return violation(format!(
                        "subtrack {} of composite '{}' is not tagged with it",
                        index, composite.name
                    ));
                }
            }
        }
        for overlay in self.overlays.values() {
            for &index in &overlay.subtracks {
                if !self.table.rows()[index].ext.is_signal()
                    || self.tags[index].overlay.as_ref() != Some(&overlay.key)
                {
                    return violation(format!(
                        "track {} in overlay '{}' is not a tagged signal track",
                        index, overlay.name
                    ));
                }
            }
        }
        for (index, tags) in self.tags.iter().enumerate() {
            if let Some(key) = &tags.overlay {
                if !self.overlays.contains_key(key) {
                    return violation(format!(
                        "overlay {} of track '{}' does not exist",
                        key,
                        self.table.rows()[index].name
                    ));
                }
            }
            if tags.supertrack.is_some() && tags.composite.is_none() && !self.in_overlay(index) {
                return violation(format!(
                    "track '{}' is in a supertrack but in none of its containers",
                    self.table.rows()[index].name
                ));
            }
        }
        Ok(())
    }

    /// Resolve a node into the container it refers to. Track nodes resolve to
    /// `None`, as do keys that do not exist.
    pub fn container(&self, node: &Node) -> Option<Container<'_>> {
        match node {
            Node::SuperTrack(key) => self.supertracks.get(key).map(Container::SuperTrack),
            Node::Composite(key) => self.composites.get(key).map(Container::Composite),
            Node::Overlay(key) => self.overlays.get(key).map(Container::Overlay),
            Node::Track(_) => None,
        }
    }

    pub fn root(&self) -> Container<'_> {
        Container::Root(&self.root)
    }

    pub fn root_nodes(&self) -> &[Node] {
        &self.root
    }

    pub fn table(&self) -> &MetadataTable {
        &self.table
    }

    pub fn axes(&self) -> &GroupingAxes {
        &self.axes
    }

    pub fn supertracks(&self) -> &IndexMap<GroupKey, SuperTrack> {
        &self.supertracks
    }

    pub fn composites(&self) -> &IndexMap<GroupKey, Composite> {
        &self.composites
    }

    pub fn overlays(&self) -> &IndexMap<GroupKey, Overlay> {
        &self.overlays
    }

    pub fn tags(&self) -> &[RowTags] {
        &self.tags
    }

    pub fn row_tags(&self, index: usize) -> Option<&RowTags> {
        self.tags.get(index)
    }

    /// Warnings about rows left out of containers.
    pub fn report(&self) -> &Report {
        &self.report
    }

    /// The `(column, value)` subgroup assignments of a row within its composite.
    pub fn subgroups(&self, index: usize) -> Vec<(String, String)> {
        let Some(row) = self.table.row(index) else {
            return Vec::new();
        };
        self.axes
            .group_columns
            .iter()
            .map(|column| {
                let value = row.get(column).unwrap_or(MISSING_VALUE);
                (column.clone(), value.to_string())
            })
            .collect()
    }

    /// Export the hierarchy as plain nested [`TrackGroup`]s, rooted at a group
    /// named `root`.
    pub fn to_groups(&self) -> TrackGroup {
        let mut root = TrackGroup::new("root");
        for node in &self.root {
            match node {
                Node::Track(index) => root.tracks.push(self.track_at(*index)),
                other => {
                    if let Some(group) = self.group_of(other) {
                        root.subgroups.push(group);
                    }
                }
            }
        }
        root
    }

    fn group_of(&self, node: &Node) -> Option<TrackGroup> {
        let group = match self.container(node)? {
            Container::SuperTrack(supertrack) => {
                let mut group = TrackGroup::new(&supertrack.name);
                group.metadata = zip_metadata(&self.axes.supergroup_columns, &supertrack.values);
                group.subgroups = supertrack
                    .children
                    .iter()
                    .filter_map(|child| self.group_of(child))
                    .collect();
                group
            }
            Container::Composite(composite) => {
                let mut group = TrackGroup::new(&composite.name);
                group.metadata.insert("ext".to_string(), composite.ext.to_string());
                group.tracks = composite.subtracks.iter().map(|&i| self.track_at(i)).collect();
                group
            }
            Container::Overlay(overlay) => {
                let mut group = TrackGroup::new(&overlay.name);
                group.metadata = zip_metadata(&self.axes.overlay_columns, &overlay.values);
                group.tracks = overlay.subtracks.iter().map(|&i| self.track_at(i)).collect();
                group
            }
            Container::Root(_) => return None,
        };
        Some(group)
    }

    fn track_at(&self, index: usize) -> Track {
        let row = &self.table.rows()[index];
        Track {
            path: row.file_reference.clone(),
            name: Some(row.name.clone()),
            metadata: row.metadata.clone(),
            color: self.tags[index].color,
            track_type: Some(row.ext.clone()),
            original_path: row.original_path.clone(),
        }
    }
}

fn zip_metadata(columns: &[String], values: &[String]) -> Metadata {
    columns.iter().cloned().zip(values.iter().cloned()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn axes() -> GroupingAxes {
        GroupingAxes::default()
    }

    fn cols(columns: &[&str]) -> Vec<String> {
        columns.iter().map(|c| c.to_string()).collect()
    }

    fn table(tracks: Vec<Track>) -> MetadataTable {
        MetadataTable::from_tracks(&tracks)
    }

    fn sample_tracks() -> Vec<Track> {
        vec![
            Track::new("a.bigWig")
                .with_metadata("assay", "ATAC")
                .with_metadata("sample", "X"),
            Track::new("b.bigWig")
                .with_metadata("assay", "ATAC")
                .with_metadata("sample", "Y"),
            Track::new("c.bigWig")
                .with_metadata("assay", "ChIP")
                .with_metadata("sample", "X"),
            Track::new("d.bigBed")
                .with_metadata("assay", "ChIP")
                .with_metadata("sample", "Z"),
        ]
    }

    #[test]
    fn test_no_axes_everything_at_root() {
        let design = TrackDesign::compile(table(sample_tracks()), &axes()).unwrap();
        assert!(design.supertracks().is_empty());
        assert!(design.composites().is_empty());
        assert!(design.overlays().is_empty());
        assert_eq!(
            design.root_nodes(),
            &[Node::Track(0), Node::Track(1), Node::Track(2), Node::Track(3)]
        );
    }

    #[test]
    fn test_supertracks_one_per_value() {
        let mut axes = axes();
        axes.supergroup_columns = cols(&["assay"]);
        let design = TrackDesign::compile(table(sample_tracks()), &axes).unwrap();

        assert_eq!(design.supertracks().len(), 2);
        let names: Vec<&str> = design.supertracks().values().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["ATAC", "ChIP"]);
        for tags in design.tags() {
            let key = tags.supertrack.as_ref().unwrap();
            assert!(design.supertracks().contains_key(key));
        }
        assert_eq!(design.tags()[0].supertrack, Some(GroupKey::of_values(&["ATAC"])));
    }

    #[test]
    fn test_multi_column_supertrack_name() {
        let mut axes = axes();
        axes.supergroup_columns = cols(&["assay", "sample"]);
        let design = TrackDesign::compile(table(sample_tracks()), &axes).unwrap();
        let names: Vec<&str> = design.supertracks().values().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["ATAC_X", "ATAC_Y", "ChIP_X", "ChIP_Z"]);
    }

    #[test]
    fn test_composites_per_supertrack_and_ext() {
        let mut axes = axes();
        axes.supergroup_columns = cols(&["assay"]);
        axes.group_columns = cols(&["sample"]);
        let design = TrackDesign::compile(table(sample_tracks()), &axes).unwrap();

        let names: Vec<&str> = design.composites().values().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["ATAC_bigWig", "ChIP_bigWig", "ChIP_bigBed"]);

        let chip = design
            .supertracks()
            .get(&GroupKey::of_values(&["ChIP"]))
            .unwrap();
        assert_eq!(chip.children.len(), 2);

        // dimensions are scoped to the supertrack partition
        let atac = design.composites().values().next().unwrap();
        let values: Vec<&str> = atac.dimensions[0].values.iter().map(|v| v.as_str()).collect();
        assert_eq!(values, vec!["X", "Y"]);
        assert_eq!(atac.dimension_string.as_deref(), Some("dimX=sample"));
        assert_eq!(atac.sort_order.as_deref(), Some("sample=+"));
        assert_eq!(atac.subtracks, vec![0, 1]);
        assert_eq!(design.root_nodes().len(), 2);
    }

    #[test]
    fn test_composites_without_supertracks() {
        let mut axes = axes();
        axes.group_columns = cols(&["sample", "assay"]);
        let design = TrackDesign::compile(table(sample_tracks()), &axes).unwrap();

        assert_eq!(design.composites().len(), 2);
        let bigwig = design
            .composites()
            .get(&GroupKey::of_values(&["bigWig"]))
            .unwrap();
        assert_eq!(bigwig.name, "bigWig");
        assert_eq!(bigwig.supertrack, None);
        assert_eq!(bigwig.dimension_string.as_deref(), Some("dimX=sample dimY=assay"));
        assert_eq!(bigwig.sort_order.as_deref(), Some("sample=+ assay=+"));
        let values: Vec<&str> = bigwig.dimensions[0].values.iter().map(|v| v.as_str()).collect();
        assert_eq!(values, vec!["X", "Y", "Z"]);
        assert!(design
            .root_nodes()
            .iter()
            .all(|node| matches!(node, Node::Composite(_))));
    }

    #[test]
    fn test_group_column_in_supergroup_rejected() {
        let mut axes = axes();
        axes.supergroup_columns = cols(&["assay"]);
        axes.group_columns = cols(&["assay", "sample"]);
        let result = TrackDesign::compile(table(sample_tracks()), &axes);
        assert!(matches!(result, Err(TrackHubError::ColumnRoleConflict(c)) if c == cols(&["assay"])));
    }

    #[test]
    fn test_too_many_dimensions_rejected() {
        let mut axes = axes();
        axes.group_columns = cols(&["a", "b", "c", "d", "e", "f", "g"]);
        let result = TrackDesign::compile(table(sample_tracks()), &axes);
        assert!(matches!(
            result,
            Err(TrackHubError::TooManyDimensions { max: 6, found: 7 })
        ));
    }

    #[test]
    fn test_missing_columns_rejected() {
        let mut axes = axes();
        axes.overlay_columns = cols(&["mark"]);
        let result = TrackDesign::compile(table(sample_tracks()), &axes);
        match result {
            Err(TrackHubError::MissingColumns { role, columns }) => {
                assert_eq!(role, "Overlay");
                assert_eq!(columns, cols(&["mark"]));
            }
            other => panic!("expected a missing column error, got {:?}", other),
        }
    }

    #[test]
    fn test_overlay_requires_all_columns() {
        let tracks = vec![
            Track::new("a.bw").with_metadata("sample", "S1").with_metadata("mark", "K4"),
            Track::new("b.bw").with_metadata("sample", "S1"),
            Track::new("c.bw").with_metadata("sample", "S1").with_metadata("mark", "K4"),
        ];
        let mut axes = axes();
        axes.overlay_columns = cols(&["sample", "mark"]);
        let design = TrackDesign::compile(table(tracks), &axes).unwrap();

        assert_eq!(design.overlays().len(), 1);
        let overlay = design.overlays().values().next().unwrap();
        assert_eq!(overlay.name, "S1_K4_overlay");
        assert_eq!(overlay.subtracks, vec![0, 2]);
        assert!(design.tags()[0].overlay.is_some());
        assert!(design.tags()[1].overlay.is_none());
        // not an error, so nothing is reported
        assert!(design.report().is_empty());
        assert!(design.root_nodes().contains(&Node::Track(1)));
    }

    #[test]
    fn test_overlay_excludes_non_signal_tracks() {
        let tracks = vec![
            Track::new("a.bw").with_metadata("sample", "S1"),
            Track::new("b.bigBed").with_metadata("sample", "S1"),
        ];
        let mut axes = axes();
        axes.overlay_columns = cols(&["sample"]);
        let design = TrackDesign::compile(table(tracks), &axes).unwrap();

        let overlay = design.overlays().values().next().unwrap();
        assert_eq!(overlay.subtracks, vec![0]);
        assert_eq!(design.report().len(), 1);
        assert!(design.report().issues()[0].contains("not a signal track"));
        // tagged like any row with a full overlay tuple, but not layered
        assert_eq!(design.tags()[1].overlay, Some(overlay.key.clone()));
        assert!(design.root_nodes().contains(&Node::Track(1)));
        assert!(!design.root_nodes().contains(&Node::Track(0)));
    }

    #[test]
    fn test_overlay_tag_for_every_complete_row() {
        let tracks = vec![
            Track::new("a.bigWig").with_metadata("mark", "K27"),
            Track::new("b.bigBed").with_metadata("mark", "K27"),
            Track::new("c.bigBed").with_metadata("mark", "K4"),
            Track::new("d.bigWig"),
        ];
        let mut axes = axes();
        axes.overlay_columns = cols(&["mark"]);
        let design = TrackDesign::compile(table(tracks), &axes).unwrap();

        for (index, row) in design.table().rows().iter().enumerate() {
            assert_eq!(
                design.tags()[index].overlay.is_some(),
                row.get("mark").is_some(),
                "track {}",
                row.name
            );
        }
        // one warning per excluded row
        assert_eq!(design.report().len(), 2);
        let k4 = design.overlays().get(&GroupKey::of_values(&["K4"])).unwrap();
        assert!(k4.subtracks.is_empty());
    }

    #[test]
    fn test_overlay_under_supertrack() {
        let mut axes = axes();
        axes.supergroup_columns = cols(&["assay"]);
        axes.overlay_columns = cols(&["sample"]);
        let design = TrackDesign::compile(table(sample_tracks()), &axes).unwrap();

        let names: Vec<&str> = design.overlays().values().map(|o| o.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["ATAC_X_overlay", "ATAC_Y_overlay", "ChIP_X_overlay", "ChIP_Z_overlay"]
        );
        // d.bigBed is excluded with a warning, but still in its composite
        assert_eq!(design.report().len(), 1);
        assert!(design.tags()[3].composite.is_some());
        assert!(design.tags()[3].overlay.is_some());
        let chip_z = design.overlays().values().last().unwrap();
        assert!(chip_z.subtracks.is_empty());
        let atac = design.supertracks().get(&GroupKey::of_values(&["ATAC"])).unwrap();
        assert_eq!(
            atac.children
                .iter()
                .filter(|c| matches!(c, Node::Overlay(_)))
                .count(),
            2
        );
    }

    #[test]
    fn test_track_in_composite_and_overlay() {
        let mut axes = axes();
        axes.group_columns = cols(&["sample"]);
        axes.overlay_columns = cols(&["assay"]);
        let design = TrackDesign::compile(table(sample_tracks()), &axes).unwrap();
        let tags = &design.tags()[0];
        assert!(tags.composite.is_some());
        assert!(tags.overlay.is_some());
    }

    #[test]
    fn test_null_supergroup_goes_to_root_composite() {
        let tracks = vec![
            Track::new("a.bw").with_metadata("assay", "ATAC"),
            Track::new("b.bw"),
        ];
        let mut axes = axes();
        axes.supergroup_columns = cols(&["assay"]);
        let design = TrackDesign::compile(table(tracks), &axes).unwrap();

        assert_eq!(design.supertracks().len(), 1);
        assert_eq!(design.composites().len(), 2);
        assert!(design.tags()[1].supertrack.is_none());
        let orphan = design.tags()[1].composite.as_ref().unwrap();
        assert_eq!(design.composites()[orphan].name, "bigWig");
        assert!(design.root_nodes().contains(&Node::Composite(orphan.clone())));
    }

    #[test]
    fn test_missing_dimension_value_placeholder() {
        let tracks = vec![
            Track::new("a.bw").with_metadata("sample", "S1"),
            Track::new("b.bw").with_metadata("other", "x"),
        ];
        let mut axes = axes();
        axes.group_columns = cols(&["sample"]);
        let design = TrackDesign::compile(table(tracks), &axes).unwrap();
        let composite = design.composites().values().next().unwrap();
        assert!(composite.dimensions[0].values.contains(MISSING_VALUE));
        assert_eq!(
            design.subgroups(1),
            vec![("sample".to_string(), MISSING_VALUE.to_string())]
        );
    }

    #[test]
    fn test_colors_per_tuple() {
        let mut axes = axes();
        axes.color_columns = cols(&["sample"]);
        axes.palette = "tab10".to_string();
        let design = TrackDesign::compile(table(sample_tracks()), &axes).unwrap();
        let palette = Palette::named("tab10").unwrap();

        // X, Y, X, Z
        assert_eq!(design.tags()[0].color, Some(palette.color(0)));
        assert_eq!(design.tags()[1].color, Some(palette.color(1)));
        assert_eq!(design.tags()[2].color, Some(palette.color(0)));
        assert_eq!(design.tags()[3].color, Some(palette.color(2)));
    }

    #[test]
    fn test_colors_cycle_when_palette_exhausted() {
        let tracks: Vec<Track> = (0..12)
            .map(|i| Track::new(format!("t{}.bw", i)).with_metadata("sample", format!("S{}", i)))
            .collect();
        let mut axes = axes();
        axes.color_columns = cols(&["sample"]);
        axes.palette = "set1".to_string();
        let design = TrackDesign::compile(table(tracks), &axes).unwrap();
        assert_eq!(design.tags()[9].color, design.tags()[0].color);
        assert_eq!(design.tags()[11].color, design.tags()[2].color);
    }

    #[test]
    fn test_explicit_color_kept_without_color_axis() {
        let tracks = vec![Track::new("a.bw").with_color(1, 2, 3).unwrap()];
        let design = TrackDesign::compile(table(tracks), &axes()).unwrap();
        assert_eq!(design.tags()[0].color, Some(Rgb::new(1, 2, 3).unwrap()));
    }

    #[test]
    fn test_unknown_palette_is_configuration_error() {
        let mut axes = axes();
        axes.color_columns = cols(&["sample"]);
        axes.palette = "rainbow".to_string();
        let result = TrackDesign::compile(table(sample_tracks()), &axes);
        assert!(matches!(result, Err(TrackHubError::UnknownPalette(..))));
    }

    #[test]
    fn test_group_by_well_known_column() {
        let mut axes = axes();
        axes.supergroup_columns = cols(&["ext"]);
        let design = TrackDesign::compile(table(sample_tracks()), &axes).unwrap();
        let names: Vec<&str> = design.supertracks().values().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["bigWig", "bigBed"]);
        let composite = design.composites().values().next().unwrap();
        assert_eq!(composite.name, "bigWig_bigWig");
        assert_eq!(composite.ext, TrackFormat::BigWig);
    }

    #[test]
    fn test_to_groups_export() {
        let mut axes = axes();
        axes.supergroup_columns = cols(&["assay"]);
        axes.group_columns = cols(&["sample"]);
        let design = TrackDesign::compile(table(sample_tracks()), &axes).unwrap();
        let groups = design.to_groups();

        assert_eq!(groups.name, "root");
        assert_eq!(groups.total_tracks(), 4);
        let chip = groups.subgroup("ChIP").unwrap();
        assert_eq!(chip.subgroups.len(), 2);
        assert_eq!(chip.subgroup("ChIP_bigBed").unwrap().tracks[0].name.as_deref(), Some("d"));
    }

    #[test]
    fn test_to_groups_carries_axis_values_and_original_paths() {
        let mut tracks = sample_tracks();
        let mut converted = Track::new("converted/e.bb")
            .with_metadata("assay", "ChIP")
            .with_metadata("sample", "Z");
        converted.original_path = Some(PathBuf::from("data/e.bed"));
        tracks.push(converted);

        let mut axes = axes();
        axes.supergroup_columns = cols(&["assay"]);
        axes.group_columns = cols(&["sample"]);
        axes.overlay_columns = cols(&["sample"]);
        let design = TrackDesign::compile(table(tracks), &axes).unwrap();
        let groups = design.to_groups();

        let atac = groups.subgroup("ATAC").unwrap();
        assert_eq!(atac.metadata["assay"], "ATAC");
        assert_eq!(atac.subgroup("ATAC_bigWig").unwrap().metadata["ext"], "bigWig");
        let overlay = atac.subgroup("ATAC_X_overlay").unwrap();
        assert_eq!(overlay.metadata["sample"], "X");
        assert_eq!(overlay.tracks[0].name.as_deref(), Some("a"));

        let bigbed = groups.subgroup("ChIP").unwrap().subgroup("ChIP_bigBed").unwrap();
        assert_eq!(bigbed.tracks[0].original_path, None);
        assert_eq!(bigbed.tracks[1].original_path, Some(PathBuf::from("data/e.bed")));
    }
}
