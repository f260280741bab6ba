//! Rendering a compiled [`TrackDesign`] into a staged UCSC track hub.
//!
//! The [`HubRenderer`] trait is the seam between the hierarchy compiler and
//! the text format of the hub. [`TrackDbRenderer`] is the default, and stages:
//!
//! ```text
//! <outdir>/<hub>.hub.txt
//! <outdir>/<hub>.genomes.txt
//! <outdir>/<genome>/trackDb.txt
//! <outdir>/<genome>/<track files>   (referenced by relative bigDataUrl)
//! <outdir>/<genome>/groups.txt      (custom genomes only)
//! <outdir>/<genome>/<genome>.2bit   (custom genomes only)
//! ```

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::{
    design::{Node, TrackDesign, DIMENSION_SLOTS},
    error::TrackHubError,
    formats::TrackFormat,
    io::OutputFile,
    key::GroupKey,
    reporting::Report,
    table::TrackRow,
    unique_name::UniqueNames,
};

/// The default browser position for custom genomes.
pub const DEFAULT_POSITION: &str = "chr1:10000-20000";

/// An assembly hub genome, built from a `.2bit` sequence file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomGenome {
    pub twobit: PathBuf,
    pub organism: String,
    #[serde(default = "default_position")]
    pub default_position: String,
}

fn default_position() -> String {
    DEFAULT_POSITION.to_string()
}

impl CustomGenome {
    pub fn new(
        twobit: impl Into<PathBuf>,
        organism: impl Into<String>,
        default_position: Option<String>,
    ) -> Self {
        Self {
            twobit: twobit.into(),
            organism: organism.into(),
            default_position: default_position.unwrap_or_else(self::default_position),
        }
    }

    /// Check the genome can be staged.
    pub fn validate(&self) -> Result<(), TrackHubError> {
        if self.organism.trim().is_empty() {
            return Err(TrackHubError::InvalidCustomGenome(
                "an organism is required".to_string(),
            ));
        }
        if !self.twobit.is_file() {
            return Err(TrackHubError::InvalidCustomGenome(format!(
                "2bit file {} does not exist",
                self.twobit.display()
            )));
        }
        Ok(())
    }
}

/// Where and how to stage a hub.
#[derive(Clone, Debug, PartialEq)]
pub struct HubSpec {
    pub hub_name: String,
    pub genome: String,
    pub outdir: PathBuf,
    pub hub_email: String,
    pub description_html: Option<PathBuf>,
    pub custom_genome: Option<CustomGenome>,
}

/// The files a renderer staged.
#[derive(Clone, Debug, Default)]
pub struct StagedHub {
    pub outdir: PathBuf,
    pub hub_txt: PathBuf,
    pub genomes_txt: PathBuf,
    pub trackdb: PathBuf,
    /// Track files copied into the hub, in table order.
    pub track_files: Vec<PathBuf>,
    pub report: Report,
}

impl StagedHub {
    /// The public URL of the hub file, once the output directory is served
    /// under `url_prefix`.
    pub fn url(&self, url_prefix: &str, hub_name: &str) -> String {
        format!(
            "{}/{}/{}.hub.txt",
            url_prefix.trim_end_matches('/'),
            self.outdir.to_string_lossy().trim_matches('/'),
            hub_name
        )
    }
}

/// Turns a compiled hierarchy into hub files on disk.
pub trait HubRenderer: Send + Sync {
    fn render(&self, design: &TrackDesign, spec: &HubSpec) -> Result<StagedHub, TrackHubError>;
}

/// Replace every character that is not alphanumeric or `_` with `_`.
pub fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

/// A human readable label: separators (`.`, `_`, `-`, `|`, whitespace)
/// become single spaces.
pub fn label(name: &str) -> String {
    name.split(|c: char| matches!(c, '.' | '_' | '-' | '|') || c.is_whitespace())
        .filter(|piece| !piece.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Per-format display settings.
fn format_defaults(ext: &TrackFormat) -> &'static [(&'static str, &'static str)] {
    match ext {
        TrackFormat::BigWig => &[
            ("maxHeightPixels", "100:50:11"),
            ("visibility", "full"),
            ("viewLimits", "0:100"),
            ("autoScale", "on"),
            ("windowingFunction", "mean"),
        ],
        TrackFormat::BigBed => &[("visibility", "pack")],
        TrackFormat::BigGenePred => &[
            ("visibility", "pack"),
            ("baseColorDefault", "genomicCodons"),
        ],
        _ => &[],
    }
}

/// One `trackDb.txt` stanza.
#[derive(Debug, Default)]
struct Stanza {
    fields: Vec<(String, String)>,
}

impl Stanza {
    fn new(track: &str) -> Self {
        let mut stanza = Self::default();
        stanza.add("track", track);
        stanza
    }

    fn add(&mut self, key: &str, value: impl Into<String>) -> &mut Self {
        self.fields.push((key.to_string(), value.into()));
        self
    }

    fn render(&self, depth: usize, out: &mut String) {
        let indent = "    ".repeat(depth);
        for (key, value) in &self.fields {
            out.push_str(&format!("{}{} {}\n", indent, key, value));
        }
        out.push('\n');
    }
}

/// Identifiers of every container, assigned before anything is written.
#[derive(Debug, Default)]
struct Identifiers {
    names: UniqueNames,
    supertracks: IndexMap<GroupKey, String>,
    composites: IndexMap<GroupKey, String>,
    overlays: IndexMap<GroupKey, String>,
}

impl Identifiers {
    fn new(design: &TrackDesign) -> Self {
        let mut ids = Self::default();
        for (key, supertrack) in design.supertracks() {
            let id = ids.names.unique(&sanitize(&supertrack.name));
            ids.supertracks.insert(key.clone(), id);
        }
        for (key, composite) in design.composites() {
            let id = ids.names.unique(&sanitize(&composite.name));
            ids.composites.insert(key.clone(), id);
        }
        for (key, overlay) in design.overlays() {
            let id = ids.names.unique(&sanitize(&overlay.name));
            ids.overlays.insert(key.clone(), id);
        }
        ids
    }

    fn track(&mut self, row: &TrackRow, container: Option<&str>) -> String {
        let base = match container {
            Some(container) => format!("{}_{}", sanitize(&row.name), container),
            None => sanitize(&row.name),
        };
        self.names.unique(&base)
    }
}

/// The default [`HubRenderer`], writing `trackDb.txt` based hubs.
#[derive(Clone, Debug, Default)]
pub struct TrackDbRenderer;

impl TrackDbRenderer {
    pub fn new() -> Self {
        Self
    }

    /// The text of `trackDb.txt` for a design.
    pub fn trackdb(&self, design: &TrackDesign, spec: &HubSpec) -> String {
        let mut writer = TrackDbWriter {
            design,
            group: spec.custom_genome.as_ref().map(|_| spec.hub_name.clone()),
            ids: Identifiers::new(design),
            out: String::new(),
        };
        for node in design.root_nodes() {
            writer.node(node, None, 0);
        }
        writer.out
    }

    fn hub_txt(&self, spec: &HubSpec, description: Option<&str>) -> String {
        let mut out = format!(
            "hub {name}\nshortLabel {name}\nlongLabel {name}\ngenomesFile {name}.genomes.txt\nemail {email}\n",
            name = spec.hub_name,
            email = spec.hub_email
        );
        if let Some(description) = description {
            out.push_str(&format!("descriptionUrl {}/{}\n", spec.genome, description));
        }
        out
    }

    fn genomes_txt(&self, spec: &HubSpec) -> String {
        let genome = &spec.genome;
        let mut out = format!("genome {}\n", genome);
        if let Some(custom) = &spec.custom_genome {
            out.push_str(&format!("twoBitPath {0}/{0}.2bit\n", genome));
            out.push_str(&format!("trackDb {}/trackDb.txt\n", genome));
            out.push_str(&format!("groups {}/groups.txt\n", genome));
            out.push_str(&format!("organism {}\n", custom.organism));
            out.push_str(&format!("defaultPos {}\n", custom.default_position));
            out.push_str(&format!("description {}\n", genome));
            out.push_str(&format!("scientificName {}\n", custom.organism));
        } else {
            out.push_str(&format!("trackDb {}/trackDb.txt\n", genome));
        }
        out
    }

    fn groups_txt(&self, spec: &HubSpec) -> String {
        format!(
            "name {0}\nlabel {0}\npriority 1\ndefaultIsClosed 0\n",
            spec.hub_name
        )
    }
}

/// Copy `source` to `destination`, unless they are already the same file.
fn copy_file(source: &Path, destination: &Path) -> Result<(), TrackHubError> {
    if let (Ok(a), Ok(b)) = (source.canonicalize(), destination.canonicalize()) {
        if a == b {
            return Ok(());
        }
    }
    fs::copy(source, destination)?;
    Ok(())
}

impl HubRenderer for TrackDbRenderer {
    fn render(&self, design: &TrackDesign, spec: &HubSpec) -> Result<StagedHub, TrackHubError> {
        let genome_dir = spec.outdir.join(&spec.genome);
        fs::create_dir_all(&genome_dir)?;
        let mut report = Report::new();

        let mut track_files = Vec::new();
        for row in design.table().rows() {
            let destination = genome_dir.join(&row.file_name);
            if !row.path.is_file() {
                report.add_issue(format!(
                    "Track file {} does not exist and was not staged",
                    row.path.display()
                ));
                continue;
            }
            copy_file(&row.path, &destination)?;
            track_files.push(destination);
        }

        let description = match &spec.description_html {
            Some(html) => {
                let file_name = html
                    .file_name()
                    .map(|name| name.to_string_lossy().to_string())
                    .unwrap_or_else(|| "description.html".to_string());
                copy_file(html, &genome_dir.join(&file_name))?;
                Some(file_name)
            }
            None => None,
        };

        if let Some(custom) = &spec.custom_genome {
            custom.validate()?;
            copy_file(&custom.twobit, &genome_dir.join(format!("{}.2bit", spec.genome)))?;
            OutputFile::new(genome_dir.join("groups.txt")).write_string(&self.groups_txt(spec))?;
        }

        let trackdb = genome_dir.join("trackDb.txt");
        OutputFile::new(&trackdb).write_string(&self.trackdb(design, spec))?;

        let hub_txt = spec.outdir.join(format!("{}.hub.txt", spec.hub_name));
        OutputFile::new(&hub_txt).write_string(&self.hub_txt(spec, description.as_deref()))?;

        let genomes_txt = spec.outdir.join(format!("{}.genomes.txt", spec.hub_name));
        OutputFile::new(&genomes_txt).write_string(&self.genomes_txt(spec))?;

        tracing::info!(
            "staged hub '{}' with {} track files in {}",
            spec.hub_name,
            track_files.len(),
            spec.outdir.display()
        );
        Ok(StagedHub {
            outdir: spec.outdir.clone(),
            hub_txt,
            genomes_txt,
            trackdb,
            track_files,
            report,
        })
    }
}

struct TrackDbWriter<'a> {
    design: &'a TrackDesign,
    group: Option<String>,
    ids: Identifiers,
    out: String,
}

impl<'a> TrackDbWriter<'a> {
    fn finish(&mut self, mut stanza: Stanza, parent: Option<&str>, depth: usize) {
        if let Some(parent) = parent {
            stanza.add("parent", parent);
        }
        if let Some(group) = &self.group {
            stanza.add("group", group.as_str());
        }
        stanza.render(depth, &mut self.out);
    }

    fn node(&mut self, node: &Node, parent: Option<&str>, depth: usize) {
        let design = self.design;
        match node {
            Node::SuperTrack(key) => {
                let (Some(supertrack), Some(id)) =
                    (design.supertracks().get(key), self.ids.supertracks.get(key).cloned())
                else {
                    return;
                };
                let mut stanza = Stanza::new(&id);
                stanza
                    .add("superTrack", "on show")
                    .add("shortLabel", label(&supertrack.name))
                    .add("longLabel", label(&supertrack.name));
                self.finish(stanza, parent, depth);
                for child in &supertrack.children {
                    self.node(child, Some(&id), depth + 1);
                }
            }
            Node::Composite(key) => {
                let (Some(composite), Some(id)) =
                    (design.composites().get(key), self.ids.composites.get(key).cloned())
                else {
                    return;
                };
                let mut stanza = Stanza::new(&id);
                stanza
                    .add("compositeTrack", "on")
                    .add("type", composite.ext.as_str())
                    .add("shortLabel", label(&composite.name))
                    .add("longLabel", label(&composite.name));
                for (i, dimension) in composite.dimensions.iter().enumerate() {
                    let mapping = dimension
                        .values
                        .iter()
                        .map(|value| format!("{}={}", sanitize(value), value))
                        .collect::<Vec<_>>()
                        .join(" ");
                    stanza.add(
                        &format!("subGroup{}", i + 1),
                        format!(
                            "{} {} {}",
                            sanitize(&dimension.column),
                            dimension.label,
                            mapping
                        ),
                    );
                }
                // dimensions refer to the subGroup names above, not the raw columns
                if composite.dimension_string.is_some() && !composite.dimensions.is_empty() {
                    let columns: Vec<String> = composite
                        .dimensions
                        .iter()
                        .map(|dimension| sanitize(&dimension.column))
                        .collect();
                    let dimensions = DIMENSION_SLOTS
                        .iter()
                        .zip(&columns)
                        .map(|(slot, column)| format!("dim{}={}", slot, column))
                        .collect::<Vec<_>>()
                        .join(" ");
                    let sort_order = columns
                        .iter()
                        .map(|column| format!("{}=+", column))
                        .collect::<Vec<_>>()
                        .join(" ");
                    stanza
                        .add("dimensions", dimensions)
                        .add("sortOrder", sort_order);
                }
                stanza
                    .add("visibility", "hide")
                    .add("dragAndDrop", "subTracks");
                self.finish(stanza, parent, depth);

                let subtracks = composite.subtracks.clone();
                let parent_on = format!("{} on", id);
                for index in subtracks {
                    self.track(index, Some(&id), Some(&parent_on), depth + 1, true);
                }
            }
            Node::Overlay(key) => {
                let (Some(overlay), Some(id)) =
                    (design.overlays().get(key), self.ids.overlays.get(key).cloned())
                else {
                    return;
                };
                // every row of this overlay was a non-signal track
                if overlay.subtracks.is_empty() {
                    return;
                }
                let mut stanza = Stanza::new(&id);
                stanza
                    .add("container", "multiWig")
                    .add("aggregate", "transparentOverlay")
                    .add("type", TrackFormat::BigWig.as_str())
                    .add("shortLabel", label(&overlay.name))
                    .add("longLabel", label(&overlay.name))
                    .add("showSubtrackColorOnUi", "on")
                    .add("visibility", "full");
                self.finish(stanza, parent, depth);

                let subtracks = overlay.subtracks.clone();
                for index in subtracks {
                    self.track(index, Some(&id), Some(&id), depth + 1, false);
                }
            }
            Node::Track(index) => self.track(*index, None, parent, depth, false),
        }
    }

    fn track(
        &mut self,
        index: usize,
        container: Option<&str>,
        parent: Option<&str>,
        depth: usize,
        with_subgroups: bool,
    ) {
        let design = self.design;
        let Some(row) = design.table().row(index) else {
            return;
        };
        let id = self.ids.track(row, container);
        let mut stanza = Stanza::new(&id);
        stanza
            .add("type", row.ext.as_str())
            .add("bigDataUrl", row.file_name.as_str())
            .add("shortLabel", label(&row.name))
            .add("longLabel", label(&row.name));
        if let Some(color) = design.row_tags(index).and_then(|tags| tags.color) {
            stanza.add("color", color.to_string());
        }
        if with_subgroups {
            let subgroups = design
                .subgroups(index)
                .into_iter()
                .map(|(column, value)| format!("{}={}", sanitize(&column), sanitize(&value)))
                .collect::<Vec<_>>();
            if !subgroups.is_empty() {
                stanza.add("subGroups", subgroups.join(" "));
            }
        }
        for (key, value) in format_defaults(&row.ext) {
            stanza.add(key, *value);
        }
        self.finish(stanza, parent, depth);
    }
}
