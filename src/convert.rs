//! Conversion of non-native track files (BED, GTF/GFF) into browser formats.
//!
//! The [`Converter`] trait is the seam the [`HubBuilder`](crate::builder::HubBuilder)
//! calls through; [`UcscConverter`] is the default, which shells out to the
//! UCSC command line utilities.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::{
    error::TrackHubError, formats::TrackFormat, io::OutputFile, unique_name::UniqueNames,
};

/// The biocontainers image used when `bedToBigBed` is not installed.
pub const BED_TO_BIGBED_IMAGE: &str = "quay.io/biocontainers/ucsc-bedtobigbed:447--h29774a3_3";

/// autoSql definition of the bigGenePred format.
const BIG_GENE_PRED_AS: &str = r#"table bigGenePred
"bigGenePred gene models"
   (
   string chrom;       "Reference sequence chromosome or scaffold"
   uint   chromStart;  "Start position in chromosome"
   uint   chromEnd;    "End position in chromosome"
   string name;        "Name or ID of item, ideally both human readable and unique"
   uint score;         "Score (0-1000)"
   char[1] strand;     "+ or - for strand"
   uint thickStart;    "Start of where display should be thick (start codon)"
   uint thickEnd;      "End of where display should be thick (stop codon)"
   uint reserved;      "RGB value (use R,G,B string in input file)"
   int blockCount;     "Number of blocks"
   int[blockCount] blockSizes; "Comma separated list of block sizes"
   int[blockCount] chromStarts; "Start positions relative to chromStart"
   string name2;       "Alternative/human readable name"
   string cdsStartStat; "Status of CDS start annotation (none, unknown, incomplete, or complete)"
   string cdsEndStat;   "Status of CDS end annotation (none, unknown, incomplete, or complete)"
   int[blockCount] exonFrames; "Exon frame {0,1,2}, or -1 if no frame for exon"
   string type;        "Transcript type"
   string geneName;    "Primary identifier for gene"
   string geneName2;   "Alternative/human readable gene name"
   string geneType;    "Gene type"
   )
"#;

/// Converts a single track file into a browser-native format.
///
/// Implementations must write the converted file to `output` and return its
/// path. A missing chromosome sizes file or a missing tool is fatal.
pub trait Converter: Send + Sync {
    fn convert(
        &self,
        input: &Path,
        chrom_sizes: &Path,
        output: &Path,
    ) -> Result<PathBuf, TrackHubError>;
}

/// The path a converted track is written to: `<outdir>/converted/<stem>.bb`,
/// or `<stem>_<n>.bb` when an earlier input of the same build had that stem.
pub fn converted_path(outdir: &Path, input: &Path, names: &mut UniqueNames) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_default();
    let file_name = names.unique_file_name(&format!("{}.bb", stem));
    outdir.join("converted").join(file_name)
}

/// Locates UCSC tools on the local machine, or a container engine that can
/// run them.
#[derive(Clone, Debug, Default)]
pub struct ToolFinder;

impl ToolFinder {
    /// Search `PATH`, then `~/bin`, for an executable named `tool`.
    pub fn find_local(tool: &str) -> Option<PathBuf> {
        let mut candidates: Vec<PathBuf> = env::var_os("PATH")
            .map(|paths| env::split_paths(&paths).map(|dir| dir.join(tool)).collect())
            .unwrap_or_default();
        if let Some(home) = env::var_os("HOME") {
            candidates.push(PathBuf::from(home).join("bin").join(tool));
        }
        candidates.into_iter().find(|path| is_executable(path))
    }

    /// A command prefix running `tool` through Apptainer, Singularity or
    /// Docker, if a container image is known for it and an engine is installed.
    pub fn container_command(tool: &str) -> Option<Vec<String>> {
        if tool != "bedToBigBed" {
            return None;
        }
        let image = format!("docker://{}", BED_TO_BIGBED_IMAGE);
        for engine in ["apptainer", "singularity"] {
            if Self::find_local(engine).is_some() {
                return Some(vec![
                    engine.to_string(),
                    "exec".to_string(),
                    image,
                    tool.to_string(),
                ]);
            }
        }
        if Self::find_local("docker").is_some() {
            let cwd = env::current_dir().ok()?.to_string_lossy().to_string();
            return Some(vec![
                "docker".to_string(),
                "run".to_string(),
                "--rm".to_string(),
                "-v".to_string(),
                format!("{}:{}", cwd, cwd),
                "-w".to_string(),
                cwd,
                BED_TO_BIGBED_IMAGE.to_string(),
                tool.to_string(),
            ]);
        }
        None
    }

    /// The command prefix for `tool`: the local binary if there is one,
    /// otherwise a container command.
    pub fn command(tool: &str, force_container: bool) -> Result<Vec<String>, TrackHubError> {
        if !force_container {
            if let Some(local) = Self::find_local(tool) {
                return Ok(vec![local.to_string_lossy().to_string()]);
            }
        }
        Self::container_command(tool).ok_or_else(|| TrackHubError::ToolNotFound(tool.to_string()))
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    fs::metadata(path)
        .map(|metadata| metadata.is_file() && metadata.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// Run a command to completion, turning a non-zero exit into
/// [`TrackHubError::ToolFailed`].
fn run(tool: &str, command: &mut Command) -> Result<(), TrackHubError> {
    tracing::debug!("running {:?}", command);
    let output = command.stderr(Stdio::piped()).output()?;
    if !output.status.success() {
        return Err(TrackHubError::ToolFailed {
            tool: tool.to_string(),
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(())
}

/// Sort a BED-like file by chromosome then start, into a temporary file.
fn sort_bed(input: &Path) -> Result<tempfile::NamedTempFile, TrackHubError> {
    let sorted = tempfile::Builder::new().suffix(".sorted.bed").tempfile()?;
    let mut command = Command::new("sort");
    command
        .args(["-k1,1", "-k2,2n"])
        .arg(input)
        .env("LC_ALL", "C")
        .stdout(Stdio::from(sorted.reopen()?));
    run("sort", &mut command)?;
    Ok(sorted)
}

/// The default converter, built on the UCSC utilities: BED is converted with
/// `bedToBigBed`, GTF/GFF with `gtfToGenePred`, `genePredToBigGenePred`
/// and then `bedToBigBed`.
#[derive(Clone, Debug, Default)]
pub struct UcscConverter {
    /// Run `bedToBigBed` in a container even if it is installed locally.
    pub force_container: bool,
}

impl UcscConverter {
    pub fn new() -> Self {
        Self::default()
    }

    fn bed_to_bigbed(
        &self,
        input: &Path,
        chrom_sizes: &Path,
        output: &Path,
        extra_args: &[String],
    ) -> Result<(), TrackHubError> {
        let prefix = ToolFinder::command("bedToBigBed", self.force_container)?;
        let sorted = sort_bed(input)?;

        let mut command = Command::new(&prefix[0]);
        command
            .args(&prefix[1..])
            .args(extra_args)
            .arg(sorted.path())
            .arg(chrom_sizes)
            .arg(output);
        run("bedToBigBed", &mut command)
    }

    fn convert_bed(
        &self,
        input: &Path,
        chrom_sizes: &Path,
        output: &Path,
    ) -> Result<(), TrackHubError> {
        tracing::info!("converting {} to bigBed", input.display());
        self.bed_to_bigbed(input, chrom_sizes, output, &[])
    }

    fn convert_gtf(
        &self,
        input: &Path,
        chrom_sizes: &Path,
        output: &Path,
    ) -> Result<(), TrackHubError> {
        tracing::info!("converting {} to bigGenePred", input.display());
        let gtf_to_gene_pred = ToolFinder::find_local("gtfToGenePred")
            .ok_or_else(|| TrackHubError::ToolNotFound("gtfToGenePred".to_string()))?;
        let to_big_gene_pred = ToolFinder::find_local("genePredToBigGenePred")
            .ok_or_else(|| TrackHubError::ToolNotFound("genePredToBigGenePred".to_string()))?;

        let scratch = tempfile::tempdir()?;
        let gene_pred = scratch.path().join("genes.gp");
        let big_gene_pred = scratch.path().join("genes.bgpInput");
        let autosql = scratch.path().join("bigGenePred.as");
        OutputFile::new(&autosql).write_string(BIG_GENE_PRED_AS)?;

        let mut command = Command::new(gtf_to_gene_pred);
        command.arg("-genePredExt").arg(input).arg(&gene_pred);
        run("gtfToGenePred", &mut command)?;

        let mut command = Command::new(to_big_gene_pred);
        command.arg(&gene_pred).arg(&big_gene_pred);
        run("genePredToBigGenePred", &mut command)?;

        let extra_args = vec![
            "-type=bed12+8".to_string(),
            "-tab".to_string(),
            format!("-as={}", autosql.display()),
        ];
        self.bed_to_bigbed(&big_gene_pred, chrom_sizes, output, &extra_args)
    }
}

impl Converter for UcscConverter {
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
        match TrackFormat::from_path(input) {
            TrackFormat::Gtf => self.convert_gtf(input, chrom_sizes, output)?,
            _ => self.convert_bed(input, chrom_sizes, output)?,
        }
        tracing::info!("created {}", output.display());
        Ok(output.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_converted_path() {
        let mut names = UniqueNames::new();
        let path = converted_path(Path::new("/hub"), Path::new("/data/peaks.bed"), &mut names);
        assert_eq!(path, PathBuf::from("/hub/converted/peaks.bb"));
        let path = converted_path(Path::new("out"), Path::new("genes.gtf"), &mut names);
        assert_eq!(path, PathBuf::from("out/converted/genes.bb"));
        // same stem from another directory, or another format
        let path = converted_path(Path::new("/hub"), Path::new("/other/peaks.bed"), &mut names);
        assert_eq!(path, PathBuf::from("/hub/converted/peaks_1.bb"));
        let path = converted_path(Path::new("/hub"), Path::new("/data/peaks.gtf"), &mut names);
        assert_eq!(path, PathBuf::from("/hub/converted/peaks_2.bb"));
    }

    #[test]
    fn test_missing_chrom_sizes() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("peaks.bed");
        OutputFile::new(&input).write_string("chr1\t1\t10\n").unwrap();
        let result = UcscConverter::new().convert(
            &input,
            &dir.path().join("missing.chrom.sizes"),
            &dir.path().join("peaks.bb"),
        );
        assert!(matches!(result, Err(TrackHubError::MissingChromSizes(Some(_)))));
    }

    #[test]
    fn test_find_local_unknown_tool() {
        assert!(ToolFinder::find_local("definitely-not-a-real-ucsc-tool").is_none());
        assert!(ToolFinder::container_command("definitely-not-a-real-ucsc-tool").is_none());
        assert!(matches!(
            ToolFinder::command("definitely-not-a-real-ucsc-tool", false),
            Err(TrackHubError::ToolNotFound(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_sort_bed() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("peaks.bed");
        OutputFile::new(&input)
            .write_string("chr2\t5\t10\nchr1\t20\t30\nchr1\t3\t9\n")
            .unwrap();
        let sorted = sort_bed(&input).unwrap();
        let contents = fs::read_to_string(sorted.path()).unwrap();
        assert_eq!(contents, "chr1\t3\t9\nchr1\t20\t30\nchr2\t5\t10\n");
    }
}
