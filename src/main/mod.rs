use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use tracknado::{
    builder::BuildOptions,
    commands::{
        tracknado_create, tracknado_merge, tracknado_template, tracknado_validate, CreateConfig,
        TrackSource,
    },
    prelude::*,
    render::DEFAULT_POSITION,
};

const INFO: &str = "\
tracknado: generate UCSC track hubs from annotated track files
usage: tracknado [--help] <subcommand>

Subcommands:

  create:   create and stage a hub from track files or a metadata table.
  merge:    merge hubs from their tracknado_config.json sidecars.
  validate: check a staged hub directory or hub.txt file.

";

const DEFAULT_HUB_NAME: &str = "HUB";
const DEFAULT_MERGED_HUB_NAME: &str = "MERGED_HUB";
const DEFAULT_GENOME: &str = "hg38";

#[derive(Parser)]
#[clap(name = "tracknado")]
#[clap(about = INFO)]
struct Cli {
    #[arg(short, long, action = clap::ArgAction::Count)]
    debug: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a UCSC track hub from a set of files.
    Create {
        /// track files (bigWig, bigBed, BED, GTF, ...) to include in the hub
        #[arg(short, long = "input-files", num_args = 1..)]
        input_files: Vec<PathBuf>,

        /// a CSV/TSV of track metadata, with a 'fn' column of file paths
        #[arg(short, long)]
        metadata: Option<PathBuf>,

        /// the directory the hub and tracknado_config.json are staged in
        #[arg(short, long, required_unless_present = "template")]
        output: Option<PathBuf>,

        /// extract metadata from the seqnado output directory layout
        #[arg(long)]
        seqnado: bool,

        /// the short identifier of the hub
        #[arg(long, default_value = DEFAULT_HUB_NAME)]
        hub_name: String,

        /// contact email shown on the hub's description page
        #[arg(long, default_value = "")]
        hub_email: String,

        /// the genome assembly (e.g. hg38, mm10), or the custom genome's name
        #[arg(long, default_value = DEFAULT_GENOME)]
        genome_name: String,

        /// metadata columns to color tracks by
        #[arg(long, num_args = 1..)]
        color_by: Vec<String>,

        /// the color palette (tab10, tab20, tab20b, tab20c, set1, set2, dark2, paired)
        #[arg(long)]
        palette: Option<String>,

        /// metadata columns defining top-level SuperTracks
        #[arg(long, num_args = 1..)]
        supergroup_by: Vec<String>,

        /// metadata columns defining composite track dimensions
        #[arg(long, num_args = 1..)]
        subgroup_by: Vec<String>,

        /// metadata columns defining overlay tracks
        #[arg(long, num_args = 1..)]
        overlay_by: Vec<String>,

        /// the base URL the hub will be served under, for reporting its URL
        #[arg(long)]
        url_prefix: Option<String>,

        /// convert BED to bigBed and GTF/GFF to bigGenePred
        #[arg(long, requires = "chrom_sizes")]
        convert: bool,

        /// a chrom.sizes file of the genome, required by --convert
        #[arg(long)]
        chrom_sizes: Option<PathBuf>,

        /// build an assembly hub for a custom genome
        #[arg(long, requires_all = ["twobit", "organism"])]
        custom_genome: bool,

        /// the .2bit sequence of a custom genome
        #[arg(long, requires = "organism")]
        twobit: Option<PathBuf>,

        /// the organism of a custom genome (e.g. Human, Mouse)
        #[arg(long)]
        organism: Option<String>,

        /// the initial browser position of a custom genome
        #[arg(long, default_value = DEFAULT_POSITION)]
        default_pos: String,

        /// an HTML description page for the hub
        #[arg(long)]
        description: Option<PathBuf>,

        /// write an empty metadata template to this path and exit
        #[arg(short, long)]
        template: Option<PathBuf>,
    },
    /// Merge hubs from their tracknado_config.json sidecars.
    Merge {
        /// sidecar files of previously generated hubs
        #[arg(required = true)]
        configs: Vec<PathBuf>,

        /// the directory the merged hub is staged in
        #[arg(short, long, required = true)]
        output: PathBuf,

        /// re-extract metadata from the seqnado output directory layout
        #[arg(long)]
        seqnado: bool,

        /// the name of the merged hub
        #[arg(long, default_value = DEFAULT_MERGED_HUB_NAME)]
        hub_name: String,

        /// the genome assembly of the merged hub
        #[arg(long, default_value = DEFAULT_GENOME)]
        genome_name: String,

        /// contact email of the merged hub
        #[arg(long, default_value = "")]
        hub_email: String,
    },
    /// Validate a hub directory or hub.txt file.
    Validate {
        /// a hub directory or hub.txt file
        #[arg(required = true)]
        hub_path: PathBuf,

        /// treat warnings as errors
        #[arg(long)]
        strict: bool,
    },
}

/// Install the log subscriber: `RUST_LOG` if set, else a level from the
/// number of `--debug` flags.
fn init_logging(debug: u8) {
    let level = match debug {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn print_report(report: &Report) {
    if !report.is_empty() {
        eprintln!("{} issue(s) were reported:", report.len());
        for issue in report.issues() {
            eprintln!("  - {}", issue);
        }
    }
}

fn run() -> Result<(), TrackHubError> {
    let cli = Cli::parse();
    init_logging(cli.debug);

    let result = match &cli.command {
        Some(Commands::Create {
            input_files,
            metadata,
            output,
            seqnado,
            hub_name,
            hub_email,
            genome_name,
            color_by,
            palette,
            supergroup_by,
            subgroup_by,
            overlay_by,
            url_prefix,
            convert,
            chrom_sizes,
            custom_genome,
            twobit,
            organism,
            default_pos,
            description,
            template,
        }) => {
            if let Some(template) = template {
                tracknado_template(template)?;
                return Ok(());
            }
            let Some(output) = output else {
                return Err(TrackHubError::ArgumentError(clap::Error::raw(
                    clap::error::ErrorKind::MissingRequiredArgument,
                    "missing option '--output'",
                )));
            };
            let source = match metadata {
                Some(metadata) => TrackSource::Table(metadata.clone()),
                None => TrackSource::Files(input_files.clone()),
            };
            let custom_genome = match (twobit, organism) {
                (Some(twobit), Some(organism)) => Some(CustomGenome::new(
                    twobit,
                    organism.as_str(),
                    Some(default_pos.clone()),
                )),
                _ if *custom_genome => {
                    return Err(TrackHubError::InvalidCustomGenome(
                        "--twobit and --organism are required for custom genomes".to_string(),
                    ))
                }
                _ => None,
            };
            let config = CreateConfig {
                seqnado: *seqnado,
                supergroup_by: supergroup_by.clone(),
                subgroup_by: subgroup_by.clone(),
                overlay_by: overlay_by.clone(),
                color_by: color_by.clone(),
                palette: palette.clone(),
                convert: *convert,
                chrom_sizes: chrom_sizes.clone(),
                custom_genome,
            };
            let options = BuildOptions::new(hub_name, genome_name, output)
                .with_email(hub_email)
                .with_description(description.clone());
            tracknado_create(&source, &config, &options, url_prefix.as_deref())
                .map(|output| output.report)
        }
        Some(Commands::Merge {
            configs,
            output,
            seqnado,
            hub_name,
            genome_name,
            hub_email,
        }) => {
            let options = BuildOptions::new(hub_name, genome_name, output).with_email(hub_email);
            tracknado_merge(configs, *seqnado, &options).map(|output| output.report)
        }
        Some(Commands::Validate { hub_path, strict }) => {
            let output = tracknado_validate(hub_path, *strict)?;
            print_report(&output.report);
            if !output.value {
                eprintln!("Hub validation failed: {}", hub_path.display());
                std::process::exit(1);
            }
            Ok(output.report)
        }
        None => {
            println!("{}\n", INFO);
            std::process::exit(1);
        }
    };
    let report = result?;
    print_report(&report);
    Ok(())
}

fn main() {
    match run() {
        Ok(_) => {}
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
