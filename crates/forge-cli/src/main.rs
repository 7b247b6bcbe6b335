//! forge-browse - Inspect forge location indexes and decode record dumps
//!
//! Usage:
//!   forge-browse types                       - List the known record types
//!   forge-browse index [file.ld]             - Show location index information
//!   forge-browse lookup <ids> [file.ld]      - Find records in a location index
//!   forge-browse decode <record>             - Decode a record dump
//!   forge-browse texture <record>            - Convert a texture record to DDS
//!   forge-browse textures <dir>              - Convert every texture record in a directory

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

use forge_browse::forge_utils::{
    convert_texture, convert_textures, decode_record_file, list_types, lookup_ids,
    show_index_info,
};
use forge_browse::{BrowserOptions, DecodeOptions};

#[derive(Parser)]
#[command(name = "forge-browse")]
#[command(version = "0.1.0")]
#[command(about = "Inspect forge archive records and location indexes", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Options file (config.json); defaults apply when it is missing
    #[arg(short, long, global = true, default_value = "config.json")]
    config: PathBuf,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// List the record types the decoder understands
    Types,
    /// Show location index information
    Index {
        /// Path to the .ld file (default: from the options file)
        file: Option<PathBuf>,
    },
    /// Look up record IDs in a location index
    Lookup {
        /// Comma-separated hex record IDs
        ids: String,
        /// Path to the .ld file (default: from the options file)
        file: Option<PathBuf>,
        /// Prefer locations in this archive
        #[arg(short, long)]
        archive: Option<String>,
    },
    /// Decode a standalone record dump
    Decode {
        /// Record file, header included
        record_file: PathBuf,
        /// Print the decoded tree as JSON
        #[arg(long)]
        json: bool,
        /// Trace every primitive read and write per-type samples to the dump folder
        #[arg(long)]
        dev: bool,
    },
    /// Convert a compiled texture record to DDS
    Texture {
        /// Record file, header included
        record_file: PathBuf,
        /// Output file (default: input with a .dds extension)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Convert every texture record under a directory to DDS
    Textures {
        /// Input directory
        input_dir: PathBuf,
        /// Output directory (default: the dump folder from the options file)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Filter pattern (e.g., *.tex, Diffuse)
        #[arg(short, long)]
        filter: Option<String>,
    },
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::INFO,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let options = BrowserOptions::load(&cli.config)?;

    let dev = matches!(cli.command, Commands::Decode { dev: true, .. });
    init_logging(if dev || options.diagnostic { 2 } else { cli.verbose });

    match cli.command {
        Commands::Types => list_types(),
        Commands::Index { file } => {
            let file = file.unwrap_or_else(|| options.light_dict_path());
            show_index_info(&file)?;
        }
        Commands::Lookup { ids, file, archive } => {
            let file = file.unwrap_or_else(|| options.light_dict_path());
            lookup_ids(&file, &ids, archive.as_deref())?;
        }
        Commands::Decode {
            record_file,
            json,
            dev,
        } => {
            let options = BrowserOptions {
                diagnostic: dev || options.diagnostic,
                ..options
            };
            decode_record_file(&record_file, json, DecodeOptions::from(&options))?;
        }
        Commands::Texture {
            record_file,
            output,
        } => {
            convert_texture(&record_file, output.as_deref())?;
        }
        Commands::Textures {
            input_dir,
            output,
            filter,
        } => {
            let output = output.unwrap_or_else(|| options.dump_folder.clone());
            convert_textures(&input_dir, &output, filter.as_deref())?;
        }
    }

    Ok(())
}
