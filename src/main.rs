use clap::{Parser, Subcommand};
use log::warn;
use mixread::archive::MixArchive;
use mixread::database::{MixDatabase, StringFraming, DEFAULT_DATABASE_PATH};
use mixread::file_id;
use mixread::io_stream::Layout;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "mixread", about = "Westwood MIX container header decoder")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List header records, resolving names through the name database
    List {
        input: PathBuf,
        #[arg(short, long, default_value = DEFAULT_DATABASE_PATH)]
        database: PathBuf,
        /// Database strings are u32-length-prefixed instead of NUL-terminated
        #[arg(long)]
        length_prefixed: bool,
        /// Print the listing as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show header layout and flags
    Info {
        input: PathBuf,
    },
    /// Print the record id of each file name
    Hash {
        #[arg(required = true, num_args = 1..)]
        names: Vec<String>,
    },
    /// Copy one entry's bytes out of the container
    Extract {
        input: PathBuf,
        /// File name, or a hex id prefixed with 0x
        entry: String,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    match Cli::parse().command {

        // ── List ─────────────────────────────────────────────────────────────
        Commands::List { input, database, length_prefixed, json } => {
            let framing = if length_prefixed { StringFraming::LengthPrefixed } else { StringFraming::NulTerminated };
            let db = MixDatabase::load_file(&database, framing).unwrap_or_else(|e| {
                warn!("names unavailable, could not load {}: {e}", database.display());
                MixDatabase::default()
            });
            let ar = MixArchive::open(&input)?;
            let entries = ar.list(&db);

            if json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
                return Ok(());
            }

            println!("Archive: {} ({}, {} files)", input.display(), ar.layout().name(), entries.len());
            println!("{:<10} {:>10} {:>10}  Name", "Id", "Offset", "Size");
            for e in &entries {
                println!("{:08x}   {:>10} {:>10}  {}",
                    e.file_id, e.offset, e.size,
                    e.name.as_deref().unwrap_or("<unknown>"));
            }
        }

        // ── Info ─────────────────────────────────────────────────────────────
        Commands::Info { input } => {
            let ar = MixArchive::open(&input)?;
            let d  = ar.decoded();

            println!("── MIX container ────────────────────────────────────────");
            println!("  Path           {}", input.display());
            println!("  Layout         {}", d.layout.name());
            if let Layout::Modern { flags } = d.layout {
                println!("  Encrypted      {}", flags.has_encryption);
                println!("  Checksum flag  {}", flags.has_checksum);
            }
            println!("  Files          {}", d.header.num_files);
            println!("  Data size      {} B", d.header.data_size);
            println!("  Body offset    {} B", d.body_offset);
        }

        // ── Hash ─────────────────────────────────────────────────────────────
        Commands::Hash { names } => {
            for name in &names {
                println!("{}  {}", hex::encode(file_id(name).to_be_bytes()), name);
            }
        }

        // ── Extract ──────────────────────────────────────────────────────────
        Commands::Extract { input, entry, output } => {
            let mut ar = MixArchive::open(&input)?;
            let id = parse_entry(&entry)?;
            let data = ar.read_file_by_id(id)?;
            let output = output.unwrap_or_else(|| PathBuf::from(&entry));
            std::fs::write(&output, &data)?;
            println!("Extracted {} bytes → {}", data.len(), output.display());
        }
    }

    Ok(())
}

// ── helpers ──────────────────────────────────────────────────────────────────

fn parse_entry(s: &str) -> Result<u32, std::num::ParseIntError> {
    match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None      => Ok(file_id(s)),
    }
}
