use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use std::path::PathBuf;
use std::process::ExitCode;

use lectern_core::error::LecternError;
use lectern_infrastructure::{ConfigService, JsonCourseRepository, LecternPaths};

mod commands;
mod logging;

use commands::{input, records, snapshots};

#[derive(Parser)]
#[command(name = "lectern")]
#[command(
    about = "Lectern - course record store with atomic writes and rolling backups",
    long_about = None
)]
struct Cli {
    /// Store directory (config.toml, data/, backups/, logs/)
    #[arg(long, global = true, env = "LECTERN_BASE_DIR")]
    base_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print every record
    List,
    /// Add a record (inline JSON, @file, or - for stdin)
    Add { payload: String },
    /// Update fields of the record with ID
    Update { id: String, payload: String },
    /// Remove the record with ID
    Remove { id: String },
    /// Replace the whole document with a JSON array (file, or - for stdin)
    Import { file: String },
    /// List backup snapshots, or show one
    Snapshots {
        /// Snapshot file name to decompress and print
        #[arg(long)]
        show: Option<String>,
    },
}

const EXIT_FAILURE: u8 = 1;
const EXIT_INVALID_INPUT: u8 = 2;
const EXIT_NOT_FOUND: u8 = 4;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            ExitCode::from(exit_status(&err))
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let paths = LecternPaths::resolve(cli.base_dir.as_deref())?;
    let config = ConfigService::new(paths)
        .load()
        .context("Failed to load configuration")?;
    let _guard = logging::init(&config.log_dir)?;

    let repo = JsonCourseRepository::open(&config).await?;
    tracing::debug!("Opened store at {:?}", repo.data_file());

    let output = match cli.command {
        Commands::List => records::list(&repo).await?,
        Commands::Add { payload } => records::add(&repo, input::read_payload(&payload)?).await?,
        Commands::Update { id, payload } => {
            records::update(&repo, &id, input::read_payload(&payload)?).await?
        }
        Commands::Remove { id } => records::remove(&repo, &id).await?,
        Commands::Import { file } => records::import(&repo, input::read_document(&file)?).await?,
        Commands::Snapshots { show: None } => snapshots::list(&repo).await?,
        Commands::Snapshots { show: Some(name) } => snapshots::show(&repo, &name).await?,
    };

    print_json(&output)
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn exit_status(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<LecternError>() {
        Some(e) if e.is_not_found() => EXIT_NOT_FOUND,
        Some(e) if e.is_validation() => EXIT_INVALID_INPUT,
        _ => EXIT_FAILURE,
    }
}
