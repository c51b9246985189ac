use clap::{Parser, Subcommand};
use mm_core::config::Settings;
use mm_core::types::StatsView;
use mm_core::{Motomap, MotomapError};
use mm_db::DbStore;
use owo_colors::OwoColorize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mm", about = "Parking spot occupancy from vehicle detections")]
struct Cli {
    /// Settings file. Missing files fall back to defaults.
    #[arg(long, global = true, default_value = "motomap.toml")]
    config: PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the ingestion and dashboard server.
    Serve {
        #[arg(long)]
        port: Option<u16>,
    },
    /// Print occupancy statistics.
    Stats,
    /// Delete every stored detection.
    Clear {
        #[arg(long)]
        yes: bool,
    },
    /// Print the OpenAPI document.
    Openapi,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(%err, "command failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), MotomapError> {
    if let Command::Openapi = cli.command {
        println!("{}", mm_serve::openapi::generate_spec());
        return Ok(());
    }

    let settings = Settings::load(&cli.config)?;
    let store = open_store(&settings.db_path)?;
    match cli.command {
        Command::Serve { port } => {
            let port = port.unwrap_or(settings.port);
            info!(db_path = %settings.db_path, total_spots = settings.total_spots, "starting");
            let state = mm_serve::AppState::new(store, &settings);
            mm_serve::serve(state, &settings.host, port)
                .await
                .map_err(|err| MotomapError::Internal {
                    message: format!("serve error: {err}"),
                })
        }
        Command::Stats => {
            let motomap = Motomap::new(store, settings.occupancy());
            print_stats(&motomap.occupancy().stats()?);
            Ok(())
        }
        Command::Clear { yes } => {
            if !yes {
                eprintln!("refusing to clear {} without --yes", settings.db_path);
                return Err(MotomapError::Internal {
                    message: "clear not confirmed".to_string(),
                });
            }
            Motomap::new(store, settings.occupancy())
                .detections()
                .clear_all()?;
            println!("store cleared");
            Ok(())
        }
        Command::Openapi => Ok(()),
    }
}

fn open_store(db_path: &str) -> Result<DbStore, MotomapError> {
    if let Some(parent) = Path::new(db_path).parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|err| MotomapError::Internal {
            message: format!("cannot create {}: {err}", parent.display()),
        })?;
    }
    Ok(DbStore::open(db_path)?)
}

fn print_stats(stats: &StatsView) {
    println!("{}", "MotoMap".bold());
    println!("  detections   {}", stats.total_detections.cyan());
    println!("  with plate   {}", stats.detections_with_plate.cyan());
    println!(
        "  occupied     {} / {}",
        stats.occupied_spots.green(),
        stats.total_spots
    );
    if stats.recent_plates.is_empty() {
        println!("  no plates read yet");
        return;
    }
    println!("{}", "Recent plates".bold());
    for reading in &stats.recent_plates {
        println!(
            "  {:<10} {:.2}  {}",
            reading.plate.yellow(),
            reading.confidence,
            reading.received_at.to_rfc3339()
        );
    }
}
