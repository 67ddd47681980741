//! JT808 Console - Main Entry Point
//!
//! Command-line admin console for the JT808 vehicle telemetry backend.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing::info;

use jt808_console_lib::{
    api::locations::ExportQuery, api::vehicles::VehicleQuery, commands, config::ClientConfig,
    logging, AppState,
};

#[derive(Parser)]
#[command(name = "jt808-console", version, about = "Admin console for the JT808 telemetry backend")]
struct Cli {
    /// Backend origin, overrides JT808_API_URL
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sign in and save the session
    Login {
        #[arg(short, long)]
        username: String,
        #[arg(short, long, env = "JT808_PASSWORD")]
        password: String,
    },
    /// Forget the saved session
    Logout,
    /// Show the signed-in user
    Whoami {
        /// Re-fetch the user from the backend
        #[arg(long)]
        refresh: bool,
    },
    /// List registered vehicles
    Vehicles {
        #[arg(long)]
        page: Option<u32>,
        #[arg(long)]
        size: Option<u32>,
        #[arg(long)]
        plate: Option<String>,
    },
    /// Summarize a vehicle's track over a date range
    Track {
        terminal_phone: String,
        #[arg(long)]
        start: NaiveDate,
        #[arg(long)]
        end: NaiveDate,
        /// Minimum seconds between track points
        #[arg(long)]
        min_interval: Option<u32>,
    },
    /// Download location records
    Export {
        #[arg(long)]
        terminal_phone: Option<String>,
        #[arg(long)]
        start: Option<NaiveDate>,
        #[arg(long)]
        end: Option<NaiveDate>,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// List terminal connections
    Connections,
    /// Show proxy system status
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();
    info!("JT808 Console starting...");

    let cli = Cli::parse();

    let mut config = ClientConfig::from_env();
    if let Some(url) = &cli.api_url {
        config = config.with_api_base_url(url);
    }

    let state = AppState::init(config)?;
    let mut events = state.events.subscribe();

    let result = match cli.command {
        Command::Login { username, password } => commands::login(&state, &username, &password).await,
        Command::Logout => {
            commands::logout(&state);
            Ok(())
        }
        Command::Whoami { refresh } => commands::whoami(&state, refresh).await,
        Command::Vehicles { page, size, plate } => {
            let query = VehicleQuery {
                page,
                size,
                plate_number: plate,
                ..Default::default()
            };
            commands::vehicles(&state, &query).await
        }
        Command::Track {
            terminal_phone,
            start,
            end,
            min_interval,
        } => commands::track(&state, &terminal_phone, start, end, min_interval).await,
        Command::Export {
            terminal_phone,
            start,
            end,
            output,
        } => {
            let query = ExportQuery {
                terminal_phone,
                start_date: start,
                end_date: end,
            };
            commands::export(&state, &query, &output).await
        }
        Command::Connections => commands::connections(&state).await,
        Command::Status => commands::status(&state).await,
    };

    commands::relay_events(&mut events);
    result
}
