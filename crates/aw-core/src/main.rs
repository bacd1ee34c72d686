//! adwatch command-line entry point.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::error;
use tracing_subscriber::EnvFilter;

use aw_common::Error;
use aw_core::coordinator::{Coordinator, Request};
use aw_core::replay::{self, Scenario};
use aw_core::SystemClock;
use aw_store::{negotiate, resolve_data_dir, MemoryBackend, SettingsStore};

#[derive(Parser, Debug)]
#[command(name = "adwatch", version, about = "In-page ad watcher engine")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Replay a scripted page scenario through the full engine
    Replay {
        /// Path to the scenario JSON file
        #[arg(long, value_name = "FILE")]
        scenario: PathBuf,
        /// Pretty-print the report
        #[arg(long)]
        pretty: bool,
    },
    /// Read the persisted watcher state
    State,
    /// Enable or disable the watcher in the persisted state
    SetState {
        #[arg(long, action = clap::ArgAction::Set)]
        enabled: bool,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(code = err.code(), "{err}");
            ExitCode::from(err.code().min(u8::MAX as u32) as u8)
        }
    }
}

fn run(cli: Cli) -> Result<(), Error> {
    match cli.command {
        Command::Replay { scenario, pretty } => {
            let scenario = Scenario::from_path(&scenario)?;
            let report = replay::run(&scenario)?;
            let rendered = if pretty {
                serde_json::to_string_pretty(&report)?
            } else {
                serde_json::to_string(&report)?
            };
            println!("{rendered}");
            Ok(())
        }
        Command::State => {
            let mut coordinator = local_coordinator()?;
            let response = coordinator.handle(Request::GetWatcherState);
            println!("{}", serde_json::to_string(&response)?);
            Ok(())
        }
        Command::SetState { enabled } => {
            let mut coordinator = local_coordinator()?;
            let response = coordinator.handle(Request::SetWatcherState { enabled });
            println!("{}", serde_json::to_string(&response)?);
            Ok(())
        }
    }
}

/// Coordinator over the negotiated store. There is no shared primary
/// store in the CLI, so negotiation always lands on the local fallback.
fn local_coordinator() -> Result<Coordinator, Error> {
    let data_dir = resolve_data_dir().map_err(|err| Error::Storage(err.to_string()))?;
    let negotiated = negotiate(Box::new(MemoryBackend::unavailable()), &data_dir);
    let store = SettingsStore::new(negotiated.backend);
    let mut coordinator = Coordinator::new(store, Box::new(SystemClock::new()));
    coordinator
        .ensure_defaults()
        .map_err(|err| Error::Storage(err.to_string()))?;
    Ok(coordinator)
}
