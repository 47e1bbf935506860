//! stateful-processor CLI — run a resumable job over a manifest of items.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use stateful_processor::config::Config;
use stateful_processor::engine::Termination;
use stateful_processor::job::{CommandWorker, ManifestItemSource, SuffixWorker};
use stateful_processor::telemetry::{TelemetryConfig, init_telemetry};
use stateful_processor::{
    EngineOptions, ItemSource, JsonFileStore, ProcessingEngine, RunSummary, SnapshotStore, Worker,
};

#[derive(Parser)]
#[command(name = "stateful-processor", version, about = "Resumable item-by-item batch jobs")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Process every item in a manifest, skipping ones already recorded
    Run {
        /// TOML manifest with an `items = [...]` array
        #[arg(long)]
        items: PathBuf,
        /// Snapshot file (defaults to SNAPSHOT_PATH, then state.json)
        #[arg(long)]
        snapshot: Option<PathBuf>,
        /// Load the existing snapshot before running
        #[arg(long)]
        resume: bool,
        /// Executable run once per item with ITEM set; stdout is the result
        #[arg(long, conflicts_with_all = ["suffix", "delay_ms"])]
        command: Option<PathBuf>,
        /// Suffix appended to each item when no command is given
        #[arg(long, default_value = "!")]
        suffix: String,
        /// Pause inside each suffix worker call
        #[arg(long, default_value_t = 0)]
        delay_ms: u64,
    },
    /// Print the current snapshot
    Show {
        /// Snapshot file (defaults to SNAPSHOT_PATH, then state.json)
        #[arg(long)]
        snapshot: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = Config::from_env()?;

    match cli.command {
        Command::Run {
            items,
            snapshot,
            resume,
            command,
            suffix,
            delay_ms,
        } => {
            let exit_code = {
                let _guard = init_telemetry(TelemetryConfig::from_config(&config))?;

                let store = JsonFileStore::new(snapshot.unwrap_or(config.snapshot_path));
                // The engine hands interrupts back here so the telemetry
                // guard can flush before the process exits.
                let options = EngineOptions {
                    resume: resume || config.resume,
                    termination: Termination::Return,
                    ..Default::default()
                };
                let source = ManifestItemSource::new(items);

                let summary = match command {
                    Some(command) => {
                        cmd_run(store, options, &source, &CommandWorker::new(command)).await?
                    }
                    None => {
                        let worker =
                            SuffixWorker::new(suffix).delay(Duration::from_millis(delay_ms));
                        cmd_run(store, options, &source, &worker).await?
                    }
                };

                println!(
                    "{}: {} processed, {} skipped, {} total",
                    summary.outcome, summary.processed, summary.skipped, summary.total
                );
                summary.exit_code()
            };

            if let Some(code) = exit_code {
                std::process::exit(code);
            }
            Ok(())
        }
        Command::Show { snapshot } => {
            let store = JsonFileStore::new(snapshot.unwrap_or(config.snapshot_path));
            let snapshot = store.load().await?;
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
            Ok(())
        }
    }
}

async fn cmd_run<I: ItemSource, W: Worker>(
    store: JsonFileStore,
    options: EngineOptions,
    source: &I,
    worker: &W,
) -> anyhow::Result<RunSummary> {
    let mut engine = ProcessingEngine::new(store, options).await?;
    Ok(engine.run(source, worker).await?)
}
