mod cli;
mod error;
mod gate;
mod logging;
mod map;
mod model;
mod orchestrator;
mod results;
mod service;
mod status;
mod text_summary;
#[cfg(feature = "tui")]
mod tui;

use anyhow::Result;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();
    let is_headless = args.is_headless();

    match cli::run(args).await {
        Ok(()) => {
            // Pending status timers must not keep a headless run alive.
            if is_headless {
                std::process::exit(0);
            }
            Ok(())
        }
        Err(e) => Err(e),
    }
}
