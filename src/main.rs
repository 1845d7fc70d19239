//! reelplay - feed media cache and playback coordinator
//!
//! Shadows remote feed images and videos with local copies and keeps at most
//! one feed video playing at a time.
//!
//! # Usage
//!
//! ```bash
//! reelplay resolve https://cdn.example.com/p/42.jpg --wait
//! reelplay probe https://cdn.example.com/v/42.mp4 --json
//! reelplay feed https://x/1.mp4 https://x/2.mp4 https://x/3.mp4 --bounce
//! reelplay clear
//! ```

mod cli;
mod commands;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::cli::{Cli, Command, ExitCode, Output};
use reelplay::config::Config;
use reelplay::MediaService;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays parseable
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| cli.log_filter().into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let exit_code = run_cli(cli).await;
    std::process::exit(exit_code.into());
}

/// Run CLI command and return exit code
async fn run_cli(cli: Cli) -> ExitCode {
    let output = Output::new(&cli);

    let config = match &cli.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    };
    if let Err(e) = config.validate() {
        return output.error(format!("Invalid config: {}", e), ExitCode::InvalidArgs);
    }

    let service = MediaService::from_config(&config);

    match cli.command {
        Command::Resolve(cmd) => commands::resolve_cmd(cmd, &service, &output).await,

        Command::Probe(cmd) => commands::probe_cmd(cmd, &config, &output).await,

        Command::Warm(cmd) => commands::warm_cmd(cmd, &service, &output).await,

        Command::Feed(cmd) => commands::feed_cmd(cmd, &service, &config, &output).await,

        Command::Open(cmd) => commands::open_cmd(cmd, &service, &config, &output).await,

        Command::Path(cmd) => commands::path_cmd(cmd, &service, &output).await,

        Command::Clear(cmd) => commands::clear_cmd(cmd, &service, &output).await,
    }
}
