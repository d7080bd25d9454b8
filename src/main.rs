#[macro_use]
extern crate log;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::LevelFilter;

use watch2putio::config::Config;
use watch2putio::error::AppError;
use watch2putio::logging::{self, LogTarget};
use watch2putio::Watch2Putio;

/// Forwards torrent and magnet files dropped into a folder to put.io.
///
/// Required environment: WATCH_FOLDER, API_TOKEN, DOWNLOAD_FOLDER_ID.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// TOML file with defaults for any setting; the environment wins.
    #[arg(long, env = "WATCH2PUTIO_OPTIONS")]
    options: Option<PathBuf>,

    /// Log to the local syslog instead of the terminal.
    #[arg(long)]
    syslog: bool,

    #[arg(long, default_value = "info")]
    log_level: LevelFilter,

    /// Process the files already in the folder, then exit.
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let target = if cli.syslog { LogTarget::Syslog } else { LogTarget::Terminal };
    if let Err(e) = logging::init(target, cli.log_level) {
        eprintln!("could not start logging: {e:#}");
        return ExitCode::FAILURE;
    }
    info!("watch2putio started");

    match run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli) -> Result<(), AppError> {
    let options = Config::read_options(cli.options.as_deref()).await?;
    let config = Config::from_env(&options)?;
    debug!("{:?}", config);
    let app = Watch2Putio::with_putio(config)?;

    if cli.once {
        app.run_sweep_only().await?;
        return Ok(());
    }
    match app.start().await {
        Ok(never) => match never {},
        Err(e) => Err(e),
    }
}
