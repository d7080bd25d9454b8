use std::convert::Infallible;
use std::sync::Arc;

use crate::clients::{PutioClient, RemoteTransferClient};
use crate::config::{Config, ConfigError};
use crate::error::AppError;
use crate::intake::Intake;
use crate::sweep::SweepReport;
use crate::watcher::Dispatcher;

pub mod classifier;
pub mod clients;
pub mod config;
pub mod error;
pub mod intake;
pub mod logging;
pub mod sweep;
pub mod watcher;

pub use classifier::{classify, FileKind};
pub use error::{IntakeError, RemoteCause};

/// Watches the configured folder and forwards torrent and magnet files.
pub struct Watch2Putio {
    config: Arc<Config>,
    intake: Arc<Intake>,
}

impl Watch2Putio {
    pub fn new(config: Config, client: Arc<dyn RemoteTransferClient>) -> Self {
        let intake = Arc::new(Intake::new(client, &config));
        Self { config: Arc::new(config), intake }
    }

    /// Same as [`Watch2Putio::new`] with the real put.io client.
    pub fn with_putio(config: Config) -> Result<Self, AppError> {
        let client = PutioClient::new(config.api_token.clone(), &config.api_url, &config.upload_url)
            .map_err(ConfigError::from)?;
        Ok(Self::new(config, Arc::new(client)))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn intake(&self) -> Arc<Intake> {
        self.intake.clone()
    }

    /// Checks the watch folder and processes what is already in it.
    pub async fn run_sweep_only(&self) -> Result<SweepReport, AppError> {
        sweep::ensure_watch_dir(&self.config.watch_folder).await?;
        sweep::sweep(&self.config.watch_folder, &self.intake).await
    }

    /// Sweeps, then watches until the subscription fails.
    pub async fn start(&self) -> Result<Infallible, AppError> {
        self.run_sweep_only().await?;
        let dir = &self.config.watch_folder;
        let (_watcher, events) = watcher::subscribe(dir)?;
        let dispatcher = Dispatcher::new(self.intake.clone(), self.config.max_concurrent_intakes);
        watcher::watch_loop(dir, events, &dispatcher).await
    }
}
