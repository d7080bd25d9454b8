use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info, warn};
use tokio::fs::{self, File};
use tokio::time::{sleep, timeout};

use crate::classifier::{classify, FileKind};
use crate::clients::{RemoteTransferClient, TransferReceipt};
use crate::config::Config;
use crate::error::{IntakeError, RemoteCause};

/// Whether to give the writer of a fresh file time to finish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Warmup {
    /// The file is known to be complete (startup sweep).
    None,
    /// Wait, then poll until the size stops changing.
    Settle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WarmupPolicy {
    pub initial_delay: Duration,
    pub check_interval: Duration,
    pub max_checks: u32,
}

impl Default for WarmupPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(100),
            check_interval: Duration::from_millis(50),
            max_checks: 20,
        }
    }
}

/// A file the service accepted.
#[derive(Debug)]
pub struct Delivery {
    pub path: PathBuf,
    pub name: String,
    pub kind: FileKind,
    pub receipt: TransferReceipt,
    pub source_removed: bool,
}

/// What gets handed to the remote client, already read from disk.
enum Submission {
    Torrent(File),
    Magnet(String),
}

impl Submission {
    async fn read(kind: FileKind, path: &Path) -> Result<Self, IntakeError> {
        let read_err = |source| IntakeError::FileRead { path: path.to_path_buf(), source };
        match kind {
            FileKind::TorrentDescriptor => File::open(path).await.map(Submission::Torrent).map_err(read_err),
            FileKind::MagnetLink => fs::read_to_string(path)
                .await
                .map(|text| Submission::Magnet(text.trim_end_matches(['\r', '\n']).to_string()))
                .map_err(read_err),
        }
    }
}

/// Sends one candidate file to the remote service and removes it on success.
pub struct Intake {
    client: Arc<dyn RemoteTransferClient>,
    folder_id: i64,
    callback_url: String,
    deadline: Duration,
    warmup: WarmupPolicy,
}

impl Intake {
    pub fn new(client: Arc<dyn RemoteTransferClient>, config: &Config) -> Self {
        Self {
            client,
            folder_id: config.download_folder_id,
            callback_url: config.callback_url.clone(),
            deadline: config.remote_timeout,
            warmup: WarmupPolicy::default(),
        }
    }

    pub fn with_warmup(mut self, warmup: WarmupPolicy) -> Self {
        self.warmup = warmup;
        self
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    /// Runs [`Intake::process`] and logs the outcome. Never fails.
    pub async fn intake(&self, path: &Path, warmup: Warmup) {
        let result = self.process(path, warmup).await;
        report(path, &result);
    }

    pub async fn process(&self, path: &Path, warmup: Warmup) -> Result<Delivery, IntakeError> {
        let name = base_name(path);
        let kind = classify(&name)?;

        if warmup == Warmup::Settle {
            self.settle(path).await;
        }
        info!("New {} file detected: {}", kind, path.display());

        let submission = Submission::read(kind, path).await?;
        let receipt = self.submit(kind, submission, &name).await?;

        let source_removed = match fs::remove_file(path).await {
            Ok(()) => true,
            Err(e) => {
                warn!("{} was delivered but could not be removed: {}", path.display(), e);
                false
            }
        };
        Ok(Delivery {
            path: path.to_path_buf(),
            name,
            kind,
            receipt,
            source_removed,
        })
    }

    async fn submit(&self, kind: FileKind, submission: Submission, name: &str) -> Result<TransferReceipt, IntakeError> {
        let call = async move {
            match submission {
                Submission::Torrent(file) => self.client.upload(file, name, self.folder_id).await,
                Submission::Magnet(link) => {
                    debug!("magnet data: {}", link);
                    self.client.add_transfer(&link, self.folder_id, &self.callback_url).await
                }
            }
        };
        let cause = match timeout(self.deadline, call).await {
            Ok(Ok(receipt)) => return Ok(receipt),
            Ok(Err(e)) => RemoteCause::Client(e),
            Err(_) => RemoteCause::DeadlineExceeded(self.deadline),
        };
        let name = name.to_string();
        Err(match kind {
            FileKind::TorrentDescriptor => IntakeError::RemoteUpload { name, cause },
            FileKind::MagnetLink => IntakeError::RemoteTransfer { name, cause },
        })
    }

    /// Returns once two consecutive size checks agree, the file vanishes,
    /// or the check budget runs out.
    async fn settle(&self, path: &Path) {
        sleep(self.warmup.initial_delay).await;
        let mut last = None;
        for _ in 0..self.warmup.max_checks {
            let Ok(meta) = fs::metadata(path).await else {
                return;
            };
            let len = Some(meta.len());
            if len == last {
                return;
            }
            last = len;
            sleep(self.warmup.check_interval).await;
        }
        debug!("{} was still growing after {} checks", path.display(), self.warmup.max_checks);
    }
}

/// Logs the outcome of one intake the same way for the sweep and the watcher.
pub fn report(path: &Path, result: &Result<Delivery, IntakeError>) {
    match result {
        Ok(delivery) => info!(
            "Transferred to put.io: {} ({}) at {}",
            delivery.name,
            delivery.receipt.get_readable_size(),
            delivery.receipt.created_at_or_unknown()
        ),
        Err(e) if e.is_unrecognized() => debug!("{}", e),
        Err(e) => error!("{} stays in place: {}", path.display(), e),
    }
}

pub(crate) fn base_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use tempfile::TempDir;
    use tokio::io::AsyncWriteExt;

    use super::*;
    use crate::clients::ClientError;
    use crate::config::OptionData;

    struct Accepting;

    #[async_trait]
    impl RemoteTransferClient for Accepting {
        async fn upload(&self, _file: File, file_name: &str, _folder_id: i64) -> Result<TransferReceipt, ClientError> {
            Ok(TransferReceipt { name: Some(file_name.to_string()), ..Default::default() })
        }

        async fn add_transfer(&self, url: &str, _folder_id: i64, _callback_url: &str) -> Result<TransferReceipt, ClientError> {
            Ok(TransferReceipt { name: Some(url.to_string()), ..Default::default() })
        }
    }

    fn intake() -> Intake {
        let config = Config::load(&OptionData::default(), |key| match key {
            "WATCH_FOLDER" => Some("/unused".to_string()),
            "API_TOKEN" => Some("t".to_string()),
            "DOWNLOAD_FOLDER_ID" => Some("1".to_string()),
            _ => None,
        })
        .unwrap();
        Intake::new(Arc::new(Accepting), &config)
    }

    #[test]
    fn base_name_strips_directories() {
        assert_eq!(base_name(Path::new("/a/b/c.torrent")), "c.torrent");
        assert_eq!(base_name(Path::new("c.magnet")), "c.magnet");
    }

    #[tokio::test]
    async fn magnet_text_loses_only_trailing_line_endings() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("x.magnet");
        std::fs::write(&path, " magnet:?xt=urn:btih:abc&dn=a b\r\n\n").unwrap();

        let delivery = intake().process(&path, Warmup::None).await.unwrap();
        assert_eq!(delivery.receipt.name.as_deref(), Some(" magnet:?xt=urn:btih:abc&dn=a b"));
        assert_eq!(delivery.kind, FileKind::MagnetLink);
        assert!(delivery.source_removed);
    }

    #[tokio::test]
    async fn upload_gets_the_base_name() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("x.torrent");
        std::fs::write(&path, b"d4:infod4:name1:xee").unwrap();

        let delivery = intake().process(&path, Warmup::None).await.unwrap();
        assert_eq!(delivery.receipt.name.as_deref(), Some("x.torrent"));
        assert_eq!(delivery.name, "x.torrent");
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn unrecognized_names_are_not_touched() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("readme.txt");
        std::fs::write(&path, "hello").unwrap();

        let err = intake().process(&path, Warmup::Settle).await.unwrap_err();
        assert!(err.is_unrecognized());
        assert!(path.exists());
    }

    #[tokio::test]
    async fn missing_file_is_a_read_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("gone.magnet");

        let err = intake().process(&path, Warmup::None).await.unwrap_err();
        assert!(matches!(err, IntakeError::FileRead { path: ref p, .. } if p == &path));
    }

    #[tokio::test]
    async fn settle_returns_once_the_size_is_stable() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("done.torrent");
        let mut file = tokio::fs::File::create(&path).await.unwrap();
        file.write_all(b"d8:announce0:e").await.unwrap();
        file.flush().await.unwrap();

        let intake = intake().with_warmup(WarmupPolicy {
            initial_delay: Duration::from_millis(10),
            check_interval: Duration::from_millis(10),
            max_checks: 500,
        });
        let started = std::time::Instant::now();
        intake.settle(&path).await;
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn settle_gives_up_on_a_vanished_file() {
        let dir = TempDir::new().unwrap();
        let intake = intake().with_warmup(WarmupPolicy {
            initial_delay: Duration::from_millis(1),
            check_interval: Duration::from_secs(60),
            max_checks: 5,
        });
        let started = std::time::Instant::now();
        intake.settle(&dir.path().join("never.torrent")).await;
        assert!(started.elapsed() < Duration::from_secs(2));
    }
}
