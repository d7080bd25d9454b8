use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::clients::ClientError;
use crate::config::ConfigError;

/// Failures that stop the whole process.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("cannot access watch folder {path:?}: {source}")]
    DirectoryAccess {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("watcher subscription on {path:?} failed: {reason}")]
    WatcherSubscription { path: PathBuf, reason: String },
}

/// Failures that only concern a single candidate file.
///
/// These never leave the intake boundary: they are logged and the file is
/// left where it is.
#[derive(Debug, Error)]
pub enum IntakeError {
    #[error("file isn't a torrent or magnet file: {name}")]
    UnrecognizedFileKind { name: String },

    #[error("couldn't read file {path:?}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("upload of {name} failed: {cause}")]
    RemoteUpload { name: String, cause: RemoteCause },

    #[error("transfer of {name} failed: {cause}")]
    RemoteTransfer { name: String, cause: RemoteCause },
}

/// Why a remote call did not produce a receipt.
#[derive(Debug, Error)]
pub enum RemoteCause {
    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("no answer within {0:?}")]
    DeadlineExceeded(Duration),
}

impl IntakeError {
    /// True for the expected "not one of ours" filter result.
    pub fn is_unrecognized(&self) -> bool {
        matches!(self, IntakeError::UnrecognizedFileKind { .. })
    }

    /// True when the remote call was cut off by the deadline.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            IntakeError::RemoteUpload { cause: RemoteCause::DeadlineExceeded(_), .. }
                | IntakeError::RemoteTransfer { cause: RemoteCause::DeadlineExceeded(_), .. }
        )
    }
}
