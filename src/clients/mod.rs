use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime};
use thiserror::Error;
use tokio::fs::File;

pub mod putio;

pub use putio::PutioClient;

/// The remote download service as seen by the intake core.
///
/// Implementations are shared between every in-flight intake task, so they
/// must be usable concurrently through `&self`.
#[async_trait]
pub trait RemoteTransferClient: Send + Sync {
    /// Uploads a torrent descriptor into `folder_id`.
    async fn upload(&self, file: File, file_name: &str, folder_id: i64) -> Result<TransferReceipt, ClientError>;

    /// Starts a transfer for a magnet link (or any url the service accepts).
    async fn add_transfer(&self, url: &str, folder_id: i64, callback_url: &str) -> Result<TransferReceipt, ClientError>;
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("service answered {status}: {error_type}: {message}")]
    Api { status: u16, error_type: String, message: String },

    #[error("service answered without a transfer or file")]
    MissingReceipt,

    #[error("invalid service url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
}

/// What the service reports back for an accepted upload or transfer.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct TransferReceipt {
    pub name: Option<String>,
    pub size: Option<i64>,
    pub created_at: Option<NaiveDateTime>,
}

impl TransferReceipt {
    pub fn created_at_or_unknown(&self) -> String {
        self.created_at
            .map(|t| t.to_string())
            .unwrap_or_else(|| "unknown time".to_string())
    }

    pub fn get_readable_size(&self) -> String {
        let Some(size) = self.size else {
            return "?".to_string();
        };
        let mut size = size as f64;
        let units = ["B", "KB", "MB", "GB", "TB", "PB", "EB", "ZB", "YB"];
        let mut i = 0;
        while size > 1024.0 && i < units.len() - 1 {
            i += 1;
            size /= 1024.0;
        }
        format!("{:.2}{}", size, units[i])
    }
}

/// Accepts both the service's bare `2024-01-31T10:00:00` form and RFC 3339.
pub(crate) fn parse_created_at(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|t| t.naive_utc()))
}

impl fmt::Display for TransferReceipt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Name: {}, Size: {}, Creation Date: {}",
            self.name.as_deref().unwrap_or("?"),
            self.get_readable_size(),
            self.created_at_or_unknown()
        )
    }
}

impl fmt::Debug for TransferReceipt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
