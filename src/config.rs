use std::fmt;
use std::num::ParseIntError;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::BaseDirs;
use log::info;
use serde_derive::{Deserialize, Serialize};
use thiserror::Error;
use tokio::fs;

use crate::clients::putio::{DEFAULT_API_URL, DEFAULT_UPLOAD_URL};
use crate::clients::ClientError;

pub const OPTIONS_CONFIG: &str = "watch2putio/options.toml";

pub const WATCH_FOLDER: &str = "WATCH_FOLDER";
pub const API_TOKEN: &str = "API_TOKEN";
pub const DOWNLOAD_FOLDER_ID: &str = "DOWNLOAD_FOLDER_ID";
pub const PUTIO_API_URL: &str = "PUTIO_API_URL";
pub const PUTIO_UPLOAD_URL: &str = "PUTIO_UPLOAD_URL";
pub const REMOTE_TIMEOUT_SECS: &str = "REMOTE_TIMEOUT_SECS";
pub const MAX_CONCURRENT_INTAKES: &str = "MAX_CONCURRENT_INTAKES";
pub const CALLBACK_URL: &str = "CALLBACK_URL";

pub const DEFAULT_REMOTE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{}", missing_message(.0))]
    Missing(Vec<&'static str>),

    #[error("DOWNLOAD_FOLDER_ID must be a decimal integer, got {value:?}: {source}")]
    InvalidFolderId {
        value: String,
        #[source]
        source: ParseIntError,
    },

    #[error("{key} must be a positive integer, got {value:?}")]
    InvalidNumber { key: &'static str, value: String },

    #[error("could not load options file {path:?}: {reason}")]
    OptionsFile { path: PathBuf, reason: String },

    #[error("cannot build the put.io client: {0}")]
    Client(#[from] ClientError),
}

fn missing_message(keys: &[&'static str]) -> String {
    keys.iter()
        .map(|k| format!("{k} is not set"))
        .collect::<Vec<_>>()
        .join(" / ")
}

/// Optional on-disk defaults. Environment variables override every field.
#[derive(Serialize, Deserialize, Default, Debug, Clone, PartialEq)]
pub struct OptionData {
    pub watch_folder: Option<PathBuf>,
    pub api_token: Option<String>,
    pub download_folder_id: Option<i64>,
    pub api_url: Option<String>,
    pub upload_url: Option<String>,
    pub remote_timeout_secs: Option<u64>,
    pub max_concurrent_intakes: Option<usize>,
    pub callback_url: Option<String>,
}

impl OptionData {
    fn get(&self, key: &str) -> Option<String> {
        match key {
            WATCH_FOLDER => self.watch_folder.as_ref().map(|p| p.to_string_lossy().into_owned()),
            API_TOKEN => self.api_token.clone(),
            DOWNLOAD_FOLDER_ID => self.download_folder_id.map(|id| id.to_string()),
            PUTIO_API_URL => self.api_url.clone(),
            PUTIO_UPLOAD_URL => self.upload_url.clone(),
            REMOTE_TIMEOUT_SECS => self.remote_timeout_secs.map(|s| s.to_string()),
            MAX_CONCURRENT_INTAKES => self.max_concurrent_intakes.map(|n| n.to_string()),
            CALLBACK_URL => self.callback_url.clone(),
            _ => None,
        }
    }
}

/// Settings fixed for the lifetime of the process.
#[derive(Clone, PartialEq)]
pub struct Config {
    pub watch_folder: PathBuf,
    pub api_token: String,
    pub download_folder_id: i64,
    pub api_url: String,
    pub upload_url: String,
    pub remote_timeout: Duration,
    pub max_concurrent_intakes: Option<usize>,
    pub callback_url: String,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("watch_folder", &self.watch_folder)
            .field("api_token", &"<redacted>")
            .field("download_folder_id", &self.download_folder_id)
            .field("api_url", &self.api_url)
            .field("upload_url", &self.upload_url)
            .field("remote_timeout", &self.remote_timeout)
            .field("max_concurrent_intakes", &self.max_concurrent_intakes)
            .field("callback_url", &self.callback_url)
            .finish()
    }
}

impl Config {
    /// Builds the configuration from the process environment on top of `options`.
    pub fn from_env(options: &OptionData) -> Result<Config, ConfigError> {
        Config::load(options, |key| std::env::var(key).ok())
    }

    /// Builds the configuration from `lookup` (normally the environment),
    /// falling back to `options` for keys the lookup leaves unset or empty.
    pub fn load<F>(options: &OptionData, lookup: F) -> Result<Config, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |key: &str| -> Option<String> {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .or_else(|| options.get(key).filter(|v| !v.trim().is_empty()))
        };

        let watch_folder = value(WATCH_FOLDER);
        let folder_id = value(DOWNLOAD_FOLDER_ID);
        let api_token = value(API_TOKEN);

        let mut missing = Vec::new();
        if watch_folder.is_none() {
            missing.push(WATCH_FOLDER);
        }
        if folder_id.is_none() {
            missing.push(DOWNLOAD_FOLDER_ID);
        }
        if api_token.is_none() {
            missing.push(API_TOKEN);
        }
        let (Some(watch_folder), Some(folder_id), Some(api_token)) = (watch_folder, folder_id, api_token) else {
            return Err(ConfigError::Missing(missing));
        };

        let download_folder_id = folder_id
            .trim()
            .parse::<i64>()
            .map_err(|source| ConfigError::InvalidFolderId { value: folder_id.clone(), source })?;

        let remote_timeout = match value(REMOTE_TIMEOUT_SECS) {
            Some(raw) => Duration::from_secs(parse_positive(REMOTE_TIMEOUT_SECS, &raw)? as u64),
            None => DEFAULT_REMOTE_TIMEOUT,
        };
        let max_concurrent_intakes = value(MAX_CONCURRENT_INTAKES)
            .map(|raw| parse_positive(MAX_CONCURRENT_INTAKES, &raw))
            .transpose()?;

        Ok(Config {
            watch_folder: PathBuf::from(watch_folder),
            api_token,
            download_folder_id,
            api_url: value(PUTIO_API_URL).unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            upload_url: value(PUTIO_UPLOAD_URL).unwrap_or_else(|| DEFAULT_UPLOAD_URL.to_string()),
            remote_timeout,
            max_concurrent_intakes,
            callback_url: value(CALLBACK_URL).unwrap_or_default(),
        })
    }

    pub fn get_full_config_path(filename: &str) -> Option<PathBuf> {
        BaseDirs::new().map(|dirs| dirs.config_dir().join(filename))
    }

    /// Reads the options file.
    ///
    /// An explicitly given path must exist. The default location is optional
    /// and silently yields empty options when absent.
    pub async fn read_options(explicit: Option<&Path>) -> Result<OptionData, ConfigError> {
        let (path, required) = match explicit {
            Some(p) => (p.to_path_buf(), true),
            None => match Config::get_full_config_path(OPTIONS_CONFIG) {
                Some(p) => (p, false),
                None => return Ok(OptionData::default()),
            },
        };
        if !required && !fs::try_exists(&path).await.unwrap_or(false) {
            info!("No options file at '{}', using the environment only", path.display());
            return Ok(OptionData::default());
        }
        let contents = fs::read_to_string(&path).await.map_err(|e| ConfigError::OptionsFile {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        let data: OptionData = toml::from_str(&contents).map_err(|e| ConfigError::OptionsFile {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        info!("Loaded options from '{}'", path.display());
        Ok(data)
    }
}

fn parse_positive(key: &'static str, raw: &str) -> Result<usize, ConfigError> {
    match raw.trim().parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ConfigError::InvalidNumber { key, value: raw.to_string() }),
    }
}
