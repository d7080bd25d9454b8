#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::fs::File;
use tokio::io::AsyncReadExt;

use watch2putio::clients::{ClientError, RemoteTransferClient, TransferReceipt};
use watch2putio::config::{Config, OptionData};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Upload { name: String, content: Vec<u8>, folder_id: i64 },
    Transfer { url: String, folder_id: i64 },
}

#[derive(Debug, Clone, Copy)]
pub enum Behaviour {
    Succeed,
    Fail,
    Hang,
    Delay(Duration),
}

/// In-memory stand-in for the remote service that records every call.
pub struct StubClient {
    behaviour: Behaviour,
    calls: Mutex<Vec<Call>>,
}

impl StubClient {
    pub fn new(behaviour: Behaviour) -> Arc<Self> {
        Arc::new(Self { behaviour, calls: Mutex::new(Vec::new()) })
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    async fn answer(&self, name: String) -> Result<TransferReceipt, ClientError> {
        match self.behaviour {
            Behaviour::Succeed => {}
            Behaviour::Fail => {
                return Err(ClientError::Api {
                    status: 503,
                    error_type: "UNAVAILABLE".to_string(),
                    message: "try later".to_string(),
                })
            }
            Behaviour::Hang => std::future::pending::<()>().await,
            Behaviour::Delay(d) => tokio::time::sleep(d).await,
        }
        Ok(TransferReceipt {
            name: Some(name),
            size: None,
            created_at: chrono::NaiveDate::from_ymd_opt(2024, 1, 31).and_then(|d| d.and_hms_opt(10, 0, 0)),
        })
    }
}

#[async_trait]
impl RemoteTransferClient for StubClient {
    async fn upload(&self, mut file: File, file_name: &str, folder_id: i64) -> Result<TransferReceipt, ClientError> {
        let mut content = Vec::new();
        file.read_to_end(&mut content).await.unwrap();
        self.calls.lock().unwrap().push(Call::Upload { name: file_name.to_string(), content, folder_id });
        self.answer(file_name.to_string()).await
    }

    async fn add_transfer(&self, url: &str, folder_id: i64, _callback_url: &str) -> Result<TransferReceipt, ClientError> {
        self.calls.lock().unwrap().push(Call::Transfer { url: url.to_string(), folder_id });
        self.answer(url.to_string()).await
    }
}

pub const FOLDER_ID: i64 = 4242;

pub fn config_for(dir: &std::path::Path) -> Config {
    let vars: HashMap<&str, String> = HashMap::from([
        ("WATCH_FOLDER", dir.to_string_lossy().into_owned()),
        ("API_TOKEN", "token".to_string()),
        ("DOWNLOAD_FOLDER_ID", FOLDER_ID.to_string()),
    ]);
    Config::load(&OptionData::default(), |key| vars.get(key).cloned()).unwrap()
}

pub fn init_logs() {
    let _ = simplelog::TestLogger::init(log::LevelFilter::Debug, simplelog::Config::default());
}

/// Polls until `check` holds or `limit` passes.
pub async fn eventually<F: Fn() -> bool>(limit: Duration, check: F) -> bool {
    let started = std::time::Instant::now();
    while started.elapsed() < limit {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    check()
}
