use async_trait::async_trait;
use log::debug;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Response, Url};
use serde_derive::Deserialize;
use tokio::fs::File;

use crate::clients::{parse_created_at, ClientError, RemoteTransferClient, TransferReceipt};

pub const DEFAULT_API_URL: &str = "https://api.put.io";
pub const DEFAULT_UPLOAD_URL: &str = "https://upload.put.io";

/// put.io v2 REST client.
///
/// `reqwest::Client` pools connections internally and is shared freely
/// between tasks, so no locking is needed around it.
pub struct PutioClient {
    client: reqwest::Client,
    token: String,
    api_url: Url,
    upload_url: Url,
}

//{"status":"OK","transfer":{"name":"...","size":123,"created_at":"2024-01-31T10:00:00",...}}
#[derive(Deserialize)]
struct ReceiptResponse {
    transfer: Option<RemoteItem>,
    file: Option<RemoteItem>,
}

#[derive(Deserialize)]
struct RemoteItem {
    name: Option<String>,
    size: Option<i64>,
    created_at: Option<String>,
}

//{"error_type":"NotFound","error_message":"...","status_code":404}
#[derive(Deserialize)]
struct ErrorResponse {
    error_type: Option<String>,
    error_message: Option<String>,
}

impl From<RemoteItem> for TransferReceipt {
    fn from(item: RemoteItem) -> Self {
        Self {
            name: item.name,
            size: item.size,
            created_at: item.created_at.as_deref().and_then(parse_created_at),
        }
    }
}

impl PutioClient {
    pub fn new(token: String, api_url: &str, upload_url: &str) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("watch2putio/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            token,
            api_url: Self::parse_base(api_url)?,
            upload_url: Self::parse_base(upload_url)?,
        })
    }

    fn parse_base(url: &str) -> Result<Url, ClientError> {
        Url::parse(url.trim_end_matches('/')).map_err(|e| ClientError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }

    fn endpoint(base: &Url, path: &str) -> Result<Url, ClientError> {
        let full = format!("{}{}", base.as_str().trim_end_matches('/'), path);
        Url::parse(&full).map_err(|e| ClientError::InvalidUrl { url: full, reason: e.to_string() })
    }

    async fn read_receipt(resp: Response) -> Result<TransferReceipt, ClientError> {
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let parsed: Option<ErrorResponse> = serde_json::from_str(&body).ok();
            let (error_type, message) = match parsed {
                Some(e) => (e.error_type, e.error_message),
                None => (None, None),
            };
            return Err(ClientError::Api {
                status: status.as_u16(),
                error_type: error_type
                    .unwrap_or_else(|| status.canonical_reason().unwrap_or("Unknown").to_string()),
                message: message.unwrap_or(body),
            });
        }
        let body: ReceiptResponse = resp.json().await?;
        body.transfer
            .or(body.file)
            .map(TransferReceipt::from)
            .ok_or(ClientError::MissingReceipt)
    }
}

#[async_trait]
impl RemoteTransferClient for PutioClient {
    async fn upload(&self, file: File, file_name: &str, folder_id: i64) -> Result<TransferReceipt, ClientError> {
        let url = Self::endpoint(&self.upload_url, "/v2/files/upload")?;
        let len = file.metadata().await.ok().map(|m| m.len());
        let body = Body::from(file);
        let part = match len {
            Some(len) => Part::stream_with_length(body, len),
            None => Part::stream(body),
        }
        .file_name(file_name.to_string());
        let form = Form::new()
            .part("file", part)
            .text("filename", file_name.to_string())
            .text("parent_id", folder_id.to_string());
        debug!("POST {} ({})", url, file_name);
        let resp = self
            .client
            .post(url)
            .bearer_auth(&self.token)
            .multipart(form)
            .send()
            .await?;
        Self::read_receipt(resp).await
    }

    async fn add_transfer(&self, url: &str, folder_id: i64, callback_url: &str) -> Result<TransferReceipt, ClientError> {
        let endpoint = Self::endpoint(&self.api_url, "/v2/transfers/add")?;
        let folder = folder_id.to_string();
        let params = [("url", url), ("save_parent_id", folder.as_str()), ("callback_url", callback_url)];
        debug!("POST {}", endpoint);
        let resp = self
            .client
            .post(endpoint)
            .bearer_auth(&self.token)
            .form(&params)
            .send()
            .await?;
        Self::read_receipt(resp).await
    }
}
