//! OpenAI Batch API submission.
//!
//! Steps: upload the JSONL dataset (`/files`, purpose `batch`), create the
//! batch (`/batches`), read it back, and save the descriptor as `<id>.json`.
//! Polling and result download are handled elsewhere.

use std::path::{Path, PathBuf};

use pubcurate_common::sandbox::SandboxClient as Client;
use pubcurate_common::CurateError;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, instrument};

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";
pub const BATCH_ENDPOINT: &str = "/v1/chat/completions";
pub const COMPLETION_WINDOW: &str = "24h";
pub const BATCH_DESCRIPTION: &str = "Publication curation";

// ── Error ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Client(#[from] CurateError),
    #[error("Missing credential: set {0}")]
    MissingCredential(&'static str),
    #[error("Unexpected response: {0}")]
    Unexpected(String),
    #[error("API error [{status}]: {message}")]
    ApiError { status: u16, message: String },
}

// ── Request / Response ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
struct BatchMetadata<'a> {
    description: &'a str,
}

#[derive(Debug, Clone, Serialize)]
struct CreateBatchRequest<'a> {
    input_file_id: &'a str,
    endpoint: &'a str,
    completion_window: &'a str,
    metadata: BatchMetadata<'a>,
}

#[derive(Debug, Clone, Deserialize)]
struct FileObject {
    id: String,
}

/// A submitted batch job as reported by the API.
#[derive(Debug, Clone)]
pub struct BatchJob {
    pub id: String,
    pub status: Option<String>,
    pub input_file_id: String,
    pub descriptor: serde_json::Value,
    pub descriptor_path: PathBuf,
}

async fn check_response_status(resp: reqwest::Response) -> Result<serde_json::Value, LlmError> {
    let status = resp.status().as_u16();
    let text = resp.text().await?;
    if status >= 400 {
        let message = serde_json::from_str::<serde_json::Value>(&text)
            .ok()
            .and_then(|body| body["error"]["message"].as_str().map(String::from))
            .unwrap_or_else(|| if text.is_empty() { "unknown API error".to_string() } else { text.clone() });
        return Err(LlmError::ApiError { status, message });
    }
    Ok(serde_json::from_str(&text)?)
}

fn string_field(body: &serde_json::Value, field: &str) -> Result<String, LlmError> {
    body[field]
        .as_str()
        .map(String::from)
        .ok_or_else(|| LlmError::Unexpected(format!("response has no `{field}`")))
}

// ── Client ────────────────────────────────────────────────────────────────────

pub struct BatchClient {
    client: Client,
    base_url: String,
    api_key: SecretString,
}

impl BatchClient {
    pub fn new(client: Client, api_key: SecretString) -> Self {
        Self { client, base_url: OPENAI_BASE_URL.to_string(), api_key }
    }

    /// Reads the credential from `OPENAI_API_KEY`.
    pub fn from_env(client: Client) -> Result<Self, LlmError> {
        let key = std::env::var(API_KEY_ENV)
            .ok()
            .filter(|k| !k.is_empty())
            .ok_or(LlmError::MissingCredential(API_KEY_ENV))?;
        Ok(Self::new(client, SecretString::from(key)))
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    #[instrument(skip(self))]
    pub async fn upload_file(&self, dataset: &Path) -> Result<String, LlmError> {
        let bytes = tokio::fs::read(dataset).await?;
        let file_name = dataset
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "dataset.jsonl".to_string());
        debug!(bytes = bytes.len(), file_name = %file_name, "Uploading batch input");

        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("application/jsonl")?;
        let form = reqwest::multipart::Form::new()
            .text("purpose", "batch")
            .part("file", part);

        let resp = self.client
            .post(&format!("{}/files", self.base_url))?
            .bearer_auth(self.api_key.expose_secret())
            .multipart(form)
            .send()
            .await?;
        let body = check_response_status(resp).await?;
        let file: FileObject = serde_json::from_value(body)?;
        info!(file_id = %file.id, "Batch input file uploaded");
        Ok(file.id)
    }

    #[instrument(skip(self))]
    pub async fn create_batch(&self, input_file_id: &str) -> Result<serde_json::Value, LlmError> {
        let req = CreateBatchRequest {
            input_file_id,
            endpoint: BATCH_ENDPOINT,
            completion_window: COMPLETION_WINDOW,
            metadata: BatchMetadata { description: BATCH_DESCRIPTION },
        };
        let resp = self.client
            .post(&format!("{}/batches", self.base_url))?
            .bearer_auth(self.api_key.expose_secret())
            .json(&req)
            .send()
            .await?;
        check_response_status(resp).await
    }

    #[instrument(skip(self))]
    pub async fn retrieve_batch(&self, batch_id: &str) -> Result<serde_json::Value, LlmError> {
        let resp = self.client
            .get(&format!("{}/batches/{}", self.base_url, batch_id))?
            .bearer_auth(self.api_key.expose_secret())
            .send()
            .await?;
        check_response_status(resp).await
    }

    /// Upload, create, retrieve, and save the descriptor to `<out_dir>/<id>.json`.
    pub async fn submit(&self, dataset: &Path, out_dir: &Path) -> Result<BatchJob, LlmError> {
        let input_file_id = self.upload_file(dataset).await?;
        let created = self.create_batch(&input_file_id).await?;
        let id = string_field(&created, "id")?;
        info!(batch_id = %id, "Batch created");

        let descriptor = self.retrieve_batch(&id).await?;
        let status = descriptor["status"].as_str().map(String::from);

        tokio::fs::create_dir_all(out_dir).await?;
        let descriptor_path = out_dir.join(format!("{id}.json"));
        tokio::fs::write(&descriptor_path, serde_json::to_vec(&descriptor)?).await?;
        info!(
            batch_id = %id,
            status = ?status,
            path = %descriptor_path.display(),
            "Batch descriptor saved"
        );

        Ok(BatchJob { id, status, input_file_id, descriptor, descriptor_path })
    }
}
