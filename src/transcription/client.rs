use async_trait::async_trait;
use serde_json::Value;
use std::path::Path;
use tracing::{debug, info};

use crate::config::TranscriptionConfig;
use crate::error::{MediaError, Result};

/// Seam for the remote transcription service. One call per chunk, at
/// most once, no internal retry.
#[async_trait]
pub trait TranscribeBackend: Send + Sync {
    /// Transcribe one file, returning the service's payload verbatim.
    async fn transcribe(&self, path: &Path) -> Result<Value>;
}

/// Whisper transcription client for the OpenAI audio API
#[derive(Debug, Clone)]
pub struct WhisperClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    word_timestamps: bool,
}

impl WhisperClient {
    pub fn new(config: &TranscriptionConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: config.api_endpoint.clone(),
            api_key: config.api_key.clone().unwrap_or_default(),
            model: config.model.clone(),
            word_timestamps: config.word_timestamps,
        }
    }
}

#[async_trait]
impl TranscribeBackend for WhisperClient {
    async fn transcribe(&self, path: &Path) -> Result<Value> {
        let filename = path
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "audio.m4a".to_string());

        info!("🎤 Transcribing {}", path.display());

        let bytes = tokio::fs::read(path).await?;
        debug!("Uploading {} bytes", bytes.len());

        let mut form = reqwest::multipart::Form::new()
            .part(
                "file",
                reqwest::multipart::Part::bytes(bytes).file_name(filename),
            )
            .text("model", self.model.clone())
            .text("response_format", "verbose_json");

        if self.word_timestamps {
            form = form.text("timestamp_granularities[]", "word");
        }

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| MediaError::Transcription {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(MediaError::Transcription {
                path: path.to_path_buf(),
                reason: format!("API returned {}", response.status()),
            });
        }

        response
            .json()
            .await
            .map_err(|e| MediaError::Transcription {
                path: path.to_path_buf(),
                reason: format!("unparseable response: {e}"),
            })
    }
}

/// Pull the plain transcript text out of a service payload.
pub fn transcript_text(payload: &Value) -> Option<&str> {
    payload["text"].as_str()
}
