use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::timecode::DEFAULT_FRAME_RATE;

/// Configuration for the mediaflow tools.
///
/// Components never read the environment themselves; everything they
/// need arrives through this struct at construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Timecode derivation settings
    pub timecode: TimecodeConfig,

    /// Transcription service settings
    pub transcription: TranscriptionConfig,

    /// Drop-folder watcher settings
    pub watch: WatchConfig,

    /// Slack posting settings
    pub slack: SlackConfig,

    /// Airtable cataloging settings
    pub airtable: AirtableConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimecodeConfig {
    /// Fixed frame rate for all derived timecodes
    pub frame_rate: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionConfig {
    /// Transcription API endpoint
    pub api_endpoint: String,

    /// API key for the transcription service
    pub api_key: Option<String>,

    /// Model to use for transcription
    pub model: String,

    /// Upload size limit per request (bytes); larger files get chunked
    pub max_upload_bytes: u64,

    /// Request word-level timestamps
    pub word_timestamps: bool,

    /// Maximum concurrent chunk uploads
    pub max_concurrent_chunks: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Folder watched for dropped audio files
    pub watch_folder: PathBuf,

    /// Folder files are moved to before transcription
    pub archive_folder: PathBuf,

    /// Files at or under this duration are archived but not transcribed
    pub min_duration_seconds: f64,

    /// Poll interval for the folder scan (seconds)
    pub poll_interval_seconds: u64,

    /// Audio extensions picked up by the watcher
    pub supported_extensions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlackConfig {
    /// Bot token for chat.postMessage
    pub bot_token: Option<String>,

    /// Channel transcripts are posted to
    pub channel: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AirtableConfig {
    /// Airtable API key
    pub api_key: Option<String>,

    /// Ingest base ID
    pub base_id: Option<String>,

    /// Table holding one record per capture session
    pub sessions_table: String,

    /// Table holding one record per cataloged file
    pub files_table: String,
}

impl Config {
    /// Load configuration from file, falling back to environment
    /// variables over the defaults.
    pub fn load() -> Result<Self> {
        let config_paths = [
            "mediaflow.toml",
            "config/mediaflow.toml",
            "~/.config/mediaflow/config.toml",
        ];

        for path in &config_paths {
            if let Ok(config_str) = std::fs::read_to_string(path) {
                match toml::from_str::<Config>(&config_str) {
                    Ok(mut config) => {
                        tracing::info!("📄 Loaded configuration from: {}", path);
                        config.apply_env();
                        return Ok(config);
                    }
                    Err(e) => {
                        tracing::warn!("Failed to parse config file {}: {}", path, e);
                    }
                }
            }
        }

        Ok(Self::from_env())
    }

    /// Build configuration from environment variables over the defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    fn apply_env(&mut self) {
        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            self.transcription.api_key = Some(key);
        }
        if let Ok(token) = std::env::var("SLACK_BOT_TOKEN") {
            self.slack.bot_token = Some(token);
        }
        if let Ok(channel) = std::env::var("SLACK_TRANSCRIPT_CHANNEL") {
            self.slack.channel = Some(channel);
        }
        if let Ok(key) = std::env::var("AIRTABLE_API_KEY") {
            self.airtable.api_key = Some(key);
        }
        if let Ok(base) = std::env::var("AIRTABLE_INGEST_BASE") {
            self.airtable.base_id = Some(base);
        }
        if let Ok(folder) = std::env::var("MEDIAFLOW_WATCH_FOLDER") {
            self.watch.watch_folder = PathBuf::from(folder);
        }
        if let Ok(folder) = std::env::var("MEDIAFLOW_ARCHIVE_FOLDER") {
            self.watch.archive_folder = PathBuf::from(folder);
        }
        if let Ok(rate) = std::env::var("MEDIAFLOW_FRAME_RATE") {
            if let Ok(rate) = rate.parse() {
                self.timecode.frame_rate = rate;
            }
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.timecode.frame_rate == 0 {
            return Err(anyhow!("frame_rate must be greater than 0"));
        }
        if self.transcription.max_upload_bytes == 0 {
            return Err(anyhow!("max_upload_bytes must be greater than 0"));
        }
        if self.transcription.max_concurrent_chunks == 0 {
            return Err(anyhow!("max_concurrent_chunks must be greater than 0"));
        }
        if self.watch.min_duration_seconds < 0.0 {
            return Err(anyhow!("min_duration_seconds must be non-negative"));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timecode: TimecodeConfig {
                frame_rate: DEFAULT_FRAME_RATE,
            },
            transcription: TranscriptionConfig {
                api_endpoint: "https://api.openai.com/v1/audio/transcriptions".to_string(),
                api_key: None,
                model: "whisper-1".to_string(),
                max_upload_bytes: 20 * 1024 * 1024, // stay under the 25MB API limit
                word_timestamps: true,
                max_concurrent_chunks: num_cpus::get().min(4),
            },
            watch: WatchConfig {
                watch_folder: PathBuf::from("./drop"),
                archive_folder: PathBuf::from("./archive"),
                min_duration_seconds: 3.5,
                poll_interval_seconds: 2,
                supported_extensions: vec![
                    "mp3".to_string(),
                    "mp4".to_string(),
                    "m4v".to_string(),
                    "aac".to_string(),
                ],
            },
            slack: SlackConfig {
                bot_token: None,
                channel: None,
            },
            airtable: AirtableConfig {
                api_key: None,
                base_id: None,
                sessions_table: "CaptureSessions".to_string(),
                files_table: "CaptureFiles".to_string(),
            },
        }
    }
}

/// Configuration builder for programmatic config creation
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn with_frame_rate(mut self, frame_rate: u32) -> Self {
        self.config.timecode.frame_rate = frame_rate;
        self
    }

    pub fn with_api_key(mut self, api_key: String) -> Self {
        self.config.transcription.api_key = Some(api_key);
        self
    }

    pub fn with_max_upload_bytes(mut self, bytes: u64) -> Self {
        self.config.transcription.max_upload_bytes = bytes;
        self
    }

    pub fn with_watch_folders(mut self, watch: PathBuf, archive: PathBuf) -> Self {
        self.config.watch.watch_folder = watch;
        self.config.watch.archive_folder = archive;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.timecode.frame_rate, 24);
        assert_eq!(config.transcription.max_upload_bytes, 20 * 1024 * 1024);
        assert_eq!(config.watch.min_duration_seconds, 3.5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = ConfigBuilder::new()
            .with_frame_rate(30)
            .with_max_upload_bytes(1024)
            .build();

        assert_eq!(config.timecode.frame_rate, 30);
        assert_eq!(config.transcription.max_upload_bytes, 1024);
    }

    #[test]
    fn test_validation_rejects_zero_frame_rate() {
        let mut config = Config::default();
        config.timecode.frame_rate = 0;
        assert!(config.validate().is_err());
    }
}
