use anyhow::Result;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::config::WatchConfig;
use crate::probe::MediaProber;
use crate::slack::{username_from_filename, SlackPoster};
use crate::transcription::{transcript_text, TranscribeBackend};

/// Drop-folder watcher: archives dropped audio files, transcribes them,
/// and posts the text to Slack.
///
/// Polls the folder and treats a file as complete once its size holds
/// steady across two scans (dropped files arrive over slow copies).
pub struct DropFolderWatcher {
    config: WatchConfig,
    prober: MediaProber,
    backend: Arc<dyn TranscribeBackend>,
    slack: Option<SlackPoster>,
}

impl DropFolderWatcher {
    pub fn new(
        config: WatchConfig,
        backend: Arc<dyn TranscribeBackend>,
        slack: Option<SlackPoster>,
    ) -> Self {
        Self {
            config,
            prober: MediaProber::new(),
            backend,
            slack,
        }
    }

    /// Watch until interrupted. A single file's failure is logged and
    /// the watch continues.
    pub async fn run(&self) -> Result<()> {
        info!("👀 Watching {}", self.config.watch_folder.display());
        tokio::fs::create_dir_all(&self.config.watch_folder).await?;
        tokio::fs::create_dir_all(&self.config.archive_folder).await?;

        let mut pending: HashMap<PathBuf, u64> = HashMap::new();
        let mut ticker =
            tokio::time::interval(Duration::from_secs(self.config.poll_interval_seconds.max(1)));

        loop {
            ticker.tick().await;

            for path in self.poll_once(&mut pending).await {
                if let Err(e) = self.handle_file(&path).await {
                    error!("❌ Failed to process {}: {:#}", path.display(), e);
                }
            }
        }
    }

    /// One poll of the watch folder. A scan error (unmounted share,
    /// permissions blip) is logged and yields no files; the watch
    /// itself outlives it and tries again next tick.
    async fn poll_once(&self, pending: &mut HashMap<PathBuf, u64>) -> Vec<PathBuf> {
        match self.scan(pending).await {
            Ok(ready) => ready,
            Err(e) => {
                warn!(
                    "⚠️ Scan of {} failed, retrying next tick: {:#}",
                    self.config.watch_folder.display(),
                    e
                );
                Vec::new()
            }
        }
    }

    /// One poll of the watch folder. Returns files whose size held
    /// steady since the previous poll.
    async fn scan(&self, pending: &mut HashMap<PathBuf, u64>) -> Result<Vec<PathBuf>> {
        let mut ready = Vec::new();
        let mut seen = Vec::new();

        let mut entries = tokio::fs::read_dir(&self.config.watch_folder).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if !path.is_file() || !self.is_supported(&path) {
                continue;
            }

            let size = entry.metadata().await?.len();
            seen.push(path.clone());
            match pending.get(&path) {
                Some(&last) if last == size => {
                    ready.push(path.clone());
                    pending.remove(&path);
                }
                _ => {
                    pending.insert(path, size);
                }
            }
        }

        // Forget files that disappeared between polls.
        pending.retain(|path, _| seen.contains(path));
        Ok(ready)
    }

    fn is_supported(&self, path: &Path) -> bool {
        let hidden = path
            .file_name()
            .map_or(true, |n| n.to_string_lossy().starts_with('.'));
        if hidden {
            return false;
        }
        path.extension().map_or(false, |ext| {
            let ext = ext.to_string_lossy().to_lowercase();
            self.config.supported_extensions.contains(&ext)
        })
    }

    /// Archive, transcribe, persist, and post a single dropped file.
    async fn handle_file(&self, path: &Path) -> Result<()> {
        info!("📥 New file dropped: {}", path.display());

        let filename = path
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        let archived = self.config.archive_folder.join(&filename);
        tokio::fs::rename(path, &archived).await?;
        info!("📦 Archived to {}", archived.display());

        let probe = self.prober.probe(&archived).await?;
        if probe.duration_seconds <= self.config.min_duration_seconds {
            warn!(
                "⏭️ {} is too short ({:.1}s), skipping transcription",
                filename, probe.duration_seconds
            );
            return Ok(());
        }

        let payload = self.backend.transcribe(&archived).await?;
        let text = transcript_text(&payload).unwrap_or_default().to_string();

        let json_path = archived.with_extension("json");
        tokio::fs::write(&json_path, serde_json::to_string_pretty(&payload)?).await?;
        tokio::fs::write(archived.with_extension("txt"), &text).await?;
        info!("💾 Transcript saved to {}", json_path.display());

        if let Some(slack) = &self.slack {
            slack
                .post_transcript(&text, &username_from_filename(&filename))
                .await?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use tempfile::TempDir;

    struct NoopBackend;

    #[async_trait]
    impl crate::transcription::TranscribeBackend for NoopBackend {
        async fn transcribe(&self, _path: &Path) -> crate::error::Result<Value> {
            Ok(json!({"text": ""}))
        }
    }

    fn watcher_for(watch_folder: PathBuf) -> DropFolderWatcher {
        let mut config = Config::default().watch;
        config.watch_folder = watch_folder;
        DropFolderWatcher::new(config, Arc::new(NoopBackend), None)
    }

    #[tokio::test]
    async fn test_vanished_folder_does_not_stop_the_watch() {
        let dir = TempDir::new().unwrap();
        let gone = dir.path().join("unmounted");
        let watcher = watcher_for(gone);

        let mut pending = HashMap::new();
        pending.insert(PathBuf::from("stale.mp3"), 42u64);

        // Scan errors yield an empty poll instead of propagating.
        let ready = watcher.poll_once(&mut pending).await;
        assert!(ready.is_empty());
        let ready = watcher.poll_once(&mut pending).await;
        assert!(ready.is_empty());
    }

    #[tokio::test]
    async fn test_file_is_ready_once_size_holds_steady() {
        let dir = TempDir::new().unwrap();
        let dropped = dir.path().join("jane_doe_0412_take2.mp3");
        tokio::fs::write(&dropped, b"partial").await.unwrap();

        let watcher = watcher_for(dir.path().to_path_buf());
        let mut pending = HashMap::new();

        // First sighting only registers the file.
        assert!(watcher.poll_once(&mut pending).await.is_empty());

        // Still growing: not ready yet.
        tokio::fs::write(&dropped, b"partial plus more").await.unwrap();
        assert!(watcher.poll_once(&mut pending).await.is_empty());

        // Size held steady across two polls: ready.
        let ready = watcher.poll_once(&mut pending).await;
        assert_eq!(ready, vec![dropped]);
        assert!(pending.is_empty());
    }

    #[tokio::test]
    async fn test_unsupported_and_hidden_files_are_ignored() {
        let dir = TempDir::new().unwrap();
        tokio::fs::write(dir.path().join("notes.txt"), b"x").await.unwrap();
        tokio::fs::write(dir.path().join(".DS_Store"), b"x").await.unwrap();

        let watcher = watcher_for(dir.path().to_path_buf());
        let mut pending = HashMap::new();

        watcher.poll_once(&mut pending).await;
        assert!(pending.is_empty());
    }
}
