use anyhow::{anyhow, Result};
use serde_json::json;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::airtable::AirtableClient;
use crate::config::AirtableConfig;
use crate::probe::MediaProber;

const VIDEO_EXTENSIONS: &[&str] = &["mov", "mp4", "m4v", "mts", "mxf"];
const AUDIO_EXTENSIONS: &[&str] = &["aiff", "mp3", "aif", "wav"];
const STILL_EXTENSIONS: &[&str] = &["cr2", "jpg", "jpeg"];

/// Summary of one shoot-folder ingest
#[derive(Debug, Clone, Default)]
pub struct IngestReport {
    pub renamed: usize,
    pub cataloged: usize,
    pub failures: usize,
}

/// Renames raw camera-card footage and catalogs each file into Airtable.
///
/// Shoot folders look like `<shoot-id>/<camera>/<files...>`; files are
/// renamed `{shoot}_{camera}.0001.{ext}` with a per-camera counter.
pub struct ShootIngest {
    prober: MediaProber,
    airtable: AirtableClient,
    sessions_table: String,
    files_table: String,
}

impl ShootIngest {
    pub fn new(config: &AirtableConfig) -> Result<Self> {
        Ok(Self {
            prober: MediaProber::new(),
            airtable: AirtableClient::from_config(config)?,
            sessions_table: config.sessions_table.clone(),
            files_table: config.files_table.clone(),
        })
    }

    pub async fn ingest_shoot(&self, shoot_folder: &Path) -> Result<IngestReport> {
        let shoot_id = shoot_folder
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .ok_or_else(|| anyhow!("cannot derive shoot ID from {}", shoot_folder.display()))?;

        info!("🎥 Ingesting shoot {} from {}", shoot_id, shoot_folder.display());

        // A shoot must already have a session record to link against.
        let session_id = self
            .airtable
            .find_first(
                &self.sessions_table,
                &format!("{{CaptureID}} = '{shoot_id}'"),
            )
            .await?
            .ok_or_else(|| anyhow!("no capture session found for shoot ID {shoot_id}"))?;

        let mut report = IngestReport::default();

        for camera_dir in WalkDir::new(shoot_folder)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_dir())
        {
            let camera = camera_dir.file_name().to_string_lossy().to_string();
            info!("📷 Processing camera folder: {}", camera);

            let mut files = media_files(camera_dir.path());
            files.sort();

            for (counter, path) in files.iter().enumerate() {
                match self
                    .catalog_file(path, &shoot_id, &camera, counter + 1, &session_id)
                    .await
                {
                    Ok(()) => {
                        report.renamed += 1;
                        report.cataloged += 1;
                    }
                    Err(e) => {
                        warn!("⚠️ Failed to catalog {}: {:#}", path.display(), e);
                        report.failures += 1;
                    }
                }
            }
        }

        info!(
            "✅ Ingest complete: {} cataloged, {} failures",
            report.cataloged, report.failures
        );
        Ok(report)
    }

    async fn catalog_file(
        &self,
        path: &Path,
        shoot_id: &str,
        camera: &str,
        counter: usize,
        session_id: &str,
    ) -> Result<()> {
        let ext = path
            .extension()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        let new_name = format!("{shoot_id}_{camera}.{counter:04}.{ext}");
        let new_path = path.with_file_name(&new_name);

        tokio::fs::rename(path, &new_path).await?;
        info!("🏷️ Renamed: {} -> {}", path.display(), new_path.display());

        // Probing is best-effort; a file we cannot probe still gets cataloged.
        let ffprobe_json = match self.prober.probe(&new_path).await {
            Ok(probe) => Some(probe.raw.to_string()),
            Err(e) => {
                warn!("⚠️ Probe failed for {}: {}", new_path.display(), e);
                None
            }
        };

        self.airtable
            .create_record(
                &self.files_table,
                json!({
                    "FileName": new_name,
                    "OriginalFilePath": path.to_string_lossy(),
                    "FfprobeJson": ffprobe_json,
                    "_CaptureSession": [session_id],
                }),
            )
            .await?;

        Ok(())
    }
}

/// Collect the cataloggable media files in one camera folder: known
/// video, audio, or still extensions, hidden files ignored.
pub fn media_files(camera_dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(camera_dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| {
            let hidden = p
                .file_name()
                .map_or(true, |n| n.to_string_lossy().starts_with('.'));
            !hidden && is_media_extension(p)
        })
        .collect()
}

fn is_media_extension(path: &Path) -> bool {
    path.extension().map_or(false, |ext| {
        let ext = ext.to_string_lossy().to_lowercase();
        VIDEO_EXTENSIONS.contains(&ext.as_str())
            || AUDIO_EXTENSIONS.contains(&ext.as_str())
            || STILL_EXTENSIONS.contains(&ext.as_str())
    })
}
