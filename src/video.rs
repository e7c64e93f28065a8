use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::{MediaError, Result};
use crate::timecode::Timecode;

/// Video-side ffmpeg operations: timecode stamping and still extraction
#[derive(Debug, Clone)]
pub struct VideoToolkit {
    pub frame_rate: u32,
}

impl VideoToolkit {
    pub fn new(frame_rate: u32) -> Self {
        Self { frame_rate }
    }

    /// Derive a time-of-day timecode from the file's creation time.
    /// Not every filesystem records a birth time; that is reported as
    /// an IO error by the platform.
    pub async fn creation_timecode(&self, path: &Path) -> Result<Timecode> {
        let created = tokio::fs::metadata(path).await?.created()?;
        let created: DateTime<Local> = created.into();
        Timecode::from_wall_clock(created, self.frame_rate)
    }

    /// Stamp a starting timecode onto a clip's metadata, stream-copy
    /// style so only the metadata changes. Output lands next to the
    /// input as `<stem>_tc.<ext>`.
    pub async fn stamp_timecode(&self, input: &Path, timecode: &Timecode) -> Result<PathBuf> {
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "output".to_string());
        let ext = input
            .extension()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "mov".to_string());
        let output = input.with_file_name(format!("{stem}_tc.{ext}"));

        info!("🎬 Stamping timecode {} onto {}", timecode, input.display());

        let status = tokio::process::Command::new("ffmpeg")
            .arg("-y")
            .arg("-i")
            .arg(input)
            .arg("-timecode")
            .arg(timecode.to_string())
            .args(["-c", "copy"])
            .arg(&output)
            .status()
            .await?;

        if !status.success() {
            return Err(MediaError::Segment {
                path: input.to_path_buf(),
                reason: format!("timecode stamping exited with {status}"),
            });
        }

        info!("✅ Timecode {} added to {}", timecode, output.display());
        Ok(output)
    }

    /// Extract the first frame of a clip as a JPEG still.
    pub async fn extract_first_frame(&self, input: &Path, output: &Path) -> Result<()> {
        let status = tokio::process::Command::new("ffmpeg")
            .arg("-y")
            .arg("-i")
            .arg(input)
            .args(["-vframes", "1"])
            .arg(output)
            .status()
            .await?;

        if !status.success() {
            return Err(MediaError::Segment {
                path: input.to_path_buf(),
                reason: format!("still extraction exited with {status}"),
            });
        }

        info!("🖼️ Extracted still: {}", output.display());
        Ok(())
    }
}
