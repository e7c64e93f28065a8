use std::path::{Path, PathBuf};
use tracing::info;

use crate::chunking::{Chunk, ChunkPlan};
use crate::error::{MediaError, Result};

/// A segmented chunk file on disk, tagged with its position in the plan.
#[derive(Debug, Clone)]
pub struct ChunkFile {
    pub path: PathBuf,
    pub chunk: Chunk,
}

/// Audio converter and segmenter built on the ffmpeg command line tool
#[derive(Debug, Clone)]
pub struct AudioSegmenter {
    /// Bitrate for AAC upload conversion
    pub aac_bitrate: String,
}

impl AudioSegmenter {
    pub fn new() -> Self {
        Self {
            aac_bitrate: "128k".to_string(),
        }
    }

    /// Convert a media file to m4a (AAC audio only) for upload.
    /// Returns the input path unchanged when it is already m4a.
    pub async fn convert_to_m4a(&self, input: &Path) -> Result<PathBuf> {
        if input
            .extension()
            .map_or(false, |ext| ext.eq_ignore_ascii_case("m4a"))
        {
            return Ok(input.to_path_buf());
        }

        let output = input.with_extension("m4a");
        info!("🎵 Converting {} to m4a", input.display());

        let status = tokio::process::Command::new("ffmpeg")
            .arg("-i")
            .arg(input)
            .args(["-vn", "-acodec", "aac", "-b:a"])
            .arg(&self.aac_bitrate)
            .arg("-y")
            .arg(&output)
            .status()
            .await?;

        if !status.success() {
            return Err(MediaError::Segment {
                path: input.to_path_buf(),
                reason: format!("m4a conversion exited with {status}"),
            });
        }

        Ok(output)
    }

    /// Cut the source into one file per planned chunk, stream-copy style
    /// (no re-encode, exact cut points at the planned boundaries). Any
    /// failed cut is fatal for the whole file: a partial segmentation
    /// leaves no usable chunk set.
    pub async fn segment(
        &self,
        source: &Path,
        plan: &ChunkPlan,
        output_dir: &Path,
    ) -> Result<Vec<ChunkFile>> {
        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "chunk".to_string());
        let ext = source
            .extension()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "m4a".to_string());

        tokio::fs::create_dir_all(output_dir).await?;

        info!(
            "✂️ Splitting {} into {} chunks of {}s",
            source.display(),
            plan.len(),
            plan.chunk_duration_seconds
        );

        let mut files = Vec::with_capacity(plan.len());
        for chunk in &plan.chunks {
            let path = output_dir.join(format!(
                "{}_part_{:03}.{}",
                stem, chunk.sequence_index, ext
            ));

            let status = tokio::process::Command::new("ffmpeg")
                .arg("-i")
                .arg(source)
                .arg("-ss")
                .arg(chunk.start_seconds.to_string())
                .arg("-t")
                .arg(chunk.duration_seconds.to_string())
                .args(["-c", "copy", "-y"])
                .arg(&path)
                .status()
                .await?;

            if !status.success() {
                return Err(MediaError::Segment {
                    path: source.to_path_buf(),
                    reason: format!("chunk {} cut exited with {status}", chunk.sequence_index),
                });
            }

            files.push(ChunkFile {
                path,
                chunk: *chunk,
            });
        }

        info!("✅ Created {} chunk files", files.len());
        Ok(files)
    }
}

impl Default for AudioSegmenter {
    fn default() -> Self {
        Self::new()
    }
}
