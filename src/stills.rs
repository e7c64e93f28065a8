use anyhow::Result;
use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::probe::MediaProber;
use crate::timecode::derive_timecode;
use crate::video::VideoToolkit;

/// Summary of one stills-extraction run
#[derive(Debug, Clone, Default)]
pub struct StillsReport {
    pub extracted: usize,
    pub skipped: usize,
}

/// Extracts a representative first-frame still from each clip in a
/// folder, named by shoot date and derived timecode:
/// `still_{YYYYMMDD}_{HHMMSSFF}_v{n}.jpg`.
pub struct StillExtractor {
    prober: MediaProber,
    toolkit: VideoToolkit,
    frame_rate: u32,
    date_pattern: Regex,
}

impl StillExtractor {
    pub fn new(frame_rate: u32) -> Self {
        Self {
            prober: MediaProber::new(),
            toolkit: VideoToolkit::new(frame_rate),
            frame_rate,
            date_pattern: Regex::new(r"(\d{8})").unwrap(),
        }
    }

    /// Process every `.mov` clip in a folder. A clip with no usable
    /// timecode source or no date in its filename is skipped; the batch
    /// always continues.
    pub async fn extract_folder(&self, folder: &Path) -> Result<StillsReport> {
        let mut report = StillsReport::default();

        let mut clips = Vec::new();
        let mut entries = tokio::fs::read_dir(folder).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.is_file()
                && path
                    .extension()
                    .map_or(false, |ext| ext.eq_ignore_ascii_case("mov"))
            {
                clips.push(path);
            }
        }
        clips.sort();

        info!("🎞️ Found {} clips in {}", clips.len(), folder.display());

        for clip in clips {
            match self.extract_one(&clip).await {
                Ok(output) => {
                    info!("🖼️ Created still: {}", output.display());
                    report.extracted += 1;
                }
                Err(e) => {
                    warn!("⏭️ Skipping {}: {:#}", clip.display(), e);
                    report.skipped += 1;
                }
            }
        }

        Ok(report)
    }

    async fn extract_one(&self, clip: &Path) -> Result<PathBuf> {
        let sources = self.prober.probe_timecode_sources(clip).await?;
        let timecode = derive_timecode(clip, &sources, self.frame_rate)?;

        let filename = clip
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        let date = self
            .date_pattern
            .captures(&filename)
            .map(|c| c[1].to_string())
            .ok_or_else(|| anyhow::anyhow!("no YYYYMMDD date in filename {filename}"))?;

        let output = versioned_still_path(
            clip.parent().unwrap_or(Path::new(".")),
            &format!("still_{}_{}", date, timecode.compact()),
        );

        self.toolkit.extract_first_frame(clip, &output).await?;
        Ok(output)
    }
}

/// First `{base}_v{n}.jpg` in a folder that does not already exist.
fn versioned_still_path(folder: &Path, base: &str) -> PathBuf {
    let mut version = 1;
    loop {
        let candidate = folder.join(format!("{base}_v{version}.jpg"));
        if !candidate.exists() {
            return candidate;
        }
        version += 1;
    }
}
