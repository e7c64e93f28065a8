use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{MediaError, Result};
use crate::timecode::TimecodeSources;

/// Probe data extracted from a media file
#[derive(Debug, Clone)]
pub struct ProbeReport {
    pub path: PathBuf,
    pub duration_seconds: f64,
    pub byte_size: u64,
    /// Embedded timecode tags found in the container/streams.
    pub timecode_sources: TimecodeSources,
    /// Raw ffprobe JSON, passed through to cataloging.
    pub raw: Value,
}

/// Media prober built on the ffprobe command line tool
#[derive(Debug, Clone, Default)]
pub struct MediaProber;

impl MediaProber {
    pub fn new() -> Self {
        Self
    }

    /// Probe format and stream information for a file.
    pub async fn probe(&self, path: &Path) -> Result<ProbeReport> {
        debug!("🔍 Probing {}", path.display());

        let data = self
            .run_ffprobe(
                path,
                &[
                    "-v",
                    "quiet",
                    "-print_format",
                    "json",
                    "-show_format",
                    "-show_streams",
                ],
            )
            .await?;

        let duration_seconds: f64 = data["format"]["duration"]
            .as_str()
            .and_then(|s| s.parse().ok())
            .unwrap_or(0.0);

        let byte_size = tokio::fs::metadata(path).await?.len();

        Ok(ProbeReport {
            path: path.to_path_buf(),
            duration_seconds,
            byte_size,
            timecode_sources: extract_tag_sources(&data),
            raw: data,
        })
    }

    /// Collect every timestamp source usable for timecode derivation:
    /// stream and container timecode tags plus the first frame's
    /// presentation timestamp.
    pub async fn probe_timecode_sources(&self, path: &Path) -> Result<TimecodeSources> {
        let data = self
            .run_ffprobe(
                path,
                &[
                    "-v",
                    "quiet",
                    "-select_streams",
                    "v:0",
                    "-show_entries",
                    "stream_tags=timecode",
                    "-show_entries",
                    "format_tags=timecode",
                    "-show_entries",
                    "frame=pkt_pts_time,pts_time,best_effort_timestamp_time",
                    "-read_intervals",
                    "%+#1",
                    "-show_frames",
                    "-of",
                    "json",
                ],
            )
            .await?;

        let mut sources = extract_tag_sources(&data);
        sources.first_frame_seconds = first_frame_seconds(&data);
        Ok(sources)
    }

    async fn run_ffprobe(&self, path: &Path, args: &[&str]) -> Result<Value> {
        let output = tokio::process::Command::new("ffprobe")
            .args(args)
            .arg(path)
            .output()
            .await?;

        if !output.status.success() {
            return Err(MediaError::UnprobeableMedia {
                path: path.to_path_buf(),
                reason: format!("ffprobe exited with {}", output.status),
            });
        }

        serde_json::from_slice(&output.stdout).map_err(|e| MediaError::UnprobeableMedia {
            path: path.to_path_buf(),
            reason: format!("unparseable ffprobe output: {e}"),
        })
    }
}

fn extract_tag_sources(data: &Value) -> TimecodeSources {
    let stream_tag = data["streams"]
        .as_array()
        .and_then(|streams| streams.first())
        .and_then(|s| s["tags"]["timecode"].as_str())
        .map(str::to_string);

    let container_tag = data["format"]["tags"]["timecode"].as_str().map(str::to_string);

    TimecodeSources {
        stream_tag,
        container_tag,
        first_frame_seconds: None,
    }
}

fn first_frame_seconds(data: &Value) -> Option<f64> {
    let frame = data["frames"].as_array()?.first()?;
    for key in ["pkt_pts_time", "pts_time", "pkt_dts_time", "best_effort_timestamp_time"] {
        if let Some(t) = frame[key].as_str().and_then(|s| s.parse::<f64>().ok()) {
            return Some(t);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_stream_tag_extraction() {
        let data = json!({
            "streams": [{"tags": {"timecode": "01:02:03:04"}}],
            "format": {"tags": {"timecode": "05:06:07:08"}}
        });
        let sources = extract_tag_sources(&data);
        assert_eq!(sources.stream_tag.as_deref(), Some("01:02:03:04"));
        assert_eq!(sources.container_tag.as_deref(), Some("05:06:07:08"));
    }

    #[test]
    fn test_missing_tags_are_none() {
        let data = json!({"streams": [{}], "format": {}});
        let sources = extract_tag_sources(&data);
        assert!(sources.stream_tag.is_none());
        assert!(sources.container_tag.is_none());
    }

    #[test]
    fn test_first_frame_timestamp_key_fallback() {
        let data = json!({"frames": [{"best_effort_timestamp_time": "1.25"}]});
        assert_eq!(first_frame_seconds(&data), Some(1.25));
        let data = json!({"frames": [{"pkt_pts_time": "0.5", "pts_time": "9.9"}]});
        assert_eq!(first_frame_seconds(&data), Some(0.5));
        let data = json!({"frames": []});
        assert_eq!(first_frame_seconds(&data), None);
    }
}
