use chrono::{DateTime, Local, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use crate::error::{MediaError, Result};

/// Frame rate used across the production workflow (24 fps footage).
pub const DEFAULT_FRAME_RATE: u32 = 24;

/// Where a timestamp for an asset came from.
///
/// Embedded tags are camera-recorded ground truth and always win over a
/// value recomputed from frame timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimestampOrigin {
    WallClock,
    EmbeddedTag,
    FramePresentationTime,
}

/// A point in time associated with a media asset. Derived per file,
/// never stored.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MediaTimestamp {
    pub origin: TimestampOrigin,
    /// Unix epoch seconds for wall-clock timestamps, elapsed seconds
    /// otherwise.
    pub seconds: f64,
    pub frame_rate: u32,
}

impl MediaTimestamp {
    pub fn new(origin: TimestampOrigin, seconds: f64, frame_rate: u32) -> Self {
        Self {
            origin,
            seconds,
            frame_rate,
        }
    }

    /// Convert to a canonical timecode.
    pub fn to_timecode(&self) -> Result<Timecode> {
        match self.origin {
            TimestampOrigin::WallClock => {
                let secs = self.seconds.floor() as i64;
                let nanos = ((self.seconds - self.seconds.floor()) * 1e9) as u32;
                let utc = DateTime::from_timestamp(secs, nanos).ok_or_else(|| {
                    MediaError::InvalidTimecode(format!("bad epoch seconds {}", self.seconds))
                })?;
                Timecode::from_wall_clock(utc.with_timezone(&Local), self.frame_rate)
            }
            TimestampOrigin::EmbeddedTag | TimestampOrigin::FramePresentationTime => {
                Timecode::from_offset_seconds(self.seconds, self.frame_rate)
            }
        }
    }
}

/// Canonical `HH:MM:SS:FF` timecode at a fixed frame rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timecode {
    pub hours: u32,
    pub minutes: u32,
    pub seconds: u32,
    pub frames: u32,
    pub frame_rate: u32,
}

impl Timecode {
    /// Build a timecode from the time-of-day components of a wall-clock
    /// timestamp (file creation time). The frame field comes from the
    /// sub-second fraction: `FF = floor(fraction * frame_rate)`.
    pub fn from_wall_clock(created: DateTime<Local>, frame_rate: u32) -> Result<Self> {
        check_frame_rate(frame_rate)?;
        let fraction = f64::from(created.nanosecond() % 1_000_000_000) / 1e9;
        Ok(Self {
            hours: created.hour(),
            minutes: created.minute(),
            seconds: created.second(),
            frames: frames_from_fraction(fraction, frame_rate),
            frame_rate,
        })
    }

    /// Build a timecode from elapsed seconds (a frame's presentation
    /// timestamp). Hours wrap at 24.
    pub fn from_offset_seconds(offset: f64, frame_rate: u32) -> Result<Self> {
        check_frame_rate(frame_rate)?;
        if !offset.is_finite() || offset < 0.0 {
            return Err(MediaError::InvalidTimecode(format!(
                "offset seconds must be non-negative, got {offset}"
            )));
        }
        let whole = offset.floor();
        let total = whole as u64;
        Ok(Self {
            hours: ((total / 3600) % 24) as u32,
            minutes: ((total % 3600) / 60) as u32,
            seconds: (total % 60) as u32,
            frames: frames_from_fraction(offset - whole, frame_rate),
            frame_rate,
        })
    }

    /// Parse an embedded timecode tag such as `01:02:03:04`. Drop-frame
    /// separators (`;`) and other punctuation are tolerated; the tag must
    /// contain exactly eight digits.
    pub fn parse_tag(tag: &str, frame_rate: u32) -> Result<Self> {
        check_frame_rate(frame_rate)?;
        let digits: String = tag.chars().filter(|c| c.is_ascii_digit()).collect();
        if digits.len() != 8 {
            return Err(MediaError::InvalidTimecode(format!(
                "timecode tag {tag:?} does not contain eight digits"
            )));
        }
        let field = |i: usize| digits[i..i + 2].parse::<u32>().unwrap_or(0);
        let (hours, minutes, seconds, frames) = (field(0), field(2), field(4), field(6));
        if hours > 23 || minutes > 59 || seconds > 59 {
            return Err(MediaError::InvalidTimecode(format!(
                "timecode tag {tag:?} out of range"
            )));
        }
        // Frame field is kept verbatim: the camera's tag is ground truth
        // even when its frame rate differs from ours.
        Ok(Self {
            hours,
            minutes,
            seconds,
            frames,
            frame_rate,
        })
    }

    /// Digit-concatenated `HHMMSSFF` form, used for filenames.
    pub fn compact(&self) -> String {
        format!(
            "{:02}{:02}{:02}{:02}",
            self.hours, self.minutes, self.seconds, self.frames
        )
    }
}

impl fmt::Display for Timecode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}:{:02}:{:02}:{:02}",
            self.hours, self.minutes, self.seconds, self.frames
        )
    }
}

/// Timestamp sources collected for one asset, in no particular order.
/// The deriver applies the source priority.
#[derive(Debug, Clone, Default)]
pub struct TimecodeSources {
    /// Per-stream timecode tag (most trustworthy).
    pub stream_tag: Option<String>,
    /// Container-level timecode tag.
    pub container_tag: Option<String>,
    /// First frame's presentation timestamp in seconds (fallback).
    pub first_frame_seconds: Option<f64>,
}

/// Derive a timecode for one asset, preferring the per-stream tag, then
/// the container tag, then the first frame's presentation timestamp.
/// An unparseable tag falls through to the next source.
pub fn derive_timecode(
    source_path: &Path,
    sources: &TimecodeSources,
    frame_rate: u32,
) -> Result<Timecode> {
    for tag in [&sources.stream_tag, &sources.container_tag]
        .into_iter()
        .flatten()
    {
        if let Ok(tc) = Timecode::parse_tag(tag, frame_rate) {
            return Ok(tc);
        }
    }
    if let Some(pts) = sources.first_frame_seconds {
        return Timecode::from_offset_seconds(pts, frame_rate);
    }
    Err(MediaError::NoTimecodeSource {
        path: source_path.to_path_buf(),
    })
}

fn check_frame_rate(frame_rate: u32) -> Result<()> {
    if frame_rate == 0 {
        return Err(MediaError::InvalidTimecode(
            "frame rate must be a positive integer".to_string(),
        ));
    }
    Ok(())
}

fn frames_from_fraction(fraction: f64, frame_rate: u32) -> u32 {
    // Floor, never round: 0.9999s at 24fps is frame 23, not frame 24.
    ((fraction * f64::from(frame_rate)).floor() as u32).min(frame_rate - 1)
}
