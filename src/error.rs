use std::path::PathBuf;

/// Result type for core mediaflow operations
pub type Result<T> = std::result::Result<T, MediaError>;

/// Error taxonomy for the media pipeline.
///
/// Failures are captured at the smallest unit of work: a single asset
/// (timecode derivation), a single file (probing, segmentation), or a
/// single chunk (transcription). Sibling units in the same batch always
/// keep going.
#[derive(thiserror::Error, Debug)]
pub enum MediaError {
    /// No embedded timecode tag and no decodable frame timestamp.
    /// Skip the asset, continue the batch.
    #[error("no timecode source available for {}", path.display())]
    NoTimecodeSource { path: PathBuf },

    /// ffprobe failed or reported a zero duration. Skip the file.
    #[error("unprobeable media {}: {reason}", path.display())]
    UnprobeableMedia { path: PathBuf, reason: String },

    /// Segmentation failed. Fatal for this file: a failed cut leaves
    /// no usable chunks. The batch continues with the next file.
    #[error("segmentation failed for {}: {reason}", path.display())]
    Segment { path: PathBuf, reason: String },

    /// A transcription call failed. Fatal only for the offending chunk.
    #[error("transcription failed for {}: {reason}", path.display())]
    Transcription { path: PathBuf, reason: String },

    #[error("invalid timecode input: {0}")]
    InvalidTimecode(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}
