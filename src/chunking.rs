use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{MediaError, Result};

/// A contiguous time-bounded slice of a source media file, processed as
/// an independent unit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub start_seconds: f64,
    pub duration_seconds: f64,
    /// 0-based position; defines the output ordering of transcription
    /// results regardless of completion order.
    pub sequence_index: usize,
}

/// Ordered segmentation plan covering a source file end-to-end with no
/// gaps and no overlaps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkPlan {
    pub chunks: Vec<Chunk>,
    /// Uniform chunk length in whole seconds (final chunk may be shorter).
    pub chunk_duration_seconds: u64,
}

impl ChunkPlan {
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

/// Compute a segmentation plan for a file whose size exceeds the
/// transcription service's upload limit.
///
/// Treats the file's average bitrate as uniform:
/// `chunk_duration = ceil(total_duration * max_bytes / byte_size)`.
/// A highly variable-bitrate file can still produce an oversized chunk;
/// that is a known, accepted imprecision of the estimate and is not
/// re-validated after segmentation.
pub fn plan_chunks(
    source: &Path,
    total_duration_seconds: f64,
    total_byte_size: u64,
    max_bytes_per_chunk: u64,
) -> Result<ChunkPlan> {
    if !total_duration_seconds.is_finite() || total_duration_seconds <= 0.0 {
        return Err(MediaError::UnprobeableMedia {
            path: source.to_path_buf(),
            reason: format!("unusable duration {total_duration_seconds}"),
        });
    }
    if total_byte_size == 0 || max_bytes_per_chunk == 0 {
        return Err(MediaError::UnprobeableMedia {
            path: source.to_path_buf(),
            reason: "zero byte size or zero chunk limit".to_string(),
        });
    }

    let chunk_duration_seconds = (total_duration_seconds * max_bytes_per_chunk as f64
        / total_byte_size as f64)
        .ceil()
        .max(1.0) as u64;

    let mut chunks = Vec::new();
    let mut start = 0.0;
    while start < total_duration_seconds {
        let duration = (chunk_duration_seconds as f64).min(total_duration_seconds - start);
        chunks.push(Chunk {
            start_seconds: start,
            duration_seconds: duration,
            sequence_index: chunks.len(),
        });
        start += chunk_duration_seconds as f64;
    }

    Ok(ChunkPlan {
        chunks,
        chunk_duration_seconds,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn src() -> PathBuf {
        PathBuf::from("interview.m4a")
    }

    #[test]
    fn test_plan_matches_bitrate_estimate() {
        let plan = plan_chunks(&src(), 100.0, 50_000_000, 20_000_000).unwrap();
        assert_eq!(plan.chunk_duration_seconds, 40);
        assert_eq!(plan.len(), 3);
        assert_eq!(plan.chunks[0].start_seconds, 0.0);
        assert_eq!(plan.chunks[0].duration_seconds, 40.0);
        assert_eq!(plan.chunks[1].start_seconds, 40.0);
        assert_eq!(plan.chunks[1].duration_seconds, 40.0);
        assert_eq!(plan.chunks[2].start_seconds, 80.0);
        assert_eq!(plan.chunks[2].duration_seconds, 20.0);
    }

    #[test]
    fn test_plan_covers_source_without_gaps() {
        let plan = plan_chunks(&src(), 3601.5, 120_000_000, 20_000_000).unwrap();
        let mut expected_start = 0.0;
        for (i, chunk) in plan.chunks.iter().enumerate() {
            assert_eq!(chunk.sequence_index, i);
            assert!((chunk.start_seconds - expected_start).abs() < 1e-9);
            expected_start = chunk.start_seconds + chunk.duration_seconds;
        }
        let total: f64 = plan.chunks.iter().map(|c| c.duration_seconds).sum();
        assert!((total - 3601.5).abs() < 1e-6);
    }

    #[test]
    fn test_plan_is_idempotent() {
        let a = plan_chunks(&src(), 100.0, 50_000_000, 20_000_000).unwrap();
        let b = plan_chunks(&src(), 100.0, 50_000_000, 20_000_000).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_file_under_limit_yields_single_chunk() {
        let plan = plan_chunks(&src(), 100.0, 10_000_000, 20_000_000).unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(plan.chunks[0].duration_seconds, 100.0);
    }

    #[test]
    fn test_zero_duration_is_unprobeable() {
        let err = plan_chunks(&src(), 0.0, 50_000_000, 20_000_000).unwrap_err();
        assert!(matches!(err, MediaError::UnprobeableMedia { .. }));
    }
}
