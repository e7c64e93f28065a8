//! Chunked transcription against a size-limited speech API

pub mod client;
pub mod pipeline;

pub use client::{transcript_text, TranscribeBackend, WhisperClient};
pub use pipeline::{AggregateTranscript, ChunkTranscript, PipelineReport, PipelineStage, TranscribePipeline};
