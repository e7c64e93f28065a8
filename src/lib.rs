//! mediaflow - Media production workflow tools
//!
//! Command-line utilities for a video/audio production workflow:
//! timecode stamping, drop-folder transcription, chunked transcription
//! of oversized media, camera-card cataloging, still extraction, and
//! Airtable-to-markdown export.

pub mod airtable;
pub mod audio;
pub mod chunking;
pub mod config;
pub mod error;
pub mod export;
pub mod ingest;
pub mod probe;
pub mod slack;
pub mod stills;
pub mod timecode;
pub mod transcription;
pub mod video;
pub mod watcher;

// Re-export main types for easy access
pub use crate::audio::{AudioSegmenter, ChunkFile};
pub use crate::chunking::{plan_chunks, Chunk, ChunkPlan};
pub use crate::config::{Config, ConfigBuilder};
pub use crate::airtable::{AirtableClient, AirtableRecord};
pub use crate::error::{MediaError, Result};
pub use crate::export::{format_markdown, MarkdownOptions, ViewExporter};
pub use crate::ingest::{IngestReport, ShootIngest};
pub use crate::probe::{MediaProber, ProbeReport};
pub use crate::stills::{StillExtractor, StillsReport};
pub use crate::timecode::{
    derive_timecode, MediaTimestamp, Timecode, TimecodeSources, TimestampOrigin,
};
pub use crate::transcription::{
    AggregateTranscript, ChunkTranscript, PipelineReport, PipelineStage, TranscribeBackend,
    TranscribePipeline, WhisperClient,
};
pub use crate::video::VideoToolkit;
pub use crate::watcher::DropFolderWatcher;
