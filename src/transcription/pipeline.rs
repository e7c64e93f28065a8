use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use crate::audio::{AudioSegmenter, ChunkFile};
use crate::chunking::{plan_chunks, Chunk};
use crate::error::{MediaError, Result};
use crate::probe::{MediaProber, ProbeReport};
use crate::transcription::client::TranscribeBackend;

/// Per-file pipeline stages. `Failed` is reachable from `Probed`
/// (unprobeable) and `Segmenting` (fatal cut error); a chunk's
/// transcription failure is recorded in the aggregate instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineStage {
    Received,
    Probed,
    DirectTranscribe,
    ChunkPlanned,
    Segmenting,
    PerChunkTranscribing,
    Aggregating,
    Persisted,
    Failed,
}

/// Transcription output for one chunk: the service payload verbatim, or
/// a recorded failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkTranscript {
    pub sequence_index: usize,
    pub payload: Option<Value>,
    pub error: Option<String>,
}

impl ChunkTranscript {
    pub fn succeeded(&self) -> bool {
        self.payload.is_some()
    }
}

/// Order-preserving combination of all per-chunk transcription outputs
/// for one source file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregateTranscript {
    pub entries: Vec<ChunkTranscript>,
}

impl AggregateTranscript {
    /// Materialize the aggregate from per-chunk results in whatever
    /// order they completed. The output is always sorted by
    /// `sequence_index`.
    pub fn from_parts(mut parts: Vec<ChunkTranscript>) -> Self {
        parts.sort_by_key(|p| p.sequence_index);
        Self { entries: parts }
    }

    pub fn failed_indices(&self) -> Vec<usize> {
        self.entries
            .iter()
            .filter(|e| !e.succeeded())
            .map(|e| e.sequence_index)
            .collect()
    }

    /// Persisted document: an ordered array of per-chunk payloads,
    /// passed through verbatim, with a marker object in each failed
    /// chunk's slot.
    pub fn to_document(&self) -> Value {
        Value::Array(
            self.entries
                .iter()
                .map(|e| match &e.payload {
                    Some(payload) => payload.clone(),
                    None => json!({
                        "sequence_index": e.sequence_index,
                        "transcription_failed": e.error,
                    }),
                })
                .collect(),
        )
    }
}

/// Report for one processed file. A file with failed chunks still
/// persists: success with warnings, not total failure.
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub source: PathBuf,
    pub output_path: PathBuf,
    /// Stages traversed, ending in `Persisted`.
    pub stages_completed: Vec<PipelineStage>,
    pub total_chunks: usize,
    pub failed_chunks: Vec<usize>,
}

/// Chunked transcription pipeline: probe, plan, segment, transcribe,
/// aggregate, persist.
pub struct TranscribePipeline {
    prober: MediaProber,
    segmenter: AudioSegmenter,
    backend: Arc<dyn TranscribeBackend>,
    max_upload_bytes: u64,
    max_concurrent: usize,
    cleanup_chunks: bool,
}

impl TranscribePipeline {
    pub fn new(backend: Arc<dyn TranscribeBackend>, max_upload_bytes: u64) -> Self {
        Self {
            prober: MediaProber::new(),
            segmenter: AudioSegmenter::new(),
            backend,
            max_upload_bytes,
            max_concurrent: num_cpus::get().min(4),
            cleanup_chunks: true,
        }
    }

    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent.max(1);
        self
    }

    pub fn with_cleanup(mut self, cleanup: bool) -> Self {
        self.cleanup_chunks = cleanup;
        self
    }

    /// Process one source file end to end and persist the aggregate
    /// transcript as `<stem>.json` next to the source. The document is
    /// written exactly once, after every chunk attempt has resolved.
    pub async fn process_file(&self, input: &Path) -> Result<PipelineReport> {
        info!("📥 Received {}", input.display());

        let upload = self
            .segmenter
            .convert_to_m4a(input)
            .await
            .map_err(|e| fail_at(PipelineStage::Received, e))?;
        let probe = self
            .prober
            .probe(&upload)
            .await
            .map_err(|e| fail_at(PipelineStage::Probed, e))?;
        info!(
            "🔍 Probed: {:.1}s, {:.1} MB",
            probe.duration_seconds,
            probe.byte_size as f64 / 1_000_000.0
        );

        self.transcribe_probed(input, &upload, &probe).await
    }

    /// The post-probe half of the pipeline: plan, segment, transcribe,
    /// aggregate, persist.
    async fn transcribe_probed(
        &self,
        input: &Path,
        upload: &Path,
        probe: &ProbeReport,
    ) -> Result<PipelineReport> {
        let mut stages = vec![PipelineStage::Received, PipelineStage::Probed];

        let entries = if probe.byte_size <= self.max_upload_bytes {
            info!("📄 File fits the upload limit, transcribing whole");
            stages.push(PipelineStage::DirectTranscribe);
            let chunk = Chunk {
                start_seconds: 0.0,
                duration_seconds: probe.duration_seconds,
                sequence_index: 0,
            };
            self.transcribe_chunks(vec![ChunkFile {
                path: upload.to_path_buf(),
                chunk,
            }])
            .await
        } else {
            let plan = plan_chunks(
                upload,
                probe.duration_seconds,
                probe.byte_size,
                self.max_upload_bytes,
            )
            .map_err(|e| fail_at(PipelineStage::Probed, e))?;
            stages.push(PipelineStage::ChunkPlanned);
            info!(
                "🗂️ Planned {} chunks of {}s",
                plan.len(),
                plan.chunk_duration_seconds
            );

            stages.push(PipelineStage::Segmenting);
            let chunk_dir = upload.parent().unwrap_or(Path::new(".")).to_path_buf();
            let files = self
                .segmenter
                .segment(upload, &plan, &chunk_dir)
                .await
                .map_err(|e| fail_at(PipelineStage::Segmenting, e))?;

            stages.push(PipelineStage::PerChunkTranscribing);
            let paths: Vec<PathBuf> = files.iter().map(|f| f.path.clone()).collect();
            let entries = self.transcribe_chunks(files).await;

            if self.cleanup_chunks {
                for path in paths {
                    let _ = tokio::fs::remove_file(path).await;
                }
            }
            entries
        };

        stages.push(PipelineStage::Aggregating);
        let aggregate = AggregateTranscript::from_parts(entries);
        let failed_chunks = aggregate.failed_indices();
        let total_chunks = aggregate.entries.len();

        for index in &failed_chunks {
            warn!("⚠️ Chunk {} of {} failed to transcribe", index, input.display());
        }

        let output_path = upload.with_extension("json");
        let document = serde_json::to_string_pretty(&aggregate.to_document())?;
        tokio::fs::write(&output_path, document).await?;
        stages.push(PipelineStage::Persisted);
        info!("💾 Transcript saved to {}", output_path.display());

        Ok(PipelineReport {
            source: input.to_path_buf(),
            output_path,
            stages_completed: stages,
            total_chunks,
            failed_chunks,
        })
    }

    /// Transcribe chunk files with bounded concurrency. Completion order
    /// is irrelevant: the caller re-sorts by sequence index. A chunk's
    /// failure never aborts its siblings.
    async fn transcribe_chunks(&self, files: Vec<ChunkFile>) -> Vec<ChunkTranscript> {
        stream::iter(files)
            .map(|file| {
                let backend = Arc::clone(&self.backend);
                async move {
                    let index = file.chunk.sequence_index;
                    match backend.transcribe(&file.path).await {
                        Ok(payload) => ChunkTranscript {
                            sequence_index: index,
                            payload: Some(payload),
                            error: None,
                        },
                        Err(e) => ChunkTranscript {
                            sequence_index: index,
                            payload: None,
                            error: Some(e.to_string()),
                        },
                    }
                }
            })
            .buffer_unordered(self.max_concurrent)
            .collect()
            .await
    }
}

/// Log the stage a file's processing died in before propagating.
fn fail_at(stage: PipelineStage, err: MediaError) -> MediaError {
    warn!(
        "❌ {:?} -> {:?}: {}",
        stage,
        PipelineStage::Failed,
        err
    );
    err
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MediaError;
    use async_trait::async_trait;

    struct FakeBackend {
        fail_on: Vec<String>,
    }

    #[async_trait]
    impl TranscribeBackend for FakeBackend {
        async fn transcribe(&self, path: &Path) -> Result<Value> {
            let name = path.file_name().unwrap().to_string_lossy().to_string();
            if self.fail_on.contains(&name) {
                return Err(MediaError::Transcription {
                    path: path.to_path_buf(),
                    reason: "simulated outage".to_string(),
                });
            }
            Ok(json!({ "text": format!("transcript of {name}") }))
        }
    }

    fn chunk_files(count: usize) -> Vec<ChunkFile> {
        (0..count)
            .map(|i| ChunkFile {
                path: PathBuf::from(format!("part_{i:03}.m4a")),
                chunk: Chunk {
                    start_seconds: i as f64 * 40.0,
                    duration_seconds: 40.0,
                    sequence_index: i,
                },
            })
            .collect()
    }

    #[test]
    fn test_aggregate_resorts_reverse_completions() {
        let parts = vec![
            ChunkTranscript {
                sequence_index: 2,
                payload: Some(json!({"text": "c"})),
                error: None,
            },
            ChunkTranscript {
                sequence_index: 1,
                payload: Some(json!({"text": "b"})),
                error: None,
            },
            ChunkTranscript {
                sequence_index: 0,
                payload: Some(json!({"text": "a"})),
                error: None,
            },
        ];
        let aggregate = AggregateTranscript::from_parts(parts);
        let order: Vec<usize> = aggregate.entries.iter().map(|e| e.sequence_index).collect();
        assert_eq!(order, vec![0, 1, 2]);
        assert_eq!(aggregate.to_document()[0]["text"], "a");
    }

    #[tokio::test]
    async fn test_partial_failure_keeps_siblings() {
        let backend = Arc::new(FakeBackend {
            fail_on: vec!["part_001.m4a".to_string()],
        });
        let pipeline = TranscribePipeline::new(backend, 20_000_000);

        let entries = pipeline.transcribe_chunks(chunk_files(3)).await;
        let aggregate = AggregateTranscript::from_parts(entries);

        assert_eq!(aggregate.entries.len(), 3);
        assert!(aggregate.entries[0].succeeded());
        assert!(!aggregate.entries[1].succeeded());
        assert!(aggregate.entries[2].succeeded());
        assert_eq!(aggregate.failed_indices(), vec![1]);

        let doc = aggregate.to_document();
        assert_eq!(doc[1]["sequence_index"], 1);
        assert!(doc[1]["transcription_failed"].is_string());
    }

    #[tokio::test]
    async fn test_direct_path_records_stage_progression() {
        let dir = tempfile::TempDir::new().unwrap();
        let input = dir.path().join("note.m4a");
        tokio::fs::write(&input, b"audio bytes").await.unwrap();

        let backend = Arc::new(FakeBackend { fail_on: vec![] });
        let pipeline = TranscribePipeline::new(backend, 20_000_000);
        let probe = ProbeReport {
            path: input.clone(),
            duration_seconds: 10.0,
            byte_size: 11,
            timecode_sources: Default::default(),
            raw: json!({}),
        };

        let report = pipeline
            .transcribe_probed(&input, &input, &probe)
            .await
            .unwrap();

        assert_eq!(
            report.stages_completed,
            vec![
                PipelineStage::Received,
                PipelineStage::Probed,
                PipelineStage::DirectTranscribe,
                PipelineStage::Aggregating,
                PipelineStage::Persisted,
            ]
        );
        assert_eq!(report.total_chunks, 1);
        assert!(report.failed_chunks.is_empty());
        assert!(report.output_path.exists());
    }

    #[tokio::test]
    async fn test_concurrent_chunks_come_back_in_order() {
        let backend = Arc::new(FakeBackend { fail_on: vec![] });
        let pipeline = TranscribePipeline::new(backend, 20_000_000).with_max_concurrent(4);

        let entries = pipeline.transcribe_chunks(chunk_files(8)).await;
        let aggregate = AggregateTranscript::from_parts(entries);
        let order: Vec<usize> = aggregate.entries.iter().map(|e| e.sequence_index).collect();
        assert_eq!(order, (0..8).collect::<Vec<_>>());
        assert!(aggregate.failed_indices().is_empty());
    }
}
