use mediaflow_rust::{
    derive_timecode, plan_chunks, AggregateTranscript, ChunkTranscript, Timecode, TimecodeSources,
};
use serde_json::json;
use tempfile::TempDir;

#[test]
fn test_timecode_representations_agree() {
    let tc = Timecode::from_offset_seconds(3723.5, 24).unwrap();
    assert_eq!(tc.to_string(), "01:02:03:12");
    assert_eq!(tc.compact(), "01020312");
    // Same value, two external representations.
    assert_eq!(tc.to_string().replace(':', ""), tc.compact());
}

#[test]
fn test_embedded_tag_outranks_frame_timestamp() {
    let sources = TimecodeSources {
        stream_tag: Some("01:02:03:04".to_string()),
        container_tag: None,
        first_frame_seconds: Some(7200.0),
    };
    assert_eq!(
        derive_timecode(std::path::Path::new("clip.mov"), &sources, 24)
            .unwrap()
            .to_string(),
        "01:02:03:04"
    );
}

#[test]
fn test_chunk_plan_for_oversized_upload() {
    let plan = plan_chunks(
        std::path::Path::new("lecture.m4a"),
        100.0,
        50_000_000,
        20_000_000,
    )
    .unwrap();

    assert_eq!(plan.chunk_duration_seconds, 40);
    let bounds: Vec<(f64, f64)> = plan
        .chunks
        .iter()
        .map(|c| (c.start_seconds, c.start_seconds + c.duration_seconds))
        .collect();
    assert_eq!(bounds, vec![(0.0, 40.0), (40.0, 80.0), (80.0, 100.0)]);
}

#[tokio::test]
async fn test_aggregate_document_shape_on_disk() {
    let aggregate = AggregateTranscript::from_parts(vec![
        ChunkTranscript {
            sequence_index: 2,
            payload: Some(json!({"text": "third", "language": "en"})),
            error: None,
        },
        ChunkTranscript {
            sequence_index: 0,
            payload: Some(json!({"text": "first", "language": "en"})),
            error: None,
        },
        ChunkTranscript {
            sequence_index: 1,
            payload: None,
            error: Some("API returned 500".to_string()),
        },
    ]);

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("lecture.json");
    tokio::fs::write(
        &path,
        serde_json::to_string_pretty(&aggregate.to_document()).unwrap(),
    )
    .await
    .unwrap();

    let document: serde_json::Value =
        serde_json::from_str(&tokio::fs::read_to_string(&path).await.unwrap()).unwrap();
    let entries = document.as_array().unwrap();

    // Ordered by sequence index, successful payloads verbatim, a marker
    // in the failed chunk's slot.
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0]["text"], "first");
    assert_eq!(entries[1]["sequence_index"], 1);
    assert_eq!(entries[1]["transcription_failed"], "API returned 500");
    assert_eq!(entries[2]["text"], "third");

    assert_eq!(aggregate.failed_indices(), vec![1]);
}

#[test]
fn test_partial_failure_is_not_total_failure() {
    let aggregate = AggregateTranscript::from_parts(vec![
        ChunkTranscript {
            sequence_index: 0,
            payload: Some(json!({"text": "ok"})),
            error: None,
        },
        ChunkTranscript {
            sequence_index: 1,
            payload: None,
            error: Some("timeout".to_string()),
        },
        ChunkTranscript {
            sequence_index: 2,
            payload: Some(json!({"text": "ok"})),
            error: None,
        },
    ]);

    assert!(aggregate.entries[0].succeeded());
    assert!(aggregate.entries[2].succeeded());
    assert_eq!(aggregate.failed_indices(), vec![1]);
    // The document still persists all three slots.
    assert_eq!(aggregate.to_document().as_array().unwrap().len(), 3);
}
