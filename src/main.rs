use anyhow::{anyhow, Result};
use clap::{Arg, Command};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

mod airtable;
mod audio;
mod chunking;
mod config;
mod error;
mod export;
mod ingest;
mod probe;
mod slack;
mod stills;
mod timecode;
mod transcription;
mod video;
mod watcher;

use crate::airtable::AirtableClient;
use crate::config::Config;
use crate::export::{MarkdownOptions, ViewExporter};
use crate::ingest::ShootIngest;
use crate::slack::SlackPoster;
use crate::stills::StillExtractor;
use crate::transcription::{TranscribePipeline, WhisperClient};
use crate::video::VideoToolkit;
use crate::watcher::DropFolderWatcher;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("mediaflow=info,warn")
        .init();

    let matches = Command::new("mediaflow")
        .version("0.1.0")
        .about("Media production workflow tools")
        .subcommand_required(true)
        .subcommand(
            Command::new("timecode")
                .about("Stamp a creation-time timecode onto a clip (metadata only)")
                .arg(
                    Arg::new("file")
                        .value_name("FILE")
                        .help("Video file to stamp")
                        .required(true),
                ),
        )
        .subcommand(
            Command::new("transcribe")
                .about("Transcribe an audio/video file, chunking oversized uploads")
                .arg(
                    Arg::new("file")
                        .value_name("FILE")
                        .help("Media file to transcribe")
                        .required(true),
                ),
        )
        .subcommand(
            Command::new("watch")
                .about("Watch a drop folder, transcribe new audio files, post to Slack"),
        )
        .subcommand(
            Command::new("ingest")
                .about("Rename camera-card footage and catalog it into Airtable")
                .arg(
                    Arg::new("folder")
                        .value_name("DIR")
                        .help("Shoot folder (defaults to the current directory)"),
                ),
        )
        .subcommand(
            Command::new("at2md")
                .about("Export an Airtable view as a markdown document")
                .arg(
                    Arg::new("table")
                        .long("table")
                        .value_name("TABLE")
                        .help("Airtable table name")
                        .required(true),
                )
                .arg(
                    Arg::new("view")
                        .long("view")
                        .value_name("VIEW")
                        .help("View within the table")
                        .required(true),
                )
                .arg(
                    Arg::new("base")
                        .long("base")
                        .value_name("BASE_ID")
                        .help("Airtable base ID (defaults to the configured base)"),
                )
                .arg(
                    Arg::new("hero")
                        .long("hero")
                        .value_name("FIELD")
                        .help("Field holding each record's hero image URL"),
                )
                .arg(
                    Arg::new("output")
                        .long("output")
                        .value_name("FILE")
                        .help("Output path (defaults to airtable-export-{timestamp}.md)"),
                ),
        )
        .subcommand(
            Command::new("stills")
                .about("Extract a timecode-named first-frame still from each clip")
                .arg(
                    Arg::new("folder")
                        .value_name("DIR")
                        .help("Folder of clips (defaults to the current directory)"),
                ),
        )
        .get_matches();

    let config = Config::load().unwrap_or_else(|e| {
        warn!("Failed to load config, using defaults: {}", e);
        Config::from_env()
    });
    config.validate()?;

    match matches.subcommand() {
        Some(("timecode", sub)) => {
            let file = PathBuf::from(sub.get_one::<String>("file").unwrap());
            let toolkit = VideoToolkit::new(config.timecode.frame_rate);
            let tc = toolkit.creation_timecode(&file).await?;
            info!("🕒 Calculated timecode: {}", tc);
            let output = toolkit.stamp_timecode(&file, &tc).await?;
            info!("🎉 Wrote {}", output.display());
        }
        Some(("transcribe", sub)) => {
            let file = PathBuf::from(sub.get_one::<String>("file").unwrap());
            if config.transcription.api_key.is_none() {
                return Err(anyhow!("OPENAI_API_KEY is not set"));
            }
            let backend = Arc::new(WhisperClient::new(&config.transcription));
            let pipeline = TranscribePipeline::new(backend, config.transcription.max_upload_bytes)
                .with_max_concurrent(config.transcription.max_concurrent_chunks);

            let report = pipeline.process_file(&file).await?;
            if report.failed_chunks.is_empty() {
                info!("🎉 Transcribed {} chunk(s)", report.total_chunks);
            } else {
                warn!(
                    "⚠️ Transcribed with warnings: {}/{} chunks failed",
                    report.failed_chunks.len(),
                    report.total_chunks
                );
            }
            info!("💾 Output: {}", report.output_path.display());
        }
        Some(("watch", _)) => {
            if config.transcription.api_key.is_none() {
                return Err(anyhow!("OPENAI_API_KEY is not set"));
            }
            let backend = Arc::new(WhisperClient::new(&config.transcription));
            let slack = SlackPoster::from_config(&config.slack);
            if slack.is_none() {
                warn!("Slack is not configured; transcripts will not be posted");
            }
            let watcher = DropFolderWatcher::new(config.watch.clone(), backend, slack);
            watcher.run().await?;
        }
        Some(("ingest", sub)) => {
            let folder = sub
                .get_one::<String>("folder")
                .map(PathBuf::from)
                .unwrap_or(std::env::current_dir()?);
            let ingest = ShootIngest::new(&config.airtable)?;
            let report = ingest.ingest_shoot(&folder).await?;
            info!(
                "🎉 Ingested {} files ({} failures)",
                report.cataloged, report.failures
            );
        }
        Some(("at2md", sub)) => {
            let mut airtable = config.airtable.clone();
            if let Some(base) = sub.get_one::<String>("base") {
                airtable.base_id = Some(base.clone());
            }
            let client = AirtableClient::from_config(&airtable)?;
            let options = MarkdownOptions {
                hero_field: sub.get_one::<String>("hero").cloned(),
                ..Default::default()
            };
            let exporter = ViewExporter::new(client, options);

            let table = sub.get_one::<String>("table").unwrap();
            let view = sub.get_one::<String>("view").unwrap();
            let output = sub.get_one::<String>("output").map(PathBuf::from);
            let path = exporter.export(table, view, output).await?;
            info!("🎉 Wrote {}", path.display());
        }
        Some(("stills", sub)) => {
            let folder = sub
                .get_one::<String>("folder")
                .map(PathBuf::from)
                .unwrap_or(std::env::current_dir()?);
            let extractor = StillExtractor::new(config.timecode.frame_rate);
            let report = extractor.extract_folder(&folder).await?;
            info!(
                "🎉 Extracted {} stills ({} skipped)",
                report.extracted, report.skipped
            );
        }
        _ => unreachable!("subcommand required"),
    }

    Ok(())
}
