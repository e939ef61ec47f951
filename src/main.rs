use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use crossbeam_channel::Receiver;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use voicecover::processing::{cover_stages, generation_stages, SharedProgress, Stage};
use voicecover::workflow::validation::{append_style_keyword, STYLE_KEYWORDS};
use voicecover::workflow::{AudioFormat, AudioUpload, WorkflowMode};
use voicecover::{InMemoryBackend, ProcessingEvent, Studio, StudioConfig};

#[derive(Parser, Debug)]
#[command(name = "voicecover", version, about = "Create AI voice covers and songs")]
struct Cli {
    /// TOML configuration file
    #[arg(long, env = "VOICECOVER_CONFIG")]
    config: Option<PathBuf>,

    /// Multiplier for processing stage timings (1.0 = real pacing)
    #[arg(long)]
    time_scale: Option<f64>,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,

    /// Directory to save the finished track into
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Download format
    #[arg(long, default_value = "mp3")]
    format: AudioFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Cover an existing song with your voice
    Cover {
        #[arg(long)]
        voice: PathBuf,
        #[arg(long)]
        song: PathBuf,
        /// Defaults to the song file name
        #[arg(long)]
        title: Option<String>,
        #[arg(long, default_value = "")]
        artist: String,
    },
    /// Generate an original song from lyrics
    Generate {
        #[arg(long)]
        voice: PathBuf,
        /// Text file holding the lyrics
        #[arg(long)]
        lyrics: PathBuf,
        #[arg(long)]
        style: Option<String>,
        /// Suggested keyword to append to the style (repeatable)
        #[arg(long = "keyword")]
        keywords: Vec<String>,
    },
    /// List suggested style keywords
    Keywords,
}

fn load_upload(path: &Path) -> Result<AudioUpload> {
    let bytes = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mime_type = AudioUpload::guess_mime_type(&file_name);
    Ok(AudioUpload::new(file_name, mime_type, bytes))
}

/// Print stage transitions until the run ends
async fn report_progress(
    events: Receiver<ProcessingEvent>,
    progress: SharedProgress,
    stages: Vec<Stage>,
    quiet: bool,
) {
    loop {
        for event in events.try_iter() {
            if let ProcessingEvent::StageStarted { index, .. } = event {
                if !quiet {
                    let label = stages.get(index).map(|s| s.label.as_str()).unwrap_or("");
                    println!("[{:>3}%] {}", progress.snapshot().percent(), label);
                }
            }
        }
        if progress.phase().is_terminal() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "voicecover=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => StudioConfig::load(path)?,
        None => StudioConfig::default(),
    };
    if let Some(scale) = cli.time_scale {
        config = config.with_time_scale(scale);
        config.validate()?;
    }

    let (mode, voice) = match &cli.command {
        Command::Cover { voice, .. } => (WorkflowMode::Cover, voice),
        Command::Generate { voice, .. } => (WorkflowMode::Generation, voice),
        Command::Keywords => {
            for keyword in STYLE_KEYWORDS {
                println!("{}", keyword);
            }
            return Ok(());
        }
    };
    let stages = match mode {
        WorkflowMode::Cover => cover_stages(),
        WorkflowMode::Generation => generation_stages(),
    };

    info!(user_id = %config.user_id, time_scale = config.timing.time_scale, "Starting voicecover");

    let backend = Arc::new(InMemoryBackend::new());
    let mut studio = Studio::connected(config, backend)?;
    studio.select_mode(mode)?;

    studio.submit_voice(load_upload(voice)?).await?;

    match &cli.command {
        Command::Cover {
            song,
            title,
            artist,
            ..
        } => {
            studio
                .submit_song(load_upload(song)?, title.as_deref(), artist)
                .await?;
        }
        Command::Generate {
            lyrics,
            style,
            keywords,
            ..
        } => {
            let text = std::fs::read_to_string(lyrics)
                .with_context(|| format!("Failed to read {}", lyrics.display()))?;
            let style = keywords
                .iter()
                .fold(style.clone().unwrap_or_default(), |prompt, kw| {
                    append_style_keyword(&prompt, kw)
                });
            studio.submit_lyrics(&text, Some(style.as_str())).await?;
        }
        Command::Keywords => {}
    }

    studio.start_processing()?;
    let printer = match (studio.processing_events(), studio.progress()) {
        (Some(events), Some(progress)) => Some(tokio::spawn(report_progress(
            events, progress, stages, cli.json,
        ))),
        _ => None,
    };
    let result = studio.finish_processing().await;
    if let Some(printer) = printer {
        printer.await?;
    }
    let result = result?.context("Processing was cancelled")?;

    studio.set_format(cli.format);
    let download = studio.download().await?;

    let saved = match &cli.output {
        Some(dir) => {
            let path = dir.join(&download.filename);
            std::fs::write(&path, &download.bytes)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            Some(path)
        }
        None => None,
    };

    if cli.json {
        let summary = serde_json::json!({
            "mode": mode,
            "result_id": result.result_id,
            "filename": download.filename,
            "mime_type": download.mime_type,
            "bytes": download.bytes.len(),
            "saved_to": saved,
            "state": {
                "song_title": studio.state().song_title,
                "song_artist": studio.state().song_artist,
                "lyrics_request_id": studio.state().lyrics_request_id,
            },
            "notifications": studio.notifications().iter().collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("{}", studio.machine().completion_headline());
        println!("{}", studio.machine().completion_description());
        println!("Result: {}", result.result_id);
        match saved {
            Some(path) => println!("Saved {} ({} bytes)", path.display(), download.bytes.len()),
            None => println!("{} ({} bytes)", download.filename, download.bytes.len()),
        }
    }

    Ok(())
}
