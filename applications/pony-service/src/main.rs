/// Pony Service - headless background playback
use clap::{Parser, Subcommand, ValueEnum};
use pony_playback::{MediaSource, NoopFocus, PlayMode, PlayState, Track};
use pony_service::{LogSink, PlayService, ServiceConfig, ServiceParts, SimulatedBackend};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "pony-service")]
#[command(about = "Pony Player background playback service", long_about = None)]
struct Cli {
    /// Configuration file path (default: ./pony.toml if present)
    #[arg(short, long, env = "PONY_CONFIG", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play files through the simulated backend and log the streams
    Play {
        /// Audio files, played in order
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Play mode (default: from config)
        #[arg(short, long, value_enum)]
        mode: Option<ModeArg>,

        /// Stop the session after this many seconds
        #[arg(short, long, default_value_t = 30)]
        seconds: u64,

        /// Simulated length of every track, in seconds
        #[arg(long, default_value_t = 10)]
        track_seconds: u64,
    },
    /// Print the effective configuration
    Config,
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    Sequential,
    LoopAll,
    LoopOne,
    Shuffle,
}

impl From<ModeArg> for PlayMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Sequential => PlayMode::Sequential,
            ModeArg::LoopAll => PlayMode::LoopAll,
            ModeArg::LoopOne => PlayMode::LoopOne,
            ModeArg::Shuffle => PlayMode::Shuffle,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = ServiceConfig::load_from(cli.config.as_deref())?;
    config.validate()?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.filter.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command {
        Commands::Play {
            files,
            mode,
            seconds,
            track_seconds,
        } => {
            let mut config = config;
            if let Some(mode) = mode {
                config.playback.play_mode = mode.into();
            }
            play(
                &config,
                &files,
                Duration::from_secs(seconds),
                Duration::from_secs(track_seconds),
            )
            .await?;
        }
        Commands::Config => {
            println!("{}", toml::to_string_pretty(&config)?);
        }
    }

    Ok(())
}

async fn play(
    config: &ServiceConfig,
    files: &[PathBuf],
    session_length: Duration,
    track_length: Duration,
) -> anyhow::Result<()> {
    let tracks: Vec<Track> = files
        .iter()
        .map(|path| track_from_path(path, track_length))
        .collect();
    let Some(first) = tracks.first().cloned() else {
        anyhow::bail!("No files to play");
    };

    let service = PlayService::create(
        config,
        ServiceParts::new(
            Box::new(SimulatedBackend::default()),
            Box::new(NoopFocus),
            Arc::new(LogSink),
        ),
    )?;
    tracing::info!(
        "Playing {} tracks in {:?} mode for {:?}",
        tracks.len(),
        config.playback.play_mode,
        session_length
    );

    let engine = service.engine().clone();
    tokio::task::spawn_blocking(move || engine.replace_all(tracks, first)).await??;

    let streams = service.streams();
    let watcher = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(1));
        loop {
            ticker.tick().await;
            let state = streams.play_state.get();
            if state == PlayState::Playing {
                let title = streams
                    .current_track
                    .get()
                    .map(|t| t.title)
                    .unwrap_or_default();
                tracing::info!(
                    "{} at {}ms",
                    title,
                    streams.play_progress.get()
                );
            }
        }
    });

    tokio::select! {
        _ = tokio::time::sleep(session_length) => {
            tracing::info!("Session length reached");
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Interrupted");
        }
    }

    watcher.abort();
    service.teardown().await?;
    Ok(())
}

/// Track metadata from the file name; cover art from a sibling cover.jpg
fn track_from_path(path: &Path, duration: Duration) -> Track {
    let title = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let album = path
        .parent()
        .and_then(|p| p.file_name())
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "Unknown Album".to_string());
    let cover = path
        .parent()
        .map(|p| p.join("cover.jpg"))
        .filter(|p| p.exists())
        .map(|p| p.display().to_string());

    Track {
        id: path.display().to_string(),
        title,
        artist: "Unknown Artist".to_string(),
        album,
        source: MediaSource::Local(path.to_path_buf()),
        duration,
        cover,
    }
}
