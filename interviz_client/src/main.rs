//! interviz traffic-scene client
//!
//! Connects to a scene server, builds the road network and plays back the
//! recorded agents. Playback is controlled from stdin.

use clap::Parser;
use interviz_client::{
    ClientConfig, ClientSession, ConsoleNotifier, ControlCommand, Notifier, ParseCommandError, SessionError,
    SessionSummary,
};
use interviz_core::{RetainedScene, SceneGraph};
use interviz_env::{TokioContext, WsTransport};
use std::path::PathBuf;
use std::sync::Arc;
use std::io::BufRead;
use tokio::sync::mpsc;
use tracing::{debug, info, warn, Level};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "interviz-client")]
#[command(about = "3D viewer for recorded traffic scenes", long_about = None)]
struct Args {
    /// WebSocket endpoint of the scene server
    #[arg(short, long, default_value = "ws://localhost:8765")]
    url: String,

    /// Display ticks per second
    #[arg(long, default_value = "60")]
    tick_hz: u32,

    /// Ticks between frame requests while playing
    #[arg(short, long, default_value = "5")]
    cadence: u32,

    /// First frame index to request
    #[arg(short, long, default_value = "0")]
    start_index: u64,

    /// Start playing immediately instead of paused
    #[arg(short, long)]
    play: bool,

    /// Stream the scene to a Rerun viewer (needs the `visualization` feature)
    #[arg(long)]
    rerun: bool,

    /// Write applied frames to a JSON file on exit
    #[arg(long)]
    record: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn config(&self) -> ClientConfig {
        ClientConfig {
            endpoint: self.url.clone(),
            tick_rate_hz: self.tick_hz,
            request_cadence: self.cadence,
            start_index: self.start_index,
            start_playing: self.play,
            record_path: self.record.clone(),
            ..Default::default()
        }
    }
}

/// Forwards stdin lines as control commands until stdin or the session ends.
///
/// Runs on a plain thread so a pending read never holds up runtime shutdown.
fn read_commands(commands: mpsc::Sender<ControlCommand>) {
    for line in std::io::stdin().lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                debug!(error = %e, "stdin closed");
                break;
            }
        };
        match line.parse::<ControlCommand>() {
            Ok(command) => {
                if commands.blocking_send(command).is_err() {
                    break;
                }
            }
            Err(ParseCommandError::Empty) => {}
            Err(e) => {
                warn!("{}", e);
                eprintln!("{}", ControlCommand::HELP);
            }
        }
    }
}

async fn run<S: SceneGraph>(config: ClientConfig, scene: S) -> Result<SessionSummary, SessionError> {
    let transport = Arc::new(WsTransport::connect(&config.endpoint).await?);
    let session = ClientSession::new(
        config,
        TokioContext::shared(),
        transport,
        scene,
        Box::new(ConsoleNotifier),
    )?;

    let (commands_tx, commands_rx) = mpsc::channel(32);
    std::thread::spawn(move || read_commands(commands_tx));
    eprintln!("{}", ControlCommand::HELP);

    session.run(commands_rx).await
}

#[cfg(feature = "visualization")]
async fn run_selected(config: ClientConfig, rerun: bool) -> Result<SessionSummary, SessionError> {
    if rerun {
        let scene = interviz_core::visualization::RerunScene::spawn("interviz")?;
        return run(config, scene).await;
    }
    run(config, RetainedScene::new()).await
}

#[cfg(not(feature = "visualization"))]
async fn run_selected(config: ClientConfig, rerun: bool) -> Result<SessionSummary, SessionError> {
    if rerun {
        warn!("--rerun needs the `visualization` feature, rendering headless");
    }
    run(config, RetainedScene::new()).await
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Initialize logging; RUST_LOG overrides the default level
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("interviz client v{}", env!("CARGO_PKG_VERSION"));

    match run_selected(args.config(), args.rerun).await {
        Ok(summary) => {
            info!(
                session = %summary.session_id,
                frames_applied = summary.frames_applied,
                frames_discarded = summary.frames_discarded,
                requests_sent = summary.requests_sent,
                ticks = summary.ticks,
                "done"
            );
        }
        Err(SessionError::Env(e)) => {
            ConsoleNotifier.alert(&format!("could not connect to {}: {}", args.url, e));
            std::process::exit(1);
        }
        Err(SessionError::Scene(e)) => {
            ConsoleNotifier.alert(&format!("scene error: {}", e));
            std::process::exit(1);
        }
        // The session already alerted the user
        Err(SessionError::ConnectionLost | SessionError::Transport(_)) => std::process::exit(1),
    }
}
