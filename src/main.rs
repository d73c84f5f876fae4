//! handcalc - gesture-driven arithmetic from tracked hand poses
//!
//! Turns per-frame hand observations (from an external tracker) into
//! debounced calculator input, evaluated on the `=` gesture.

mod debounce;
mod eval;
mod expression;
pub mod hand;
pub mod ipc;
mod replay;
mod session;
mod speech;

use std::path::PathBuf;

use clap::Parser;
use tracing::info;

use debounce::DebounceConfig;
use ipc::server::{self, ServerOptions};
use session::CalcSession;
use speech::{LogSink, NullSink, SpeechHandle};

#[derive(Parser, Debug)]
#[command(name = "handcalc", about = "Gesture-driven arithmetic calculator core")]
struct Cli {
    /// IPC socket path (default: $XDG_RUNTIME_DIR/handcalc.sock)
    #[arg(long)]
    socket: Option<PathBuf>,

    /// Replay a recorded frame trace instead of serving a tracker
    #[arg(long)]
    replay: Option<PathBuf>,

    /// Drop speech output entirely
    #[arg(long)]
    mute: bool,

    /// Seconds between confirmed events
    #[arg(long, default_value_t = 1.25)]
    cooldown_s: f64,

    /// Maximum per-frame wrist travel for a digit to count as held still
    #[arg(long, default_value_t = 0.03)]
    movement_threshold: f32,

    /// Log all IPC messages
    #[arg(long)]
    ipc_trace: bool,

    /// Show version and exit
    #[arg(long)]
    version: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.version {
        println!("handcalc {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "handcalc=info".into()),
        )
        .init();

    info!("handcalc v{} starting", env!("CARGO_PKG_VERSION"));

    let config = DebounceConfig {
        cooldown_s: cli.cooldown_s,
        movement_threshold: cli.movement_threshold,
        ..DebounceConfig::default()
    };
    let speech = if cli.mute {
        SpeechHandle::spawn(NullSink)
    } else {
        SpeechHandle::spawn(LogSink)
    };

    if let Some(trace) = cli.replay {
        let mut session = CalcSession::new(config, speech);
        let summary = replay::run(&trace, &mut session)?;
        info!(
            frames = summary.frames,
            events = summary.confirmed.len(),
            exited = summary.exited,
            "replay finished"
        );
        println!("Expression: {}", summary.expression);
        println!("Result: {}", summary.result);
        return Ok(());
    }

    let socket_path = cli.socket.unwrap_or_else(server::default_socket_path);
    server::run(
        &socket_path,
        ServerOptions {
            config,
            speech,
            trace: cli.ipc_trace,
        },
    )
}
