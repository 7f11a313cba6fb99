//! Demo: a capture run against the simulated machine.
//!
//! Frames out a shot, moves the film, then captures a run of placeholder
//! stills, optionally stopping it early.
//!
//! Run with: `cargo run --example simulated_run -- --frames 12 --stop-after-ms 600`
//!
//! Set `RUST_LOG=cineroll=debug` to see every frame.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use cineroll::{load_config, MachineConfig, MotionCaptureController, Result, SimulatedDriver};

#[derive(Debug, Parser)]
#[command(about = "Run the digitizer controller against a simulated machine")]
struct Args {
    /// TOML machine configuration (stock machine if omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Frames to capture
    #[arg(short, long, default_value_t = 5)]
    frames: u32,

    /// Output directory for the stills
    #[arg(short, long, default_value = "capture")]
    output: PathBuf,

    /// Frames to advance before capturing
    #[arg(long, default_value_t = 2)]
    advance: u32,

    /// Stop the run after this many milliseconds
    #[arg(long)]
    stop_after_ms: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("cineroll=info")),
        )
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => MachineConfig::default(),
    };

    let controller = MotionCaptureController::new(SimulatedDriver::from_config(&config), config);
    controller.initialize()?;

    // Tighter framing: three steps in, one step right
    for _ in 0..3 {
        controller.set_zoom(1);
    }
    controller.set_pan(1, 0);
    info!(crop = ?controller.crop_region(), "framing set");

    let moved = controller.advance_frames(args.advance).await?;
    let rewound = controller.rewind_frames(1).await?;
    info!(moved, rewound, position = controller.frame_position(), "film positioned");

    if let Some(run) = controller.start_capture(args.frames, &args.output).await? {
        if let Some(ms) = args.stop_after_ms {
            tokio::time::sleep(Duration::from_millis(ms)).await;
            controller.stop_capture();
        }
        let outcome = run.wait().await;
        info!(?outcome, "run ended");
    }

    let status = controller.get_status();
    println!(
        "{}",
        serde_json::to_string_pretty(&status).unwrap_or_else(|e| e.to_string())
    );

    controller.cleanup().await
}
