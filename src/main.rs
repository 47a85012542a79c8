//! Capture Session Controller CLI
//!
//! Runs a scripted camera session against mock hardware: start, pinch
//! across the ultra-wide threshold, tap to focus, toggle position and
//! capture, then prints the published state and metrics.

use capture_session::{
    capture::{CaptureCoordinator, DeviceOrientation, DisplayPoint, HardwareParts, PhotoSink},
    config::{ControllerConfig, FileConfig},
    device::mock::{MockDiscovery, MockPhotoOutput, MockSession},
    device::CameraPosition,
};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "capture-session", version, about = "Camera session controller demo")]
struct Args {
    /// TOML configuration file with a `[controller]` table
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Pinch scale applied after start
    #[arg(long, default_value_t = 0.6)]
    pinch: f64,

    /// Skip the front/back toggle
    #[arg(long)]
    no_toggle: bool,
}

/// Logs captured photos instead of storing them.
struct LoggingSink;

impl PhotoSink for LoggingSink {
    fn deliver_captured_image(&self, bytes: Vec<u8>, orientation_code: u32, position: CameraPosition) {
        info!(
            bytes = bytes.len(),
            orientation_code,
            ?position,
            "Photo delivered"
        );
    }
}

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();
    info!("Capture Session Controller v{}", capture_session::VERSION);
    info!("This is a demonstration using mock camera hardware");

    let config = match &args.config {
        Some(path) => match FileConfig::from_file(path) {
            Ok(file) => file.controller,
            Err(e) => {
                eprintln!("Failed to load config: {}", e);
                std::process::exit(1);
            }
        },
        None => ControllerConfig::default(),
    };

    let coordinator = match CaptureCoordinator::new(
        HardwareParts {
            session: Arc::new(MockSession::new()),
            discovery: Arc::new(MockDiscovery::standard()),
            photo_output: Arc::new(MockPhotoOutput::new()),
        },
        Arc::new(LoggingSink),
        config,
        tokio::runtime::Handle::current(),
    ) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to create controller: {}", e);
            std::process::exit(1);
        }
    };

    coordinator.set_preview_size(390.0, 844.0);
    coordinator.set_device_orientation(DeviceOrientation::Portrait);

    match coordinator.start() {
        Some(setup) => match setup.await {
            Ok(Ok(())) => info!("Session started"),
            Ok(Err(e)) => {
                eprintln!("Camera setup failed: {}", e);
                std::process::exit(1);
            }
            Err(e) => {
                eprintln!("Setup task failed: {}", e);
                std::process::exit(1);
            }
        },
        None => warn!("Setup already in progress"),
    }

    // Pinch: a scale below 1 zooms out and may cross onto the ultra-wide lens
    coordinator.on_pinch(1.0, true);
    for step in 1..=5 {
        let scale = 1.0 + (args.pinch - 1.0) * f64::from(step) / 5.0;
        coordinator.on_pinch(scale, false);
        wait_for_switch(&coordinator).await;
    }

    coordinator.on_single_tap(DisplayPoint { x: 195.0, y: 300.0 });
    coordinator.on_flash_cycle();
    coordinator.on_capture();

    if !args.no_toggle {
        if let Some(switch) = coordinator.on_toggle_position() {
            if let Err(e) = switch.await {
                warn!("Switch task failed: {}", e);
            }
        }
        coordinator.on_double_tap(DisplayPoint { x: 100.0, y: 500.0 });
        coordinator.on_capture();
    }

    // Let the capture completions land
    tokio::time::sleep(Duration::from_millis(50)).await;
    coordinator.flush().await;

    let state = coordinator.state();
    println!(
        "State: {:?} {:?} zoom {:.2} (range {:.2}..{:.2}), flash {:?}, running {}",
        state.position,
        state.lens,
        state.zoom_factor,
        state.min_zoom,
        state.max_zoom,
        state.flash_mode,
        state.is_running
    );

    match coordinator.metrics().encode() {
        Ok(text) => println!("{}", text),
        Err(e) => warn!("Metrics encoding failed: {}", e),
    }

    if let Some(stop) = coordinator.stop() {
        if let Err(e) = stop.await {
            warn!("Stop task failed: {}", e);
        }
    }
    info!("Done. Switches: {}", coordinator.metrics().switches());
}

async fn wait_for_switch(coordinator: &CaptureCoordinator) {
    while coordinator.is_configuring() {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
