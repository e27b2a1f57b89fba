//! Standby Clock
//!
//! Always-on clock for an RGB LED matrix. The time moves around a 3×3 grid
//! every five minutes and jitters by a pixel or two every minute, so no LED
//! sits lit in the same place for hours.
//!
//! ## Architecture
//! - **Render thread** (std::thread): owns the clock state and the matrix
//! - **HTTP server** (tokio/axum): theme and settings API, status, snapshots
//!
//! ## Usage
//! ```sh
//! sudo ./target/release/standby-clock-rs --rows 32 --cols 64 --port 8080
//! ./target/release/standby-clock-rs --headless --rows 360 --cols 640 --density 1
//! ```

use clap::Parser;
use standby_clock_rs::clock::SystemClock;
use standby_clock_rs::grid::GRID_MARGIN_DP;
use standby_clock_rs::jitter::JitterGenerator;
use standby_clock_rs::prefs::{JsonFilePreferences, MemoryPreferences, PreferenceStore};
use standby_clock_rs::render::{ClockConfig, ClockEngine, Output, SharedDisplay, render_loop};
use standby_clock_rs::server::{self, AppState};
use standby_clock_rs::theme::NightWindow;
use standby_clock_rs::{Geometry, is_running, setup_signal_handler};
use std::path::PathBuf;
use std::sync::mpsc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Standby Clock HTTP API Server
#[derive(Parser)]
#[command(name = "standby-clock-rs")]
#[command(about = "Burn-in safe always-on clock for an RGB LED matrix")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(long, default_value = "8080")]
    port: u16,

    /// Number of rows on the LED panel
    #[arg(long, default_value = "64")]
    rows: u32,

    /// Number of columns on the LED panel
    #[arg(long, default_value = "64")]
    cols: u32,

    /// Directory for standby_prefs.json; preferences are kept in memory only if unset
    #[arg(long)]
    prefs_dir: Option<PathBuf>,

    /// Grid inset from the panel edges, in density-independent units
    #[arg(long, default_value_t = GRID_MARGIN_DP)]
    margin_dp: f32,

    /// Panel pixels per density-independent unit
    #[arg(long, default_value = "0.125")]
    density: f32,

    /// Integer scale factor for the clock digits
    #[arg(long, default_value = "1")]
    text_scale: u32,

    /// Hour (0-23) at which Auto theme turns dark
    #[arg(long, default_value = "19")]
    night_start: u32,

    /// Hour (0-23) at which Auto theme turns light again
    #[arg(long, default_value = "7")]
    night_end: u32,

    /// Render frames in memory only, without touching the LED matrix
    #[arg(long)]
    headless: bool,
}

impl Args {
    fn clock_config(&self) -> ClockConfig {
        ClockConfig {
            geometry: Geometry::from_panel(self.rows, self.cols),
            margin_dp: self.margin_dp,
            density: self.density,
            text_scale: self.text_scale,
            night: NightWindow::new(self.night_start, self.night_end),
            ..ClockConfig::default()
        }
    }

    fn output(&self) -> Output {
        if self.headless {
            return Output::Headless;
        }
        #[cfg(feature = "hardware")]
        {
            Output::Matrix
        }
        #[cfg(not(feature = "hardware"))]
        {
            tracing::warn!("Built without the hardware feature, running headless");
            Output::Headless
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Disable ANSI color codes for systemd/journald
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_ansi(false)
        .compact()
        .init();

    let args = Args::parse();
    let config = args.clock_config();
    let output = args.output();

    tracing::info!("Standby Clock v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        "Panel: {}x{} ({:?}), grid margin {}px",
        config.geometry.width,
        config.geometry.height,
        output,
        config.margin_px()
    );
    tracing::info!("Port: {}", args.port);

    let prefs: Box<dyn PreferenceStore> = match &args.prefs_dir {
        Some(dir) => {
            let prefs = JsonFilePreferences::open(dir);
            tracing::info!("Preferences: {}", prefs.path().display());
            Box::new(prefs)
        }
        None => {
            tracing::warn!("No --prefs-dir given, theme choice will not survive a restart");
            Box::new(MemoryPreferences::new())
        }
    };

    let running = setup_signal_handler()?;

    let engine = ClockEngine::new(config, Box::new(SystemClock), prefs, JitterGenerator::new());
    let display = SharedDisplay::new(engine.status(), config.geometry);

    // Create the channel for sending commands to the render thread.
    let (tx, rx) = mpsc::channel();

    let render_display = display.clone();
    let render_running = running.clone();
    let render_handle = std::thread::spawn(move || {
        render_loop(rx, engine, render_display, output, render_running);
    });

    let app = server::create_router(AppState {
        command_tx: tx,
        display,
    });

    let addr = format!("0.0.0.0:{}", args.port);
    tracing::info!("Listening on http://{}", addr);
    tracing::info!("API Documentation: http://localhost:{}/docs", args.port);
    tracing::info!("Try: curl http://localhost:{}/api/v1/status", args.port);

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    // Serve until Ctrl+C flips the running flag.
    let shutdown_flag = running.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            while is_running(&shutdown_flag) {
                tokio::time::sleep(Duration::from_millis(200)).await;
            }
            tracing::info!("Shutting down");
        })
        .await?;

    if render_handle.join().is_err() {
        tracing::error!("Render thread panicked");
    }

    Ok(())
}
