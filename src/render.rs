//! Render thread: owns the clock state and the panel, processes commands via a channel.
//!
//! The `rpi-led-matrix` C library is not thread-safe, and the burn-in
//! scheduler expects a single writer, so everything that mutates display
//! state happens on one dedicated thread. The async HTTP server talks to it
//! by sending `RenderCommand` values through an `mpsc` channel and reads back
//! the published `ClockStatus` and last frame.
//!
//! ## Rust concepts
//! - `std::sync::mpsc` channels for thread communication
//! - `try_recv()` for draining commands between frames without blocking
//! - `Arc<Mutex<T>>` for state the render thread writes and handlers read
//! - Trait objects (`Box<dyn FrameSink>`) to swap hardware for a headless sink

use crate::clock::WallClock;
use crate::canvas;
use crate::grid::{self, GRID_MARGIN_DP};
use crate::jitter::JitterGenerator;
use crate::prefs::PreferenceStore;
use crate::scheduler::{BurnInScheduler, DisplayState, Phase};
use crate::theme::{NightWindow, ThemeController, ThemeOption};
use crate::{Color, Geometry, Offset, is_running};
use image::RgbImage;
use serde::Serialize;
use std::sync::atomic::AtomicBool;
use std::sync::mpsc::{Receiver, TryRecvError};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

// ── Commands ─────────────────────────────────────────────────────────

/// Commands sent from the HTTP server to the render thread.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderCommand {
    /// Switch theme and persist the choice
    SelectTheme(ThemeOption),
    /// Show or hide the settings overlay (pauses cell moves while shown)
    SetSettingsVisible(bool),
    /// Move to the next cell now, if no move is in progress
    AdvanceNow,
}

// ── Configuration ────────────────────────────────────────────────────

/// Everything about the clock face that does not change at runtime.
#[derive(Clone, Copy, Debug)]
pub struct ClockConfig {
    pub geometry: Geometry,
    /// Grid inset from the panel edges, in density-independent units
    pub margin_dp: f32,
    /// Panel pixels per density-independent unit
    pub density: f32,
    /// Integer upscale of the clock font
    pub text_scale: u32,
    /// When Auto resolves to dark
    pub night: NightWindow,
    /// Time between rendered frames
    pub frame_interval: Duration,
}

impl ClockConfig {
    pub fn margin_px(&self) -> u32 {
        grid::margin_px(self.margin_dp, self.density)
    }
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            geometry: Geometry::default(),
            margin_dp: GRID_MARGIN_DP,
            density: 0.125,
            text_scale: 1,
            night: NightWindow::default(),
            frame_interval: Duration::from_millis(33),
        }
    }
}

// ── Palette ──────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Palette {
    pub background: Color,
    pub text: Color,
}

impl Palette {
    pub const DARK: Palette = Palette {
        background: Color::BLACK,
        text: Color::new(0xE6, 0xE6, 0xE6),
    };
    pub const LIGHT: Palette = Palette {
        background: Color::WHITE,
        text: Color::new(0x1C, 0x1B, 0x1F),
    };

    pub fn for_dark(dark: bool) -> Self {
        if dark { Self::DARK } else { Self::LIGHT }
    }
}

// ── Status ───────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ClockPhase {
    Idle,
    Transitioning,
}

/// Snapshot of the clock that the HTTP server reports.
#[derive(Clone, Debug, Serialize, utoipa::ToSchema)]
pub struct ClockStatus {
    /// Displayed time, `HH:MM`
    pub time_text: String,
    /// Grid cell, 0-8, row-major from top-left
    pub cell_index: usize,
    /// Current jitter nudge
    pub jitter: Offset,
    /// Where the clock's center sits relative to the panel center
    pub offset: Offset,
    /// Text opacity, 0.0-1.0
    pub opacity: f32,
    pub phase: ClockPhase,
    /// Seconds until the next cell move (absent mid-transition)
    pub seconds_until_move: Option<u32>,
    /// Cell moves completed since start-up
    pub completed_moves: u64,
    /// Selected theme option
    pub theme: ThemeOption,
    /// Whether the panel is currently drawn dark
    pub effective_dark: bool,
    /// Whether the settings overlay is open
    pub settings_visible: bool,
    /// Server version
    pub version: String,
}

/// State shared between the render thread and the HTTP handlers.
#[derive(Clone)]
pub struct SharedDisplay {
    pub status: Arc<Mutex<ClockStatus>>,
    pub frame: Arc<Mutex<RgbImage>>,
}

impl SharedDisplay {
    pub fn new(status: ClockStatus, geometry: Geometry) -> Self {
        Self {
            status: Arc::new(Mutex::new(status)),
            frame: Arc::new(Mutex::new(RgbImage::new(geometry.width, geometry.height))),
        }
    }
}

// ── Engine ───────────────────────────────────────────────────────────

/// The clock's single-threaded core: scheduler, theme, and overlay flag.
///
/// Kept separate from the thread loop so it can be driven step by step.
pub struct ClockEngine {
    config: ClockConfig,
    clock: Box<dyn WallClock>,
    scheduler: BurnInScheduler,
    theme: ThemeController<Box<dyn PreferenceStore>>,
    settings_visible: bool,
}

impl ClockEngine {
    pub fn new(
        config: ClockConfig,
        clock: Box<dyn WallClock>,
        prefs: Box<dyn PreferenceStore>,
        jitter: JitterGenerator,
    ) -> Self {
        let scheduler = BurnInScheduler::new(clock.as_ref(), jitter);
        let theme = ThemeController::load(prefs);
        Self {
            config,
            clock,
            scheduler,
            theme,
            settings_visible: false,
        }
    }

    pub fn config(&self) -> &ClockConfig {
        &self.config
    }

    pub fn handle(&mut self, cmd: RenderCommand) {
        match cmd {
            RenderCommand::SelectTheme(option) => self.theme.select(option),
            RenderCommand::SetSettingsVisible(visible) => {
                if visible != self.settings_visible {
                    tracing::info!(
                        "Settings {}",
                        if visible { "opened, pausing cell moves" } else { "closed" }
                    );
                }
                self.settings_visible = visible;
            }
            RenderCommand::AdvanceNow => {
                if !self.scheduler.advance_now() {
                    tracing::info!("Ignoring advance request, a move is already in progress");
                }
            }
        }
    }

    pub fn advance(&mut self, dt: Duration) {
        self.scheduler
            .advance(dt, self.clock.as_ref(), self.settings_visible);
    }

    /// "System dark mode" as seen by the Auto theme, from the night window.
    pub fn system_dark(&self) -> bool {
        self.config.night.contains(self.clock.now().hour)
    }

    /// Resolved every call, never cached.
    pub fn effective_dark(&self) -> bool {
        self.theme.effective_dark(self.system_dark())
    }

    pub fn offset(&self) -> Offset {
        self.scheduler
            .offset(self.config.geometry, self.config.margin_px())
    }

    pub fn compose(&self) -> RgbImage {
        compose_frame(
            self.scheduler.state(),
            self.offset(),
            Palette::for_dark(self.effective_dark()),
            self.config.geometry,
            self.config.text_scale,
        )
    }

    pub fn status(&self) -> ClockStatus {
        let state = self.scheduler.state();
        ClockStatus {
            time_text: state.time_text.clone(),
            cell_index: state.cell_index,
            jitter: state.jitter,
            offset: self.offset(),
            opacity: state.opacity,
            phase: match self.scheduler.phase() {
                Phase::Idle => ClockPhase::Idle,
                Phase::Transitioning { .. } => ClockPhase::Transitioning,
            },
            seconds_until_move: self.scheduler.ticks_until_move(),
            completed_moves: self.scheduler.completed_moves(),
            theme: self.theme.current(),
            effective_dark: self.effective_dark(),
            settings_visible: self.settings_visible,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Draw one frame: background fill, then the time centered at
/// panel center + `offset`, faded toward the background by the opacity.
pub fn compose_frame(
    state: &DisplayState,
    offset: Offset,
    palette: Palette,
    geometry: Geometry,
    text_scale: u32,
) -> RgbImage {
    let mut img = RgbImage::from_pixel(geometry.width, geometry.height, palette.background.into());

    let (text_w, text_h) = canvas::text_size(&state.time_text, text_scale);
    let center_x = geometry.width as i32 / 2 + offset.x;
    let center_y = geometry.height as i32 / 2 + offset.y;
    let color = palette.background.mix(palette.text, state.opacity);

    canvas::draw_text(
        &mut img,
        &state.time_text,
        (center_x - text_w as i32 / 2, center_y - text_h as i32 / 2),
        text_scale,
        color,
    );
    img
}

// ── Frame sinks ──────────────────────────────────────────────────────

/// Where composed frames go.
pub trait FrameSink {
    fn show(&mut self, frame: &RgbImage);
}

/// Discards frames; the HTTP snapshot is the only output.
pub struct HeadlessSink;

impl FrameSink for HeadlessSink {
    fn show(&mut self, _frame: &RgbImage) {}
}

#[cfg(feature = "hardware")]
pub use matrix_sink::MatrixSink;

#[cfg(feature = "hardware")]
mod matrix_sink {
    use super::FrameSink;
    use crate::{Color, Geometry, create_matrix};
    use image::RgbImage;
    use rpi_led_matrix::{LedCanvas, LedMatrix};

    /// Pushes frames to the LED panel with double buffering.
    pub struct MatrixSink {
        matrix: LedMatrix,
        canvas: Option<LedCanvas>,
    }

    impl MatrixSink {
        pub fn new(geometry: Geometry) -> Result<Self, Box<dyn std::error::Error>> {
            let matrix = create_matrix(geometry)?;
            let canvas = Some(matrix.offscreen_canvas());
            Ok(Self { matrix, canvas })
        }
    }

    /// Draw an RgbImage onto the LED canvas pixel by pixel.
    fn draw_frame_to_canvas(canvas: &mut LedCanvas, img: &RgbImage) {
        for (x, y, pixel) in img.enumerate_pixels() {
            let c = Color::new(pixel[0], pixel[1], pixel[2]);
            canvas.set(x as i32, y as i32, &c.into());
        }
    }

    impl FrameSink for MatrixSink {
        fn show(&mut self, frame: &RgbImage) {
            if let Some(mut canvas) = self.canvas.take() {
                draw_frame_to_canvas(&mut canvas, frame);
                self.canvas = Some(self.matrix.swap(canvas));
            }
        }
    }
}

/// Which sink the render thread should open.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Output {
    Headless,
    #[cfg(feature = "hardware")]
    Matrix,
}

#[cfg_attr(not(feature = "hardware"), allow(unused_variables))]
fn open_sink(output: Output, geometry: Geometry) -> Result<Box<dyn FrameSink>, Box<dyn std::error::Error>> {
    match output {
        Output::Headless => Ok(Box::new(HeadlessSink)),
        #[cfg(feature = "hardware")]
        Output::Matrix => Ok(Box::new(MatrixSink::new(geometry)?)),
    }
}

// ── Render loop ──────────────────────────────────────────────────────

/// Publish the engine's status and frame for the HTTP handlers.
fn publish(engine: &ClockEngine, frame: RgbImage, shared: &SharedDisplay) {
    *shared.status.lock().unwrap() = engine.status();
    *shared.frame.lock().unwrap() = frame;
}

/// Main render loop. Runs on a dedicated thread and owns the engine and panel.
///
/// Each frame: drain pending commands, advance the clock by the real time
/// that passed, compose, show, publish. Returns when the channel closes or
/// `running` drops to false.
pub fn render_loop(
    rx: Receiver<RenderCommand>,
    mut engine: ClockEngine,
    shared: SharedDisplay,
    output: Output,
    running: Arc<AtomicBool>,
) {
    let geometry = engine.config().geometry;
    // The sink is opened here because the matrix handle must stay on this thread.
    let mut sink = match open_sink(output, geometry) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Failed to initialize LED matrix: {}", e);
            return;
        }
    };

    let frame_interval = engine.config().frame_interval;
    let mut last = Instant::now();
    let mut slow_frames: u64 = 0;

    tracing::info!("Render thread started ({:?} output)", output);

    'frames: while is_running(&running) {
        loop {
            match rx.try_recv() {
                Ok(cmd) => engine.handle(cmd),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    tracing::info!("Render thread: channel closed, shutting down.");
                    break 'frames;
                }
            }
        }

        let now = Instant::now();
        let dt = now - last;
        last = now;
        engine.advance(dt);

        let frame = engine.compose();
        sink.show(&frame);
        publish(&engine, frame, &shared);

        let spent = now.elapsed();
        if spent > frame_interval {
            slow_frames += 1;
            if slow_frames <= 5 {
                tracing::warn!(
                    "Frame took {}ms (target: {}ms)",
                    spent.as_millis(),
                    frame_interval.as_millis()
                );
            }
        }
        thread::sleep(frame_interval.saturating_sub(spent));
    }

    tracing::info!("Render thread stopped");
}
