//! Always-on clock for RGB LED matrix panels.
//!
//! The clock moves around a 3×3 grid every few minutes and nudges itself by a
//! pixel or two every minute so no LED stays lit in the same spot for long.
//!
//! This module holds the small shared types:
//! - Panel geometry and pixel offsets
//! - Our own color type, decoupled from the hardware crate
//! - Matrix initialization with our hardware defaults
//! - Signal handling for clean shutdown
//!
//! The clock logic lives in `scheduler` (with `clock`, `grid`, `jitter` and
//! `fade` underneath it), theme handling in `theme` and `prefs`, and the
//! render thread and HTTP API in `render` and `server`. `canvas` draws text
//! into frames.

pub mod canvas;
pub mod clock;
pub mod fade;
pub mod grid;
pub mod jitter;
pub mod prefs;
pub mod render;
pub mod scheduler;
pub mod server;
pub mod theme;

#[cfg(feature = "hardware")]
use rpi_led_matrix::{LedMatrix, LedMatrixOptions, LedRuntimeOptions};
use serde::Serialize;
use std::ops::Add;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

// ── Geometry ───────────────────────────────────────────────────────

/// Size of the drawing surface in pixels.
///
/// # Rust concept: derive macros
/// `Clone, Copy` make this cheaply copyable (it's just two u32s).
/// `PartialEq, Eq` let tests compare geometries directly.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Geometry {
    pub width: u32,
    pub height: u32,
}

impl Geometry {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Build from panel rows and columns, the way the matrix library counts.
    pub fn from_panel(rows: u32, cols: u32) -> Self {
        Self::new(cols, rows)
    }
}

impl Default for Geometry {
    fn default() -> Self {
        Self::new(64, 64)
    }
}

/// A pixel displacement. Positive `x` is right, positive `y` is down.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, utoipa::ToSchema)]
pub struct Offset {
    pub x: i32,
    pub y: i32,
}

impl Offset {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl Add for Offset {
    type Output = Offset;

    fn add(self, rhs: Offset) -> Offset {
        Offset::new(self.x + rhs.x, self.y + rhs.y)
    }
}

// ── Color ──────────────────────────────────────────────────────────

/// Our own color type, decoupled from the hardware crate.
///
/// This lets us test drawing on any machine without `rpi-led-matrix`.
/// At the hardware boundary, we convert via `Into<LedColor>`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color::new(0, 0, 0);
    pub const WHITE: Color = Color::new(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Blend from `self` toward `other`. `amount` 0.0 gives `self`, 1.0 gives
    /// `other`; values outside that range are clamped.
    pub fn mix(self, other: Color, amount: f32) -> Self {
        let t = amount.clamp(0.0, 1.0);
        let channel = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * t).round() as u8;
        Self {
            r: channel(self.r, other.r),
            g: channel(self.g, other.g),
            b: channel(self.b, other.b),
        }
    }
}

impl From<Color> for image::Rgb<u8> {
    fn from(c: Color) -> Self {
        image::Rgb([c.r, c.g, c.b])
    }
}

impl From<Color> for embedded_graphics::pixelcolor::Rgb888 {
    fn from(c: Color) -> Self {
        embedded_graphics::pixelcolor::Rgb888::new(c.r, c.g, c.b)
    }
}

/// Convert our Color to the hardware crate's LedColor at the boundary.
#[cfg(feature = "hardware")]
impl From<Color> for rpi_led_matrix::LedColor {
    fn from(c: Color) -> Self {
        rpi_led_matrix::LedColor {
            red: c.r,
            green: c.g,
            blue: c.b,
        }
    }
}

// ── Matrix initialization ──────────────────────────────────────────

/// Create a matrix configured for our hardware:
/// Pi Zero 2 W + Adafruit Bonnet + configurable panel size.
///
/// # Rust concept: Result and the ? operator
/// Matrix initialization can fail (e.g., not running as root, or GPIO
/// unavailable), so the caller gets a `Result` to propagate with `?`.
#[cfg(feature = "hardware")]
pub fn create_matrix(geometry: Geometry) -> Result<LedMatrix, Box<dyn std::error::Error>> {
    let mut options = LedMatrixOptions::new();
    options.set_rows(geometry.height);
    options.set_cols(geometry.width);
    options.set_hardware_mapping("adafruit-hat");

    options.set_pwm_bits(8)?; // Full 8-bit color depth for the fade
    options.set_pwm_lsb_nanoseconds(130); // Stable timing (~143Hz refresh)

    let mut rt_options = LedRuntimeOptions::new();
    rt_options.set_gpio_slowdown(2); // Pi Zero 2 W requires slowdown=2

    let matrix = LedMatrix::new(Some(options), Some(rt_options))?;

    Ok(matrix)
}

/// Set up a Ctrl+C handler that sets `running` to false.
///
/// # Rust concept: Arc and AtomicBool
/// The render thread, the HTTP server's shutdown future, and the signal
/// handler all share one flag. `Arc` gives shared ownership and `AtomicBool`
/// makes the flag safe to flip from the handler without a mutex.
pub fn setup_signal_handler() -> Result<Arc<AtomicBool>, ctrlc::Error> {
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();

    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })?;

    Ok(running)
}

/// Check if the main loop should keep running.
pub fn is_running(running: &AtomicBool) -> bool {
    running.load(Ordering::SeqCst)
}

// ── Tests ──────────────────────────────────────────────────────────
