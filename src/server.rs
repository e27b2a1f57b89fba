//! HTTP API server: axum router and request handlers.
//!
//! The server runs on the tokio async runtime while the clock runs on a
//! plain `std::thread`. Commands go over `std::sync::mpsc`; status and the
//! last frame come back through `Arc<Mutex<_>>`.
//!
//! ## Rust concepts
//! - `async fn` and `.await` for non-blocking I/O
//! - axum extractors: `State`, `Json`
//! - Serde `Deserialize` for parsing JSON request bodies
//! - `tower-http` middleware for CORS and request tracing

use crate::render::{ClockPhase, ClockStatus, RenderCommand, SharedDisplay};
use crate::theme::ThemeOption;
use axum::Router;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Json};
use axum::routing::{get, post};
use image::ImageFormat;
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use std::sync::mpsc::Sender;
use tower_http::cors::CorsLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

// ── App State ────────────────────────────────────────────────────────

/// Shared application state, passed to every handler via axum's `State` extractor.
///
/// axum clones the state for each request, so everything inside is cheap to
/// clone: a channel sender and a couple of `Arc`s.
#[derive(Clone)]
pub struct AppState {
    /// Channel to send commands to the render thread
    pub command_tx: Sender<RenderCommand>,
    /// Status and last frame published by the render thread
    pub display: SharedDisplay,
}

// ── OpenAPI Documentation ────────────────────────────────────────────

#[derive(OpenApi)]
#[openapi(
    paths(
        get_status,
        get_theme,
        post_theme,
        post_settings_open,
        post_settings_close,
        get_snapshot,
    ),
    components(schemas(
        ClockStatus,
        ClockPhase,
        ThemeOption,
        ThemeRequest,
        ThemeResponse,
        crate::Offset,
    )),
    tags(
        (name = "clock", description = "Clock display endpoints"),
        (name = "settings", description = "Settings overlay and theme endpoints"),
    ),
    info(
        title = "Standby Clock API",
        version = env!("CARGO_PKG_VERSION"),
        description = "HTTP API for an always-on LED matrix clock"
    )
)]
pub struct ApiDoc;

/// Routes that only exist with the `fast-forward` feature.
#[cfg(feature = "fast-forward")]
#[derive(OpenApi)]
#[openapi(paths(post_clock_advance))]
struct FastForwardDoc;

/// The served OpenAPI document, including any feature-gated routes.
pub fn api_doc() -> utoipa::openapi::OpenApi {
    #[allow(unused_mut)]
    let mut doc = ApiDoc::openapi();
    #[cfg(feature = "fast-forward")]
    doc.merge(FastForwardDoc::openapi());
    doc
}

// ── Request/Response types ───────────────────────────────────────────

#[derive(Deserialize, utoipa::ToSchema)]
pub struct ThemeRequest {
    /// Theme option: follow the night window (auto), or force light/dark
    #[schema(example = "dark")]
    option: ThemeOption,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ThemeResponse {
    /// Selected theme option
    option: ThemeOption,
    /// Whether the panel is currently drawn dark
    effective_dark: bool,
}

// ── Router ───────────────────────────────────────────────────────────

/// Build the axum router with all API endpoints.
pub fn create_router(state: AppState) -> Router {
    let router = Router::new()
        .merge(
            SwaggerUi::new("/docs")
                .url("/api-docs/openapi.json", api_doc())
                .config(utoipa_swagger_ui::Config::new(["/api-docs/openapi.json"]).validator_url("none")),
        )
        .route("/api/v1/status", get(get_status))
        .route("/api/v1/theme", get(get_theme).post(post_theme))
        .route("/api/v1/settings/open", post(post_settings_open))
        .route("/api/v1/settings/close", post(post_settings_close))
        .route("/api/v1/snapshot", get(get_snapshot));

    #[cfg(feature = "fast-forward")]
    let router = router.route("/api/v1/clock/advance", post(post_clock_advance));

    router
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn send(state: &AppState, cmd: RenderCommand) -> Result<StatusCode, (StatusCode, String)> {
    state.command_tx.send(cmd).map_err(|_| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Render thread gone".to_string(),
        )
    })?;
    Ok(StatusCode::OK)
}

// ── Handlers ─────────────────────────────────────────────────────────

/// GET /api/v1/status — current clock state
#[utoipa::path(
    get,
    path = "/api/v1/status",
    tag = "clock",
    responses(
        (status = 200, description = "Current clock status", body = ClockStatus)
    )
)]
async fn get_status(State(state): State<AppState>) -> Json<ClockStatus> {
    let status = state.display.status.lock().unwrap().clone();
    Json(status)
}

/// GET /api/v1/theme — selected theme and how it currently resolves
#[utoipa::path(
    get,
    path = "/api/v1/theme",
    tag = "settings",
    responses(
        (status = 200, description = "Current theme", body = ThemeResponse)
    )
)]
async fn get_theme(State(state): State<AppState>) -> Json<ThemeResponse> {
    let status = state.display.status.lock().unwrap();
    Json(ThemeResponse {
        option: status.theme,
        effective_dark: status.effective_dark,
    })
}

/// POST /api/v1/theme — select and persist a theme option
#[utoipa::path(
    post,
    path = "/api/v1/theme",
    tag = "settings",
    request_body = ThemeRequest,
    responses(
        (status = 200, description = "Theme selected"),
        (status = 422, description = "Unknown theme option")
    )
)]
async fn post_theme(
    State(state): State<AppState>,
    Json(req): Json<ThemeRequest>,
) -> Result<StatusCode, (StatusCode, String)> {
    send(&state, RenderCommand::SelectTheme(req.option))
}

/// POST /api/v1/settings/open — show the settings overlay
///
/// Cell moves pause while the overlay is open; the clock keeps ticking.
#[utoipa::path(
    post,
    path = "/api/v1/settings/open",
    tag = "settings",
    responses(
        (status = 200, description = "Settings overlay opened"),
    )
)]
async fn post_settings_open(
    State(state): State<AppState>,
) -> Result<StatusCode, (StatusCode, String)> {
    send(&state, RenderCommand::SetSettingsVisible(true))
}

/// POST /api/v1/settings/close — hide the settings overlay
#[utoipa::path(
    post,
    path = "/api/v1/settings/close",
    tag = "settings",
    responses(
        (status = 200, description = "Settings overlay closed"),
    )
)]
async fn post_settings_close(
    State(state): State<AppState>,
) -> Result<StatusCode, (StatusCode, String)> {
    send(&state, RenderCommand::SetSettingsVisible(false))
}

/// GET /api/v1/snapshot — PNG of the last rendered frame
#[utoipa::path(
    get,
    path = "/api/v1/snapshot",
    tag = "clock",
    responses(
        (status = 200, description = "Last frame as PNG", content_type = "image/png"),
    )
)]
async fn get_snapshot(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let png = {
        let frame = state.display.frame.lock().unwrap();
        encode_png(&frame)
    }
    .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("PNG encoding failed: {e}")))?;

    Ok(([(header::CONTENT_TYPE, "image/png")], png))
}

/// POST /api/v1/clock/advance — move the clock to the next cell now
///
/// Ignored by the render thread while a move is already fading.
#[cfg(feature = "fast-forward")]
#[utoipa::path(
    post,
    path = "/api/v1/clock/advance",
    tag = "clock",
    responses(
        (status = 200, description = "Advance requested"),
    )
)]
async fn post_clock_advance(
    State(state): State<AppState>,
) -> Result<StatusCode, (StatusCode, String)> {
    send(&state, RenderCommand::AdvanceNow)
}

fn encode_png(frame: &image::RgbImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Cursor::new(Vec::new());
    frame.write_to(&mut buf, ImageFormat::Png)?;
    Ok(buf.into_inner())
}
