use axum::{Router, extract::FromRef, http::HeaderName};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Core application services and components.
pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod render;
pub mod repository;
pub mod session;

// The route tree builder and the panel's controllers.
pub mod routes;
use routes::{Controller, IndexController, PanelController, RouteGroup};

// --- Public Re-exports ---

// Core state and error types for main.rs and the integration tests.
pub use config::AppConfig;
pub use error::{AppError, RenderError, RouteError};
pub use render::Renderer;
pub use repository::{InMemoryRepository, RepositoryState};

/// ApiDoc
///
/// OpenAPI description of the panel's JSON endpoints, served at
/// `/api-docs/openapi.json` in local mode.
#[derive(OpenApi)]
#[openapi(
    // JSON handlers only; the HTML pages are not part of the API.
    paths(
        handlers::login, handlers::list_inbounds, handlers::add_inbound,
        handlers::del_inbound, handlers::update_inbound, handlers::get_all_settings,
        handlers::update_settings, handlers::update_user
    ),
    // Request and response bodies.
    components(
        schemas(
            models::Msg, models::LoginForm, models::Inbound, models::InboundForm,
            models::Protocol, models::AllSetting, models::UpdateUserForm,
        )
    ),
    tags(
        (name = "xpanel", description = "xpanel administration API")
    )
)]
struct ApiDoc;

/// AppState
///
/// Everything a request may need, shared by all requests. Read-only apart
/// from the repository's own locking.
#[derive(Clone)]
pub struct AppState {
    /// Repository Layer: accounts, inbounds and panel settings.
    pub repo: RepositoryState,
    /// Compiled page templates, shared behind an `Arc`.
    pub renderer: Renderer,
    /// Configuration: the loaded, immutable environment configuration.
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

// These let handlers, the `AuthUser` extractor and the login gate pull only
// the component they need out of `AppState`.

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for Renderer {
    fn from_ref(app_state: &AppState) -> Renderer {
        app_state.renderer.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// Controllers
///
/// The controllers created while the route tree was assembled. They hold no
/// request state and live as long as the server.
pub struct Controllers {
    pub index: IndexController,
    pub panel: PanelController,
}

/// build_routes
///
/// Runs the setup phase: mounts every controller on a fresh root scope and
/// returns the scope, still open for inspection, together with the
/// controllers.
pub fn build_routes(state: AppState) -> Result<(RouteGroup<AppState>, Controllers), RouteError> {
    let mut root = RouteGroup::root(state);

    let index = IndexController::new(&mut root)?;
    let panel = PanelController::new(&mut root)?;

    Ok((root, Controllers { index, panel }))
}

/// create_router
///
/// Assembles and freezes the route tree, then wraps it in the request id and
/// tracing layers.
pub fn create_router(state: AppState) -> Result<Router, RouteError> {
    let swagger = state.config.env == config::Env::Local;

    // 1. Route Tree Assembly
    // Controllers register on the root scope; the tree is frozen afterwards.
    let (root, _controllers) = build_routes(state)?;
    let mut router = root.into_router();

    // 2. Documentation: Swagger UI, local mode only.
    if swagger {
        router = router
            .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));
    }

    // Header name constant for request correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    // 3. Observability and Correlation Layers (applied outermost)
    Ok(router.layer(
        ServiceBuilder::new()
            // 3a. Request ID Generation: a UUID for every incoming request.
            .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
            // 3b. Request Tracing: one span per request, carrying the request id.
            .layer(
                TraceLayer::new_for_http()
                    .make_span_with(trace_span_logger)
                    .on_response(
                        DefaultOnResponse::new()
                            .level(Level::INFO)
                            .latency_unit(tower_http::LatencyUnit::Millis),
                    ),
            )
            // 3c. Request ID Propagation: echoes x-request-id on the response.
            .layer(PropagateRequestIdLayer::new(x_request_id)),
    ))
}

/// trace_span_logger
///
/// Span for `TraceLayer`: method, uri and the request id, so every log line
/// of one request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
