use axum::{
    extract::{DefaultBodyLimit, State},
    http::{HeaderValue, Method},
    middleware,
    response::Response,
    routing::{get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::warn;

use crate::error::render_internal_error;
use crate::handlers::{self, auth, bootcamps, courses};
use crate::state::AppState;

/// The complete HTTP surface.
pub fn app(state: AppState) -> Router {
    let config = state.config.clone();

    let mut router = Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .nest("/api/v1/auth", auth_routes())
        .nest("/api/v1/bootcamps", bootcamp_routes())
        .nest("/api/v1/courses", course_routes())
        .nest_service("/uploads", ServeDir::new(&config.upload.file_upload_path))
        .layer(middleware::map_response_with_state(state.clone(), internal_errors))
        .layer(DefaultBodyLimit::max(config.server.max_request_size_bytes))
        .layer(cors_layer(&config.security.cors_origins));

    if config.server.enable_request_logging {
        router = router.layer(TraceLayer::new_for_http());
    }

    router.with_state(state)
}

/// Internal error bodies follow this app's environment, not the process-wide one.
async fn internal_errors(State(state): State<AppState>, response: Response) -> Response {
    render_internal_error(response, state.config.is_production())
}

fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/me", get(auth::me))
}

fn bootcamp_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(bootcamps::list).post(bootcamps::create))
        .route(
            "/:id",
            get(bootcamps::get)
                .put(bootcamps::update)
                .delete(bootcamps::delete),
        )
        .route("/:id/photo", put(bootcamps::photo))
        .route(
            "/:id/courses",
            get(courses::list_for_bootcamp).post(courses::create),
        )
}

fn course_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(courses::list))
        .route(
            "/:id",
            get(courses::get)
                .put(courses::update)
                .delete(courses::delete),
        )
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::permissive();
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any)
}
