use axum::{
    body::Bytes,
    extract::{rejection::QueryRejection, Path, Query, State},
    http::{HeaderMap, Method, Request, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Json, Response},
    routing::{get, post, put},
    Router,
};
use chrono::Utc;
use hyper::Server;
use serde::de::DeserializeOwned;
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::app::{CatalogAdminUseCase, CleanupPreview, CleanupReport, EventsUseCase};
use crate::auth::{authorize_admin, CurrentUser};
use crate::config::AppConfig;
use crate::domain::{Event, EventPayload, LinkUpdate};
use crate::error::EventsError;
use crate::images::{BackfillReport, ImageResolver};
use crate::query::{EventListing, EventQueryEngine, EventQueryParams};
use crate::storage::{EventStore, ImageStats};

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<EventQueryEngine>,
    pub events: Arc<EventsUseCase>,
    pub admin: Arc<CatalogAdminUseCase>,
    pub admin_token: Option<Arc<str>>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn EventStore>,
        resolver: Arc<ImageResolver>,
        config: &AppConfig,
    ) -> Self {
        Self {
            engine: Arc::new(
                EventQueryEngine::new(store.clone())
                    .with_default_limit(config.listing.default_limit),
            ),
            events: Arc::new(
                EventsUseCase::new(store.clone()).with_image_resolver(resolver.clone()),
            ),
            admin: Arc::new(CatalogAdminUseCase::new(
                store,
                resolver,
                config.images.backfill_concurrency,
            )),
            admin_token: config.server.admin_token.as_deref().map(Arc::from),
        }
    }
}

impl IntoResponse for EventsError {
    fn into_response(self) -> Response {
        let status = match &self {
            EventsError::Validation(_) | EventsError::Json(_) => StatusCode::BAD_REQUEST,
            EventsError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            EventsError::NotFound(_) => StatusCode::NOT_FOUND,
            EventsError::DataAccess { .. } => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!("Request failed: {}", self);
        }
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, EventsError>;

fn parse_json<T: DeserializeOwned>(body: &Bytes) -> Result<T, EventsError> {
    serde_json::from_slice(body)
        .map_err(|e| EventsError::validation(format!("invalid request body: {e}")))
}

/// Health check endpoint
async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "cycling-events",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn list_events(
    State(state): State<AppState>,
    query: Result<Query<EventQueryParams>, QueryRejection>,
) -> ApiResult<EventListing> {
    let Query(params) = query.map_err(|rejection| {
        EventsError::validation(format!("invalid query string: {}", rejection.body_text()))
    })?;
    Ok(Json(state.engine.list(&params, Utc::now()).await?))
}

/// Identity is checked before the body is looked at, so an anonymous request
/// is a 401 even when its payload is malformed.
async fn create_event(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Event> {
    let user = CurrentUser::from_headers(&headers)
        .ok_or_else(|| EventsError::Unauthorized("Unauthorized".to_string()))?;
    let payload: EventPayload = parse_json(&body)?;
    Ok(Json(state.events.create_event(Some(&user), payload).await?))
}

async fn get_event(State(state): State<AppState>, Path(slug): Path<String>) -> ApiResult<Event> {
    Ok(Json(state.events.get_published_event(&slug).await?))
}

async fn publish_event(State(state): State<AppState>, Path(slug): Path<String>) -> ApiResult<Event> {
    Ok(Json(state.events.set_published(&slug, true).await?))
}

async fn unpublish_event(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> ApiResult<Event> {
    Ok(Json(state.events.set_published(&slug, false).await?))
}

async fn update_links(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    body: Bytes,
) -> ApiResult<Event> {
    let links: LinkUpdate = parse_json(&body)?;
    Ok(Json(state.events.update_links(&slug, links).await?))
}

async fn cleanup_preview(State(state): State<AppState>) -> ApiResult<CleanupPreview> {
    Ok(Json(state.admin.cleanup_preview().await?))
}

async fn cleanup(State(state): State<AppState>) -> ApiResult<CleanupReport> {
    Ok(Json(state.admin.cleanup().await?))
}

async fn image_status(State(state): State<AppState>) -> ApiResult<ImageStats> {
    Ok(Json(state.admin.image_status().await?))
}

async fn backfill_images(State(state): State<AppState>) -> ApiResult<BackfillReport> {
    Ok(Json(state.admin.backfill_images().await?))
}

async fn require_admin<B>(
    State(state): State<AppState>,
    request: Request<B>,
    next: Next<B>,
) -> Result<Response, EventsError> {
    authorize_admin(request.headers(), state.admin_token.as_deref())?;
    Ok(next.run(request).await)
}

/// Create the HTTP router with public and admin routes
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any);

    let admin = Router::new()
        .route("/events/:slug/publish", post(publish_event))
        .route("/events/:slug/unpublish", post(unpublish_event))
        .route("/events/:slug/links", put(update_links))
        .route("/cleanup", get(cleanup_preview).delete(cleanup))
        .route("/images/status", get(image_status))
        .route("/images/backfill", post(backfill_images))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_admin));

    Router::new()
        .route("/health", get(health))
        .route("/events", get(list_events).post(create_event))
        .route("/events/:slug", get(get_event))
        .nest("/admin", admin)
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
}

/// Start the HTTP server on the configured address
pub async fn start_server(state: AppState, addr: SocketAddr) -> anyhow::Result<()> {
    if state.admin_token.is_none() {
        warn!("No admin token configured: /admin routes are open");
    }
    let app = create_router(state);
    info!("HTTP server running on http://{}", addr);
    info!("Health check: http://{}/health", addr);
    Server::bind(&addr).serve(app.into_make_service()).await?;
    Ok(())
}
