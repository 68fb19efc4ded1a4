use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    middleware,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use rand::Rng;
use serde_json::json;
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    services::ServeDir,
};

use crate::{
    attachments::{AttachmentStore, PUBLIC_PREFIX},
    config::{config, AttachmentBackend},
    db::DB,
    errors::{self, on_error},
    state::AppState,
};

/// Transport-level cap; the per-attachment limit is enforced by the
/// resolver with a reason-bearing error.
const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

pub struct AppParams<R>
where
    R: FnOnce(AppState) -> Router,
{
    pub db: DB,
    pub attachments: Arc<dyn AttachmentStore>,
    pub router: R,
}

pub async fn create<R>(AppParams { db, attachments, router }: AppParams<R>) -> errors::Result<Router>
where
    R: FnOnce(AppState) -> Router,
{
    let config = config();

    let state = AppState { conn: db, attachments };

    let mut app = Router::new()
        .route("/__version__", get(version))
        .route("/__heartbeat__", get(heartbeat))
        .route("/__lbheartbeat__", get(lbheartbeat))
        .merge(router(state));

    if config.attachment_backend == AttachmentBackend::Local {
        app = app.nest_service(PUBLIC_PREFIX, ServeDir::new(&config.upload_dir));
    }

    let cors = match &config.allowed_origin {
        Some(origin) => {
            let origin = origin
                .parse::<HeaderValue>()
                .map_err(|e| errors::Error::Unexpected(format!("invalid ALLOWED_ORIGIN: {e}")))?;
            CorsLayer::new()
                .allow_origin(origin)
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers([header::CONTENT_TYPE])
        }
        None => CorsLayer::permissive(),
    };

    let app = app.layer(
        ServiceBuilder::new()
            .layer(cors)
            .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
            .layer(middleware::from_fn(on_error)),
    );

    Ok(app)
}

async fn version() -> impl IntoResponse {
    let config = &config();
    Json(json!({
        "source" : config.source,
        "version": config.version,
        "commit" : config.git_commit,
        "build"  : config.pipeline_id
    }))
}

async fn heartbeat() -> impl IntoResponse {
    let mut rng = rand::thread_rng();
    let random: u32 = rng.gen_range(0..=10000);

    Json(json!({
        "status" : "ok",
        "random": random,
    }))
}

async fn lbheartbeat() -> impl IntoResponse {
    ""
}
