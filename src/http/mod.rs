use std::path::PathBuf;

use axum::routing::{any, delete, get, post, put};
use axum::Router;
use tower_http::services::ServeDir;
use tower_http::trace::{self, TraceLayer};

mod errors;
mod files;
mod uploads;

use crate::config::Config;
use crate::errors::{Error, Result};
use crate::session::UploadSessions;

/// Build the application router.
///
/// Routes under `/api` are matched by method and path; an `/api` path that matches no route is
/// a 404 and a known path hit with the wrong method is a 405. Everything else is served from
/// `static_dir`.
pub fn router(sessions: UploadSessions, static_dir: Option<PathBuf>) -> Router {
    let api = Router::new()
        .route(
            "/api/start-upload",
            post(uploads::start_upload).fallback(method_not_allowed),
        )
        .route(
            "/api/upload-part",
            put(uploads::upload_part).fallback(method_not_allowed),
        )
        .route(
            "/api/complete-upload",
            post(uploads::complete_upload).fallback(method_not_allowed),
        )
        .route(
            "/api/abort-upload",
            delete(uploads::abort_upload).fallback(method_not_allowed),
        )
        .route(
            "/api/files",
            get(files::list_files).fallback(method_not_allowed),
        )
        .route("/api/*rest", any(api_not_found))
        .with_state(sessions);

    let app = match static_dir {
        Some(dir) => api.fallback_service(ServeDir::new(dir)),
        None => api.fallback(static_not_configured),
    };

    app.layer(
        TraceLayer::new_for_http()
            .make_span_with(trace::DefaultMakeSpan::new().include_headers(true))
            .on_response(trace::DefaultOnResponse::new())
            .on_request(trace::DefaultOnRequest::new()),
    )
}

/// Run the HTTP server described by `config` until it fails.
pub async fn serve(config: Config) -> Result<()> {
    let objects = config.objects.new_objects().await?;
    let sessions = UploadSessions::new(objects, config.public_base_url()?);
    let app = router(sessions, config.static_dir.clone());

    tracing::info!("listening on {}", config.listen);
    axum::Server::bind(&config.listen)
        .serve(app.into_make_service())
        .await?;
    Ok(())
}

async fn method_not_allowed() -> Error {
    Error::MethodNotAllowed
}

async fn api_not_found(uri: axum::http::Uri) -> Error {
    Error::NotFound(uri.path().to_string())
}

async fn static_not_configured() -> Error {
    Error::ConfigError(String::from(
        "Static asset serving is not configured. Set static_dir in the configuration file.",
    ))
}
