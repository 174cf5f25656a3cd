/*
[INPUT]:  Page context, bound TCP listener, shutdown token
[OUTPUT]: axum application serving the dashboard, client script and health check
[POS]:    Web layer - framework-based demo server
[UPDATE]: When adding routes to the framework server
*/

use std::sync::Arc;

use anyhow::Context;
use axum::{
    extract::State,
    http::header,
    response::{Html, IntoResponse},
    routing::get,
    Json, Router,
};
use serde_json::json;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::page::{render_page, PageContext, CLIENT_LIB_JS};

#[derive(Clone)]
struct AppState {
    page: Arc<String>,
}

pub fn build_router(ctx: &PageContext) -> Router {
    let state = AppState {
        page: Arc::new(render_page(ctx)),
    };

    Router::new()
        .route("/", get(serve_page))
        .route("/fcs-client-lib.js", get(serve_client_lib))
        .route("/healthz", get(healthz))
        .with_state(state)
}

pub async fn serve_with_listener(
    listener: TcpListener,
    ctx: PageContext,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let app = build_router(&ctx);
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .context("router server")?;
    info!("router server stopped");
    Ok(())
}

async fn serve_page(State(state): State<AppState>) -> Html<String> {
    debug!("GET /");
    Html(state.page.as_ref().clone())
}

async fn serve_client_lib() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/javascript; charset=utf-8")],
        CLIENT_LIB_JS,
    )
}

async fn healthz() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}
