/*
[INPUT]:  Page context, optional static directory, bound TCP listener, shutdown token
[OUTPUT]: Router-less hyper HTTP/1.1 GET server (one request per connection)
[POS]:    Web layer - framework-free demo server
[UPDATE]: When changing routing, static file rules or response headers
*/

use std::convert::Infallible;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use http_body_util::Full;
use hyper::body::{Bytes, Incoming};
use hyper::header::{HeaderValue, ALLOW, CONNECTION, CONTENT_TYPE};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::{TokioIo, TokioTimer};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::page::{render_page, PageContext, CLIENT_LIB_JS};

const HEADER_READ_TIMEOUT: Duration = Duration::from_secs(10);
/// Read buffer cap; a request head larger than this is rejected.
const MAX_HEAD_BYTES: usize = 16 * 1024;

const HTML: &str = "text/html; charset=utf-8";
const JAVASCRIPT: &str = "application/javascript";
const TEXT: &str = "text/plain; charset=utf-8";

type Body = Full<Bytes>;

struct RawState {
    page: String,
    static_dir: Option<PathBuf>,
}

pub async fn serve_with_listener(
    listener: TcpListener,
    ctx: PageContext,
    static_dir: Option<PathBuf>,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let state = Arc::new(RawState {
        page: render_page(&ctx),
        static_dir,
    });

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    let state = state.clone();
                    tokio::spawn(async move {
                        if let Err(err) = serve_connection(stream, state).await {
                            debug!(peer = %peer, error = %err, "connection failed");
                        }
                    });
                }
                Err(err) => warn!(error = %err, "accept failed"),
            }
        }
    }

    info!("raw server stopped");
    Ok(())
}

async fn serve_connection(stream: TcpStream, state: Arc<RawState>) -> hyper::Result<()> {
    let service = service_fn(move |req| handle(req, state.clone()));

    http1::Builder::new()
        .timer(TokioTimer::new())
        .header_read_timeout(HEADER_READ_TIMEOUT)
        .max_buf_size(MAX_HEAD_BYTES)
        .keep_alive(false)
        .title_case_headers(true)
        .serve_connection(TokioIo::new(stream), service)
        .await
}

async fn handle(req: Request<Incoming>, state: Arc<RawState>) -> Result<Response<Body>, Infallible> {
    let response = route(&state, req.method(), req.uri().path()).await;
    info!(
        method = %req.method(),
        path = req.uri().path(),
        status = response.status().as_u16(),
        "request"
    );
    Ok(response)
}

async fn route(state: &RawState, method: &Method, path: &str) -> Response<Body> {
    if *method != Method::GET {
        let mut response = error_response(StatusCode::METHOD_NOT_ALLOWED);
        response
            .headers_mut()
            .insert(ALLOW, HeaderValue::from_static("GET"));
        return response;
    }

    match path {
        "/" | "/index.html" => ok_response(HTML, state.page.clone()),
        "/fcs-client-lib.js" => ok_response(JAVASCRIPT, CLIENT_LIB_JS),
        _ => serve_static(state.static_dir.as_deref(), path).await,
    }
}

async fn serve_static(static_dir: Option<&Path>, path: &str) -> Response<Body> {
    let Some(root) = static_dir else {
        return error_response(StatusCode::NOT_FOUND);
    };
    let Some(relative) = sanitize_path(path) else {
        debug!(path, "rejected path outside static dir");
        return error_response(StatusCode::NOT_FOUND);
    };

    match tokio::fs::read(root.join(&relative)).await {
        Ok(body) => ok_response(content_type_for(&relative), body),
        Err(_) => error_response(StatusCode::NOT_FOUND),
    }
}

fn ok_response(content_type: &'static str, body: impl Into<Bytes>) -> Response<Body> {
    with_status(StatusCode::OK, content_type, body.into())
}

fn error_response(status: StatusCode) -> Response<Body> {
    let reason = status.canonical_reason().unwrap_or_default();
    let body = format!("{} {}\n", status.as_u16(), reason);
    with_status(status, TEXT, body.into())
}

fn with_status(status: StatusCode, content_type: &'static str, body: Bytes) -> Response<Body> {
    let mut response = Response::new(Full::new(body));
    *response.status_mut() = status;
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    headers.insert(CONNECTION, HeaderValue::from_static("close"));
    response
}

/// Relative path made only of normal components, or `None`.
fn sanitize_path(path: &str) -> Option<PathBuf> {
    let trimmed = path.trim_start_matches('/');
    if trimmed.is_empty() || trimmed.contains('\\') {
        return None;
    }

    let mut relative = PathBuf::new();
    for component in Path::new(trimmed).components() {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::CurDir => {}
            _ => return None,
        }
    }
    (!relative.as_os_str().is_empty()).then_some(relative)
}

fn content_type_for(path: &Path) -> &'static str {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("html" | "htm") => HTML,
        Some("js") => JAVASCRIPT,
        Some("css") => "text/css; charset=utf-8",
        Some("json") => "application/json",
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("ico") => "image/x-icon",
        Some("txt") => TEXT,
        _ => "application/octet-stream",
    }
}
