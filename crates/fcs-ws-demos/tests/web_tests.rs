/*
[INPUT]:  Router and raw servers bound to ephemeral ports
[OUTPUT]: Test results for the web demos over real HTTP
[POS]:    Integration tests - web demos
[UPDATE]: When routes or response rules change
*/

use std::net::SocketAddr;
use std::path::PathBuf;

use fcs_ws_demos::web::{page, raw, router, Engine};
use fcs_ws_demos::{DemoConfig, Preset};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_test::assert_ok;
use tokio_util::sync::CancellationToken;

struct Running {
    addr: SocketAddr,
    shutdown: CancellationToken,
    handle: JoinHandle<anyhow::Result<()>>,
}

impl Running {
    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    async fn stop(self) {
        self.shutdown.cancel();
        assert_ok!(assert_ok!(self.handle.await));
    }
}

async fn start(engine: Engine, preset: Preset, static_dir: Option<PathBuf>) -> Running {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let shutdown = CancellationToken::new();
    let ctx = engine.page_context(&DemoConfig::for_preset(preset));

    let token = shutdown.clone();
    let handle = match engine {
        Engine::Router => tokio::spawn(router::serve_with_listener(listener, ctx, token)),
        Engine::Raw => tokio::spawn(raw::serve_with_listener(listener, ctx, static_dir, token)),
    };

    Running {
        addr,
        shutdown,
        handle,
    }
}

/// Send raw bytes and read the full response (server closes the connection).
async fn raw_request(addr: SocketAddr, request: &[u8]) -> String {
    let mut stream = TcpStream::connect(addr).await.expect("connect");
    stream.write_all(request).await.expect("write");
    let mut response = Vec::new();
    stream.read_to_end(&mut response).await.expect("read");
    String::from_utf8_lossy(&response).into_owned()
}

#[tokio::test]
async fn router_serves_page_script_and_health() {
    let server = start(Engine::Router, Preset::Forex, None).await;
    let client = reqwest::Client::new();

    let page = assert_ok!(client.get(server.url("/")).send().await);
    assert_eq!(page.status(), 200);
    let body = assert_ok!(page.text().await);
    assert!(body.contains(page::CDN_SCRIPT_SRC));
    assert!(body.contains("id=\"price-FX-EURUSD\""));

    let script = assert_ok!(client.get(server.url("/fcs-client-lib.js")).send().await);
    assert_eq!(script.status(), 200);
    let content_type = script.headers()["content-type"].to_str().unwrap().to_string();
    assert!(content_type.starts_with("application/javascript"));
    assert!(assert_ok!(script.text().await).contains("class FCSClient"));

    let health: serde_json::Value =
        assert_ok!(assert_ok!(client.get(server.url("/healthz")).send().await).json().await);
    assert_eq!(health, serde_json::json!({ "status": "ok" }));

    let missing = assert_ok!(client.get(server.url("/nope")).send().await);
    assert_eq!(missing.status(), 404);

    server.stop().await;
}

#[tokio::test]
async fn raw_serves_page_with_local_script() {
    let server = start(Engine::Raw, Preset::Stock, None).await;
    let client = reqwest::Client::new();

    for path in ["/", "/index.html", "/?tab=1"] {
        let response = assert_ok!(client.get(server.url(path)).send().await);
        assert_eq!(response.status(), 200, "{path}");
        let body = assert_ok!(response.text().await);
        assert!(body.contains("<script src=\"/fcs-client-lib.js\"></script>"));
        assert!(body.contains("<span class=\"exchange\">NASDAQ</span>"));
    }

    let script = assert_ok!(client.get(server.url("/fcs-client-lib.js")).send().await);
    assert_eq!(script.headers()["content-type"], "application/javascript");
    let expected_len = page::CLIENT_LIB_JS.len().to_string();
    assert_eq!(script.headers()["content-length"], expected_len.as_str());

    let head = raw_request(server.addr, b"GET / HTTP/1.1\r\nHost: x\r\n\r\n").await;
    assert!(head.starts_with("HTTP/1.1 200 OK\r\n"));
    let lower = head.to_ascii_lowercase();
    assert!(lower.contains("content-type: text/html; charset=utf-8\r\n"));
    assert!(lower.contains("connection: close\r\n"));

    server.stop().await;
}

#[tokio::test]
async fn raw_static_dir_and_traversal() {
    let dir = tempfile::tempdir().expect("temp dir");
    std::fs::write(dir.path().join("style.css"), "body{}").expect("write css");
    std::fs::create_dir(dir.path().join("public")).expect("mkdir");
    std::fs::write(dir.path().join("public").join("note.txt"), "hello").expect("write txt");

    let server = start(Engine::Raw, Preset::Forex, Some(dir.path().join("public"))).await;
    let client = reqwest::Client::new();

    let note = assert_ok!(client.get(server.url("/note.txt")).send().await);
    assert_eq!(note.status(), 200);
    assert_eq!(assert_ok!(note.text().await), "hello");

    // reqwest normalises `..`, so traversal goes over a plain socket.
    let escaped = raw_request(server.addr, b"GET /../style.css HTTP/1.1\r\nHost: x\r\n\r\n").await;
    assert!(escaped.starts_with("HTTP/1.1 404 Not Found\r\n"), "{escaped}");

    let missing = assert_ok!(client.get(server.url("/missing.txt")).send().await);
    assert_eq!(missing.status(), 404);

    server.stop().await;
}

#[tokio::test]
async fn raw_rejects_other_methods_and_garbage() {
    let server = start(Engine::Raw, Preset::Forex, None).await;

    let post = raw_request(
        server.addr,
        b"POST / HTTP/1.1\r\nHost: x\r\nContent-Length: 0\r\n\r\n",
    )
    .await;
    assert!(post.starts_with("HTTP/1.1 405 Method Not Allowed\r\n"), "{post}");
    assert!(post.to_ascii_lowercase().contains("allow: get\r\n"));

    let garbage = raw_request(server.addr, b"hello\r\n\r\n").await;
    assert!(garbage.starts_with("HTTP/1.1 400 Bad Request\r\n"), "{garbage}");

    server.stop().await;
}

#[tokio::test]
async fn raw_answers_non_utf8_request_target() {
    let server = start(Engine::Raw, Preset::Forex, None).await;

    let response = raw_request(server.addr, b"GET /caf\xe9 HTTP/1.1\r\nHost: x\r\n\r\n").await;
    assert!(response.starts_with("HTTP/1.1 4"), "{response:?}");

    // The connection that failed does not take the server down.
    let page = raw_request(server.addr, b"GET / HTTP/1.1\r\nHost: x\r\n\r\n").await;
    assert!(page.starts_with("HTTP/1.1 200 OK\r\n"));

    server.stop().await;
}
