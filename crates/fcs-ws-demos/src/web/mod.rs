/*
[INPUT]:  Demo configuration, engine choice, shutdown token
[OUTPUT]: Running web demo (axum router or router-less hyper server)
[POS]:    Web layer - module wiring and engine selection
[UPDATE]: When adding engines or changing bind defaults
*/

pub mod page;
pub mod raw;
pub mod router;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::DemoConfig;
pub use page::{render_page, PageContext};

/// Which HTTP stack serves the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Engine {
    /// axum router; page loads the client script from the CDN
    #[default]
    Router,
    /// Router-less hyper server; page loads the bundled script
    Raw,
}

impl Engine {
    pub fn default_port(self) -> u16 {
        match self {
            Engine::Router => 5001,
            Engine::Raw => 5002,
        }
    }

    pub fn page_context(self, config: &DemoConfig) -> PageContext {
        match self {
            Engine::Router => PageContext::from_config(config, "axum + WebSocket Demo", page::CDN_SCRIPT_SRC),
            Engine::Raw => PageContext::from_config(
                config,
                "Live WebSocket streaming from a raw HTTP server",
                page::LOCAL_SCRIPT_SRC,
            ),
        }
    }
}

/// Bind the configured address and serve until `shutdown` fires.
pub async fn serve(engine: Engine, config: &DemoConfig, shutdown: CancellationToken) -> anyhow::Result<()> {
    let port = config.server.port.unwrap_or_else(|| engine.default_port());
    let addr = format!("{}:{}", config.server.host, port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("bind {addr}"))?;
    let local = listener.local_addr().context("read bound address")?;

    info!(engine = ?engine, addr = %local, "web demo listening");
    println!("Open http://{local} in your browser");
    println!("Press Ctrl+C to stop");

    let ctx = engine.page_context(config);
    match engine {
        Engine::Router => router::serve_with_listener(listener, ctx, shutdown).await,
        Engine::Raw => {
            raw::serve_with_listener(listener, ctx, config.server.static_dir.clone(), shutdown).await
        }
    }
}
