/*
[INPUT]:  API key, feed URL and join/leave commands
[OUTPUT]: ClientEvent stream with reconnect, rejoin and heartbeat handled internally
[POS]:    WebSocket layer - real-time data stream handling
[UPDATE]: When adding new commands or changing connection logic
*/

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};
use url::Url;

use super::handler::{dispatch, EventHandler};
use super::message::{ClientEvent, ConnectionState};
use crate::error::{FcsError, Result};
use crate::types::{ClientMessage, ServerMessage, SubscriptionKey};

pub const DEFAULT_WS_URL: &str = "wss://ws-v4.fcsapi.com/ws";
const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(3);
const DEFAULT_RECONNECT_LIMIT: u32 = 5;
const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(25);
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_EVENT_CAPACITY: usize = 256;

const CLOSE_NORMAL: u16 = 1000;
const CLOSE_NO_STATUS: u16 = 1005;
const CLOSE_ABNORMAL: u16 = 1006;

const MESSAGE_SAMPLE_LIMIT: usize = 3;
const PARSE_FAIL_LOG_LIMIT: usize = 3;
const EVENT_DROP_LOG_LIMIT: usize = 3;
const RAW_LOG_MAX_BYTES: usize = 1024;

static MESSAGE_SAMPLE_COUNT: AtomicUsize = AtomicUsize::new(0);
static PARSE_FAIL_LOG_COUNT: AtomicUsize = AtomicUsize::new(0);
static EVENT_DROP_LOG_COUNT: AtomicUsize = AtomicUsize::new(0);

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsWriter = SplitSink<WsStream, WsMessage>;
type WsReader = SplitStream<WsStream>;

/// Connection settings
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub url: String,
    /// Fixed delay between a drop and the next connect attempt.
    pub reconnect_delay: Duration,
    /// Consecutive reconnects allowed before the driver gives up.
    pub reconnect_limit: u32,
    pub heartbeat_interval: Duration,
    /// Upper bound on the TCP connect plus WebSocket upgrade.
    pub connect_timeout: Duration,
    pub event_capacity: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_WS_URL.to_string(),
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            reconnect_limit: DEFAULT_RECONNECT_LIMIT,
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl ClientConfig {
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }
}

#[derive(Debug)]
enum Command {
    Send(ClientMessage),
    Disconnect,
}

#[derive(Debug)]
struct Shared {
    api_key: String,
    config: ClientConfig,
    active: Mutex<BTreeMap<String, SubscriptionKey>>,
    connection_state: watch::Sender<ConnectionState>,
    socket_open: AtomicBool,
    connected: AtomicBool,
    manual_close: AtomicBool,
    cmd_tx: mpsc::UnboundedSender<Command>,
    cmd_rx: Mutex<Option<mpsc::UnboundedReceiver<Command>>>,
    event_tx: Mutex<Option<mpsc::Sender<ClientEvent>>>,
    event_rx: Mutex<Option<mpsc::Receiver<ClientEvent>>>,
    driver: Mutex<Option<JoinHandle<Result<()>>>>,
}

/// WebSocket client for the FCS market data feed.
///
/// Clones share one connection. A client is single-use: once its driver stops
/// (manual disconnect or reconnect limit) a new client must be created.
#[derive(Debug, Clone)]
pub struct FcsClient {
    shared: Arc<Shared>,
}

impl FcsClient {
    /// Create a client with the default configuration
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_config(api_key, ClientConfig::default())
    }

    pub fn with_config(api_key: impl Into<String>, config: ClientConfig) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(FcsError::MissingApiKey);
        }

        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::channel(config.event_capacity.max(1));
        let (connection_state, _rx) = watch::channel(ConnectionState::Idle);

        Ok(Self {
            shared: Arc::new(Shared {
                api_key,
                config,
                active: Mutex::new(BTreeMap::new()),
                connection_state,
                socket_open: AtomicBool::new(false),
                connected: AtomicBool::new(false),
                manual_close: AtomicBool::new(false),
                cmd_tx,
                cmd_rx: Mutex::new(Some(cmd_rx)),
                event_tx: Mutex::new(Some(event_tx)),
                event_rx: Mutex::new(Some(event_rx)),
                driver: Mutex::new(None),
            }),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.shared.config
    }

    /// Full connect URL with the access key query parameter
    pub fn connect_url(&self) -> Result<Url> {
        Ok(Url::parse_with_params(
            &self.shared.config.url,
            &[("access_key", self.shared.api_key.as_str())],
        )?)
    }

    /// Start the connection driver on the current Tokio runtime.
    pub fn connect(&self) -> Result<()> {
        let mut driver = lock(&self.shared.driver);
        if driver.is_some() {
            return Err(FcsError::AlreadyRunning);
        }

        let url = self.connect_url()?;
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|err| FcsError::Runtime(std::io::Error::other(err)))?;

        let cmd_rx = lock(&self.shared.cmd_rx)
            .take()
            .ok_or(FcsError::AlreadyRunning)?;
        let event_tx = lock(&self.shared.event_tx)
            .take()
            .ok_or(FcsError::AlreadyRunning)?;

        self.shared.manual_close.store(false, Ordering::SeqCst);
        let worker = ConnectionDriver {
            shared: self.shared.clone(),
            url,
            cmd_rx,
            event_tx,
            reconnects: 0,
            had_session: false,
        };
        *driver = Some(runtime.spawn(worker.run()));

        Ok(())
    }

    /// Hand out the raw event receiver. Only the first call returns `Some`.
    pub fn take_events(&self) -> Option<mpsc::Receiver<ClientEvent>> {
        lock(&self.shared.event_rx).take()
    }

    /// Subscribe to `symbol` on `timeframe`.
    ///
    /// The key becomes active once the server confirms the join.
    pub fn join(&self, symbol: &str, timeframe: &str) -> Result<()> {
        let key = SubscriptionKey::new(symbol, timeframe)?;
        self.send(ClientMessage::join(&key))
    }

    pub fn leave(&self, symbol: &str, timeframe: &str) -> Result<()> {
        let key = SubscriptionKey::new(symbol, timeframe)?;
        lock(&self.shared.active).remove(&key.id());
        self.send(ClientMessage::leave(&key))
    }

    pub fn remove_all(&self) -> Result<()> {
        lock(&self.shared.active).clear();
        self.send(ClientMessage::RemoveAll)
    }

    /// Close the socket and stop reconnecting.
    pub fn disconnect(&self) {
        self.shared.manual_close.store(true, Ordering::SeqCst);
        self.shared.connected.store(false, Ordering::SeqCst);
        let _ = self.shared.cmd_tx.send(Command::Disconnect);
    }

    pub fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::SeqCst)
    }

    /// Snapshot of server-confirmed subscriptions, ordered by key id
    pub fn active_subscriptions(&self) -> Vec<SubscriptionKey> {
        lock(&self.shared.active).values().cloned().collect()
    }

    pub fn subscribe_connection_state(&self) -> watch::Receiver<ConnectionState> {
        self.shared.connection_state.subscribe()
    }

    /// Drive events into `handler` until the connection driver stops.
    ///
    /// Connects first if `connect` has not been called yet. Returns the driver's outcome:
    /// `Ok` after a manual disconnect, `ReconnectLimit` when reconnecting gave up.
    pub async fn run_forever<H: EventHandler + ?Sized>(&self, handler: &mut H) -> Result<()> {
        let mut events = self.take_events().ok_or(FcsError::EventsTaken)?;
        if lock(&self.shared.driver).is_none() {
            self.connect()?;
        }

        while let Some(event) = events.recv().await {
            dispatch(handler, self, &event);
        }

        self.join_driver().await
    }

    async fn join_driver(&self) -> Result<()> {
        let handle = lock(&self.shared.driver).take();
        match handle {
            Some(handle) => handle
                .await
                .map_err(|err| FcsError::Runtime(std::io::Error::other(err)))?,
            None => Ok(()),
        }
    }

    fn send(&self, message: ClientMessage) -> Result<()> {
        if !self.shared.socket_open.load(Ordering::SeqCst) {
            debug!(frame = ?message, "socket not open; frame dropped");
            return Ok(());
        }
        if let Err(err) = self.shared.cmd_tx.send(Command::Send(message)) {
            debug!(frame = ?err.0, "connection driver gone; frame dropped");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionExit {
    Dropped,
    Manual,
}

enum Handshake {
    Open(WsStream),
    Failed,
    Manual,
}

struct ConnectionDriver {
    shared: Arc<Shared>,
    url: Url,
    cmd_rx: mpsc::UnboundedReceiver<Command>,
    event_tx: mpsc::Sender<ClientEvent>,
    reconnects: u32,
    had_session: bool,
}

impl ConnectionDriver {
    async fn run(mut self) -> Result<()> {
        loop {
            if self.shared.manual_close.load(Ordering::SeqCst) {
                return self.stop(Ok(()));
            }

            self.set_state(ConnectionState::Connecting);
            debug!(ws_url = %self.shared.config.url, "connecting to feed");

            let exit = match self.open_socket().await {
                Handshake::Open(stream) => {
                    self.shared.socket_open.store(true, Ordering::SeqCst);
                    let exit = self.session(stream).await;
                    self.shared.socket_open.store(false, Ordering::SeqCst);
                    self.shared.connected.store(false, Ordering::SeqCst);
                    exit
                }
                Handshake::Failed => SessionExit::Dropped,
                Handshake::Manual => SessionExit::Manual,
            };

            if exit == SessionExit::Manual || self.shared.manual_close.load(Ordering::SeqCst) {
                return self.stop(Ok(()));
            }

            self.reconnects = self.reconnects.saturating_add(1);
            let limit = self.shared.config.reconnect_limit;
            if self.reconnects > limit {
                warn!(attempts = limit, "feed reconnect limit reached; giving up");
                let err = FcsError::ReconnectLimit { attempts: limit };
                self.emit(ClientEvent::Error(err.to_string()));
                return self.stop(Err(err));
            }

            self.set_state(ConnectionState::Disconnected {
                retry_count: self.reconnects,
            });
            info!(
                retry_count = self.reconnects,
                delay = ?self.shared.config.reconnect_delay,
                "feed disconnected; reconnecting"
            );

            if self.wait_reconnect_delay().await == SessionExit::Manual {
                return self.stop(Ok(()));
            }
        }
    }

    /// Connect and upgrade within `connect_timeout`, giving way to `disconnect`.
    async fn open_socket(&mut self) -> Handshake {
        let limit = self.shared.config.connect_timeout;
        let handshake = tokio::time::timeout(limit, connect_async(self.url.to_string()));
        tokio::pin!(handshake);

        loop {
            tokio::select! {
                result = &mut handshake => return match result {
                    Ok(Ok((stream, _response))) => Handshake::Open(stream),
                    Ok(Err(err)) => {
                        warn!(error = %err, "feed connect failed");
                        self.emit(ClientEvent::Error(err.to_string()));
                        Handshake::Failed
                    }
                    Err(_) => {
                        warn!(timeout = ?limit, "feed connect timed out");
                        self.emit(ClientEvent::Error(format!("connect timed out after {limit:?}")));
                        Handshake::Failed
                    }
                },
                cmd = self.cmd_rx.recv() => match cmd {
                    Some(Command::Send(frame)) => {
                        debug!(frame = ?frame, "socket not open; frame dropped");
                    }
                    Some(Command::Disconnect) | None => {
                        info!("feed connect abandoned by client");
                        return Handshake::Manual;
                    }
                }
            }
        }
    }

    /// Sleep out the reconnect delay while still honouring `disconnect`.
    async fn wait_reconnect_delay(&mut self) -> SessionExit {
        let sleep = tokio::time::sleep(self.shared.config.reconnect_delay);
        tokio::pin!(sleep);

        loop {
            tokio::select! {
                _ = &mut sleep => return SessionExit::Dropped,
                cmd = self.cmd_rx.recv() => match cmd {
                    Some(Command::Send(frame)) => {
                        debug!(frame = ?frame, "socket not open; frame dropped");
                    }
                    Some(Command::Disconnect) | None => return SessionExit::Manual,
                }
            }
        }
    }

    async fn session(&mut self, stream: WsStream) -> SessionExit {
        let (mut write, mut read): (WsWriter, WsReader) = stream.split();
        let mut heartbeat: Option<Interval> = None;

        loop {
            tokio::select! {
                _ = next_heartbeat(&mut heartbeat) => {
                    if let Err(err) = send_frame(&mut write, &ClientMessage::ping_now()).await {
                        return self.dropped(CLOSE_ABNORMAL, err.to_string());
                    }
                }
                cmd = self.cmd_rx.recv() => match cmd {
                    Some(Command::Send(frame)) => {
                        if let Err(err) = send_frame(&mut write, &frame).await {
                            return self.dropped(CLOSE_ABNORMAL, err.to_string());
                        }
                    }
                    Some(Command::Disconnect) | None => {
                        let _ = write.send(WsMessage::Close(None)).await;
                        info!("feed disconnected by client");
                        self.emit(ClientEvent::Closed {
                            code: CLOSE_NORMAL,
                            reason: "client disconnect".to_string(),
                        });
                        return SessionExit::Manual;
                    }
                },
                incoming = read.next() => match incoming {
                    Some(Ok(WsMessage::Text(text))) => {
                        if let Err(err) = self.handle_text(text.as_str(), &mut write, &mut heartbeat).await {
                            return self.dropped(CLOSE_ABNORMAL, err.to_string());
                        }
                    }
                    Some(Ok(WsMessage::Binary(bytes))) => {
                        let Ok(text) = std::str::from_utf8(&bytes) else {
                            debug!(bytes = bytes.len(), "non utf-8 binary frame ignored");
                            continue;
                        };
                        if let Err(err) = self.handle_text(text, &mut write, &mut heartbeat).await {
                            return self.dropped(CLOSE_ABNORMAL, err.to_string());
                        }
                    }
                    Some(Ok(WsMessage::Close(frame))) => {
                        let (code, reason) = match frame {
                            Some(frame) => (u16::from(frame.code), frame.reason.as_str().to_string()),
                            None => (CLOSE_NO_STATUS, String::new()),
                        };
                        let _ = write.send(WsMessage::Close(None)).await;
                        return self.dropped(code, reason);
                    }
                    Some(Ok(_)) => {}
                    Some(Err(err)) => {
                        self.emit(ClientEvent::Error(err.to_string()));
                        return self.dropped(CLOSE_ABNORMAL, err.to_string());
                    }
                    None => {
                        return self.dropped(CLOSE_ABNORMAL, "stream ended".to_string());
                    }
                }
            }
        }
    }

    async fn handle_text(
        &mut self,
        text: &str,
        write: &mut WsWriter,
        heartbeat: &mut Option<Interval>,
    ) -> Result<()> {
        let message = match serde_json::from_str::<ServerMessage>(text) {
            Ok(message) => message,
            Err(err) => {
                log_parse_fail_once(&err, text);
                return Ok(());
            }
        };

        match message {
            ServerMessage::Ping { .. } => {
                send_frame(write, &ClientMessage::pong_now()).await?;
            }
            ServerMessage::Welcome { .. } => {
                self.shared.connected.store(true, Ordering::SeqCst);
                self.reconnects = 0;
                self.set_state(ConnectionState::Connected);

                let rejoin: Vec<SubscriptionKey> =
                    lock(&self.shared.active).values().cloned().collect();
                for key in &rejoin {
                    send_frame(write, &ClientMessage::join(key)).await?;
                }

                let period = self.shared.config.heartbeat_interval;
                *heartbeat = Some(tokio::time::interval_at(Instant::now() + period, period));

                let event = if self.had_session {
                    ClientEvent::Reconnected
                } else {
                    ClientEvent::Connected
                };
                info!(rejoined = rejoin.len(), reconnect = self.had_session, "feed session established");
                self.had_session = true;
                self.emit(event);
            }
            message => {
                if let Some((symbol, timeframe)) = message.joined_room() {
                    let key = SubscriptionKey {
                        symbol: symbol.to_string(),
                        timeframe: timeframe.to_string(),
                    };
                    info!(symbol, timeframe, "subscribed");
                    lock(&self.shared.active).insert(key.id(), key);
                }
                log_message_sample_once(&message);
                self.emit(ClientEvent::Message(message));
            }
        }

        Ok(())
    }

    fn dropped(&mut self, code: u16, reason: String) -> SessionExit {
        warn!(code, reason = %reason, "feed connection closed");
        self.emit(ClientEvent::Closed { code, reason });
        SessionExit::Dropped
    }

    fn stop(&mut self, outcome: Result<()>) -> Result<()> {
        self.shared.connected.store(false, Ordering::SeqCst);
        self.set_state(ConnectionState::Stopped);
        outcome
    }

    fn set_state(&self, state: ConnectionState) {
        self.shared.connection_state.send_replace(state);
    }

    fn emit(&self, event: ClientEvent) {
        match self.event_tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(event)) => log_event_dropped_once(&event),
            Err(mpsc::error::TrySendError::Closed(_)) => {}
        }
    }
}

async fn send_frame(write: &mut WsWriter, frame: &ClientMessage) -> Result<()> {
    let payload = frame.to_json()?;
    write.send(WsMessage::Text(payload.into())).await?;
    debug!(frame = ?frame, "frame sent");
    Ok(())
}

async fn next_heartbeat(heartbeat: &mut Option<Interval>) {
    match heartbeat {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn log_message_sample_once(message: &ServerMessage) {
    let count = MESSAGE_SAMPLE_COUNT.fetch_add(1, Ordering::Relaxed);
    if count >= MESSAGE_SAMPLE_LIMIT {
        return;
    }

    match message {
        ServerMessage::Price(update) => {
            info!(
                sample_index = count + 1,
                sample_limit = MESSAGE_SAMPLE_LIMIT,
                kind = "price",
                symbol = %update.symbol,
                mode = %update.prices.mode,
                "ws message sample"
            );
        }
        other => {
            info!(
                sample_index = count + 1,
                sample_limit = MESSAGE_SAMPLE_LIMIT,
                kind = other.kind(),
                "ws message sample"
            );
        }
    }
}

fn log_parse_fail_once(err: &serde_json::Error, raw: &str) {
    let count = PARSE_FAIL_LOG_COUNT.fetch_add(1, Ordering::Relaxed);
    if count < PARSE_FAIL_LOG_LIMIT {
        warn!(
            sample_index = count + 1,
            sample_limit = PARSE_FAIL_LOG_LIMIT,
            error = %err,
            bytes = raw.len(),
            "invalid message from server"
        );
        let preview = truncate_for_log(raw, RAW_LOG_MAX_BYTES);
        debug!(
            sample_index = count + 1,
            sample_limit = PARSE_FAIL_LOG_LIMIT,
            message = %preview,
            "invalid message from server"
        );
    }
}

fn log_event_dropped_once(event: &ClientEvent) {
    let count = EVENT_DROP_LOG_COUNT.fetch_add(1, Ordering::Relaxed);
    if count < EVENT_DROP_LOG_LIMIT {
        warn!(
            sample_index = count + 1,
            sample_limit = EVENT_DROP_LOG_LIMIT,
            event = ?event,
            "event channel full; event dropped"
        );
    }
}

fn truncate_for_log(value: &str, max_len: usize) -> String {
    if value.len() <= max_len {
        return value.to_string();
    }
    let mut end = max_len;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    let mut out = String::with_capacity(end + 3);
    out.push_str(&value[..end]);
    out.push_str("...");
    out
}
