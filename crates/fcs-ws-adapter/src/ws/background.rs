/*
[INPUT]:  A configured FcsClient and an owned EventHandler
[OUTPUT]: A dedicated thread running the client until stopped
[POS]:    WebSocket layer - non-blocking run mode for synchronous callers
[UPDATE]: When changing thread or runtime setup for background mode
*/

use std::thread;

use tracing::{info, warn};

use super::client::FcsClient;
use super::handler::EventHandler;
use crate::error::{FcsError, Result};

const THREAD_NAME: &str = "fcs-ws-client";

/// Client running on its own thread with a private current-thread runtime.
#[derive(Debug)]
pub struct BackgroundClient {
    client: FcsClient,
    thread: Option<thread::JoinHandle<Result<()>>>,
}

impl FcsClient {
    /// Run the client on a background thread and return immediately.
    ///
    /// The handler moves to the worker thread; share state with it through
    /// `Arc`-wrapped synchronised types.
    pub fn run_in_background<H>(&self, mut handler: H) -> Result<BackgroundClient>
    where
        H: EventHandler + Send + 'static,
    {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        let worker = self.clone();
        let thread = thread::Builder::new()
            .name(THREAD_NAME.to_string())
            .spawn(move || {
                runtime.block_on(async move { worker.run_forever(&mut handler).await })
            })?;

        info!(thread = THREAD_NAME, "feed client running in background");
        Ok(BackgroundClient {
            client: self.clone(),
            thread: Some(thread),
        })
    }
}

impl BackgroundClient {
    pub fn client(&self) -> &FcsClient {
        &self.client
    }

    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().is_none_or(|thread| thread.is_finished())
    }

    /// Disconnect and wait for the worker thread to exit.
    pub fn stop(mut self) -> Result<()> {
        self.client.disconnect();
        self.join()
    }

    fn join(&mut self) -> Result<()> {
        match self.thread.take() {
            Some(thread) => thread.join().map_err(|_| {
                FcsError::Runtime(std::io::Error::other("background client thread panicked"))
            })?,
            None => Ok(()),
        }
    }
}

impl Drop for BackgroundClient {
    fn drop(&mut self) {
        if self.thread.is_some() {
            self.client.disconnect();
            if let Err(err) = self.join() {
                warn!(error = %err, "background client stopped with error");
            }
        }
    }
}
