//! Realtime invalidation channel.
//!
//! The server pushes `{"action": "update", "ids": ["tickets/abc", ...]}` over
//! a websocket whenever records change. Each id becomes an [`Invalidation`]
//! on a `tokio::sync::broadcast` channel; subscribers re-fetch what they
//! show. Messages are neither acknowledged nor buffered beyond the channel
//! capacity, so a lagging subscriber skips ahead.
//!
//! ERROR HANDLING
//! ==============
//! Connect and read failures are recorded in [`SocketState`] and logged; the
//! task then sleeps with exponential backoff (1 s doubling to 10 s) and
//! reconnects. Undecodable frames are logged and dropped.

#[cfg(test)]
#[path = "realtime_test.rs"]
mod realtime_test;

use std::time::Duration;

use futures_util::StreamExt;
use serde::Deserialize;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::error::RealtimeError;
use crate::state::socket::{SharedSocketState, SocketState};

const CHANNEL_CAPACITY: usize = 256;
const INITIAL_BACKOFF_MS: u64 = 1000;
const MAX_BACKOFF_MS: u64 = 10_000;
const SETTINGS_COLLECTION: &str = "settings";

/// A server-side change the client should re-fetch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Invalidation {
    /// One record, e.g. `tickets/abc`.
    Record { collection: String, id: String },
    /// A whole collection, when the id carries no record part.
    Collection(String),
    /// Any `settings/*` id.
    Settings,
}

impl Invalidation {
    /// Split a pushed id into collection and record.
    #[must_use]
    pub fn from_id(raw: &str) -> Option<Self> {
        let raw = raw.trim().trim_matches('/');
        if raw.is_empty() {
            return None;
        }
        let (collection, id) = match raw.split_once('/') {
            Some((collection, id)) => (collection, id.trim_matches('/')),
            None => (raw, ""),
        };
        if collection == SETTINGS_COLLECTION {
            return Some(Self::Settings);
        }
        if id.is_empty() {
            return Some(Self::Collection(collection.to_owned()));
        }
        Some(Self::Record {
            collection: collection.to_owned(),
            id: id.to_owned(),
        })
    }

    #[must_use]
    pub fn collection(&self) -> &str {
        match self {
            Self::Record { collection, .. } | Self::Collection(collection) => collection,
            Self::Settings => SETTINGS_COLLECTION,
        }
    }

    #[must_use]
    pub fn record_id(&self) -> Option<&str> {
        match self {
            Self::Record { id, .. } => Some(id),
            Self::Collection(_) | Self::Settings => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct PushMessage {
    action: String,
    #[serde(default)]
    ids: Vec<String>,
}

/// Decode one text frame. Actions other than `update` yield nothing.
///
/// # Errors
///
/// Returns the JSON error for frames that are not a push message.
pub fn parse_message(text: &str) -> Result<Vec<Invalidation>, serde_json::Error> {
    let message: PushMessage = serde_json::from_str(text)?;
    if message.action != "update" {
        debug!(action = %message.action, "ignoring realtime action");
        return Ok(Vec::new());
    }
    Ok(message.ids.iter().filter_map(|id| Invalidation::from_id(id)).collect())
}

/// Reconnect delay: starts at 1 s, doubles per failure, caps at 10 s.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Backoff {
    next_ms: u64,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            next_ms: INITIAL_BACKOFF_MS,
        }
    }
}

impl Backoff {
    pub fn next_delay(&mut self) -> Duration {
        let delay = Duration::from_millis(self.next_ms);
        self.next_ms = (self.next_ms * 2).min(MAX_BACKOFF_MS);
        delay
    }

    pub fn reset(&mut self) {
        self.next_ms = INITIAL_BACKOFF_MS;
    }
}

// =============================================================================
// HANDLE
// =============================================================================

/// Running realtime task. Dropping the handle stops the task.
#[derive(Debug)]
pub struct RealtimeHandle {
    sender: broadcast::Sender<Invalidation>,
    state: SharedSocketState,
    task: JoinHandle<()>,
}

impl RealtimeHandle {
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Invalidation> {
        self.sender.subscribe()
    }

    #[must_use]
    pub fn state(&self) -> SocketState {
        self.state.snapshot()
    }

    #[must_use]
    pub fn shared_state(&self) -> SharedSocketState {
        self.state.clone()
    }
}

impl Drop for RealtimeHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Spawn the realtime task on the current tokio runtime.
///
/// # Errors
///
/// `RealtimeError::InvalidUrl` if the base URL has no websocket mapping.
pub fn spawn_realtime(config: &ClientConfig, token: Option<&str>) -> Result<RealtimeHandle, RealtimeError> {
    let url = config
        .realtime_url()
        .ok_or_else(|| RealtimeError::InvalidUrl(config.base_url.clone()))?;
    let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
    let state = SharedSocketState::default();
    let task = tokio::spawn(realtime_loop(
        url,
        token.map(ToOwned::to_owned),
        sender.clone(),
        state.clone(),
    ));
    Ok(RealtimeHandle { sender, state, task })
}

async fn realtime_loop(
    url: String,
    token: Option<String>,
    sender: broadcast::Sender<Invalidation>,
    state: SharedSocketState,
) {
    let mut backoff = Backoff::default();
    loop {
        match connect_and_run(&url, token.as_deref(), &sender, &state, &mut backoff).await {
            Ok(()) => info!(%url, "realtime socket closed"),
            Err(e) => {
                warn!(%url, error = %e, "realtime socket error");
                state.update(|s| s.record_error(e.to_string()));
            }
        }
        state.update(SocketState::mark_disconnected);

        let delay = backoff.next_delay();
        debug!(?delay, "realtime reconnect scheduled");
        tokio::time::sleep(delay).await;
        state.update(SocketState::record_reconnect);
    }
}

async fn connect_and_run(
    url: &str,
    token: Option<&str>,
    sender: &broadcast::Sender<Invalidation>,
    state: &SharedSocketState,
    backoff: &mut Backoff,
) -> Result<(), RealtimeError> {
    let mut request = url.into_client_request()?;
    if let Some(token) = token {
        let value =
            HeaderValue::from_str(&format!("Bearer {token}")).map_err(|_| RealtimeError::InvalidToken)?;
        request.headers_mut().insert(AUTHORIZATION, value);
    }

    let (mut stream, _) = connect_async(request).await?;
    info!(%url, "realtime socket connected");
    state.update(SocketState::mark_connected);
    backoff.reset();

    while let Some(message) = stream.next().await {
        match message? {
            Message::Text(text) => {
                state.update(|s| s.record_message(text.as_str()));
                publish(sender, text.as_str());
            }
            Message::Close(_) => return Ok(()),
            _ => {}
        }
    }
    Err(RealtimeError::Closed)
}

fn publish(sender: &broadcast::Sender<Invalidation>, text: &str) {
    let invalidations = match parse_message(text) {
        Ok(invalidations) => invalidations,
        Err(e) => {
            warn!(error = %e, "dropping undecodable realtime frame");
            return;
        }
    };
    for invalidation in invalidations {
        if sender.send(invalidation).is_err() {
            debug!("realtime invalidation without subscribers");
        }
    }
}
