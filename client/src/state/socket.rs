//! Realtime socket status.
//!
//! SYSTEM CONTEXT
//! ==============
//! Written by the realtime task in `net::realtime`, read by views that show
//! a connection indicator. Shared as `Arc<Mutex<_>>`; every critical section
//! is a field update, so a poisoned lock is recovered rather than propagated.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use time::OffsetDateTime;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SocketState {
    pub connected: bool,
    /// Raw text of the last frame received.
    pub last_message: Option<String>,
    pub last_message_at: Option<OffsetDateTime>,
    /// Reconnect attempts since the handle was spawned.
    pub reconnects: u32,
    pub last_error: Option<String>,
}

impl SocketState {
    pub fn mark_connected(&mut self) {
        self.connected = true;
        self.last_error = None;
    }

    pub fn mark_disconnected(&mut self) {
        self.connected = false;
    }

    pub fn record_message(&mut self, text: &str) {
        self.last_message = Some(text.to_owned());
        self.last_message_at = Some(OffsetDateTime::now_utc());
    }

    pub fn record_error(&mut self, error: String) {
        self.connected = false;
        self.last_error = Some(error);
    }

    pub fn record_reconnect(&mut self) {
        self.reconnects = self.reconnects.saturating_add(1);
    }
}

#[derive(Clone, Debug, Default)]
pub struct SharedSocketState(Arc<Mutex<SocketState>>);

impl SharedSocketState {
    #[must_use]
    pub fn snapshot(&self) -> SocketState {
        self.lock().clone()
    }

    pub fn update(&self, f: impl FnOnce(&mut SocketState)) {
        f(&mut self.lock());
    }

    fn lock(&self) -> MutexGuard<'_, SocketState> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn socket_state_default_disconnected() {
        let state = SocketState::default();
        assert!(!state.connected);
        assert_eq!(state.reconnects, 0);
        assert!(state.last_message.is_none());
    }

    #[test]
    fn connect_clears_previous_error() {
        let mut state = SocketState::default();
        state.record_error("refused".to_owned());
        assert_eq!(state.last_error.as_deref(), Some("refused"));
        state.mark_connected();
        assert!(state.connected);
        assert!(state.last_error.is_none());
    }

    #[test]
    fn record_message_stamps_time() {
        let mut state = SocketState::default();
        state.record_message(r#"{"action":"update"}"#);
        assert_eq!(state.last_message.as_deref(), Some(r#"{"action":"update"}"#));
        assert!(state.last_message_at.is_some());
    }

    #[test]
    fn shared_state_updates_are_visible_in_snapshots() {
        let shared = SharedSocketState::default();
        let writer = shared.clone();
        writer.update(SocketState::record_reconnect);
        writer.update(SocketState::record_reconnect);
        assert_eq!(shared.snapshot().reconnects, 2);
    }
}
