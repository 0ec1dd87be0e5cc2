//! Error types for the client crate.
//!
//! ERROR HANDLING
//! ==============
//! Every failed HTTP call ends as an `ApiError`. Non-2xx responses keep the
//! status and the most specific message the body offers, so a view can turn
//! the error straight into a toast without inspecting the response again.

#[cfg(test)]
#[path = "error_test.rs"]
mod error_test;

use serde_json::Value;

/// Message shown when a mutating call is blocked by the demo flag.
pub const DEMO_MODE_MESSAGE: &str = "Cannot modify reactions or files in demo mode";

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("request failed with status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("not authenticated: {0}")]
    Unauthorized(String),
    #[error("{DEMO_MODE_MESSAGE}")]
    DemoMode,
    #[error("invalid query: {0}")]
    InvalidQuery(#[from] caql::SyntaxError),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("invalid record id: {0:?}")]
    InvalidId(String),
}

impl ApiError {
    /// HTTP status for errors that came from a response.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Unauthorized(_) => Some(401),
            Self::Http(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("no config directory available; set CATALYST_STATE_DIR")]
    NoStateDir,
    #[error("storage io failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum RealtimeError {
    #[error("cannot derive websocket URL from base URL: {0}")]
    InvalidUrl(String),
    #[error("websocket connect failed: {0}")]
    Connect(Box<tokio_tungstenite::tungstenite::Error>),
    #[error("session token cannot be sent as a header")]
    InvalidToken,
    #[error("websocket closed")]
    Closed,
}

impl From<tokio_tungstenite::tungstenite::Error> for RealtimeError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::Connect(Box::new(err))
    }
}

/// Best human-readable message in an error body.
///
/// Problem documents (`{title, detail}`) win, then `{error}`, then
/// `{message}`; anything else is returned as trimmed raw text.
pub(crate) fn problem_message(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        let text = |key: &str| {
            value
                .get(key)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
        };
        match (text("title"), text("detail")) {
            (Some(title), Some(detail)) => return format!("{title}: {detail}"),
            (Some(title), None) => return title.to_owned(),
            (None, Some(detail)) => return detail.to_owned(),
            (None, None) => {}
        }
        if let Some(message) = text("error").or_else(|| text("message")) {
            return message.to_owned();
        }
    }
    body.trim().to_owned()
}
