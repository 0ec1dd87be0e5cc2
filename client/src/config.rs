//! Client configuration loaded from the environment.
//!
//! DESIGN
//! ======
//! Every knob has a `DEFAULT_*` constant and an environment override. Parse
//! failures fall back to the default instead of erroring so a typo in one
//! variable never blocks startup.

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8090";
pub const DEFAULT_API_PATH: &str = "/api";
pub const DEFAULT_AUTH_PATH: &str = "/auth";
pub const DEFAULT_REALTIME_PATH: &str = "/wss";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_REALTIME_ENABLED: bool = true;

/// Where the client talks to and where it keeps local state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
    /// Scheme and host of the server, without a trailing slash.
    pub base_url: String,
    /// Prefix for resource endpoints.
    pub api_path: String,
    /// Prefix for login and session endpoints.
    pub auth_path: String,
    /// Websocket path for push invalidations.
    pub realtime_path: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Directory holding `storage.json`. `None` means the platform default.
    pub state_dir: Option<PathBuf>,
    /// Whether the realtime channel should be started at all.
    pub realtime_enabled: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            api_path: DEFAULT_API_PATH.to_owned(),
            auth_path: DEFAULT_AUTH_PATH.to_owned(),
            realtime_path: DEFAULT_REALTIME_PATH.to_owned(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            state_dir: None,
            realtime_enabled: DEFAULT_REALTIME_ENABLED,
        }
    }
}

impl ClientConfig {
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            base_url: env_string("CATALYST_BASE_URL", DEFAULT_BASE_URL)
                .trim_end_matches('/')
                .to_owned(),
            api_path: env_path("CATALYST_API_PATH", DEFAULT_API_PATH),
            auth_path: env_path("CATALYST_AUTH_PATH", DEFAULT_AUTH_PATH),
            realtime_path: env_path("CATALYST_REALTIME_PATH", DEFAULT_REALTIME_PATH),
            timeout_secs: env_parse("CATALYST_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS),
            state_dir: std::env::var_os("CATALYST_STATE_DIR")
                .filter(|dir| !dir.is_empty())
                .map(PathBuf::from),
            realtime_enabled: env_bool("CATALYST_REALTIME").unwrap_or(DEFAULT_REALTIME_ENABLED),
        }
    }

    /// Config pointing at `base_url` with every other field defaulted.
    #[must_use]
    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_owned(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    #[must_use]
    pub fn api_url(&self, path: &str) -> String {
        format!("{}{}{}", self.base_url, self.api_path, path)
    }

    #[must_use]
    pub fn auth_url(&self, path: &str) -> String {
        format!("{}{}{}", self.base_url, self.auth_path, path)
    }

    /// Websocket URL for the realtime channel, mapping `http`→`ws` and
    /// `https`→`wss`. `None` for any other scheme.
    #[must_use]
    pub fn realtime_url(&self) -> Option<String> {
        if let Some(rest) = self.base_url.strip_prefix("http://") {
            return Some(format!("ws://{rest}{}", self.realtime_path));
        }
        if let Some(rest) = self.base_url.strip_prefix("https://") {
            return Some(format!("wss://{rest}{}", self.realtime_path));
        }
        None
    }
}

pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

pub(crate) fn env_bool(key: &str) -> Option<bool> {
    std::env::var(key)
        .ok()
        .and_then(|raw| match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" => Some(false),
            _ => None,
        })
}

fn env_string(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_owned())
}

/// Path prefixes always start with `/` and never end with one. A bare `/`
/// collapses to the empty prefix.
fn env_path(key: &str, default: &str) -> String {
    let raw = env_string(key, default);
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() || trimmed.starts_with('/') {
        trimmed.to_owned()
    } else {
        format!("/{trimmed}")
    }
}
