//! Catalyst client: API bindings, session stores and the realtime channel.
//!
//! SYSTEM CONTEXT
//! ==============
//! Everything a front end needs to talk to a Catalyst server. `net` carries
//! REST and websocket traffic, `state` holds the small amount of session
//! state, `router` decides which views a session may open, and `storage`
//! persists the token and UI preferences between runs.
//!
//! ERROR HANDLING
//! ==============
//! Fallible calls return typed errors from [`error`]. Views turn API failures
//! into a destructive [`toast::Toast`] rather than inspecting them further.

pub mod config;
pub mod error;
pub mod format;
pub mod net;
pub mod router;
pub mod schema;
pub mod state;
pub mod storage;
pub mod toast;

pub use config::ClientConfig;
pub use error::{ApiError, RealtimeError, StorageError};
pub use net::api::{ApiClient, ListFilter, Page, SearchFilter};
pub use net::realtime::{Invalidation, RealtimeHandle, spawn_realtime};
pub use toast::Toast;
