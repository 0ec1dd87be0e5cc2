//! Networking: REST bindings and the realtime invalidation channel.
//!
//! SYSTEM CONTEXT
//! ==============
//! `api` handles REST calls, `realtime` manages the websocket lifecycle,
//! `resource` maps record types to collections and `types` defines the wire
//! schema.

pub mod api;
pub mod realtime;
pub mod resource;
pub mod types;
