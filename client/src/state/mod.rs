//! Client-side stores. Each is a plain struct owned by the caller; only the
//! socket status is shared with a background task.

pub mod app_config;
pub mod auth;
pub mod socket;
pub mod ui;
