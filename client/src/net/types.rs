//! Wire types for the REST API.
//!
//! DESIGN
//! ======
//! Records mirror the server's JSON one-to-one so a fetched record can be
//! patched and sent back without loss. Each resource has three shapes: the
//! record itself, a `New*` body for creation and a `*Patch` body whose fields
//! are all optional and omitted when unset.
//!
//! Timestamps are `time::OffsetDateTime`. The server writes them either as
//! RFC 3339 or as `2024-01-01 10:00:00.000Z`; both parse.

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;

/// Serde adapter for server timestamps.
pub mod timestamp {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};
    use time::OffsetDateTime;
    use time::format_description::well_known::Rfc3339;

    /// Parse either RFC 3339 or the space-separated form.
    ///
    /// # Errors
    ///
    /// Returns the parse error when `raw` is neither form.
    pub fn parse(raw: &str) -> Result<OffsetDateTime, time::error::Parse> {
        let normalised = raw.trim().replacen(' ', "T", 1);
        OffsetDateTime::parse(&normalised, &Rfc3339)
    }

    /// # Errors
    ///
    /// Returns an error when the value has no RFC 3339 rendering.
    pub fn serialize<S: Serializer>(value: &OffsetDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        let text = value.format(&Rfc3339).map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&text)
    }

    /// # Errors
    ///
    /// Returns an error when the string is not a recognised timestamp.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<OffsetDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).map_err(D::Error::custom)
    }
}

// =============================================================================
// TICKETS
// =============================================================================

/// A ticket. List responses add the resolved owner and type names.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: String,
    /// Ticket type id (`incident`, `alert`, ...).
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub open: bool,
    #[serde(default)]
    pub resolution: String,
    /// Type-specific fields, shaped by the type's JSON Schema.
    #[serde(default)]
    pub state: Value,
    #[serde(default)]
    pub owner: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_singular: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_plural: Option<String>,
    #[serde(with = "timestamp")]
    pub created: OffsetDateTime,
    #[serde(with = "timestamp")]
    pub updated: OffsetDateTime,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NewTicket {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    pub description: String,
    pub open: bool,
    pub owner: String,
    pub resolution: String,
    pub state: Value,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TicketPatch {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<Value>,
}

/// Row returned by the ticket search endpoint.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TicketSearch {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub open: bool,
    #[serde(default)]
    pub owner_name: String,
    #[serde(default)]
    pub state: Value,
    #[serde(with = "timestamp")]
    pub created: OffsetDateTime,
}

// =============================================================================
// TICKET CHILDREN
// =============================================================================

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub ticket: String,
    pub author: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_name: Option<String>,
    #[serde(with = "timestamp")]
    pub created: OffsetDateTime,
    #[serde(with = "timestamp")]
    pub updated: OffsetDateTime,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NewComment {
    pub ticket: String,
    pub author: String,
    pub message: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CommentPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub ticket: String,
    pub name: String,
    pub open: bool,
    #[serde(default)]
    pub owner: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticket_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticket_type: Option<String>,
    #[serde(with = "timestamp")]
    pub created: OffsetDateTime,
    #[serde(with = "timestamp")]
    pub updated: OffsetDateTime,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NewTask {
    pub ticket: String,
    pub name: String,
    pub open: bool,
    pub owner: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimelineItem {
    pub id: String,
    pub ticket: String,
    pub message: String,
    #[serde(with = "timestamp")]
    pub time: OffsetDateTime,
    #[serde(with = "timestamp")]
    pub created: OffsetDateTime,
    #[serde(with = "timestamp")]
    pub updated: OffsetDateTime,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewTimelineItem {
    pub ticket: String,
    pub message: String,
    #[serde(with = "timestamp")]
    pub time: OffsetDateTime,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TimelinePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_opt_timestamp",
        deserialize_with = "deserialize_opt_timestamp"
    )]
    pub time: Option<OffsetDateTime>,
}

#[allow(clippy::ref_option)]
fn serialize_opt_timestamp<S: serde::Serializer>(
    value: &Option<OffsetDateTime>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match value {
        Some(value) => timestamp::serialize(value, serializer),
        None => serializer.serialize_none(),
    }
}

fn deserialize_opt_timestamp<'de, D: serde::Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<OffsetDateTime>, D::Error> {
    use serde::de::Error as _;
    Option::<String>::deserialize(deserializer)?
        .map(|raw| timestamp::parse(&raw).map_err(D::Error::custom))
        .transpose()
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub id: String,
    pub ticket: String,
    pub name: String,
    pub url: String,
    #[serde(with = "timestamp")]
    pub created: OffsetDateTime,
    #[serde(with = "timestamp")]
    pub updated: OffsetDateTime,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NewLink {
    pub ticket: String,
    pub name: String,
    pub url: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LinkPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// An uploaded attachment. `blob` is the stored object name.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct File {
    pub id: String,
    pub ticket: String,
    pub name: String,
    pub blob: String,
    pub size: f64,
    #[serde(with = "timestamp")]
    pub created: OffsetDateTime,
    #[serde(with = "timestamp")]
    pub updated: OffsetDateTime,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NewFile {
    pub ticket: String,
    pub name: String,
    pub blob: String,
    pub size: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FilePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

// =============================================================================
// TYPES, USERS, GROUPS
// =============================================================================

/// A ticket type. `schema` is the JSON Schema for ticket `state`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TicketType {
    pub id: String,
    pub singular: String,
    pub plural: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub schema: Value,
    #[serde(with = "timestamp")]
    pub created: OffsetDateTime,
    #[serde(with = "timestamp")]
    pub updated: OffsetDateTime,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NewTicketType {
    pub singular: String,
    pub plural: String,
    pub icon: String,
    pub schema: Value,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TicketTypePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub singular: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plural: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<Value>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    pub username: String,
    #[serde(default)]
    pub avatar: String,
    #[serde(default)]
    pub verified: bool,
    #[serde(with = "timestamp")]
    pub created: OffsetDateTime,
    #[serde(with = "timestamp")]
    pub updated: OffsetDateTime,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub username: String,
    pub avatar: String,
    pub verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password_confirm: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct UserPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verified: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password_confirm: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub permissions: Vec<String>,
    #[serde(with = "timestamp")]
    pub created: OffsetDateTime,
    #[serde(with = "timestamp")]
    pub updated: OffsetDateTime,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NewGroup {
    pub name: String,
    pub permissions: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Vec<String>>,
}

/// One side of a user/group or group/group relation. `kind` is `direct`
/// or `indirect` (inherited through a parent group).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: String,
}

// =============================================================================
// REACTIONS
// =============================================================================

/// What fires a reaction. Serialized as `trigger` + `triggerdata`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "trigger", content = "triggerdata", rename_all = "lowercase")]
pub enum Trigger {
    /// Cron-style schedule.
    Schedule { expression: String },
    /// Inbound HTTP call on `/reaction/<path>`, guarded by `token`.
    Webhook {
        #[serde(default)]
        token: String,
        path: String,
    },
    /// Record lifecycle hook on the named collections.
    Hook {
        collections: Vec<String>,
        events: Vec<String>,
    },
}

impl Trigger {
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Schedule { .. } => "schedule",
            Self::Webhook { .. } => "webhook",
            Self::Hook { .. } => "hook",
        }
    }
}

/// What a reaction does. Serialized as `action` + `actiondata`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", content = "actiondata", rename_all = "lowercase")]
pub enum Action {
    Python {
        #[serde(default)]
        requirements: String,
        script: String,
    },
    Webhook {
        #[serde(default)]
        headers: BTreeMap<String, String>,
        url: String,
    },
}

impl Action {
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Python { .. } => "python",
            Self::Webhook { .. } => "webhook",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Reaction {
    pub id: String,
    pub name: String,
    #[serde(flatten)]
    pub trigger: Trigger,
    #[serde(flatten)]
    pub action: Action,
    #[serde(with = "timestamp")]
    pub created: OffsetDateTime,
    #[serde(with = "timestamp")]
    pub updated: OffsetDateTime,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewReaction {
    pub name: String,
    #[serde(flatten)]
    pub trigger: Trigger,
    #[serde(flatten)]
    pub action: Action,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ReactionPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(flatten)]
    pub trigger: Option<Trigger>,
    #[serde(flatten)]
    pub action: Option<Action>,
}

// =============================================================================
// WEBHOOKS, TEMPLATES, JOBS
// =============================================================================

/// Outbound webhook fired on record changes in `collection`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Webhook {
    pub id: String,
    pub name: String,
    pub collection: String,
    pub destination: String,
    #[serde(with = "timestamp")]
    pub created: OffsetDateTime,
    #[serde(with = "timestamp")]
    pub updated: OffsetDateTime,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NewWebhook {
    pub name: String,
    pub collection: String,
    pub destination: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WebhookPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
}

/// Legacy ticket template; `schema` is a JSON Schema document as text.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    pub id: String,
    pub name: String,
    pub schema: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTemplate {
    pub name: String,
    pub schema: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplatePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
}

/// A run of an automation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub automation: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct JobForm {
    pub automation: String,
    #[serde(skip_serializing_if = "Value::is_null")]
    pub payload: Value,
}

// =============================================================================
// SETTINGS & APP CONFIG
// =============================================================================

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub meta: SettingsMeta,
    #[serde(default)]
    pub smtp: SettingsSmtp,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsMeta {
    #[serde(default)]
    pub app_name: String,
    #[serde(default)]
    pub app_url: String,
    #[serde(default)]
    pub sender_name: String,
    #[serde(default)]
    pub sender_address: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsSmtp {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub port: u16,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub auth_method: String,
    #[serde(rename = "tls", default)]
    pub tls_enabled: bool,
    #[serde(default)]
    pub local_name: String,
}

/// Unauthenticated bootstrap data from `GET /api/config`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub flags: Vec<String>,
    #[serde(default)]
    pub permissions: Vec<String>,
    #[serde(default)]
    pub tables: Vec<Table>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub id: String,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SidebarEntry {
    pub id: String,
    pub singular: String,
    pub plural: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub count: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardCount {
    pub id: String,
    pub count: u64,
}

// =============================================================================
// AUTH
// =============================================================================

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
}

/// Body of `GET /auth/user` when a session is valid.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub user: User,
    #[serde(default)]
    pub permissions: Vec<String>,
}
