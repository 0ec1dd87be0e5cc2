//! Typed bindings for the REST API.
//!
//! DESIGN
//! ======
//! `ApiClient` wraps one `reqwest::Client` plus the bearer token and the demo
//! flag. Record collections go through the generic `list/get/create/update/
//! delete` calls keyed by [`Resource`]; everything else has a named method.
//!
//! ERROR HANDLING
//! ==============
//! The response status decides success. A non-2xx response is read as text
//! and reduced to the best message it carries (see
//! [`crate::error::problem_message`]). There is no retry: a failed call is
//! reported once and the caller decides what to show.

#[cfg(test)]
#[path = "api_test.rs"]
mod api_test;

use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use reqwest::header::HeaderMap;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use super::resource::{Resource, Updatable};
use super::types::*;
use crate::config::ClientConfig;
use crate::error::{ApiError, problem_message};

/// App-config flag that switches the client into read-only demo mode.
pub const DEMO_FLAG: &str = "demo";

const TOTAL_COUNT_HEADER: &str = "x-total-count";
const REQUEST_ID_HEADER: &str = "x-request-id";

/// Characters escaped in an id placed in a URL path segment. `/` and `\`
/// would split the segment, `%` would be read as an escape.
const SEGMENT_ENCODE_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'\\')
    .add(b'`')
    .add(b'{')
    .add(b'}');

// =============================================================================
// QUERY TYPES
// =============================================================================

/// Paging and parent filter for collection listings.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ListFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    /// Restrict child collections (comments, tasks, ...) to one ticket.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticket: Option<String>,
}

impl ListFilter {
    #[must_use]
    pub fn for_ticket(ticket: &str) -> Self {
        Self {
            ticket: Some(ticket.to_owned()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn page(offset: u64, limit: u64) -> Self {
        Self {
            offset: Some(offset),
            limit: Some(limit),
            ticket: None,
        }
    }
}

/// Ticket search parameters. `query` is CAQL and is validated locally.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SearchFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
}

/// One page of a listing plus the server-side total.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// From `X-Total-Count`; the page length when the header is absent.
    pub total: u64,
}

#[derive(Serialize)]
struct GroupRef<'a> {
    group_id: &'a str,
}

#[derive(Serialize)]
struct EmailBody<'a> {
    email: &'a str,
}

// =============================================================================
// CLIENT
// =============================================================================

#[derive(Clone, Debug)]
pub struct ApiClient {
    http: reqwest::Client,
    config: ClientConfig,
    token: Option<String>,
    demo: bool,
}

impl ApiClient {
    /// # Errors
    ///
    /// Returns `ApiError::Http` if the HTTP client cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        if !config.base_url.starts_with("http://") && !config.base_url.starts_with("https://") {
            return Err(ApiError::Config(format!(
                "base URL must start with http:// or https://: {}",
                config.base_url
            )));
        }
        let http = reqwest::Client::builder().timeout(config.timeout()).build()?;
        Ok(Self {
            http,
            config,
            token: None,
            demo: false,
        })
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token.filter(|t| !t.is_empty());
    }

    #[must_use]
    pub fn is_demo(&self) -> bool {
        self.demo
    }

    pub fn set_demo(&mut self, demo: bool) {
        self.demo = demo;
    }

    /// Adopt the flags of a fetched app config.
    pub fn apply_app_config(&mut self, config: &AppConfig) {
        self.demo = config.flags.iter().any(|flag| flag == DEMO_FLAG);
    }

    // =========================================================================
    // RECORD COLLECTIONS
    // =========================================================================

    /// `GET /api/<res>` with paging and parent filters.
    ///
    /// # Errors
    ///
    /// Transport, status and decode failures.
    pub async fn list<R: Resource>(&self, filter: &ListFilter) -> Result<Page<R>, ApiError> {
        let url = self.config.api_url(&format!("/{}", R::PATH));
        let response = self.send(self.request(Method::GET, &url).query(filter)).await?;
        page(response).await
    }

    /// # Errors
    ///
    /// Transport, status and decode failures; 404 for unknown ids.
    pub async fn get<R: Resource>(&self, id: &str) -> Result<R, ApiError> {
        let url = self.record_url(R::PATH, id)?;
        let response = self.send(self.request(Method::GET, &url)).await?;
        decode(response).await
    }

    /// # Errors
    ///
    /// `ApiError::DemoMode` for locked collections, otherwise as [`Self::get`].
    pub async fn create<R: Resource>(&self, new: &R::New) -> Result<R, ApiError> {
        if R::DEMO_LOCKED {
            self.ensure_writable(R::PATH)?;
        }
        let url = self.config.api_url(&format!("/{}", R::PATH));
        let response = self.send(self.request(Method::POST, &url).json(new)).await?;
        decode(response).await
    }

    /// # Errors
    ///
    /// `ApiError::DemoMode` for locked collections, otherwise as [`Self::get`].
    pub async fn update<R: Updatable>(&self, id: &str, patch: &R::Patch) -> Result<R, ApiError> {
        if R::DEMO_LOCKED {
            self.ensure_writable(R::PATH)?;
        }
        let url = self.record_url(R::PATH, id)?;
        let response = self.send(self.request(Method::PATCH, &url).json(patch)).await?;
        decode(response).await
    }

    /// `DELETE /api/<res>/{id}`; the server answers 204 with no body.
    ///
    /// # Errors
    ///
    /// `ApiError::DemoMode` for locked collections, transport and status
    /// failures.
    pub async fn delete<R: Resource>(&self, id: &str) -> Result<(), ApiError> {
        if R::DEMO_LOCKED {
            self.ensure_writable(R::PATH)?;
        }
        let url = self.record_url(R::PATH, id)?;
        self.send(self.request(Method::DELETE, &url)).await?;
        Ok(())
    }

    // =========================================================================
    // TICKET SEARCH & OVERVIEW
    // =========================================================================

    /// Search tickets. A non-empty query must parse as CAQL first; syntax
    /// errors never reach the network.
    ///
    /// # Errors
    ///
    /// `ApiError::InvalidQuery` for bad CAQL, otherwise as [`Self::list`].
    pub async fn search_tickets(&self, filter: &SearchFilter) -> Result<Page<TicketSearch>, ApiError> {
        let mut filter = filter.clone();
        filter.query = filter.query.filter(|q| !q.trim().is_empty());
        if let Some(query) = &filter.query {
            if let Some(err) = caql::validate(query) {
                debug!(%query, error = %err, "rejecting ticket search with invalid query");
                return Err(ApiError::InvalidQuery(err));
            }
        }
        let url = self.config.api_url("/search/tickets");
        let response = self.send(self.request(Method::GET, &url).query(&filter)).await?;
        page(response).await
    }

    /// # Errors
    ///
    /// Transport, status and decode failures.
    pub async fn sidebar(&self) -> Result<Vec<SidebarEntry>, ApiError> {
        self.get_json(&self.config.api_url("/sidebar")).await
    }

    /// # Errors
    ///
    /// Transport, status and decode failures.
    pub async fn dashboard_counts(&self) -> Result<Vec<DashboardCount>, ApiError> {
        self.get_json(&self.config.api_url("/dashboard_counts")).await
    }

    /// `GET /api/config`; needs no session.
    ///
    /// # Errors
    ///
    /// Transport, status and decode failures.
    pub async fn app_config(&self) -> Result<AppConfig, ApiError> {
        let url = self.config.api_url("/config");
        let response = self.send(self.http.get(&url)).await?;
        decode(response).await
    }

    // =========================================================================
    // SETTINGS
    // =========================================================================

    /// # Errors
    ///
    /// Transport, status and decode failures.
    pub async fn settings(&self) -> Result<Settings, ApiError> {
        self.get_json(&self.config.api_url("/settings")).await
    }

    /// Replace the settings document.
    ///
    /// # Errors
    ///
    /// `ApiError::DemoMode` in demo mode, otherwise as [`Self::settings`].
    pub async fn update_settings(&self, settings: &Settings) -> Result<Settings, ApiError> {
        self.ensure_writable("settings")?;
        let url = self.config.api_url("/settings");
        let response = self.send(self.request(Method::PATCH, &url).json(settings)).await?;
        decode(response).await
    }

    // =========================================================================
    // USER / GROUP RELATIONS
    // =========================================================================

    /// # Errors
    ///
    /// Transport, status and decode failures.
    pub async fn user_groups(&self, user_id: &str) -> Result<Vec<Membership>, ApiError> {
        self.get_json(&self.relation_url("users", user_id, "groups")?).await
    }

    /// Effective permissions of a user, including inherited ones.
    ///
    /// # Errors
    ///
    /// Transport, status and decode failures.
    pub async fn user_permissions(&self, user_id: &str) -> Result<Vec<String>, ApiError> {
        self.get_json(&self.relation_url("users", user_id, "permissions")?).await
    }

    /// # Errors
    ///
    /// Transport, status and decode failures.
    pub async fn group_users(&self, group_id: &str) -> Result<Vec<Membership>, ApiError> {
        self.get_json(&self.relation_url("groups", group_id, "users")?).await
    }

    /// # Errors
    ///
    /// Transport, status and decode failures.
    pub async fn group_parents(&self, group_id: &str) -> Result<Vec<Membership>, ApiError> {
        self.get_json(&self.relation_url("groups", group_id, "parents")?).await
    }

    /// # Errors
    ///
    /// Transport, status and decode failures.
    pub async fn group_children(&self, group_id: &str) -> Result<Vec<Membership>, ApiError> {
        self.get_json(&self.relation_url("groups", group_id, "children")?).await
    }

    /// Permissions a group inherits from its parents.
    ///
    /// # Errors
    ///
    /// Transport, status and decode failures.
    pub async fn group_permissions(&self, group_id: &str) -> Result<Vec<String>, ApiError> {
        self.get_json(&self.relation_url("groups", group_id, "permissions")?).await
    }

    /// # Errors
    ///
    /// `ApiError::DemoMode` in demo mode, transport and status failures.
    pub async fn add_user_to_group(&self, user_id: &str, group_id: &str) -> Result<(), ApiError> {
        self.ensure_writable("users")?;
        let url = self.relation_url("users", user_id, "groups")?;
        self.send(self.request(Method::POST, &url).json(&GroupRef { group_id }))
            .await?;
        Ok(())
    }

    /// # Errors
    ///
    /// `ApiError::DemoMode` in demo mode, transport and status failures.
    pub async fn remove_user_from_group(&self, user_id: &str, group_id: &str) -> Result<(), ApiError> {
        self.ensure_writable("users")?;
        let url = format!(
            "{}/{}",
            self.relation_url("users", user_id, "groups")?,
            path_segment(group_id)?
        );
        self.send(self.request(Method::DELETE, &url)).await?;
        Ok(())
    }

    /// Make `parent_id` a parent of `group_id`.
    ///
    /// # Errors
    ///
    /// `ApiError::DemoMode` in demo mode, transport and status failures.
    pub async fn add_group_parent(&self, group_id: &str, parent_id: &str) -> Result<(), ApiError> {
        self.ensure_writable("groups")?;
        let url = self.relation_url("groups", group_id, "parents")?;
        self.send(
            self.request(Method::POST, &url)
                .json(&GroupRef { group_id: parent_id }),
        )
        .await?;
        Ok(())
    }

    /// # Errors
    ///
    /// `ApiError::DemoMode` in demo mode, transport and status failures.
    pub async fn remove_group_parent(&self, group_id: &str, parent_id: &str) -> Result<(), ApiError> {
        self.ensure_writable("groups")?;
        let url = format!(
            "{}/{}",
            self.relation_url("groups", group_id, "parents")?,
            path_segment(parent_id)?
        );
        self.send(self.request(Method::DELETE, &url)).await?;
        Ok(())
    }

    // =========================================================================
    // AUTH
    // =========================================================================

    /// `POST /auth/local/login`; returns the session token.
    ///
    /// # Errors
    ///
    /// `ApiError::Unauthorized` for rejected credentials, otherwise
    /// transport, status and decode failures.
    pub async fn login(&self, email: &str, password: &str) -> Result<String, ApiError> {
        let url = self.config.auth_url("/local/login");
        let body = LoginRequest {
            email: email.to_owned(),
            password: password.to_owned(),
        };
        let response = self.send(self.http.post(&url).json(&body)).await?;
        let login: LoginResponse = decode(response).await?;
        Ok(login.token)
    }

    /// `GET /auth/user`. `None` when the server reports no session.
    ///
    /// # Errors
    ///
    /// Transport, status and decode failures.
    pub async fn current_user(&self) -> Result<Option<Session>, ApiError> {
        self.get_json(&self.config.auth_url("/user")).await
    }

    /// # Errors
    ///
    /// Transport and status failures.
    pub async fn request_password_reset(&self, email: &str) -> Result<(), ApiError> {
        let url = self.config.auth_url("/local/reset-password-mail");
        self.send(self.http.post(&url).json(&EmailBody { email })).await?;
        Ok(())
    }

    // =========================================================================
    // JOBS
    // =========================================================================

    /// Start an automation run.
    ///
    /// # Errors
    ///
    /// Transport, status and decode failures.
    pub async fn run_job(&self, automation: &str, payload: Value) -> Result<Job, ApiError> {
        let form = JobForm {
            automation: automation.to_owned(),
            payload,
        };
        self.create::<Job>(&form).await
    }

    // =========================================================================
    // PLUMBING
    // =========================================================================

    fn ensure_writable(&self, collection: &str) -> Result<(), ApiError> {
        if self.demo {
            debug!(collection, "mutation blocked in demo mode");
            return Err(ApiError::DemoMode);
        }
        Ok(())
    }

    fn record_url(&self, collection: &str, id: &str) -> Result<String, ApiError> {
        let id = path_segment(id)?;
        Ok(self.config.api_url(&format!("/{collection}/{id}")))
    }

    fn relation_url(&self, collection: &str, id: &str, relation: &str) -> Result<String, ApiError> {
        let id = path_segment(id)?;
        Ok(self.config.api_url(&format!("/{collection}/{id}/{relation}")))
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let request = self.http.request(method, url);
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, ApiError> {
        let response = self.send(self.request(Method::GET, url)).await?;
        decode(response).await
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let request_id = Uuid::new_v4().to_string();
        let request = request.header(REQUEST_ID_HEADER, &request_id).build()?;
        let method = request.method().clone();
        let url = request.url().clone();
        debug!(%method, %url, %request_id, "api request");

        let response = self.http.execute(request).await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let mut message = problem_message(&body);
        if message.is_empty() {
            message = status.canonical_reason().unwrap_or("request failed").to_owned();
        }
        warn!(%method, %url, %request_id, status = status.as_u16(), %message, "api request failed");

        if status == StatusCode::UNAUTHORIZED {
            return Err(ApiError::Unauthorized(message));
        }
        Err(ApiError::Status {
            status: status.as_u16(),
            message,
        })
    }
}

/// Escape a record id for use as one path segment. Empty and dot-only ids
/// are rejected: URL parsing resolves `.` and `..` (escaped or not) against
/// the path, which would address a different resource.
fn path_segment(id: &str) -> Result<String, ApiError> {
    if id.is_empty() || id == "." || id == ".." {
        return Err(ApiError::InvalidId(id.to_owned()));
    }
    Ok(utf8_percent_encode(id, SEGMENT_ENCODE_SET).to_string())
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let body = response.bytes().await?;
    Ok(serde_json::from_slice(&body)?)
}

async fn page<T: DeserializeOwned>(response: Response) -> Result<Page<T>, ApiError> {
    let total = total_count(response.headers());
    let items: Vec<T> = decode(response).await?;
    let total = total.unwrap_or_else(|| u64::try_from(items.len()).unwrap_or(u64::MAX));
    Ok(Page { items, total })
}

fn total_count(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(TOTAL_COUNT_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse().ok())
}
