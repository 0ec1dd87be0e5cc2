//! In-process Catalyst server for integration tests.
//!
//! Records live in memory as raw JSON. Every mutation is echoed on the
//! websocket as an `update` message so realtime tests can observe it.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::Json;
use axum::Router;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use serde_json::{Map, Value, json};
use tokio::sync::broadcast;

use client::ClientConfig;

pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const ANALYST_EMAIL: &str = "analyst@example.com";
pub const PASSWORD: &str = "password";
const STAMP: &str = "2024-01-01 10:00:00.000Z";

#[derive(Default)]
struct Inner {
    records: HashMap<String, Vec<Value>>,
    sessions: HashMap<String, String>,
    memberships: HashSet<(String, String)>,
    parents: HashSet<(String, String)>,
    settings: Value,
    flags: Vec<String>,
    next_id: u64,
    ws_auth: Vec<Option<String>>,
}

#[derive(Clone)]
pub struct MockServer {
    inner: Arc<Mutex<Inner>>,
    updates: broadcast::Sender<String>,
    pub addr: SocketAddr,
}

impl MockServer {
    pub async fn start() -> Self {
        Self::start_with_flags(&[]).await
    }

    pub async fn start_with_flags(flags: &[&str]) -> Self {
        let mut inner = Inner {
            flags: flags.iter().map(|f| (*f).to_owned()).collect(),
            settings: json!({
                "meta": {"appName": "Catalyst", "appUrl": "http://localhost", "senderName": "Catalyst", "senderAddress": "noreply@example.com"},
                "smtp": {"enabled": false, "host": "", "port": 587, "username": "", "password": "", "authMethod": "PLAIN", "tls": false, "localName": ""}
            }),
            ..Inner::default()
        };
        seed_user(&mut inner, "u-admin", "admin", ADMIN_EMAIL);
        seed_user(&mut inner, "u-analyst", "analyst", ANALYST_EMAIL);
        inner.records.entry("groups".to_owned()).or_default().extend([
            json!({"id": "g-admin", "name": "Admin", "permissions": ["admin"], "created": STAMP, "updated": STAMP}),
            json!({"id": "g-analyst", "name": "Analyst", "permissions": ["ticket:read", "ticket:write"], "created": STAMP, "updated": STAMP}),
        ]);
        inner.memberships.insert(("u-admin".to_owned(), "g-admin".to_owned()));
        inner.memberships.insert(("u-analyst".to_owned(), "g-analyst".to_owned()));

        let (updates, _) = broadcast::channel(64);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = Self {
            inner: Arc::new(Mutex::new(inner)),
            updates,
            addr,
        };
        let app = router(server.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        server
    }

    pub fn config(&self) -> ClientConfig {
        ClientConfig::with_base_url(&format!("http://{}", self.addr))
    }

    pub fn revoke_all_sessions(&self) {
        self.lock().sessions.clear();
    }

    pub fn record_count(&self, collection: &str) -> usize {
        self.lock().records.get(collection).map_or(0, Vec::len)
    }

    pub fn ws_auth_headers(&self) -> Vec<Option<String>> {
        self.lock().ws_auth.clone()
    }

    /// Push an update message to every connected socket.
    pub fn push(&self, ids: &[&str]) {
        let _ = self.updates.send(json!({"action": "update", "ids": ids}).to_string());
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn seed_user(inner: &mut Inner, id: &str, username: &str, email: &str) {
    inner.records.entry("users".to_owned()).or_default().push(json!({
        "id": id, "name": username, "username": username, "email": email,
        "avatar": "", "verified": true, "created": STAMP, "updated": STAMP
    }));
}

fn router(server: MockServer) -> Router {
    Router::new()
        .route("/auth/local/login", post(login))
        .route("/auth/user", get(current_user))
        .route("/auth/local/reset-password-mail", post(|| async { StatusCode::OK }))
        .route("/api/config", get(app_config))
        .route("/api/sidebar", get(sidebar))
        .route("/api/settings", get(get_settings).patch(update_settings))
        .route("/api/search/tickets", get(search_tickets))
        .route("/api/{collection}", get(list_records).post(create_record))
        .route(
            "/api/{collection}/{id}",
            get(get_record).patch(update_record).delete(delete_record),
        )
        .route("/api/{collection}/{id}/{relation}", get(get_relation).post(add_relation))
        .route("/api/{collection}/{id}/{relation}/{other}", delete(remove_relation))
        .route("/wss", get(handle_ws))
        .with_state(server)
}

// =============================================================================
// AUTH
// =============================================================================

fn problem(status: StatusCode, title: &str, detail: &str) -> Response {
    (status, Json(json!({"title": title, "detail": detail}))).into_response()
}

fn bearer(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::to_owned)
}

fn session_user(server: &MockServer, headers: &HeaderMap) -> Option<String> {
    let token = bearer(headers)?;
    server.lock().sessions.get(&token).cloned()
}

fn permissions_of(inner: &Inner, user_id: &str) -> Vec<String> {
    let mut groups: Vec<String> = inner
        .memberships
        .iter()
        .filter(|(u, _)| u == user_id)
        .map(|(_, g)| g.clone())
        .collect();
    let mut seen = HashSet::new();
    let mut permissions = Vec::new();
    while let Some(group) = groups.pop() {
        if !seen.insert(group.clone()) {
            continue;
        }
        if let Some(record) = find(inner, "groups", &group) {
            for p in record["permissions"].as_array().into_iter().flatten() {
                if let Some(p) = p.as_str() {
                    if !permissions.iter().any(|x| x == p) {
                        permissions.push(p.to_owned());
                    }
                }
            }
        }
        groups.extend(
            inner
                .parents
                .iter()
                .filter(|(child, _)| *child == group)
                .map(|(_, parent)| parent.clone()),
        );
    }
    permissions
}

async fn login(State(server): State<MockServer>, Json(body): Json<Value>) -> Response {
    let email = body["email"].as_str().unwrap_or_default();
    let password = body["password"].as_str().unwrap_or_default();
    let mut inner = server.lock();
    let user_id = inner
        .records
        .get("users")
        .and_then(|users| users.iter().find(|u| u["email"] == email))
        .and_then(|u| u["id"].as_str())
        .map(str::to_owned);
    match user_id {
        Some(user_id) if password == PASSWORD => {
            inner.next_id += 1;
            let token = format!("tok-{}", inner.next_id);
            inner.sessions.insert(token.clone(), user_id);
            Json(json!({"token": token})).into_response()
        }
        _ => (StatusCode::UNAUTHORIZED, Json(json!({"error": "invalid credentials"}))).into_response(),
    }
}

async fn current_user(State(server): State<MockServer>, headers: HeaderMap) -> Response {
    let Some(user_id) = session_user(&server, &headers) else {
        return Json(Value::Null).into_response();
    };
    let inner = server.lock();
    let user = find(&inner, "users", &user_id).cloned().unwrap_or(Value::Null);
    Json(json!({"user": user, "permissions": permissions_of(&inner, &user_id)})).into_response()
}

async fn app_config(State(server): State<MockServer>) -> Response {
    let inner = server.lock();
    Json(json!({
        "flags": inner.flags,
        "permissions": ["admin", "ticket:read", "ticket:write", "user:read", "group:read"],
        "tables": [{"id": "tickets", "name": "Tickets"}]
    }))
    .into_response()
}

async fn sidebar(State(server): State<MockServer>, headers: HeaderMap) -> Response {
    if session_user(&server, &headers).is_none() {
        return problem(StatusCode::UNAUTHORIZED, "Unauthorized", "missing session");
    }
    let count = server.record_count("tickets");
    Json(json!([{"id": "incident", "singular": "Incident", "plural": "Incidents", "icon": "Flame", "count": count}]))
        .into_response()
}

async fn get_settings(State(server): State<MockServer>, headers: HeaderMap) -> Response {
    if session_user(&server, &headers).is_none() {
        return problem(StatusCode::UNAUTHORIZED, "Unauthorized", "missing session");
    }
    Json(server.lock().settings.clone()).into_response()
}

async fn update_settings(
    State(server): State<MockServer>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if session_user(&server, &headers).is_none() {
        return problem(StatusCode::UNAUTHORIZED, "Unauthorized", "missing session");
    }
    server.lock().settings = body.clone();
    server.push(&["settings/meta"]);
    Json(body).into_response()
}

// =============================================================================
// RECORDS
// =============================================================================

fn find<'a>(inner: &'a Inner, collection: &str, id: &str) -> Option<&'a Value> {
    inner.records.get(collection)?.iter().find(|r| r["id"] == id)
}

fn page_response(items: Vec<Value>, params: &HashMap<String, String>) -> Response {
    let total = items.len();
    let offset = params.get("offset").and_then(|v| v.parse().ok()).unwrap_or(0);
    let limit = params.get("limit").and_then(|v| v.parse().ok()).unwrap_or(usize::MAX);
    let page: Vec<Value> = items.into_iter().skip(offset).take(limit).collect();
    ([("X-Total-Count", total.to_string())], Json(page)).into_response()
}

async fn list_records(
    State(server): State<MockServer>,
    Path(collection): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    if session_user(&server, &headers).is_none() {
        return problem(StatusCode::UNAUTHORIZED, "Unauthorized", "missing session");
    }
    let inner = server.lock();
    let items: Vec<Value> = inner
        .records
        .get(&collection)
        .into_iter()
        .flatten()
        .filter(|r| params.get("ticket").is_none_or(|t| r["ticket"] == t.as_str()))
        .cloned()
        .collect();
    page_response(items, &params)
}

async fn search_tickets(
    State(server): State<MockServer>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    if session_user(&server, &headers).is_none() {
        return problem(StatusCode::UNAUTHORIZED, "Unauthorized", "missing session");
    }
    let inner = server.lock();
    let items: Vec<Value> = inner
        .records
        .get("tickets")
        .into_iter()
        .flatten()
        .filter(|r| params.get("type").is_none_or(|t| r["type"] == t.as_str()))
        .filter(|r| {
            params
                .get("open")
                .is_none_or(|o| r["open"].as_bool() == Some(o == "true"))
        })
        .cloned()
        .collect();
    page_response(items, &params)
}

async fn get_record(
    State(server): State<MockServer>,
    Path((collection, id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    if session_user(&server, &headers).is_none() {
        return problem(StatusCode::UNAUTHORIZED, "Unauthorized", "missing session");
    }
    match find(&server.lock(), &collection, &id) {
        Some(record) => Json(record.clone()).into_response(),
        None => problem(StatusCode::NOT_FOUND, "Not Found", &format!("{collection}/{id} not found")),
    }
}

async fn create_record(
    State(server): State<MockServer>,
    Path(collection): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if session_user(&server, &headers).is_none() {
        return problem(StatusCode::UNAUTHORIZED, "Unauthorized", "missing session");
    }
    let Value::Object(mut fields) = body else {
        return problem(StatusCode::BAD_REQUEST, "Bad Request", "body must be an object");
    };
    if collection == "jobs" {
        fields.insert("status".to_owned(), json!("running"));
    }
    fields.remove("password");
    fields.remove("password_confirm");
    let id = {
        let mut inner = server.lock();
        inner.next_id += 1;
        let id = format!("{}-{}", &collection[..1], inner.next_id);
        fields.insert("id".to_owned(), json!(id));
        fields.insert("created".to_owned(), json!(STAMP));
        fields.insert("updated".to_owned(), json!(STAMP));
        inner
            .records
            .entry(collection.clone())
            .or_default()
            .push(Value::Object(fields.clone()));
        id
    };
    server.push(&[&format!("{collection}/{id}")]);
    Json(Value::Object(fields)).into_response()
}

async fn update_record(
    State(server): State<MockServer>,
    Path((collection, id)): Path<(String, String)>,
    headers: HeaderMap,
    Json(body): Json<Map<String, Value>>,
) -> Response {
    if session_user(&server, &headers).is_none() {
        return problem(StatusCode::UNAUTHORIZED, "Unauthorized", "missing session");
    }
    let updated = {
        let mut inner = server.lock();
        let record = inner
            .records
            .get_mut(&collection)
            .and_then(|records| records.iter_mut().find(|r| r["id"] == id.as_str()));
        let Some(Value::Object(record)) = record else {
            return problem(StatusCode::NOT_FOUND, "Not Found", &format!("{collection}/{id} not found"));
        };
        for (key, value) in body {
            if key != "password" && key != "password_confirm" {
                record.insert(key, value);
            }
        }
        Value::Object(record.clone())
    };
    server.push(&[&format!("{collection}/{id}")]);
    Json(updated).into_response()
}

async fn delete_record(
    State(server): State<MockServer>,
    Path((collection, id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    if session_user(&server, &headers).is_none() {
        return problem(StatusCode::UNAUTHORIZED, "Unauthorized", "missing session");
    }
    let removed = {
        let mut inner = server.lock();
        let records = inner.records.entry(collection.clone()).or_default();
        let before = records.len();
        records.retain(|r| r["id"] != id.as_str());
        before != records.len()
    };
    if !removed {
        return problem(StatusCode::NOT_FOUND, "Not Found", &format!("{collection}/{id} not found"));
    }
    server.push(&[&format!("{collection}/{id}")]);
    StatusCode::NO_CONTENT.into_response()
}

// =============================================================================
// RELATIONS
// =============================================================================

fn membership(inner: &Inner, collection: &str, id: &str) -> Value {
    match find(inner, collection, id) {
        Some(record) => {
            let name = record.get("name").cloned().unwrap_or(Value::Null);
            json!({"id": id, "name": name, "type": "direct"})
        }
        None => json!({"id": id, "name": "", "type": "direct"}),
    }
}

async fn get_relation(
    State(server): State<MockServer>,
    Path((collection, id, relation)): Path<(String, String, String)>,
    headers: HeaderMap,
) -> Response {
    if session_user(&server, &headers).is_none() {
        return problem(StatusCode::UNAUTHORIZED, "Unauthorized", "missing session");
    }
    let inner = server.lock();
    let body = match (collection.as_str(), relation.as_str()) {
        ("users", "groups") => inner
            .memberships
            .iter()
            .filter(|(u, _)| *u == id)
            .map(|(_, g)| membership(&inner, "groups", g))
            .collect(),
        ("users", "permissions") => json!(permissions_of(&inner, &id)),
        ("groups", "users") => inner
            .memberships
            .iter()
            .filter(|(_, g)| *g == id)
            .map(|(u, _)| membership(&inner, "users", u))
            .collect(),
        ("groups", "parents") => inner
            .parents
            .iter()
            .filter(|(c, _)| *c == id)
            .map(|(_, p)| membership(&inner, "groups", p))
            .collect(),
        ("groups", "children") => inner
            .parents
            .iter()
            .filter(|(_, p)| *p == id)
            .map(|(c, _)| membership(&inner, "groups", c))
            .collect(),
        ("groups", "permissions") => {
            let parents: Vec<String> = inner
                .parents
                .iter()
                .filter(|(c, _)| *c == id)
                .map(|(_, p)| p.clone())
                .collect();
            let mut permissions: Vec<Value> = Vec::new();
            for parent in parents {
                if let Some(record) = find(&inner, "groups", &parent) {
                    permissions.extend(record["permissions"].as_array().cloned().unwrap_or_default());
                }
            }
            Value::Array(permissions)
        }
        _ => return problem(StatusCode::NOT_FOUND, "Not Found", "unknown relation"),
    };
    Json(body).into_response()
}

async fn add_relation(
    State(server): State<MockServer>,
    Path((collection, id, relation)): Path<(String, String, String)>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if session_user(&server, &headers).is_none() {
        return problem(StatusCode::UNAUTHORIZED, "Unauthorized", "missing session");
    }
    let Some(group_id) = body["group_id"].as_str().map(str::to_owned) else {
        return problem(StatusCode::BAD_REQUEST, "Bad Request", "group_id required");
    };
    {
        let mut inner = server.lock();
        match (collection.as_str(), relation.as_str()) {
            ("users", "groups") => inner.memberships.insert((id.clone(), group_id)),
            ("groups", "parents") => inner.parents.insert((id.clone(), group_id)),
            _ => return problem(StatusCode::NOT_FOUND, "Not Found", "unknown relation"),
        };
    }
    server.push(&[&format!("{collection}/{id}")]);
    StatusCode::CREATED.into_response()
}

async fn remove_relation(
    State(server): State<MockServer>,
    Path((collection, id, relation, other)): Path<(String, String, String, String)>,
    headers: HeaderMap,
) -> Response {
    if session_user(&server, &headers).is_none() {
        return problem(StatusCode::UNAUTHORIZED, "Unauthorized", "missing session");
    }
    {
        let mut inner = server.lock();
        let pair = (id.clone(), other);
        match (collection.as_str(), relation.as_str()) {
            ("users", "groups") => inner.memberships.remove(&pair),
            ("groups", "parents") => inner.parents.remove(&pair),
            _ => return problem(StatusCode::NOT_FOUND, "Not Found", "unknown relation"),
        };
    }
    server.push(&[&format!("{collection}/{id}")]);
    StatusCode::NO_CONTENT.into_response()
}

// =============================================================================
// REALTIME
// =============================================================================

async fn handle_ws(State(server): State<MockServer>, headers: HeaderMap, ws: WebSocketUpgrade) -> Response {
    let auth = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);
    server.lock().ws_auth.push(auth);
    let updates = server.updates.subscribe();
    ws.on_upgrade(move |socket| run_ws(socket, updates))
}

async fn run_ws(mut socket: WebSocket, mut updates: broadcast::Receiver<String>) {
    loop {
        tokio::select! {
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Close(_)) | Err(_)) | None => break,
                    Some(Ok(_)) => {}
                }
            }
            update = updates.recv() => {
                let Ok(text) = update else { break };
                if socket.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
        }
    }
}
