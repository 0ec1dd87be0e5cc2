mod common;

use std::time::Duration;

use serde_json::json;

use client::net::types::{NewTicket, Ticket};
use client::{ApiClient, Invalidation, RealtimeHandle, spawn_realtime};
use common::{ADMIN_EMAIL, MockServer, PASSWORD};

async fn wait_connected(handle: &RealtimeHandle) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !handle.state().connected {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("realtime socket never connected");
}

#[tokio::test]
async fn mutations_arrive_as_invalidations() {
    let server = MockServer::start().await;
    let mut api = ApiClient::new(server.config()).unwrap();
    let token = api.login(ADMIN_EMAIL, PASSWORD).await.unwrap();
    api.set_token(Some(token.clone()));

    let handle = spawn_realtime(&server.config(), Some(&token)).unwrap();
    let mut updates = handle.subscribe();
    wait_connected(&handle).await;

    let ticket: Ticket = api
        .create::<Ticket>(&NewTicket {
            kind: "incident".to_owned(),
            name: "pushed".to_owned(),
            open: true,
            state: json!({}),
            ..NewTicket::default()
        })
        .await
        .unwrap();

    let received = tokio::time::timeout(Duration::from_secs(5), updates.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        received,
        Invalidation::Record {
            collection: "tickets".to_owned(),
            id: ticket.id,
        }
    );
    assert!(handle.state().last_message.is_some());
    assert_eq!(
        server.ws_auth_headers(),
        vec![Some(format!("Bearer {token}"))]
    );
}

#[tokio::test]
async fn settings_ids_map_to_settings_invalidation() {
    let server = MockServer::start().await;
    let handle = spawn_realtime(&server.config(), None).unwrap();
    let mut updates = handle.subscribe();
    wait_connected(&handle).await;

    server.push(&["settings/meta"]);
    let received = tokio::time::timeout(Duration::from_secs(5), updates.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(received, Invalidation::Settings);
    assert_eq!(server.ws_auth_headers(), vec![None]);
}

#[tokio::test]
async fn unreachable_server_records_error_and_stays_disconnected() {
    let config = client::ClientConfig::with_base_url("http://127.0.0.1:9");
    let handle = spawn_realtime(&config, None).unwrap();
    tokio::time::timeout(Duration::from_secs(5), async {
        while handle.state().last_error.is_none() {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .unwrap();
    assert!(!handle.state().connected);
}
