use reqwest::header::HeaderValue;
use serde_json::json;

use super::*;

// Port 9 (discard) is never served in tests; calls that would touch the
// network fail with `ApiError::Http`, so any other error proves the call
// was refused locally.
fn offline_client() -> ApiClient {
    ApiClient::new(ClientConfig::with_base_url("http://127.0.0.1:9")).unwrap()
}

// =============================================================
// construction
// =============================================================

#[test]
fn new_rejects_non_http_base_url() {
    let err = ApiClient::new(ClientConfig::with_base_url("localhost:8090")).unwrap_err();
    assert!(matches!(err, ApiError::Config(_)));
}

#[test]
fn set_token_drops_empty_strings() {
    let mut client = offline_client();
    client.set_token(Some(String::new()));
    assert_eq!(client.token(), None);
    client.set_token(Some("abc".to_owned()));
    assert_eq!(client.token(), Some("abc"));
}

#[test]
fn apply_app_config_reads_demo_flag() {
    let mut client = offline_client();
    client.apply_app_config(&AppConfig {
        flags: vec!["demo".to_owned()],
        ..AppConfig::default()
    });
    assert!(client.is_demo());
    client.apply_app_config(&AppConfig::default());
    assert!(!client.is_demo());
}

// =============================================================
// query serialization
// =============================================================

#[test]
fn list_filter_omits_unset_fields() {
    assert_eq!(serde_json::to_value(ListFilter::default()).unwrap(), json!({}));
    assert_eq!(
        serde_json::to_value(ListFilter::for_ticket("t-1")).unwrap(),
        json!({"ticket": "t-1"})
    );
    assert_eq!(
        serde_json::to_value(ListFilter::page(20, 10)).unwrap(),
        json!({"offset": 20, "limit": 10})
    );
}

#[test]
fn search_filter_renames_type() {
    let filter = SearchFilter {
        kind: Some("incident".to_owned()),
        open: Some(true),
        ..SearchFilter::default()
    };
    assert_eq!(
        serde_json::to_value(&filter).unwrap(),
        json!({"type": "incident", "open": true})
    );
}

#[test]
fn total_count_reads_header() {
    let mut headers = HeaderMap::new();
    assert_eq!(total_count(&headers), None);
    headers.insert("X-Total-Count", HeaderValue::from_static("42"));
    assert_eq!(total_count(&headers), Some(42));
    headers.insert("X-Total-Count", HeaderValue::from_static("lots"));
    assert_eq!(total_count(&headers), None);
}

// =============================================================
// local refusals
// =============================================================

#[tokio::test]
async fn search_with_invalid_query_never_hits_network() {
    let client = offline_client();
    let filter = SearchFilter {
        query: Some("status == ".to_owned()),
        ..SearchFilter::default()
    };
    let err = client.search_tickets(&filter).await.unwrap_err();
    let ApiError::InvalidQuery(syntax) = err else {
        panic!("expected InvalidQuery, got {err:?}");
    };
    assert_eq!(syntax.symbol, "<EOF>");
}

#[tokio::test]
async fn demo_mode_blocks_locked_collections() {
    let mut client = offline_client();
    client.set_demo(true);

    let reaction = NewReaction {
        name: "r".to_owned(),
        trigger: Trigger::Schedule {
            expression: "* * * * *".to_owned(),
        },
        action: Action::Python {
            requirements: String::new(),
            script: String::new(),
        },
    };
    assert!(matches!(
        client.create::<Reaction>(&reaction).await,
        Err(ApiError::DemoMode)
    ));
    assert!(matches!(client.delete::<File>("f-1").await, Err(ApiError::DemoMode)));
    assert!(matches!(
        client.update::<User>("u-1", &UserPatch::default()).await,
        Err(ApiError::DemoMode)
    ));
    assert!(matches!(
        client.update_settings(&Settings::default()).await,
        Err(ApiError::DemoMode)
    ));
    assert!(matches!(
        client.add_user_to_group("u-1", "g-1").await,
        Err(ApiError::DemoMode)
    ));
}

#[tokio::test]
async fn demo_mode_leaves_tickets_writable() {
    let mut client = offline_client();
    client.set_demo(true);
    let err = client.delete::<Ticket>("t-1").await.unwrap_err();
    assert!(matches!(err, ApiError::Http(_)), "{err:?}");
}

// =============================================================
// path segments
// =============================================================

#[test]
fn path_segment_escapes_separators() {
    assert_eq!(path_segment("t-1").unwrap(), "t-1");
    assert_eq!(path_segment("../users/x").unwrap(), "..%2Fusers%2Fx");
    assert_eq!(path_segment("a?b#c").unwrap(), "a%3Fb%23c");
    assert_eq!(path_segment("%2e%2e").unwrap(), "%252e%252e");
    assert_eq!(path_segment(r"a\b").unwrap(), "a%5Cb");
}

#[test]
fn path_segment_rejects_dot_and_empty_ids() {
    for id in ["", ".", ".."] {
        assert!(matches!(path_segment(id), Err(ApiError::InvalidId(_))), "{id:?}");
    }
}

#[test]
fn record_url_keeps_id_in_one_segment() {
    let client = offline_client();
    let url = client.record_url("comments", "../users/u-1").unwrap();
    assert_eq!(url, "http://127.0.0.1:9/api/comments/..%2Fusers%2Fu-1");
    let parsed = reqwest::Url::parse(&url).unwrap();
    assert_eq!(parsed.path(), "/api/comments/..%2Fusers%2Fu-1");
}

#[tokio::test]
async fn dot_ids_are_refused_before_the_network() {
    let client = offline_client();
    let err = client.delete::<Ticket>("..").await.unwrap_err();
    assert!(matches!(err, ApiError::InvalidId(_)), "{err:?}");
    let err = client.group_users(".").await.unwrap_err();
    assert!(matches!(err, ApiError::InvalidId(_)), "{err:?}");
}
