mod support;

use std::sync::Arc;

use serde_json::json;
use tokio_util::sync::CancellationToken;

use proxyctl_core::Error;
use proxyctl_core::http::{ApiRequest, ApiResponse, Connection};
use proxyctl_core::types::ApiSurface;

use support::{LEGACY_BASE, MODERN_BASE, MockTransport, RefreshingTokens, connection, json};

fn url(conn: &Connection) -> url::Url {
    conn.url(&["apis"]).unwrap()
}

#[tokio::test]
async fn unauthorized_response_refreshes_token_once() {
    let tokens = Arc::new(RefreshingTokens::default());
    let transport = MockTransport::new(|req| {
        if req.header_value("authorization") == Some("Bearer stale") {
            ApiResponse::new(401, "expired")
        } else {
            json(200, json!(["hello"]))
        }
    });
    let conn = Connection::new(LEGACY_BASE, "acme", tokens.clone(), transport.clone());

    let response = conn
        .execute(ApiRequest::get(url(&conn)), &[200], &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(response.value(), json!(["hello"]));
    assert_eq!(tokens.refreshes(), 1);
    let auth: Vec<_> = transport
        .requests()
        .iter()
        .map(|r| r.header_value("authorization").unwrap_or_default().to_string())
        .collect();
    assert_eq!(auth, vec!["Bearer stale", "Bearer fresh"]);
}

#[tokio::test]
async fn second_unauthorized_is_not_retried_again() {
    let tokens = Arc::new(RefreshingTokens::default());
    let transport = MockTransport::new(|_| ApiResponse::new(401, "denied"));
    let conn = Connection::new(LEGACY_BASE, "acme", tokens.clone(), transport.clone());

    let err = conn
        .execute(ApiRequest::get(url(&conn)), &[200], &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(401));
    assert_eq!(transport.count(), 2);
    assert_eq!(tokens.refreshes(), 1);
}

#[tokio::test]
async fn unaccepted_status_becomes_transport_error() {
    let transport = MockTransport::scripted(vec![ApiResponse::new(404, "{\"code\":\"missing\"}")]);
    let conn = connection(LEGACY_BASE, transport.clone());

    let err = conn
        .execute(ApiRequest::get(url(&conn)), &[200], &CancellationToken::new())
        .await
        .unwrap_err();

    match err {
        Error::Transport { status, body } => {
            assert_eq!(status, 404);
            assert!(body.contains("missing"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn cancelled_token_sends_nothing() {
    let transport = MockTransport::scripted(vec![json(200, json!({}))]);
    let conn = connection(LEGACY_BASE, transport.clone());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = conn
        .execute(ApiRequest::get(url(&conn)), &[200], &cancel)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Cancelled));
    assert_eq!(transport.count(), 0);
}

#[test]
fn surface_follows_base_url() {
    let transport = MockTransport::scripted(vec![]);
    assert_eq!(
        connection(MODERN_BASE, transport.clone()).surface(),
        ApiSurface::Modern
    );
    assert_eq!(
        connection(LEGACY_BASE, transport.clone()).surface(),
        ApiSurface::Legacy
    );
    assert_eq!(
        connection("https://mgmt.internal.example/v1/o/acme/", transport).base_url(),
        "https://mgmt.internal.example/v1/o/acme"
    );
}
