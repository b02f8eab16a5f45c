mod support;

use serde_json::json;
use tokio_util::sync::CancellationToken;

use proxyctl_core::Error;
use proxyctl_core::http::ApiResponse;
use proxyctl_core::revisions::RevisionResolver;
use proxyctl_core::types::{AssetType, Revision, RevisionRef};

use support::{LEGACY_BASE, MockTransport, connection, json};

#[tokio::test]
async fn explicit_revision_resolves_without_network() {
    let transport = MockTransport::scripted(vec![]);
    let resolver = RevisionResolver::new(connection(LEGACY_BASE, transport.clone()));
    let cancel = CancellationToken::new();

    let bare: RevisionRef = serde_json::from_value(json!(5)).unwrap();
    let text: RevisionRef = serde_json::from_value(json!("5")).unwrap();
    let named: RevisionRef = serde_json::from_value(json!({"name": "5"})).unwrap();

    for reference in [bare, text, named] {
        let rev = resolver
            .resolve_revision_or_latest(AssetType::ApiProxy, "hello", Some(reference), &cancel)
            .await
            .unwrap();
        assert_eq!(rev, Revision::new(5));
    }
    assert_eq!(transport.count(), 0);
}

#[tokio::test]
async fn latest_compares_numerically() {
    let transport = MockTransport::scripted(vec![json(200, json!(["2", "10", "9"]))]);
    let resolver = RevisionResolver::new(connection(LEGACY_BASE, transport.clone()));

    let rev = resolver
        .resolve_revision_or_latest(AssetType::SharedFlow, "auth", None, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(rev, Revision::new(10));
    assert_eq!(transport.calls(), vec!["GET /sharedflows/auth/revisions"]);
}

#[tokio::test]
async fn missing_asset_is_not_found() {
    let transport = MockTransport::scripted(vec![ApiResponse::new(404, "no such proxy")]);
    let resolver = RevisionResolver::new(connection(LEGACY_BASE, transport.clone()));

    let err = resolver
        .latest_revision(AssetType::ApiProxy, "ghost", &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::NotFound(_)));
}

#[tokio::test]
async fn asset_without_revisions_is_not_found() {
    let transport = MockTransport::scripted(vec![json(200, json!([]))]);
    let resolver = RevisionResolver::new(connection(LEGACY_BASE, transport.clone()));

    let err = resolver
        .latest_revision(AssetType::ApiProxy, "empty", &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::NotFound(_)));
}

#[tokio::test]
async fn empty_name_is_invalid() {
    let transport = MockTransport::scripted(vec![]);
    let resolver = RevisionResolver::new(connection(LEGACY_BASE, transport.clone()));

    let err = resolver
        .list_revisions(AssetType::ApiProxy, " ", &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::InvalidArgument(_)));
    assert_eq!(transport.count(), 0);
}
