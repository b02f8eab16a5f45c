mod support;

use serde_json::json;
use tokio_util::sync::CancellationToken;

use proxyctl_core::Error;
use proxyctl_core::assets::{AssetCatalog, AssetSelector};
use proxyctl_core::http::RequestBody;
use proxyctl_core::types::{AssetType, Revision};

use support::{LEGACY_BASE, MODERN_BASE, MockTransport, connection, json};

#[tokio::test]
async fn list_reads_modern_wrapper() {
    let transport = MockTransport::scripted(vec![json(
        200,
        json!({"proxies": [{"name": "hello"}, {"name": "world"}]}),
    )]);
    let catalog = AssetCatalog::new(connection(MODERN_BASE, transport.clone()), AssetType::ApiProxy);

    let names = catalog.list(&CancellationToken::new()).await.unwrap();

    assert_eq!(names, vec!["hello", "world"]);
    assert_eq!(transport.calls(), vec!["GET /apis"]);
}

#[tokio::test]
async fn get_revision_and_policy() {
    let transport = MockTransport::new(|_| json(200, json!({"ok": true})));
    let catalog = AssetCatalog::new(connection(LEGACY_BASE, transport.clone()), AssetType::ApiProxy);
    let cancel = CancellationToken::new();
    let rev = AssetSelector::asset("hello").revision(Revision::new(2));

    catalog.get(&rev, &cancel).await.unwrap();
    catalog
        .get(&rev.clone().policy("VerifyKey"), &cancel)
        .await
        .unwrap();
    catalog
        .update(&rev.clone().proxy_endpoint("default"), json!({"name": "default"}), &cancel)
        .await
        .unwrap();

    assert_eq!(
        transport.calls(),
        vec![
            "GET /apis/hello/revisions/2",
            "GET /apis/hello/revisions/2/policies/VerifyKey",
            "POST /apis/hello/revisions/2/proxies/default",
        ]
    );
    assert_eq!(
        transport.requests()[2].body,
        RequestBody::Json(json!({"name": "default"}))
    );
}

#[tokio::test]
async fn delete_requires_name() {
    let transport = MockTransport::scripted(vec![]);
    let catalog = AssetCatalog::new(connection(LEGACY_BASE, transport.clone()), AssetType::SharedFlow);

    let err = catalog
        .delete(&AssetSelector::collection(), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::InvalidArgument(_)));
    assert_eq!(transport.count(), 0);
}

#[tokio::test]
async fn delete_revision() {
    let transport = MockTransport::scripted(vec![json(200, json!({"revision": "4"}))]);
    let catalog = AssetCatalog::new(connection(LEGACY_BASE, transport.clone()), AssetType::SharedFlow);

    let body = catalog
        .delete(
            &AssetSelector::asset("auth").revision(Revision::new(4)),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(body["revision"], "4");
    assert_eq!(transport.calls(), vec!["DELETE /sharedflows/auth/revisions/4"]);
}

#[tokio::test]
async fn policies_and_resources_of_a_revision() {
    let transport = MockTransport::new(|_| json(200, json!([])));
    let catalog = AssetCatalog::new(connection(LEGACY_BASE, transport.clone()), AssetType::ApiProxy);
    let cancel = CancellationToken::new();

    catalog
        .policies("hello", Revision::new(1), None, &cancel)
        .await
        .unwrap();
    catalog
        .resources("hello", Revision::new(1), Some("jsc/main.js"), &cancel)
        .await
        .unwrap();

    assert_eq!(
        transport.calls(),
        vec![
            "GET /apis/hello/revisions/1/policies",
            "GET /apis/hello/revisions/1/resources/jsc/main.js",
        ]
    );
}
