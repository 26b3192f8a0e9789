//! End-to-end client behaviour over a scripted transport.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};

use command_relay::auth::MemoryCredentialStore;
use command_relay::protocol::RawResponse;
use command_relay::{ClientConfig, CommandClient, ErrorCode, InvokeOptions};

mod common;
use common::{ScriptedTransport, Step};

#[derive(Debug, Deserialize, PartialEq)]
struct Ticker {
    symbol: String,
    price: f64,
}

#[tokio::test]
async fn test_legacy_and_enveloped_results_are_equal() {
    let payload = json!({"symbol": "BTCUSDT", "price": 42000.5});
    let legacy = ScriptedTransport::always(Step::Reply(payload.clone()));
    let enveloped = ScriptedTransport::always(Step::ok(payload.clone()));

    let a = CommandClient::builder(legacy)
        .build()
        .invoke("get_ticker", json!({}), InvokeOptions::new())
        .await
        .unwrap();
    let b = CommandClient::builder(enveloped)
        .build()
        .invoke("get_ticker", json!({}), InvokeOptions::new())
        .await
        .unwrap();

    assert_eq!(a, payload);
    assert_eq!(a, b);
}

#[tokio::test]
async fn test_envelope_edge_shapes() {
    // `success` that is not a boolean is a legacy payload.
    let odd = json!({"success": "yes", "data": 1});
    let transport = ScriptedTransport::sequence(
        vec![
            Step::Reply(odd.clone()),
            Step::Reply(json!({"success": true})),
            Step::Reply(json!({"success": false})),
            Step::Reply(json!({
                "success": false,
                "error": {"code": "NOT_FOUND", "message": "no such order", "details": "id=7"},
                "request_id": "req-9"
            })),
        ],
        Step::ok(Value::Null),
    );
    let client = CommandClient::builder(transport).build().without_cache();

    let value = client.invoke("a", json!({}), InvokeOptions::new()).await.unwrap();
    assert_eq!(value, odd);

    let value = client.invoke("b", json!({}), InvokeOptions::new()).await.unwrap();
    assert_eq!(value, Value::Null);

    let err = client.invoke("c", json!({}), InvokeOptions::new()).await.unwrap_err();
    assert_eq!(err.code(), &ErrorCode::UnknownError);
    assert_eq!(err.message(), "Operation failed");

    let err = client.invoke("d", json!({}), InvokeOptions::new()).await.unwrap_err();
    assert_eq!(err.code(), &ErrorCode::from("NOT_FOUND"));
    assert_eq!(err.code().as_str(), "NOT_FOUND");
    assert_eq!(err.details(), Some("id=7"));
    assert_eq!(err.request_id(), Some("req-9"));
    assert_eq!(err.to_string(), "[NOT_FOUND] no such order");
}

#[tokio::test]
async fn test_invoke_as_decodes_payload() {
    let transport = ScriptedTransport::always(Step::ok(json!({"symbol": "ETHUSDT", "price": 3100.0})));
    let client = CommandClient::builder(transport).build();

    let ticker: Ticker = client
        .invoke_as("get_ticker", json!({"symbol": "ETHUSDT"}), InvokeOptions::new())
        .await
        .unwrap();
    assert_eq!(
        ticker,
        Ticker {
            symbol: "ETHUSDT".into(),
            price: 3100.0
        }
    );

    let err = client
        .invoke_as::<Vec<String>>("get_ticker", json!({"symbol": "ETHUSDT"}), InvokeOptions::new())
        .await
        .unwrap_err();
    assert_eq!(err.code(), &ErrorCode::UnknownError);
}

#[tokio::test]
async fn test_invoke_raw_skips_pipeline() {
    let transport = ScriptedTransport::always(Step::fail("TOKEN_EXPIRED", "expired"));
    let store = Arc::new(MemoryCredentialStore::with_tokens(Some("tok".into()), None));
    let client = CommandClient::builder(transport.clone()).credentials(store).build();

    let raw = client.invoke_raw("get_orders", json!({"page": 2})).await.unwrap();
    assert!(matches!(raw, RawResponse::Enveloped(ref envelope) if !envelope.success));
    assert_eq!(transport.calls(), 1);
    assert_eq!(transport.seen()[0].1, json!({"page": 2}));
}

#[tokio::test]
async fn test_variants_share_cache_and_keep_base_config() {
    let transport = ScriptedTransport::always(Step::ok(json!("v")));
    let client = CommandClient::builder(transport.clone()).build();
    let public = client.without_auth();

    assert!(client.config().enable_auth);
    assert!(!public.config().enable_auth);

    public.invoke("market_get_symbols", json!({}), InvokeOptions::new()).await.unwrap();
    client.invoke("market_get_symbols", json!({}), InvokeOptions::new()).await.unwrap();
    assert_eq!(transport.calls(), 1);

    client.invalidate(Some("market_"));
    assert_eq!(public.cache_stats().entries, 0);

    let uncached = client.without_cache();
    uncached.invoke("market_get_symbols", json!({}), InvokeOptions::new()).await.unwrap();
    uncached.invoke("market_get_symbols", json!({}), InvokeOptions::new()).await.unwrap();
    assert_eq!(transport.calls(), 3);
    assert!(client.config().enable_cache);

    let custom = client.with_config(ClientConfig {
        auth_field: "token".into(),
        ..ClientConfig::default()
    });
    assert_eq!(custom.config().auth_field, "token");
    assert_eq!(client.config().auth_field, "_auth");
}

#[tokio::test]
async fn test_custom_auth_field() {
    let transport = ScriptedTransport::always(Step::ok(json!(1)));
    let store = Arc::new(MemoryCredentialStore::with_tokens(Some("tok".into()), None));
    let config = ClientConfig {
        auth_field: "access_token".into(),
        enable_cache: false,
        ..ClientConfig::default()
    };
    let client = CommandClient::builder(transport.clone())
        .config(config)
        .credentials(store)
        .build();

    client.invoke("get_orders", json!({}), InvokeOptions::new()).await.unwrap();
    assert_eq!(transport.seen()[0].1, json!({"access_token": "tok"}));
}

#[tokio::test]
async fn test_clear_cache_forces_dispatch() {
    let transport = ScriptedTransport::always(Step::ok(json!([])));
    let client = CommandClient::builder(transport.clone()).build();

    client.invoke("get_orders", json!({}), InvokeOptions::new()).await.unwrap();
    client.clear_cache();
    client.invoke("get_orders", json!({}), InvokeOptions::new()).await.unwrap();
    assert_eq!(transport.calls(), 2);

    let stats = client.cache_stats();
    assert_eq!(stats.entries, 1);
    assert_eq!(stats.pending, 0);
    assert_eq!(stats.max_entries, 200);
}

#[tokio::test]
async fn test_failure_envelopes_with_partial_error_blocks() {
    let transport = ScriptedTransport::sequence(
        vec![
            Step::Reply(json!({"success": false, "error": {"code": "VALIDATION_ERROR"}})),
            Step::Reply(json!({"success": false, "error": "boom"})),
            Step::Reply(json!({"success": false, "error": {}, "timestamp": 1.5})),
        ],
        Step::ok(json!("recovered")),
    );
    let client = CommandClient::builder(transport.clone()).build();

    let err = client.invoke("place_order", json!({}), InvokeOptions::new()).await.unwrap_err();
    assert_eq!(err.code(), &ErrorCode::from("VALIDATION_ERROR"));
    assert_eq!(err.message(), "Operation failed");
    assert_eq!(transport.calls(), 1);

    let err = client.invoke("place_order", json!({}), InvokeOptions::new()).await.unwrap_err();
    assert_eq!(err.code(), &ErrorCode::UnknownError);
    assert_eq!(err.message(), "boom");

    let err = client.invoke("place_order", json!({}), InvokeOptions::new()).await.unwrap_err();
    assert_eq!(err.code(), &ErrorCode::UnknownError);
    assert_eq!(err.message(), "Operation failed");

    // None of the failures reached the cache.
    assert_eq!(client.cache_stats().entries, 0);
    let value = client.invoke("place_order", json!({}), InvokeOptions::new()).await.unwrap();
    assert_eq!(value, json!("recovered"));
    assert_eq!(transport.calls(), 4);
}

#[tokio::test]
async fn test_success_envelope_with_mistyped_metadata() {
    let transport = ScriptedTransport::always(Step::Reply(json!({
        "success": true,
        "data": 5,
        "timestamp": 1.5,
        "request_id": {"nested": true},
        "extra": "ignored"
    })));
    let client = CommandClient::builder(transport).build();

    let value = client.invoke("get_count", json!({}), InvokeOptions::new()).await.unwrap();
    assert_eq!(value, json!(5));
}

#[tokio::test]
async fn test_config_level_disables_hold_without_overrides() {
    let transport = ScriptedTransport::always(Step::network("refused"));
    let store = Arc::new(MemoryCredentialStore::with_tokens(Some("tok".into()), None));
    let config = ClientConfig {
        enable_auth: false,
        enable_retry: false,
        ..ClientConfig::default()
    };
    let client = CommandClient::builder(transport.clone())
        .config(config)
        .credentials(store)
        .build();

    let err = client
        .invoke("get_ticker", json!({"symbol": "BTCUSDT"}), InvokeOptions::new().with_cache(false))
        .await
        .unwrap_err();

    assert_eq!(err.code(), &ErrorCode::NetworkError);
    assert_eq!(transport.calls(), 1);
    assert_eq!(transport.seen()[0].1, json!({"symbol": "BTCUSDT"}));
}
