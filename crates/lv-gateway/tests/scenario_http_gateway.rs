//! HttpGateway against an in-process mock server (no real network).

use httpmock::prelude::*;
use lv_gateway::{DataGateway, GatewayError, HttpGateway};
use lv_schemas::{CreateMode, EntityStatus, SummaryCreate, TransactionCreate};
use serde_json::json;

fn tx_json(id: &str, status: &str) -> serde_json::Value {
    json!({
        "id": id,
        "user_id": "u1",
        "monto": 10.0,
        "tipo": "pago",
        "status": status,
        "idempotency_key": format!("k-{id}"),
        "created_at": "2024-05-01T10:00:00.123456"
    })
}

fn summary_json(id: &str, status: &str, result: Option<&str>) -> serde_json::Value {
    json!({
        "id": id,
        "source": "manual",
        "status": status,
        "result": result,
        "error": null,
        "idempotency_key": format!("async-sum-{id}"),
        "created_at": "2024-05-01T10:00:00"
    })
}

#[tokio::test]
async fn list_transactions_decodes_server_order() {
    let server = MockServer::start_async().await;
    let m = server
        .mock_async(|when, then| {
            when.method(GET).path("/transactions");
            then.status(200)
                .json_body(json!([tx_json("t2", "pendiente"), tx_json("t1", "procesado")]));
        })
        .await;

    let gw = HttpGateway::new(server.base_url());
    let list = gw.list_transactions().await.unwrap();

    m.assert_async().await;
    assert_eq!(list.len(), 2);
    assert_eq!(list[0].id, "t2");
    assert_eq!(list[1].status, EntityStatus::Processed);
}

#[tokio::test]
async fn async_create_posts_payload_with_idempotency_key() {
    let server = MockServer::start_async().await;
    let m = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/transactions/async-process")
                .header("Idempotency-Key", "async-tx-abc")
                .json_body(json!({"user_id": "u1", "monto": 10.0, "tipo": "pago"}));
            then.status(200).json_body(tx_json("t9", "pendiente"));
        })
        .await;

    let gw = HttpGateway::new(server.base_url());
    let payload = TransactionCreate {
        user_id: "u1".to_string(),
        amount: 10.0,
        tx_type: "pago".to_string(),
    };
    let tx = gw
        .create_transaction(CreateMode::Async, &payload, "async-tx-abc")
        .await
        .unwrap();

    m.assert_async().await;
    assert_eq!(tx.id, "t9");
    assert_eq!(tx.status, EntityStatus::Pending);
}

#[tokio::test]
async fn sync_create_uses_create_endpoint() {
    let server = MockServer::start_async().await;
    let m = server
        .mock_async(|when, then| {
            when.method(POST).path("/transactions/create");
            then.status(200).json_body(tx_json("t3", "pendiente"));
        })
        .await;

    let gw = HttpGateway::new(server.base_url());
    let payload = TransactionCreate {
        user_id: "u1".to_string(),
        amount: 1.0,
        tx_type: "pago".to_string(),
    };
    let tx = gw
        .create_transaction(CreateMode::Sync, &payload, "sync-tx-1")
        .await
        .unwrap();

    m.assert_async().await;
    assert_eq!(tx.id, "t3");
}

#[tokio::test]
async fn validation_failure_surfaces_status_and_body() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/summaries/async");
            then.status(422).body(r#"{"detail":"text required"}"#);
        })
        .await;

    let gw = HttpGateway::new(server.base_url());
    let payload = SummaryCreate {
        source: "manual".to_string(),
        text: String::new(),
    };
    let err = gw.create_summary(&payload, "async-sum-1").await.unwrap_err();

    match err {
        GatewayError::Validation { status, body } => {
            assert_eq!(status, 422);
            assert!(body.contains("text required"));
        }
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[tokio::test]
async fn get_summary_maps_404_to_not_found() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/summaries/missing");
            then.status(404).json_body(json!({"detail": "summary_not_found"}));
        })
        .await;

    let gw = HttpGateway::new(server.base_url());
    let err = gw.get_summary("missing").await.unwrap_err();
    assert!(err.is_not_found(), "got {err:?}");
}

#[tokio::test]
async fn get_summary_returns_full_entity() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/summaries/s1");
            then.status(200)
                .json_body(summary_json("s1", "procesado", Some("the summary")));
        })
        .await;

    let gw = HttpGateway::new(server.base_url());
    let s = gw.get_summary("s1").await.unwrap();
    assert_eq!(s.result.as_deref(), Some("the summary"));
    assert_eq!(s.status, EntityStatus::Processed);
}

#[tokio::test]
async fn server_error_is_http_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/summaries");
            then.status(500).body("Internal Server Error");
        })
        .await;

    let gw = HttpGateway::new(server.base_url());
    let err = gw.list_summaries().await.unwrap_err();
    assert_eq!(
        err,
        GatewayError::Http {
            status: 500,
            body: "Internal Server Error".to_string()
        }
    );
}

#[tokio::test]
async fn undecodable_success_body_is_decode_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/transactions");
            then.status(200).json_body(json!({"not": "a list"}));
        })
        .await;

    let gw = HttpGateway::new(server.base_url());
    let err = gw.list_transactions().await.unwrap_err();
    assert!(matches!(err, GatewayError::Decode(_)), "got {err:?}");
}

#[tokio::test]
async fn unreachable_server_is_network_error() {
    // Grab a free port, then release it so nothing is listening there.
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();
    let gw = HttpGateway::new(format!("http://127.0.0.1:{port}"));
    let err = gw.list_transactions().await.unwrap_err();
    assert!(matches!(err, GatewayError::Network(_)), "got {err:?}");
}

#[tokio::test]
async fn summary_id_with_reserved_characters_is_one_path_segment() {
    let server = MockServer::start_async().await;
    let plain = server
        .mock_async(|when, then| {
            when.method(GET).path("/summaries/s1");
            then.status(200)
                .json_body(summary_json("s1", "procesado", Some("other entity")));
        })
        .await;

    let gw = HttpGateway::new(server.base_url());
    for id in ["s1?x=1", "s1#frag", "s1/../s1"] {
        let err = gw.get_summary(id).await.unwrap_err();
        assert!(err.is_not_found(), "{id}: got {err:?}");
    }
    plain.assert_hits_async(0).await;
}

#[tokio::test]
async fn dot_segment_ids_are_not_requested() {
    let server = MockServer::start_async().await;
    let list = server
        .mock_async(|when, then| {
            when.method(GET).path("/summaries");
            then.status(200).json_body(json!([]));
        })
        .await;

    let gw = HttpGateway::new(server.base_url());
    for id in ["..", ".", ""] {
        let err = gw.get_summary(id).await.unwrap_err();
        assert!(err.is_not_found(), "{id:?}: got {err:?}");
    }
    list.assert_hits_async(0).await;
}
