//! Engine flows against a mock HTTP server.
//!
//! All three gateways point at the same mock server (the paths do not
//! collide). The replica store rides on a lazy pool that never connects -
//! these flows do not touch it.

use std::path::PathBuf;
use std::time::Duration;

use httpmock::prelude::*;
use secrecy::SecretString;
use sqlx::postgres::PgPoolOptions;

use despacho_fulfillment::addresser::AddresserClient;
use despacho_fulfillment::carrier::CarrierClient;
use despacho_fulfillment::config::{
    AddresserConfig, CarrierConfig, SenderConfig, StorefrontConfig,
};
use despacho_fulfillment::engine::{FulfillmentEngine, PollPolicy};
use despacho_fulfillment::replica::ReplicaStore;
use despacho_fulfillment::storefront::StorefrontClient;

fn sender_config() -> SenderConfig {
    SenderConfig {
        name: "Loja Exemplo".to_string(),
        tax_id: "34990164865".to_string(),
        street: "Avenida Paulista".to_string(),
        number: "1000".to_string(),
        complement: String::new(),
        neighborhood: "Bela Vista".to_string(),
        city: "Sao Paulo".to_string(),
        state: "SP".to_string(),
        cep: "01310100".to_string(),
        email: None,
    }
}

fn scratch_dir(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("despacho-test-{}-{name}", std::process::id()))
}

async fn engine_for(server: &MockServer, downloads_dir: PathBuf) -> FulfillmentEngine {
    server
        .mock_async(|when, then| {
            when.method(POST).path("/token/v1/autentica/cartaopostagem");
            then.status(200)
                .json_body(serde_json::json!({ "token": "tok-1" }));
        })
        .await;

    let carrier = CarrierClient::new(&CarrierConfig {
        base_url: server.base_url(),
        user: "empresa01".to_string(),
        access_code: SecretString::from("codigo-acesso"),
        cnpj: "34028316000103".to_string(),
        contract: "9912345678".to_string(),
        posting_card: Some("0076543210".to_string()),
    })
    .expect("carrier client builds");
    carrier.authenticate().await.expect("authentication succeeds");

    let storefront = StorefrontClient::new(&StorefrontConfig {
        base_url: server.base_url(),
        api_token: SecretString::from("tok-storefront"),
        account_id: "acct-1".to_string(),
        site_id: "site-1".to_string(),
    })
    .expect("storefront client builds");

    let addresser = AddresserClient::new(&AddresserConfig {
        base_url: server.base_url(),
    })
    .expect("addresser client builds");

    // Never connected by these flows
    let pool = PgPoolOptions::new()
        .connect_lazy("postgres://localhost/despacho_test")
        .expect("lazy pool");

    FulfillmentEngine::new(
        carrier,
        storefront,
        addresser,
        ReplicaStore::new(pool),
        sender_config(),
        downloads_dir,
    )
    .with_poll_policy(PollPolicy {
        max_attempts: 2,
        initial_delay: Duration::ZERO,
        backoff_factor: 2,
    })
}

/// Wire-shaped order with two tracked fulfillments.
fn order_1021_json() -> serde_json::Value {
    serde_json::json!({
        "id": "ord-1021",
        "number": "1021",
        "lineItems": [{
            "index": 1,
            "productId": "prod-1",
            "name": "Caneca",
            "quantity": 2,
            "price": 75.0,
            "totalPrice": 150.0,
        }],
        "shippingInfo": {
            "deliveryOption": "PAC",
            "shipmentDetails": {
                "address": {
                    "firstName": "Maria",
                    "lastName": "Silva",
                    "streetName": "Av Paulista",
                    "streetNumber": "1023",
                    "addressLine2": "ap 42",
                    "city": "Sao Paulo",
                    "subdivision": "SP",
                    "zipCode": "01310-100",
                    "phone": "+55 11 99888-7766",
                    "email": "maria@example.com",
                }
            }
        },
        "totals": { "subtotal": 150.0, "weight": 2.5 },
        "fulfillments": [
            { "id": "f1", "trackingInfo": { "trackingNumber": "AA111111111BR" } },
            { "id": "f2", "trackingInfo": { "trackingNumber": "AA222222222BR" } },
        ],
        "paymentStatus": "PAID",
        "fulfillmentStatus": "FULFILLED",
        "dateCreated": "2024-03-01T12:00:00Z",
        "lastUpdated": "2024-03-02T08:30:00Z",
    })
}

fn shippable_order_json(number: &str, cep: &str, street: &str) -> serde_json::Value {
    serde_json::json!({
        "id": format!("ord-{number}"),
        "number": number,
        "lineItems": [{
            "index": 1,
            "productId": "prod-1",
            "name": "Caneca",
            "quantity": 1,
            "price": 75.0,
            "totalPrice": 75.0,
        }],
        "shippingInfo": {
            "deliveryOption": "PAC",
            "shipmentDetails": {
                "address": {
                    "firstName": "Joana",
                    "lastName": "Prado",
                    "streetName": street,
                    "streetNumber": "52",
                    "city": "Curitiba",
                    "subdivision": "PR",
                    "zipCode": cep,
                }
            }
        },
        "totals": { "subtotal": 75.0, "weight": 0.8 },
        "paymentStatus": "PAID",
        "fulfillmentStatus": "NOT_FULFILLED",
        "dateCreated": "2024-03-01T12:00:00Z",
        "lastUpdated": "2024-03-01T12:00:00Z",
    })
}

#[tokio::test]
async fn cancel_issues_one_call_per_fulfillment_and_isolates_failures() {
    let server = MockServer::start_async().await;
    let engine = engine_for(&server, scratch_dir("cancel")).await;

    server
        .mock_async(|when, then| {
            when.method(POST).path("/stores/v2/orders/query");
            then.status(200).json_body(serde_json::json!({
                "orders": [order_1021_json()],
                "totalResults": 1,
            }));
        })
        .await;

    let cancel_first = server
        .mock_async(|when, then| {
            when.method(DELETE)
                .path("/prepostagem/v1/prepostagens/objeto/AA111111111BR");
            then.status(200).json_body(serde_json::json!({}));
        })
        .await;
    let cancel_second = server
        .mock_async(|when, then| {
            when.method(DELETE)
                .path("/prepostagem/v1/prepostagens/objeto/AA222222222BR");
            then.status(500).body("internal error");
        })
        .await;

    let delete_first = server
        .mock_async(|when, then| {
            when.method(DELETE)
                .path("/stores/v2/orders/ord-1021/fulfillments/f1");
            then.status(200).json_body(serde_json::json!({}));
        })
        .await;
    let delete_second = server
        .mock_async(|when, then| {
            when.method(DELETE)
                .path("/stores/v2/orders/ord-1021/fulfillments/f2");
            then.status(200).json_body(serde_json::json!({}));
        })
        .await;

    let report = engine.cancel_shipment("1021").await.expect("cancel runs");

    // Exactly one cancel per tracking number, the failure isolated
    assert_eq!(cancel_first.hits_async().await, 1);
    assert_eq!(cancel_second.hits_async().await, 1);
    assert_eq!(report.canceled, vec!["AA111111111BR".to_string()]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].object_code, "AA222222222BR");

    // Fulfillments are removed regardless of the failed cancel
    assert_eq!(delete_first.hits_async().await, 1);
    assert_eq!(delete_second.hits_async().await, 1);
}

#[tokio::test]
async fn missing_order_aborts_the_operation() {
    let server = MockServer::start_async().await;
    let engine = engine_for(&server, scratch_dir("missing")).await;

    server
        .mock_async(|when, then| {
            when.method(POST).path("/stores/v2/orders/query");
            then.status(200)
                .json_body(serde_json::json!({ "orders": [], "totalResults": 0 }));
        })
        .await;

    let err = engine
        .cancel_shipment("9999")
        .await
        .expect_err("order is missing");
    assert_eq!(err.to_string(), "order not found: 9999");
}

#[tokio::test]
async fn five_orders_produce_two_correction_batches() {
    let server = MockServer::start_async().await;
    let engine = engine_for(&server, scratch_dir("correction")).await;

    server
        .mock_async(|when, then| {
            when.method(GET).path("/cep/v2/enderecos/80010010");
            then.status(200).json_body(serde_json::json!({
                "cep": "80010010",
                "logradouro": "Rua das Flores",
                "bairro": "Centro",
                "localidade": "Curitiba",
                "uf": "PR",
            }));
        })
        .await;
    let submit_mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/correios/enderecador/encomendas");
            then.status(200)
                .json_body(serde_json::json!({ "arquivo": "lote.pdf" }));
        })
        .await;

    let orders: Vec<despacho_fulfillment::storefront::Order> = (1..=5)
        .map(|i| {
            serde_json::from_value(shippable_order_json(
                &format!("10{i}"),
                "80010-010",
                "Rua das Flores",
            ))
            .expect("fixture deserializes")
        })
        .collect();

    let outcome = engine
        .correct_addresses(&orders)
        .await
        .expect("pipeline runs");

    // ceil(5 / 4) = 2 submissions, collected in order
    assert_eq!(submit_mock.hits_async().await, 2);
    assert_eq!(outcome.artifacts.len(), 2);
    assert!(outcome.skipped.is_empty());
}

#[tokio::test]
async fn unresolvable_cep_is_skipped_not_fatal() {
    let server = MockServer::start_async().await;
    let engine = engine_for(&server, scratch_dir("skip")).await;

    // The carrier does not know this CEP; the empty canonical address has
    // no valid eight-digit CEP, so the order lands in `skipped`.
    server
        .mock_async(|when, then| {
            when.method(GET).path("/cep/v2/enderecos/99999999");
            then.status(404).body("nao encontrado");
        })
        .await;
    let submit_mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/correios/enderecador/encomendas");
            then.status(200).json_body(serde_json::json!({}));
        })
        .await;

    let orders: Vec<despacho_fulfillment::storefront::Order> = vec![
        serde_json::from_value(shippable_order_json("101", "99999-999", "Rua A"))
            .expect("fixture deserializes"),
    ];

    let outcome = engine
        .correct_addresses(&orders)
        .await
        .expect("pipeline runs");

    assert_eq!(outcome.artifacts.len(), 0);
    assert_eq!(submit_mock.hits_async().await, 0);
    assert_eq!(outcome.skipped.len(), 1);
    assert_eq!(outcome.skipped[0].number, "101");
}

#[tokio::test]
async fn reconcile_flags_only_divergent_streets() {
    let server = MockServer::start_async().await;
    let engine = engine_for(&server, scratch_dir("reconcile")).await;

    server
        .mock_async(|when, then| {
            when.method(GET).path("/cep/v2/enderecos/80010010");
            then.status(200).json_body(serde_json::json!({
                "cep": "80010010",
                "logradouro": "Rua das Flores",
                "localidade": "Curitiba",
                "uf": "PR",
            }));
        })
        .await;

    let orders: Vec<despacho_fulfillment::storefront::Order> = vec![
        serde_json::from_value(shippable_order_json("102", "80010-010", "Rua XV de Novembro"))
            .expect("fixture deserializes"),
        serde_json::from_value(shippable_order_json("101", "80010-010", "rua das flores"))
            .expect("fixture deserializes"),
    ];

    let findings = engine
        .reconcile_addresses(&orders)
        .await
        .expect("report runs");

    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].order_number, "102");
    assert_eq!(findings[0].canonical_street, "Rua das Flores");
    assert!(findings[0].score < 99);
}

#[tokio::test]
async fn label_download_writes_the_decoded_pdf() {
    let server = MockServer::start_async().await;
    let downloads = scratch_dir("labels");
    let engine = engine_for(&server, downloads.clone()).await;

    server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/prepostagem/v1/prepostagens/rotulo/assincrono/pdf");
            then.status(200)
                .json_body(serde_json::json!({ "idRecibo": "rec-9" }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/prepostagem/v1/prepostagens/rotulo/download/assincrono/rec-9");
            then.status(200).json_body(serde_json::json!({
                "nome": "etiquetas-1021.pdf",
                "dados": "JVBERi0xLjQ=",
            }));
        })
        .await;

    let order: despacho_fulfillment::storefront::Order =
        serde_json::from_value(order_1021_json()).expect("fixture deserializes");

    let path = engine
        .download_labels(&[order])
        .await
        .expect("download runs")
        .expect("label ready");

    assert_eq!(path, downloads.join("etiquetas-1021.pdf"));
    let written = tokio::fs::read(&path).await.expect("file written");
    assert_eq!(written, b"%PDF-1.4");

    let _ = tokio::fs::remove_dir_all(&downloads).await;
}

#[tokio::test]
async fn label_poll_budget_expires_into_none() {
    let server = MockServer::start_async().await;
    let engine = engine_for(&server, scratch_dir("labels-expired")).await;

    server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/prepostagem/v1/prepostagens/rotulo/assincrono/pdf");
            then.status(200)
                .json_body(serde_json::json!({ "idRecibo": "rec-slow" }));
        })
        .await;
    let download_mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/prepostagem/v1/prepostagens/rotulo/download/assincrono/rec-slow");
            then.status(200).json_body(serde_json::json!({}));
        })
        .await;

    let order: despacho_fulfillment::storefront::Order =
        serde_json::from_value(order_1021_json()).expect("fixture deserializes");

    let path = engine
        .download_labels(&[order])
        .await
        .expect("download runs");

    assert!(path.is_none());
    // Two polls: the configured max_attempts
    assert_eq!(download_mock.hits_async().await, 2);
}

#[tokio::test]
async fn orders_without_tracking_produce_no_label_request() {
    let server = MockServer::start_async().await;
    let engine = engine_for(&server, scratch_dir("labels-empty")).await;

    let request_mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/prepostagem/v1/prepostagens/rotulo/assincrono/pdf");
            then.status(200)
                .json_body(serde_json::json!({ "idRecibo": "rec-x" }));
        })
        .await;

    let order: despacho_fulfillment::storefront::Order =
        serde_json::from_value(shippable_order_json("101", "80010-010", "Rua A"))
            .expect("fixture deserializes");

    let path = engine
        .download_labels(&[order])
        .await
        .expect("download runs");

    assert!(path.is_none());
    assert_eq!(request_mock.hits_async().await, 0);
}

#[tokio::test]
async fn content_declaration_is_written_per_tracking_number() {
    let server = MockServer::start_async().await;
    let downloads = scratch_dir("declaration");
    let engine = engine_for(&server, downloads.clone()).await;

    server
        .mock_async(|when, then| {
            when.method(POST).path("/stores/v2/orders/query");
            then.status(200).json_body(serde_json::json!({
                "orders": [order_1021_json()],
                "totalResults": 1,
            }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/prepostagem/v2/prepostagens")
                .query_param("codigoObjeto", "AA111111111BR");
            then.status(200).json_body(serde_json::json!({
                "itens": [{ "id": "pp-1", "codigoObjeto": "AA111111111BR" }]
            }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/prepostagem/v1/prepostagens/declaracaoconteudo/pp-1");
            then.status(200).body("<html>declaracao</html>");
        })
        .await;

    let path = engine
        .download_content_declaration("1021")
        .await
        .expect("download runs")
        .expect("declaration found");

    assert_eq!(path, downloads.join("1021-AA111111111BR.html"));
    let written = tokio::fs::read_to_string(&path).await.expect("file written");
    assert_eq!(written, "<html>declaracao</html>");

    let _ = tokio::fs::remove_dir_all(&downloads).await;
}
