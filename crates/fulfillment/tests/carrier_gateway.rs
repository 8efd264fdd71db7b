//! Carrier gateway tests against a mock HTTP server.
//!
//! Covers token handling, the three-way address-lookup outcome, the
//! query-string assembly of shipment queries, and the label endpoints.

use httpmock::prelude::*;
use secrecy::SecretString;

use despacho_fulfillment::carrier::{
    CarrierClient, CarrierError, PaymentMode, ShipmentQuery, ShipmentStatus,
};
use despacho_fulfillment::config::CarrierConfig;

fn carrier_config(server: &MockServer, posting_card: Option<&str>) -> CarrierConfig {
    CarrierConfig {
        base_url: server.base_url(),
        user: "empresa01".to_string(),
        access_code: SecretString::from("codigo-acesso"),
        cnpj: "34028316000103".to_string(),
        contract: "9912345678".to_string(),
        posting_card: posting_card.map(str::to_string),
    }
}

async fn authenticated_client(server: &MockServer) -> CarrierClient {
    server
        .mock_async(|when, then| {
            when.method(POST).path("/token/v1/autentica/cartaopostagem");
            then.status(200)
                .json_body(serde_json::json!({ "token": "tok-1", "expiraEm": "2024-03-01T12:00:00" }));
        })
        .await;

    let client =
        CarrierClient::new(&carrier_config(server, Some("0076543210"))).expect("client builds");
    client.authenticate().await.expect("authentication succeeds");
    client
}

#[tokio::test]
async fn authenticate_uses_posting_card_variant_when_configured() {
    let server = MockServer::start_async().await;
    let token_mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/token/v1/autentica/cartaopostagem")
                .json_body(serde_json::json!({ "numero": "0076543210" }));
            then.status(200)
                .json_body(serde_json::json!({ "token": "tok-1" }));
        })
        .await;

    let client =
        CarrierClient::new(&carrier_config(&server, Some("0076543210"))).expect("client builds");
    client.authenticate().await.expect("authentication succeeds");

    token_mock.assert_async().await;
}

#[tokio::test]
async fn authenticate_uses_plain_variant_without_posting_card() {
    let server = MockServer::start_async().await;
    let token_mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/token/v1/autentica");
            then.status(200)
                .json_body(serde_json::json!({ "token": "tok-2" }));
        })
        .await;

    let client = CarrierClient::new(&carrier_config(&server, None)).expect("client builds");
    client.authenticate().await.expect("authentication succeeds");

    token_mock.assert_async().await;
}

#[tokio::test]
async fn authenticate_retries_three_times_then_fails() {
    let server = MockServer::start_async().await;
    let token_mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/token/v1/autentica");
            then.status(401).body("bad credentials");
        })
        .await;

    let client = CarrierClient::new(&carrier_config(&server, None)).expect("client builds");
    let err = client.authenticate().await.expect_err("authentication fails");

    assert!(matches!(err, CarrierError::Auth { attempts: 3, .. }));
    assert_eq!(token_mock.hits_async().await, 3);
}

#[tokio::test]
async fn calls_without_token_fail_fast() {
    let server = MockServer::start_async().await;
    let client = CarrierClient::new(&carrier_config(&server, None)).expect("client builds");

    let err = client
        .resolve_address("01310-100")
        .await
        .expect_err("no token cached");
    assert!(matches!(err, CarrierError::NoToken));
}

#[tokio::test]
async fn resolve_address_normalizes_input_and_parses_response() {
    let server = MockServer::start_async().await;
    let client = authenticated_client(&server).await;

    let lookup_mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/cep/v2/enderecos/01310100");
            then.status(200).json_body(serde_json::json!({
                "cep": "01310100",
                "logradouro": "Avenida Paulista",
                "bairro": "Bela Vista",
                "localidade": "Sao Paulo",
                "uf": "SP",
            }));
        })
        .await;

    // Hyphen and stray characters are stripped before the lookup
    let resolved = client
        .resolve_address(" 01310-100 ")
        .await
        .expect("lookup succeeds")
        .expect("address found");

    assert_eq!(resolved.street, "Avenida Paulista");
    assert_eq!(resolved.city, "Sao Paulo");
    lookup_mock.assert_async().await;
}

#[tokio::test]
async fn resolve_address_distinguishes_not_found_from_failure() {
    let server = MockServer::start_async().await;
    let client = authenticated_client(&server).await;

    server
        .mock_async(|when, then| {
            when.method(GET).path("/cep/v2/enderecos/99999999");
            then.status(404).body("nao encontrado");
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/cep/v2/enderecos/88888888");
            then.status(500).body("boom");
        })
        .await;

    let missing = client
        .resolve_address("99999-999")
        .await
        .expect("404 is not an error");
    assert!(missing.is_none());

    let err = client
        .resolve_address("88888-888")
        .await
        .expect_err("500 is an error");
    assert!(matches!(err, CarrierError::Api { status: 500, .. }));
}

#[tokio::test]
async fn query_shipments_sends_only_set_predicates() {
    let server = MockServer::start_async().await;
    let client = authenticated_client(&server).await;

    let query_mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/prepostagem/v2/prepostagens")
                .query_param("status", "PREATENDIDO")
                .query_param("modalidadePagamento", "A_FATURAR")
                .query_param("page", "0")
                .query_param("size", "100");
            then.status(200).json_body(serde_json::json!({
                "itens": [
                    { "id": "pp-1", "codigoObjeto": "AA123456789BR", "statusAtual": "PREATENDIDO" }
                ]
            }));
        })
        .await;

    let query = ShipmentQuery {
        status: Some(ShipmentStatus::PreAttended),
        payment_mode: Some(PaymentMode::Invoiced),
        ..ShipmentQuery::default()
    };
    let records = client.query_shipments(&query).await.expect("query succeeds");

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].object_code.as_deref(), Some("AA123456789BR"));
    query_mock.assert_async().await;
}

#[tokio::test]
async fn cancel_shipment_carries_the_requesting_user() {
    let server = MockServer::start_async().await;
    let client = authenticated_client(&server).await;

    let cancel_mock = server
        .mock_async(|when, then| {
            when.method(DELETE)
                .path("/prepostagem/v1/prepostagens/objeto/AA123456789BR")
                .query_param("idCorreiosSolicitanteCancelamento", "empresa01");
            then.status(200).json_body(serde_json::json!({}));
        })
        .await;

    client
        .cancel_shipment("AA123456789BR")
        .await
        .expect("cancel succeeds");
    cancel_mock.assert_async().await;
}

#[tokio::test]
async fn label_request_and_download_round_trip() {
    let server = MockServer::start_async().await;
    let client = authenticated_client(&server).await;

    let request_mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/prepostagem/v1/prepostagens/rotulo/assincrono/pdf")
                .json_body(serde_json::json!({
                    "codigosObjeto": ["AA123456789BR"],
                    "numeroCartaoPostagem": "0076543210",
                    "tipoRotulo": "P",
                    "formatoRotulo": "ET",
                    "imprimeRemetente": "S",
                }));
            then.status(200)
                .json_body(serde_json::json!({ "idRecibo": "rec-1" }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/prepostagem/v1/prepostagens/rotulo/download/assincrono/rec-1");
            then.status(200).json_body(serde_json::json!({
                "nome": "etiquetas.pdf",
                "dados": "JVBERi0xLjQ=",
            }));
        })
        .await;

    let receipt = client
        .request_labels(&["AA123456789BR".to_string()])
        .await
        .expect("request succeeds");
    assert_eq!(receipt.receipt_id, "rec-1");
    request_mock.assert_async().await;

    let pdf = client
        .download_labels(&receipt.receipt_id)
        .await
        .expect("download succeeds")
        .expect("label ready");
    assert_eq!(pdf.name, "etiquetas.pdf");
    assert_eq!(pdf.decode_bytes().expect("valid base64"), b"%PDF-1.4");
}

#[tokio::test]
async fn label_download_without_payload_is_not_ready() {
    let server = MockServer::start_async().await;
    let client = authenticated_client(&server).await;

    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/prepostagem/v1/prepostagens/rotulo/download/assincrono/rec-2");
            then.status(200).json_body(serde_json::json!({}));
        })
        .await;

    let pdf = client
        .download_labels("rec-2")
        .await
        .expect("poll succeeds");
    assert!(pdf.is_none());
}

#[tokio::test]
async fn contract_service_matches_description_case_insensitively() {
    let server = MockServer::start_async().await;
    let client = authenticated_client(&server).await;

    server
        .mock_async(|when, then| {
            when.method(GET).path(
                "/meucontrato/v1/empresas/34028316000103/contratos/9912345678/cartoes/0076543210/servicos",
            );
            then.status(200).json_body(serde_json::json!({
                "itens": [
                    { "codigo": "03220", "descricao": "SEDEX CONTRATO AG" },
                    { "codigo": "03298", "descricao": "PAC CONTRATO AG" },
                ]
            }));
        })
        .await;

    let service = client
        .contract_service("pac contrato ag")
        .await
        .expect("lookup succeeds")
        .expect("service found");
    assert_eq!(service.code, "03298");

    let missing = client
        .contract_service("CARTA COMERCIAL")
        .await
        .expect("lookup succeeds");
    assert!(missing.is_none());
}
