//! HTTP action steps against the mock invoices API

mod support;

use std::time::Duration;

use facturas_common::ApiClient;
use facturas_e2e::actions::{perform, ApiAction, StatusPolicy};
use facturas_e2e::assertions;
use facturas_e2e::{E2eError, ScenarioContext};
use reqwest::Method;

use support::{spawn_mock_api, SEEDED_NUMBER, TOKEN};

fn client(base_url: &str) -> ApiClient {
    ApiClient::new(base_url, TOKEN, Duration::from_secs(5))
}

#[tokio::test]
async fn test_get_with_token_records_response() {
    let mock = spawn_mock_api().await;
    let api = client(&mock.base_url);
    let mut ctx = ScenarioContext::new();

    let path = format!("/V1/invoices?page=1&invoice_number={}", SEEDED_NUMBER);
    let exchange = perform(&api, &mut ctx, ApiAction::new(Method::GET, path))
        .await
        .unwrap();
    assert_eq!(exchange.status, 200);
    assert!(exchange.url.ends_with("invoice_number=FAC-7081986"));

    assertions::expect_status(&ctx, 200).unwrap();
    assertions::expect_array(&ctx, "invoices").unwrap();
    let rows = vec![
        ("status".to_string(), "Vigente".to_string()),
        ("active".to_string(), "true".to_string()),
    ];
    assert_eq!(
        assertions::expect_first_element(&ctx, "invoices", &rows).unwrap(),
        assertions::CheckOutcome::Verified
    );
}

#[tokio::test]
async fn test_error_status_fails_step_and_is_not_recorded() {
    let mock = spawn_mock_api().await;
    let api = client(&mock.base_url);
    let mut ctx = ScenarioContext::new();

    let action = ApiAction::new(Method::GET, "/V1/invoices").anonymous();
    let err = perform(&api, &mut ctx, action).await.unwrap_err();
    assert!(matches!(err, E2eError::UnexpectedStatus { status: 401, .. }));
    assert!(matches!(ctx.last_response(), Err(E2eError::NoResponse)));
}

#[tokio::test]
async fn test_without_token_tolerates_rejection() {
    let mock = spawn_mock_api().await;
    let api = client(&mock.base_url);
    let mut ctx = ScenarioContext::new();

    let action = ApiAction::new(Method::GET, "/V1/invoices")
        .anonymous()
        .policy(StatusPolicy::AllowErrors);
    perform(&api, &mut ctx, action).await.unwrap();

    assertions::expect_status_in(&ctx, &[401, 403]).unwrap();
}

#[tokio::test]
async fn test_create_reflects_payload() {
    let mock = spawn_mock_api().await;
    let api = client(&mock.base_url);
    let mut ctx = ScenarioContext::new();

    ctx.set_payload(
        r#"{ "invoice_number": "FACTURA-CRIS", "total": 100, "invoice_date": "2025-01-15",
             "status": "Vigente", "active": true }"#,
    )
    .unwrap();
    perform(&api, &mut ctx, ApiAction::new(Method::POST, "/V1/invoices"))
        .await
        .unwrap();

    assertions::expect_status_in(&ctx, &[200, 201]).unwrap();
    assertions::expect_payload_reflected(&ctx).unwrap();
}

#[tokio::test]
async fn test_negative_total_expects_422() {
    let mock = spawn_mock_api().await;
    let api = client(&mock.base_url);
    let mut ctx = ScenarioContext::new();

    ctx.set_payload(r#"{ "invoice_number": "NEG-1", "total": -10, "status": "Vigente", "active": true }"#)
        .unwrap();
    let action = ApiAction::new(Method::POST, "/V1/invoices").policy(StatusPolicy::AllowErrors);
    let exchange = perform(&api, &mut ctx, action).await.unwrap();
    assert_eq!(exchange.status, 422);
    assert!(exchange.body.get("error").is_some());
}

#[tokio::test]
async fn test_update_answers_in_camel_case() {
    let mock = spawn_mock_api().await;
    let api = client(&mock.base_url);
    let mut ctx = ScenarioContext::new();

    ctx.set_payload(
        r#"{ "invoice_number": "FAC-EDIT", "invoice_date": "2025-02-01", "total": 300,
             "status": "Vigente", "active": false }"#,
    )
    .unwrap();
    let exchange = perform(&api, &mut ctx, ApiAction::new(Method::PUT, "/V1/invoices/1"))
        .await
        .unwrap();
    assert_eq!(exchange.body["invoiceNumber"], "FAC-EDIT");
    assert!(exchange.body.get("invoice_number").is_none());

    assertions::expect_payload_reflected(&ctx).unwrap();
}

#[tokio::test]
async fn test_unknown_invoice_is_404_with_message() {
    let mock = spawn_mock_api().await;
    let api = client(&mock.base_url);
    let mut ctx = ScenarioContext::new();

    let action = ApiAction::new(Method::DELETE, "/V1/invoices/999999")
        .policy(StatusPolicy::from_qualifier(" (permitiendo 4xx)"));
    perform(&api, &mut ctx, action).await.unwrap();

    assertions::expect_status(&ctx, 404).unwrap();
    assertions::expect_property_value(&ctx, "error", "Factura no encontrada").unwrap();

    let strict = ApiAction::new(Method::DELETE, "/V1/invoices/999999");
    assert!(perform(&api, &mut ctx, strict).await.is_err());
    // the tolerated 404 from before is still the last recorded response
    assertions::expect_status(&ctx, 404).unwrap();
}
