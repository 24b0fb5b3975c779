//! Assertion steps over the last recorded response

use facturas_common::InvoiceField;
use serde_json::Value;
use tracing::info;

use crate::context::ScenarioContext;
use crate::error::{ensure, E2eError, E2eResult};

/// Outcome of a check that may legitimately have nothing to look at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckOutcome {
    Verified,
    Skipped,
}

/// Status must equal `expected`
pub fn expect_status(ctx: &ScenarioContext, expected: u16) -> E2eResult<()> {
    let actual = ctx.last_response()?.status;
    ensure(actual == expected, || {
        format!("status code mismatch: expected {}, got {}", expected, actual)
    })
}

/// Status must be one of the listed values.
///
/// This is set membership: `[400, 422]` accepts 400 and 422 but not 410.
pub fn expect_status_in(ctx: &ScenarioContext, allowed: &[u16]) -> E2eResult<()> {
    let actual = ctx.last_response()?.status;
    ensure(allowed.contains(&actual), || {
        format!("status {} is not one of {:?}", actual, allowed)
    })
}

/// Body must have `prop` and it must be an array (possibly empty)
pub fn expect_array(ctx: &ScenarioContext, prop: &str) -> E2eResult<()> {
    let body = &ctx.last_response()?.body;
    let value = body
        .get(prop)
        .ok_or_else(|| E2eError::AssertionFailed(format!("response body has no property '{}'", prop)))?;
    ensure(value.is_array(), || {
        format!("property '{}' exists but is not an array: {}", prop, value)
    })
}

/// Compare the first element of `array_prop` against `field | value` rows.
///
/// Literal `true`/`false` become booleans; everything else is compared as a
/// string. An empty (or missing) array skips the check.
pub fn expect_first_element(
    ctx: &ScenarioContext,
    array_prop: &str,
    rows: &[(String, String)],
) -> E2eResult<CheckOutcome> {
    let body = &ctx.last_response()?.body;
    let first = match body.get(array_prop).and_then(Value::as_array).and_then(|a| a.first()) {
        Some(first) => first,
        None => {
            info!("'{}' is empty; skipping field checks", array_prop);
            return Ok(CheckOutcome::Skipped);
        }
    };

    for (field, expected) in rows {
        let expected = table_value(expected);
        let actual = first.get(field).ok_or_else(|| {
            E2eError::AssertionFailed(format!("first element of '{}' has no field '{}'", array_prop, field))
        })?;
        ensure(values_equal(actual, &expected), || {
            format!("field '{}': expected {}, got {}", field, expected, actual)
        })?;
    }

    Ok(CheckOutcome::Verified)
}

/// The response must echo the payload's invoice fields, in either naming
/// convention
pub fn expect_payload_reflected(ctx: &ScenarioContext) -> E2eResult<()> {
    let payload = ctx.request_body().ok_or(E2eError::NoPayload)?;
    let body = &ctx.last_response()?.body;

    for field in InvoiceField::REFLECTED {
        let expected = payload.get(field.payload_key()).filter(|v| !v.is_null());
        let actual = field.lookup(body);
        let same = match (expected, actual) {
            (Some(e), Some(a)) => values_equal(e, a),
            (None, None) => true,
            _ => false,
        };
        ensure(same, || {
            format!(
                "field '{}' not reflected: payload {}, response {}",
                field.payload_key(),
                display_opt(expected),
                display_opt(actual)
            )
        })?;
    }

    Ok(())
}

/// Body must carry `prop` with exactly the string `value`
pub fn expect_property_value(ctx: &ScenarioContext, prop: &str, value: &str) -> E2eResult<()> {
    let body = &ctx.last_response()?.body;
    let actual = body
        .get(prop)
        .ok_or_else(|| E2eError::AssertionFailed(format!("response body has no property '{}'", prop)))?;
    ensure(actual.as_str() == Some(value), || {
        format!("property '{}': expected \"{}\", got {}", prop, value, actual)
    })
}

fn table_value(raw: &str) -> Value {
    match raw {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        other => Value::String(other.to_string()),
    }
}

/// JSON equality where `100` and `100.0` are the same number
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => x == y,
        },
        _ => a == b,
    }
}

fn display_opt(value: Option<&Value>) -> String {
    value.map_or_else(|| "<missing>".to_string(), Value::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use facturas_common::HttpExchange;
    use serde_json::json;
    use std::time::Duration;

    fn ctx_with(status: u16, body: Value) -> ScenarioContext {
        let mut ctx = ScenarioContext::new();
        ctx.record(HttpExchange {
            method: "GET".into(),
            url: "http://api/V1/invoices".into(),
            status,
            text: body.to_string(),
            body,
            elapsed: Duration::from_millis(12),
        });
        ctx
    }

    fn rows(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_status_exact() {
        let ctx = ctx_with(200, json!({}));
        assert!(expect_status(&ctx, 200).is_ok());
        let err = expect_status(&ctx, 201).unwrap_err();
        assert!(err.to_string().contains("expected 201, got 200"));
    }

    #[test]
    fn test_status_without_response() {
        let ctx = ScenarioContext::new();
        assert!(matches!(expect_status(&ctx, 200), Err(E2eError::NoResponse)));
    }

    #[test]
    fn test_status_set_is_membership_not_range() {
        assert!(expect_status_in(&ctx_with(400, json!({})), &[400, 422]).is_ok());
        assert!(expect_status_in(&ctx_with(422, json!({})), &[400, 422]).is_ok());
        assert!(expect_status_in(&ctx_with(410, json!({})), &[400, 422]).is_err());
        assert!(expect_status_in(&ctx_with(401, json!({})), &[400, 422]).is_err());
    }

    #[test]
    fn test_array_property() {
        let ctx = ctx_with(200, json!({ "invoices": [], "page": 1 }));
        assert!(expect_array(&ctx, "invoices").is_ok());
        assert!(expect_array(&ctx, "page").is_err());
        assert!(expect_array(&ctx, "missing").is_err());
    }

    #[test]
    fn test_first_element_skipped_when_empty() {
        let ctx = ctx_with(200, json!({ "invoices": [] }));
        let outcome =
            expect_first_element(&ctx, "invoices", &rows(&[("status", "Vigente")])).unwrap();
        assert_eq!(outcome, CheckOutcome::Skipped);
    }

    #[test]
    fn test_first_element_fields_with_boolean_conversion() {
        let ctx = ctx_with(
            200,
            json!({ "invoices": [
                { "status": "Vigente", "active": true },
                { "status": "Eliminada", "active": false }
            ]}),
        );
        let outcome = expect_first_element(
            &ctx,
            "invoices",
            &rows(&[("status", "Vigente"), ("active", "true")]),
        )
        .unwrap();
        assert_eq!(outcome, CheckOutcome::Verified);

        assert!(expect_first_element(&ctx, "invoices", &rows(&[("active", "false")])).is_err());
        assert!(expect_first_element(&ctx, "invoices", &rows(&[("total", "1")])).is_err());
    }

    #[test]
    fn test_payload_reflected_in_snake_and_camel_case() {
        let payload = r#"{
            "invoice_number": "FACTURA-CRIS",
            "invoice_date": "2025-01-15",
            "total": 100,
            "status": "Vigente",
            "active": true
        }"#;

        let mut snake = ctx_with(
            201,
            json!({
                "id": 7,
                "invoice_number": "FACTURA-CRIS",
                "invoice_date": "2025-01-15",
                "total": 100.0,
                "status": "Vigente",
                "active": true
            }),
        );
        snake.set_payload(payload).unwrap();
        assert!(expect_payload_reflected(&snake).is_ok());

        let mut camel = ctx_with(
            200,
            json!({
                "invoiceNumber": "FACTURA-CRIS",
                "invoiceDate": "2025-01-15",
                "total": 100,
                "status": "Vigente",
                "active": true
            }),
        );
        camel.set_payload(payload).unwrap();
        assert!(expect_payload_reflected(&camel).is_ok());
    }

    #[test]
    fn test_payload_reflection_mismatch() {
        let mut ctx = ctx_with(
            200,
            json!({ "invoiceNumber": "OTRA", "total": 100, "status": "Vigente", "active": true }),
        );
        ctx.set_payload(r#"{ "invoice_number": "FACTURA-CRIS", "total": 100, "status": "Vigente", "active": true }"#)
            .unwrap();
        let err = expect_payload_reflected(&ctx).unwrap_err();
        assert!(err.to_string().contains("invoice_number"));
    }

    #[test]
    fn test_payload_reflection_needs_payload() {
        let ctx = ctx_with(200, json!({}));
        assert!(matches!(expect_payload_reflected(&ctx), Err(E2eError::NoPayload)));
    }

    #[test]
    fn test_property_value() {
        let ctx = ctx_with(404, json!({ "error": "Factura no encontrada" }));
        assert!(expect_property_value(&ctx, "error", "Factura no encontrada").is_ok());
        assert!(expect_property_value(&ctx, "error", "Not found").is_err());
        assert!(expect_property_value(&ctx, "message", "x").is_err());
    }
}
