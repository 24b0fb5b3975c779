//! Per-scenario state shared between Given/When/Then steps

use facturas_common::HttpExchange;
use serde_json::Value;
use tracing::{debug, info};

use crate::error::{E2eError, E2eResult};

/// State of one scenario run.
///
/// Lives inside the scenario's world and is dropped with it, so nothing
/// leaks between scenarios.
#[derive(Debug, Default)]
pub struct ScenarioContext {
    base_path: Option<String>,
    request_body: Option<Value>,
    last_response: Option<HttpExchange>,
}

impl ScenarioContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the API base path. Only used for logging.
    pub fn set_base_path(&mut self, path: &str) {
        info!(base_path = path, "API base path configured");
        self.base_path = Some(path.to_string());
    }

    pub fn base_path(&self) -> Option<&str> {
        self.base_path.as_deref()
    }

    /// Parse a literal doc string as the request payload
    pub fn set_payload(&mut self, text: &str) -> E2eResult<&Value> {
        let payload: Value = serde_json::from_str(text).map_err(E2eError::Payload)?;
        debug!(
            payload = %serde_json::to_string_pretty(&payload).unwrap_or_default(),
            "Request payload stored"
        );
        Ok(self.request_body.insert(payload))
    }

    pub fn request_body(&self) -> Option<&Value> {
        self.request_body.as_ref()
    }

    /// Store a response, replacing any previous one
    pub fn record(&mut self, exchange: HttpExchange) -> &HttpExchange {
        self.last_response.insert(exchange)
    }

    pub fn last_response(&self) -> E2eResult<&HttpExchange> {
        self.last_response.as_ref().ok_or(E2eError::NoResponse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    fn exchange(status: u16) -> HttpExchange {
        HttpExchange {
            method: "GET".into(),
            url: "http://api/V1/invoices".into(),
            status,
            body: json!({}),
            text: "{}".into(),
            elapsed: Duration::from_millis(1),
        }
    }

    #[test]
    fn test_starts_empty() {
        let ctx = ScenarioContext::new();
        assert!(ctx.base_path().is_none());
        assert!(ctx.request_body().is_none());
        assert!(matches!(ctx.last_response(), Err(E2eError::NoResponse)));
    }

    #[test]
    fn test_payload_parse_failure_is_an_error() {
        let mut ctx = ScenarioContext::new();
        let err = ctx.set_payload("{ invoice_number: FAC }").unwrap_err();
        assert!(matches!(err, E2eError::Payload(_)));
        assert!(ctx.request_body().is_none());
    }

    #[test]
    fn test_payload_is_stored() {
        let mut ctx = ScenarioContext::new();
        ctx.set_payload(r#"{ "total": 100, "active": true }"#).unwrap();
        assert_eq!(ctx.request_body(), Some(&json!({ "total": 100, "active": true })));
    }

    #[test]
    fn test_record_overwrites_previous_response() {
        let mut ctx = ScenarioContext::new();
        ctx.record(exchange(200));
        ctx.record(exchange(404));
        assert_eq!(ctx.last_response().unwrap().status, 404);
    }
}
