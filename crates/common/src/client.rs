//! HTTP client for the invoices API

use std::time::{Duration, Instant};

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::Method;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::config::SuiteConfig;
use crate::error::Result;

/// Thin client around `reqwest` that knows the API base URL and token
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
    timeout: Duration,
}

/// A request against the API, addressed by a path relative to the base URL
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    /// Send the `Authorization` header
    pub authenticated: bool,
    /// Send `Content-Type: application/json` even without a body
    pub json_content_type: bool,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            authenticated: true,
            json_content_type: false,
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn without_token(mut self) -> Self {
        self.authenticated = false;
        self
    }

    pub fn with_json_content_type(mut self) -> Self {
        self.json_content_type = true;
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.json_content_type = true;
        self.body = Some(body);
        self
    }
}

/// One completed request/response pair
#[derive(Debug, Clone, Serialize)]
pub struct HttpExchange {
    pub method: String,
    pub url: String,
    pub status: u16,
    /// Parsed JSON body, or the raw text as a JSON string when it isn't JSON
    pub body: Value,
    /// Raw response text
    pub text: String,
    pub elapsed: Duration,
}

impl HttpExchange {
    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed.as_millis() as u64
    }

    /// 2xx and 3xx, the range a browser-style client does not fail on
    pub fn is_ok(&self) -> bool {
        (200..400).contains(&self.status)
    }
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>, timeout: Duration) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            token: token.into(),
            timeout,
        }
    }

    pub fn from_config(config: &SuiteConfig) -> Self {
        Self::new(
            config.api_base_url.clone(),
            config.auth_token.clone(),
            config.request_timeout,
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Resolve a path by plain concatenation with the base URL
    pub fn url_for(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Perform the request and capture status, body and timing.
    ///
    /// Transport failures are errors; any HTTP status is returned as-is.
    pub async fn send(&self, request: &ApiRequest) -> Result<HttpExchange> {
        let url = self.url_for(&request.path);

        let mut builder = self
            .http
            .request(request.method.clone(), &url)
            .timeout(self.timeout);

        if request.authenticated {
            builder = builder.header(AUTHORIZATION, self.token.as_str());
        }

        if let Some(body) = &request.body {
            builder = builder.json(body);
        } else if request.json_content_type {
            builder = builder.header(CONTENT_TYPE, "application/json");
        }

        let started = Instant::now();
        let response = builder.send().await?;
        let status = response.status().as_u16();
        let text = response.text().await?;
        let elapsed = started.elapsed();

        let body = serde_json::from_str(&text).unwrap_or_else(|_| Value::String(text.clone()));

        debug!(method = %request.method, %url, status, elapsed_ms = elapsed.as_millis() as u64, "API exchange");

        Ok(HttpExchange {
            method: request.method.to_string(),
            url,
            status,
            body,
            text,
            elapsed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_is_plain_concatenation() {
        let client = ApiClient::new("https://api.example.com", "t", Duration::from_secs(1));
        assert_eq!(
            client.url_for("/V1/invoices?page=1&invoice_number=FAC-1"),
            "https://api.example.com/V1/invoices?page=1&invoice_number=FAC-1"
        );
    }

    #[test]
    fn test_request_builders() {
        let req = ApiRequest::get("/V1/invoices").without_token();
        assert!(!req.authenticated);
        assert!(!req.json_content_type);

        let req = ApiRequest::new(Method::POST, "/V1/invoices")
            .with_body(serde_json::json!({ "total": 1 }));
        assert!(req.authenticated);
        assert!(req.json_content_type);
        assert!(req.body.is_some());
    }

    #[test]
    fn test_exchange_ok_range() {
        let mut exchange = HttpExchange {
            method: "GET".into(),
            url: "u".into(),
            status: 204,
            body: Value::Null,
            text: String::new(),
            elapsed: Duration::from_millis(3),
        };
        assert!(exchange.is_ok());
        exchange.status = 404;
        assert!(!exchange.is_ok());
        assert_eq!(exchange.elapsed_ms(), 3);
    }
}
