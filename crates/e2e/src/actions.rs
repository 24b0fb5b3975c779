//! HTTP action steps: one API call per step, result stored in the context

use facturas_common::{ApiClient, ApiRequest, HttpExchange};
use reqwest::Method;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::context::ScenarioContext;
use crate::error::{ensure, E2eError, E2eResult};

/// Whether the `Authorization` header is sent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Auth {
    Token,
    Anonymous,
}

/// What to do with a 4xx/5xx response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusPolicy {
    /// Fail the step; the response is not recorded
    FailOnError,
    /// Record the response so later steps can inspect it
    AllowErrors,
}

impl StatusPolicy {
    /// The `(permitiendo 4xx)` suffix switches to `AllowErrors`
    pub fn from_qualifier(qualifier: &str) -> Self {
        if qualifier.trim().is_empty() {
            StatusPolicy::FailOnError
        } else {
            StatusPolicy::AllowErrors
        }
    }
}

/// A single action step
#[derive(Debug, Clone)]
pub struct ApiAction {
    pub method: Method,
    pub path: String,
    pub auth: Auth,
    pub policy: StatusPolicy,
}

impl ApiAction {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            auth: Auth::Token,
            policy: StatusPolicy::FailOnError,
        }
    }

    pub fn anonymous(mut self) -> Self {
        self.auth = Auth::Anonymous;
        self
    }

    pub fn policy(mut self, policy: StatusPolicy) -> Self {
        self.policy = policy;
        self
    }

    fn sends_payload(&self) -> bool {
        self.method == Method::POST || self.method == Method::PUT
    }
}

/// Execute the action and record its response in the context.
///
/// POST and PUT send the context payload. A POST whose payload has a
/// negative numeric `total` must come back as 422 with an `error` property;
/// that is checked right here, before any Then step runs.
pub async fn perform<'c>(
    client: &ApiClient,
    ctx: &'c mut ScenarioContext,
    action: ApiAction,
) -> E2eResult<&'c HttpExchange> {
    let mut request = ApiRequest::new(action.method.clone(), action.path.clone());
    if action.auth == Auth::Anonymous {
        request = request.without_token();
    }
    if action.sends_payload() {
        match ctx.request_body() {
            Some(body) => request = request.with_body(body.clone()),
            None => warn!(method = %action.method, "No payload in context, sending empty body"),
        }
    }

    info!(
        method = %action.method,
        url = %client.url_for(&action.path),
        base_path = ctx.base_path().unwrap_or("-"),
        with_token = action.auth == Auth::Token,
        "Sending API request"
    );

    let exchange = client.send(&request).await?;

    info!(
        method = %exchange.method,
        url = %exchange.url,
        status = exchange.status,
        elapsed_ms = exchange.elapsed_ms(),
        "API response"
    );
    debug!(
        body = %serde_json::to_string_pretty(&exchange.body).unwrap_or_default(),
        "Response body"
    );

    if action.policy == StatusPolicy::FailOnError && !exchange.is_ok() {
        return Err(E2eError::UnexpectedStatus {
            method: exchange.method,
            url: exchange.url,
            status: exchange.status,
            body: exchange.text,
        });
    }

    let negative_total = action.method == Method::POST && has_negative_total(ctx.request_body());
    let recorded = ctx.record(exchange);

    if negative_total {
        info!("Negative total in payload, expecting 422 from the API");
        check_rejected_negative_total(recorded)?;
    }

    Ok(recorded)
}

fn has_negative_total(payload: Option<&Value>) -> bool {
    payload
        .and_then(|p| p.get("total"))
        .and_then(Value::as_f64)
        .map_or(false, |total| total < 0.0)
}

fn check_rejected_negative_total(exchange: &HttpExchange) -> E2eResult<()> {
    ensure(exchange.status == 422, || {
        format!(
            "a negative total must be rejected with 422, got {}",
            exchange.status
        )
    })?;
    if exchange.body.is_object() {
        ensure(exchange.body.get("error").is_some(), || {
            format!("422 body must carry an 'error' property, got {}", exchange.body)
        })?;
    }
    Ok(())
}
