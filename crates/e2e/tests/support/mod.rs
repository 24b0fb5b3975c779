//! In-process mock of the invoices API
//!
//! Mirrors the contract the feature files exercise: token auth on every
//! route, filtering by `invoice_number`, 422 for negative totals, camelCase
//! bodies on update and `{"error": "Factura no encontrada"}` for unknown ids.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, put};
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::task::JoinHandle;

pub const TOKEN: &str = "TEST-TOKEN";
pub const SEEDED_NUMBER: &str = "FAC-7081986";

#[derive(Debug)]
struct Store {
    invoices: Vec<Value>,
    next_id: u64,
}

impl Store {
    fn seeded() -> Self {
        Self {
            invoices: vec![json!({
                "id": 1,
                "invoice_number": SEEDED_NUMBER,
                "invoice_date": "2025-01-10",
                "total": 250.5,
                "status": "Vigente",
                "active": true
            })],
            next_id: 1,
        }
    }

    fn position(&self, id: u64) -> Option<usize> {
        self.invoices.iter().position(|i| i["id"] == json!(id))
    }
}

type Shared = Arc<Mutex<Store>>;

pub struct MockApi {
    pub base_url: String,
    handle: JoinHandle<()>,
}

impl Drop for MockApi {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Serve the mock on an ephemeral local port
pub async fn spawn_mock_api() -> MockApi {
    let store: Shared = Arc::new(Mutex::new(Store::seeded()));
    let app = Router::new()
        .route("/V1/invoices", get(list_invoices).post(create_invoice))
        .route("/V1/invoices/:id", put(update_invoice).delete(delete_invoice))
        .with_state(store);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    MockApi {
        base_url: format!("http://{}", addr),
        handle,
    }
}

fn authorized(headers: &HeaderMap) -> bool {
    headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()) == Some(TOKEN)
}

fn unauthorized() -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({ "error": "Token inválido" }))).into_response()
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "Factura no encontrada" }))).into_response()
}

async fn list_invoices(
    State(store): State<Shared>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let store = store.lock();
    let invoices: Vec<Value> = store
        .invoices
        .iter()
        .filter(|i| {
            params
                .get("invoice_number")
                .map_or(true, |n| i["invoice_number"] == n.as_str())
        })
        .cloned()
        .collect();
    let page: u64 = params.get("page").and_then(|p| p.parse().ok()).unwrap_or(1);

    Json(json!({ "invoices": invoices, "page": page, "total_count": invoices.len() })).into_response()
}

async fn create_invoice(
    State(store): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    if !body.is_object() {
        return (StatusCode::BAD_REQUEST, Json(json!({ "error": "JSON object expected" }))).into_response();
    }
    if body["total"].as_f64().map_or(false, |t| t < 0.0) {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "error": "El total debe ser mayor o igual a 0" })),
        )
            .into_response();
    }

    let mut store = store.lock();
    store.next_id += 1;
    let mut invoice = body;
    invoice["id"] = json!(store.next_id);
    store.invoices.push(invoice.clone());

    (StatusCode::CREATED, Json(invoice)).into_response()
}

async fn update_invoice(
    State(store): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<u64>,
    Json(body): Json<Value>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let mut store = store.lock();
    let Some(index) = store.position(id) else {
        return not_found();
    };

    let invoice = &mut store.invoices[index];
    if let (Some(target), Some(changes)) = (invoice.as_object_mut(), body.as_object()) {
        for (key, value) in changes {
            target.insert(key.clone(), value.clone());
        }
    }

    // This API answers updates in camelCase
    Json(json!({
        "id": id,
        "invoiceNumber": invoice["invoice_number"],
        "invoiceDate": invoice["invoice_date"],
        "total": invoice["total"],
        "status": invoice["status"],
        "active": invoice["active"]
    }))
    .into_response()
}

async fn delete_invoice(
    State(store): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<u64>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let mut store = store.lock();
    match store.position(id) {
        Some(index) => {
            store.invoices.remove(index);
            Json(json!({ "message": "Factura eliminada" })).into_response()
        }
        None => not_found(),
    }
}
