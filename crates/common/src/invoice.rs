//! Invoice records as the API returns them
//!
//! The API is not consistent about naming: depending on the endpoint a
//! record may carry `invoice_number` or `invoiceNumber`, `id` or `_id`.
//! Readers go through [`InvoiceField`] so either convention is accepted.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::InvoiceFixture;

/// Logical invoice fields and their accepted spellings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvoiceField {
    Id,
    Number,
    Date,
    Total,
    Status,
    Active,
}

impl InvoiceField {
    /// Fields the API is expected to echo back from a create/update payload
    pub const REFLECTED: [InvoiceField; 5] = [
        InvoiceField::Number,
        InvoiceField::Date,
        InvoiceField::Total,
        InvoiceField::Status,
        InvoiceField::Active,
    ];

    /// Accepted keys, preferred spelling first
    pub fn keys(&self) -> &'static [&'static str] {
        match self {
            InvoiceField::Id => &["id", "_id"],
            InvoiceField::Number => &["invoice_number", "invoiceNumber"],
            InvoiceField::Date => &["invoice_date", "invoiceDate"],
            InvoiceField::Total => &["total"],
            InvoiceField::Status => &["status"],
            InvoiceField::Active => &["active"],
        }
    }

    /// The snake_case key used in request payloads
    pub fn payload_key(&self) -> &'static str {
        self.keys()[0]
    }

    /// Read the field from a record, falling back across spellings.
    ///
    /// A `null` value counts as absent so the next spelling is tried.
    pub fn lookup<'a>(&self, record: &'a Value) -> Option<&'a Value> {
        self.keys()
            .iter()
            .filter_map(|key| record.get(*key))
            .find(|value| !value.is_null())
    }

    /// Read the field as display text (strings verbatim, numbers formatted)
    pub fn lookup_text(&self, record: &Value) -> Option<String> {
        match self.lookup(record)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }
}

/// Invoice values submitted from the UI or an API payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceDraft {
    pub invoice_number: String,
    pub total: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoice_date: Option<String>,
    pub status: String,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl From<&InvoiceFixture> for InvoiceDraft {
    fn from(fixture: &InvoiceFixture) -> Self {
        Self {
            invoice_number: fixture.number.clone(),
            total: fixture.total,
            invoice_date: None,
            status: fixture.status.clone(),
            active: true,
        }
    }
}

impl InvoiceDraft {
    /// Total as typed into a form field (`100` rather than `100.0`)
    pub fn total_text(&self) -> String {
        if self.total.fract() == 0.0 && self.total.abs() < 1e15 {
            format!("{}", self.total as i64)
        } else {
            self.total.to_string()
        }
    }
}
