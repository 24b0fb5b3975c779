//! Facturas Common Library
//!
//! Shared pieces for the Facturas end-to-end and load test suites:
//! environment configuration, the invoices API client, and helpers for
//! reading invoice records regardless of their naming convention.

pub mod client;
pub mod config;
pub mod error;
pub mod invoice;

// Re-export commonly used types
pub use client::{ApiClient, ApiRequest, HttpExchange};
pub use config::{BrowserKind, InvoiceFixture, SuiteConfig};
pub use error::{Error, Result};
pub use invoice::{InvoiceDraft, InvoiceField};

/// Suite version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
