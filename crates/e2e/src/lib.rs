//! Facturas end-to-end suite
//!
//! Behaviour scenarios for the Facturas web app and its invoices API:
//! - API steps call the REST API directly and assert on status and body
//! - UI steps drive a real browser through Playwright via page objects
//! - Scenarios are plain Gherkin (Spanish) executed by cucumber
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 Feature files (Gherkin, es)                 │
//! ├─────────────────────────────────────────────────────────────┤
//! │  steps::api ── actions ──► ApiClient ──► invoices API       │
//! │             └─ assertions (over ScenarioContext)            │
//! │  steps::ui  ── pages::{Login, Dashboard, Invoices}          │
//! │                   └─► dyn Browser ──► PlaywrightDriver      │
//! ├─────────────────────────────────────────────────────────────┤
//! │  InvoiceWorld (one per scenario)                            │
//! │    ├── ScenarioContext { base_path, request_body, resp }    │
//! │    └── UiSession (browser launched on first UI step)        │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod actions;
pub mod assertions;
pub mod browser;
pub mod context;
pub mod error;
pub mod pages;
pub mod playwright;
pub mod runner;
mod steps;
pub mod world;

pub use context::ScenarioContext;
pub use error::{E2eError, E2eResult};
pub use runner::{run_features, RunnerConfig};
pub use world::InvoiceWorld;
