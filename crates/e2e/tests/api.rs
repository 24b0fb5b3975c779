//! API scenarios entry point
//!
//! Runs `tests/features/api` against an in-process mock of the invoices API.
//! Set `E2E_LIVE=1` to hit the configured `API_BASE_URL` instead.
//!
//! Run with: cargo test --package facturas-e2e --test api

mod support;

use facturas_e2e::runner::{self, RunnerConfig};

#[tokio::main]
async fn main() {
    runner::init_tracing();

    let live = std::env::var("E2E_LIVE").map_or(false, |v| v == "1");
    let _mock = if live {
        None
    } else {
        let mock = support::spawn_mock_api().await;
        std::env::set_var("API_BASE_URL", &mock.base_url);
        std::env::set_var("AUTH_TOKEN", support::TOKEN);
        Some(mock)
    };

    if let Err(e) = runner::install_config() {
        panic!("Invalid suite configuration: {}", e);
    }

    let features = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/features/api");
    runner::run_features(RunnerConfig::new(features)).await;
}
