//! Page objects for the Facturas web app
//!
//! Each page wraps a borrowed [`Browser`] and owns the selectors of its
//! screen. Step bindings never touch selectors directly.

pub mod dashboard;
pub mod invoices;
pub mod login;

use std::time::Duration;

use tracing::debug;

pub use dashboard::DashboardPage;
pub use invoices::{InvoicesPage, PendingCreation, StatusChoice};
pub use login::LoginPage;

use crate::browser::{Browser, ExchangeHandle, NetworkExchange};
use crate::error::{ensure, E2eResult};

/// Matches any rendered element; used for free-text lookups
pub(crate) const ANY_ELEMENT: &str = "body *";

pub(crate) const DEFAULT_WAIT: Duration = Duration::from_secs(4);
pub(crate) const ELEMENT_WAIT: Duration = Duration::from_secs(10);
pub(crate) const NETWORK_WAIT: Duration = Duration::from_secs(20);

/// Await an armed exchange and require a 2xx response
pub(crate) async fn expect_success(
    browser: &mut dyn Browser,
    handle: ExchangeHandle,
    what: &str,
) -> E2eResult<NetworkExchange> {
    let exchange = browser.await_exchange(handle, NETWORK_WAIT).await?;
    debug!(status = exchange.status, "{} responded", what);
    ensure(exchange.is_success(), || {
        format!("{} responded with status {}", what, exchange.status)
    })?;
    Ok(exchange)
}
