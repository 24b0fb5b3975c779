//! Landing screen after a successful login

use tracing::info;

use super::{ANY_ELEMENT, ELEMENT_WAIT};
use crate::browser::{Browser, TextPattern};
use crate::error::E2eResult;

const WELCOME_TEXT: &str = "Dashboard|Inicio|Bienvenido|Resumen";

pub struct DashboardPage<'b> {
    browser: &'b mut dyn Browser,
}

impl<'b> DashboardPage<'b> {
    pub fn new(browser: &'b mut dyn Browser) -> Self {
        Self { browser }
    }

    /// A welcome or title text is visible
    pub async fn expect_loaded(&mut self) -> E2eResult<()> {
        info!("Waiting for the dashboard to load");
        self.browser
            .wait_for_text(ANY_ELEMENT, &TextPattern::regex(WELCOME_TEXT), ELEMENT_WAIT)
            .await
    }
}
