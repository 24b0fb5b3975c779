//! Cucumber world: one instance per scenario

use std::sync::Arc;

use cucumber::World;
use facturas_common::{ApiClient, SuiteConfig};
use tracing::debug;

use crate::browser::Browser;
use crate::context::ScenarioContext;
use crate::error::{E2eError, E2eResult};
use crate::pages::PendingCreation;
use crate::playwright::{PlaywrightConfig, PlaywrightDriver};

/// Browser session opened by the first UI step of a scenario
#[derive(Debug)]
pub struct UiSession {
    browser: Box<dyn Browser>,
}

impl UiSession {
    pub fn new(browser: Box<dyn Browser>) -> Self {
        Self { browser }
    }
}

#[derive(Debug, World)]
#[world(init = Self::new)]
pub struct InvoiceWorld {
    pub config: Arc<SuiteConfig>,
    pub api: ApiClient,
    pub ctx: ScenarioContext,
    ui: Option<UiSession>,
    /// Set by the UI creation step, consumed by the list check
    pub pending_creation: Option<PendingCreation>,
}

impl InvoiceWorld {
    pub fn new() -> Self {
        Self::with_config(crate::runner::suite_config())
    }

    pub fn with_config(config: Arc<SuiteConfig>) -> Self {
        Self {
            api: ApiClient::from_config(&config),
            config,
            ctx: ScenarioContext::new(),
            ui: None,
            pending_creation: None,
        }
    }

    /// Use an already running browser instead of launching Playwright
    pub fn with_browser(mut self, browser: Box<dyn Browser>) -> Self {
        self.ui = Some(UiSession::new(browser));
        self
    }

    /// The scenario's browser, launched on first use
    pub async fn browser(&mut self) -> E2eResult<&mut dyn Browser> {
        if self.ui.is_none() {
            debug!("Starting browser session for scenario");
            let driver = PlaywrightDriver::launch(&PlaywrightConfig::from(self.config.as_ref())).await?;
            self.ui = Some(UiSession::new(Box::new(driver)));
        }
        match self.ui.as_mut() {
            Some(session) => Ok(session.browser.as_mut()),
            None => Err(E2eError::NoBrowser),
        }
    }
}
