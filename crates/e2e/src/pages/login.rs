//! Access screen: code entry, submit, access errors and logout

use std::time::Duration;

use tracing::info;

use super::{expect_success, DEFAULT_WAIT, ELEMENT_WAIT};
use crate::browser::{Browser, WaitState};
use crate::error::{ensure, E2eResult};

const LOGIN_PATH: &str = "/";
const ACCESS_INPUT: &str = "#access-code";
const SUBMIT_BUTTON: &str = r#"button[type="submit"]"#;
const ANY_SUBMIT_BUTTON: &str = r#"button[type="submit"], button#access-submit"#;
const DASHBOARD: &str = r#"[data-testid="dashboard"]"#;
const ACCESS_ERROR: &str = r#"[data-testid="access-error"]"#;
const MAIN_CONTENT: &str = "table, [data-testid='invoices-list'], [role='table'], .grid, .list";
const LOGOUT_BUTTON: &str = "xpath=/html/body/app-root/div/div/div/button";

/// Request the app makes right after a successful login
const INVOICES_GLOB: &str = "**/V1/invoices**";

const VISIT_WAIT: Duration = Duration::from_secs(15);
const ACCESS_SCREEN_WAIT: Duration = Duration::from_secs(8);

pub struct LoginPage<'b> {
    browser: &'b mut dyn Browser,
}

impl<'b> LoginPage<'b> {
    pub fn new(browser: &'b mut dyn Browser) -> Self {
        Self { browser }
    }

    /// Open the access screen and wait for the code input
    pub async fn visit(&mut self) -> E2eResult<()> {
        info!("Opening the access screen");
        self.browser.goto(LOGIN_PATH).await?;
        self.browser
            .wait_for(ACCESS_INPUT, WaitState::Visible, VISIT_WAIT)
            .await
    }

    pub async fn fill_access_code(&mut self, code: &str) -> E2eResult<()> {
        info!("Typing access code");
        self.browser.fill(ACCESS_INPUT, code, ELEMENT_WAIT).await
    }

    /// Click submit without waiting for any outcome
    pub async fn submit(&mut self) -> E2eResult<()> {
        info!("Submitting the access form");
        self.browser.click(SUBMIT_BUTTON, ELEMENT_WAIT).await
    }

    /// Click submit and require the post-login invoice load to succeed
    pub async fn submit_expect_success(&mut self) -> E2eResult<()> {
        info!("Submitting the access form, expecting the invoice list to load");
        let list = self.browser.arm_exchange("GET", INVOICES_GLOB).await?;
        self.browser.click(SUBMIT_BUTTON, ELEMENT_WAIT).await?;
        expect_success(self.browser, list, "invoice list after login").await?;
        Ok(())
    }

    pub async fn login_with(&mut self, code: &str) -> E2eResult<()> {
        self.visit().await?;
        self.fill_access_code(code).await?;
        self.submit().await
    }

    /// Type a code and press whichever submit button the screen renders
    pub async fn enter_access_code(&mut self, code: &str) -> E2eResult<()> {
        info!("Entering access code");
        self.browser
            .wait_for(ACCESS_INPUT, WaitState::Visible, ELEMENT_WAIT)
            .await?;
        self.browser.fill(ACCESS_INPUT, code, ELEMENT_WAIT).await?;
        self.browser.click(ANY_SUBMIT_BUTTON, ELEMENT_WAIT).await
    }

    pub async fn expect_dashboard(&mut self) -> E2eResult<()> {
        info!("Checking the access screen is gone");
        self.browser
            .wait_for(ACCESS_INPUT, WaitState::Detached, ELEMENT_WAIT)
            .await?;

        if self.browser.count(DASHBOARD).await? > 0 {
            self.browser
                .wait_for(DASHBOARD, WaitState::Visible, ELEMENT_WAIT)
                .await?;
        }

        self.browser
            .wait_for(MAIN_CONTENT, WaitState::Attached, ELEMENT_WAIT)
            .await
    }

    /// Access input gone and the URL no longer points at a login route
    pub async fn expect_left_login(&mut self) -> E2eResult<()> {
        self.browser
            .wait_for(ACCESS_INPUT, WaitState::Detached, ELEMENT_WAIT)
            .await?;
        let url = self.browser.current_url().await?;
        ensure(!url.contains("login"), || {
            format!("still on a login URL after entering the code: {}", url)
        })
    }

    /// A dedicated error element, or the input flagged as invalid
    pub async fn expect_access_error(&mut self) -> E2eResult<()> {
        info!("Checking the app reported an access error");
        if self.browser.count(ACCESS_ERROR).await? > 0 {
            return self
                .browser
                .wait_for(ACCESS_ERROR, WaitState::Visible, DEFAULT_WAIT)
                .await;
        }

        self.browser
            .wait_for(ACCESS_INPUT, WaitState::Attached, ACCESS_SCREEN_WAIT)
            .await?;
        let class = self.browser.attribute(ACCESS_INPUT, "class").await?;
        let aria = self.browser.attribute(ACCESS_INPUT, "aria-invalid").await?;
        ensure(marked_invalid(class.as_deref(), aria.as_deref()), || {
            "no access error shown and the code input is not marked invalid".to_string()
        })
    }

    pub async fn expect_access_screen(&mut self) -> E2eResult<()> {
        info!("Checking we are still on the access screen");
        self.browser
            .wait_for(ACCESS_INPUT, WaitState::Visible, ACCESS_SCREEN_WAIT)
            .await?;
        self.browser
            .wait_for(DASHBOARD, WaitState::Detached, DEFAULT_WAIT)
            .await
    }

    pub async fn logout(&mut self) -> E2eResult<()> {
        info!("Logging out");
        self.browser.click(LOGOUT_BUTTON, ELEMENT_WAIT).await?;
        self.browser
            .wait_for(ACCESS_INPUT, WaitState::Visible, ELEMENT_WAIT)
            .await
    }
}

/// Angular's `ng-invalid` class or `aria-invalid="true"`
fn marked_invalid(class: Option<&str>, aria_invalid: Option<&str>) -> bool {
    class.map_or(false, |c| c.contains("ng-invalid")) || aria_invalid == Some("true")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::fake::{FakeBrowser, FakeElement};
    use crate::error::E2eError;
    use serde_json::json;

    #[test]
    fn test_marked_invalid() {
        assert!(marked_invalid(Some("form-control ng-touched ng-invalid"), None));
        assert!(marked_invalid(None, Some("true")));
        assert!(!marked_invalid(Some("ng-valid"), Some("false")));
        assert!(!marked_invalid(None, None));
    }

    #[tokio::test]
    async fn test_login_with_types_and_submits() {
        let mut browser = FakeBrowser::new()
            .with(ACCESS_INPUT, FakeElement::default())
            .with(SUBMIT_BUTTON, FakeElement::text("Entrar"));

        LoginPage::new(&mut browser).login_with("ABC").await.unwrap();

        assert_eq!(
            browser.log,
            vec![
                "goto:/".to_string(),
                format!("fill:{}=ABC", ACCESS_INPUT),
                format!("click:{}", SUBMIT_BUTTON),
            ]
        );
    }

    #[tokio::test]
    async fn test_submit_expect_success_arms_before_click() {
        let mut browser = FakeBrowser::new()
            .with(SUBMIT_BUTTON, FakeElement::text("Entrar"))
            .with_exchange(200, json!({ "invoices": [] }));

        LoginPage::new(&mut browser).submit_expect_success().await.unwrap();

        assert_eq!(browser.log[0], format!("arm:GET {}", INVOICES_GLOB));
        assert_eq!(browser.log[1], format!("click:{}", SUBMIT_BUTTON));
        assert_eq!(browser.log[2], "await:1");
    }

    #[tokio::test]
    async fn test_submit_expect_success_rejects_error_status() {
        let mut browser = FakeBrowser::new()
            .with(SUBMIT_BUTTON, FakeElement::text("Entrar"))
            .with_exchange(401, json!({ "error": "unauthorized" }));

        let err = LoginPage::new(&mut browser).submit_expect_success().await.unwrap_err();
        assert!(err.to_string().contains("401"));
    }

    #[tokio::test]
    async fn test_access_error_prefers_dedicated_element() {
        let mut browser = FakeBrowser::new()
            .with(ACCESS_ERROR, FakeElement::text("Código inválido"))
            .with(ACCESS_INPUT, FakeElement::default());
        assert!(LoginPage::new(&mut browser).expect_access_error().await.is_ok());
    }

    #[tokio::test]
    async fn test_access_error_falls_back_to_invalid_input() {
        let mut flagged = FakeBrowser::new()
            .with(ACCESS_INPUT, FakeElement::default().attr("class", "ng-dirty ng-invalid"));
        assert!(LoginPage::new(&mut flagged).expect_access_error().await.is_ok());

        let mut clean = FakeBrowser::new()
            .with(ACCESS_INPUT, FakeElement::default().attr("class", "ng-valid"));
        let err = LoginPage::new(&mut clean).expect_access_error().await.unwrap_err();
        assert!(matches!(err, E2eError::AssertionFailed(_)));
    }

    #[tokio::test]
    async fn test_dashboard_requires_access_input_gone() {
        let mut still_login = FakeBrowser::new()
            .with(ACCESS_INPUT, FakeElement::default())
            .with("table", FakeElement::default());
        let err = LoginPage::new(&mut still_login).expect_dashboard().await.unwrap_err();
        assert!(matches!(err, E2eError::Timeout(_)));

        let mut inside = FakeBrowser::new()
            .with(DASHBOARD, FakeElement::default())
            .with(MAIN_CONTENT, FakeElement::default());
        assert!(LoginPage::new(&mut inside).expect_dashboard().await.is_ok());
    }

    #[tokio::test]
    async fn test_left_login_checks_url() {
        let mut browser = FakeBrowser::new();
        browser.url = "https://app.test/login?next=/".into();
        assert!(LoginPage::new(&mut browser).expect_left_login().await.is_err());

        browser.url = "https://app.test/invoices".into();
        assert!(LoginPage::new(&mut browser).expect_left_login().await.is_ok());
    }

    #[tokio::test]
    async fn test_logout_returns_to_access_screen() {
        let mut browser = FakeBrowser::new().with(LOGOUT_BUTTON, FakeElement::text("Salir"));
        browser
            .on_click
            .insert(LOGOUT_BUTTON.to_string(), vec![(ACCESS_INPUT.to_string(), FakeElement::default())]);

        let mut page = LoginPage::new(&mut browser);
        page.logout().await.unwrap();
        page.expect_access_screen().await.unwrap();
    }
}
