//! Browser seam used by the page objects
//!
//! Page objects only talk to [`Browser`]. The production implementation is
//! [`crate::playwright::PlaywrightDriver`]; tests use an in-memory fake.
//!
//! Network waits follow a fixed order: arm the expectation with
//! [`Browser::arm_exchange`] *before* the UI action that triggers the request,
//! then [`Browser::await_exchange`], and only then inspect the DOM.

use std::fmt::Debug;
use std::time::Duration;

use async_trait::async_trait;
use regex::RegexBuilder;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::E2eResult;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitState {
    #[default]
    Visible,
    Hidden,
    Attached,
    Detached,
}

/// Text matcher, shipped to the driver as a regex source plus flags
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextPattern {
    pub source: String,
    pub case_insensitive: bool,
}

impl TextPattern {
    /// Case-insensitive regular expression, like `/Facturas/i`
    pub fn regex(source: &str) -> Self {
        Self {
            source: source.to_string(),
            case_insensitive: true,
        }
    }

    /// Case-sensitive substring match
    pub fn literal(text: &str) -> Self {
        Self {
            source: regex::escape(text),
            case_insensitive: false,
        }
    }

    pub fn flags(&self) -> &'static str {
        if self.case_insensitive {
            "i"
        } else {
            ""
        }
    }

    pub fn is_match(&self, text: &str) -> E2eResult<bool> {
        let re = RegexBuilder::new(&self.source)
            .case_insensitive(self.case_insensitive)
            .build()?;
        Ok(re.is_match(text))
    }
}

/// One `<option>` of a `<select>`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    pub text: String,
    pub value: Option<String>,
}

/// How to pick an option
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "by", content = "value", rename_all = "snake_case")]
pub enum OptionTarget {
    Label(String),
    Value(String),
}

/// Token for a network expectation armed before a UI action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExchangeHandle(pub u64);

/// A request/response pair observed by the browser
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkExchange {
    pub status: u16,
    #[serde(default)]
    pub body: Value,
}

impl NetworkExchange {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Browser operations needed by the page objects.
///
/// Element operations act on the first match of the selector. Selectors are
/// CSS, or XPath when prefixed with `xpath=`.
#[async_trait]
pub trait Browser: Send + Debug {
    /// Open a path relative to the app base URL
    async fn goto(&mut self, path: &str) -> E2eResult<()>;

    async fn wait_for(&mut self, selector: &str, state: WaitState, timeout: Duration) -> E2eResult<()>;

    async fn count(&mut self, selector: &str) -> E2eResult<usize>;

    /// Clear the field, then type `value`
    async fn fill(&mut self, selector: &str, value: &str, timeout: Duration) -> E2eResult<()>;

    async fn click(&mut self, selector: &str, timeout: Duration) -> E2eResult<()>;

    /// Click the first element matching `selector` whose text matches `pattern`
    async fn click_matching(
        &mut self,
        selector: &str,
        pattern: &TextPattern,
        timeout: Duration,
    ) -> E2eResult<()>;

    /// Wait until an element matching `selector` with matching text is visible
    async fn wait_for_text(
        &mut self,
        selector: &str,
        pattern: &TextPattern,
        timeout: Duration,
    ) -> E2eResult<()>;

    /// `textContent` of every match
    async fn texts(&mut self, selector: &str) -> E2eResult<Vec<String>>;

    /// `textContent` of every match whose text matches `pattern`
    async fn texts_matching(&mut self, selector: &str, pattern: &TextPattern) -> E2eResult<Vec<String>>;

    async fn attribute(&mut self, selector: &str, name: &str) -> E2eResult<Option<String>>;

    async fn select_options(&mut self, selector: &str) -> E2eResult<Vec<SelectOption>>;

    async fn select(&mut self, selector: &str, target: &OptionTarget) -> E2eResult<()>;

    async fn selected_text(&mut self, selector: &str) -> E2eResult<Option<String>>;

    async fn is_checked(&mut self, selector: &str) -> E2eResult<bool>;

    async fn check(&mut self, selector: &str) -> E2eResult<()>;

    /// Click `target` inside the first `row_selector` element matching `row_pattern`
    async fn click_in_row(
        &mut self,
        row_selector: &str,
        row_pattern: &TextPattern,
        target: &str,
        timeout: Duration,
    ) -> E2eResult<()>;

    async fn current_url(&mut self) -> E2eResult<String>;

    /// Start listening for a response to `method` on a URL matching `url_glob`
    async fn arm_exchange(&mut self, method: &str, url_glob: &str) -> E2eResult<ExchangeHandle>;

    async fn await_exchange(
        &mut self,
        handle: ExchangeHandle,
        timeout: Duration,
    ) -> E2eResult<NetworkExchange>;

    async fn close(&mut self) -> E2eResult<()>;
}

/// Translate a Cypress-style URL glob into an anchored regex source.
///
/// `**` matches anything, `*` anything but `/`, `?` any single character.
pub fn glob_to_regex(glob: &str) -> String {
    let mut out = String::with_capacity(glob.len() + 8);
    out.push('^');
    let mut chars = glob.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' => {
                if chars.peek() == Some(&'*') {
                    chars.next();
                    out.push_str(".*");
                } else {
                    out.push_str("[^/]*");
                }
            }
            '?' => out.push('.'),
            other => out.push_str(&regex::escape(&other.to_string())),
        }
    }
    out.push('$');
    out
}
