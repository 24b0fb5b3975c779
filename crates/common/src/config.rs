//! Suite configuration
//!
//! Values come from the process environment (optionally seeded from a
//! `.env` file). Every key has a literal fallback so the suite runs against
//! the QA environment out of the box.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{Error, Result};

pub const DEFAULT_BASE_URL: &str = "https://candidates-qa.contalink.com";
pub const DEFAULT_API_BASE_URL: &str = "https://candidates-api.contalink.com";
pub const DEFAULT_ACCESS_CODE: &str = "UXTY789@!!1";
pub const DEFAULT_BASE_PATH: &str = "/V1";

/// Suite configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteConfig {
    /// Frontend URL opened by the UI scenarios
    pub base_url: String,

    /// API base URL; step paths are appended to it verbatim
    pub api_base_url: String,

    /// Value sent in the `Authorization` header
    pub auth_token: String,

    /// Access code typed into the login screen
    pub access_code: String,

    /// Informational API base path (logged, never concatenated)
    pub base_path: String,

    /// Invoice used by the UI creation, search and delete flows
    pub invoice: InvoiceFixture,

    /// Whole-scenario retries in run mode
    pub retries: usize,

    /// Per-request timeout for API steps
    pub request_timeout: Duration,

    /// Browser settings for the UI scenarios
    pub browser: BrowserSettings,
}

/// Default invoice values for the UI flows
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceFixture {
    pub number: String,
    pub total: f64,
    pub status: String,
}

impl Default for InvoiceFixture {
    fn default() -> Self {
        Self {
            number: "FACTURA-CRIS".to_string(),
            total: 100.0,
            status: "Vigente".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowserKind {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl BrowserKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BrowserKind::Chromium => "chromium",
            BrowserKind::Firefox => "firefox",
            BrowserKind::Webkit => "webkit",
        }
    }
}

impl std::str::FromStr for BrowserKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "chromium" | "chrome" | "electron" => Ok(BrowserKind::Chromium),
            "firefox" => Ok(BrowserKind::Firefox),
            "webkit" => Ok(BrowserKind::Webkit),
            other => Err(format!("unknown browser '{}'", other)),
        }
    }
}

/// Browser launch settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserSettings {
    pub kind: BrowserKind,
    pub headless: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            kind: BrowserKind::Chromium,
            headless: true,
            viewport_width: 1366,
            viewport_height: 768,
        }
    }
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            auth_token: DEFAULT_ACCESS_CODE.to_string(),
            access_code: DEFAULT_ACCESS_CODE.to_string(),
            base_path: DEFAULT_BASE_PATH.to_string(),
            invoice: InvoiceFixture::default(),
            retries: 2,
            request_timeout: Duration::from_secs(30),
            browser: BrowserSettings::default(),
        }
    }
}

impl SuiteConfig {
    /// Load configuration from the environment, reading `.env` first if present
    pub fn from_env() -> Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!("Loaded environment overrides from {}", path.display());
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    ///
    /// Empty values count as unset, so `FOO=` falls back like a missing key.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let access_code = get("ACCESS_CODE")
            .or_else(|| get("AUTH_TOKEN"))
            .unwrap_or(defaults.access_code);
        let auth_token = get("AUTH_TOKEN").unwrap_or_else(|| access_code.clone());

        let invoice = InvoiceFixture {
            number: get("INVOICE_NUMBER").unwrap_or(defaults.invoice.number),
            total: parse_or("INVOICE_TOTAL", get("INVOICE_TOTAL"), defaults.invoice.total)?,
            status: get("INVOICE_STATUS").unwrap_or(defaults.invoice.status),
        };

        let browser = BrowserSettings {
            kind: match get("E2E_BROWSER") {
                Some(raw) => raw
                    .parse()
                    .map_err(|reason: String| Error::invalid_config("E2E_BROWSER", &raw, reason))?,
                None => defaults.browser.kind,
            },
            headless: parse_bool("E2E_HEADLESS", get("E2E_HEADLESS"), defaults.browser.headless)?,
            viewport_width: parse_or(
                "E2E_VIEWPORT_WIDTH",
                get("E2E_VIEWPORT_WIDTH"),
                defaults.browser.viewport_width,
            )?,
            viewport_height: parse_or(
                "E2E_VIEWPORT_HEIGHT",
                get("E2E_VIEWPORT_HEIGHT"),
                defaults.browser.viewport_height,
            )?,
        };

        let timeout_secs: u64 = parse_or(
            "E2E_REQUEST_TIMEOUT_SECS",
            get("E2E_REQUEST_TIMEOUT_SECS"),
            defaults.request_timeout.as_secs(),
        )?;

        Ok(Self {
            base_url: get("BASE_URL").unwrap_or(defaults.base_url),
            api_base_url: get("API_BASE_URL").unwrap_or(defaults.api_base_url),
            auth_token,
            access_code,
            base_path: get("BASE_PATH").unwrap_or(defaults.base_path),
            invoice,
            retries: parse_or("E2E_RETRIES", get("E2E_RETRIES"), defaults.retries)?,
            request_timeout: Duration::from_secs(timeout_secs),
            browser,
        })
    }
}

fn parse_or<T>(key: &str, raw: Option<String>, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|e: T::Err| Error::invalid_config(key, &value, e.to_string())),
        None => Ok(default),
    }
}

fn parse_bool(key: &str, raw: Option<String>, default: bool) -> Result<bool> {
    match raw.as_deref().map(|v| v.trim().to_ascii_lowercase()) {
        None => Ok(default),
        Some(v) if matches!(v.as_str(), "1" | "true" | "yes" | "on") => Ok(true),
        Some(v) if matches!(v.as_str(), "0" | "false" | "no" | "off") => Ok(false),
        Some(v) => Err(Error::invalid_config(key, &v, "expected a boolean")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_environment_is_empty() {
        let config = SuiteConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(config.auth_token, DEFAULT_ACCESS_CODE);
        assert_eq!(config.base_path, "/V1");
        assert_eq!(config.invoice.number, "FACTURA-CRIS");
        assert_eq!(config.invoice.total, 100.0);
        assert_eq!(config.invoice.status, "Vigente");
        assert_eq!(config.retries, 2);
        assert_eq!(config.browser.viewport_width, 1366);
        assert_eq!(config.browser.viewport_height, 768);
    }

    #[test]
    fn test_auth_token_falls_back_to_access_code() {
        let config = SuiteConfig::from_lookup(lookup(&[("ACCESS_CODE", "CODE-1")])).unwrap();
        assert_eq!(config.auth_token, "CODE-1");
        assert_eq!(config.access_code, "CODE-1");

        let config = SuiteConfig::from_lookup(lookup(&[
            ("ACCESS_CODE", "CODE-1"),
            ("AUTH_TOKEN", "TOKEN-2"),
        ]))
        .unwrap();
        assert_eq!(config.auth_token, "TOKEN-2");

        let config = SuiteConfig::from_lookup(lookup(&[("AUTH_TOKEN", "TOKEN-2")])).unwrap();
        assert_eq!(config.access_code, "TOKEN-2");
    }

    #[test]
    fn test_empty_value_counts_as_unset() {
        let config = SuiteConfig::from_lookup(lookup(&[("API_BASE_URL", "  ")])).unwrap();
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
    }

    #[test]
    fn test_invalid_total_is_rejected() {
        let err = SuiteConfig::from_lookup(lookup(&[("INVOICE_TOTAL", "cien")])).unwrap_err();
        assert!(err.to_string().contains("INVOICE_TOTAL"));
    }

    #[test]
    fn test_browser_settings_overrides() {
        let config = SuiteConfig::from_lookup(lookup(&[
            ("E2E_BROWSER", "firefox"),
            ("E2E_HEADLESS", "false"),
            ("E2E_VIEWPORT_WIDTH", "1920"),
        ]))
        .unwrap();
        assert_eq!(config.browser.kind, BrowserKind::Firefox);
        assert!(!config.browser.headless);
        assert_eq!(config.browser.viewport_width, 1920);

        assert!(SuiteConfig::from_lookup(lookup(&[("E2E_HEADLESS", "maybe")])).is_err());
        assert!(SuiteConfig::from_lookup(lookup(&[("E2E_BROWSER", "netscape")])).is_err());
    }
}
