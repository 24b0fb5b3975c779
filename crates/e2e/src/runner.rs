//! Feature runner: wires the cucumber runner to the suite configuration

use std::path::PathBuf;
use std::sync::Arc;

use cucumber::World;
use facturas_common::SuiteConfig;
use once_cell::sync::OnceCell;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::E2eResult;
use crate::world::InvoiceWorld;

static SUITE_CONFIG: OnceCell<Arc<SuiteConfig>> = OnceCell::new();

/// Read and validate the environment configuration once for the whole run.
///
/// Later calls return the configuration installed by the first one.
pub fn install_config() -> E2eResult<Arc<SuiteConfig>> {
    if let Some(config) = SUITE_CONFIG.get() {
        return Ok(config.clone());
    }
    let config = Arc::new(SuiteConfig::from_env()?);
    info!(
        base_url = %config.base_url,
        api_base_url = %config.api_base_url,
        retries = config.retries,
        browser = config.browser.kind.as_str(),
        "Suite configuration loaded"
    );
    Ok(SUITE_CONFIG.get_or_init(|| config).clone())
}

/// Configuration seen by every scenario world
pub fn suite_config() -> Arc<SuiteConfig> {
    match SUITE_CONFIG.get() {
        Some(config) => config.clone(),
        None => {
            warn!("Suite configuration not installed, using defaults");
            Arc::new(SuiteConfig::default())
        }
    }
}

/// Initialize logging for a harness; `RUST_LOG` overrides the `info` default
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Runner configuration
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Feature file or directory
    pub features: PathBuf,

    /// Run only scenarios carrying this tag (on the scenario or its feature)
    pub tag: Option<String>,

    /// Whole-scenario retries
    pub retries: usize,

    /// Scenarios share no state, so they may run side by side
    pub max_concurrent: usize,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            features: PathBuf::from("tests/features"),
            tag: None,
            retries: suite_config().retries,
            max_concurrent: 4,
        }
    }
}

impl RunnerConfig {
    pub fn new(features: impl Into<PathBuf>) -> Self {
        Self {
            features: features.into(),
            ..Default::default()
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into().trim_start_matches('@').to_string());
        self
    }

    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent.max(1);
        self
    }
}

/// Whether a scenario is selected by `tag`
pub fn tag_selects(tag: Option<&str>, feature_tags: &[String], scenario_tags: &[String]) -> bool {
    match tag {
        None => true,
        Some(tag) => feature_tags.iter().chain(scenario_tags).any(|t| t == tag),
    }
}

/// Run the features and exit non-zero if any scenario failed
pub async fn run_features(config: RunnerConfig) {
    info!(
        features = %config.features.display(),
        tag = config.tag.as_deref().unwrap_or("-"),
        retries = config.retries,
        max_concurrent = config.max_concurrent,
        "Running features"
    );

    let tag = config.tag;
    InvoiceWorld::cucumber()
        .max_concurrent_scenarios(config.max_concurrent)
        .retries(config.retries)
        .fail_on_skipped()
        .filter_run_and_exit(config.features, move |feature, _rule, scenario| {
            tag_selects(tag.as_deref(), &feature.tags, &scenario.tags)
        })
        .await;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(list: &[&str]) -> Vec<String> {
        list.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn test_tag_filter() {
        assert!(tag_selects(None, &[], &[]));
        assert!(tag_selects(Some("ui"), &tags(&["ui"]), &[]));
        assert!(tag_selects(Some("smoke"), &tags(&["ui"]), &tags(&["smoke"])));
        assert!(!tag_selects(Some("api"), &tags(&["ui"]), &tags(&["smoke"])));
    }

    #[test]
    fn test_runner_config_builders() {
        let config = RunnerConfig::new("tests/features/ui")
            .with_tag("@ui")
            .with_max_concurrent(0);
        assert_eq!(config.tag.as_deref(), Some("ui"));
        assert_eq!(config.max_concurrent, 1);
        assert_eq!(config.features, PathBuf::from("tests/features/ui"));
    }
}
