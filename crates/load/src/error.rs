//! Load tool error types

use thiserror::Error;

pub type Result<T> = std::result::Result<T, LoadError>;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Invalid scenario: {0}")]
    InvalidScenario(String),

    #[error("Invalid duration '{0}' (expected e.g. 300ms, 30s, 2m)")]
    InvalidDuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Scenario file error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Common(#[from] facturas_common::Error),
}
