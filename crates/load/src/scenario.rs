//! Load scenario definition
//!
//! A scenario starts from built-in defaults, may be overlaid by a YAML file
//! and finally by command-line flags.

use std::path::Path;
use std::time::Duration;

use facturas_common::config::{DEFAULT_ACCESS_CODE, DEFAULT_API_BASE_URL};
use serde::{Deserialize, Serialize};

use crate::checks::Check;
use crate::error::{LoadError, Result};

pub const DEFAULT_ENDPOINT: &str = "/V1/invoices?page=1&invoice_number=FAC-7081986";

/// Pass/fail limits evaluated on the aggregate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    /// Failed requests over total requests, as a fraction
    pub max_error_rate: f64,

    /// 95th percentile request duration in milliseconds
    pub max_p95_ms: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            max_error_rate: 0.05,
            max_p95_ms: 800.0,
        }
    }
}

/// Constant-arrival-rate scenario
#[derive(Debug, Clone)]
pub struct LoadScenario {
    pub base_url: String,
    pub endpoint: String,
    pub token: String,

    /// Iterations started per `time_unit`
    pub rate: u32,
    pub time_unit: Duration,
    pub duration: Duration,

    pub pre_allocated_vus: usize,
    pub max_vus: usize,

    /// Pause at the end of every iteration
    pub think_time: Duration,

    /// How long in-flight iterations may finish after `duration`
    pub graceful_stop: Duration,

    pub request_timeout: Duration,
    pub thresholds: Thresholds,
    pub checks: Vec<Check>,
}

impl Default for LoadScenario {
    fn default() -> Self {
        let thresholds = Thresholds::default();
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            token: DEFAULT_ACCESS_CODE.to_string(),
            rate: 20,
            time_unit: Duration::from_secs(1),
            duration: Duration::from_secs(30),
            pre_allocated_vus: 20,
            max_vus: 50,
            think_time: Duration::from_millis(300),
            graceful_stop: Duration::from_secs(30),
            request_timeout: Duration::from_secs(60),
            checks: Check::defaults(thresholds.max_p95_ms),
            thresholds,
        }
    }
}

impl LoadScenario {
    /// Full URL hit by every iteration
    pub fn target_url(&self) -> String {
        format!("{}{}", self.base_url, self.endpoint)
    }

    /// Gap between two iteration starts
    pub fn iteration_interval(&self) -> Duration {
        self.time_unit / self.rate.max(1)
    }

    pub fn validate(&self) -> Result<()> {
        if self.rate == 0 {
            return Err(LoadError::InvalidScenario("rate must be greater than 0".into()));
        }
        if self.time_unit.is_zero() || self.duration.is_zero() {
            return Err(LoadError::InvalidScenario(
                "time unit and duration must be greater than 0".into(),
            ));
        }
        if (self.time_unit / self.rate).is_zero() {
            return Err(LoadError::InvalidScenario(format!(
                "rate {} is too high for a time unit of {:?}",
                self.rate, self.time_unit
            )));
        }
        if self.max_vus == 0 {
            return Err(LoadError::InvalidScenario("max VUs must be greater than 0".into()));
        }
        if self.pre_allocated_vus > self.max_vus {
            return Err(LoadError::InvalidScenario(format!(
                "pre-allocated VUs ({}) exceed max VUs ({})",
                self.pre_allocated_vus, self.max_vus
            )));
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(LoadError::InvalidScenario(format!(
                "base URL must be http(s): {}",
                self.base_url
            )));
        }
        Ok(())
    }

    /// Overlay the values present in a scenario file
    pub fn apply(&mut self, file: ScenarioFile) -> Result<()> {
        if let Some(v) = file.base_url {
            self.base_url = v;
        }
        if let Some(v) = file.endpoint {
            self.endpoint = v;
        }
        if let Some(v) = file.token {
            self.token = v;
        }
        if let Some(v) = file.rate {
            self.rate = v;
        }
        if let Some(v) = file.time_unit {
            self.time_unit = parse_duration(&v)?;
        }
        if let Some(v) = file.duration {
            self.duration = parse_duration(&v)?;
        }
        if let Some(v) = file.pre_allocated_vus {
            self.pre_allocated_vus = v;
        }
        if let Some(v) = file.max_vus {
            self.max_vus = v;
        }
        if let Some(v) = file.think_time {
            self.think_time = parse_duration(&v)?;
        }
        if let Some(v) = file.graceful_stop {
            self.graceful_stop = parse_duration(&v)?;
        }
        if let Some(v) = file.request_timeout {
            self.request_timeout = parse_duration(&v)?;
        }
        if let Some(thresholds) = file.thresholds {
            if let Some(v) = thresholds.max_error_rate {
                self.thresholds.max_error_rate = v;
            }
            if let Some(v) = thresholds.max_p95_ms {
                self.thresholds.max_p95_ms = v;
                self.checks = Check::defaults(v);
            }
        }
        Ok(())
    }

    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let file: ScenarioFile = serde_yaml::from_str(&text)?;
        let mut scenario = Self::default();
        scenario.apply(file)?;
        Ok(scenario)
    }
}

/// Scenario file layout; every key is optional
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioFile {
    pub base_url: Option<String>,
    pub endpoint: Option<String>,
    pub token: Option<String>,
    pub rate: Option<u32>,
    pub time_unit: Option<String>,
    pub duration: Option<String>,
    pub pre_allocated_vus: Option<usize>,
    pub max_vus: Option<usize>,
    pub think_time: Option<String>,
    pub graceful_stop: Option<String>,
    pub request_timeout: Option<String>,
    pub thresholds: Option<ThresholdsFile>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ThresholdsFile {
    pub max_error_rate: Option<f64>,
    pub max_p95_ms: Option<f64>,
}

/// Parse `300ms`, `30s`, `2m` or `1h`; a bare number is seconds
pub fn parse_duration(text: &str) -> Result<Duration> {
    let text = text.trim();
    let invalid = || LoadError::InvalidDuration(text.to_string());

    let split = text
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(text.len());
    let (number, unit) = text.split_at(split);
    let value: f64 = number.parse().map_err(|_| invalid())?;

    let seconds = match unit.trim() {
        "ms" => value / 1000.0,
        "" | "s" => value,
        "m" => value * 60.0,
        "h" => value * 3600.0,
        _ => return Err(invalid()),
    };
    Duration::try_from_secs_f64(seconds).map_err(|_| invalid())
}
