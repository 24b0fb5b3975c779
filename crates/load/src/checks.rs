//! Per-response checks
//!
//! Checks are recorded for the summary and never stop an iteration.

use std::time::Duration;

/// What an iteration observed
#[derive(Debug, Clone)]
pub struct Observation {
    /// `None` when the request never got a response
    pub status: Option<u16>,
    pub elapsed: Duration,
    pub body: Option<String>,
}

impl Observation {
    /// Transport error or status >= 400
    pub fn is_failure(&self) -> bool {
        self.status.map_or(true, |s| s >= 400)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Check {
    Status(u16),
    DurationBelow(f64),
    BodyContains(String),
}

impl Check {
    /// Status 200, under the latency limit, body mentions `invoice_number`
    pub fn defaults(max_ms: f64) -> Vec<Check> {
        vec![
            Check::Status(200),
            Check::DurationBelow(max_ms),
            Check::BodyContains("invoice_number".to_string()),
        ]
    }

    pub fn name(&self) -> String {
        match self {
            Check::Status(code) => format!("✅ Código {}", code),
            Check::DurationBelow(ms) => format!("⚡ Menos de {}ms", ms),
            Check::BodyContains(text) => format!("📦 Contiene '{}'", text),
        }
    }

    pub fn evaluate(&self, observation: &Observation) -> bool {
        match self {
            Check::Status(code) => observation.status == Some(*code),
            Check::DurationBelow(ms) => (observation.elapsed.as_secs_f64() * 1000.0) < *ms,
            Check::BodyContains(text) => observation
                .body
                .as_deref()
                .map_or(false, |body| body.contains(text.as_str())),
        }
    }
}
