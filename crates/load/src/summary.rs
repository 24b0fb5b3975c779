//! Run summary and its renderings: console, GitHub Actions annotations,
//! HTML report and JSON export.

use std::fmt::Write as _;
use std::path::Path;

use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};
use serde::Serialize;

use crate::error::Result;
use crate::executor::RunOutcome;
use crate::metrics::{CheckStats, TrendStats};
use crate::scenario::{LoadScenario, Thresholds};

const RULE: &str = "══════════════════════════════════════════════════════════════";

/// Outcome of one threshold expression
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThresholdResult {
    pub metric: &'static str,
    pub expression: String,
    pub observed: Option<f64>,
    pub passed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub endpoint: String,
    pub duration_secs: f64,
    pub rate: u32,
    pub time_unit_secs: f64,
    pub elapsed_secs: f64,

    pub requests: u64,
    pub failed_requests: u64,
    /// Fraction of failed requests, unknown without requests
    pub error_rate: Option<f64>,
    /// Request durations in milliseconds, unknown without samples
    pub durations: Option<TrendStats>,

    pub iterations: u64,
    pub dropped_iterations: u64,
    pub interrupted_iterations: u64,
    pub peak_vus: u64,

    pub checks: Vec<CheckStats>,
    pub limits: Thresholds,
    pub thresholds: Vec<ThresholdResult>,

    /// Error rate under the limit
    pub stable: bool,
    /// p95 known and under the limit
    pub latency_acceptable: bool,
    pub thresholds_passed: bool,
}

impl Summary {
    pub fn new(scenario: &LoadScenario, outcome: &RunOutcome) -> Self {
        let snapshot = &outcome.snapshot;
        let limits = scenario.thresholds;
        let error_rate = snapshot.error_rate();
        let p95 = snapshot.durations.map(|d| d.p95);

        // A threshold without data is not crossed
        let thresholds = vec![
            ThresholdResult {
                metric: "http_req_failed",
                expression: format!("rate<{}", limits.max_error_rate),
                observed: error_rate,
                passed: error_rate.map_or(true, |r| r < limits.max_error_rate),
            },
            ThresholdResult {
                metric: "http_req_duration",
                expression: format!("p(95)<{}", limits.max_p95_ms),
                observed: p95,
                passed: p95.map_or(true, |p| p < limits.max_p95_ms),
            },
        ];
        let thresholds_passed = thresholds.iter().all(|t| t.passed);

        Self {
            endpoint: scenario.target_url(),
            duration_secs: scenario.duration.as_secs_f64(),
            rate: scenario.rate,
            time_unit_secs: scenario.time_unit.as_secs_f64(),
            elapsed_secs: outcome.elapsed.as_secs_f64(),
            requests: snapshot.requests,
            failed_requests: snapshot.failed_requests,
            error_rate,
            durations: snapshot.durations,
            iterations: snapshot.iterations,
            dropped_iterations: snapshot.dropped_iterations,
            interrupted_iterations: snapshot.interrupted_iterations,
            peak_vus: snapshot.peak_vus,
            checks: snapshot.checks.clone(),
            stable: error_rate.unwrap_or(0.0) < limits.max_error_rate,
            latency_acceptable: p95.map_or(false, |p| p < limits.max_p95_ms),
            limits,
            thresholds,
            thresholds_passed,
        }
    }

    /// Error rate as a percentage with two decimals, `0.00` when unknown
    pub fn error_percent_text(&self) -> String {
        format!("{:.2}", self.error_rate.unwrap_or(0.0) * 100.0)
    }

    pub fn avg_text(&self) -> String {
        two_decimals_or_na(self.durations.map(|d| d.avg))
    }

    pub fn p95_text(&self) -> String {
        two_decimals_or_na(self.durations.map(|d| d.p95))
    }

    fn frequency_text(&self) -> String {
        if self.time_unit_secs == 1.0 {
            format!("{} peticiones por segundo", self.rate)
        } else {
            format!(
                "{} peticiones cada {} segundos",
                self.rate,
                plain_number(self.time_unit_secs)
            )
        }
    }

    fn error_limit_percent(&self) -> String {
        plain_number(self.limits.max_error_rate * 100.0)
    }

    fn p95_limit(&self) -> String {
        plain_number(self.limits.max_p95_ms)
    }

    /// Console block printed at the end of a run
    pub fn render_console(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out);
        let _ = writeln!(out, "{}", RULE);
        let _ = writeln!(out, "📘 RESULTADOS DEL TEST DE PERFORMANCE");
        let _ = writeln!(out, "{}", RULE);
        let _ = writeln!(out, "🔹 Endpoint probado:");
        let _ = writeln!(out, "   {}", self.endpoint);
        let _ = writeln!(out);
        let _ = writeln!(out, "🔹 Escenario:");
        let _ = writeln!(out, "   - Duración: {} segundos", plain_number(self.duration_secs));
        let _ = writeln!(out, "   - Frecuencia: {}", self.frequency_text());
        let _ = writeln!(out, "   - Total de peticiones: {}", self.requests);
        let _ = writeln!(out);
        let _ = writeln!(out, "🔹 Resultados:");
        let _ = writeln!(
            out,
            "   - Tasa de errores: {}%  (esperado < {}%)",
            self.error_percent_text(),
            self.error_limit_percent()
        );
        let _ = writeln!(out, "   - Tiempo promedio: {} ms", self.avg_text());
        let _ = writeln!(
            out,
            "   - Percentil 95: {} ms  (esperado < {} ms)",
            self.p95_text(),
            self.p95_limit()
        );
        if let Some(d) = &self.durations {
            let _ = writeln!(
                out,
                "   - min/med/max/p90: {:.2} / {:.2} / {:.2} / {:.2} ms",
                d.min, d.med, d.max, d.p90
            );
        }
        let _ = writeln!(
            out,
            "   - Iteraciones: {} completadas, {} descartadas, {} interrumpidas (VUs máx. {})",
            self.iterations, self.dropped_iterations, self.interrupted_iterations, self.peak_vus
        );
        let _ = writeln!(out);
        let _ = writeln!(out, "🔹 Conclusión:");
        let _ = writeln!(
            out,
            "   {}",
            if self.stable {
                "✅ Estable y sin errores significativos."
            } else {
                "⚠️ Hubo fallas o lentitud."
            }
        );
        let _ = writeln!(
            out,
            "   {}",
            if self.latency_acceptable {
                "✅ Buen tiempo de respuesta general."
            } else {
                "⚠️ El servicio responde más lento de lo esperado."
            }
        );
        let _ = writeln!(out);
        let _ = writeln!(out, "{}", RULE);
        out
    }

    /// Check pass/fail counts as a table
    pub fn render_checks_table(&self) -> String {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(vec!["Check", "✓", "✗", "%"]);
        for check in &self.checks {
            table.add_row(vec![
                Cell::new(&check.name),
                Cell::new(check.passes),
                Cell::new(check.fails),
                Cell::new(
                    check
                        .pass_rate()
                        .map(|r| format!("{:.2}", r * 100.0))
                        .unwrap_or_else(|| "-".to_string()),
                ),
            ]);
        }
        table.to_string()
    }

    /// GitHub Actions workflow commands (`::group::`, `::notice::`, ...)
    pub fn render_github(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "::group::Resumen k6 – invoices");
        let _ = writeln!(out, "endpoint={}", self.endpoint);
        let _ = writeln!(out, "total_reqs={}", self.requests);
        let _ = writeln!(out, "avg_ms={}", self.avg_text());
        let _ = writeln!(out, "p95_ms={}", self.p95_text());
        let _ = writeln!(out, "error_rate={}%", self.error_percent_text());

        let limit = self.error_limit_percent();
        if self.stable {
            let _ = writeln!(out, "::notice::Tasa de errores dentro del objetivo (<{}%)", limit);
        } else {
            let _ = writeln!(
                out,
                "::warning::La tasa de errores fue mayor o igual al {}%",
                limit
            );
        }

        // An unknown p95 is not reported as a warning
        let limit = self.p95_limit();
        let slow = self
            .durations
            .map_or(false, |d| d.p95 >= self.limits.max_p95_ms);
        if slow {
            let _ = writeln!(out, "::warning::El p95 estuvo por encima de {}ms", limit);
        } else {
            let _ = writeln!(out, "::notice::p95 dentro del objetivo (<{}ms)", limit);
        }
        let _ = writeln!(out, "::endgroup::");
        out
    }

    /// Standalone HTML report
    pub fn render_html(&self, command: &str) -> String {
        let conclusion_errors = if self.stable {
            r#"<span class="ok">✔ El servicio fue estable y sin errores graves.</span>"#
        } else {
            r#"<span class="warn">✖ Se detectaron errores durante la ejecución.</span>"#
        };
        let conclusion_latency = if self.latency_acceptable {
            r#"<span class="ok">✔ Los tiempos de respuesta fueron aceptables.</span>"#
        } else {
            r#"<span class="warn">✖ El servicio respondió más lento de lo esperado.</span>"#
        };

        let mut check_rows = String::new();
        for check in &self.checks {
            let _ = writeln!(
                check_rows,
                "      <tr><td>{}</td><td>{}</td><td>{}</td></tr>",
                escape_html(&check.name),
                check.passes,
                check.fails
            );
        }

        format!(
            r#"<!DOCTYPE html>
<html lang="es">
<head>
  <meta charset="UTF-8" />
  <title>Reporte de Performance - Contalink API</title>
  <style>
    body {{ font-family: Arial, sans-serif; background: #f9f9f9; color: #333; margin: 2rem; }}
    h1 {{ color: #2e7d32; }}
    .card {{ background: white; padding: 1.5rem 2rem; margin-bottom: 1rem;
            border-radius: 8px; box-shadow: 0 2px 6px rgba(0,0,0,.1); }}
    table {{ width: 100%; border-collapse: collapse; margin-top: 1rem; }}
    th, td {{ padding: .6rem .8rem; border-bottom: 1px solid #eee; text-align: left; }}
    th {{ background: #fafafa; }}
    .ok {{ color: #2e7d32; font-weight: bold; }}
    .warn {{ color: #c62828; font-weight: bold; }}
  </style>
</head>
<body>
  <h1>Reporte de Performance - API Contalink</h1>

  <div class="card">
    <h2>Resumen de la prueba</h2>
    <p><strong>Endpoint:</strong> {endpoint}</p>
    <p><strong>Duración:</strong> {duration} segundos</p>
    <p><strong>Frecuencia:</strong> {frequency}</p>
    <p><strong>Total de peticiones:</strong> {requests}</p>
  </div>

  <div class="card">
    <h2>Métricas principales</h2>
    <table>
      <tr><th>Métrica</th><th>Valor</th><th>Objetivo</th></tr>
      <tr><td>Tasa de errores</td><td>{errors}%</td><td>&lt; {error_limit}%</td></tr>
      <tr><td>Promedio (ms)</td><td>{avg}</td><td>-</td></tr>
      <tr><td>p95 (ms)</td><td>{p95}</td><td>&lt; {p95_limit}</td></tr>
      <tr><td>Iteraciones descartadas</td><td>{dropped}</td><td>-</td></tr>
    </table>
  </div>

  <div class="card">
    <h2>Checks</h2>
    <table>
      <tr><th>Check</th><th>Correctos</th><th>Fallidos</th></tr>
{check_rows}    </table>
  </div>

  <div class="card">
    <h2>Conclusión</h2>
    <p>{conclusion_errors}</p>
    <p>{conclusion_latency}</p>
  </div>

  <div class="card">
    <h2>Comando usado</h2>
    <code>{command}</code>
  </div>
</body>
</html>
"#,
            endpoint = escape_html(&self.endpoint),
            duration = plain_number(self.duration_secs),
            frequency = self.frequency_text(),
            requests = self.requests,
            errors = self.error_percent_text(),
            error_limit = self.error_limit_percent(),
            avg = self.avg_text(),
            p95 = self.p95_text(),
            p95_limit = self.p95_limit(),
            dropped = self.dropped_iterations,
            check_rows = check_rows,
            conclusion_errors = conclusion_errors,
            conclusion_latency = conclusion_latency,
            command = escape_html(command),
        )
    }

    pub fn write_html(&self, path: &Path, command: &str) -> Result<()> {
        std::fs::write(path, self.render_html(command))?;
        Ok(())
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

/// `GITHUB_ACTIONS` set to anything non-empty
pub fn running_in_github_actions() -> bool {
    std::env::var("GITHUB_ACTIONS").map_or(false, |v| !v.is_empty())
}

fn two_decimals_or_na(value: Option<f64>) -> String {
    value.map_or_else(|| "N/A".to_string(), |v| format!("{:.2}", v))
}

/// Up to two decimals, trailing zeros removed
fn plain_number(value: f64) -> String {
    let text = format!("{:.2}", value);
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}
