//! Playwright browser automation
//!
//! One `node` process per scenario runs the embedded driver script below.
//! The script owns a single page for the lifetime of the scenario and
//! executes line-delimited JSON commands from stdin, answering each on
//! stdout with `{ id, ok, value | error }`.

use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::Duration;

use async_trait::async_trait;
use facturas_common::config::{BrowserKind, SuiteConfig};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command as TokioCommand};
use tracing::{debug, info, warn};

use crate::browser::{
    glob_to_regex, Browser, ExchangeHandle, NetworkExchange, OptionTarget, SelectOption,
    TextPattern, WaitState,
};
use crate::error::{E2eError, E2eResult};

/// Extra time granted to the driver beyond the operation's own timeout
const REPLY_GRACE: Duration = Duration::from_secs(5);

/// Budget for operations that have no timeout of their own
const DEFAULT_BUDGET: Duration = Duration::from_secs(10);

const LAUNCH_TIMEOUT: Duration = Duration::from_secs(60);

/// Flags that let Chromium load the QA environment's mixed content
const CHROMIUM_ARGS: &[&str] = &[
    "--ignore-certificate-errors",
    "--allow-insecure-localhost",
    "--allow-running-insecure-content",
    "--disable-web-security",
    "--disable-features=BlockInsecurePrivateNetworkRequests,InsecurePrivateNetworkRequestsAllowed",
];

const DRIVER_JS: &str = r#"
const readline = require('readline');
const playwright = require('playwright');

const opts = JSON.parse(process.argv[2]);
const send = (msg) => process.stdout.write(JSON.stringify(msg) + '\n');
const rx = (p) => new RegExp(p.source, p.case_insensitive ? 'i' : '');

(async () => {
  const browser = await playwright[opts.browser].launch({ headless: opts.headless, args: opts.args });
  const context = await browser.newContext({
    baseURL: opts.base_url,
    viewport: { width: opts.viewport_width, height: opts.viewport_height },
    ignoreHTTPSErrors: true,
  });
  const page = await context.newPage();
  const pending = new Map();

  const first = (selector) => page.locator(selector).first();
  const withText = (selector, pattern) => page.locator(selector).filter({ hasText: rx(pattern) });

  const handlers = {
    goto: async (c) => { await page.goto(c.path); return null; },
    wait_for: async (c) => {
      await first(c.selector).waitFor({ state: c.state, timeout: c.timeout_ms });
      return null;
    },
    count: async (c) => page.locator(c.selector).count(),
    fill: async (c) => {
      const el = first(c.selector);
      await el.waitFor({ state: 'visible', timeout: c.timeout_ms });
      await el.fill('');
      await el.fill(c.value);
      return null;
    },
    click: async (c) => {
      await first(c.selector).click({ force: true, timeout: c.timeout_ms });
      return null;
    },
    click_matching: async (c) => {
      await withText(c.selector, c.pattern).first().click({ force: true, timeout: c.timeout_ms });
      return null;
    },
    wait_for_text: async (c) => {
      await withText(c.selector, c.pattern).first().waitFor({ state: 'visible', timeout: c.timeout_ms });
      return null;
    },
    texts: async (c) => page.locator(c.selector).allTextContents(),
    texts_matching: async (c) => withText(c.selector, c.pattern).allTextContents(),
    attribute: async (c) => first(c.selector).getAttribute(c.name, { timeout: c.timeout_ms }),
    select_options: async (c) =>
      first(c.selector).locator('option').evaluateAll((os) =>
        os.map((o) => ({ text: o.textContent || '', value: o.getAttribute('value') }))),
    select: async (c) => {
      const target = c.target.by === 'label' ? { label: c.target.value } : { value: c.target.value };
      await first(c.selector).selectOption(target, { force: true });
      return null;
    },
    selected_text: async (c) =>
      first(c.selector).evaluate((s) => (s.selectedIndex >= 0 ? s.options[s.selectedIndex].text : null)),
    is_checked: async (c) => first(c.selector).isChecked(),
    check: async (c) => { await first(c.selector).check({ force: true }); return null; },
    click_in_row: async (c) => {
      await withText(c.row_selector, c.row_pattern).first().locator(c.target).first()
        .click({ force: true, timeout: c.timeout_ms });
      return null;
    },
    current_url: async () => page.url(),
    arm_exchange: async (c) => {
      const re = new RegExp(c.url_regex);
      const p = page
        .waitForResponse((r) => r.request().method() === c.method && re.test(r.url()), { timeout: 0 })
        .then(async (r) => {
          let body = null;
          try { body = await r.json(); } catch (_) { body = null; }
          return { status: r.status(), body };
        });
      p.catch(() => {});
      pending.set(c.handle, p);
      return c.handle;
    },
    await_exchange: async (c) => {
      const p = pending.get(c.handle);
      if (!p) throw new Error(`no armed exchange #${c.handle}`);
      pending.delete(c.handle);
      let timer;
      const expire = new Promise((_, reject) => {
        timer = setTimeout(() => {
          const e = new Error(`exchange #${c.handle} not observed within ${c.timeout_ms}ms`);
          e.name = 'TimeoutError';
          reject(e);
        }, c.timeout_ms);
      });
      try { return await Promise.race([p, expire]); } finally { clearTimeout(timer); }
    },
    close: async () => { await browser.close(); return null; },
  };

  send({ ready: true });

  const rl = readline.createInterface({ input: process.stdin });
  for await (const line of rl) {
    if (!line.trim()) continue;
    let cmd;
    try {
      cmd = JSON.parse(line);
    } catch (e) {
      send({ id: null, ok: false, error: 'bad command: ' + e.message });
      continue;
    }
    try {
      const handler = handlers[cmd.op];
      if (!handler) throw new Error('unknown op ' + cmd.op);
      const value = await handler(cmd);
      send({ id: cmd.id, ok: true, value: value === undefined ? null : value });
      if (cmd.op === 'close') break;
    } catch (e) {
      send({ id: cmd.id, ok: false, error: e.message, timeout: e.name === 'TimeoutError' });
    }
  }
  await browser.close().catch(() => {});
  process.exit(0);
})().catch((e) => {
  send({ id: null, ok: false, fatal: true, error: e.message });
  process.exit(1);
});
"#;

/// Configuration for the Playwright driver
#[derive(Debug, Clone)]
pub struct PlaywrightConfig {
    pub base_url: String,
    pub browser: BrowserKind,
    pub headless: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,
}

impl Default for PlaywrightConfig {
    fn default() -> Self {
        let suite = SuiteConfig::default();
        Self::from(&suite)
    }
}

impl From<&SuiteConfig> for PlaywrightConfig {
    fn from(config: &SuiteConfig) -> Self {
        Self {
            base_url: config.base_url.clone(),
            browser: config.browser.kind,
            headless: config.browser.headless,
            viewport_width: config.browser.viewport_width,
            viewport_height: config.browser.viewport_height,
        }
    }
}

impl PlaywrightConfig {
    fn launch_options(&self) -> Value {
        let args: Vec<&str> = match self.browser {
            BrowserKind::Chromium => CHROMIUM_ARGS.to_vec(),
            _ => Vec::new(),
        };
        json!({
            "browser": self.browser.as_str(),
            "headless": self.headless,
            "base_url": self.base_url,
            "viewport_width": self.viewport_width,
            "viewport_height": self.viewport_height,
            "args": args,
        })
    }
}

/// Commands understood by the driver script
#[derive(Debug, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum DriverCommand<'a> {
    Goto { path: &'a str },
    WaitFor { selector: &'a str, state: WaitState, timeout_ms: u64 },
    Count { selector: &'a str },
    Fill { selector: &'a str, value: &'a str, timeout_ms: u64 },
    Click { selector: &'a str, timeout_ms: u64 },
    ClickMatching { selector: &'a str, pattern: &'a TextPattern, timeout_ms: u64 },
    WaitForText { selector: &'a str, pattern: &'a TextPattern, timeout_ms: u64 },
    Texts { selector: &'a str },
    TextsMatching { selector: &'a str, pattern: &'a TextPattern },
    Attribute { selector: &'a str, name: &'a str, timeout_ms: u64 },
    SelectOptions { selector: &'a str },
    Select { selector: &'a str, target: &'a OptionTarget },
    SelectedText { selector: &'a str },
    IsChecked { selector: &'a str },
    Check { selector: &'a str },
    ClickInRow {
        row_selector: &'a str,
        row_pattern: &'a TextPattern,
        target: &'a str,
        timeout_ms: u64,
    },
    CurrentUrl,
    ArmExchange { handle: u64, method: &'a str, url_regex: String },
    AwaitExchange { handle: u64, timeout_ms: u64 },
    Close,
}

#[derive(Debug, Deserialize)]
struct DriverReply {
    id: Option<u64>,
    #[serde(default)]
    ok: bool,
    #[serde(default)]
    value: Value,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    timeout: bool,
    #[serde(default)]
    ready: bool,
    #[serde(default)]
    fatal: bool,
}

/// Live browser session backed by Playwright
#[derive(Debug)]
pub struct PlaywrightDriver {
    child: Child,
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
    next_id: u64,
    next_handle: u64,
    closed: bool,

    /// Keeps the driver script on disk while node runs
    _script_dir: TempDir,
}

impl PlaywrightDriver {
    /// Start node with the driver script and wait until the page is ready
    pub async fn launch(config: &PlaywrightConfig) -> E2eResult<Self> {
        Self::check_playwright_installed()?;

        let script_dir = tempfile::tempdir()?;
        let script_path: PathBuf = script_dir.path().join("driver.js");
        std::fs::write(&script_path, DRIVER_JS)?;

        info!(
            browser = config.browser.as_str(),
            headless = config.headless,
            base_url = %config.base_url,
            "Launching Playwright driver"
        );

        let mut child = TokioCommand::new("node")
            .arg(&script_path)
            .arg(config.launch_options().to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| E2eError::Playwright("driver stdin unavailable".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| E2eError::Playwright("driver stdout unavailable".into()))?;

        let mut driver = Self {
            child,
            stdin,
            stdout: BufReader::new(stdout).lines(),
            next_id: 0,
            next_handle: 0,
            closed: false,
            _script_dir: script_dir,
        };

        tokio::time::timeout(LAUNCH_TIMEOUT, driver.wait_ready())
            .await
            .map_err(|_| E2eError::Timeout("Playwright browser launch".into()))??;

        debug!("Playwright driver ready");
        Ok(driver)
    }

    /// Check if Playwright is installed
    fn check_playwright_installed() -> E2eResult<()> {
        let output = Command::new("npx")
            .args(["playwright", "--version"])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        match output {
            Ok(status) if status.success() => Ok(()),
            _ => Err(E2eError::PlaywrightNotFound),
        }
    }

    async fn wait_ready(&mut self) -> E2eResult<()> {
        while let Some(line) = self.stdout.next_line().await? {
            match serde_json::from_str::<DriverReply>(&line) {
                Ok(reply) if reply.ready => return Ok(()),
                Ok(reply) if reply.fatal => {
                    return Err(E2eError::Playwright(reply.error.unwrap_or_default()))
                }
                _ => debug!(line = %line, "driver output"),
            }
        }
        Err(E2eError::Playwright("driver exited before the browser was ready".into()))
    }

    async fn call(&mut self, command: DriverCommand<'_>, budget: Duration) -> E2eResult<Value> {
        self.next_id += 1;
        let id = self.next_id;

        let mut message = serde_json::to_value(&command)?;
        let op = message
            .get("op")
            .and_then(Value::as_str)
            .unwrap_or("?")
            .to_string();
        if let Value::Object(map) = &mut message {
            map.insert("id".to_string(), Value::from(id));
        }

        let mut line = serde_json::to_string(&message)?;
        line.push('\n');
        self.stdin.write_all(line.as_bytes()).await?;
        self.stdin.flush().await?;

        let reply = tokio::time::timeout(budget + REPLY_GRACE, self.read_reply(id))
            .await
            .map_err(|_| E2eError::Timeout(format!("driver reply to '{}'", op)))??;

        if reply.ok {
            Ok(reply.value)
        } else {
            let error = reply.error.unwrap_or_else(|| "unknown driver error".into());
            if reply.timeout {
                Err(E2eError::Timeout(format!("{}: {}", op, error)))
            } else {
                Err(E2eError::Playwright(format!("{}: {}", op, error)))
            }
        }
    }

    async fn read_reply(&mut self, id: u64) -> E2eResult<DriverReply> {
        while let Some(line) = self.stdout.next_line().await? {
            match serde_json::from_str::<DriverReply>(&line) {
                Ok(reply) if reply.id == Some(id) => return Ok(reply),
                Ok(reply) if reply.fatal => {
                    return Err(E2eError::Playwright(reply.error.unwrap_or_default()))
                }
                Ok(reply) => warn!(id = ?reply.id, "Ignoring unexpected driver reply"),
                Err(_) => debug!(line = %line, "driver output"),
            }
        }
        Err(E2eError::Playwright("driver exited unexpectedly".into()))
    }

    async fn call_unit(&mut self, command: DriverCommand<'_>, budget: Duration) -> E2eResult<()> {
        self.call(command, budget).await.map(|_| ())
    }

    async fn call_as<T: serde::de::DeserializeOwned>(
        &mut self,
        command: DriverCommand<'_>,
        budget: Duration,
    ) -> E2eResult<T> {
        let value = self.call(command, budget).await?;
        Ok(serde_json::from_value(value)?)
    }
}

fn millis(d: Duration) -> u64 {
    d.as_millis() as u64
}

#[async_trait]
impl Browser for PlaywrightDriver {
    async fn goto(&mut self, path: &str) -> E2eResult<()> {
        self.call_unit(DriverCommand::Goto { path }, Duration::from_secs(30)).await
    }

    async fn wait_for(&mut self, selector: &str, state: WaitState, timeout: Duration) -> E2eResult<()> {
        let command = DriverCommand::WaitFor { selector, state, timeout_ms: millis(timeout) };
        self.call_unit(command, timeout).await
    }

    async fn count(&mut self, selector: &str) -> E2eResult<usize> {
        self.call_as(DriverCommand::Count { selector }, DEFAULT_BUDGET).await
    }

    async fn fill(&mut self, selector: &str, value: &str, timeout: Duration) -> E2eResult<()> {
        let command = DriverCommand::Fill { selector, value, timeout_ms: millis(timeout) };
        self.call_unit(command, timeout).await
    }

    async fn click(&mut self, selector: &str, timeout: Duration) -> E2eResult<()> {
        let command = DriverCommand::Click { selector, timeout_ms: millis(timeout) };
        self.call_unit(command, timeout).await
    }

    async fn click_matching(
        &mut self,
        selector: &str,
        pattern: &TextPattern,
        timeout: Duration,
    ) -> E2eResult<()> {
        let command = DriverCommand::ClickMatching { selector, pattern, timeout_ms: millis(timeout) };
        self.call_unit(command, timeout).await
    }

    async fn wait_for_text(
        &mut self,
        selector: &str,
        pattern: &TextPattern,
        timeout: Duration,
    ) -> E2eResult<()> {
        let command = DriverCommand::WaitForText { selector, pattern, timeout_ms: millis(timeout) };
        self.call_unit(command, timeout).await
    }

    async fn texts(&mut self, selector: &str) -> E2eResult<Vec<String>> {
        self.call_as(DriverCommand::Texts { selector }, DEFAULT_BUDGET).await
    }

    async fn texts_matching(&mut self, selector: &str, pattern: &TextPattern) -> E2eResult<Vec<String>> {
        self.call_as(DriverCommand::TextsMatching { selector, pattern }, DEFAULT_BUDGET)
            .await
    }

    async fn attribute(&mut self, selector: &str, name: &str) -> E2eResult<Option<String>> {
        let command = DriverCommand::Attribute { selector, name, timeout_ms: millis(DEFAULT_BUDGET) };
        self.call_as(command, DEFAULT_BUDGET).await
    }

    async fn select_options(&mut self, selector: &str) -> E2eResult<Vec<SelectOption>> {
        self.call_as(DriverCommand::SelectOptions { selector }, DEFAULT_BUDGET).await
    }

    async fn select(&mut self, selector: &str, target: &OptionTarget) -> E2eResult<()> {
        self.call_unit(DriverCommand::Select { selector, target }, DEFAULT_BUDGET).await
    }

    async fn selected_text(&mut self, selector: &str) -> E2eResult<Option<String>> {
        self.call_as(DriverCommand::SelectedText { selector }, DEFAULT_BUDGET).await
    }

    async fn is_checked(&mut self, selector: &str) -> E2eResult<bool> {
        self.call_as(DriverCommand::IsChecked { selector }, DEFAULT_BUDGET).await
    }

    async fn check(&mut self, selector: &str) -> E2eResult<()> {
        self.call_unit(DriverCommand::Check { selector }, DEFAULT_BUDGET).await
    }

    async fn click_in_row(
        &mut self,
        row_selector: &str,
        row_pattern: &TextPattern,
        target: &str,
        timeout: Duration,
    ) -> E2eResult<()> {
        let command = DriverCommand::ClickInRow {
            row_selector,
            row_pattern,
            target,
            timeout_ms: millis(timeout),
        };
        self.call_unit(command, timeout).await
    }

    async fn current_url(&mut self) -> E2eResult<String> {
        self.call_as(DriverCommand::CurrentUrl, DEFAULT_BUDGET).await
    }

    async fn arm_exchange(&mut self, method: &str, url_glob: &str) -> E2eResult<ExchangeHandle> {
        self.next_handle += 1;
        let handle = self.next_handle;
        let command = DriverCommand::ArmExchange {
            handle,
            method,
            url_regex: glob_to_regex(url_glob),
        };
        self.call_unit(command, DEFAULT_BUDGET).await?;
        debug!(handle, method, url_glob, "Armed network expectation");
        Ok(ExchangeHandle(handle))
    }

    async fn await_exchange(
        &mut self,
        handle: ExchangeHandle,
        timeout: Duration,
    ) -> E2eResult<NetworkExchange> {
        let command = DriverCommand::AwaitExchange { handle: handle.0, timeout_ms: millis(timeout) };
        self.call_as(command, timeout).await
    }

    async fn close(&mut self) -> E2eResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        if let Err(e) = self.call_unit(DriverCommand::Close, DEFAULT_BUDGET).await {
            warn!("Browser did not close cleanly: {}", e);
        }
        match tokio::time::timeout(DEFAULT_BUDGET, self.child.wait()).await {
            Ok(status) => debug!(status = ?status, "Playwright driver exited"),
            Err(_) => self.child.start_kill()?,
        }
        Ok(())
    }
}
