//! Invoices screen: create, search, include deleted, delete

use std::time::Duration;

use facturas_common::{InvoiceDraft, InvoiceField};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::{expect_success, ANY_ELEMENT, DEFAULT_WAIT, ELEMENT_WAIT};
use crate::browser::{Browser, ExchangeHandle, OptionTarget, SelectOption, TextPattern, WaitState};
use crate::error::{ensure, E2eError, E2eResult};

const MENU_ENTRY: &str = r#"a,button,[role="menuitem"]"#;
const MODULE_TITLE: &str = "Facturas";

const NEW_BUTTON: &str = "xpath=/html/body/app-root/div/div/app-invoices/div[1]/button";
const NUMBER_INPUT: &str = "#invoiceNumber";
const TOTAL_INPUT: &str =
    r#"input[name="total"], #total, input[placeholder*="Total"], input[type="number"]"#;
const STATUS_SELECT: &str = "#status";
const STATUS_OPTIONS: &str = "#status option";
const SAVE_BUTTON: &str = "button, [type='submit']";
const SAVE_TEXT: &str = "Crear factura|Guardar|Crear";

const SHOW_DELETED: &str = "#showDeleted";
const SEARCH_INPUT: &str =
    r#"input[name="factura"], input[placeholder*="Factura"], input[type="text"]"#;
const SEARCH_BUTTON: &str =
    "xpath=/html/body/app-root/div/div/app-invoices/div[2]/app-filter-form/div/div[2]/button[1]";

const ROW: &str = "tr, .row, [role='row']";
const TABLE_ROWS: &str =
    "body > app-root > div > div > app-invoices > div.overflow-x-auto.mt-4 > table > tbody tr";
const DELETE_BUTTON: &str =
    r#"button[title="Eliminar factura"], .btn.btn-sm.btn-error[title="Eliminar factura"]"#;
const CONFIRM_BUTTON: &str = "button, [role='button']";
const CONFIRM_TEXT: &str = "Eliminar|Confirmar|Sí|Si";

const DELETED_TEXT: &str = "Eliminad[oa]";
const DELETED_OR_INACTIVE_TEXT: &str = "Eliminad[oa]|Inactiv[oa]";

const CREATE_GLOB: &str = "**/V1/invoices";
const LIST_AFTER_CREATE_GLOB: &str = "**/V1/invoices?page=1**";
const LIST_GLOB: &str = "**/V1/invoices**";

const TABLE_WAIT: Duration = Duration::from_secs(15);
const CONFIRM_WAIT: Duration = Duration::from_secs(2);

/// How the status option was picked
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusChoice {
    /// Visible text equals the wanted status
    ByText(String),
    /// `value` attribute equals the wanted status
    ByValue(String),
    /// Nothing matched; the second option (first real entry after the placeholder)
    SecondOption(OptionTarget),
}

impl StatusChoice {
    pub fn target(&self) -> OptionTarget {
        match self {
            StatusChoice::ByText(label) => OptionTarget::Label(label.clone()),
            StatusChoice::ByValue(value) => OptionTarget::Value(value.clone()),
            StatusChoice::SecondOption(target) => target.clone(),
        }
    }
}

/// Pick the status option: exact text, then exact value, then the second
/// option. Comparisons are trimmed and case-insensitive.
pub fn choose_status_option(options: &[SelectOption], wanted: &str) -> E2eResult<StatusChoice> {
    let wanted = wanted.trim().to_lowercase();

    if let Some(option) = options
        .iter()
        .find(|o| o.text.trim().to_lowercase() == wanted)
    {
        return Ok(StatusChoice::ByText(option.text.trim().to_string()));
    }

    if let Some(value) = options
        .iter()
        .filter_map(|o| o.value.as_deref())
        .find(|v| v.trim().to_lowercase() == wanted)
    {
        return Ok(StatusChoice::ByValue(value.to_string()));
    }

    let second = options.get(1).ok_or_else(|| {
        E2eError::AssertionFailed(format!(
            "status select has no option '{}' and only {} option(s) to fall back on",
            wanted,
            options.len()
        ))
    })?;
    let target = match &second.value {
        Some(value) => OptionTarget::Value(value.clone()),
        None => OptionTarget::Label(second.text.trim().to_string()),
    };
    Ok(StatusChoice::SecondOption(target))
}

/// Network expectations armed before the creation form is filled
#[derive(Debug, Clone, Copy)]
pub struct PendingCreation {
    pub create: ExchangeHandle,
    pub list: ExchangeHandle,
}

/// Result of scanning the table for a freshly created invoice
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowScan {
    pub found: bool,
    /// Every row, lower-cased and trimmed
    pub dump: Vec<String>,
}

/// A row matches when it contains the id or the number, and `vigente`
pub fn find_created_row(rows: &[String], id: Option<&str>, number: &str) -> RowScan {
    let id = id.map(|i| i.trim().to_lowercase()).filter(|i| !i.is_empty());
    let number = number.trim().to_lowercase();

    let dump: Vec<String> = rows.iter().map(|r| r.trim().to_lowercase()).collect();
    let found = dump.iter().any(|row| {
        let by_id = id.as_deref().map_or(false, |id| row.contains(id));
        let by_number = !number.is_empty() && row.contains(&number);
        (by_id || by_number) && row.contains("vigente")
    });

    RowScan { found, dump }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletionOutcome {
    /// No row carries the number anymore
    Absent,
    /// The row is still listed but marked deleted
    MarkedDeleted,
    StillActive,
}

/// Classify the rows that mention the deleted invoice's number
pub fn deletion_outcome(rows: &[String]) -> E2eResult<DeletionOutcome> {
    match rows.first() {
        None => Ok(DeletionOutcome::Absent),
        Some(row) if TextPattern::regex(DELETED_TEXT).is_match(row)? => {
            Ok(DeletionOutcome::MarkedDeleted)
        }
        Some(_) => Ok(DeletionOutcome::StillActive),
    }
}

pub struct InvoicesPage<'b> {
    browser: &'b mut dyn Browser,
}

impl<'b> InvoicesPage<'b> {
    pub fn new(browser: &'b mut dyn Browser) -> Self {
        Self { browser }
    }

    /// Open the module from the navigation menu
    pub async fn go_to_module(&mut self) -> E2eResult<()> {
        info!("Opening the invoices module");
        let title = TextPattern::regex(MODULE_TITLE);
        self.browser
            .click_matching(MENU_ENTRY, &title, ELEMENT_WAIT)
            .await?;
        self.browser
            .wait_for_text(ANY_ELEMENT, &title, DEFAULT_WAIT)
            .await
    }

    pub async fn click_new(&mut self) -> E2eResult<()> {
        info!("Opening the new invoice form");
        self.browser.click(NEW_BUTTON, ELEMENT_WAIT).await?;
        self.browser
            .wait_for(NUMBER_INPUT, WaitState::Visible, ELEMENT_WAIT)
            .await
    }

    pub async fn fill_number(&mut self, number: &str) -> E2eResult<()> {
        info!(number, "Typing invoice number");
        self.browser.fill(NUMBER_INPUT, number, ELEMENT_WAIT).await
    }

    pub async fn fill_total(&mut self, total: &str) -> E2eResult<()> {
        info!(total, "Typing invoice total");
        self.browser.fill(TOTAL_INPUT, total, DEFAULT_WAIT).await
    }

    pub async fn select_status(&mut self, status: &str) -> E2eResult<StatusChoice> {
        info!(status, "Selecting invoice status");
        self.browser
            .wait_for(STATUS_SELECT, WaitState::Visible, ELEMENT_WAIT)
            .await?;
        self.browser
            .wait_for(STATUS_OPTIONS, WaitState::Attached, ELEMENT_WAIT)
            .await?;

        let options = self.browser.select_options(STATUS_SELECT).await?;
        let choice = choose_status_option(&options, status)?;
        if let StatusChoice::SecondOption(_) = choice {
            warn!(status, "No exact status option, falling back to the second one");
        }
        self.browser.select(STATUS_SELECT, &choice.target()).await?;

        let selected = self.browser.selected_text(STATUS_SELECT).await?;
        debug!(selected = ?selected.as_deref().map(str::trim), "Status selected");
        Ok(choice)
    }

    pub async fn submit_create(&mut self) -> E2eResult<()> {
        info!("Saving the invoice");
        self.browser
            .click_matching(SAVE_BUTTON, &TextPattern::regex(SAVE_TEXT), ELEMENT_WAIT)
            .await
    }

    /// Fill and submit the creation form.
    ///
    /// The create request and the list refresh that follows are armed before
    /// the first click so neither can be missed.
    pub async fn create_invoice(&mut self, draft: &InvoiceDraft) -> E2eResult<PendingCreation> {
        info!(
            number = %draft.invoice_number,
            total = draft.total,
            status = %draft.status,
            "Creating invoice from the UI"
        );
        let create = self.browser.arm_exchange("POST", CREATE_GLOB).await?;
        let list = self.browser.arm_exchange("GET", LIST_AFTER_CREATE_GLOB).await?;

        self.click_new().await?;
        self.fill_number(&draft.invoice_number).await?;
        self.fill_total(&draft.total_text()).await?;
        self.select_status(&draft.status).await?;
        self.submit_create().await?;

        Ok(PendingCreation { create, list })
    }

    /// The created invoice shows up in the refreshed table as `Vigente`
    pub async fn expect_created_in_list(
        &mut self,
        pending: PendingCreation,
        fallback_number: &str,
    ) -> E2eResult<()> {
        let created = self
            .browser
            .await_exchange(pending.create, super::NETWORK_WAIT)
            .await?;
        let (id, number) = created_identity(&created.body, fallback_number);
        info!(id = id.as_deref().unwrap_or("-"), number = %number, "Invoice created by the API");

        self.browser
            .await_exchange(pending.list, super::NETWORK_WAIT)
            .await?;
        self.browser
            .wait_for(TABLE_ROWS, WaitState::Attached, TABLE_WAIT)
            .await?;

        let rows = self.browser.texts(TABLE_ROWS).await?;
        let scan = find_created_row(&rows, id.as_deref(), &number);
        debug!(rows = %scan.dump.join("\n---\n"), "Invoice table rows");

        ensure(scan.found, || {
            format!(
                "created invoice not listed as Vigente (looked for id '{}' or number '{}'); rows:\n{}",
                id.as_deref().unwrap_or(""),
                number,
                scan.dump.join("\n---\n")
            )
        })
    }

    pub async fn set_include_deleted_and_search(&mut self) -> E2eResult<()> {
        info!("Including deleted invoices and searching");
        let list = self.browser.arm_exchange("GET", LIST_GLOB).await?;

        self.browser
            .wait_for(SHOW_DELETED, WaitState::Visible, ELEMENT_WAIT)
            .await?;
        if !self.browser.is_checked(SHOW_DELETED).await? {
            self.browser.check(SHOW_DELETED).await?;
        }
        self.browser.click(SEARCH_BUTTON, ELEMENT_WAIT).await?;

        expect_success(self.browser, list, "search including deleted invoices").await?;
        Ok(())
    }

    pub async fn expect_deleted_visible(&mut self) -> E2eResult<()> {
        self.browser
            .wait_for_text(
                ANY_ELEMENT,
                &TextPattern::regex(DELETED_OR_INACTIVE_TEXT),
                ELEMENT_WAIT,
            )
            .await
    }

    pub async fn search_by_number(&mut self, number: &str) -> E2eResult<()> {
        info!(number, "Searching invoice by number");
        let list = self.browser.arm_exchange("GET", LIST_GLOB).await?;

        self.browser.fill(SEARCH_INPUT, number, DEFAULT_WAIT).await?;
        self.browser.click(SEARCH_BUTTON, ELEMENT_WAIT).await?;

        expect_success(self.browser, list, "search by number").await?;
        Ok(())
    }

    pub async fn expect_row_visible(&mut self, number: &str) -> E2eResult<()> {
        self.browser
            .wait_for_text(ROW, &TextPattern::literal(number), ELEMENT_WAIT)
            .await
    }

    /// Press the row's delete button and accept the confirmation if one shows up
    pub async fn delete_by_number(&mut self, number: &str) -> E2eResult<()> {
        info!(number, "Deleting invoice");
        self.browser
            .click_in_row(ROW, &TextPattern::literal(number), DELETE_BUTTON, ELEMENT_WAIT)
            .await?;

        let confirm = TextPattern::regex(CONFIRM_TEXT);
        match self
            .browser
            .wait_for_text(CONFIRM_BUTTON, &confirm, CONFIRM_WAIT)
            .await
        {
            Ok(()) => {
                self.browser
                    .click_matching(CONFIRM_BUTTON, &confirm, DEFAULT_WAIT)
                    .await
            }
            Err(E2eError::Timeout(_)) => {
                debug!("No confirmation dialog");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    pub async fn expect_deleted_or_absent(&mut self, number: &str) -> E2eResult<()> {
        let rows = self
            .browser
            .texts_matching(ROW, &TextPattern::literal(number))
            .await?;
        let outcome = deletion_outcome(&rows)?;
        info!(number, outcome = ?outcome, "Deletion checked");
        ensure(outcome != DeletionOutcome::StillActive, || {
            format!("invoice '{}' is still listed and not marked as deleted", number)
        })
    }
}

/// Id and number of a created invoice, in either naming convention
fn created_identity(body: &Value, fallback_number: &str) -> (Option<String>, String) {
    let id = InvoiceField::Id.lookup_text(body);
    let number = InvoiceField::Number
        .lookup_text(body)
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| fallback_number.to_string());
    (id, number)
}
