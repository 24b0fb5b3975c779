use cucumber::{given, then, when};
use facturas_common::InvoiceDraft;

use super::StepOutcome;
use crate::error::E2eError;
use crate::pages::{DashboardPage, InvoicesPage, LoginPage};
use crate::world::InvoiceWorld;

#[given("que abro la app")]
async fn open_app(world: &mut InvoiceWorld) {
    let browser = world.browser().await.or_fail();
    LoginPage::new(browser).visit().await.or_fail();
}

#[when("ingreso el código de acceso válido")]
async fn enter_valid_code(world: &mut InvoiceWorld) {
    let code = world.config.access_code.clone();
    let browser = world.browser().await.or_fail();
    LoginPage::new(browser).enter_access_code(&code).await.or_fail();
}

#[when(regex = r#"^ingreso un código de acceso inválido "([^"]*)"$"#)]
async fn enter_invalid_code(world: &mut InvoiceWorld, code: String) {
    let browser = world.browser().await.or_fail();
    let mut login = LoginPage::new(browser);
    login.fill_access_code(&code).await.or_fail();
    login.submit().await.or_fail();
}

#[then("debo ver el dashboard")]
async fn dashboard_visible(world: &mut InvoiceWorld) {
    let browser = world.browser().await.or_fail();
    LoginPage::new(browser).expect_left_login().await.or_fail();
}

#[then("el dashboard debe cargar")]
async fn dashboard_loaded(world: &mut InvoiceWorld) {
    let browser = world.browser().await.or_fail();
    DashboardPage::new(browser).expect_loaded().await.or_fail();
}

#[then(regex = r"^debo ver un mensaje de error (?:de acceso|y no ingresar)$")]
async fn access_rejected(world: &mut InvoiceWorld) {
    let browser = world.browser().await.or_fail();
    let mut login = LoginPage::new(browser);
    login.expect_access_error().await.or_fail();
    login.expect_access_screen().await.or_fail();
}

#[when("hago logout")]
async fn logout(world: &mut InvoiceWorld) {
    let browser = world.browser().await.or_fail();
    LoginPage::new(browser).logout().await.or_fail();
}

#[then("debo regresar a la pantalla de acceso")]
async fn back_on_access_screen(world: &mut InvoiceWorld) {
    let browser = world.browser().await.or_fail();
    LoginPage::new(browser).expect_access_screen().await.or_fail();
}

#[when("abro el módulo de facturas")]
async fn open_invoices(world: &mut InvoiceWorld) {
    let browser = world.browser().await.or_fail();
    InvoicesPage::new(browser).go_to_module().await.or_fail();
}

#[when("creo una nueva factura válida")]
async fn create_invoice(world: &mut InvoiceWorld) {
    let draft = InvoiceDraft::from(&world.config.invoice);
    let browser = world.browser().await.or_fail();
    let pending = InvoicesPage::new(browser).create_invoice(&draft).await.or_fail();
    world.pending_creation = Some(pending);
}

#[then("debo ver la factura creada en la lista con estado Vigente")]
async fn created_invoice_listed(world: &mut InvoiceWorld) {
    let pending = world
        .pending_creation
        .take()
        .ok_or_else(|| E2eError::AssertionFailed("no invoice was created in this scenario".into()))
        .or_fail();
    let number = world.config.invoice.number.clone();
    let browser = world.browser().await.or_fail();
    InvoicesPage::new(browser)
        .expect_created_in_list(pending, &number)
        .await
        .or_fail();
}

#[when("activo incluir facturas eliminadas y busco")]
async fn include_deleted_and_search(world: &mut InvoiceWorld) {
    let browser = world.browser().await.or_fail();
    InvoicesPage::new(browser)
        .set_include_deleted_and_search()
        .await
        .or_fail();
}

#[then("deben mostrarse facturas eliminadas en los resultados")]
async fn deleted_invoices_shown(world: &mut InvoiceWorld) {
    let browser = world.browser().await.or_fail();
    InvoicesPage::new(browser).expect_deleted_visible().await.or_fail();
}

#[when("busco la factura por número")]
async fn search_by_number(world: &mut InvoiceWorld) {
    let number = world.config.invoice.number.clone();
    let browser = world.browser().await.or_fail();
    InvoicesPage::new(browser).search_by_number(&number).await.or_fail();
}

// The invoice number in the step text is a label; the configured number is used
#[then(regex = r"^debo ver (\S+) en los resultados$")]
async fn invoice_in_results(world: &mut InvoiceWorld, _label: String) {
    let number = world.config.invoice.number.clone();
    let browser = world.browser().await.or_fail();
    InvoicesPage::new(browser).expect_row_visible(&number).await.or_fail();
}

#[when(regex = r"^elimino la factura (\S+)$")]
async fn delete_invoice(world: &mut InvoiceWorld, _label: String) {
    let number = world.config.invoice.number.clone();
    let browser = world.browser().await.or_fail();
    InvoicesPage::new(browser).delete_by_number(&number).await.or_fail();
}

#[then("la factura debe eliminarse o quedar con estado Eliminada")]
async fn invoice_deleted(world: &mut InvoiceWorld) {
    let number = world.config.invoice.number.clone();
    let browser = world.browser().await.or_fail();
    InvoicesPage::new(browser)
        .expect_deleted_or_absent(&number)
        .await
        .or_fail();
}
