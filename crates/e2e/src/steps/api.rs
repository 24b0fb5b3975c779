use cucumber::gherkin::Step;
use cucumber::{given, then, when};
use reqwest::Method;

use super::StepOutcome;
use crate::actions::{perform, ApiAction, StatusPolicy};
use crate::assertions;
use crate::error::E2eError;
use crate::world::InvoiceWorld;

fn docstring(step: &Step) -> &str {
    step.docstring.as_deref().unwrap_or_default()
}

async fn run(world: &mut InvoiceWorld, action: ApiAction) {
    perform(&world.api, &mut world.ctx, action).await.or_fail();
}

#[given(regex = r#"^el basePath de la API es "([^"]*)"$"#)]
fn base_path(world: &mut InvoiceWorld, path: String) {
    world.ctx.set_base_path(&path);
}

#[given(regex = r"^el payload de creación es:$")]
fn creation_payload(world: &mut InvoiceWorld, step: &Step) {
    world.ctx.set_payload(docstring(step)).or_fail();
}

#[given(regex = r"^el payload de actualización es:$")]
fn update_payload(world: &mut InvoiceWorld, step: &Step) {
    world.ctx.set_payload(docstring(step)).or_fail();
}

#[when(regex = r#"^hago GET a "([^"]*)" con token$"#)]
async fn get_with_token(world: &mut InvoiceWorld, path: String) {
    run(world, ApiAction::new(Method::GET, path)).await;
}

#[when(regex = r#"^hago GET a "([^"]*)" sin token((?: \(permitiendo 4xx\))?)$"#)]
async fn get_without_token(world: &mut InvoiceWorld, path: String, _qualifier: String) {
    let action = ApiAction::new(Method::GET, path)
        .anonymous()
        .policy(StatusPolicy::AllowErrors);
    run(world, action).await;
}

#[when(regex = r#"^hago POST a "([^"]*)" con ese payload y token((?: \(permitiendo 4xx\))?)$"#)]
async fn post_payload(world: &mut InvoiceWorld, path: String, qualifier: String) {
    let action = ApiAction::new(Method::POST, path).policy(StatusPolicy::from_qualifier(&qualifier));
    run(world, action).await;
}

#[when(regex = r#"^hago PUT a "([^"]*)" con ese payload y token((?: \(permitiendo 4xx\))?)$"#)]
async fn put_payload(world: &mut InvoiceWorld, path: String, qualifier: String) {
    let action = ApiAction::new(Method::PUT, path).policy(StatusPolicy::from_qualifier(&qualifier));
    run(world, action).await;
}

#[when(regex = r#"^hago DELETE a "([^"]*)" con token((?: \(permitiendo 4xx\))?)$"#)]
async fn delete_with_token(world: &mut InvoiceWorld, path: String, qualifier: String) {
    let action = ApiAction::new(Method::DELETE, path).policy(StatusPolicy::from_qualifier(&qualifier));
    run(world, action).await;
}

#[then(regex = r"^la respuesta debe tener status (\d+)$")]
fn status_is(world: &mut InvoiceWorld, status: u16) {
    assertions::expect_status(&world.ctx, status).or_fail();
}

#[then(regex = r"^la respuesta debe tener status en \[(\d+), (\d+)\]$")]
fn status_in(world: &mut InvoiceWorld, first: u16, second: u16) {
    assertions::expect_status_in(&world.ctx, &[first, second]).or_fail();
}

#[then(regex = r#"^el cuerpo debe incluir un arreglo "([^"]*)"$"#)]
fn body_has_array(world: &mut InvoiceWorld, prop: String) {
    assertions::expect_array(&world.ctx, &prop).or_fail();
}

#[then(regex = r#"^si "([^"]*)" tiene elementos, el primero debe tener:$"#)]
fn first_element_has(world: &mut InvoiceWorld, array_prop: String, step: &Step) {
    let rows: Vec<(String, String)> = step
        .table
        .as_ref()
        .map(|table| {
            table
                .rows
                .iter()
                .filter_map(|row| match row.as_slice() {
                    [field, value, ..] => Some((field.clone(), value.clone())),
                    _ => None,
                })
                .collect()
        })
        .ok_or_else(|| E2eError::AssertionFailed("step needs a `field | value` table".into()))
        .or_fail();
    assertions::expect_first_element(&world.ctx, &array_prop, &rows).or_fail();
}

#[then(regex = r"^la respuesta debe reflejar los campos del payload tolerante a camelCase o snake_case$")]
fn payload_reflected(world: &mut InvoiceWorld) {
    assertions::expect_payload_reflected(&world.ctx).or_fail();
}

#[then(regex = r#"^el cuerpo debe tener la propiedad "([^"]*)" con valor "([^"]*)"$"#)]
fn property_has_value(world: &mut InvoiceWorld, prop: String, value: String) {
    assertions::expect_property_value(&world.ctx, &prop, &value).or_fail();
}
