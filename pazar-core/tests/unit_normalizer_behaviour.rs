//! Behavioural tests for product description normalisation.

use std::cell::RefCell;

use pazar_core::{ParsedProduct, Unit, parse_product};
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};

#[derive(Debug, Default)]
struct NormaliserWorld {
    description: RefCell<String>,
    parsed: RefCell<Option<ParsedProduct>>,
}

#[fixture]
fn world() -> NormaliserWorld {
    NormaliserWorld::default()
}

#[given("the description {description}")]
fn given_description(world: &NormaliserWorld, description: String) {
    world
        .description
        .replace(description.trim_matches('"').to_owned());
}

#[when("the description is normalised")]
fn when_normalised(world: &NormaliserWorld) {
    let parsed = parse_product(&world.description.borrow());
    world.parsed.replace(Some(parsed));
}

#[then("the product is named {name}")]
fn then_named(world: &NormaliserWorld, name: String) {
    let parsed = world.parsed.borrow();
    let parsed = parsed.as_ref().expect("description should be normalised");
    assert_eq!(parsed.name, name.trim_matches('"'));
}

#[then("the quantity in kilograms is {quantity}")]
fn then_kilograms(world: &NormaliserWorld, quantity: f64) {
    let parsed = world.parsed.borrow();
    let parsed = parsed.as_ref().expect("description should be normalised");
    assert_eq!(parsed.unit, Unit::Kilogram);
    assert!((parsed.quantity - quantity).abs() < 1e-9);
}

#[then("the product is a single item")]
fn then_single_item(world: &NormaliserWorld) {
    let parsed = world.parsed.borrow();
    let parsed = parsed.as_ref().expect("description should be normalised");
    assert_eq!((parsed.quantity, parsed.unit), (1.0, Unit::Item));
}

#[scenario(path = "tests/features/unit_normalizer.feature", index = 0)]
fn weight_range(world: NormaliserWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/unit_normalizer.feature", index = 1)]
fn multipack(world: NormaliserWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/unit_normalizer.feature", index = 2)]
fn no_size(world: NormaliserWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/unit_normalizer.feature", index = 3)]
fn negligible_size(world: NormaliserWorld) {
    let _ = world;
}
