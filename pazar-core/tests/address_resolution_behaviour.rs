//! Behavioural tests for resolving feed addresses against known stores.

use std::cell::RefCell;

use pazar_core::{AddressMatch, AddressResolver, Store};
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};

#[derive(Debug, Default)]
struct AddressWorld {
    resolver: RefCell<Option<AddressResolver>>,
    found: RefCell<Option<AddressMatch>>,
}

#[fixture]
fn world() -> AddressWorld {
    AddressWorld::default()
}

fn store(id: u32, address: &str) -> Store {
    Store {
        id,
        chain_id: Some(2),
        address: address.to_owned(),
        populated_area: Some("Варна".to_owned()),
        location: None,
    }
}

#[given("the Kaufland stores of Varna")]
fn given_kaufland(world: &AddressWorld) {
    let stores = [
        store(10, "ул. „Девня“ 24"),
        store(11, "ул. „д-р Петър Скорчев“ 2"),
        store(12, "бул. „Христо Смирненски“ 2"),
        store(13, "бул. „Република“ 60"),
        store(14, "бул. „Трети март“ 77"),
    ];
    let resolver = AddressResolver::new(&stores, ["kaufland", "кауфланд", "кауфленд"]);
    world.resolver.replace(Some(resolver));
}

#[when("the feed address is {address}")]
fn when_resolved(world: &AddressWorld, address: String) {
    let resolver = world.resolver.borrow();
    let resolver = resolver.as_ref().expect("stores should be loaded");
    world
        .found
        .replace(resolver.resolve(address.trim_matches('"')));
}

#[then("the selected store is {id}")]
fn then_selected(world: &AddressWorld, id: u32) {
    let found = world.found.borrow().expect("an address should resolve");
    assert_eq!(found.store_id, id);
    assert!(found.score > 80.0);
}

#[then("no store is selected")]
fn then_none(world: &AddressWorld) {
    assert_eq!(*world.found.borrow(), None);
}

#[scenario(path = "tests/features/address_resolution.feature", index = 0)]
fn feed_address_with_chain_name(world: AddressWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/address_resolution.feature", index = 1)]
fn normalised_address(world: AddressWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/address_resolution.feature", index = 2)]
fn unknown_address(world: AddressWorld) {
    let _ = world;
}
