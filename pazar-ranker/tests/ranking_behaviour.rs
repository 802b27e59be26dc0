#![expect(
    clippy::expect_used,
    reason = "tests should fail fast when setup breaks"
)]

//! Behavioural coverage for shopping-list ranking.

use std::cell::RefCell;

use geo::Coord;
use pazar_core::test_support::MemoryRepository;
use pazar_core::{NewProduct, Repository};
use pazar_ranker::{RankingEngine, RankingEntry};
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};

/// Shared state for the ranking scenarios.
#[derive(Debug, Default)]
struct RankingWorld {
    repository: RefCell<MemoryRepository>,
    position: RefCell<String>,
    ranking: RefCell<Vec<RankingEntry>>,
}

#[fixture]
fn world() -> RankingWorld {
    RankingWorld::default()
}

fn split_list(raw: &str) -> Vec<String> {
    raw.trim_matches('"')
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_owned)
        .collect()
}

#[given("a Lidl next to the user and a Kaufland one kilometre north")]
fn given_two_stores(world: &RankingWorld) {
    let here = Coord { x: 27.91, y: 43.2047 };
    let north = Coord { x: 27.91, y: 43.2147 };
    let mut repository = MemoryRepository::default()
        .with_category(1, "Бял хляб от 500 гр. до 1 кг")
        .with_category(6, "Прясно мляко от 2 % до 3.6 % 1 л")
        .with_category(12, "Краве масло от 125 гр. до 250 гр.")
        .with_category(38, "Бяла захар 1 кг")
        .with_chain(1, "Lidl")
        .with_chain(2, "Kaufland")
        .with_store(1, Some(1), "ул. „Мир“ 45", Some(here))
        .with_store(2, Some(2), "ул. „Девня“ 24", Some(north));
    let products = [
        (1, 1, "Хляб", Some(1.0), 1.50),
        (1, 6, "Прясно мляко", None, 2.00),
        (2, 1, "Хляб", Some(0.5), 1.00),
        (2, 6, "Прясно мляко", None, 1.80),
        (2, 12, "Краве масло", Some(0.25), 3.50),
        (2, 38, "Захар", Some(1.0), 2.20),
    ];
    for (store_id, category_id, name, quantity, price) in products {
        let product = NewProduct::new(store_id, Some(category_id), None, name, quantity, price)
            .expect("valid product");
        repository.insert_product(&product).expect("insert product");
    }
    world.repository.replace(repository);
}

#[given("the user stands at {position}")]
fn given_position(world: &RankingWorld, position: String) {
    world.position.replace(position.trim_matches('"').to_owned());
}

#[when("the shopping list is {terms}")]
fn when_ranked(world: &RankingWorld, terms: String) {
    let ranking = RankingEngine::default()
        .rank(
            &*world.repository.borrow(),
            &split_list(&terms),
            &world.position.borrow(),
        )
        .expect("ranking succeeds");
    world.ranking.replace(ranking);
}

#[then("the stores are ranked as {chains}")]
fn then_order(world: &RankingWorld, chains: String) {
    let ranked: Vec<String> = world
        .ranking
        .borrow()
        .iter()
        .map(|entry| entry.chain_name.clone())
        .collect();
    assert_eq!(ranked, split_list(&chains));
}

#[then("the number of items missing at Lidl is {count}")]
fn then_missing(world: &RankingWorld, count: usize) {
    let ranking = world.ranking.borrow();
    let lidl = ranking
        .iter()
        .find(|entry| entry.chain_name == "Lidl")
        .expect("Lidl should be ranked");
    assert_eq!(lidl.missing_count, count);
    assert_eq!(lidl.missing_items.len(), count);
}

#[then("every ranked store has a distance in km of {distance}")]
fn then_distance(world: &RankingWorld, distance: f64) {
    let ranking = world.ranking.borrow();
    assert!(!ranking.is_empty());
    for entry in ranking.iter() {
        assert_eq!(entry.distance_km, distance);
    }
}

#[scenario(path = "tests/features/ranking.feature", index = 0)]
fn cheaper_store_first(world: RankingWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/ranking.feature", index = 1)]
fn irrelevant_store_excluded(world: RankingWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/ranking.feature", index = 2)]
fn unreadable_position(world: RankingWorld) {
    let _ = world;
}
