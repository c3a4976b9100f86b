mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use common::{at, facility, point, with_cost, MemoryStore};
use kompas_core::{CareProfile, FacilityCategory, FilterState, SortMode};
use kompas_engine::{SearchError, SearchExecutor};

fn names(results: &kompas_engine::SearchResults) -> Vec<&str> {
    results.facilities().map(|f| f.name.as_str()).collect()
}

fn catalogue() -> Vec<kompas_core::Facility> {
    vec![
        at(with_cost(facility(1, "Dom Seniora Zacisze", "Kraków"), 5200), 50.08, 19.95),
        facility(2, "Dom Pomocy Społecznej Helcel", "Kraków"),
        at(with_cost(facility(3, "Ośrodek Wsparcia Arka", "Tarnów"), 0), 50.01, 20.98),
        at(with_cost(facility(4, "Bursa Anioł", "Nowy Sącz"), 3100), 49.62, 20.69),
        with_cost(facility(5, "Ćma Dom Opieki", "Kraków"), 4100),
    ]
}

#[tokio::test]
async fn default_order_is_store_order() {
    let executor = SearchExecutor::new(MemoryStore::with(catalogue()));
    let results = executor.search(&FilterState::new()).await.unwrap();
    let ids: Vec<i64> = results.facilities().map(|f| f.id).collect();
    assert_eq!(ids, vec![1, 2, 3, 4, 5]);
}

#[tokio::test]
async fn name_sort_is_diacritic_aware() {
    let executor = SearchExecutor::new(MemoryStore::with(catalogue()));
    let mut state = FilterState::new();
    state.set_sort(SortMode::NameAsc);
    let results = executor.search(&state).await.unwrap();
    assert_eq!(
        names(&results),
        vec![
            "Bursa Anioł",
            "Ćma Dom Opieki",
            "Dom Pomocy Społecznej Helcel",
            "Dom Seniora Zacisze",
            "Ośrodek Wsparcia Arka",
        ]
    );

    state.set_sort(SortMode::NameDesc);
    let results = executor.search(&state).await.unwrap();
    assert_eq!(names(&results)[0], "Ośrodek Wsparcia Arka");
}

#[tokio::test]
async fn price_sort_puts_unknown_cost_last_ascending_first_descending() {
    let executor = SearchExecutor::new(MemoryStore::with(catalogue()));
    let mut state = FilterState::new();

    state.set_sort(SortMode::PriceAsc);
    let ids: Vec<i64> = executor
        .search(&state)
        .await
        .unwrap()
        .facilities()
        .map(|f| f.id)
        .collect();
    assert_eq!(ids, vec![3, 4, 5, 1, 2]);

    state.set_sort(SortMode::PriceDesc);
    let ids: Vec<i64> = executor
        .search(&state)
        .await
        .unwrap()
        .facilities()
        .map(|f| f.id)
        .collect();
    assert_eq!(ids, vec![2, 1, 5, 4, 3]);
}

#[tokio::test]
async fn distance_sort_annotates_and_appends_absent() {
    let executor = SearchExecutor::new(MemoryStore::with(catalogue()));
    let mut state = FilterState::new();
    state.set_user_position(Some(point(50.0614, 19.9366)));
    state.set_sort(SortMode::Distance);

    let results = executor.search(&state).await.unwrap();
    let ids: Vec<i64> = results.facilities().map(|f| f.id).collect();
    assert_eq!(ids, vec![1, 4, 3, 2, 5]);

    let first = &results.hits[0];
    assert!(first.distance_km.is_some_and(|d| d < 3.0));
    assert!(results.hits[3].distance_km.is_none());
}

#[tokio::test]
async fn position_without_distance_sort_still_annotates() {
    let executor = SearchExecutor::new(MemoryStore::with(catalogue()));
    let mut state = FilterState::new();
    state.set_user_position(Some(point(50.0614, 19.9366)));
    let results = executor.search(&state).await.unwrap();
    assert_eq!(results.hits[0].facility.id, 1);
    assert!(results.hits[0].distance_km.is_some());
    assert!(results.hits[1].distance_km.is_none());
}

#[tokio::test]
async fn free_only_keeps_null_and_zero_cost() {
    let executor = SearchExecutor::new(MemoryStore::with(catalogue()));
    let mut state = FilterState::new();
    state.set_free_only(true);
    let ids: Vec<i64> = executor
        .search(&state)
        .await
        .unwrap()
        .facilities()
        .map(|f| f.id)
        .collect();
    assert_eq!(ids, vec![2, 3]);
}

#[tokio::test]
async fn filters_combine() {
    let mut records = catalogue();
    records[0].category = FacilityCategory::DayCare;
    records[0].care_profiles = vec![CareProfile::C];
    let executor = SearchExecutor::new(MemoryStore::with(records));

    let mut state = FilterState::new();
    state.set_location("krakow");
    state.set_category(Some(FacilityCategory::DayCare));
    state.toggle_care_profile(CareProfile::C);
    state.toggle_care_profile(CareProfile::B);
    state.set_max_price(Some(6000));

    let results = executor.search(&state).await.unwrap();
    assert_eq!(names(&results), vec!["Dom Seniora Zacisze"]);
}

#[tokio::test]
async fn unreachable_store_is_an_error_not_an_empty_list() {
    let store = Arc::new(MemoryStore::with(catalogue()));
    store.unavailable.store(true, Ordering::SeqCst);
    let executor = SearchExecutor::new(Arc::clone(&store));

    let err = executor.search(&FilterState::new()).await.unwrap_err();
    assert!(matches!(err, SearchError::Store(_)));
}
