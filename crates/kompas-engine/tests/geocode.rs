mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use common::{facility, point, FakeGeocoder, MemoryStore};
use kompas_core::{AddressFields, Coordinate, FacilityStore};
use kompas_engine::CoordinateResolver;

const KRAKOW_TEXT: &str = "ul. Dluga 5, Krakow, malopolskie, Poland";

fn krakow() -> AddressFields {
    AddressFields {
        locality: "Kraków".to_string(),
        street: Some("ul. Długa 5".to_string()),
        region: Some("małopolskie".to_string()),
    }
}

#[tokio::test]
async fn miss_calls_provider_and_caches() {
    let geocoder = Arc::new(FakeGeocoder::answering(KRAKOW_TEXT, point(50.07, 19.94)));
    let resolver = CoordinateResolver::new(Arc::clone(&geocoder));

    let first = resolver.resolve(&krakow()).await;
    let second = resolver.resolve(&krakow()).await;

    assert_eq!(first, Coordinate::Geocoded(point(50.07, 19.94)));
    assert_eq!(first, second);
    assert_eq!(geocoder.calls(), 1);
}

#[tokio::test]
async fn equivalent_spellings_share_a_cache_entry() {
    let geocoder = Arc::new(FakeGeocoder::answering(KRAKOW_TEXT, point(50.07, 19.94)));
    let resolver = CoordinateResolver::new(Arc::clone(&geocoder));

    resolver.resolve(&krakow()).await;
    let folded = AddressFields {
        locality: "KRAKOW".to_string(),
        street: Some("Dluga 5".to_string()),
        region: Some("malopolskie".to_string()),
    };
    let again = resolver.resolve(&folded).await;

    assert!(again.is_resolved());
    assert_eq!(geocoder.calls(), 1);
}

#[tokio::test]
async fn manual_coordinate_never_calls_provider() {
    let geocoder = Arc::new(FakeGeocoder::answering(KRAKOW_TEXT, point(50.07, 19.94)));
    let resolver = CoordinateResolver::new(Arc::clone(&geocoder));
    let manual = Coordinate::Manual(point(50.1, 19.9));

    let resolved = resolver.resolve_for(&krakow(), &manual).await;
    let edited = resolver
        .resolve_after_edit(&krakow(), &krakow(), &manual)
        .await;

    assert_eq!(resolved, manual);
    assert_eq!(edited, manual);
    assert_eq!(geocoder.calls(), 0);
}

#[tokio::test]
async fn no_match_is_absent_and_cached() {
    let geocoder = Arc::new(FakeGeocoder::default());
    let resolver = CoordinateResolver::new(Arc::clone(&geocoder));

    assert_eq!(resolver.resolve(&krakow()).await, Coordinate::Absent);
    assert_eq!(resolver.resolve(&krakow()).await, Coordinate::Absent);
    assert_eq!(geocoder.calls(), 1);
}

#[tokio::test]
async fn transport_failure_is_absent_and_not_cached() {
    let geocoder = Arc::new(FakeGeocoder::answering(KRAKOW_TEXT, point(50.07, 19.94)));
    geocoder.failing.store(true, Ordering::SeqCst);
    let resolver = CoordinateResolver::new(Arc::clone(&geocoder));

    assert_eq!(resolver.resolve(&krakow()).await, Coordinate::Absent);

    geocoder.failing.store(false, Ordering::SeqCst);
    assert!(resolver.resolve(&krakow()).await.is_resolved());
    assert_eq!(geocoder.calls(), 2);
}

#[tokio::test]
async fn concurrent_callers_share_one_lookup() {
    let geocoder = Arc::new(FakeGeocoder {
        delay: Some(Duration::from_millis(50)),
        ..FakeGeocoder::answering(KRAKOW_TEXT, point(50.07, 19.94))
    });
    let resolver = Arc::new(CoordinateResolver::new(Arc::clone(&geocoder)));

    let tasks = (0..8).map(|_| {
        let resolver = Arc::clone(&resolver);
        async move { resolver.resolve(&krakow()).await }
    });
    let results = futures::future::join_all(tasks).await;

    assert!(results.iter().all(Coordinate::is_resolved));
    assert_eq!(geocoder.calls(), 1);
}

#[tokio::test]
async fn address_edit_invalidates_old_triple() {
    let geocoder = Arc::new(FakeGeocoder::answering(KRAKOW_TEXT, point(50.07, 19.94)));
    let resolver = CoordinateResolver::new(Arc::clone(&geocoder));

    let before = resolver.resolve(&krakow()).await;
    assert_eq!(resolver.cached_len(), 1);

    let moved = AddressFields {
        street: Some("ul. Krótka 1".to_string()),
        ..krakow()
    };
    let after = resolver.resolve_after_edit(&krakow(), &moved, &before).await;

    assert_eq!(after, Coordinate::Absent);
    assert_eq!(geocoder.calls(), 2);
    // Old triple gone, new one cached.
    assert_eq!(resolver.cached_len(), 1);
    assert!(!resolver.invalidate(&krakow()));
    assert!(resolver.invalidate(&moved));
}

#[tokio::test]
async fn unchanged_address_keeps_resolved_coordinate() {
    let geocoder = Arc::new(FakeGeocoder::default());
    let resolver = CoordinateResolver::new(Arc::clone(&geocoder));
    let current = Coordinate::Geocoded(point(50.0, 20.0));

    let after = resolver
        .resolve_after_edit(&krakow(), &krakow(), &current)
        .await;

    assert_eq!(after, current);
    assert_eq!(geocoder.calls(), 0);
}

#[tokio::test]
async fn blank_locality_is_absent_without_lookup() {
    let geocoder = Arc::new(FakeGeocoder::default());
    let resolver = CoordinateResolver::new(Arc::clone(&geocoder));
    let blank = AddressFields {
        locality: "  ".to_string(),
        street: None,
        region: None,
    };
    assert_eq!(resolver.resolve(&blank).await, Coordinate::Absent);
    assert_eq!(geocoder.calls(), 0);
}

#[tokio::test]
async fn ensure_coordinates_patches_the_store() {
    let mut record = facility(7, "Dom Seniora", "Kraków");
    record.street = Some("ul. Długa 5".to_string());
    let store = MemoryStore::with(vec![record.clone()]);
    let geocoder = Arc::new(FakeGeocoder::answering(KRAKOW_TEXT, point(50.07, 19.94)));
    let resolver = CoordinateResolver::new(Arc::clone(&geocoder));

    let coordinate = resolver.ensure_coordinates(&store, &record).await.unwrap();

    assert_eq!(coordinate, Coordinate::Geocoded(point(50.07, 19.94)));
    assert_eq!(store.patches.lock().unwrap().len(), 1);
    let stored = store.list_facilities_by_locality("krakow").await.unwrap();
    assert!(stored[0].coordinate.is_resolved());
}

#[tokio::test]
async fn ensure_coordinates_skips_resolved_and_unmatched() {
    let mut located = facility(1, "Dom A", "Kraków");
    located.coordinate = Coordinate::Manual(point(50.0, 20.0));
    let unmatched = facility(2, "Dom B", "Bobowa");
    let store = MemoryStore::with(vec![located.clone(), unmatched.clone()]);
    let geocoder = Arc::new(FakeGeocoder::default());
    let resolver = CoordinateResolver::new(Arc::clone(&geocoder));

    resolver.ensure_coordinates(&store, &located).await.unwrap();
    let absent = resolver.ensure_coordinates(&store, &unmatched).await.unwrap();

    assert_eq!(absent, Coordinate::Absent);
    assert_eq!(geocoder.calls(), 1);
    assert!(store.patches.lock().unwrap().is_empty());
}
