mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use common::{facility, MemoryStore};
use kompas_core::Facility;
use kompas_engine::{
    match_candidate, DuplicateCandidate, DuplicateResolver, MatchConfidence, MatchedBy,
};

fn with_phone(mut f: Facility, phone: &str) -> Facility {
    f.phone = Some(phone.to_string());
    f
}

fn with_street(mut f: Facility, street: &str) -> Facility {
    f.street = Some(street.to_string());
    f
}

fn candidate(name: &str, locality: &str) -> DuplicateCandidate {
    DuplicateCandidate {
        name: name.to_string(),
        locality: locality.to_string(),
        ..DuplicateCandidate::default()
    }
}

#[test]
fn phone_match_wins_despite_different_name() {
    let existing = vec![with_phone(
        facility(1, "Dom Pomocy Społecznej Helcel", "Kraków"),
        "+48 12 345 67 89",
    )];
    let c = DuplicateCandidate {
        phone: Some("12-345-67-89".to_string()),
        ..candidate("Zupełnie Inna Nazwa", "Kraków")
    };

    let found = match_candidate(&c, &existing).unwrap();
    assert_eq!(found.facility_id, 1);
    assert_eq!(found.matched_by, MatchedBy::Phone);
    assert_eq!(found.confidence, MatchConfidence::High);
}

#[test]
fn short_phone_is_not_evidence() {
    let existing = vec![with_phone(facility(1, "Dom A", "Kraków"), "12 345 67")];
    let c = DuplicateCandidate {
        phone: Some("1234567".to_string()),
        ..candidate("Xyz", "Kraków")
    };
    assert!(match_candidate(&c, &existing).is_none());
}

#[test]
fn address_beats_name_across_different_records() {
    let existing = vec![
        facility(1, "Dom Seniora Pogodna Jesień", "Tarnów"),
        with_street(facility(2, "Centrum Opiekuńcze", "Tarnów"), "ul. Lwowska 12"),
    ];
    let c = DuplicateCandidate {
        street: Some("Lwowska 12".to_string()),
        ..candidate("Dom Seniora Pogodna Jesień", "Tarnow")
    };

    let found = match_candidate(&c, &existing).unwrap();
    assert_eq!(found.facility_id, 2);
    assert_eq!(found.matched_by, MatchedBy::Address);
}

#[test]
fn short_street_is_not_evidence() {
    let existing = vec![with_street(facility(1, "Dom A", "Kraków"), "5")];
    let c = DuplicateCandidate {
        street: Some("ul. 5".to_string()),
        ..candidate("Zzz", "Kraków")
    };
    assert!(match_candidate(&c, &existing).is_none());
}

#[test]
fn exact_name_is_medium_prefix_is_low() {
    let existing = vec![facility(1, "Dom Pomocy Społecznej w Bobowej", "Bobowa")];

    let exact = match_candidate(&candidate("dom pomocy spolecznej w bobowej", "Bobowa"), &existing)
        .unwrap();
    assert_eq!(exact.matched_by, MatchedBy::Name);
    assert_eq!(exact.confidence, MatchConfidence::Medium);

    let prefix = match_candidate(&candidate("Dom Pomocy", "Bobowa"), &existing).unwrap();
    assert_eq!(prefix.confidence, MatchConfidence::Low);
}

#[test]
fn exact_name_preferred_over_earlier_prefix_match() {
    let existing = vec![
        facility(1, "Dom Seniora Słoneczny Brzeg", "Gorlice"),
        facility(2, "Dom Seniora", "Gorlice"),
    ];
    let found = match_candidate(&candidate("Dom Seniora", "Gorlice"), &existing).unwrap();
    assert_eq!(found.facility_id, 2);
    assert_eq!(found.confidence, MatchConfidence::Medium);
}

#[test]
fn two_letter_name_never_matches() {
    let existing = vec![facility(1, "DP", "Kraków")];
    assert!(match_candidate(&candidate("DP", "Kraków"), &existing).is_none());
}

#[test]
fn other_localities_are_ignored() {
    let existing = vec![with_phone(facility(1, "Dom A", "Tarnów"), "123456789")];
    let c = DuplicateCandidate {
        phone: Some("123456789".to_string()),
        ..candidate("Dom A", "Kraków")
    };
    assert!(match_candidate(&c, &existing).is_none());
}

#[test]
fn edited_record_is_not_its_own_duplicate() {
    let existing = vec![facility(4, "Dom Seniora", "Kraków")];
    let c = DuplicateCandidate {
        exclude_id: Some(4),
        ..candidate("Dom Seniora", "Kraków")
    };
    assert!(match_candidate(&c, &existing).is_none());
}

#[tokio::test]
async fn short_locality_skips_the_store() {
    let store = Arc::new(MemoryStore::with(vec![facility(1, "Dom A", "K")]));
    let resolver = DuplicateResolver::new(Arc::clone(&store));

    let found = resolver.find_duplicate(&candidate("Dom A", "K")).await.unwrap();

    assert!(found.is_none());
    assert_eq!(store.locality_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn resolver_reads_only_the_candidate_locality() {
    let store = Arc::new(MemoryStore::with(vec![
        with_phone(facility(1, "Dom A", "Tarnów"), "+48 14 621 00 00"),
        with_phone(facility(2, "Dom B", "Kraków"), "14 621 00 00"),
    ]));
    let resolver = DuplicateResolver::new(Arc::clone(&store));
    let c = DuplicateCandidate {
        phone: Some("146210000".to_string()),
        ..candidate("Nowy Dom", "Kraków")
    };

    let found = resolver.find_duplicate(&c).await.unwrap().unwrap();

    assert_eq!(found.facility_id, 2);
    assert_eq!(found.facility_name, "Dom B");
    assert_eq!(store.locality_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn store_failure_is_surfaced() {
    let store = Arc::new(MemoryStore::default());
    store.unavailable.store(true, Ordering::SeqCst);
    let resolver = DuplicateResolver::new(Arc::clone(&store));
    assert!(resolver
        .find_duplicate(&candidate("Dom A", "Kraków"))
        .await
        .is_err());
}

#[test]
fn match_serializes_lowercase_tags() {
    let existing = vec![facility(1, "Dom Seniora", "Kraków")];
    let found = match_candidate(&candidate("Dom Seniora", "Kraków"), &existing).unwrap();
    let json = serde_json::to_value(&found).unwrap();
    assert_eq!(json["matched_by"], "name");
    assert_eq!(json["confidence"], "medium");
}
