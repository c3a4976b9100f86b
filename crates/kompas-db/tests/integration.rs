//! Offline unit tests for kompas-db pool configuration and row types.
//! These tests do not require a live database connection.

use kompas_core::{AppConfig, CareProfile, Coordinate, Environment, PlaceEntry};
use kompas_db::{FacilityRow, PlaceEntryRow, PoolConfig};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

#[test]
fn pool_config_from_app_config_clamps_min_to_max() {
    let app_config = AppConfig {
        database_url: "postgres://example".to_string(),
        env: Environment::Test,
        bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 3000),
        log_level: "info".to_string(),
        db_max_connections: 42,
        db_min_connections: 7,
        db_acquire_timeout_secs: 9,
        geocoder_url: "https://nominatim.openstreetmap.org/".to_string(),
        geocoder_user_agent: "ua".to_string(),
        geocoder_timeout_secs: 10,
        geocoder_max_retries: 2,
        geocoder_backoff_base_ms: 500,
        suggest_min_len: 2,
        suggest_limit: 5,
        places_path: None,
        places_refresh_cron: "0 */15 * * * *".to_string(),
        admin_api_keys: Vec::new(),
        admin_rate_limit: 120,
        admin_rate_limit_window_secs: 60,
    };

    let pool_config = PoolConfig::from_app_config(&app_config);
    assert_eq!(pool_config.max_connections, 42);
    assert_eq!(pool_config.min_connections, 7);
    assert_eq!(pool_config.acquire_timeout, std::time::Duration::from_secs(9));

    let inverted = AppConfig {
        db_max_connections: 2,
        db_min_connections: 5,
        ..app_config
    };
    let pool_config = PoolConfig::from_app_config(&inverted);
    assert_eq!(pool_config.max_connections, 2);
    assert_eq!(pool_config.min_connections, 2);
}

fn facility_row(category: &str, source: &str, lat: Option<f64>) -> FacilityRow {
    use chrono::Utc;
    use uuid::Uuid;

    FacilityRow {
        id: 3,
        public_id: Uuid::new_v4(),
        name: "Dom Pomocy Społecznej im. Helclów".to_string(),
        category: category.to_string(),
        locality: "Kraków".to_string(),
        street: Some("ul. Helclów 2".to_string()),
        postal_code: Some("31-148".to_string()),
        county: "Kraków".to_string(),
        region: "małopolskie".to_string(),
        phone: Some("+48 12 629 25 00".to_string()),
        email: None,
        website: None,
        seat_count: Some(200),
        subsidized_seat_count: Some(180),
        monthly_cost: Some(rust_decimal::Decimal::new(520_000, 2)),
        care_profiles: vec!["E".to_string(), "b".to_string()],
        coordinate_source: source.to_string(),
        latitude: lat,
        longitude: lat.map(|_| 19.95),
        source_url: None,
        source_date: None,
        verified: false,
        notes: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

#[test]
fn facility_row_converts_with_manual_coordinate() {
    let facility = facility_row("dps", "manual", Some(50.07))
        .into_facility()
        .expect("row should convert");

    assert_eq!(facility.id, 3);
    assert_eq!(facility.care_profiles, vec![CareProfile::B, CareProfile::E]);
    assert!(matches!(facility.coordinate, Coordinate::Manual(_)));
    assert!(!facility.is_free());
}

#[test]
fn facility_row_with_source_but_no_point_reads_absent() {
    let facility = facility_row("dps", "geocoded", None)
        .into_facility()
        .expect("row should convert");
    assert_eq!(facility.coordinate, Coordinate::Absent);
}

#[test]
fn facility_row_rejects_unknown_category() {
    assert!(facility_row("clinic", "absent", None).into_facility().is_err());
}

#[test]
fn place_row_converts_to_entry() {
    let entry = PlaceEntry::from(PlaceEntryRow {
        name: "Bobowa".to_string(),
        county: "gorlicki".to_string(),
        region: "małopolskie".to_string(),
        residential_count: 2,
        day_care_count: 1,
    });
    assert_eq!(entry.facility_count, 3);
    assert_eq!(entry.residential_count, 2);
    assert_eq!(entry.county, "gorlicki");
}
