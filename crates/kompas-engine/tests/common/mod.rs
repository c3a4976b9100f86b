#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use kompas_core::fuzzy::normalize;
use kompas_core::{
    CareProfile, Coordinate, Facility, FacilityCategory, FacilityPredicate, FacilityStore,
    GeoPoint, Geocoder, GeocoderError, StoreError,
};
use rust_decimal::Decimal;

pub fn point(lat: f64, lon: f64) -> GeoPoint {
    GeoPoint::new(lat, lon).expect("valid test coordinate")
}

pub fn facility(id: i64, name: &str, locality: &str) -> Facility {
    let now = Utc::now();
    Facility {
        id,
        name: name.to_string(),
        category: FacilityCategory::Residential,
        locality: locality.to_string(),
        street: None,
        postal_code: None,
        county: locality.to_string(),
        region: "małopolskie".to_string(),
        phone: None,
        email: None,
        website: None,
        seat_count: None,
        subsidized_seat_count: None,
        monthly_cost: None,
        care_profiles: vec![CareProfile::E],
        coordinate: Coordinate::Absent,
        source_url: None,
        source_date: None,
        verified: true,
        notes: None,
        created_at: now,
        updated_at: now,
    }
}

pub fn with_cost(mut f: Facility, cost: i64) -> Facility {
    f.monthly_cost = Some(Decimal::from(cost));
    f
}

pub fn at(mut f: Facility, lat: f64, lon: f64) -> Facility {
    f.coordinate = Coordinate::Geocoded(point(lat, lon));
    f
}

/// In-memory record store with call counters and a failure switch.
#[derive(Default)]
pub struct MemoryStore {
    pub facilities: Mutex<Vec<Facility>>,
    pub patches: Mutex<Vec<(i64, Coordinate)>>,
    pub locality_calls: AtomicU32,
    pub unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn with(facilities: Vec<Facility>) -> Self {
        Self {
            facilities: Mutex::new(facilities),
            ..Self::default()
        }
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("connection refused".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl FacilityStore for MemoryStore {
    async fn list_facilities_by_locality(
        &self,
        locality: &str,
    ) -> Result<Vec<Facility>, StoreError> {
        self.locality_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        let key = normalize(locality);
        Ok(self
            .facilities
            .lock()
            .unwrap()
            .iter()
            .filter(|f| normalize(&f.locality) == key)
            .cloned()
            .collect())
    }

    async fn query_facilities(
        &self,
        predicate: &FacilityPredicate,
    ) -> Result<Vec<Facility>, StoreError> {
        self.check()?;
        Ok(self
            .facilities
            .lock()
            .unwrap()
            .iter()
            .filter(|f| predicate.matches(f))
            .cloned()
            .collect())
    }

    async fn patch_facility_coordinates(
        &self,
        id: i64,
        coordinate: Coordinate,
    ) -> Result<(), StoreError> {
        self.check()?;
        let mut facilities = self.facilities.lock().unwrap();
        let facility = facilities
            .iter_mut()
            .find(|f| f.id == id)
            .ok_or(StoreError::NotFound(id))?;
        facility.coordinate = coordinate;
        self.patches.lock().unwrap().push((id, coordinate));
        Ok(())
    }
}

/// Scripted geocoder. Unknown addresses answer "no match".
#[derive(Default)]
pub struct FakeGeocoder {
    pub answers: HashMap<String, GeoPoint>,
    pub calls: AtomicU32,
    pub failing: AtomicBool,
    pub delay: Option<Duration>,
}

impl FakeGeocoder {
    pub fn answering(address: &str, p: GeoPoint) -> Self {
        let mut answers = HashMap::new();
        answers.insert(address.to_string(), p);
        Self {
            answers,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Geocoder for FakeGeocoder {
    async fn lookup(&self, address: &str) -> Result<Option<GeoPoint>, GeocoderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(GeocoderError::Transport("connection reset".to_string()));
        }
        Ok(self.answers.get(address).copied())
    }
}
