use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;

use crate::facility::PlaceEntry;
use crate::fuzzy::normalize;
use crate::region::canonical_region;
use crate::ConfigError;

#[derive(Debug, Deserialize)]
pub struct PlacesFile {
    pub places: Vec<PlaceEntry>,
}

/// Load and validate a place-index seed from a YAML file.
///
/// Regions are rewritten to their canonical voivodeship spelling. Each
/// place lists `residential_count` and `day_care_count`; `facility_count`
/// may be omitted and is then their sum.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_places(path: &Path) -> Result<PlacesFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::PlacesFileIo {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_places(&content)
}

/// Parse and validate place-index YAML already in memory.
///
/// # Errors
///
/// Returns `ConfigError` if the YAML is malformed or fails validation.
pub fn parse_places(content: &str) -> Result<PlacesFile, ConfigError> {
    let mut places_file: PlacesFile =
        serde_yaml::from_str(content).map_err(ConfigError::PlacesFileParse)?;
    validate_places(&mut places_file)?;
    Ok(places_file)
}

fn validate_places(places_file: &mut PlacesFile) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();

    for place in &mut places_file.places {
        if place.name.trim().is_empty() {
            return Err(ConfigError::PlacesFileValidation(
                "place name must be non-empty".to_string(),
            ));
        }
        if place.county.trim().is_empty() {
            return Err(ConfigError::PlacesFileValidation(format!(
                "place '{}' has an empty county",
                place.name
            )));
        }

        let Some(region) = canonical_region(&place.region) else {
            return Err(ConfigError::PlacesFileValidation(format!(
                "place '{}' has unknown region '{}'",
                place.name, place.region
            )));
        };
        place.region = region.to_string();

        let by_category = place
            .residential_count
            .checked_add(place.day_care_count)
            .ok_or_else(|| {
                ConfigError::PlacesFileValidation(format!(
                    "place '{}' has out-of-range counts",
                    place.name
                ))
            })?;
        if place.facility_count == 0 {
            place.facility_count = by_category;
        } else if place.facility_count != by_category {
            return Err(ConfigError::PlacesFileValidation(format!(
                "place '{}' has facility_count {} but {} residential + {} day-care",
                place.name, place.facility_count, place.residential_count, place.day_care_count
            )));
        }

        if !seen.insert((normalize(&place.name), normalize(&place.county))) {
            return Err(ConfigError::PlacesFileValidation(format!(
                "duplicate place: '{}' in county '{}'",
                place.name, place.county
            )));
        }
    }

    Ok(())
}
