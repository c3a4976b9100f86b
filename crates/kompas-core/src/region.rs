//! The sixteen Polish voivodeships and canonicalisation of free-form region input.

use crate::fuzzy::normalize;

/// Canonical voivodeship names, lower-case with diacritics.
pub const REGIONS: [&str; 16] = [
    "dolnośląskie",
    "kujawsko-pomorskie",
    "lubelskie",
    "lubuskie",
    "łódzkie",
    "małopolskie",
    "mazowieckie",
    "opolskie",
    "podkarpackie",
    "podlaskie",
    "pomorskie",
    "śląskie",
    "świętokrzyskie",
    "warmińsko-mazurskie",
    "wielkopolskie",
    "zachodniopomorskie",
];

/// Maps a region as typed by a user (any case, with or without diacritics)
/// onto its canonical spelling. Returns `None` for `"all"`, blanks and
/// anything that is not a voivodeship.
#[must_use]
pub fn canonical_region(input: &str) -> Option<&'static str> {
    let key = normalize(input);
    if key.is_empty() || key == "all" {
        return None;
    }
    REGIONS.iter().copied().find(|r| normalize(r) == key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_ascii_spelling() {
        assert_eq!(canonical_region("malopolskie"), Some("małopolskie"));
        assert_eq!(canonical_region("SLASKIE"), Some("śląskie"));
        assert_eq!(canonical_region(" lodzkie "), Some("łódzkie"));
    }

    #[test]
    fn all_and_unknown_are_unset() {
        assert_eq!(canonical_region("all"), None);
        assert_eq!(canonical_region(""), None);
        assert_eq!(canonical_region("bavaria"), None);
    }

    #[test]
    fn every_region_is_its_own_canonical_form() {
        for region in REGIONS {
            assert_eq!(canonical_region(region), Some(region));
        }
    }
}
