//! Discovery and matching over facility records: place suggestions, filtered
//! search, distance ranking, coordinate resolution and duplicate detection.

pub mod distance;
pub mod duplicate;
pub mod geocode;
pub mod place_index;
pub mod search;
pub mod suggest;

pub use distance::{format_distance, haversine_km, rank};
pub use duplicate::{
    match_candidate, DuplicateCandidate, DuplicateMatch, DuplicateResolver, MatchConfidence,
    MatchedBy,
};
pub use geocode::{address_text, AddressKey, CoordinateResolver};
pub use place_index::{PlaceIndex, PlaceIndexHandle};
pub use search::{arrange, RankedFacility, SearchError, SearchExecutor, SearchResults};
pub use suggest::{SuggestOptions, SuggestSession, SuggestionEngine, Suggestions};
