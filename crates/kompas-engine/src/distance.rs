//! Great-circle distances and nearest-first ordering.

use kompas_core::{Facility, GeoPoint};

const EARTH_RADIUS_KM: f64 = 6371.0;

/// Haversine distance between two points, in kilometres.
#[must_use]
pub fn haversine_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lon = (b.lon - a.lon).to_radians();
    let h = (d_lat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().atan2((1.0 - h).sqrt())
}

/// Rounds a distance to one decimal place for display and API output.
#[must_use]
pub fn round_km(km: f64) -> f64 {
    (km * 10.0).round() / 10.0
}

/// `"450 m"` under a kilometre, `"2.5 km"` otherwise.
///
/// The unit is chosen after rounding to whole metres, so `0.9996` km reads
/// `"1.0 km"` rather than `"1000 m"`.
#[must_use]
pub fn format_distance(km: f64) -> String {
    let metres = (km * 1000.0).round();
    if metres < 1000.0 {
        #[allow(clippy::cast_possible_truncation)]
        let metres = metres as i64;
        format!("{metres} m")
    } else {
        format!("{:.1} km", round_km(km))
    }
}

/// Orders `items` nearest-first by the position `locate` yields.
///
/// Items without a position keep their relative order and go last. The sort
/// is stable, so equidistant items also keep their prior order.
pub fn rank_by<T, F>(items: Vec<T>, user: GeoPoint, locate: F) -> Vec<T>
where
    F: Fn(&T) -> Option<GeoPoint>,
{
    let (mut located, absent): (Vec<(f64, T)>, Vec<(f64, T)>) = items
        .into_iter()
        .map(|item| {
            let d = locate(&item).map_or(f64::INFINITY, |p| haversine_km(user, p));
            (d, item)
        })
        .partition(|(d, _)| d.is_finite());

    located.sort_by(|(a, _), (b, _)| a.total_cmp(b));
    located
        .into_iter()
        .chain(absent)
        .map(|(_, item)| item)
        .collect()
}

/// Facilities ordered by ascending distance from `user`; those with an
/// absent coordinate follow in their original order.
#[must_use]
pub fn rank(facilities: Vec<Facility>, user: GeoPoint) -> Vec<Facility> {
    rank_by(facilities, user, |f| f.coordinate.point())
}
