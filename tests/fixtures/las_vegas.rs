//! Real Las Vegas landmarks for realistic test fixtures.
//!
//! Coordinates sourced from OpenStreetMap.

use chrono::{NaiveDate, NaiveDateTime};
use traffic_route::Coordinate;
use traffic_route::polyline;

/// A named location.
#[derive(Debug, Clone, Copy)]
pub struct Landmark {
    pub name: &'static str,
    pub coord: Coordinate,
}

impl Landmark {
    pub const fn new(name: &'static str, lat: f64, lng: f64) -> Self {
        Self {
            name,
            coord: Coordinate::new(lat, lng),
        }
    }
}

pub const BELLAGIO: Landmark = Landmark::new("Bellagio", 36.1126, -115.1767);
pub const WYNN: Landmark = Landmark::new("Wynn Las Vegas", 36.1263781, -115.1658180);
pub const MGM_GRAND: Landmark = Landmark::new("MGM Grand", 36.1023654, -115.1688720);
pub const FREMONT_STREET: Landmark = Landmark::new("Fremont Street", 36.1699, -115.1398);
pub const LONGHORN_CASINO: Landmark = Landmark::new("Longhorn Casino", 36.1070664, -115.0591256);
pub const GREEN_VALLEY_RANCH: Landmark = Landmark::new("Green Valley Ranch Area", 36.0308, -115.0825);
pub const SUNSET_STATION: Landmark = Landmark::new("Sunset Station Area", 36.0614, -115.0631);
pub const ISLANDERS_GRILL: Landmark = Landmark::new("Islander's Grill", 36.0335058, -114.9856162);

/// Pairs of landmarks across the metro area.
pub fn metro_pairs() -> Vec<(Coordinate, Coordinate)> {
    vec![
        (BELLAGIO.coord, FREMONT_STREET.coord),
        (WYNN.coord, MGM_GRAND.coord),
        (LONGHORN_CASINO.coord, GREEN_VALLEY_RANCH.coord),
        (SUNSET_STATION.coord, ISLANDERS_GRILL.coord),
    ]
}

/// A point `meters` due north of `from`.
pub fn north_of(from: Coordinate, meters: f64) -> Coordinate {
    Coordinate::new(from.lat + meters / 111_195.0, from.lng)
}

/// `points` evenly spaced coordinates from `from` to `to`, inclusive.
pub fn line_between(from: Coordinate, to: Coordinate, points: usize) -> Vec<Coordinate> {
    let steps = (points.max(2) - 1) as f64;
    (0..points.max(2))
        .map(|i| {
            let t = i as f64 / steps;
            Coordinate::new(
                from.lat + (to.lat - from.lat) * t,
                from.lng + (to.lng - from.lng) * t,
            )
        })
        .collect()
}

/// A detour from `from` to `to` bending through `via`.
pub fn dogleg(from: Coordinate, via: Coordinate, to: Coordinate, points_per_leg: usize) -> Vec<Coordinate> {
    let mut coords = line_between(from, via, points_per_leg);
    coords.extend(line_between(via, to, points_per_leg).into_iter().skip(1));
    coords
}

/// Encodes after quantizing, so decoded points compare equal.
pub fn encoded(coords: &[Coordinate]) -> String {
    polyline::encode(coords)
}

/// Wednesday 2024-03-13 at `hour:00`.
pub fn wednesday_at(hour: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, 13)
        .unwrap()
        .and_hms_opt(hour, 0, 0)
        .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use traffic_route::haversine::haversine_m;

    #[test]
    fn test_north_of_distance() {
        let north = north_of(BELLAGIO.coord, 5000.0);
        let distance = haversine_m(BELLAGIO.coord, north);
        assert!((distance - 5000.0).abs() < 10.0, "got {distance}");
    }

    #[test]
    fn test_line_between_endpoints() {
        let line = line_between(BELLAGIO.coord, WYNN.coord, 10);
        assert_eq!(line.len(), 10);
        assert_eq!(line[0], BELLAGIO.coord);
        assert!(line[9].approx_eq(&WYNN.coord, 1e-12));
    }
}
