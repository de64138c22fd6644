use std::f64::consts::PI;

use dealspot_common::{DistanceUnit, GeoPoint};

/// Haversine distance between two lat/lng points in the specified unit.
pub fn haversine_distance(a: GeoPoint, b: GeoPoint, unit: DistanceUnit) -> f64 {
    let to_rad = |deg: f64| deg * PI / 180.0;

    let dlat = to_rad(b.lat - a.lat);
    let dlng = to_rad(b.lng - a.lng);

    let h = (dlat / 2.0).sin().powi(2)
        + to_rad(a.lat).cos() * to_rad(b.lat).cos() * (dlng / 2.0).sin().powi(2);

    // Rounding can push h a hair above 1 for antipodal points.
    let c = 2.0 * h.min(1.0).sqrt().asin();
    unit.earth_radius() * c
}

/// Haversine distance between two lat/lng points in miles.
pub fn haversine_distance_miles(a: GeoPoint, b: GeoPoint) -> f64 {
    haversine_distance(a, b, DistanceUnit::Miles)
}

/// Something with a fixed position that can carry its distance from a query origin.
pub trait Located {
    fn location(&self) -> GeoPoint;
    fn set_distance(&mut self, distance: f64);
}

/// Annotate every item with its distance from `origin`. No filtering, no reordering.
pub fn rank<T: Located>(items: &mut [T], origin: GeoPoint, unit: DistanceUnit) {
    for item in items.iter_mut() {
        let d = haversine_distance(origin, item.location(), unit);
        item.set_distance(d);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINNEAPOLIS: GeoPoint = GeoPoint { lat: 44.96, lng: -93.27 };
    const ST_PAUL: GeoPoint = GeoPoint { lat: 44.94, lng: -93.09 };

    struct Pin {
        at: GeoPoint,
        distance: Option<f64>,
    }

    impl Located for Pin {
        fn location(&self) -> GeoPoint {
            self.at
        }
        fn set_distance(&mut self, distance: f64) {
            self.distance = Some(distance);
        }
    }

    #[test]
    fn test_minneapolis_to_st_paul() {
        let d = haversine_distance_miles(MINNEAPOLIS, ST_PAUL);
        assert!((d - 9.5).abs() < 1.0, "Expected ~9.5 miles, got {d}");
    }

    #[test]
    fn test_unit_consistency() {
        let miles = haversine_distance_miles(MINNEAPOLIS, ST_PAUL);
        let km = haversine_distance(MINNEAPOLIS, ST_PAUL, DistanceUnit::Kilometers);
        // 1 mile ≈ 1.609 km
        assert!((km / miles - 1.609).abs() < 0.01);
    }

    #[test]
    fn test_same_point_is_zero() {
        assert_eq!(haversine_distance_miles(ST_PAUL, ST_PAUL), 0.0);
    }

    #[test]
    fn test_antipodal_points_do_not_nan() {
        let d = haversine_distance(
            GeoPoint::new(0.0, 0.0),
            GeoPoint::new(0.0, 180.0),
            DistanceUnit::Kilometers,
        );
        assert!(d.is_finite() && d > 20_000.0);
    }

    #[test]
    fn test_rank_annotates_without_reordering() {
        let mut pins = vec![
            Pin { at: ST_PAUL, distance: None },
            Pin { at: MINNEAPOLIS, distance: None },
        ];
        rank(&mut pins, MINNEAPOLIS, DistanceUnit::Miles);
        assert_eq!(pins[0].at, ST_PAUL);
        assert!(pins[0].distance.unwrap() > 5.0);
        assert_eq!(pins[1].distance, Some(0.0));
    }
}
