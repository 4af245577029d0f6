use serde::{Deserialize, Serialize};

const EARTH_RADIUS_KM: f64 = 6371.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lng: f64) -> Option<Self> {
        if lat.is_finite() && lng.is_finite() {
            Some(Self { lat, lng })
        } else {
            None
        }
    }

    /// Great-circle distance to `other` in kilometers.
    pub fn distance_km(&self, other: &Coordinates) -> f64 {
        let d_lat = (other.lat - self.lat).to_radians();
        let d_lng = (other.lng - self.lng).to_radians();
        let a = (d_lat / 2.0).sin().powi(2)
            + self.lat.to_radians().cos() * other.lat.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
        EARTH_RADIUS_KM * 2.0 * a.sqrt().atan2((1.0 - a).sqrt())
    }
}

/// Display formatting: meters below 1 km, otherwise one decimal in km.
pub fn format_distance(km: f64) -> String {
    if km < 1.0 {
        format!("{}m", (km * 1000.0).round() as i64)
    } else {
        format!("{:.1}km", km)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_finite_coordinates() {
        assert!(Coordinates::new(f64::NAN, 0.0).is_none());
        assert!(Coordinates::new(0.0, f64::INFINITY).is_none());
        assert!(Coordinates::new(49.2827, -123.1207).is_some());
    }

    #[test]
    fn haversine_matches_known_distance() {
        // Vancouver to Seattle, roughly 193 km.
        let van = Coordinates::new(49.2827, -123.1207).unwrap();
        let sea = Coordinates::new(47.6062, -122.3321).unwrap();
        let km = van.distance_km(&sea);
        assert!((km - 193.0).abs() < 5.0, "got {km}");
    }

    #[test]
    fn distance_to_self_is_zero() {
        let here = Coordinates::new(10.5, 20.5).unwrap();
        assert_eq!(here.distance_km(&here), 0.0);
    }

    #[test]
    fn formats_sub_kilometer_as_meters() {
        assert_eq!(format_distance(0.45), "450m");
        assert_eq!(format_distance(0.9996), "1000m");
    }

    #[test]
    fn formats_kilometers_with_one_decimal() {
        assert_eq!(format_distance(2.3), "2.3km");
        assert_eq!(format_distance(1.0), "1.0km");
    }
}
