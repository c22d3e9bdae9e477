use crate::RegionError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Mean Earth radius (IUGG) used for great-circle distances.
pub const EARTH_RADIUS_METERS: f64 = 6_371_008.8;

/// A WGS84 position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn validate(&self) -> Result<(), RegionError> {
        if !self.latitude.is_finite() || !(-90.0..=90.0).contains(&self.latitude) {
            return Err(RegionError::InvalidLatitude(self.latitude));
        }
        if !self.longitude.is_finite() || !(-180.0..=180.0).contains(&self.longitude) {
            return Err(RegionError::InvalidLongitude(self.longitude));
        }
        Ok(())
    }

    /// Great-circle distance in meters (haversine).
    pub fn distance_to(&self, other: &Coordinate) -> f64 {
        let lat1 = self.latitude.to_radians();
        let lat2 = other.latitude.to_radians();
        let dlat = lat2 - lat1;
        let dlon = (other.longitude - self.longitude).to_radians();

        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_METERS * a.sqrt().min(1.0).asin()
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.latitude, self.longitude)
    }
}

/// A single circular geofence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub center: Coordinate,
    pub radius_meters: f32,
    pub active: bool,
}

impl Region {
    /// Build an active region, rejecting a non-positive radius or
    /// out-of-range center.
    pub fn new(center: Coordinate, radius_meters: f32) -> Result<Self, RegionError> {
        if !radius_meters.is_finite() || radius_meters <= 0.0 {
            return Err(RegionError::InvalidRadius(radius_meters));
        }
        center.validate()?;
        Ok(Self {
            center,
            radius_meters,
            active: true,
        })
    }

    /// Distance in meters from the region center.
    pub fn distance_from_center(&self, point: &Coordinate) -> f64 {
        self.center.distance_to(point)
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} r={}m", self.center, self.radius_meters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_region_is_active() {
        let region = Region::new(Coordinate::new(37.0, -122.0), 100.0).unwrap();
        assert!(region.active);
        assert_eq!(region.radius_meters, 100.0);
    }

    #[test]
    fn test_rejects_non_positive_radius() {
        let center = Coordinate::new(1.0, 2.0);
        assert_eq!(
            Region::new(center, 0.0),
            Err(RegionError::InvalidRadius(0.0))
        );
        assert!(Region::new(center, -5.0).is_err());
        assert!(Region::new(center, f32::NAN).is_err());
        assert!(Region::new(center, f32::INFINITY).is_err());
    }

    #[test]
    fn test_rejects_out_of_range_center() {
        assert!(matches!(
            Region::new(Coordinate::new(91.0, 0.0), 10.0),
            Err(RegionError::InvalidLatitude(_))
        ));
        assert!(matches!(
            Region::new(Coordinate::new(0.0, -180.5), 10.0),
            Err(RegionError::InvalidLongitude(_))
        ));
        assert!(Region::new(Coordinate::new(f64::NAN, 0.0), 10.0).is_err());
    }

    #[test]
    fn test_distance_zero_for_same_point() {
        let p = Coordinate::new(37.0, -122.0);
        assert!(p.distance_to(&p).abs() < 1e-6);
    }

    #[test]
    fn test_distance_one_degree_latitude() {
        // One degree of latitude is ~111.2 km on a sphere of this radius.
        let a = Coordinate::new(0.0, 0.0);
        let b = Coordinate::new(1.0, 0.0);
        let d = a.distance_to(&b);
        assert!((d - 111_195.0).abs() < 10.0, "got {d}");
    }

    #[test]
    fn test_distance_is_symmetric() {
        let a = Coordinate::new(37.7749, -122.4194);
        let b = Coordinate::new(34.0522, -118.2437);
        assert!((a.distance_to(&b) - b.distance_to(&a)).abs() < 1e-6);
    }
}
