//! Geographic locations and distances on a spherical Earth.

use serde::{Deserialize, Serialize};

/// Mean Earth radius in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Kilometres spanned by one degree of arc on a great circle.
pub const KM_PER_DEGREE: f64 = 2.0 * std::f64::consts::PI * EARTH_RADIUS_KM / 360.0;

/// A point given by longitude and latitude in decimal degrees and depth in km.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Longitude in decimal degrees.
    pub lon: f64,
    /// Latitude in decimal degrees.
    pub lat: f64,
    /// Depth in km, positive downwards.
    #[serde(default)]
    pub depth: f64,
}

impl Location {
    /// Creates a location at the surface.
    #[inline]
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat, depth: 0.0 }
    }

    /// Creates a location at the given depth.
    #[inline]
    pub fn with_depth(lon: f64, lat: f64, depth: f64) -> Self {
        Self { lon, lat, depth }
    }

    /// Great-circle (epicentral) distance to `other` in km.
    ///
    /// Uses the haversine formula.
    ///
    /// # Examples
    ///
    /// ```
    /// use hazard_core::types::Location;
    ///
    /// let a = Location::new(0.0, 0.0);
    /// let b = Location::new(1.0, 0.0);
    /// assert!((a.epicentral_distance(&b) - 111.195).abs() < 1e-3);
    /// ```
    pub fn epicentral_distance(&self, other: &Location) -> f64 {
        let (lon1, lat1) = (self.lon.to_radians(), self.lat.to_radians());
        let (lon2, lat2) = (other.lon.to_radians(), other.lat.to_radians());
        let dlat = lat2 - lat1;
        let dlon = lon2 - lon1;
        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_KM * a.sqrt().min(1.0).asin()
    }

    /// Straight-line distance accounting for the depth difference, in km.
    pub fn hypocentral_distance(&self, other: &Location) -> f64 {
        let epi = self.epicentral_distance(other);
        let dz = self.depth - other.depth;
        (epi * epi + dz * dz).sqrt()
    }
}

/// Converts a distance in km to degrees of longitude at the given latitude.
///
/// At the equator this is the plain great-circle conversion; towards the
/// poles a longitude degree covers fewer kilometres.
pub fn longitude_span(distance_km: f64, lat: f64) -> f64 {
    let cos_lat = lat.to_radians().cos().abs().max(1e-6);
    distance_km / (KM_PER_DEGREE * cos_lat)
}

/// Converts a distance in km to degrees of latitude.
#[inline]
pub fn latitude_span(distance_km: f64) -> f64 {
    distance_km / KM_PER_DEGREE
}
