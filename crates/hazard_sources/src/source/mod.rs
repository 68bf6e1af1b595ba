//! Seismic sources and their cost model.
//!
//! - [`Source`]: immutable source description
//! - [`SourceKind`]: closed set of typologies
//! - [`split`](split::split): budget-driven splitting into balanced pieces
//! - [`grid_point_sources`](gridding::grid_point_sources): point-source collapsing

pub mod gridding;
pub mod kind;
pub mod split;

pub use gridding::grid_point_sources;
pub use kind::SourceKind;
pub use split::{split, split_all, SplitStats};

use crate::error::SourceError;
use hazard_core::types::{GroupId, Location, SourceId, TectonicRegionType};
use serde::{Deserialize, Serialize};

/// Annual occurrence rate of ruptures of a given magnitude.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MagRate {
    /// Magnitude.
    pub mag: f64,
    /// Annual rate summed over all ruptures of the source.
    pub rate: f64,
}

impl MagRate {
    /// Creates a bin.
    pub fn new(mag: f64, rate: f64) -> Self {
        Self { mag, rate }
    }
}

/// A seismic source.
///
/// The magnitude-frequency distribution is shared uniformly by the source
/// locations: each location carries `rate / locations.len()` of every bin.
///
/// # Examples
///
/// ```
/// use hazard_core::types::Location;
/// use hazard_sources::source::{MagRate, Source, SourceKind};
///
/// let src = Source::new("sf1", SourceKind::SimpleFault, "Active Shallow Crust", 120)
///     .with_locations(vec![Location::new(10.0, 45.0), Location::new(10.1, 45.0)])
///     .with_mfd(vec![MagRate::new(6.0, 0.01), MagRate::new(6.5, 0.004)]);
///
/// assert_eq!(src.weight(), 120.0);
/// assert!((src.total_rate() - 0.014).abs() < 1e-15);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Source {
    /// Source id; unique inside a source group.
    pub id: SourceId,
    /// Typology.
    pub kind: SourceKind,
    /// Tectonic region type.
    pub trt: TectonicRegionType,
    /// Number of ruptures generated by the source.
    pub num_ruptures: usize,
    /// Index of the first rupture within the unsplit parent.
    #[serde(default)]
    pub first_rupture: usize,
    /// Representative locations (point, grid nodes, fault trace).
    #[serde(default)]
    pub locations: Vec<Location>,
    /// Magnitude-frequency distribution.
    #[serde(default)]
    pub mfd: Vec<MagRate>,
    /// Number of sites within the integration distance; 0 if not filtered.
    #[serde(default)]
    pub nsites: usize,
    /// Group the source was assigned to by the composite model builder.
    #[serde(default)]
    pub grp_id: Option<GroupId>,
}

impl Source {
    /// Creates a source without geometry or MFD.
    pub fn new(
        id: impl Into<SourceId>,
        kind: SourceKind,
        trt: impl Into<TectonicRegionType>,
        num_ruptures: usize,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            trt: trt.into(),
            num_ruptures,
            first_rupture: 0,
            locations: Vec::new(),
            mfd: Vec::new(),
            nsites: 0,
            grp_id: None,
        }
    }

    /// Sets the locations.
    pub fn with_locations(mut self, locations: Vec<Location>) -> Self {
        self.locations = locations;
        self
    }

    /// Sets the magnitude-frequency distribution.
    pub fn with_mfd(mut self, mfd: Vec<MagRate>) -> Self {
        self.mfd = mfd;
        self
    }

    /// Sets the number of affected sites.
    pub fn with_nsites(mut self, nsites: usize) -> Self {
        self.nsites = nsites;
        self
    }

    /// Cost of a single rupture: kind factor times the site term.
    #[inline]
    pub fn unit_weight(&self) -> f64 {
        self.kind.weight_factor() * (self.nsites.max(1) as f64).sqrt()
    }

    /// Estimated computational cost.
    ///
    /// `num_ruptures × kind_factor × sqrt(max(nsites, 1))`; monotonic in both
    /// the number of ruptures and the number of affected sites.
    #[inline]
    pub fn weight(&self) -> f64 {
        self.num_ruptures as f64 * self.unit_weight()
    }

    /// Sum of the MFD rates.
    pub fn total_rate(&self) -> f64 {
        self.mfd.iter().map(|b| b.rate).sum()
    }

    /// MFD with every rate multiplied by `factor`.
    pub fn scaled_mfd(&self, factor: f64) -> Vec<MagRate> {
        self.mfd
            .iter()
            .map(|b| MagRate::new(b.mag, b.rate * factor))
            .collect()
    }

    /// Checks rates and geometry.
    ///
    /// # Errors
    ///
    /// [`SourceError::InvalidSource`] when an MFD rate or magnitude is NaN,
    /// infinite or a rate is negative, or when a source with an MFD has no
    /// location.
    pub fn validate(&self) -> Result<(), SourceError> {
        for bin in &self.mfd {
            if !bin.mag.is_finite() || !bin.rate.is_finite() || bin.rate < 0.0 {
                return Err(SourceError::InvalidSource {
                    id: self.id.to_string(),
                    reason: format!("invalid MFD bin (mag {}, rate {})", bin.mag, bin.rate),
                });
            }
        }
        if !self.mfd.is_empty() && self.locations.is_empty() {
            return Err(SourceError::InvalidSource {
                id: self.id.to_string(),
                reason: "no locations".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_weight_formula() {
        let src = Source::new("c1", SourceKind::ComplexFault, "Subduction Interface", 10);
        assert_relative_eq!(src.weight(), 20.0);
        let src = src.with_nsites(16);
        assert_relative_eq!(src.weight(), 80.0);
    }

    #[test]
    fn test_weight_monotonic_in_sites() {
        let a = Source::new("a", SourceKind::Point, "X", 5).with_nsites(3);
        let b = a.clone().with_nsites(4);
        assert!(b.weight() > a.weight());
    }

    #[test]
    fn test_zero_and_one_site_weigh_the_same() {
        let a = Source::new("a", SourceKind::Area, "X", 7);
        assert_eq!(a.weight(), a.clone().with_nsites(1).weight());
    }

    #[test]
    fn test_validate_rejects_negative_rate() {
        let src = Source::new("p", SourceKind::Point, "X", 1)
            .with_locations(vec![Location::new(0.0, 0.0)])
            .with_mfd(vec![MagRate::new(5.0, -1.0)]);
        assert!(matches!(
            src.validate(),
            Err(SourceError::InvalidSource { .. })
        ));
    }

    #[test]
    fn test_validate_requires_location() {
        let src = Source::new("p", SourceKind::Point, "X", 1).with_mfd(vec![MagRate::new(5.0, 0.1)]);
        assert!(src.validate().is_err());
    }

    #[test]
    fn test_scaled_mfd() {
        let src = Source::new("p", SourceKind::Point, "X", 1)
            .with_mfd(vec![MagRate::new(5.0, 0.2), MagRate::new(5.5, 0.1)]);
        let scaled = src.scaled_mfd(0.5);
        assert_relative_eq!(scaled[0].rate, 0.1);
        assert_relative_eq!(scaled[1].rate, 0.05);
        assert_eq!(scaled[1].mag, 5.5);
    }
}
