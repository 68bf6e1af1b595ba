//! Probability maps: per-site curves of probabilities of exceedance.
//!
//! Independent contributions are combined with the complement rule
//! `poe = 1 - (1 - a)(1 - b)`, which is commutative and associative, so the
//! result does not depend on the order partial maps arrive in.

use crate::error::NumericError;
use hazard_core::types::SiteId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Curves of probabilities of exceedance keyed by site.
///
/// # Examples
///
/// ```
/// use hazard_engine::pmap::ProbabilityMap;
///
/// let mut a = ProbabilityMap::new(2);
/// a.insert(0, vec![0.5, 0.5]).unwrap();
/// let mut b = ProbabilityMap::new(2);
/// b.insert(0, vec![0.5, 0.0]).unwrap();
///
/// a.merge(&b).unwrap();
/// assert_eq!(a.curve(0), Some(&[0.75, 0.5][..]));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ProbabilityMap {
    num_levels: usize,
    curves: BTreeMap<SiteId, Vec<f64>>,
}

impl ProbabilityMap {
    /// Empty map for curves of `num_levels` values.
    pub fn new(num_levels: usize) -> Self {
        Self {
            num_levels,
            curves: BTreeMap::new(),
        }
    }

    /// Number of levels per curve.
    pub fn num_levels(&self) -> usize {
        self.num_levels
    }

    /// Number of sites with a curve.
    pub fn len(&self) -> usize {
        self.curves.len()
    }

    /// Returns true if no site has a curve.
    pub fn is_empty(&self) -> bool {
        self.curves.is_empty()
    }

    /// Curve of a site.
    pub fn curve(&self, site: SiteId) -> Option<&[f64]> {
        self.curves.get(&site).map(Vec::as_slice)
    }

    /// Curve of a site, zeros when absent.
    pub fn curve_or_zero(&self, site: SiteId) -> Vec<f64> {
        self.curves
            .get(&site)
            .cloned()
            .unwrap_or_else(|| vec![0.0; self.num_levels])
    }

    /// Iterates over `(site, curve)` in site order.
    pub fn iter(&self) -> impl Iterator<Item = (SiteId, &[f64])> {
        self.curves.iter().map(|(s, c)| (*s, c.as_slice()))
    }

    /// Sites with a curve.
    pub fn sites(&self) -> impl Iterator<Item = SiteId> + '_ {
        self.curves.keys().copied()
    }

    /// Sets the curve of a site, replacing any previous one.
    ///
    /// # Errors
    ///
    /// [`NumericError::LevelMismatch`] on a wrong length,
    /// [`NumericError::InvalidPoe`] on NaN or values outside [0, 1].
    pub fn insert(&mut self, site: SiteId, curve: Vec<f64>) -> Result<(), NumericError> {
        self.check_curve(site, &curve)?;
        self.curves.insert(site, curve);
        Ok(())
    }

    /// Folds one curve into the map with the complement rule.
    ///
    /// # Errors
    ///
    /// Same as [`ProbabilityMap::insert`].
    pub fn combine_curve(&mut self, site: SiteId, curve: &[f64]) -> Result<(), NumericError> {
        self.check_curve(site, curve)?;
        match self.curves.get_mut(&site) {
            Some(existing) => {
                for (a, b) in existing.iter_mut().zip(curve) {
                    *a = 1.0 - (1.0 - *a) * (1.0 - b);
                }
            }
            None => {
                self.curves.insert(site, curve.to_vec());
            }
        }
        Ok(())
    }

    /// Folds `other` into `self` with the complement rule.
    ///
    /// # Errors
    ///
    /// [`NumericError::LevelMismatch`] when the maps have different level
    /// counts; [`NumericError::InvalidPoe`] when `other` holds invalid values.
    pub fn merge(&mut self, other: &ProbabilityMap) -> Result<(), NumericError> {
        if other.num_levels != self.num_levels {
            return Err(NumericError::LevelMismatch {
                expected: self.num_levels,
                got: other.num_levels,
            });
        }
        for (site, curve) in &other.curves {
            self.combine_curve(*site, curve)?;
        }
        Ok(())
    }

    /// Consuming variant of [`ProbabilityMap::merge`], handy in reductions.
    ///
    /// # Errors
    ///
    /// Same as [`ProbabilityMap::merge`].
    pub fn combined(mut self, other: &ProbabilityMap) -> Result<ProbabilityMap, NumericError> {
        self.merge(other)?;
        Ok(self)
    }

    /// Checks every value of the map.
    ///
    /// # Errors
    ///
    /// [`NumericError::InvalidPoe`] for the first invalid value.
    pub fn validate(&self) -> Result<(), NumericError> {
        for (site, curve) in &self.curves {
            self.check_curve(*site, curve)?;
        }
        Ok(())
    }

    fn check_curve(&self, site: SiteId, curve: &[f64]) -> Result<(), NumericError> {
        if curve.len() != self.num_levels {
            return Err(NumericError::LevelMismatch {
                expected: self.num_levels,
                got: curve.len(),
            });
        }
        for (level, &value) in curve.iter().enumerate() {
            if !(0.0..=1.0).contains(&value) {
                return Err(NumericError::InvalidPoe { site, level, value });
            }
        }
        Ok(())
    }
}
