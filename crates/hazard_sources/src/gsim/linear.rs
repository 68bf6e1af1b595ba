use super::{GroundMotion, GroundMotionModel, RuptureContext};
use crate::error::SourceError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Reference vs30 of the site term, m/s.
const VS30_REF: f64 = 760.0;

/// Coefficients of [`LinearLogModel`] for one IMT.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinearLogCoeffs {
    /// Constant term.
    pub c0: f64,
    /// Magnitude scaling.
    pub c1: f64,
    /// Geometric spreading.
    pub c2: f64,
    /// Site amplification.
    pub c3: f64,
    /// Near-source saturation depth, km.
    pub h: f64,
    /// Total standard deviation of ln(IM).
    pub sigma: f64,
}

impl Default for LinearLogCoeffs {
    fn default() -> Self {
        Self {
            c0: -3.5,
            c1: 1.0,
            c2: 1.2,
            c3: -0.5,
            h: 10.0,
            sigma: 0.6,
        }
    }
}

/// Parametric model `ln IM = c0 + c1·M − c2·ln(R + h) + c3·ln(vs30 / 760)`.
///
/// A compact stand-in for real ground-motion equations, configurable per
/// IMT from job files.
///
/// ```
/// use hazard_sources::gsim::{GroundMotionModel, LinearLogCoeffs, LinearLogModel, RuptureContext};
///
/// let model = LinearLogModel::new("LinearLog").with_imt("PGA", LinearLogCoeffs::default());
/// let near = RuptureContext { mag: 6.0, distance_km: 5.0, vs30: 760.0 };
/// let far = RuptureContext { distance_km: 100.0, ..near };
///
/// let gm_near = model.ground_motion(&near, "PGA").unwrap();
/// let gm_far = model.ground_motion(&far, "PGA").unwrap();
/// assert!(gm_near.mean_ln > gm_far.mean_ln);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LinearLogModel {
    name: String,
    coeffs: BTreeMap<String, LinearLogCoeffs>,
}

impl LinearLogModel {
    /// Creates a model with no IMT.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            coeffs: BTreeMap::new(),
        }
    }

    /// Adds coefficients for an IMT.
    pub fn with_imt(mut self, imt: impl Into<String>, coeffs: LinearLogCoeffs) -> Self {
        self.coeffs.insert(imt.into(), coeffs);
        self
    }
}

impl GroundMotionModel for LinearLogModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn supports(&self, imt: &str) -> bool {
        self.coeffs.contains_key(imt)
    }

    fn ground_motion(&self, ctx: &RuptureContext, imt: &str) -> Result<GroundMotion, SourceError> {
        let c = self
            .coeffs
            .get(imt)
            .ok_or_else(|| SourceError::UnsupportedImt {
                gsim: self.name.clone(),
                imt: imt.to_string(),
            })?;
        let site = if ctx.vs30 > 0.0 {
            c.c3 * (ctx.vs30 / VS30_REF).ln()
        } else {
            0.0
        };
        let mean_ln = c.c0 + c.c1 * ctx.mag - c.c2 * (ctx.distance_km + c.h).ln() + site;
        Ok(GroundMotion {
            mean_ln,
            sigma: c.sigma,
        })
    }
}
