//! Ground-motion models and their registry.
//!
//! The engine treats a ground-motion model as an opaque function from a
//! rupture-site context to a log-normal intensity distribution. Models are
//! looked up by name in an explicit, immutable [`GsimRegistry`] that is
//! passed by reference to whoever needs it.

mod linear;

pub use linear::{LinearLogCoeffs, LinearLogModel};

use crate::error::SourceError;
use hazard_core::types::GsimName;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Rupture-site parameters a model is evaluated on.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RuptureContext {
    /// Rupture magnitude.
    pub mag: f64,
    /// Source-to-site distance, km.
    pub distance_km: f64,
    /// Site vs30, m/s.
    pub vs30: f64,
}

/// Log-normal intensity distribution.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GroundMotion {
    /// Mean of ln(IM).
    pub mean_ln: f64,
    /// Standard deviation of ln(IM).
    pub sigma: f64,
}

/// A ground-motion model.
pub trait GroundMotionModel: Send + Sync + fmt::Debug {
    /// Registered name.
    fn name(&self) -> &str;

    /// Whether `imt` can be evaluated.
    fn supports(&self, imt: &str) -> bool;

    /// Mean and standard deviation of ln(IM) for `imt`.
    ///
    /// # Errors
    ///
    /// [`SourceError::UnsupportedImt`] when the model has no terms for `imt`.
    fn ground_motion(&self, ctx: &RuptureContext, imt: &str) -> Result<GroundMotion, SourceError>;
}

/// Immutable name → model table.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use hazard_sources::gsim::{GsimRegistry, LinearLogCoeffs, LinearLogModel};
///
/// let model = LinearLogModel::new("Simple2024").with_imt("PGA", LinearLogCoeffs::default());
/// let registry = GsimRegistry::builder().register(Arc::new(model)).build();
///
/// assert!(registry.get(&"Simple2024".into()).is_ok());
/// assert!(registry.get(&"Other".into()).is_err());
/// ```
#[derive(Clone, Debug, Default)]
pub struct GsimRegistry {
    models: BTreeMap<GsimName, Arc<dyn GroundMotionModel>>,
}

impl GsimRegistry {
    /// Creates a builder.
    pub fn builder() -> GsimRegistryBuilder {
        GsimRegistryBuilder::default()
    }

    /// Looks up a model.
    ///
    /// # Errors
    ///
    /// [`SourceError::UnknownGsim`] if no model has this name.
    pub fn get(&self, name: &GsimName) -> Result<Arc<dyn GroundMotionModel>, SourceError> {
        self.models
            .get(name)
            .cloned()
            .ok_or_else(|| SourceError::UnknownGsim(name.to_string()))
    }

    /// Registered names in order.
    pub fn names(&self) -> impl Iterator<Item = &GsimName> {
        self.models.keys()
    }

    /// Number of models.
    pub fn len(&self) -> usize {
        self.models.len()
    }

    /// Returns true when empty.
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Checks that every model in `gsims` is registered and supports every
    /// IMT in `imts`. Registered models outside `gsims` are not inspected.
    ///
    /// # Errors
    ///
    /// [`SourceError::UnknownGsim`] or [`SourceError::UnsupportedImt`] for
    /// the first gap found.
    pub fn check_imts<'a, 'b>(
        &self,
        gsims: impl IntoIterator<Item = &'b GsimName>,
        imts: impl IntoIterator<Item = &'a str> + Clone,
    ) -> Result<(), SourceError> {
        for name in gsims {
            let model = self.get(name)?;
            for imt in imts.clone() {
                if !model.supports(imt) {
                    return Err(SourceError::UnsupportedImt {
                        gsim: name.to_string(),
                        imt: imt.to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Builder for [`GsimRegistry`].
#[derive(Debug, Default)]
pub struct GsimRegistryBuilder {
    models: BTreeMap<GsimName, Arc<dyn GroundMotionModel>>,
}

impl GsimRegistryBuilder {
    /// Registers a model under its own name; a later model with the same name wins.
    pub fn register(mut self, model: Arc<dyn GroundMotionModel>) -> Self {
        self.models.insert(GsimName::new(model.name()), model);
        self
    }

    /// Freezes the registry.
    pub fn build(self) -> GsimRegistry {
        GsimRegistry {
            models: self.models,
        }
    }
}
