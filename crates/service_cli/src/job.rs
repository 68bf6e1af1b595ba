//! Job files.
//!
//! A job is a single TOML document holding the calculation parameters, the
//! sites, both logic trees, the source models named by the source-model tree
//! and the coefficients of the ground-motion models named by the
//! ground-motion tree.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use hazard_core::logictree::{BranchSet, LogicTree};
use hazard_core::types::Location;
use hazard_engine::{CalculationInputs, EngineConfig};
use hazard_sources::gsim::{LinearLogCoeffs, LinearLogModel};
use hazard_sources::{GsimRegistry, SiteCollection, Source};
use serde::Deserialize;
use tracing::debug;

use crate::{CliError, Result};

fn default_vs30() -> f64 {
    760.0
}

/// A site of the job.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SiteSpec {
    /// Longitude in decimal degrees.
    pub lon: f64,
    /// Latitude in decimal degrees.
    pub lat: f64,
    /// Average shear-wave velocity of the top 30 m, m/s.
    #[serde(default = "default_vs30")]
    pub vs30: f64,
}

/// Parsed job file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobSpec {
    /// Calculation parameters.
    #[serde(default)]
    pub calculation: EngineConfig,
    /// Sites.
    pub sites: Vec<SiteSpec>,
    /// Branch sets of the source-model tree.
    pub source_model_tree: Vec<BranchSet>,
    /// Branch sets of the ground-motion tree.
    pub gsim_tree: Vec<BranchSet>,
    /// Source models by name.
    pub source_models: BTreeMap<String, Vec<Source>>,
    /// Ground-motion coefficients by model name, then IMT.
    #[serde(default)]
    pub gsims: BTreeMap<String, BTreeMap<String, LinearLogCoeffs>>,
}

impl JobSpec {
    /// Parses a job document and validates its calculation parameters.
    ///
    /// Environment overrides are not applied.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let job: JobSpec = toml::from_str(content).map_err(|e| CliError::Job(e.to_string()))?;
        job.calculation.validate()?;
        Ok(job)
    }

    /// Reads a job file, applies `HAZARD_*` environment overrides and
    /// validates the calculation parameters.
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(CliError::FileNotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)?;
        let mut job: JobSpec = toml::from_str(&content).map_err(|e| CliError::Job(e.to_string()))?;
        job.calculation.apply_env()?;
        job.calculation.validate()?;
        Ok(job)
    }

    /// Builds the engine inputs.
    pub fn to_inputs(&self) -> Result<CalculationInputs> {
        let tolerance = self.calculation.weight_tolerance;
        let source_model_tree = LogicTree::builder()
            .branch_sets(self.source_model_tree.iter().cloned())
            .tolerance(tolerance)
            .build()
            .map_err(|e| CliError::Job(format!("source_model_tree: {e}")))?;
        let gsim_tree = LogicTree::builder()
            .branch_sets(self.gsim_tree.iter().cloned())
            .tolerance(tolerance)
            .build()
            .map_err(|e| CliError::Job(format!("gsim_tree: {e}")))?;

        let sites = SiteCollection::from_locations(
            self.sites
                .iter()
                .map(|s| (Location::new(s.lon, s.lat), s.vs30)),
        )
        .map_err(|e| CliError::Job(format!("sites: {e}")))?;

        let mut registry = GsimRegistry::builder();
        for (name, imts) in &self.gsims {
            let model = imts
                .iter()
                .fold(LinearLogModel::new(name.as_str()), |model, (imt, coeffs)| {
                    model.with_imt(imt.as_str(), *coeffs)
                });
            debug!(gsim = %name, imts = imts.len(), "ground-motion model registered");
            registry = registry.register(Arc::new(model));
        }

        Ok(CalculationInputs {
            source_model_tree,
            gsim_tree,
            source_models: self.source_models.clone(),
            sites,
            registry: registry.build(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hazard_engine::{Distribute, HazardCalculator};

    const EXAMPLE: &str = include_str!("../jobs/classical.toml");

    #[test]
    fn test_example_job_parses() {
        let job = JobSpec::from_toml_str(EXAMPLE).unwrap();
        assert_eq!(job.sites.len(), 2);
        assert_eq!(job.calculation.random_seed, 23);
        assert_eq!(job.calculation.quantiles, vec![0.15, 0.5, 0.85]);
        assert_eq!(job.source_models["base"].len(), 3);
        assert_eq!(job.gsims["Soft"].len(), 2);
        // unspecified coefficients fall back to their defaults
        assert_eq!(job.gsims["Soft"]["PGA"].c1, LinearLogCoeffs::default().c1);
    }

    #[test]
    fn test_example_job_builds_inputs() {
        let inputs = JobSpec::from_toml_str(EXAMPLE).unwrap().to_inputs().unwrap();
        assert_eq!(inputs.source_model_tree.branch_sets().len(), 1);
        assert_eq!(inputs.gsim_tree.branch_sets().len(), 2);
        assert_eq!(inputs.registry.len(), 2);
        assert_eq!(inputs.sites.len(), 2);
    }

    #[test]
    fn test_example_job_runs() {
        let mut job = JobSpec::from_toml_str(EXAMPLE).unwrap();
        job.calculation.distribute = Distribute::Inline;
        let calculator = HazardCalculator::new(job.calculation.clone(), job.to_inputs().unwrap());
        let prep = calculator.prepare().unwrap();
        // base: crust and slab groups; alternative: crust and slab groups
        assert_eq!(prep.csm.groups().len(), 4);
        assert_eq!(prep.realizations.len(), 4);

        let output = calculator.run().unwrap();
        let pga = output.curves.curve(0, 0, "PGA").unwrap();
        assert_eq!(pga.len(), 8);
        assert!(pga.windows(2).all(|w| w[0] >= w[1]));
        assert_eq!(output.statistics.quantiles.len(), 3);
    }

    #[test]
    fn test_bad_weights_rejected() {
        let bad = EXAMPLE.replace("weight = 0.4, value = \"alternative\"", "weight = 0.3, value = \"alternative\"");
        let err = JobSpec::from_toml_str(&bad).unwrap().to_inputs().unwrap_err();
        assert!(matches!(err, CliError::Job(msg) if msg.starts_with("source_model_tree")));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let bad = format!("unexpected = 1\n{EXAMPLE}");
        assert!(matches!(JobSpec::from_toml_str(&bad), Err(CliError::Job(_))));
    }

    #[test]
    fn test_invalid_parameters_rejected() {
        let bad = EXAMPLE.replace("maximum_distance = 200.0", "maximum_distance = -1.0");
        assert!(matches!(JobSpec::from_toml_str(&bad), Err(CliError::Config(_))));
    }

    #[test]
    fn test_missing_file() {
        let err = JobSpec::from_file(Path::new("/nonexistent/job.toml")).unwrap_err();
        assert!(matches!(err, CliError::FileNotFound(_)));
    }
}
