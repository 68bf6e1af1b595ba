//! Full logic tree: realizations over the source-model and ground-motion trees.
//!
//! Realizations are either the Cartesian product of both trees or a seeded
//! Monte Carlo draw; the sample count may come from the source-model tree.

use crate::logictree::{Branch, BranchPath, LogicTree, WeightedPath};
use crate::rng::SamplerRng;
use crate::types::{TectonicRegionType, ValidationError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// How realizations are produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SamplingMode {
    /// Cartesian product of all applicable branch sets.
    Enumerate,
    /// Seeded Monte Carlo sampling with replacement.
    Sample {
        /// Number of realizations to draw.
        num_samples: u32,
        /// Seed of the [`SamplerRng`].
        seed: u64,
    },
}

impl SamplingMode {
    /// `Enumerate` when `num_samples == 0`, sampling otherwise.
    pub fn from_samples(num_samples: u32, seed: u64) -> Self {
        if num_samples == 0 {
            SamplingMode::Enumerate
        } else {
            SamplingMode::Sample { num_samples, seed }
        }
    }
}

/// One complete choice of source model and ground-motion models.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Realization {
    /// Position in the realization list.
    pub ordinal: usize,
    /// Weight; all weights sum to one.
    pub weight: f64,
    /// Path through the source-model tree.
    pub sm_path: BranchPath,
    /// Path through the ground-motion tree.
    pub gsim_path: BranchPath,
    /// Draw index for sampled realizations.
    pub sample: Option<u32>,
}

impl Realization {
    /// Full path, source-model part first, as `sm~gsim`.
    pub fn path_string(&self) -> String {
        if self.gsim_path.is_empty() {
            self.sm_path.to_string()
        } else {
            format!("{}~{}", self.sm_path, self.gsim_path)
        }
    }
}

/// Source-model tree and ground-motion tree taken together.
///
/// # Examples
///
/// ```
/// use hazard_core::logictree::{Branch, BranchSet, LogicTree};
/// use hazard_core::realizations::{FullLogicTree, SamplingMode};
///
/// let sm = LogicTree::builder()
///     .branch_set(BranchSet::new("sm", vec![Branch::new("b1", 1.0, "model")]))
///     .build()
///     .unwrap();
/// let gsim = LogicTree::builder()
///     .branch_set(
///         BranchSet::new(
///             "gmpe",
///             vec![Branch::new("g1", 0.5, "ModelA"), Branch::new("g2", 0.5, "ModelB")],
///         )
///         .with_trt("Active Shallow Crust"),
///     )
///     .build()
///     .unwrap();
///
/// let full = FullLogicTree::new(sm, gsim);
/// let rlzs = full.realizations(SamplingMode::Enumerate).unwrap();
/// assert_eq!(rlzs.len(), 2);
/// assert_eq!(rlzs[1].path_string(), "b1~g2");
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FullLogicTree {
    source_model: LogicTree,
    gsim: LogicTree,
}

impl FullLogicTree {
    /// Combines a source-model tree and a ground-motion tree.
    pub fn new(source_model: LogicTree, gsim: LogicTree) -> Self {
        Self { source_model, gsim }
    }

    /// The source-model tree.
    pub fn source_model_tree(&self) -> &LogicTree {
        &self.source_model
    }

    /// The ground-motion tree.
    pub fn gsim_tree(&self) -> &LogicTree {
        &self.gsim
    }

    /// Copy with the ground-motion tree reduced to `trts`.
    pub fn reduce_gsims(&self, trts: &BTreeSet<TectonicRegionType>) -> FullLogicTree {
        FullLogicTree {
            source_model: self.source_model.clone(),
            gsim: self.gsim.reduce_to(trts),
        }
    }

    /// Sampling mode declared by the source-model tree, drawn with `seed`.
    ///
    /// Trees without a sample count are enumerated.
    pub fn sampling_mode(&self, seed: u64) -> SamplingMode {
        SamplingMode::from_samples(self.source_model.num_samples(), seed)
    }

    /// Ground-motion branch chosen by `rlz` for `trt`.
    pub fn gsim_for(&self, rlz: &Realization, trt: &TectonicRegionType) -> Option<&Branch> {
        self.gsim.branch_for_trt(&rlz.gsim_path, trt)
    }

    /// Produces the ordered realizations.
    ///
    /// Enumeration walks source-model paths in declaration order and, for
    /// each, every ground-motion path; the weight is the product of both path
    /// weights. Sampling draws the source-model path and then the
    /// ground-motion path for each sample, weights every realization `1/N`,
    /// and finally orders realizations by source-model path so that those
    /// sharing a source model are contiguous. Draw order is kept within a
    /// source model.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::ZeroSamples`] for `Sample { num_samples: 0, .. }`.
    pub fn realizations(&self, mode: SamplingMode) -> Result<Vec<Realization>, ValidationError> {
        let mut rlzs = match mode {
            SamplingMode::Enumerate => self.enumerate(),
            SamplingMode::Sample { num_samples, seed } => {
                let mut rng = SamplerRng::from_seed(seed);
                self.sample(num_samples, &mut rng)?
            }
        };
        for (ordinal, rlz) in rlzs.iter_mut().enumerate() {
            rlz.ordinal = ordinal;
        }
        Ok(rlzs)
    }

    fn enumerate(&self) -> Vec<Realization> {
        let gsim_paths = self.gsim.enumerate();
        let mut out = Vec::new();
        for sm in self.source_model.enumerate() {
            for g in &gsim_paths {
                out.push(Realization {
                    ordinal: 0,
                    weight: sm.weight * g.weight,
                    sm_path: sm.path.clone(),
                    gsim_path: g.path.clone(),
                    sample: None,
                });
            }
        }
        out
    }

    fn sample(&self, n: u32, rng: &mut SamplerRng) -> Result<Vec<Realization>, ValidationError> {
        if n == 0 {
            return Err(ValidationError::ZeroSamples);
        }
        let weight = 1.0 / n as f64;
        let mut out: Vec<Realization> = (0..n)
            .map(|i| {
                let sm_path = self.source_model.sample_path(rng);
                let gsim_path = self.gsim.sample_path(rng);
                Realization {
                    ordinal: 0,
                    weight,
                    sm_path,
                    gsim_path,
                    sample: Some(i),
                }
            })
            .collect();
        // sort_by_key is stable: draw order survives within a source model
        out.sort_by_key(|r| r.sm_path.ordering_key());
        Ok(out)
    }

    /// Distinct source-model paths of `rlzs`, in first-seen order.
    pub fn source_model_paths(rlzs: &[Realization]) -> Vec<BranchPath> {
        let mut seen: Vec<BranchPath> = Vec::new();
        for rlz in rlzs {
            if !seen.contains(&rlz.sm_path) {
                seen.push(rlz.sm_path.clone());
            }
        }
        seen
    }

    /// Weighted source-model paths of a full enumeration.
    pub fn weighted_source_model_paths(&self) -> Vec<WeightedPath> {
        self.source_model.enumerate()
    }
}
