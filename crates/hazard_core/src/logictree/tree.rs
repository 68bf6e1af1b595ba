//! Logic trees: enumeration and Monte Carlo sampling of branch paths.

use super::branch::{Branch, BranchSet};
use super::path::{BranchPath, PathStep};
use crate::rng::SamplerRng;
use crate::types::{BranchId, TectonicRegionType, ValidationError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

/// Default tolerance on the sum of branch weights.
pub const DEFAULT_WEIGHT_TOLERANCE: f64 = 1e-6;

/// A path through a tree together with its weight.
#[derive(Clone, Debug, PartialEq)]
pub struct WeightedPath {
    /// Branch choices.
    pub path: BranchPath,
    /// Product of the chosen branch weights (enumeration) or `1/N` (sampling).
    pub weight: f64,
}

/// Ordered branch sets describing modelling alternatives.
///
/// Built through [`LogicTree::builder`], which validates every set. Paths are
/// produced depth-first in declaration order; a set that does not apply to
/// the current prefix is skipped.
///
/// # Examples
///
/// ```
/// use hazard_core::logictree::{Branch, BranchSet, LogicTree};
///
/// let tree = LogicTree::builder()
///     .branch_set(BranchSet::new("sm", vec![Branch::new("b1", 1.0, "model_a")]))
///     .branch_set(BranchSet::new(
///         "mmax",
///         vec![
///             Branch::new("m1", 0.25, "7.0"),
///             Branch::new("m2", 0.25, "7.2"),
///             Branch::new("m3", 0.25, "7.4"),
///             Branch::new("m4", 0.25, "7.6"),
///         ],
///     ))
///     .build()
///     .unwrap();
///
/// let paths = tree.enumerate();
/// assert_eq!(paths.len(), 4);
/// assert!(paths.iter().all(|p| (p.weight - 0.25).abs() < 1e-12));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawLogicTree")]
pub struct LogicTree {
    sets: Vec<BranchSet>,
    num_samples: u32,
}

/// Unvalidated wire form; deserialized trees go through the builder.
#[derive(Deserialize)]
struct RawLogicTree {
    sets: Vec<BranchSet>,
    #[serde(default)]
    num_samples: u32,
}

impl TryFrom<RawLogicTree> for LogicTree {
    type Error = ValidationError;

    fn try_from(raw: RawLogicTree) -> Result<Self, Self::Error> {
        LogicTree::builder()
            .branch_sets(raw.sets)
            .num_samples(raw.num_samples)
            .build()
    }
}

impl LogicTree {
    /// Creates a builder.
    pub fn builder() -> LogicTreeBuilder {
        LogicTreeBuilder::default()
    }

    /// Branch sets in declaration order.
    pub fn branch_sets(&self) -> &[BranchSet] {
        &self.sets
    }

    /// Number of Monte Carlo samples; 0 means full enumeration.
    pub fn num_samples(&self) -> u32 {
        self.num_samples
    }

    /// Looks up a branch by id.
    pub fn branch(&self, id: &BranchId) -> Option<&Branch> {
        self.sets
            .iter()
            .flat_map(|s| s.branches.iter())
            .find(|b| &b.id == id)
    }

    /// Values of the branches along `path`, in path order.
    pub fn values<'a>(&'a self, path: &'a BranchPath) -> impl Iterator<Item = &'a str> + 'a {
        path.steps()
            .iter()
            .filter_map(move |step| self.branch(&step.branch).map(|b| b.value.as_str()))
    }

    /// Tectonic region types named by the branch sets.
    pub fn trts(&self) -> BTreeSet<TectonicRegionType> {
        self.sets.iter().filter_map(|s| s.trt.clone()).collect()
    }

    /// Branch chosen on `path` for the set attached to `trt`.
    pub fn branch_for_trt(&self, path: &BranchPath, trt: &TectonicRegionType) -> Option<&Branch> {
        let set = self.sets.iter().find(|s| s.trt.as_ref() == Some(trt))?;
        let id = path.branch_in(&set.id)?;
        set.branches.iter().find(|b| &b.id == id)
    }

    /// Keeps only the sets relevant to `trts`.
    ///
    /// Sets without a tectonic region type are always kept. Used to drop
    /// ground-motion alternatives for regions no source belongs to, which
    /// would otherwise multiply the number of realizations for nothing.
    pub fn reduce_to(&self, trts: &BTreeSet<TectonicRegionType>) -> LogicTree {
        let sets = self
            .sets
            .iter()
            .filter(|s| s.trt.as_ref().map_or(true, |t| trts.contains(t)))
            .cloned()
            .collect();
        LogicTree {
            sets,
            num_samples: self.num_samples,
        }
    }

    /// Number of paths a full enumeration yields.
    pub fn num_paths(&self) -> usize {
        self.enumerate().len()
    }

    /// All paths, depth-first in declaration order.
    ///
    /// The weight of a path is the product of its branch weights; weights of
    /// all paths sum to one.
    pub fn enumerate(&self) -> Vec<WeightedPath> {
        let mut out = Vec::new();
        self.walk(0, BranchPath::default(), 1.0, &mut out);
        out
    }

    fn walk(&self, i: usize, path: BranchPath, weight: f64, out: &mut Vec<WeightedPath>) {
        let Some(set) = self.sets.get(i) else {
            out.push(WeightedPath { path, weight });
            return;
        };
        if !set.applies(&path) {
            self.walk(i + 1, path, weight, out);
            return;
        }
        for (index, branch) in set.branches.iter().enumerate() {
            let mut next = path.clone();
            next.push(PathStep {
                set: set.id.clone(),
                branch: branch.id.clone(),
                index,
            });
            self.walk(i + 1, next, weight * branch.weight, out);
        }
    }

    /// Draws one path.
    ///
    /// Each applicable set with more than one branch consumes exactly one
    /// uniform draw; single-branch sets consume nothing.
    pub fn sample_path(&self, rng: &mut SamplerRng) -> BranchPath {
        let mut path = BranchPath::default();
        for set in &self.sets {
            if !set.applies(&path) {
                continue;
            }
            let index = if set.len() > 1 {
                set.pick(rng.gen_uniform())
            } else {
                0
            };
            let branch = &set.branches[index];
            path.push(PathStep {
                set: set.id.clone(),
                branch: branch.id.clone(),
                index,
            });
        }
        path
    }

    /// Draws `n` paths with replacement, each weighted `1/n`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::ZeroSamples`] when `n == 0`.
    pub fn sample(&self, n: u32, rng: &mut SamplerRng) -> Result<Vec<WeightedPath>, ValidationError> {
        if n == 0 {
            return Err(ValidationError::ZeroSamples);
        }
        let weight = 1.0 / n as f64;
        Ok((0..n)
            .map(|_| WeightedPath {
                path: self.sample_path(rng),
                weight,
            })
            .collect())
    }

    /// Validates every set and the cross-set references.
    ///
    /// # Errors
    ///
    /// Any [`ValidationError`] raised by [`BranchSet::validate`], plus
    /// [`ValidationError::DuplicateBranch`] and [`ValidationError::UnknownBranch`].
    pub fn validate(&self, tolerance: f64) -> Result<(), ValidationError> {
        let mut seen: HashSet<&BranchId> = HashSet::new();
        for set in &self.sets {
            set.validate(tolerance)?;
            for target in &set.applies_to {
                if !seen.contains(target) {
                    return Err(ValidationError::UnknownBranch {
                        set: set.id.to_string(),
                        branch: target.to_string(),
                    });
                }
            }
            for branch in &set.branches {
                if !seen.insert(&branch.id) {
                    return Err(ValidationError::DuplicateBranch(branch.id.to_string()));
                }
            }
        }
        Ok(())
    }
}

/// Builder for [`LogicTree`].
#[derive(Clone, Debug)]
pub struct LogicTreeBuilder {
    sets: Vec<BranchSet>,
    num_samples: u32,
    tolerance: f64,
}

impl Default for LogicTreeBuilder {
    fn default() -> Self {
        Self {
            sets: Vec::new(),
            num_samples: 0,
            tolerance: DEFAULT_WEIGHT_TOLERANCE,
        }
    }
}

impl LogicTreeBuilder {
    /// Appends a branch set.
    pub fn branch_set(mut self, set: BranchSet) -> Self {
        self.sets.push(set);
        self
    }

    /// Appends several branch sets.
    pub fn branch_sets(mut self, sets: impl IntoIterator<Item = BranchSet>) -> Self {
        self.sets.extend(sets);
        self
    }

    /// Sets the number of Monte Carlo samples (0 = enumerate).
    pub fn num_samples(mut self, n: u32) -> Self {
        self.num_samples = n;
        self
    }

    /// Sets the tolerance on branch weight sums.
    pub fn tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Builds and validates the tree.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] found.
    pub fn build(self) -> Result<LogicTree, ValidationError> {
        let tree = LogicTree {
            sets: self.sets,
            num_samples: self.num_samples,
        };
        tree.validate(self.tolerance)?;
        Ok(tree)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn uniform_set(id: &str, prefix: &str, n: usize) -> BranchSet {
        let w = 1.0 / n as f64;
        BranchSet::new(
            id,
            (0..n)
                .map(|i| Branch::new(format!("{}{}", prefix, i), w, format!("{}", i)))
                .collect(),
        )
    }

    // ===== Enumeration =====

    #[test]
    fn test_enumeration_count_is_product() {
        let tree = LogicTree::builder()
            .branch_set(uniform_set("a", "a", 2))
            .branch_set(uniform_set("b", "b", 3))
            .branch_set(uniform_set("c", "c", 4))
            .build()
            .unwrap();
        let paths = tree.enumerate();
        assert_eq!(paths.len(), 24);
        let total: f64 = paths.iter().map(|p| p.weight).sum();
        assert_relative_eq!(total, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_enumeration_depth_first_order() {
        let tree = LogicTree::builder()
            .branch_set(uniform_set("a", "a", 2))
            .branch_set(uniform_set("b", "b", 2))
            .build()
            .unwrap();
        let names: Vec<String> = tree.enumerate().iter().map(|p| p.path.to_string()).collect();
        assert_eq!(names, vec!["a0~b0", "a0~b1", "a1~b0", "a1~b1"]);
    }

    #[test]
    fn test_enumeration_weights_are_products() {
        let tree = LogicTree::builder()
            .branch_set(BranchSet::new(
                "sm",
                vec![Branch::new("s1", 0.3, "x"), Branch::new("s2", 0.7, "y")],
            ))
            .branch_set(BranchSet::new(
                "g",
                vec![Branch::new("g1", 0.6, "x"), Branch::new("g2", 0.4, "y")],
            ))
            .build()
            .unwrap();
        let w: Vec<f64> = tree.enumerate().iter().map(|p| p.weight).collect();
        assert_relative_eq!(w[0], 0.18, epsilon = 1e-12);
        assert_relative_eq!(w[1], 0.12, epsilon = 1e-12);
        assert_relative_eq!(w[2], 0.42, epsilon = 1e-12);
        assert_relative_eq!(w[3], 0.28, epsilon = 1e-12);
    }

    #[test]
    fn test_applies_to_restricts_paths() {
        let tree = LogicTree::builder()
            .branch_set(uniform_set("sm", "s", 2))
            .branch_set(uniform_set("unc", "u", 3).applies_to(["s1"]))
            .build()
            .unwrap();
        let names: Vec<String> = tree.enumerate().iter().map(|p| p.path.to_string()).collect();
        assert_eq!(names, vec!["s0", "s1~u0", "s1~u1", "s1~u2"]);
        let total: f64 = tree.enumerate().iter().map(|p| p.weight).sum();
        assert_relative_eq!(total, 1.0, epsilon = 1e-12);
    }

    // ===== Validation =====

    #[test]
    fn test_unknown_applies_to() {
        let err = LogicTree::builder()
            .branch_set(uniform_set("sm", "s", 2))
            .branch_set(uniform_set("unc", "u", 2).applies_to(["nope"]))
            .build()
            .unwrap_err();
        assert!(matches!(err, ValidationError::UnknownBranch { .. }));
    }

    #[test]
    fn test_duplicate_branch_ids() {
        let err = LogicTree::builder()
            .branch_set(uniform_set("a", "x", 2))
            .branch_set(uniform_set("b", "x", 2))
            .build()
            .unwrap_err();
        assert_eq!(err, ValidationError::DuplicateBranch("x0".to_string()));
    }

    #[test]
    fn test_custom_tolerance() {
        let set = BranchSet::new(
            "a",
            vec![Branch::new("a0", 0.5, "x"), Branch::new("a1", 0.49, "y")],
        );
        assert!(LogicTree::builder().branch_set(set.clone()).build().is_err());
        assert!(LogicTree::builder()
            .branch_set(set)
            .tolerance(0.02)
            .build()
            .is_ok());
    }

    /// Test: deserialized trees are validated like built ones
    #[test]
    fn test_deserialize_validates_weights() {
        let json = r#"{"sets":[{"id":"sm","branches":[
            {"id":"b1","weight":0.7,"value":"a"},
            {"id":"b2","weight":0.7,"value":"b"}]}]}"#;
        let err = serde_json::from_str::<LogicTree>(json).unwrap_err();
        assert!(err.to_string().contains("weights sum to"), "{}", err);

        let json = r#"{"sets":[{"id":"g","branches":[{"id":"x","weight":1.0,"value":"G"}],
            "applies_to":["missing"]}]}"#;
        assert!(serde_json::from_str::<LogicTree>(json).is_err());
    }

    #[test]
    fn test_serde_keeps_num_samples() {
        let tree = LogicTree::builder()
            .branch_set(uniform_set("a", "a", 2))
            .num_samples(7)
            .build()
            .unwrap();
        let json = serde_json::to_string(&tree).unwrap();
        let back: LogicTree = serde_json::from_str(&json).unwrap();
        assert_eq!(back, tree);
        assert_eq!(back.num_samples(), 7);

        let bare: LogicTree = serde_json::from_str(
            r#"{"sets":[{"id":"a","branches":[{"id":"a0","weight":1.0,"value":"x"}]}]}"#,
        )
        .unwrap();
        assert_eq!(bare.num_samples(), 0);
    }

    // ===== Sampling =====

    #[test]
    fn test_sampling_zero_is_error() {
        let tree = LogicTree::builder()
            .branch_set(uniform_set("a", "a", 2))
            .build()
            .unwrap();
        let mut rng = SamplerRng::from_seed(1);
        assert_eq!(tree.sample(0, &mut rng), Err(ValidationError::ZeroSamples));
    }

    #[test]
    fn test_single_branch_sets_draw_nothing() {
        let tree = LogicTree::builder()
            .branch_set(uniform_set("a", "a", 1))
            .branch_set(uniform_set("b", "b", 1))
            .build()
            .unwrap();
        let mut rng = SamplerRng::from_seed(1);
        let paths = tree.sample(10, &mut rng).unwrap();
        assert_eq!(paths.len(), 10);
        assert_eq!(rng.draws(), 0);
    }

    #[test]
    fn test_sampling_reproducible() {
        let tree = LogicTree::builder()
            .branch_set(uniform_set("a", "a", 3))
            .branch_set(uniform_set("b", "b", 5))
            .build()
            .unwrap();
        let a = tree.sample(50, &mut SamplerRng::from_seed(23)).unwrap();
        let b = tree.sample(50, &mut SamplerRng::from_seed(23)).unwrap();
        assert_eq!(a, b);
        assert!(a.iter().all(|p| p.weight == 1.0 / 50.0));
    }

    #[test]
    fn test_sampling_frequencies_follow_weights() {
        let tree = LogicTree::builder()
            .branch_set(BranchSet::new(
                "sm",
                vec![Branch::new("s1", 0.2, "x"), Branch::new("s2", 0.8, "y")],
            ))
            .build()
            .unwrap();
        let paths = tree.sample(20_000, &mut SamplerRng::from_seed(5)).unwrap();
        let first = paths
            .iter()
            .filter(|p| p.path.contains(&BranchId::new("s1")))
            .count() as f64;
        assert!((first / 20_000.0 - 0.2).abs() < 0.02);
    }

    // ===== GSIM reduction =====

    #[test]
    fn test_reduce_to_trts() {
        let tree = LogicTree::builder()
            .branch_set(uniform_set("g1", "x", 2).with_trt("Active Shallow Crust"))
            .branch_set(uniform_set("g2", "y", 3).with_trt("Stable Continental"))
            .build()
            .unwrap();
        assert_eq!(tree.num_paths(), 6);
        let trts: BTreeSet<_> = [TectonicRegionType::new("Stable Continental")]
            .into_iter()
            .collect();
        let reduced = tree.reduce_to(&trts);
        assert_eq!(reduced.num_paths(), 3);
        assert_eq!(reduced.trts(), trts);
    }

    #[test]
    fn test_branch_for_trt() {
        let tree = LogicTree::builder()
            .branch_set(uniform_set("g1", "x", 2).with_trt("A"))
            .branch_set(uniform_set("g2", "y", 2).with_trt("B"))
            .build()
            .unwrap();
        let paths = tree.enumerate();
        let last = &paths[3].path;
        let b = tree.branch_for_trt(last, &"B".into()).unwrap();
        assert_eq!(b.id.as_str(), "y1");
        assert!(tree.branch_for_trt(last, &"C".into()).is_none());
    }
}
