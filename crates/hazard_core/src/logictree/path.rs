//! Paths through a logic tree.

use crate::types::{BranchId, BranchSetId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One choice along a path: which branch was taken in which set.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PathStep {
    /// Branch set the choice was made in.
    pub set: BranchSetId,
    /// Chosen branch.
    pub branch: BranchId,
    /// Declaration index of the chosen branch inside its set.
    pub index: usize,
}

/// Sequence of branch choices, one per applicable branch set.
///
/// Displayed as the branch ids joined by `~`.
///
/// ```
/// use hazard_core::logictree::{BranchPath, PathStep};
///
/// let path = BranchPath::from_steps(vec![
///     PathStep { set: "sm".into(), branch: "b1".into(), index: 0 },
///     PathStep { set: "mmax".into(), branch: "m2".into(), index: 1 },
/// ]);
/// assert_eq!(path.to_string(), "b1~m2");
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BranchPath {
    steps: Vec<PathStep>,
}

impl BranchPath {
    /// Creates a path from its steps.
    pub fn from_steps(steps: Vec<PathStep>) -> Self {
        Self { steps }
    }

    /// Appends a step.
    pub fn push(&mut self, step: PathStep) {
        self.steps.push(step);
    }

    /// The steps in order.
    pub fn steps(&self) -> &[PathStep] {
        &self.steps
    }

    /// Number of steps.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Returns true for the empty path.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Whether the path goes through `branch`.
    pub fn contains(&self, branch: &BranchId) -> bool {
        self.steps.iter().any(|s| &s.branch == branch)
    }

    /// Branch taken in `set`, if the set is on the path.
    pub fn branch_in(&self, set: &BranchSetId) -> Option<&BranchId> {
        self.steps.iter().find(|s| &s.set == set).map(|s| &s.branch)
    }

    /// Declaration indices of the chosen branches; orders paths by tree layout.
    pub fn ordering_key(&self) -> Vec<usize> {
        self.steps.iter().map(|s| s.index).collect()
    }
}

impl fmt::Display for BranchPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, step) in self.steps.iter().enumerate() {
            if i > 0 {
                f.write_str("~")?;
            }
            f.write_str(step.branch.as_str())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(set: &str, branch: &str, index: usize) -> PathStep {
        PathStep {
            set: set.into(),
            branch: branch.into(),
            index,
        }
    }

    #[test]
    fn test_contains_and_branch_in() {
        let path = BranchPath::from_steps(vec![step("s1", "a", 0), step("s2", "c", 2)]);
        assert!(path.contains(&"c".into()));
        assert!(!path.contains(&"b".into()));
        assert_eq!(path.branch_in(&"s2".into()), Some(&BranchId::new("c")));
        assert_eq!(path.branch_in(&"s3".into()), None);
    }

    #[test]
    fn test_ordering_key() {
        let a = BranchPath::from_steps(vec![step("s1", "a", 0), step("s2", "c", 2)]);
        let b = BranchPath::from_steps(vec![step("s1", "b", 1)]);
        assert!(a.ordering_key() < b.ordering_key());
    }

    #[test]
    fn test_empty_display() {
        assert_eq!(BranchPath::default().to_string(), "");
    }
}
