//! Logic trees of weighted modelling alternatives.
//!
//! - [`Branch`] / [`BranchSet`]: weighted alternatives
//! - [`LogicTree`]: ordered branch sets, enumerated or sampled into paths
//! - [`BranchPath`]: one choice per applicable branch set

pub mod branch;
pub mod path;
pub mod tree;

pub use branch::{Branch, BranchSet};
pub use path::{BranchPath, PathStep};
pub use tree::{LogicTree, LogicTreeBuilder, WeightedPath, DEFAULT_WEIGHT_TOLERANCE};
