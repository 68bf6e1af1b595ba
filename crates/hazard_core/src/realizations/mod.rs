//! Realizations: complete choices across the source-model and ground-motion trees.
//!
//! A [`FullLogicTree`] couples a source-model tree with a ground-motion tree
//! and turns them into an ordered list of weighted [`Realization`]s, either
//! by full enumeration or by seeded Monte Carlo sampling.

mod full;

pub use full::{FullLogicTree, Realization, SamplingMode};
