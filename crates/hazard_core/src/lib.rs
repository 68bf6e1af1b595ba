//! # hazard_core: Foundation for the Hazard Engine
//!
//! ## Layer 1 (Foundation) Role
//!
//! hazard_core is the bottom layer of the workspace, providing:
//! - Identifier newtypes, locations and intensity levels (`types`)
//! - Logic trees of weighted alternatives (`logictree`)
//! - Realizations from enumeration or seeded sampling (`realizations`)
//! - The explicit sampling generator `SamplerRng` (`rng`)
//! - Standard normal helpers (`math`)
//! - `ValidationError` (`types::error`)
//!
//! Layer 1 has no dependencies on other hazard_* crates.
//!
//! ## Usage Examples
//!
//! ```rust
//! use hazard_core::logictree::{Branch, BranchSet, LogicTree};
//! use hazard_core::realizations::{FullLogicTree, SamplingMode};
//!
//! let sm = LogicTree::builder()
//!     .branch_set(BranchSet::new(
//!         "sm",
//!         vec![Branch::new("b1", 0.3, "a"), Branch::new("b2", 0.7, "b")],
//!     ))
//!     .build()
//!     .unwrap();
//! let full = FullLogicTree::new(sm, LogicTree::default());
//!
//! let rlzs = full
//!     .realizations(SamplingMode::Sample { num_samples: 5, seed: 106 })
//!     .unwrap();
//! assert_eq!(rlzs.len(), 5);
//! assert!(rlzs.iter().all(|r| (r.weight - 0.2).abs() < 1e-12));
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]

pub mod logictree;
pub mod math;
pub mod realizations;
pub mod rng;
pub mod types;
