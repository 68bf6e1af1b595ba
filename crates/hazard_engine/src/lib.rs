//! # Hazard Engine (L3: Engine)
//!
//! Turns logic trees and source models into hazard curves.
//!
//! This crate provides:
//! - Realization-to-model association (`assoc`)
//! - Task packing, dispatch, retries and cancellation (`scheduler`)
//! - The classical Poissonian kernel run by workers (`kernel`)
//! - Probability maps and their order-independent aggregation (`pmap`, `aggregator`)
//! - Mean and quantile curves and hazard maps (`statistics`)
//! - Configuration, orchestration and reporting (`config`, `calc`, `report`)
//!
//! ## Layer 3 (Engine) Role
//!
//! Depends on `hazard_core` for logic trees and realizations and on
//! `hazard_sources` for sources, sites and ground-motion models. Workers only
//! see serialized task payloads (`wire`), so a pool could run them anywhere.
//!
//! ## Design Principles
//!
//! - **Read-only sharing**: the calculation context is built once and shared
//!   through `Arc`
//! - **Order independence**: partial results combine with the complement rule
//! - **No clamping**: invalid probabilities are errors
//!
//! ## Example
//!
//! ```
//! use hazard_core::logictree::{Branch, BranchSet, LogicTree};
//! use hazard_core::types::{Imtls, Location};
//! use hazard_engine::{CalculationInputs, Distribute, EngineConfig, HazardCalculator};
//! use hazard_sources::gsim::{LinearLogCoeffs, LinearLogModel};
//! use hazard_sources::{GsimRegistry, MagRate, SiteCollection, Source, SourceKind};
//! use std::collections::BTreeMap;
//! use std::sync::Arc;
//!
//! let sm = LogicTree::builder()
//!     .branch_set(BranchSet::new("sm", vec![Branch::new("b1", 1.0, "model")]))
//!     .build()
//!     .unwrap();
//! let gsim = LogicTree::builder()
//!     .branch_set(BranchSet::new("g", vec![Branch::new("g1", 1.0, "Linear")]).with_trt("ASC"))
//!     .build()
//!     .unwrap();
//! let source = Source::new("f1", SourceKind::SimpleFault, "ASC", 20)
//!     .with_locations(vec![Location::with_depth(0.1, 0.0, 10.0)])
//!     .with_mfd(vec![MagRate::new(6.0, 0.01)]);
//!
//! let inputs = CalculationInputs {
//!     source_model_tree: sm,
//!     gsim_tree: gsim,
//!     source_models: BTreeMap::from([("model".to_string(), vec![source])]),
//!     sites: SiteCollection::from_locations(vec![(Location::new(0.0, 0.0), 760.0)]).unwrap(),
//!     registry: GsimRegistry::builder()
//!         .register(Arc::new(LinearLogModel::new("Linear").with_imt("PGA", LinearLogCoeffs::default())))
//!         .build(),
//! };
//! let config = EngineConfig {
//!     distribute: Distribute::Inline,
//!     intensity_measure_types_and_levels: Imtls::builder().imt("PGA", vec![0.1, 0.2]).build().unwrap(),
//!     ..EngineConfig::default()
//! };
//!
//! let output = HazardCalculator::new(config, inputs).run().unwrap();
//! let curve = output.curves.curve(0, 0, "PGA").unwrap();
//! assert!(curve[0] > curve[1]);
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]

pub mod aggregator;
pub mod assoc;
pub mod calc;
pub mod config;
pub mod error;
pub mod kernel;
pub mod pmap;
pub mod report;
pub mod scheduler;
pub mod statistics;
pub mod wire;

pub use aggregator::{Aggregator, HazardCurves};
pub use assoc::{AssocRow, RlzsAssoc};
pub use calc::{CalculationInputs, CalculationOutput, HazardCalculator, Preparation};
pub use config::{Distribute, EngineConfig, LogLevel};
pub use error::{AssociationError, ConfigError, EngineError, NumericError, TaskFailure};
pub use pmap::ProbabilityMap;
pub use report::CalculationReport;
pub use scheduler::{CancellationToken, Scheduler, SchedulerConfig, TaskError, Worker, WorkerPool};
pub use statistics::HazardStatistics;
