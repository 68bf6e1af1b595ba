//! # Hazard Sources (L2: Models)
//!
//! Seismic sources and what the engine needs to know about them.
//!
//! This crate provides:
//! - Source definitions with a closed set of kinds (`source`)
//! - Cost estimation and budget-driven splitting (`source::split`)
//! - Point-source gridding (`source::gridding`)
//! - Sites and the integration-distance filter (`site`)
//! - Composite source model builder (`csm`)
//! - Ground-motion model trait and registry (`gsim`)
//!
//! ## Design Principles
//!
//! - **Enum-based source kinds** with per-kind weight factor and split strategy
//! - **Immutable after build**: the composite model is shared read-only
//! - **Builder pattern** with validation at `build()`

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]

pub mod csm;
pub mod error;
pub mod gsim;
pub mod site;
pub mod source;

pub use csm::{CompositeSourceModel, CompositeSourceModelBuilder, CsmDiagnostics, SourceGroup};
pub use error::SourceError;
pub use gsim::{GroundMotionModel, GsimRegistry};
pub use site::{Site, SiteCollection, SourceFilter};
pub use source::{MagRate, Source, SourceKind};
