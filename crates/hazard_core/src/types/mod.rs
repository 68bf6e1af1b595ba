//! Core types: identifiers, locations, intensity measures and errors.

pub mod error;
pub mod geo;
pub mod ids;
pub mod imt;

pub use error::ValidationError;
pub use geo::{Location, EARTH_RADIUS_KM, KM_PER_DEGREE};
pub use ids::{BranchId, BranchSetId, GroupId, GsimName, SiteId, SourceId, TectonicRegionType};
pub use imt::{Imtls, ImtlsBuilder};
