//! Task payloads exchanged with workers.
//!
//! Workers only ever see bytes; these types are the JSON documents behind
//! them. `serde_json` is built with `float_roundtrip` so rates and
//! probabilities survive the trip bit for bit.

use crate::error::EngineError;
use crate::pmap::ProbabilityMap;
use hazard_core::types::{GroupId, GsimName, SourceId};
use hazard_sources::{Source, SourceKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Work for one task: a block of sources of one group.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaskInput {
    /// Group the sources belong to.
    pub grp_id: GroupId,
    /// Ground-motion models to evaluate.
    pub gsims: Vec<GsimName>,
    /// Sources of the block.
    pub sources: Vec<Source>,
}

/// Time spent on one source.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SourceTiming {
    /// Source id (a split piece keeps its own id).
    pub id: SourceId,
    /// Source kind.
    pub kind: SourceKind,
    /// Ruptures of the source.
    pub num_ruptures: usize,
    /// Sites affected.
    pub num_sites: usize,
    /// Wall time in seconds.
    pub seconds: f64,
}

/// Partial result of one task.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskOutput {
    /// Group the result belongs to.
    pub grp_id: GroupId,
    /// One map per ground-motion model.
    pub pmaps: BTreeMap<GsimName, ProbabilityMap>,
    /// Per-source timings, for diagnostics only.
    pub source_times: Vec<SourceTiming>,
}

/// Serialises a payload.
///
/// # Errors
///
/// [`EngineError::Wire`] if serialisation fails.
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, EngineError> {
    Ok(serde_json::to_vec(value)?)
}

/// Deserialises a payload.
///
/// # Errors
///
/// [`EngineError::Wire`] on malformed bytes.
pub fn decode<'a, T: Deserialize<'a>>(bytes: &'a [u8]) -> Result<T, EngineError> {
    Ok(serde_json::from_slice(bytes)?)
}
