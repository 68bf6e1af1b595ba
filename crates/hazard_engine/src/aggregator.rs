//! Folding of partial results into per-realization hazard curves.
//!
//! Each task output carries one probability map per ground-motion model;
//! the map is folded into every `(group, realization)` pair the association
//! assigns to that model. Once all tasks are in, the groups of a realization
//! are combined into its final curves. Both folds use the complement rule,
//! so arrival order does not matter.

use crate::assoc::RlzsAssoc;
use crate::error::EngineError;
use crate::pmap::ProbabilityMap;
use crate::wire::TaskOutput;
use hazard_core::types::{GroupId, Imtls, SiteId, SourceId};
use hazard_sources::SourceKind;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

/// Accumulated timing of one source, split pieces folded into their parent.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SourceStat {
    /// Parent source id.
    pub id: SourceId,
    /// Kind of the pieces.
    pub kind: SourceKind,
    /// Ruptures over all pieces.
    pub num_ruptures: usize,
    /// Largest number of affected sites of a piece.
    pub num_sites: usize,
    /// Pieces seen.
    pub num_pieces: usize,
    /// Total time, seconds.
    pub seconds: f64,
}

/// Calculation time spent on one source kind.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct KindTime {
    /// Source kind.
    pub kind: SourceKind,
    /// Sources (or pieces) computed.
    pub num_sources: usize,
    /// Total time, seconds.
    pub seconds: f64,
}

/// Per-realization curves.
#[derive(Clone, Debug, PartialEq)]
pub struct HazardCurves {
    imtls: Imtls,
    rlzs: Vec<ProbabilityMap>,
}

impl HazardCurves {
    /// Intensity measure types and levels of the curves.
    pub fn imtls(&self) -> &Imtls {
        &self.imtls
    }

    /// Number of realizations.
    pub fn num_rlzs(&self) -> usize {
        self.rlzs.len()
    }

    /// Map of one realization.
    pub fn rlz(&self, ordinal: usize) -> Option<&ProbabilityMap> {
        self.rlzs.get(ordinal)
    }

    /// All maps in realization order.
    pub fn maps(&self) -> &[ProbabilityMap] {
        &self.rlzs
    }

    /// Curve of one site and IMT for one realization; zeros when no source
    /// reached the site.
    pub fn curve(&self, ordinal: usize, site: SiteId, imt: &str) -> Option<Vec<f64>> {
        let range = self.imtls.slice(imt)?;
        let full = self.rlzs.get(ordinal)?.curve_or_zero(site);
        Some(full[range].to_vec())
    }
}

/// Streams task outputs into per-group, per-realization maps.
pub struct Aggregator<'a> {
    assoc: &'a RlzsAssoc,
    num_levels: usize,
    maps: BTreeMap<(GroupId, usize), ProbabilityMap>,
    sources: BTreeMap<String, SourceStat>,
    kinds: BTreeMap<SourceKind, KindTime>,
    num_outputs: usize,
}

impl<'a> Aggregator<'a> {
    /// Aggregator for curves of `num_levels` values.
    pub fn new(assoc: &'a RlzsAssoc, num_levels: usize) -> Self {
        Self {
            assoc,
            num_levels,
            maps: BTreeMap::new(),
            sources: BTreeMap::new(),
            kinds: BTreeMap::new(),
            num_outputs: 0,
        }
    }

    /// Folds one task output.
    ///
    /// # Errors
    ///
    /// [`EngineError::UnassociatedGsim`] when the output holds a model the
    /// group does not use; [`EngineError::Numeric`] on invalid maps.
    pub fn ingest(&mut self, output: &TaskOutput) -> Result<(), EngineError> {
        let assoc = self.assoc;
        for (gsim, pmap) in &output.pmaps {
            let rlzs = assoc
                .rlzs_for(output.grp_id, gsim)
                .ok_or_else(|| EngineError::UnassociatedGsim {
                    grp_id: output.grp_id,
                    gsim: gsim.to_string(),
                })?;
            for &rlz in rlzs {
                self.maps
                    .entry((output.grp_id, rlz))
                    .or_insert_with(|| ProbabilityMap::new(self.num_levels))
                    .merge(pmap)?;
            }
        }

        for timing in &output.source_times {
            let stat = self
                .sources
                .entry(timing.id.base().to_string())
                .or_insert_with(|| SourceStat {
                    id: SourceId::new(timing.id.base()),
                    kind: timing.kind,
                    num_ruptures: 0,
                    num_sites: 0,
                    num_pieces: 0,
                    seconds: 0.0,
                });
            stat.num_ruptures += timing.num_ruptures;
            stat.num_sites = stat.num_sites.max(timing.num_sites);
            stat.num_pieces += 1;
            stat.seconds += timing.seconds;

            let kind = self.kinds.entry(timing.kind).or_insert_with(|| KindTime {
                kind: timing.kind,
                num_sources: 0,
                seconds: 0.0,
            });
            kind.num_sources += 1;
            kind.seconds += timing.seconds;
        }

        self.num_outputs += 1;
        debug!(grp_id = %output.grp_id, gsims = output.pmaps.len(), "task output folded");
        Ok(())
    }

    /// Number of outputs folded so far.
    pub fn num_outputs(&self) -> usize {
        self.num_outputs
    }

    /// Map of one group for one realization.
    pub fn group_map(&self, grp_id: GroupId, rlz: usize) -> Option<&ProbabilityMap> {
        self.maps.get(&(grp_id, rlz))
    }

    /// The `n` slowest sources, slowest first (ties by id).
    pub fn slowest_sources(&self, n: usize) -> Vec<SourceStat> {
        let mut stats: Vec<SourceStat> = self.sources.values().cloned().collect();
        stats.sort_by(|a, b| b.seconds.total_cmp(&a.seconds).then_with(|| a.id.cmp(&b.id)));
        stats.truncate(n);
        stats
    }

    /// Calculation time by source kind.
    pub fn time_by_kind(&self) -> Vec<KindTime> {
        self.kinds.values().cloned().collect()
    }

    /// Combines the groups of every realization into its curves.
    ///
    /// # Errors
    ///
    /// [`EngineError::Numeric`] if maps cannot be combined.
    pub fn finalize(&self, imtls: &Imtls) -> Result<HazardCurves, EngineError> {
        let mut by_rlz: Vec<Vec<&ProbabilityMap>> = vec![Vec::new(); self.assoc.num_rlzs()];
        for ((_, rlz), pmap) in &self.maps {
            if let Some(slot) = by_rlz.get_mut(*rlz) {
                slot.push(pmap);
            }
        }

        let rlzs = by_rlz
            .par_iter()
            .map(|maps| {
                maps.iter()
                    .try_fold(ProbabilityMap::new(self.num_levels), |acc, m| acc.combined(m))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(HazardCurves {
            imtls: imtls.clone(),
            rlzs,
        })
    }
}
