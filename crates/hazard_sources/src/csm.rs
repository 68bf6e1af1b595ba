//! Composite source model: sources grouped by tectonic region and source-model path.

use crate::error::SourceError;
use crate::site::{SiteCollection, SourceFilter};
use crate::source::{grid_point_sources, Source, SourceKind};
use hazard_core::logictree::BranchPath;
use hazard_core::types::{GroupId, SourceId, TectonicRegionType, ValidationError};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Sources sharing a tectonic region type and a source-model path.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SourceGroup {
    /// Group id, assigned in first-seen order.
    pub grp_id: GroupId,
    /// Tectonic region type shared by the sources.
    pub trt: TectonicRegionType,
    /// Source-model path the sources come from.
    pub sm_path: BranchPath,
    /// Weight of the source-model path.
    pub weight: f64,
    /// Sources, unique by id.
    pub sources: Vec<Source>,
    /// Ruptures of sources affecting at least one site.
    pub eff_ruptures: usize,
    /// All ruptures.
    pub tot_ruptures: usize,
}

impl SourceGroup {
    /// Summed source weights.
    pub fn weight_sum(&self) -> f64 {
        self.sources.iter().map(Source::weight).sum()
    }
}

/// Non-fatal findings of the builder.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CsmDiagnostics {
    /// Source ids present in more than one group, sorted.
    pub duplicated_sources: Vec<SourceId>,
    /// Groups without ruptures.
    pub empty_groups: Vec<GroupId>,
    /// Point sources merged by gridding.
    pub collapsed_points: usize,
}

/// Immutable set of source groups shared read-only with every worker.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct CompositeSourceModel {
    groups: Vec<SourceGroup>,
    diagnostics: CsmDiagnostics,
}

impl CompositeSourceModel {
    /// Creates a builder.
    pub fn builder() -> CompositeSourceModelBuilder {
        CompositeSourceModelBuilder::default()
    }

    /// Groups in id order.
    pub fn groups(&self) -> &[SourceGroup] {
        &self.groups
    }

    /// Group by id.
    pub fn group(&self, grp_id: GroupId) -> Option<&SourceGroup> {
        self.groups.get(grp_id.index())
    }

    /// Builder findings.
    pub fn diagnostics(&self) -> &CsmDiagnostics {
        &self.diagnostics
    }

    /// Tectonic region types with at least one group.
    pub fn trts(&self) -> BTreeSet<TectonicRegionType> {
        self.groups.iter().map(|g| g.trt.clone()).collect()
    }

    /// Number of sources over all groups.
    pub fn num_sources(&self) -> usize {
        self.groups.iter().map(|g| g.sources.len()).sum()
    }

    /// Summed weight of all sources.
    pub fn total_weight(&self) -> f64 {
        self.groups.iter().map(SourceGroup::weight_sum).sum()
    }

    /// Heaviest single rupture of any source.
    pub fn max_unit_weight(&self) -> f64 {
        self.groups
            .iter()
            .flat_map(|g| g.sources.iter())
            .map(Source::unit_weight)
            .fold(0.0, f64::max)
    }

    /// Number of sources per kind.
    pub fn kind_counts(&self) -> BTreeMap<SourceKind, usize> {
        let mut counts = BTreeMap::new();
        for src in self.groups.iter().flat_map(|g| g.sources.iter()) {
            *counts.entry(src.kind).or_insert(0) += 1;
        }
        counts
    }

    /// Looks up a source by group and id.
    pub fn source(&self, grp_id: GroupId, id: &SourceId) -> Option<&Source> {
        self.group(grp_id)?.sources.iter().find(|s| &s.id == id)
    }
}

struct SourceModelInput {
    sm_path: BranchPath,
    weight: f64,
    sources: Vec<Source>,
}

/// Builder for [`CompositeSourceModel`].
///
/// # Examples
///
/// ```
/// use hazard_core::logictree::{BranchPath, PathStep};
/// use hazard_sources::csm::CompositeSourceModel;
/// use hazard_sources::source::{Source, SourceKind};
///
/// let path = BranchPath::from_steps(vec![PathStep { set: "sm".into(), branch: "b1".into(), index: 0 }]);
/// let csm = CompositeSourceModel::builder()
///     .source_model(path, 1.0, vec![
///         Source::new("a", SourceKind::SimpleFault, "Active Shallow Crust", 10),
///         Source::new("b", SourceKind::Point, "Stable Continental", 5),
///         Source::new("c", SourceKind::Point, "Active Shallow Crust", 1),
///     ])
///     .build()
///     .unwrap();
///
/// assert_eq!(csm.groups().len(), 2);
/// assert_eq!(csm.groups()[0].tot_ruptures, 11);
/// ```
#[derive(Default)]
pub struct CompositeSourceModelBuilder {
    models: Vec<SourceModelInput>,
    filter: Option<(SourceFilter, Arc<SiteCollection>)>,
    ps_grid_spacing: Option<f64>,
}

impl CompositeSourceModelBuilder {
    /// Adds the sources of one source-model path.
    pub fn source_model(mut self, sm_path: BranchPath, weight: f64, sources: Vec<Source>) -> Self {
        self.models.push(SourceModelInput {
            sm_path,
            weight,
            sources,
        });
        self
    }

    /// Counts affected sites per source; enables effective rupture counts.
    pub fn filter(mut self, filter: SourceFilter, sites: Arc<SiteCollection>) -> Self {
        self.filter = Some((filter, sites));
        self
    }

    /// Collapses point sources of each group on a grid of this spacing, km.
    pub fn ps_grid_spacing(mut self, spacing_km: Option<f64>) -> Self {
        self.ps_grid_spacing = spacing_km;
        self
    }

    /// Groups, validates, grids and filters the sources.
    ///
    /// # Errors
    ///
    /// - [`SourceError::InvalidSource`] from [`Source::validate`]
    /// - [`ValidationError::DuplicateSource`] when an id repeats inside a group
    pub fn build(self) -> Result<CompositeSourceModel, SourceError> {
        let mut groups: Vec<SourceGroup> = Vec::new();
        let mut index: HashMap<(TectonicRegionType, BranchPath), usize> = HashMap::new();
        let mut ids_per_group: Vec<HashSet<SourceId>> = Vec::new();

        for model in self.models {
            for src in model.sources {
                src.validate()?;
                let key = (src.trt.clone(), model.sm_path.clone());
                let gi = match index.get(&key) {
                    Some(&gi) => gi,
                    None => {
                        let gi = groups.len();
                        index.insert(key, gi);
                        groups.push(SourceGroup {
                            grp_id: GroupId(gi as u32),
                            trt: src.trt.clone(),
                            sm_path: model.sm_path.clone(),
                            weight: model.weight,
                            sources: Vec::new(),
                            eff_ruptures: 0,
                            tot_ruptures: 0,
                        });
                        ids_per_group.push(HashSet::new());
                        gi
                    }
                };
                if !ids_per_group[gi].insert(src.id.clone()) {
                    return Err(ValidationError::DuplicateSource {
                        source_id: src.id.to_string(),
                        group: gi as u32,
                    }
                    .into());
                }
                groups[gi].sources.push(src);
            }
        }

        let mut diagnostics = CsmDiagnostics {
            duplicated_sources: duplicated_across_groups(&ids_per_group),
            ..CsmDiagnostics::default()
        };
        if !diagnostics.duplicated_sources.is_empty() {
            warn!(
                count = diagnostics.duplicated_sources.len(),
                "sources appear in more than one group"
            );
        }

        for group in &mut groups {
            if let Some(spacing) = self.ps_grid_spacing {
                let before = group.sources.len();
                group.sources = grid_point_sources(std::mem::take(&mut group.sources), spacing);
                let merged = before - group.sources.len();
                if merged > 0 {
                    diagnostics.collapsed_points += merged;
                    debug!(grp_id = %group.grp_id, merged, "point sources collapsed");
                }
            }
            if let Some((filter, sites)) = &self.filter {
                group.sources = std::mem::take(&mut group.sources)
                    .into_par_iter()
                    .map(|src| filter.annotate(src, sites))
                    .collect();
            }
            for src in &mut group.sources {
                src.grp_id = Some(group.grp_id);
            }
            group.tot_ruptures = group.sources.iter().map(|s| s.num_ruptures).sum();
            group.eff_ruptures = if self.filter.is_some() {
                group
                    .sources
                    .iter()
                    .filter(|s| s.nsites > 0)
                    .map(|s| s.num_ruptures)
                    .sum()
            } else {
                group.tot_ruptures
            };
            if group.tot_ruptures == 0 {
                diagnostics.empty_groups.push(group.grp_id);
            }
        }

        let csm = CompositeSourceModel {
            groups,
            diagnostics,
        };
        info!(
            num_groups = csm.groups.len(),
            num_sources = csm.num_sources(),
            total_weight = csm.total_weight(),
            "composite source model built"
        );
        Ok(csm)
    }
}

fn duplicated_across_groups(ids_per_group: &[HashSet<SourceId>]) -> Vec<SourceId> {
    let mut counts: BTreeMap<&SourceId, usize> = BTreeMap::new();
    for ids in ids_per_group {
        for id in ids {
            *counts.entry(id).or_insert(0) += 1;
        }
    }
    counts
        .into_iter()
        .filter(|(_, n)| *n > 1)
        .map(|(id, _)| id.clone())
        .collect()
}
