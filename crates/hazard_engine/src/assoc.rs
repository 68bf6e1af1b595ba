//! Realization-to-model association.
//!
//! For every source group, the realizations sharing the group's
//! source-model path are split by the ground-motion model they select for the
//! group's tectonic region type. The sets of one group partition the
//! realizations relevant to it.

use crate::error::AssociationError;
use hazard_core::realizations::{FullLogicTree, Realization};
use hazard_core::types::{GroupId, GsimName};
use hazard_sources::CompositeSourceModel;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// `grp_id → gsim → realization ordinals`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RlzsAssoc {
    by_grp: BTreeMap<GroupId, BTreeMap<GsimName, BTreeSet<usize>>>,
    num_rlzs: usize,
}

/// One line of the association table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AssocRow {
    /// Group id.
    pub grp_id: GroupId,
    /// Ground-motion model name.
    pub gsim: GsimName,
    /// Realization ordinals using it.
    pub rlzs: Vec<usize>,
}

impl RlzsAssoc {
    /// Builds the association.
    ///
    /// # Errors
    ///
    /// [`AssociationError::UncoveredTrt`] when a realization selects no
    /// ground-motion model for a region type present in `csm`.
    pub fn new(
        full_lt: &FullLogicTree,
        rlzs: &[Realization],
        csm: &CompositeSourceModel,
    ) -> Result<Self, AssociationError> {
        let trts = csm.trts();
        for rlz in rlzs {
            for trt in &trts {
                if full_lt.gsim_for(rlz, trt).is_none() {
                    return Err(AssociationError::UncoveredTrt {
                        rlz: rlz.ordinal,
                        trt: trt.to_string(),
                    });
                }
            }
        }

        let mut by_grp: BTreeMap<GroupId, BTreeMap<GsimName, BTreeSet<usize>>> = BTreeMap::new();
        for group in csm.groups() {
            let entry = by_grp.entry(group.grp_id).or_default();
            for rlz in rlzs.iter().filter(|r| r.sm_path == group.sm_path) {
                if let Some(branch) = full_lt.gsim_for(rlz, &group.trt) {
                    entry
                        .entry(GsimName::new(branch.value.as_str()))
                        .or_default()
                        .insert(rlz.ordinal);
                }
            }
            debug!(grp_id = %group.grp_id, gsims = entry.len(), "group associated");
        }

        Ok(Self {
            by_grp,
            num_rlzs: rlzs.len(),
        })
    }

    /// Number of realizations the association was built for.
    pub fn num_rlzs(&self) -> usize {
        self.num_rlzs
    }

    /// Ground-motion models used by a group, in name order.
    pub fn gsims_for(&self, grp_id: GroupId) -> Vec<GsimName> {
        self.by_grp
            .get(&grp_id)
            .map(|m| m.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Realizations of a group using `gsim`.
    pub fn rlzs_for(&self, grp_id: GroupId, gsim: &GsimName) -> Option<&BTreeSet<usize>> {
        self.by_grp.get(&grp_id)?.get(gsim)
    }

    /// All realizations relevant to a group.
    pub fn rlzs_of_group(&self, grp_id: GroupId) -> BTreeSet<usize> {
        self.by_grp
            .get(&grp_id)
            .map(|m| m.values().flatten().copied().collect())
            .unwrap_or_default()
    }

    /// Table rows ordered by group then model.
    pub fn rows(&self) -> Vec<AssocRow> {
        self.by_grp
            .iter()
            .flat_map(|(grp_id, gsims)| {
                gsims.iter().map(move |(gsim, rlzs)| AssocRow {
                    grp_id: *grp_id,
                    gsim: gsim.clone(),
                    rlzs: rlzs.iter().copied().collect(),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hazard_core::logictree::{Branch, BranchSet, LogicTree};
    use hazard_core::realizations::SamplingMode;
    use hazard_sources::{Source, SourceKind};

    fn setup(gsim_sets: Vec<BranchSet>) -> (FullLogicTree, Vec<Realization>, CompositeSourceModel) {
        let sm = LogicTree::builder()
            .branch_set(BranchSet::new(
                "sm",
                vec![Branch::new("b1", 0.5, "m1"), Branch::new("b2", 0.5, "m2")],
            ))
            .build()
            .unwrap();
        let gsim = LogicTree::builder().branch_sets(gsim_sets).build().unwrap();
        let full = FullLogicTree::new(sm.clone(), gsim);
        let rlzs = full.realizations(SamplingMode::Enumerate).unwrap();
        let paths = sm.enumerate();
        let csm = CompositeSourceModel::builder()
            .source_model(
                paths[0].path.clone(),
                0.5,
                vec![Source::new("a", SourceKind::Point, "ASC", 1)],
            )
            .source_model(
                paths[1].path.clone(),
                0.5,
                vec![Source::new("b", SourceKind::Point, "ASC", 1)],
            )
            .build()
            .unwrap();
        (full, rlzs, csm)
    }

    #[test]
    fn test_partition_per_group() {
        let (full, rlzs, csm) = setup(vec![BranchSet::new(
            "g",
            vec![Branch::new("g1", 0.6, "ModelA"), Branch::new("g2", 0.4, "ModelB")],
        )
        .with_trt("ASC")]);
        let assoc = RlzsAssoc::new(&full, &rlzs, &csm).unwrap();
        assert_eq!(assoc.num_rlzs(), 4);

        assert_eq!(
            assoc.rlzs_for(GroupId(0), &"ModelA".into()).unwrap(),
            &BTreeSet::from([0])
        );
        assert_eq!(
            assoc.rlzs_for(GroupId(0), &"ModelB".into()).unwrap(),
            &BTreeSet::from([1])
        );
        assert_eq!(assoc.rlzs_of_group(GroupId(1)), BTreeSet::from([2, 3]));
        assert_eq!(assoc.rows().len(), 4);
    }

    #[test]
    fn test_uncovered_trt_is_error() {
        let (full, rlzs, csm) = setup(vec![BranchSet::new(
            "g",
            vec![Branch::new("g1", 1.0, "ModelA")],
        )
        .with_trt("Stable Continental")]);
        let err = RlzsAssoc::new(&full, &rlzs, &csm).unwrap_err();
        assert_eq!(
            err,
            AssociationError::UncoveredTrt {
                rlz: 0,
                trt: "ASC".to_string()
            }
        );
    }

    #[test]
    fn test_unknown_group_is_empty() {
        let (full, rlzs, csm) = setup(vec![BranchSet::new(
            "g",
            vec![Branch::new("g1", 1.0, "ModelA")],
        )
        .with_trt("ASC")]);
        let assoc = RlzsAssoc::new(&full, &rlzs, &csm).unwrap();
        assert!(assoc.gsims_for(GroupId(9)).is_empty());
        assert!(assoc.rlzs_of_group(GroupId(9)).is_empty());
    }
}
