//! Plain-text and JSON tables describing a calculation.

use crate::aggregator::{KindTime, SourceStat};
use crate::assoc::AssocRow;
use crate::calc::Preparation;
use crate::scheduler::{TimingRow, TransferRow};
use crate::statistics::HazardMapRow;
use hazard_core::types::GroupId;
use hazard_sources::{CsmDiagnostics, SourceKind};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// One realization.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RlzRow {
    /// Ordinal.
    pub ordinal: usize,
    /// Weight.
    pub weight: f64,
    /// Branch path, `sm~gsim`.
    pub path: String,
    /// Draw index when sampled.
    pub sample: Option<u32>,
}

/// One source group.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GroupRow {
    /// Group id.
    pub grp_id: GroupId,
    /// Tectonic region type.
    pub trt: String,
    /// Source-model path.
    pub sm_path: String,
    /// Path weight.
    pub weight: f64,
    /// Sources after gridding.
    pub num_sources: usize,
    /// Ruptures of sources affecting a site.
    pub eff_ruptures: usize,
    /// All ruptures.
    pub tot_ruptures: usize,
}

/// Splitting of one group.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SplitRow {
    /// Group id.
    pub grp_id: GroupId,
    /// Sources dispatched.
    pub num_sources: usize,
    /// Sources that were split.
    pub num_split: usize,
    /// Pieces produced.
    pub num_pieces: usize,
}

/// What happened during dispatch.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DispatchReport {
    /// Task weight budget.
    pub max_task_weight: f64,
    /// Pool name.
    pub pool: String,
    /// Tasks dispatched.
    pub num_tasks: usize,
    /// Retries performed.
    pub num_retries: u32,
    /// Splitting per group.
    pub splitting: Vec<SplitRow>,
    /// Task durations by kind.
    pub timing: Vec<TimingRow>,
    /// Data transfer by kind.
    pub transfer: Vec<TransferRow>,
    /// Slowest sources.
    pub slowest_sources: Vec<SourceStat>,
    /// Calculation time by source kind.
    pub time_by_kind: Vec<KindTime>,
    /// Hazard maps of the statistics.
    pub hazard_maps: Vec<HazardMapRow>,
    /// Wall time of the calculation, seconds.
    pub elapsed_seconds: f64,
}

/// Report of a prepared or completed calculation.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CalculationReport {
    /// Realizations.
    pub realizations: Vec<RlzRow>,
    /// Source groups.
    pub groups: Vec<GroupRow>,
    /// Sources by kind.
    pub kind_counts: BTreeMap<SourceKind, usize>,
    /// Association table.
    pub assoc: Vec<AssocRow>,
    /// Non-fatal findings of the source model builder.
    pub diagnostics: CsmDiagnostics,
    /// Dispatch tables; absent before the run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dispatch: Option<DispatchReport>,
}

impl CalculationReport {
    /// Report of a prepared calculation.
    pub fn from_preparation(prep: &Preparation) -> Self {
        Self {
            realizations: prep
                .realizations
                .iter()
                .map(|r| RlzRow {
                    ordinal: r.ordinal,
                    weight: r.weight,
                    path: r.path_string(),
                    sample: r.sample,
                })
                .collect(),
            groups: prep
                .csm
                .groups()
                .iter()
                .map(|g| GroupRow {
                    grp_id: g.grp_id,
                    trt: g.trt.to_string(),
                    sm_path: g.sm_path.to_string(),
                    weight: g.weight,
                    num_sources: g.sources.len(),
                    eff_ruptures: g.eff_ruptures,
                    tot_ruptures: g.tot_ruptures,
                })
                .collect(),
            kind_counts: prep.csm.kind_counts(),
            assoc: prep.assoc.rows(),
            diagnostics: prep.csm.diagnostics().clone(),
            dispatch: None,
        }
    }

    /// Adds the dispatch tables.
    pub fn with_dispatch(mut self, dispatch: DispatchReport) -> Self {
        self.dispatch = Some(dispatch);
        self
    }
}

fn join<T: fmt::Display>(items: &[T]) -> String {
    items.iter().map(ToString::to_string).collect::<Vec<_>>().join(" ")
}

impl fmt::Display for CalculationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "== Realizations ({}) ==", self.realizations.len())?;
        writeln!(f, "{:>6} {:>10} {:>7}  path", "rlz", "weight", "sample")?;
        for r in &self.realizations {
            let sample = r.sample.map(|s| s.to_string()).unwrap_or_else(|| "-".to_string());
            writeln!(f, "{:>6} {:>10.6} {:>7}  {}", r.ordinal, r.weight, sample, r.path)?;
        }

        writeln!(f, "\n== Source groups ({}) ==", self.groups.len())?;
        writeln!(
            f,
            "{:>5} {:<28} {:<16} {:>8} {:>8} {:>12} {:>12}",
            "grp", "trt", "sm_path", "weight", "sources", "eff_ruptures", "tot_ruptures"
        )?;
        for g in &self.groups {
            writeln!(
                f,
                "{:>5} {:<28} {:<16} {:>8.4} {:>8} {:>12} {:>12}",
                g.grp_id.0, g.trt, g.sm_path, g.weight, g.num_sources, g.eff_ruptures, g.tot_ruptures
            )?;
        }
        if !self.kind_counts.is_empty() {
            let kinds: Vec<String> = self.kind_counts.iter().map(|(k, n)| format!("{k}={n}")).collect();
            writeln!(f, "sources by kind: {}", kinds.join(", "))?;
        }

        writeln!(f, "\n== Realization association ==")?;
        writeln!(f, "{:>5} {:<28} rlzs", "grp", "gsim")?;
        for row in &self.assoc {
            writeln!(f, "{:>5} {:<28} {}", row.grp_id.0, row.gsim.as_str(), join(&row.rlzs))?;
        }

        let d = &self.diagnostics;
        if !d.duplicated_sources.is_empty() || !d.empty_groups.is_empty() || d.collapsed_points > 0 {
            writeln!(f, "\n== Diagnostics ==")?;
            if !d.duplicated_sources.is_empty() {
                writeln!(f, "duplicated sources: {}", join(&d.duplicated_sources))?;
            }
            if !d.empty_groups.is_empty() {
                writeln!(f, "groups without ruptures: {}", join(&d.empty_groups))?;
            }
            if d.collapsed_points > 0 {
                writeln!(f, "point sources collapsed: {}", d.collapsed_points)?;
            }
        }

        if let Some(dispatch) = &self.dispatch {
            write!(f, "{dispatch}")?;
        }
        Ok(())
    }
}

impl fmt::Display for DispatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "\n== Dispatch ==\npool: {}, tasks: {}, retries: {}, max_task_weight: {:.1}, elapsed: {:.3}s",
            self.pool, self.num_tasks, self.num_retries, self.max_task_weight, self.elapsed_seconds
        )?;
        writeln!(f, "{:>5} {:>8} {:>8} {:>8}", "grp", "sources", "split", "pieces")?;
        for s in &self.splitting {
            writeln!(f, "{:>5} {:>8} {:>8} {:>8}", s.grp_id.0, s.num_sources, s.num_split, s.num_pieces)?;
        }

        writeln!(f, "\n== Task timing (s) ==")?;
        writeln!(
            f,
            "{:<12} {:>6} {:>10} {:>10} {:>10} {:>10}",
            "kind", "count", "mean", "stddev", "min", "max"
        )?;
        for t in &self.timing {
            writeln!(
                f,
                "{:<12} {:>6} {:>10.4} {:>10.4} {:>10.4} {:>10.4}",
                t.kind, t.count, t.mean, t.stddev, t.min, t.max
            )?;
        }

        writeln!(f, "\n== Data transfer ==")?;
        writeln!(f, "{:<12} {:>8} {:>12} {:>12}", "kind", "messages", "sent", "received")?;
        for t in &self.transfer {
            writeln!(f, "{:<12} {:>8} {:>12} {:>12}", t.kind, t.messages, t.sent, t.received)?;
        }

        if !self.slowest_sources.is_empty() {
            writeln!(f, "\n== Slowest sources ==")?;
            writeln!(
                f,
                "{:<24} {:<16} {:>10} {:>6} {:>6} {:>10}",
                "source", "kind", "ruptures", "sites", "pieces", "seconds"
            )?;
            for s in &self.slowest_sources {
                writeln!(
                    f,
                    "{:<24} {:<16} {:>10} {:>6} {:>6} {:>10.4}",
                    s.id.as_str(),
                    s.kind.to_string(),
                    s.num_ruptures,
                    s.num_sites,
                    s.num_pieces,
                    s.seconds
                )?;
            }
        }

        if !self.time_by_kind.is_empty() {
            writeln!(f, "\n== Calculation time by source kind ==")?;
            for k in &self.time_by_kind {
                writeln!(f, "{:<16} {:>8} {:>10.4}", k.kind.to_string(), k.num_sources, k.seconds)?;
            }
        }

        if !self.hazard_maps.is_empty() {
            writeln!(f, "\n== Hazard maps ==")?;
            writeln!(f, "{:<16} {:>6} {:<10} {:>8} {:>12}", "statistic", "site", "imt", "poe", "iml")?;
            for m in &self.hazard_maps {
                writeln!(
                    f,
                    "{:<16} {:>6} {:<10} {:>8} {:>12.6}",
                    m.statistic, m.site, m.imt, m.poe, m.iml
                )?;
            }
        }
        Ok(())
    }
}
