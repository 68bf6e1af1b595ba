//! Calculation orchestration.
//!
//! `prepare` builds everything that does not need workers: reduced logic
//! tree, realizations, composite source model and association. `run` then
//! splits and packs the sources into tasks, dispatches them, folds the
//! results and computes statistics.

use crate::aggregator::{Aggregator, HazardCurves};
use crate::assoc::RlzsAssoc;
use crate::config::{Distribute, EngineConfig};
use crate::error::EngineError;
use crate::kernel::CalcContext;
use crate::report::{CalculationReport, DispatchReport, SplitRow};
use crate::scheduler::{
    first_fit_decreasing, CancellationToken, ClassicalWorker, InlinePool, RayonPool, Scheduler, Task, Worker,
    WorkerPool,
};
use crate::statistics::{compute_statistics, HazardStatistics};
use crate::wire::{decode, encode, TaskInput, TaskOutput};
use hazard_core::logictree::{BranchPath, LogicTree};
use hazard_core::realizations::{FullLogicTree, Realization, SamplingMode};
use hazard_core::types::{GsimName, TectonicRegionType, ValidationError};
use hazard_sources::source::split_all;
use hazard_sources::{CompositeSourceModel, GsimRegistry, SiteCollection, Source, SourceFilter};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Task kind of the classical kernel.
pub const CLASSICAL: &str = "classical";

/// Parsed inputs of a calculation.
#[derive(Clone, Debug)]
pub struct CalculationInputs {
    /// Source-model logic tree; the value of a branch of its first set names
    /// a source model.
    pub source_model_tree: LogicTree,
    /// Ground-motion logic tree.
    pub gsim_tree: LogicTree,
    /// Sources of each source model, by name.
    pub source_models: BTreeMap<String, Vec<Source>>,
    /// Sites.
    pub sites: SiteCollection,
    /// Ground-motion models.
    pub registry: GsimRegistry,
}

/// Everything known before dispatch.
#[derive(Clone, Debug)]
pub struct Preparation {
    /// Logic tree with the ground-motion tree reduced to the region types
    /// of the sources.
    pub full_lt: FullLogicTree,
    /// Realizations.
    pub realizations: Vec<Realization>,
    /// Composite source model of the realized source-model paths.
    pub csm: CompositeSourceModel,
    /// Realization-to-model association.
    pub assoc: RlzsAssoc,
    /// Task weight budget.
    pub max_task_weight: f64,
    /// Sites shared with the workers.
    pub sites: Arc<SiteCollection>,
}

/// Result of a calculation.
#[derive(Clone, Debug)]
pub struct CalculationOutput {
    /// Realizations.
    pub realizations: Vec<Realization>,
    /// Curves per realization.
    pub curves: HazardCurves,
    /// Mean, quantiles and hazard maps.
    pub statistics: HazardStatistics,
    /// Tables and diagnostics.
    pub report: CalculationReport,
}

/// Runs a classical hazard calculation.
pub struct HazardCalculator {
    config: EngineConfig,
    inputs: CalculationInputs,
    cancel: CancellationToken,
}

impl HazardCalculator {
    /// Calculator over `inputs`.
    pub fn new(config: EngineConfig, inputs: CalculationInputs) -> Self {
        Self {
            config,
            inputs,
            cancel: CancellationToken::new(),
        }
    }

    /// Uses `token` to cancel the run from another thread.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Configuration in use.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Builds realizations, composite model and association.
    ///
    /// # Errors
    ///
    /// - [`EngineError::Validation`] for zero samples or a branch naming an
    ///   unknown source model
    /// - [`EngineError::Source`] for invalid or duplicated sources
    /// - [`EngineError::Association`] when a realization lacks a model for a
    ///   region type
    /// - [`EngineError::Source`] when a selected ground-motion model is not
    ///   registered or lacks one of the configured IMTs
    pub fn prepare(&self) -> Result<Preparation, EngineError> {
        let sm_tree = &self.inputs.source_model_tree;
        let trts = self.source_trts()?;
        let full_lt = FullLogicTree::new(sm_tree.clone(), self.inputs.gsim_tree.clone()).reduce_gsims(&trts);
        let mode = match self.config.sampling_mode() {
            SamplingMode::Enumerate => full_lt.sampling_mode(self.config.random_seed),
            configured => configured,
        };
        let realizations = full_lt.realizations(mode)?;
        info!(
            num_rlzs = realizations.len(),
            mode = ?mode,
            "realizations generated"
        );

        let path_weights: Vec<_> = full_lt.weighted_source_model_paths();
        let sites = Arc::new(self.inputs.sites.clone());
        let mut builder = CompositeSourceModel::builder()
            .filter(SourceFilter::new(self.config.maximum_distance), Arc::clone(&sites))
            .ps_grid_spacing(self.config.ps_grid_spacing);
        for path in FullLogicTree::source_model_paths(&realizations) {
            let name = self.model_name(&path)?;
            let sources = self.model_sources(&name)?;
            let weight = path_weights
                .iter()
                .find(|wp| wp.path == path)
                .map(|wp| wp.weight)
                .unwrap_or(0.0);
            debug!(sm_path = %path, model = %name, num_sources = sources.len(), "source model added");
            builder = builder.source_model(path, weight, sources.to_vec());
        }
        let csm = builder.build()?;
        let assoc = RlzsAssoc::new(&full_lt, &realizations, &csm)?;
        self.check_models(&assoc)?;
        let max_task_weight = self.config.task_budget(csm.total_weight(), csm.max_unit_weight());

        Ok(Preparation {
            full_lt,
            realizations,
            csm,
            assoc,
            max_task_weight,
            sites,
        })
    }

    /// Runs the calculation with the classical worker.
    ///
    /// # Errors
    ///
    /// Any error of [`HazardCalculator::prepare`], plus task failures,
    /// cancellation and numeric errors.
    pub fn run(&self) -> Result<CalculationOutput, EngineError> {
        self.run_with_worker(|worker| worker)
    }

    /// Runs the calculation with the classical worker passed through `wrap`,
    /// e.g. to decorate it.
    ///
    /// # Errors
    ///
    /// Same as [`HazardCalculator::run`].
    pub fn run_with_worker<W>(&self, wrap: W) -> Result<CalculationOutput, EngineError>
    where
        W: FnOnce(Arc<dyn Worker>) -> Arc<dyn Worker>,
    {
        let start = Instant::now();
        let prep = self.prepare()?;
        let imtls = self.config.intensity_measure_types_and_levels.clone();

        let (tasks, splitting) = self.make_tasks(&prep)?;

        let ctx = Arc::new(CalcContext {
            sites: Arc::clone(&prep.sites),
            imtls: imtls.clone(),
            registry: self.inputs.registry.clone(),
            params: self.config.kernel_params(),
        });
        let pool: Arc<dyn WorkerPool> = match self.config.distribute {
            Distribute::Rayon => Arc::new(RayonPool::new(self.config.num_workers)?),
            Distribute::Inline => Arc::new(InlinePool),
        };
        let worker = wrap(Arc::new(ClassicalWorker::new(ctx)));
        let scheduler =
            Scheduler::new(pool, worker, self.config.scheduler_config()).with_cancellation(self.cancel.clone());

        let mut aggregator = Aggregator::new(&prep.assoc, imtls.num_levels());
        let summary = scheduler.run(tasks, |_task, bytes| {
            let output: TaskOutput = decode(bytes)?;
            aggregator.ingest(&output)
        })?;
        let curves = aggregator.finalize(&imtls)?;

        let weights: Vec<f64> = prep.realizations.iter().map(|r| r.weight).collect();
        let statistics = compute_statistics(&curves, &weights, &self.config.quantiles, &self.config.poes)?;

        let report = CalculationReport::from_preparation(&prep).with_dispatch(DispatchReport {
            max_task_weight: prep.max_task_weight,
            pool: summary.pool.to_string(),
            num_tasks: summary.tasks.len(),
            num_retries: summary.num_retries,
            splitting,
            timing: summary.timing.rows(),
            transfer: summary.transfer.rows(),
            slowest_sources: aggregator.slowest_sources(self.config.num_slowest_sources),
            time_by_kind: aggregator.time_by_kind(),
            hazard_maps: statistics.maps.clone(),
            elapsed_seconds: start.elapsed().as_secs_f64(),
        });
        info!(
            num_rlzs = prep.realizations.len(),
            num_tasks = summary.tasks.len(),
            seconds = start.elapsed().as_secs_f64(),
            "calculation finished"
        );

        Ok(CalculationOutput {
            realizations: prep.realizations,
            curves,
            statistics,
            report,
        })
    }

    /// Splits, packs and serializes the sources of every group.
    fn make_tasks(&self, prep: &Preparation) -> Result<(Vec<Task>, Vec<SplitRow>), EngineError> {
        let budget = prep.max_task_weight;
        let mut tasks = Vec::new();
        let mut splitting = Vec::new();
        for group in prep.csm.groups() {
            let gsims = prep.assoc.gsims_for(group.grp_id);
            let relevant: Vec<Source> = group.sources.iter().filter(|s| s.nsites > 0).cloned().collect();
            if gsims.is_empty() || relevant.is_empty() {
                debug!(grp_id = %group.grp_id, "group skipped: nothing to compute");
                continue;
            }
            let (pieces, stats) = split_all(&relevant, budget);
            splitting.push(SplitRow {
                grp_id: group.grp_id,
                num_sources: stats.num_sources,
                num_split: stats.num_split,
                num_pieces: stats.num_pieces,
            });
            for block in first_fit_decreasing(pieces, budget) {
                let ids = block.sources.iter().map(|s| s.id.clone()).collect();
                let input = TaskInput {
                    grp_id: group.grp_id,
                    gsims: gsims.clone(),
                    sources: block.sources,
                };
                let payload = encode(&input)?;
                tasks.push(Task::new(tasks.len() as u32, CLASSICAL, group.grp_id, ids, block.weight, payload));
            }
        }
        info!(num_tasks = tasks.len(), max_task_weight = budget, "tasks created");
        Ok((tasks, splitting))
    }

    /// Checks the models the association selects, before any task exists.
    fn check_models(&self, assoc: &RlzsAssoc) -> Result<(), EngineError> {
        let imtls = &self.config.intensity_measure_types_and_levels;
        if imtls.is_empty() {
            return Err(ValidationError::InvalidInput("no intensity measure types given".to_string()).into());
        }
        let gsims: BTreeSet<GsimName> = assoc.rows().into_iter().map(|row| row.gsim).collect();
        let imt_names: Vec<&str> = imtls.iter().map(|(imt, _)| imt).collect();
        self.inputs.registry.check_imts(&gsims, imt_names.iter().copied())?;
        debug!(num_gsims = gsims.len(), "ground-motion models checked");
        Ok(())
    }

    /// Region types of the sources of every model the tree can select.
    fn source_trts(&self) -> Result<BTreeSet<TectonicRegionType>, EngineError> {
        let mut trts = BTreeSet::new();
        if let Some(set) = self.inputs.source_model_tree.branch_sets().first() {
            for branch in &set.branches {
                for src in self.model_sources(&branch.value)? {
                    trts.insert(src.trt.clone());
                }
            }
        }
        Ok(trts)
    }

    fn model_name(&self, path: &BranchPath) -> Result<String, EngineError> {
        path.steps()
            .first()
            .and_then(|step| self.inputs.source_model_tree.branch(&step.branch))
            .map(|b| b.value.clone())
            .ok_or_else(|| ValidationError::InvalidInput(format!("source-model path {path} is empty")).into())
    }

    fn model_sources(&self, name: &str) -> Result<&[Source], EngineError> {
        self.inputs
            .source_models
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| ValidationError::InvalidInput(format!("unknown source model {name:?}")).into())
    }
}
