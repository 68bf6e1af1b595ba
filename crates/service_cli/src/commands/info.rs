//! Info command implementation
//!
//! Prepares a job without dispatching any task and prints the realizations,
//! the source groups and the realization association.

use std::path::Path;

use hazard_engine::{CalculationReport, HazardCalculator};
use tracing::info;

use crate::job::JobSpec;
use crate::Result;

/// Run the info command
pub fn run(job: &JobSpec, path: &Path) -> Result<()> {
    info!(job = %path.display(), "preparing calculation");
    let calculator = HazardCalculator::new(job.calculation.clone(), job.to_inputs()?);
    let prep = calculator.prepare()?;
    info!(
        num_groups = prep.csm.groups().len(),
        max_task_weight = prep.max_task_weight,
        "composite source model ready"
    );
    print!("{}", CalculationReport::from_preparation(&prep));
    println!("\nmax_task_weight: {:.1}", prep.max_task_weight);
    Ok(())
}
