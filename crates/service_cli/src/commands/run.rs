//! Run command implementation
//!
//! Runs a classical calculation end to end and prints the report.

use std::path::Path;

use hazard_engine::{CalculationReport, HazardCalculator, ProbabilityMap};
use serde::Serialize;
use tracing::info;

use super::OutputFormat;
use crate::job::JobSpec;
use crate::Result;

#[derive(Serialize)]
struct RunOutput<'a> {
    report: &'a CalculationReport,
    mean_curves: &'a ProbabilityMap,
}

/// Run the calculation described by `job`
pub fn run(job: &JobSpec, path: &Path, format: OutputFormat) -> Result<()> {
    info!(job = %path.display(), "starting calculation");
    let calculator = HazardCalculator::new(job.calculation.clone(), job.to_inputs()?);
    let output = calculator.run()?;
    info!(
        num_rlzs = output.realizations.len(),
        num_map_rows = output.statistics.maps.len(),
        "calculation complete"
    );

    match format {
        OutputFormat::Table => print!("{}", output.report),
        OutputFormat::Json => {
            let doc = RunOutput {
                report: &output.report,
                mean_curves: &output.statistics.mean,
            };
            println!("{}", serde_json::to_string_pretty(&doc)?);
        }
    }
    Ok(())
}
