use std::time::Instant;

use tracing::info;

use super::error::EngineError;
use super::projector::project_base_case;
use super::reports::{DEFAULT_HISTOGRAM_BINS, histogram, percentile_table};
use super::simulator::simulate;
use super::stats::aggregate;
use super::types::{Projection, SimulationParameters};

#[derive(Debug, Clone, Copy)]
pub struct ComputeOptions {
    pub histogram_bins: usize,
}

impl Default for ComputeOptions {
    fn default() -> Self {
        Self {
            histogram_bins: DEFAULT_HISTOGRAM_BINS,
        }
    }
}

pub fn compute(params: SimulationParameters, seed: u64) -> Result<Projection, EngineError> {
    compute_with_options(params, seed, ComputeOptions::default())
}

pub fn compute_with_options(
    params: SimulationParameters,
    seed: u64,
    options: ComputeOptions,
) -> Result<Projection, EngineError> {
    params.validate()?;
    let started = Instant::now();

    let base_case = project_base_case(&params);
    let matrix = simulate(&params, seed)?;
    let matrix_summary = aggregate(&matrix, base_case.summary.total_invested)?;
    let percentile_table = percentile_table(&matrix_summary, &base_case.records)?;
    let histogram = histogram(&matrix.final_balances(), options.histogram_bins)?;

    info!(
        years = params.years,
        paths = params.simulation_count,
        seed,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "projection complete"
    );

    Ok(Projection {
        parameters: params,
        seed,
        base_case,
        matrix_summary,
        percentile_table,
        histogram,
    })
}
