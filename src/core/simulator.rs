use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use rayon::prelude::*;
use tracing::debug;

use super::error::EngineError;
use super::types::{SimulationMatrix, SimulationParameters};

pub fn simulate(params: &SimulationParameters, seed: u64) -> Result<SimulationMatrix, EngineError> {
    let paths = params.simulation_count as usize;
    let years = params.years as usize;
    if paths == 0 || years == 0 {
        return Err(EngineError::invalid_input(format!(
            "cannot simulate a {paths}x{years} matrix"
        )));
    }

    let returns = Normal::new(params.mean_return(), params.volatility())
        .map_err(|e| EngineError::invalid_parameter("volatility_pct", e.to_string()))?;

    let mut values = vec![0.0; paths * years];
    values
        .par_chunks_mut(years)
        .enumerate()
        .for_each(|(path, row)| {
            let mut rng = ChaCha8Rng::seed_from_u64(derive_path_seed(seed, path as u64));
            simulate_path(params, &returns, &mut rng, row);
        });

    debug!(paths, years, seed, "simulated growth paths");
    Ok(SimulationMatrix::from_row_major(paths, years, values))
}

fn simulate_path<R: Rng + ?Sized>(
    params: &SimulationParameters,
    returns: &Normal<f64>,
    rng: &mut R,
    row: &mut [f64],
) {
    // Only the recorded value is floored; the running balance keeps compounding.
    let mut balance = params.initial_balance;
    for slot in row.iter_mut() {
        balance += params.annual_contribution;
        let annual_return = returns.sample(rng);
        balance *= 1.0 + annual_return;
        *slot = balance.max(0.0);
    }
}

/// Seed for one path's stream. Distinct path indices always map to
/// distinct seeds because SplitMix64's finalizer is a bijection.
pub fn derive_path_seed(base_seed: u64, path_index: u64) -> u64 {
    splitmix64(base_seed ^ path_index.rotate_left(32))
}

fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E3779B97F4A7C15);
    let mut z = x;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}
