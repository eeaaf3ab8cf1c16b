use tracing::debug;

use super::error::EngineError;
use super::types::{
    FinalBalanceStats, MatrixSummary, PERCENTILES, PercentileCurve, Probability, SimulationMatrix,
};

pub fn aggregate(
    matrix: &SimulationMatrix,
    total_invested: f64,
) -> Result<MatrixSummary, EngineError> {
    if matrix.is_degenerate() {
        let (paths, years) = matrix.shape();
        return Err(EngineError::invalid_input(format!(
            "cannot aggregate a {paths}x{years} matrix"
        )));
    }

    let years = matrix.years();
    let mut curves: Vec<Vec<f64>> = PERCENTILES
        .iter()
        .map(|_| Vec::with_capacity(years))
        .collect();
    let mut mean_curve = Vec::with_capacity(years);

    for year_index in 0..years {
        let mut column = matrix.column(year_index);
        mean_curve.push(mean(&column));
        column.sort_by(|a, b| a.total_cmp(b));
        for (curve, p) in curves.iter_mut().zip(PERCENTILES) {
            curve.push(percentile_sorted(&column, p));
        }
    }

    let percentile_curves = PERCENTILES
        .iter()
        .zip(curves)
        .map(|(&percentile, values)| PercentileCurve { percentile, values })
        .collect();

    let final_balance = final_balance_stats(&matrix.final_balances(), total_invested)?;
    debug!(
        paths = matrix.paths(),
        years,
        median = final_balance.median,
        "aggregated simulation matrix"
    );

    Ok(MatrixSummary {
        percentile_curves,
        mean_curve,
        final_balance,
    })
}

pub fn final_balance_stats(
    final_balances: &[f64],
    total_invested: f64,
) -> Result<FinalBalanceStats, EngineError> {
    if final_balances.is_empty() {
        return Err(EngineError::invalid_input(
            "final-balance distribution is empty",
        ));
    }

    let mut sorted = final_balances.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let n = sorted.len() as u32;

    let profit = fraction_above(&sorted, total_invested);
    let doubling = fraction_above(&sorted, 2.0 * total_invested);

    Ok(FinalBalanceStats {
        median: percentile_sorted(&sorted, 50.0),
        mean: mean(&sorted),
        min: sorted[0],
        max: sorted[sorted.len() - 1],
        std_dev: std_dev(&sorted),
        p5: percentile_sorted(&sorted, 5.0),
        p10: percentile_sorted(&sorted, 10.0),
        p25: percentile_sorted(&sorted, 25.0),
        p50: percentile_sorted(&sorted, 50.0),
        p75: percentile_sorted(&sorted, 75.0),
        p90: percentile_sorted(&sorted, 90.0),
        p95: percentile_sorted(&sorted, 95.0),
        probability_of_profit: Probability {
            estimate: profit,
            ci_half_width: binomial_ci_half_width(profit, n),
        },
        probability_of_doubling: Probability {
            estimate: doubling,
            ci_half_width: binomial_ci_half_width(doubling, n),
        },
    })
}

// Sorts `values` in place.
pub fn percentile(values: &mut [f64], p: f64) -> f64 {
    values.sort_by(|a, b| a.total_cmp(b));
    percentile_sorted(values, p)
}

pub fn percentile_sorted(values: &[f64], p: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    let n = values.len();
    if n == 1 {
        return values[0];
    }

    let rank = (p / 100.0) * (n as f64 - 1.0);
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;

    if lower == upper {
        values[lower]
    } else {
        let w = rank - lower as f64;
        values[lower] + (values[upper] - values[lower]) * w
    }
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

// Population, not sample.
pub fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

pub fn fraction_above(values: &[f64], threshold: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let hits = values.iter().filter(|v| **v > threshold).count();
    hits as f64 / values.len() as f64
}

pub fn binomial_ci_half_width(p: f64, n: u32) -> f64 {
    if n == 0 {
        return 0.0;
    }
    let p = p.clamp(0.0, 1.0);
    1.96 * (p * (1.0 - p) / n as f64).sqrt()
}
