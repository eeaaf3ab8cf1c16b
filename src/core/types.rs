use serde::Serialize;

use super::error::EngineError;

pub const PERCENTILES: [f64; 7] = [5.0, 10.0, 25.0, 50.0, 75.0, 90.0, 95.0];

pub const MAX_ANNUAL_RETURN_PCT: f64 = 100.0;
pub const MIN_YEARS: u32 = 1;
pub const MAX_YEARS: u32 = 50;
pub const MIN_VOLATILITY_PCT: f64 = 1.0;
pub const MAX_VOLATILITY_PCT: f64 = 40.0;
pub const MIN_SIMULATIONS: u32 = 100;
pub const MAX_SIMULATIONS: u32 = 2000;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationParameters {
    pub initial_balance: f64,
    pub annual_return_pct: f64,
    pub years: u32,
    pub annual_contribution: f64,
    pub volatility_pct: f64,
    pub simulation_count: u32,
}

impl SimulationParameters {
    /// Checks every field against its documented range. Nothing downstream
    /// re-validates, so this must run before projection or simulation.
    pub fn validate(&self) -> Result<(), EngineError> {
        non_negative("initial_balance", self.initial_balance)?;
        within(
            "annual_return_pct",
            self.annual_return_pct,
            0.0,
            MAX_ANNUAL_RETURN_PCT,
        )?;
        if !(MIN_YEARS..=MAX_YEARS).contains(&self.years) {
            return Err(EngineError::invalid_parameter(
                "years",
                format!("must be between {MIN_YEARS} and {MAX_YEARS}, got {}", self.years),
            ));
        }
        non_negative("annual_contribution", self.annual_contribution)?;
        within(
            "volatility_pct",
            self.volatility_pct,
            MIN_VOLATILITY_PCT,
            MAX_VOLATILITY_PCT,
        )?;
        if !(MIN_SIMULATIONS..=MAX_SIMULATIONS).contains(&self.simulation_count) {
            return Err(EngineError::invalid_parameter(
                "simulation_count",
                format!(
                    "must be between {MIN_SIMULATIONS} and {MAX_SIMULATIONS}, got {}",
                    self.simulation_count
                ),
            ));
        }
        Ok(())
    }

    pub fn mean_return(&self) -> f64 {
        self.annual_return_pct / 100.0
    }

    pub fn volatility(&self) -> f64 {
        self.volatility_pct / 100.0
    }
}

fn non_negative(name: &'static str, value: f64) -> Result<(), EngineError> {
    if !value.is_finite() || value < 0.0 {
        return Err(EngineError::invalid_parameter(
            name,
            format!("must be a finite value >= 0, got {value}"),
        ));
    }
    Ok(())
}

fn within(name: &'static str, value: f64, min: f64, max: f64) -> Result<(), EngineError> {
    if !value.is_finite() || !(min..=max).contains(&value) {
        return Err(EngineError::invalid_parameter(
            name,
            format!("must be between {min} and {max}, got {value}"),
        ));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearlyRecord {
    pub year: u32,
    pub balance: f64,
    pub annual_gain: f64,
    pub total_gain: f64,
    pub total_contributed: f64,
    pub total_invested: f64,
    pub market_gains: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BaseCaseSummary {
    pub final_balance: f64,
    pub total_invested: f64,
    pub market_gains: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BaseCaseProjection {
    pub records: Vec<YearlyRecord>,
    pub summary: BaseCaseSummary,
}

// Row-major: path i occupies values[i * years..(i + 1) * years].
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationMatrix {
    paths: usize,
    years: usize,
    values: Vec<f64>,
}

impl SimulationMatrix {
    pub(crate) fn from_row_major(paths: usize, years: usize, values: Vec<f64>) -> Self {
        debug_assert_eq!(values.len(), paths * years);
        Self {
            paths,
            years,
            values,
        }
    }

    pub fn paths(&self) -> usize {
        self.paths
    }

    pub fn years(&self) -> usize {
        self.years
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.paths, self.years)
    }

    pub fn is_degenerate(&self) -> bool {
        self.paths == 0 || self.years == 0
    }

    pub fn row(&self, path: usize) -> &[f64] {
        let start = path * self.years;
        &self.values[start..start + self.years]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        // chunks_exact panics on a zero chunk size
        self.values.chunks_exact(self.years.max(1))
    }

    pub fn get(&self, path: usize, year_index: usize) -> f64 {
        self.values[path * self.years + year_index]
    }

    pub fn column(&self, year_index: usize) -> Vec<f64> {
        self.rows().map(|row| row[year_index]).collect()
    }

    pub fn final_balances(&self) -> Vec<f64> {
        if self.years == 0 {
            return Vec::new();
        }
        self.column(self.years - 1)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PercentileCurve {
    pub percentile: f64,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Probability {
    pub estimate: f64,
    pub ci_half_width: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalBalanceStats {
    pub median: f64,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub std_dev: f64,
    pub p5: f64,
    pub p10: f64,
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
    pub p90: f64,
    pub p95: f64,
    pub probability_of_profit: Probability,
    pub probability_of_doubling: Probability,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatrixSummary {
    pub percentile_curves: Vec<PercentileCurve>,
    pub mean_curve: Vec<f64>,
    pub final_balance: FinalBalanceStats,
}

impl MatrixSummary {
    pub fn curve(&self, percentile: f64) -> Option<&PercentileCurve> {
        self.percentile_curves
            .iter()
            .find(|curve| curve.percentile == percentile)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PercentileTableRow {
    pub year: u32,
    pub p5: f64,
    pub p10: f64,
    pub p25: f64,
    pub p50: f64,
    pub mean: f64,
    pub p75: f64,
    pub p90: f64,
    pub p95: f64,
    pub base_case: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BaseCaseComparison {
    pub statistic: &'static str,
    pub final_balance: f64,
    pub vs_base_case_pct: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    pub parameters: SimulationParameters,
    pub seed: u64,
    pub base_case: BaseCaseProjection,
    pub matrix_summary: MatrixSummary,
    pub percentile_table: Vec<PercentileTableRow>,
    pub histogram: Vec<HistogramBin>,
}

impl Projection {
    pub fn base_case_records(&self) -> &[YearlyRecord] {
        &self.base_case.records
    }
}
