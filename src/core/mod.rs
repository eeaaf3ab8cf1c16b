mod engine;
mod error;
mod projector;
mod reports;
mod simulator;
mod stats;
mod types;

pub use engine::{ComputeOptions, compute, compute_with_options};
pub use error::EngineError;
pub use projector::project_base_case;
pub use reports::{DEFAULT_HISTOGRAM_BINS, compare_to_base_case, histogram, percentile_table};
pub use simulator::{derive_path_seed, simulate};
pub use stats::{aggregate, binomial_ci_half_width, final_balance_stats, percentile};
pub use types::{
    BaseCaseComparison, BaseCaseProjection, BaseCaseSummary, FinalBalanceStats, HistogramBin,
    MatrixSummary, PERCENTILES, PercentileCurve, PercentileTableRow, Probability, Projection,
    SimulationMatrix, SimulationParameters, YearlyRecord,
};
