use super::error::EngineError;
use super::types::{BaseCaseProjection, BaseCaseSummary, SimulationParameters, YearlyRecord};

pub fn project_base_case(params: &SimulationParameters) -> BaseCaseProjection {
    let rate = params.mean_return();
    let mut balance = params.initial_balance;
    let mut total_contributed = 0.0;
    let mut total_invested = params.initial_balance;
    let mut records = Vec::with_capacity(params.years as usize);

    for year in 1..=params.years {
        balance += params.annual_contribution;
        let new_balance = balance * (1.0 + rate);
        let annual_gain = new_balance - balance;
        total_contributed += params.annual_contribution;
        total_invested = params.initial_balance + total_contributed;
        let total_gain = new_balance - total_invested;

        records.push(YearlyRecord {
            year,
            balance: round_cents(new_balance),
            annual_gain: round_cents(annual_gain),
            total_gain: round_cents(total_gain),
            total_contributed: round_cents(total_contributed),
            total_invested: round_cents(total_invested),
            market_gains: round_cents(total_gain),
        });

        balance = new_balance;
    }

    BaseCaseProjection {
        records,
        summary: BaseCaseSummary {
            final_balance: balance,
            total_invested,
            market_gains: balance - total_invested,
        },
    }
}

impl BaseCaseSummary {
    pub fn total_return_pct(&self) -> Result<f64, EngineError> {
        if self.total_invested == 0.0 {
            return Err(EngineError::DivisionUndefined {
                ratio: "total return percentage",
            });
        }
        Ok(self.market_gains / self.total_invested * 100.0)
    }
}

/// Rounds to two decimals on the exact binary value, ties to even.
pub(crate) fn round_cents(value: f64) -> f64 {
    format!("{value:.2}").parse().unwrap_or(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::{prop_assert, prop_assert_eq, proptest};

    const EPS: f64 = 1e-9;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn sample_params() -> SimulationParameters {
        SimulationParameters {
            initial_balance: 10_000.0,
            annual_return_pct: 7.0,
            years: 10,
            annual_contribution: 2_000.0,
            volatility_pct: 15.0,
            simulation_count: 500,
        }
    }

    #[test]
    fn first_year_adds_contribution_before_growth() {
        let projection = project_base_case(&sample_params());
        let first = projection.records[0];

        assert_eq!(first.year, 1);
        assert_approx(first.balance, 12_840.0);
        assert_approx(first.annual_gain, 840.0);
        assert_approx(first.total_gain, 840.0);
        assert_approx(first.total_contributed, 2_000.0);
        assert_approx(first.total_invested, 12_000.0);
        assert_approx(first.market_gains, first.total_gain);
    }

    #[test]
    fn ten_year_reference_trajectory_matches_rounded_snapshots() {
        let projection = project_base_case(&sample_params());
        let expected = [
            (12_840.0, 840.0, 840.0),
            (15_878.8, 1_038.8, 1_878.8),
            (19_130.32, 1_251.52, 3_130.32),
            (22_609.44, 1_479.12, 4_609.44),
            (26_332.1, 1_722.66, 6_332.1),
            (30_315.35, 1_983.25, 8_315.35),
            (34_577.42, 2_262.07, 10_577.42),
            (39_137.84, 2_560.42, 13_137.84),
            (44_017.49, 2_879.65, 16_017.49),
            (49_238.71, 3_221.22, 19_238.71),
        ];

        assert_eq!(projection.records.len(), expected.len());
        for (record, (balance, annual_gain, total_gain)) in
            projection.records.iter().zip(expected)
        {
            assert_eq!(record.balance, balance, "year {}", record.year);
            assert_eq!(record.annual_gain, annual_gain, "year {}", record.year);
            assert_eq!(record.total_gain, total_gain, "year {}", record.year);
        }

        let summary = projection.summary;
        assert_approx(summary.final_balance, 49_238.712_210_033_82);
        assert_approx(summary.total_invested, 30_000.0);
        assert_approx(summary.market_gains, 19_238.712_210_033_82);
    }

    #[test]
    fn total_return_pct_uses_unrounded_summary() {
        let projection = project_base_case(&sample_params());
        let pct = projection.summary.total_return_pct().expect("divisor is non-zero");
        assert_approx(pct, 19_238.712_210_033_82 / 30_000.0 * 100.0);
    }

    #[test]
    fn total_return_pct_is_undefined_without_money_in() {
        let mut params = sample_params();
        params.initial_balance = 0.0;
        params.annual_contribution = 0.0;

        let projection = project_base_case(&params);
        assert!(projection.records.iter().all(|r| r.balance == 0.0));
        assert_eq!(
            projection.summary.total_return_pct(),
            Err(EngineError::DivisionUndefined {
                ratio: "total return percentage"
            })
        );
    }

    #[test]
    fn zero_return_only_accumulates_contributions() {
        let mut params = sample_params();
        params.annual_return_pct = 0.0;

        let projection = project_base_case(&params);
        for record in &projection.records {
            assert_approx(record.annual_gain, 0.0);
            assert_approx(record.total_gain, 0.0);
            assert_approx(record.balance, record.total_invested);
        }
    }

    #[test]
    fn round_cents_resolves_ties_on_the_binary_value() {
        assert_eq!(round_cents(2.675), 2.67);
        assert_eq!(round_cents(0.125), 0.12);
        assert_eq!(round_cents(0.375), 0.38);
        assert_eq!(round_cents(1_234.5), 1_234.5);
        assert_eq!(round_cents(-1.005), -1.0);
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(64))]

        #[test]
        fn prop_records_are_sequential_and_invest_every_contribution(
            initial in 0u32..1_000_000,
            return_bp in 0u32..10_001,
            years in 1u32..51,
            contribution in 0u32..100_000
        ) {
            let params = SimulationParameters {
                initial_balance: initial as f64,
                annual_return_pct: return_bp as f64 / 100.0,
                years,
                annual_contribution: contribution as f64,
                volatility_pct: 15.0,
                simulation_count: 100,
            };
            let projection = project_base_case(&params);

            prop_assert_eq!(projection.records.len(), years as usize);
            for (idx, record) in projection.records.iter().enumerate() {
                prop_assert_eq!(record.year, idx as u32 + 1);
            }

            let last = projection.records[projection.records.len() - 1];
            let expected_invested = initial as f64 + years as f64 * contribution as f64;
            prop_assert!((last.total_invested - expected_invested).abs() <= 1e-6);

            for pair in projection.records.windows(2) {
                prop_assert!(pair[1].balance >= pair[0].balance);
            }
        }
    }
}
