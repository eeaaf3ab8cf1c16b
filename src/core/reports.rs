use super::error::EngineError;
use super::types::{
    BaseCaseComparison, FinalBalanceStats, HistogramBin, MatrixSummary, PercentileTableRow,
    YearlyRecord,
};

pub const DEFAULT_HISTOGRAM_BINS: usize = 50;

pub fn percentile_table(
    summary: &MatrixSummary,
    base_case: &[YearlyRecord],
) -> Result<Vec<PercentileTableRow>, EngineError> {
    let years = summary.mean_curve.len();
    if base_case.len() != years {
        return Err(EngineError::invalid_input(format!(
            "base case has {} years but the simulation has {years}",
            base_case.len()
        )));
    }

    let curve = |p: f64| curve_values(summary, p, years);
    let (p5, p10, p25, p50) = (curve(5.0)?, curve(10.0)?, curve(25.0)?, curve(50.0)?);
    let (p75, p90, p95) = (curve(75.0)?, curve(90.0)?, curve(95.0)?);

    Ok(base_case
        .iter()
        .enumerate()
        .map(|(i, record)| PercentileTableRow {
            year: record.year,
            p5: p5[i],
            p10: p10[i],
            p25: p25[i],
            p50: p50[i],
            mean: summary.mean_curve[i],
            p75: p75[i],
            p90: p90[i],
            p95: p95[i],
            base_case: record.balance,
        })
        .collect())
}

fn curve_values(summary: &MatrixSummary, p: f64, years: usize) -> Result<&[f64], EngineError> {
    summary
        .curve(p)
        .map(|c| c.values.as_slice())
        .filter(|values| values.len() == years)
        .ok_or_else(|| EngineError::invalid_input(format!("missing p{p} curve")))
}

pub fn compare_to_base_case(
    stats: &FinalBalanceStats,
    base_final_balance: f64,
) -> Result<Vec<BaseCaseComparison>, EngineError> {
    if base_final_balance == 0.0 {
        return Err(EngineError::DivisionUndefined {
            ratio: "difference versus base case",
        });
    }

    let rows = [
        ("base_case", base_final_balance),
        ("p5", stats.p5),
        ("p25", stats.p25),
        ("median", stats.median),
        ("mean", stats.mean),
        ("p75", stats.p75),
        ("p95", stats.p95),
    ];
    Ok(rows
        .into_iter()
        .map(|(statistic, final_balance)| BaseCaseComparison {
            statistic,
            final_balance,
            vs_base_case_pct: (final_balance / base_final_balance - 1.0) * 100.0,
        })
        .collect())
}

// The last bin is closed on the right.
pub fn histogram(values: &[f64], bins: usize) -> Result<Vec<HistogramBin>, EngineError> {
    if values.is_empty() {
        return Err(EngineError::invalid_input("cannot bin an empty distribution"));
    }
    if bins == 0 {
        return Err(EngineError::invalid_input("histogram needs at least one bin"));
    }

    let (mut lo, mut hi) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(*v), hi.max(*v))
        });
    if lo == hi {
        lo -= 0.5;
        hi += 0.5;
    }

    let width = (hi - lo) / bins as f64;
    let mut counts = vec![0u32; bins];
    for value in values {
        let idx = (((value - lo) / width) as usize).min(bins - 1);
        counts[idx] += 1;
    }

    Ok(counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| HistogramBin {
            lower: lo + width * i as f64,
            upper: if i + 1 == bins {
                hi
            } else {
                lo + width * (i + 1) as f64
            },
            count,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::stats::final_balance_stats;
    use crate::core::types::{PERCENTILES, PercentileCurve};

    const EPS: f64 = 1e-9;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn record(year: u32, balance: f64) -> YearlyRecord {
        YearlyRecord {
            year,
            balance,
            annual_gain: 0.0,
            total_gain: 0.0,
            total_contributed: 0.0,
            total_invested: 0.0,
            market_gains: 0.0,
        }
    }

    fn summary_with_years(years: usize) -> MatrixSummary {
        let percentile_curves = PERCENTILES
            .iter()
            .map(|&p| PercentileCurve {
                percentile: p,
                values: (0..years).map(|y| p * 100.0 + y as f64).collect(),
            })
            .collect();
        MatrixSummary {
            percentile_curves,
            mean_curve: (0..years).map(|y| 5_000.0 + y as f64).collect(),
            final_balance: final_balance_stats(&[1.0, 2.0, 3.0], 1.0).expect("stats"),
        }
    }

    #[test]
    fn percentile_table_lines_up_curves_with_base_case() {
        let summary = summary_with_years(2);
        let base = [record(1, 111.0), record(2, 222.0)];

        let table = percentile_table(&summary, &base).expect("matching lengths");
        assert_eq!(table.len(), 2);
        assert_eq!(table[1].year, 2);
        assert_approx(table[1].p5, 501.0);
        assert_approx(table[1].p50, 5_001.0);
        assert_approx(table[1].p95, 9_501.0);
        assert_approx(table[1].mean, 5_001.0);
        assert_approx(table[1].base_case, 222.0);
    }

    #[test]
    fn percentile_table_rejects_mismatched_lengths() {
        let summary = summary_with_years(3);
        let base = [record(1, 1.0)];
        assert!(matches!(
            percentile_table(&summary, &base),
            Err(EngineError::InvalidInput { .. })
        ));
    }

    #[test]
    fn comparison_reports_percentage_versus_base_case() {
        let stats = final_balance_stats(&[50.0, 100.0, 150.0], 10.0).expect("stats");
        let rows = compare_to_base_case(&stats, 100.0).expect("non-zero base");

        assert_eq!(rows.len(), 7);
        assert_eq!(rows[0].statistic, "base_case");
        assert_approx(rows[0].final_balance, 100.0);
        assert_eq!(rows[0].vs_base_case_pct, 0.0);
        let median = rows.iter().find(|r| r.statistic == "median").expect("median");
        assert_approx(median.final_balance, 100.0);
        assert_approx(median.vs_base_case_pct, 0.0);
        let p5 = rows.iter().find(|r| r.statistic == "p5").expect("p5");
        assert_approx(p5.final_balance, 55.0);
        assert_approx(p5.vs_base_case_pct, -45.0);
    }

    #[test]
    fn comparison_against_zero_base_case_is_undefined() {
        let stats = final_balance_stats(&[0.0, 1.0], 0.0).expect("stats");
        assert_eq!(
            compare_to_base_case(&stats, 0.0),
            Err(EngineError::DivisionUndefined {
                ratio: "difference versus base case"
            })
        );
    }

    #[test]
    fn histogram_counts_every_value_once() {
        let values: Vec<f64> = (0..=100).map(f64::from).collect();
        let bins = histogram(&values, 10).expect("non-empty");

        assert_eq!(bins.len(), 10);
        assert_eq!(bins.iter().map(|b| b.count).sum::<u32>(), 101);
        assert_approx(bins[0].lower, 0.0);
        assert_approx(bins[0].upper, 10.0);
        assert_eq!(bins[0].count, 10);
        assert_eq!(bins[9].count, 11);
        assert_approx(bins[9].upper, 100.0);
    }

    #[test]
    fn histogram_of_constant_values_widens_range() {
        let bins = histogram(&[0.0, 0.0, 0.0], 2).expect("non-empty");
        assert_approx(bins[0].lower, -0.5);
        assert_approx(bins[1].upper, 0.5);
        assert_eq!(bins[0].count, 0);
        assert_eq!(bins[1].count, 3);
    }

    #[test]
    fn histogram_rejects_empty_input_and_zero_bins() {
        assert!(matches!(
            histogram(&[], 10),
            Err(EngineError::InvalidInput { .. })
        ));
        assert!(matches!(
            histogram(&[1.0], 0),
            Err(EngineError::InvalidInput { .. })
        ));
    }
}
