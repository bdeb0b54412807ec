use analysis_core::finite_or;
use technical_analysis::{
    pct_change, rolling_percentile_rank, EnrichedSeries, PERCENTILE_MIN_PERIODS, PERCENTILE_WINDOW,
};

/// Aligned rows required before relative strength means anything.
const MIN_ALIGNED_ROWS: usize = 50;

/// Horizon (rows) for the ratio-momentum kicker.
const RS_MOMENTUM_PERIOD: usize = 10;

/// Inner-join two series on date and return the paired closes.
fn aligned_closes(series: &EnrichedSeries, benchmark: &EnrichedSeries) -> Vec<(f64, f64)> {
    let mut out = Vec::new();
    let (mut i, mut j) = (0usize, 0usize);
    let (dates_a, dates_b) = (series.dates(), benchmark.dates());
    while i < dates_a.len() && j < dates_b.len() {
        match dates_a[i].cmp(&dates_b[j]) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                out.push((series.close()[i], benchmark.close()[j]));
                i += 1;
                j += 1;
            }
        }
    }
    out
}

/// Relative-strength factor: percentile rank of the price ratio against the
/// benchmark plus a short momentum kicker on that ratio. Neutral 50 whenever
/// the benchmark is the symbol itself, missing, or barely overlapping.
pub fn relative_strength_score(
    ticker: &str,
    series: &EnrichedSeries,
    benchmark_ticker: &str,
    benchmark: Option<&EnrichedSeries>,
) -> f64 {
    if ticker == benchmark_ticker {
        return 50.0;
    }
    let Some(benchmark) = benchmark else {
        return 50.0;
    };

    let pairs = aligned_closes(series, benchmark);
    if pairs.len() < MIN_ALIGNED_ROWS {
        tracing::debug!(
            ticker,
            benchmark_ticker,
            aligned = pairs.len(),
            "too little overlap for relative strength"
        );
        return 50.0;
    }

    let rs_ratio: Vec<f64> = pairs
        .iter()
        .map(|(own, bench)| if *bench != 0.0 { own / bench } else { f64::NAN })
        .collect();

    let ranks = rolling_percentile_rank(&rs_ratio, PERCENTILE_WINDOW, PERCENTILE_MIN_PERIODS);
    let rs_rank = finite_or(ranks.last().copied().unwrap_or(f64::NAN), 50.0);

    let momentum = pct_change(&rs_ratio, RS_MOMENTUM_PERIOD);
    let rs_momentum = finite_or(momentum.last().copied().unwrap_or(f64::NAN), 0.0);

    (rs_rank + 100.0 * rs_momentum * 0.5).clamp(0.0, 100.0)
}
