use analysis_core::{finite_or, AnalysisConfig};
use technical_analysis::{column_percentile_rank, EnrichedSeries};

use crate::normalize_linear;

const W_RSI: f64 = 0.35;
const W_MACD_PERCENTILE: f64 = 0.35;
const W_ROC_COMPOSITE: f64 = 0.30;

/// Blend weights for the short/medium/long rate-of-change horizons.
const ROC_BLEND: [f64; 3] = [0.5, 0.3, 0.2];

/// Position of the latest MACD histogram value inside its trailing year of
/// history. A relative-position read, deliberately not a crossover test.
fn macd_histogram_percentile(series: &EnrichedSeries) -> f64 {
    let ranks = column_percentile_rank(series, "macd_hist");
    finite_or(ranks.last().copied().unwrap_or(f64::NAN), 50.0)
}

fn roc_composite(series: &EnrichedSeries, config: &AnalysisConfig) -> f64 {
    let blended: f64 = config
        .roc_periods
        .iter()
        .zip(ROC_BLEND.iter())
        .map(|(&period, &weight)| weight * finite_or(series.last(&format!("roc_{period}")), 0.0))
        .sum();
    normalize_linear(blended, -20.0, 20.0)
}

/// Momentum factor: RSI level, MACD histogram percentile and the blended
/// rate of change.
pub fn momentum_score(series: &EnrichedSeries, config: &AnalysisConfig) -> f64 {
    let rsi = finite_or(series.last("rsi"), 50.0).clamp(0.0, 100.0);

    let score = W_RSI * rsi
        + W_MACD_PERCENTILE * macd_histogram_percentile(series)
        + W_ROC_COMPOSITE * roc_composite(series, config);
    score.clamp(0.0, 100.0)
}
