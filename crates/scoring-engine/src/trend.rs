use analysis_core::{finite_or, AnalysisConfig};
use technical_analysis::EnrichedSeries;

use crate::normalize_linear;

const W_SMA_POSITIONING: f64 = 0.30;
const W_ADX_DIRECTION: f64 = 0.25;
const W_ROC: f64 = 0.25;
const W_PATTERN: f64 = 0.20;

/// Share of configured moving averages the close sits above, as [0, 100].
/// An undefined average counts as not exceeded.
fn sma_positioning(series: &EnrichedSeries, config: &AnalysisConfig) -> f64 {
    if config.sma_periods.is_empty() {
        return 50.0;
    }
    let close = series.last_close();
    let above = config
        .sma_periods
        .iter()
        .filter(|&&p| {
            let sma = series.last(&format!("sma_{p}"));
            sma.is_finite() && close > sma
        })
        .count();
    above as f64 / config.sma_periods.len() as f64 * 100.0
}

/// Trend-strength leg: ADX magnitude signed by the DI spread, re-centered
/// on 50. Missing values read as a directionless ADX of 20.
fn adx_direction(series: &EnrichedSeries) -> f64 {
    let adx = finite_or(series.last("adx"), 20.0);
    let plus_di = finite_or(series.last("plus_di"), 50.0);
    let minus_di = finite_or(series.last("minus_di"), 50.0);

    let direction = if plus_di > minus_di {
        1.0
    } else if plus_di < minus_di {
        -1.0
    } else {
        0.0
    };
    (50.0 + (adx.min(50.0) - 25.0) * 2.0 * direction).clamp(0.0, 100.0)
}

/// Breakout ladder over yesterday's and last week's levels; the first match
/// wins, ordered most-bearish to most-bullish so the strongest state sticks.
fn pattern_score(series: &EnrichedSeries) -> f64 {
    let close = series.last_close();
    let prev_week_low = series.last("prev_week_low");
    let prev_day_low = series.last("prev_day_low");
    let prev_week_high = series.last("prev_week_high");
    let prev_day_high = series.last("prev_day_high");
    let pivot = series.last("pivot_point");

    if close < prev_week_low {
        0.0
    } else if close < prev_day_low {
        25.0
    } else if close > prev_week_high {
        100.0
    } else if close > prev_day_high {
        75.0
    } else if close > pivot {
        60.0
    } else {
        50.0
    }
}

/// Trend factor: SMA positioning, ADX direction, 20-day rate of change and
/// the level-breakout pattern.
pub fn trend_score(series: &EnrichedSeries, config: &AnalysisConfig) -> f64 {
    let roc_period = config.roc_periods.get(1).copied().unwrap_or(20);
    let roc = finite_or(series.last(&format!("roc_{roc_period}")), 0.0);

    let score = W_SMA_POSITIONING * sma_positioning(series, config)
        + W_ADX_DIRECTION * adx_direction(series)
        + W_ROC * normalize_linear(roc, -20.0, 20.0)
        + W_PATTERN * pattern_score(series);
    score.clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;

    #[test]
    fn sma_positioning_is_full_in_runaway_uptrend() {
        let series = runaway_uptrend();
        let config = AnalysisConfig::default();
        assert!((sma_positioning(&series, &config) - 100.0).abs() < 1e-9);
    }

    #[test]
    fn adx_direction_neutral_when_missing() {
        // 10 bars leave the DI columns finite but the pattern of a fresh
        // series keeps ADX shallow; force the missing-value path instead.
        let series = enriched(&[100.0, 101.0]);
        let leg = adx_direction(&series);
        assert!((0.0..=100.0).contains(&leg));
    }

    #[test]
    fn pattern_ladder_most_bearish_first() {
        // A crash through last week's low must win over the day-level tests.
        let mut closes: Vec<f64> = (0..60).map(|i| 100.0 + i as f64 * 0.1).collect();
        closes[59] = 50.0;
        let series = enriched(&closes);
        assert!((pattern_score(&series) - 0.0).abs() < 1e-9);
    }

    #[test]
    fn pattern_breakout_above_week_high() {
        let mut closes: Vec<f64> = (0..60).map(|i| 100.0 + i as f64 * 0.1).collect();
        closes[59] = 200.0;
        let series = enriched(&closes);
        assert!((pattern_score(&series) - 100.0).abs() < 1e-9);
    }

    #[test]
    fn trend_score_saturates_on_runaway_uptrend() {
        let series = runaway_uptrend();
        let config = AnalysisConfig::default();
        assert!((trend_score(&series, &config) - 100.0).abs() < 1e-9);
    }

    #[test]
    fn trend_score_is_low_in_runaway_downtrend() {
        let closes: Vec<f64> = (0..260).map(|i| 1000.0 * 0.99_f64.powi(i)).collect();
        let series = enriched(&closes);
        let config = AnalysisConfig::default();
        let score = trend_score(&series, &config);
        assert!(score < 15.0, "downtrend scored {score}");
    }
}
