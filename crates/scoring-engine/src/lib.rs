use analysis_core::{AnalysisConfig, ScoreSet};
use std::sync::Arc;
use technical_analysis::EnrichedSeries;

pub mod momentum;
pub mod relative_strength;
pub mod trend;
pub mod volatility;

pub use momentum::momentum_score;
pub use relative_strength::relative_strength_score;
pub use trend::trend_score;
pub use volatility::volatility_score;

/// Map `value` from [lo, hi] onto [0, 100], clamped.
pub(crate) fn normalize_linear(value: f64, lo: f64, hi: f64) -> f64 {
    ((value - lo) / (hi - lo) * 100.0).clamp(0.0, 100.0)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Four-factor scoring engine. Sub-scores land in [0, 100]; the volatility
/// factor stays "high = risky" and is inverted exactly once, inside the
/// composite.
pub struct ScoringEngine {
    config: Arc<AnalysisConfig>,
}

impl ScoringEngine {
    pub fn new(config: Arc<AnalysisConfig>) -> Self {
        Self { config }
    }

    /// Score one symbol against its (already enriched) benchmark series.
    pub fn score(
        &self,
        ticker: &str,
        series: &EnrichedSeries,
        benchmark_ticker: &str,
        benchmark: Option<&EnrichedSeries>,
    ) -> ScoreSet {
        let trend = round2(trend_score(series, &self.config));
        let momentum = round2(momentum_score(series, &self.config));
        let volatility = round2(volatility_score(series, &self.config));
        let relative_strength = round2(relative_strength_score(
            ticker,
            series,
            benchmark_ticker,
            benchmark,
        ));

        let w = &self.config.weights;
        let composite = w.trend * trend
            + w.momentum * momentum
            + w.volatility * (100.0 - volatility)
            + w.rel_strength * relative_strength;
        let composite = round2(composite.clamp(0.0, 100.0));

        tracing::debug!(
            ticker,
            trend,
            momentum,
            volatility,
            relative_strength,
            composite,
            "scored"
        );

        ScoreSet {
            composite,
            trend,
            momentum,
            volatility,
            relative_strength,
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use analysis_core::{AnalysisConfig, Bar};
    use chrono::NaiveDate;
    use technical_analysis::{compute_all, EnrichedSeries};

    pub fn bars_from_closes(closes: &[f64]) -> Vec<Bar> {
        let start = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| Bar {
                date: start + chrono::Duration::days(i as i64),
                open: close,
                high: close * 1.001,
                low: close * 0.999,
                close,
                adj_close: Some(close),
                volume: 1_000_000.0,
            })
            .collect()
    }

    pub fn enriched(closes: &[f64]) -> EnrichedSeries {
        let config = AnalysisConfig::default();
        compute_all(&bars_from_closes(closes), &config).unwrap()
    }

    /// 260 bars of steady 1%/day growth: every trend and momentum leg
    /// saturates.
    pub fn runaway_uptrend() -> EnrichedSeries {
        let closes: Vec<f64> = (0..260).map(|i| 100.0 * 1.01_f64.powi(i)).collect();
        enriched(&closes)
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    fn engine() -> ScoringEngine {
        ScoringEngine::new(Arc::new(AnalysisConfig::default()))
    }

    #[test]
    fn runaway_uptrend_saturates_trend_and_momentum() {
        let series = runaway_uptrend();
        let scores = engine().score("QQQ", &series, "QQQ", None);
        assert!((scores.trend - 100.0).abs() < 1e-9);
        assert!((scores.momentum - 100.0).abs() < 1e-9);
        // Self-benchmark pins relative strength at neutral.
        assert!((scores.relative_strength - 50.0).abs() < 1e-9);
        assert!(scores.composite >= 70.0);
    }

    #[test]
    fn every_score_is_bounded() {
        let closes: Vec<f64> = (0..300)
            .map(|i| 100.0 + (i as f64 * 0.21).sin() * 12.0)
            .collect();
        let series = enriched(&closes);
        let scores = engine().score("SPY", &series, "SPY", None);
        for s in [
            scores.composite,
            scores.trend,
            scores.momentum,
            scores.volatility,
            scores.relative_strength,
        ] {
            assert!((0.0..=100.0).contains(&s), "score out of bounds: {s}");
        }
    }

    #[test]
    fn composite_honors_weight_identity() {
        let closes: Vec<f64> = (0..300)
            .map(|i| 100.0 + i as f64 * 0.2 + (i as f64 * 0.4).sin() * 4.0)
            .collect();
        let series = enriched(&closes);
        let scores = engine().score("IWM", &series, "IWM", None);
        let expected = 0.30 * scores.trend
            + 0.30 * scores.momentum
            + 0.15 * (100.0 - scores.volatility)
            + 0.25 * scores.relative_strength;
        assert!((scores.composite - expected).abs() <= 0.01);
    }

    #[test]
    fn short_series_scores_with_neutral_defaults() {
        let closes: Vec<f64> = (0..10).map(|i| 100.0 + i as f64).collect();
        let series = enriched(&closes);
        let scores = engine().score("GLD", &series, "GLD", None);
        for s in [scores.trend, scores.momentum, scores.volatility] {
            assert!((0.0..=100.0).contains(&s));
        }
        // Undefined percentile ranks fall back to 50 inside momentum.
        assert!(scores.momentum >= 35.0);
    }

    #[test]
    fn volatility_inversion_happens_only_in_composite() {
        // A series that turns wild near the end: risky, so the volatility
        // sub-score is HIGH while the composite gets dragged DOWN through
        // the single (100 - volatility) term.
        let mut closes: Vec<f64> = (0..280).map(|_| 100.0).collect();
        for i in 230..280 {
            closes[i] = 100.0 + ((i * 7919) % 13) as f64 - 6.0;
        }
        let series = enriched(&closes);
        let scores = engine().score("USO", &series, "USO", None);
        assert!(scores.volatility > 50.0, "late turbulence must read risky");
    }
}
