use analysis_core::{
    AnalysisConfig, MarketCondition, RegimeSnapshot, RiskAppetite, SpyTrend, VixRegime,
};
use technical_analysis::EnrichedSeries;

/// Rule-based market regime classifier over the two reference series: the
/// volatility index sets the risk band, the broad-market equity sets the
/// trend leg, and a small decision table combines them.
pub struct RegimeClassifier {
    vix_low: f64,
    vix_medium: f64,
}

impl RegimeClassifier {
    pub fn new(config: &AnalysisConfig) -> Self {
        Self {
            vix_low: config.vix_low,
            vix_medium: config.vix_medium,
        }
    }

    fn vix_regime(&self, vix_level: f64) -> VixRegime {
        if vix_level < self.vix_low {
            VixRegime::Low
        } else if vix_level < self.vix_medium {
            VixRegime::Medium
        } else {
            VixRegime::High
        }
    }

    fn risk_appetite(regime: VixRegime) -> RiskAppetite {
        match regime {
            VixRegime::Low => RiskAppetite::RiskOn,
            VixRegime::Medium | VixRegime::Unknown => RiskAppetite::Neutral,
            VixRegime::High => RiskAppetite::RiskOff,
        }
    }

    fn market_condition(vix: VixRegime, trend: SpyTrend) -> MarketCondition {
        match (vix, trend) {
            (VixRegime::Low, SpyTrend::Uptrend) => MarketCondition::Bullish,
            (VixRegime::High, SpyTrend::Downtrend) => MarketCondition::Bearish,
            (VixRegime::High, SpyTrend::Uptrend) => MarketCondition::VolatileBullish,
            (VixRegime::Low, SpyTrend::Downtrend) => MarketCondition::QuietBearish,
            (VixRegime::Unknown, _) | (_, SpyTrend::Unknown) => MarketCondition::Unknown,
            _ => MarketCondition::Neutral,
        }
    }

    /// Classify from the enriched reference series. A missing series leaves
    /// its side of the snapshot unknown without failing the run.
    pub fn classify(
        &self,
        vix: Option<&EnrichedSeries>,
        broad_market: Option<&EnrichedSeries>,
    ) -> RegimeSnapshot {
        let vix_level = vix
            .map(|s| s.last_close())
            .filter(|v| v.is_finite());
        let vix_regime = vix_level.map_or(VixRegime::Unknown, |level| self.vix_regime(level));

        let spy_above_sma200 = broad_market.and_then(|s| {
            let close = s.last_close();
            let sma200 = s.last("sma_200");
            if close.is_finite() && sma200.is_finite() {
                Some(close > sma200)
            } else {
                None
            }
        });
        let spy_trend = match spy_above_sma200 {
            Some(true) => SpyTrend::Uptrend,
            Some(false) => SpyTrend::Downtrend,
            None => SpyTrend::Unknown,
        };

        let market_condition = Self::market_condition(vix_regime, spy_trend);
        let snapshot = RegimeSnapshot {
            vix_level,
            vix_regime,
            spy_above_sma200,
            spy_trend,
            market_condition,
            risk_appetite: Self::risk_appetite(vix_regime),
        };
        tracing::info!(
            vix_level = ?snapshot.vix_level,
            condition = snapshot.market_condition.name(),
            "market regime classified"
        );
        snapshot
    }
}
