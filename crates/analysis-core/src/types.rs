use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Daily OHLCV bar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub adj_close: Option<f64>,
    pub volume: f64,
}

impl Bar {
    /// OHLC consistency check: positive prices, high/low envelope intact.
    pub fn is_well_formed(&self) -> bool {
        let prices_positive =
            self.open > 0.0 && self.high > 0.0 && self.low > 0.0 && self.close > 0.0;
        let envelope = self.high >= self.open.max(self.close).max(self.low)
            && self.low <= self.open.min(self.close).min(self.high);
        prices_positive && envelope && self.volume >= 0.0
    }
}

/// Four-factor score set, every component in [0, 100]
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScoreSet {
    pub composite: f64,
    pub trend: f64,
    pub momentum: f64,
    pub volatility: f64,
    pub relative_strength: f64,
}

impl ScoreSet {
    /// Neutral placeholder when a symbol could not be scored.
    pub fn neutral() -> Self {
        Self {
            composite: 50.0,
            trend: 50.0,
            momentum: 50.0,
            volatility: 50.0,
            relative_strength: 50.0,
        }
    }
}

/// VIX level band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VixRegime {
    Low,
    Medium,
    High,
    Unknown,
}

impl VixRegime {
    pub fn name(&self) -> &'static str {
        match self {
            VixRegime::Low => "low",
            VixRegime::Medium => "medium",
            VixRegime::High => "high",
            VixRegime::Unknown => "unknown",
        }
    }
}

/// Broad-market trend direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpyTrend {
    Uptrend,
    Downtrend,
    Unknown,
}

/// Aggregate market condition from the VIX/SPY decision table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketCondition {
    Bullish,
    Bearish,
    VolatileBullish,
    QuietBearish,
    Neutral,
    Unknown,
}

impl MarketCondition {
    pub fn name(&self) -> &'static str {
        match self {
            MarketCondition::Bullish => "bullish",
            MarketCondition::Bearish => "bearish",
            MarketCondition::VolatileBullish => "volatile_bullish",
            MarketCondition::QuietBearish => "quiet_bearish",
            MarketCondition::Neutral => "neutral",
            MarketCondition::Unknown => "unknown",
        }
    }
}

/// Risk appetite, mapped 1:1 from the VIX regime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskAppetite {
    #[serde(rename = "risk-on")]
    RiskOn,
    #[serde(rename = "neutral")]
    Neutral,
    #[serde(rename = "risk-off")]
    RiskOff,
}

/// Market regime snapshot emitted with every run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegimeSnapshot {
    pub vix_level: Option<f64>,
    pub vix_regime: VixRegime,
    pub spy_above_sma200: Option<bool>,
    pub spy_trend: SpyTrend,
    pub market_condition: MarketCondition,
    pub risk_appetite: RiskAppetite,
}

impl RegimeSnapshot {
    /// Snapshot with every field unknown, used when reference series are missing.
    pub fn unknown() -> Self {
        Self {
            vix_level: None,
            vix_regime: VixRegime::Unknown,
            spy_above_sma200: None,
            spy_trend: SpyTrend::Unknown,
            market_condition: MarketCondition::Unknown,
            risk_appetite: RiskAppetite::Neutral,
        }
    }
}

/// Run metadata attached to the analysis result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMetadata {
    pub analysis_date: NaiveDate,
    pub generated_at: DateTime<Utc>,
    pub version: String,
    pub instruments_analyzed: usize,
    pub date_range: DateRange,
    #[serde(default)]
    pub failed_symbols: Vec<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Return val if it is finite, otherwise None. Keeps NaN/Infinity out of
/// serialized output.
#[inline]
pub fn finite(val: f64) -> Option<f64> {
    if val.is_finite() {
        Some(val)
    } else {
        None
    }
}

/// Return val if it is finite, otherwise the default.
#[inline]
pub fn finite_or(val: f64, default: f64) -> f64 {
    if val.is_finite() {
        val
    } else {
        default
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(open: f64, high: f64, low: f64, close: f64) -> Bar {
        Bar {
            date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            open,
            high,
            low,
            close,
            adj_close: None,
            volume: 1_000.0,
        }
    }

    #[test]
    fn well_formed_bar_passes() {
        assert!(bar(100.0, 102.0, 99.0, 101.0).is_well_formed());
    }

    #[test]
    fn inverted_envelope_fails() {
        assert!(!bar(100.0, 99.5, 99.0, 101.0).is_well_formed());
        assert!(!bar(100.0, 102.0, 100.5, 101.0).is_well_formed());
    }

    #[test]
    fn non_positive_price_fails() {
        assert!(!bar(0.0, 102.0, 99.0, 101.0).is_well_formed());
        assert!(!bar(100.0, 102.0, -1.0, 101.0).is_well_formed());
    }

    #[test]
    fn finite_filters_nan_and_infinity() {
        assert_eq!(finite(1.5), Some(1.5));
        assert_eq!(finite(f64::NAN), None);
        assert_eq!(finite(f64::INFINITY), None);
        assert_eq!(finite_or(f64::NAN, 50.0), 50.0);
    }
}
