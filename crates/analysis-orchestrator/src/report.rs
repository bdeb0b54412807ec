use analysis_core::{finite, RegimeSnapshot, RunMetadata, ScoreSet, SymbolInfo};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use technical_analysis::{EnrichedSeries, PriceField};

/// Static symbol facts carried into the report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstrumentInfo {
    pub ticker: String,
    pub name: String,
    pub category: String,
    pub benchmark: String,
}

impl From<&SymbolInfo> for InstrumentInfo {
    fn from(info: &SymbolInfo) -> Self {
        Self {
            ticker: info.ticker.clone(),
            name: info.name.clone(),
            category: info.category.clone(),
            benchmark: info.benchmark.clone(),
        }
    }
}

/// Last completed session. Every numeric is finite-or-null.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentBar {
    pub date: Option<NaiveDate>,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub volume: Option<f64>,
    /// One-day percent change
    pub change_pct: Option<f64>,
}

/// Reference price levels derived from the prior day and week
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyLevels {
    pub prev_day_high: Option<f64>,
    pub prev_day_low: Option<f64>,
    pub prev_day_close: Option<f64>,
    pub prev_week_high: Option<f64>,
    pub prev_week_low: Option<f64>,
    pub pivot_point: Option<f64>,
    pub r1: Option<f64>,
    pub r2: Option<f64>,
    pub s1: Option<f64>,
    pub s2: Option<f64>,
}

/// Indicator snapshot for the last row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndicatorSummary {
    pub rsi: Option<f64>,
    pub macd: Option<f64>,
    pub macd_signal: Option<f64>,
    pub macd_hist: Option<f64>,
    pub adx: Option<f64>,
    pub plus_di: Option<f64>,
    pub minus_di: Option<f64>,
    pub atr_pct: Option<f64>,
    pub bb_width: Option<f64>,
    pub bb_pct_b: Option<f64>,
    pub range_position_52w: Option<f64>,
    pub vol_ratio: Option<f64>,
    /// sma_{period} and dist_sma_{period}_pct, keyed by column name
    pub moving_averages: BTreeMap<String, Option<f64>>,
}

/// Everything the report carries for one symbol
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstrumentRecord {
    pub info: InstrumentInfo,
    pub current: CurrentBar,
    pub key_levels: KeyLevels,
    pub indicators: IndicatorSummary,
    pub scores: ScoreSet,
    pub signals: Vec<String>,
}

/// Ranked ticker lists, best first. Volatility ranks ascending so the
/// calmest symbols lead; everything else ranks descending.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Rankings {
    pub by_composite_score: Vec<String>,
    pub by_trend: Vec<String>,
    pub by_momentum: Vec<String>,
    pub by_volatility: Vec<String>,
    pub by_relative_strength: Vec<String>,
}

/// The consolidated output of one analysis run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub metadata: RunMetadata,
    pub market_regime: RegimeSnapshot,
    pub instruments: BTreeMap<String, InstrumentRecord>,
    pub rankings: Rankings,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processed_data: Option<BTreeMap<String, Value>>,
    pub notable_events: Vec<Value>,
}

fn level(series: &EnrichedSeries, name: &str) -> Option<f64> {
    finite(series.last(name))
}

/// Snapshot the last row of an enriched series into the emitted record
/// shapes. NaN never crosses this boundary.
pub fn build_instrument(
    info: &SymbolInfo,
    series: &EnrichedSeries,
    scores: ScoreSet,
    signals: Vec<String>,
) -> InstrumentRecord {
    let current = CurrentBar {
        date: series.last_date(),
        open: finite(series.price_from_end(PriceField::Open, 0)),
        high: finite(series.price_from_end(PriceField::High, 0)),
        low: finite(series.price_from_end(PriceField::Low, 0)),
        close: finite(series.price_from_end(PriceField::Close, 0)),
        volume: finite(series.price_from_end(PriceField::Volume, 0)),
        change_pct: level(series, "ret_1d"),
    };

    let key_levels = KeyLevels {
        prev_day_high: level(series, "prev_day_high"),
        prev_day_low: level(series, "prev_day_low"),
        prev_day_close: level(series, "prev_day_close"),
        prev_week_high: level(series, "prev_week_high"),
        prev_week_low: level(series, "prev_week_low"),
        pivot_point: level(series, "pivot_point"),
        r1: level(series, "r1"),
        r2: level(series, "r2"),
        s1: level(series, "s1"),
        s2: level(series, "s2"),
    };

    let moving_averages = series
        .column_names()
        .filter(|name| name.starts_with("sma_") || name.starts_with("dist_sma_"))
        .map(|name| (name.to_string(), level(series, name)))
        .collect();

    let indicators = IndicatorSummary {
        rsi: level(series, "rsi"),
        macd: level(series, "macd"),
        macd_signal: level(series, "macd_signal"),
        macd_hist: level(series, "macd_hist"),
        adx: level(series, "adx"),
        plus_di: level(series, "plus_di"),
        minus_di: level(series, "minus_di"),
        atr_pct: level(series, "atr_pct"),
        bb_width: level(series, "bb_width"),
        bb_pct_b: level(series, "bb_pct_b"),
        range_position_52w: level(series, "range_position_52w"),
        vol_ratio: level(series, "vol_ratio"),
        moving_averages,
    };

    InstrumentRecord {
        info: info.into(),
        current,
        key_levels,
        indicators,
        scores,
        signals,
    }
}

/// (ticker, scores, universe position) triples ready for ranking
pub type ScoredSymbol = (String, ScoreSet, usize);

fn rank(scored: &[ScoredSymbol], key: fn(&ScoreSet) -> f64, ascending: bool) -> Vec<String> {
    let mut ordered: Vec<&ScoredSymbol> = scored.iter().collect();
    ordered.sort_by(|a, b| {
        let (ka, kb) = (key(&a.1), key(&b.1));
        let primary = if ascending {
            ka.partial_cmp(&kb)
        } else {
            kb.partial_cmp(&ka)
        };
        // Ties fall back to universe declaration order.
        primary
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.2.cmp(&b.2))
    });
    ordered.into_iter().map(|(t, _, _)| t.clone()).collect()
}

/// Rankings across all scored symbols. The caller excludes anything that
/// should not be ranked (the volatility index) before handing symbols in.
pub fn build_rankings(scored: &[ScoredSymbol]) -> Rankings {
    Rankings {
        by_composite_score: rank(scored, |s| s.composite, false),
        by_trend: rank(scored, |s| s.trend, false),
        by_momentum: rank(scored, |s| s.momentum, false),
        by_volatility: rank(scored, |s| s.volatility, true),
        by_relative_strength: rank(scored, |s| s.relative_strength, false),
    }
}

/// First n tickers of a ranking.
pub fn top_n(ranking: &[String], n: usize) -> Vec<String> {
    ranking.iter().take(n).cloned().collect()
}

/// Last n tickers of a ranking, worst last.
pub fn bottom_n(ranking: &[String], n: usize) -> Vec<String> {
    ranking.iter().rev().take(n).rev().cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn score(composite: f64, volatility: f64) -> ScoreSet {
        ScoreSet {
            composite,
            trend: composite,
            momentum: composite,
            volatility,
            relative_strength: composite,
        }
    }

    fn scored() -> Vec<ScoredSymbol> {
        vec![
            ("SPY".to_string(), score(70.0, 30.0), 0),
            ("QQQ".to_string(), score(70.0, 60.0), 1),
            ("IWM".to_string(), score(50.0, 10.0), 2),
        ]
    }

    #[test]
    fn ties_resolve_by_universe_order() {
        let rankings = build_rankings(&scored());
        assert_eq!(rankings.by_composite_score, vec!["SPY", "QQQ", "IWM"]);
    }

    #[test]
    fn tied_leaders_always_precede_lower_scores() {
        let mut symbols = scored();
        symbols.swap(0, 2); // declaration order survives input shuffling
        let rankings = build_rankings(&symbols);
        assert_eq!(rankings.by_composite_score, vec!["SPY", "QQQ", "IWM"]);
    }

    #[test]
    fn volatility_ranks_ascending() {
        let rankings = build_rankings(&scored());
        assert_eq!(rankings.by_volatility, vec!["IWM", "SPY", "QQQ"]);
    }

    #[test]
    fn top_and_bottom_slices() {
        let rankings = build_rankings(&scored());
        assert_eq!(top_n(&rankings.by_composite_score, 2), vec!["SPY", "QQQ"]);
        assert_eq!(bottom_n(&rankings.by_composite_score, 2), vec!["QQQ", "IWM"]);
    }
}
