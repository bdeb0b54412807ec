use analysis_core::{AnalysisConfig, AnalysisError, Bar};

use crate::indicators::*;
use crate::rolling::*;
use crate::series::EnrichedSeries;

/// Window for every rolling percentile rank used by scoring.
pub const PERCENTILE_WINDOW: usize = 252;
/// Observations required before a percentile rank is defined.
pub const PERCENTILE_MIN_PERIODS: usize = 50;

/// Fixed return horizons emitted as ret_{n}d columns.
const RETURN_PERIODS: [usize; 4] = [1, 5, 21, 63];

/// Derive the full indicator column set from raw bars. Pure and
/// deterministic: the output depends on nothing but `bars` and `config`,
/// and no derived value at row i reads rows beyond i.
pub fn compute_all(bars: &[Bar], config: &AnalysisConfig) -> Result<EnrichedSeries, AnalysisError> {
    if bars.is_empty() {
        return Err(AnalysisError::Insufficient(
            "no bars to compute indicators on".to_string(),
        ));
    }

    let mut series = EnrichedSeries::from_bars(bars);
    let close = series.close().to_vec();
    let high = series.high().to_vec();
    let low = series.low().to_vec();
    let volume = series.volume().to_vec();

    // T-1 price levels and floor-trader pivots
    let levels = price_levels(&high, &low, &close);
    series.insert("prev_day_high", levels.prev_day_high);
    series.insert("prev_day_low", levels.prev_day_low);
    series.insert("prev_day_close", levels.prev_day_close);
    series.insert("prev_day_range_pct", levels.prev_day_range_pct);
    series.insert("prev_week_high", levels.prev_week_high);
    series.insert("prev_week_low", levels.prev_week_low);
    series.insert("weekly_return_pct", levels.weekly_return_pct);
    series.insert("pivot_point", levels.pivot_point);
    series.insert("r1", levels.r1);
    series.insert("r2", levels.r2);
    series.insert("s1", levels.s1);
    series.insert("s2", levels.s2);

    // Moving averages. The 125 slot is a mean-minus-median oscillator, not a
    // plain average; its sign is what the trend model consumes.
    for &period in &config.sma_periods {
        let values = if period == 125 {
            sma_oscillator(&close, 125, 126)
        } else {
            sma(&close, period)
        };
        let dist: Vec<f64> = close
            .iter()
            .zip(values.iter())
            .map(|(&c, &s)| {
                if s.is_finite() && s != 0.0 {
                    100.0 * (c - s) / s
                } else {
                    f64::NAN
                }
            })
            .collect();
        series.insert(format!("sma_{period}"), values);
        series.insert(format!("dist_sma_{period}_pct"), dist);
    }

    // Momentum
    series.insert("rsi", rsi(&close, config.rsi_period));

    let macd_result = macd(&close, config.macd_fast, config.macd_slow, config.macd_signal);
    series.insert("macd_cross", macd_crossover(&macd_result.histogram));
    series.insert("macd", macd_result.macd);
    series.insert("macd_signal", macd_result.signal);
    series.insert("macd_hist", macd_result.histogram);

    let adx_result = adx(&high, &low, &close, config.adx_period);
    series.insert("adx", adx_result.adx);
    series.insert("plus_di", adx_result.plus_di);
    series.insert("minus_di", adx_result.minus_di);

    for &period in &config.roc_periods {
        series.insert(format!("roc_{period}"), roc(&close, period));
    }

    // Volatility
    let atr_values = atr(&high, &low, &close, config.atr_period);
    let atr_pct: Vec<f64> = atr_values
        .iter()
        .zip(close.iter())
        .map(|(&a, &c)| {
            if a.is_finite() && c != 0.0 {
                100.0 * a / c
            } else {
                f64::NAN
            }
        })
        .collect();
    series.insert("atr", atr_values);
    series.insert("atr_pct", atr_pct);

    let bb = bollinger(&close, config.bb_period, config.bb_std);
    series.insert("bb_upper", bb.upper);
    series.insert("bb_middle", bb.middle);
    series.insert("bb_lower", bb.lower);
    series.insert("bb_width", bb.band_width);
    series.insert("bb_pct_b", bb.pct_b);

    for &period in &config.hvol_periods {
        series.insert(format!("hvol_{period}"), historical_volatility(&close, period));
    }

    // Positioning
    for &period in &config.zscore_periods {
        series.insert(format!("zscore_{period}"), zscore(&close, period));
    }

    let range = range_52w(&close);
    series.insert("high_52w", range.high_52w);
    series.insert("low_52w", range.low_52w);
    series.insert("range_position_52w", range.range_position);

    for period in RETURN_PERIODS {
        series.insert(format!("ret_{period}d"), roc(&close, period));
    }

    // Volume columns only make sense where volume is reported (index series
    // come through with zeros).
    if volume.iter().any(|&v| v > 0.0) {
        let vol_sma = rolling_mean(&volume, 20);
        let vol_ratio: Vec<f64> = volume
            .iter()
            .zip(vol_sma.iter())
            .map(|(&v, &s)| {
                if s.is_finite() && s > 0.0 {
                    v / s
                } else {
                    f64::NAN
                }
            })
            .collect();
        series.insert("vol_sma_20", vol_sma);
        series.insert("vol_ratio", vol_ratio);
        series.insert("obv", obv(&close, &volume));
    }

    Ok(series)
}

/// Percentile rank of a derived column under the scoring window, aligned to
/// the series rows.
pub fn column_percentile_rank(series: &EnrichedSeries, name: &str) -> Vec<f64> {
    match series.column(name) {
        Some(col) => rolling_percentile_rank(col, PERCENTILE_WINDOW, PERCENTILE_MIN_PERIODS),
        None => vec![f64::NAN; series.len()],
    }
}
