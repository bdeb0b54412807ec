use analysis_core::{finite_or, AnalysisConfig};
use technical_analysis::{column_percentile_rank, EnrichedSeries};

use crate::normalize_linear;

const W_ATR_PERCENTILE: f64 = 0.40;
const W_BANDWIDTH_PERCENTILE: f64 = 0.35;
const W_HVOL_RATIO: f64 = 0.25;

fn last_rank(series: &EnrichedSeries, column: &str) -> f64 {
    let ranks = column_percentile_rank(series, column);
    finite_or(ranks.last().copied().unwrap_or(f64::NAN), 50.0)
}

/// Short-vs-long realized volatility ratio mapped from [0.5, 1.5] onto
/// [0, 100]; above 100 means volatility is expanding.
fn hvol_ratio(series: &EnrichedSeries, config: &AnalysisConfig) -> f64 {
    let (Some(&short), Some(&long)) = (config.hvol_periods.first(), config.hvol_periods.get(1))
    else {
        return 50.0;
    };
    let short_vol = series.last(&format!("hvol_{short}"));
    let long_vol = series.last(&format!("hvol_{long}"));
    if !short_vol.is_finite() || !long_vol.is_finite() || long_vol == 0.0 {
        return 50.0;
    }
    normalize_linear(short_vol / long_vol, 0.5, 1.5)
}

/// Volatility factor. HIGH means highly volatile, i.e. risky; the composite
/// is the only place this gets inverted.
pub fn volatility_score(series: &EnrichedSeries, config: &AnalysisConfig) -> f64 {
    let score = W_ATR_PERCENTILE * last_rank(series, "atr_pct")
        + W_BANDWIDTH_PERCENTILE * last_rank(series, "bb_width")
        + W_HVOL_RATIO * hvol_ratio(series, config);
    score.clamp(0.0, 100.0)
}
