use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Top-level composite weights. Must sum to 1.0; the volatility leg is
/// inverted inside the composite, not here.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScoreWeights {
    pub trend: f64,
    pub momentum: f64,
    pub volatility: f64,
    pub rel_strength: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            trend: 0.30,
            momentum: 0.30,
            volatility: 0.15,
            rel_strength: 0.25,
        }
    }
}

/// Thresholds driving discrete signal emission
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SignalThresholds {
    pub rsi_extreme_overbought: f64,
    pub rsi_extreme_oversold: f64,
    /// Fraction of the upper Bollinger band that already counts as a test;
    /// the lower band mirrors it at (2.0 - bb_breakout).
    pub bb_breakout: f64,
    pub volume_surge: f64,
    pub gap_threshold: f64,
}

impl Default for SignalThresholds {
    fn default() -> Self {
        Self {
            rsi_extreme_overbought: 80.0,
            rsi_extreme_oversold: 20.0,
            bb_breakout: 0.995,
            volume_surge: 2.0,
            gap_threshold: 0.02,
        }
    }
}

/// Process-wide analysis configuration. Loaded once at startup, immutable
/// afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    pub data_lookback_days: i64,
    pub min_required_rows: usize,

    pub sma_periods: Vec<usize>,
    pub roc_periods: Vec<usize>,
    pub hvol_periods: Vec<usize>,
    pub zscore_periods: Vec<usize>,

    pub rsi_period: usize,
    pub rsi_overbought: f64,
    pub rsi_oversold: f64,

    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,

    pub adx_period: usize,
    pub adx_strong_trend: f64,

    pub atr_period: usize,

    pub bb_period: usize,
    pub bb_std: f64,

    pub vix_low: f64,
    pub vix_medium: f64,

    pub weights: ScoreWeights,
    pub signal_thresholds: SignalThresholds,

    /// Ticker of the volatility index fed to the regime classifier.
    pub vix_ticker: String,
    /// Ticker of the broad-market equity fed to the regime classifier.
    pub broad_market_ticker: String,

    pub request_delay_min: f64,
    pub request_delay_max: f64,
    pub batch_size: usize,
    pub batch_delay_min: f64,
    pub batch_delay_max: f64,
    pub timeout_secs: u64,
    pub max_retries: u32,

    /// Attach the full enriched series map to the emitted result.
    pub include_processed_data: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            data_lookback_days: 450,
            min_required_rows: 200,

            sma_periods: vec![20, 50, 125, 200],
            roc_periods: vec![10, 20, 60],
            hvol_periods: vec![20, 60],
            zscore_periods: vec![20, 50, 125],

            rsi_period: 14,
            rsi_overbought: 70.0,
            rsi_oversold: 30.0,

            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,

            adx_period: 14,
            adx_strong_trend: 25.0,

            atr_period: 14,

            bb_period: 20,
            bb_std: 2.0,

            vix_low: 15.0,
            vix_medium: 25.0,

            weights: ScoreWeights::default(),
            signal_thresholds: SignalThresholds::default(),

            vix_ticker: "^VIX".to_string(),
            broad_market_ticker: "SPY".to_string(),

            request_delay_min: 0.5,
            request_delay_max: 1.5,
            batch_size: 5,
            batch_delay_min: 2.0,
            batch_delay_max: 5.0,
            timeout_secs: 30,
            max_retries: 3,

            include_processed_data: false,
        }
    }
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_list(key: &str, default: Vec<usize>) -> Vec<usize> {
    let Ok(raw) = std::env::var(key) else {
        return default;
    };
    let parsed: Vec<usize> = raw
        .split(',')
        .filter_map(|p| p.trim().parse().ok())
        .collect();
    if parsed.is_empty() {
        default
    } else {
        parsed
    }
}

impl AnalysisConfig {
    /// Defaults with environment overrides applied. Only scalar knobs and the
    /// period lists are overridable; weights and thresholds change in code.
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            data_lookback_days: env_parse("DATA_LOOKBACK_DAYS", d.data_lookback_days),
            min_required_rows: env_parse("MIN_REQUIRED_ROWS", d.min_required_rows),
            sma_periods: env_list("SMA_PERIODS", d.sma_periods),
            roc_periods: env_list("ROC_PERIODS", d.roc_periods),
            hvol_periods: env_list("HVOL_PERIODS", d.hvol_periods),
            zscore_periods: env_list("ZSCORE_PERIODS", d.zscore_periods),
            rsi_period: env_parse("RSI_PERIOD", d.rsi_period),
            rsi_overbought: env_parse("RSI_OVERBOUGHT", d.rsi_overbought),
            rsi_oversold: env_parse("RSI_OVERSOLD", d.rsi_oversold),
            macd_fast: env_parse("MACD_FAST", d.macd_fast),
            macd_slow: env_parse("MACD_SLOW", d.macd_slow),
            macd_signal: env_parse("MACD_SIGNAL", d.macd_signal),
            adx_period: env_parse("ADX_PERIOD", d.adx_period),
            adx_strong_trend: env_parse("ADX_STRONG_TREND", d.adx_strong_trend),
            atr_period: env_parse("ATR_PERIOD", d.atr_period),
            bb_period: env_parse("BB_PERIOD", d.bb_period),
            bb_std: env_parse("BB_STD", d.bb_std),
            vix_low: env_parse("VIX_LOW", d.vix_low),
            vix_medium: env_parse("VIX_MEDIUM", d.vix_medium),
            vix_ticker: env_parse("VIX_TICKER", d.vix_ticker),
            broad_market_ticker: env_parse("BROAD_MARKET_TICKER", d.broad_market_ticker),
            request_delay_min: env_parse("REQUEST_DELAY_MIN", d.request_delay_min),
            request_delay_max: env_parse("REQUEST_DELAY_MAX", d.request_delay_max),
            batch_size: env_parse("BATCH_SIZE", d.batch_size),
            batch_delay_min: env_parse("BATCH_DELAY_MIN", d.batch_delay_min),
            batch_delay_max: env_parse("BATCH_DELAY_MAX", d.batch_delay_max),
            timeout_secs: env_parse("TIMEOUT", d.timeout_secs),
            max_retries: env_parse("MAX_RETRIES", d.max_retries),
            include_processed_data: env_parse("INCLUDE_PROCESSED_DATA", d.include_processed_data),
            weights: d.weights,
            signal_thresholds: d.signal_thresholds,
        }
    }
}

/// Secrets read once at process start. Values never appear in logs or the
/// emitted report.
#[derive(Clone, Default)]
pub struct Secrets {
    pub eodhd_api_key: Option<String>,
    pub telegram_bot_token: Option<String>,
    pub telegram_chat_id: Option<String>,
}

impl Secrets {
    pub fn from_env() -> Self {
        // .env is a convenience for local runs; CI injects real env vars.
        let _ = dotenvy::dotenv();
        Self {
            eodhd_api_key: std::env::var("EODHD_API_KEY").ok().filter(|v| !v.is_empty()),
            telegram_bot_token: std::env::var("TELEGRAM_BOT_TOKEN")
                .ok()
                .filter(|v| !v.is_empty()),
            telegram_chat_id: std::env::var("TELEGRAM_CHAT_ID")
                .ok()
                .filter(|v| !v.is_empty()),
        }
    }
}

impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secrets")
            .field("eodhd_api_key", &self.eodhd_api_key.as_ref().map(|_| "***"))
            .field(
                "telegram_bot_token",
                &self.telegram_bot_token.as_ref().map(|_| "***"),
            )
            .field(
                "telegram_chat_id",
                &self.telegram_chat_id.as_ref().map(|_| "***"),
            )
            .finish()
    }
}
