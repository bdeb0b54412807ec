use analysis_core::{AnalysisConfig, SignalThresholds};
use technical_analysis::{EnrichedSeries, PriceField};

/// Derives the discrete signal list for one symbol from the last two rows of
/// its enriched series. Signals with NaN operands are suppressed, never
/// errors. Output order is fixed and duplicates are dropped.
pub struct SignalEngine {
    rsi_overbought: f64,
    rsi_oversold: f64,
    adx_strong_trend: f64,
    thresholds: SignalThresholds,
}

impl SignalEngine {
    pub fn new(config: &AnalysisConfig) -> Self {
        Self {
            rsi_overbought: config.rsi_overbought,
            rsi_oversold: config.rsi_oversold,
            adx_strong_trend: config.adx_strong_trend,
            thresholds: config.signal_thresholds,
        }
    }

    pub fn generate(&self, series: &EnrichedSeries) -> Vec<String> {
        let mut signals: Vec<String> = Vec::new();
        fn push(s: String, signals: &mut Vec<String>) {
            if !signals.contains(&s) {
                signals.push(s);
            }
        }

        let close = series.price_from_end(PriceField::Close, 0);
        let high = series.price_from_end(PriceField::High, 0);
        let low = series.price_from_end(PriceField::Low, 0);
        let open = series.price_from_end(PriceField::Open, 0);
        let prev_close = series.price_from_end(PriceField::Close, 1);

        // Price-level interactions: a close through the level is a break, a
        // high/low reaching it without the close following is a test.
        let resistances = [
            ("prev_week_high", "Prev Week High"),
            ("prev_day_high", "Prev Day High"),
        ];
        for (column, label) in resistances {
            let level = series.last(column);
            if !level.is_finite() || !close.is_finite() {
                continue;
            }
            if close > level {
                push(format!("Breaking above {label}"), &mut signals);
            } else if high >= level {
                push(format!("Testing {label}"), &mut signals);
            }
        }
        let supports = [
            ("prev_week_low", "Prev Week Low"),
            ("prev_day_low", "Prev Day Low"),
        ];
        for (column, label) in supports {
            let level = series.last(column);
            if !level.is_finite() || !close.is_finite() {
                continue;
            }
            if close < level {
                push(format!("Breaking below {label}"), &mut signals);
            } else if low <= level {
                push(format!("Testing {label}"), &mut signals);
            }
        }

        // RSI bands, most extreme first
        let rsi = series.last("rsi");
        if rsi.is_finite() {
            if rsi >= self.thresholds.rsi_extreme_overbought {
                push(format!("RSI Extreme Overbought ({rsi:.1})"), &mut signals);
            } else if rsi >= self.rsi_overbought {
                push(format!("RSI Overbought ({rsi:.1})"), &mut signals);
            } else if rsi <= self.thresholds.rsi_extreme_oversold {
                push(format!("RSI Extreme Oversold ({rsi:.1})"), &mut signals);
            } else if rsi <= self.rsi_oversold {
                push(format!("RSI Oversold ({rsi:.1})"), &mut signals);
            }
        }

        // Bollinger breakout / test with a small approach margin
        let bb_upper = series.last("bb_upper");
        let bb_lower = series.last("bb_lower");
        if bb_upper.is_finite() && close.is_finite() {
            if close > bb_upper {
                push("BB Upper Breakout".to_string(), &mut signals);
            } else if high >= self.thresholds.bb_breakout * bb_upper {
                push("Testing upper Bollinger Band".to_string(), &mut signals);
            }
        }
        if bb_lower.is_finite() && close.is_finite() {
            if close < bb_lower {
                push("BB Lower Breakout".to_string(), &mut signals);
            } else if low <= (2.0 - self.thresholds.bb_breakout) * bb_lower {
                push("Testing lower Bollinger Band".to_string(), &mut signals);
            }
        }

        // Volume surge
        let vol_ratio = series.last("vol_ratio");
        if vol_ratio.is_finite() && vol_ratio > self.thresholds.volume_surge {
            push(format!("Volume Surge ({vol_ratio:.1}x avg)"), &mut signals);
        }

        // Overnight gap
        if open.is_finite() && prev_close.is_finite() && prev_close != 0.0 {
            let gap = open / prev_close - 1.0;
            if gap.abs() > self.thresholds.gap_threshold {
                let pct = gap * 100.0;
                if gap > 0.0 {
                    push(format!("Gap Up ({pct:.1}%)"), &mut signals);
                } else {
                    push(format!("Gap Down ({pct:.1}%)"), &mut signals);
                }
            }
        }

        // MACD line/signal crossover between the two rows
        let macd_spread = series.last("macd") - series.last("macd_signal");
        let prev_spread = series.from_end("macd", 1) - series.from_end("macd_signal", 1);
        if macd_spread.is_finite() && prev_spread.is_finite() {
            if macd_spread > 0.0 && prev_spread <= 0.0 {
                push("MACD Bullish Crossover".to_string(), &mut signals);
            } else if macd_spread < 0.0 && prev_spread >= 0.0 {
                push("MACD Bearish Crossover".to_string(), &mut signals);
            }
        }

        // Golden / death cross of the 50 over the 200
        let sma_50 = series.last("sma_50");
        let sma_200 = series.last("sma_200");
        let prev_50 = series.from_end("sma_50", 1);
        let prev_200 = series.from_end("sma_200", 1);
        if [sma_50, sma_200, prev_50, prev_200].iter().all(|v| v.is_finite()) {
            if sma_50 > sma_200 && prev_50 <= prev_200 {
                push("Golden Cross (SMA50 > SMA200)".to_string(), &mut signals);
            } else if sma_50 < sma_200 && prev_50 >= prev_200 {
                push("Death Cross (SMA50 < SMA200)".to_string(), &mut signals);
            }
        }

        // Established trend strength
        let adx = series.last("adx");
        if adx.is_finite() && adx > self.adx_strong_trend {
            push(format!("Strong Trend (ADX {adx:.1})"), &mut signals);
        }

        tracing::debug!(count = signals.len(), "signals generated");
        signals
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use analysis_core::Bar;
    use chrono::NaiveDate;
    use technical_analysis::compute_all;

    /// Two-row series with hand-planted columns; `prev`/`last` pairs map
    /// straight onto the rows the engine inspects.
    struct SeriesBuilder {
        series: EnrichedSeries,
    }

    impl SeriesBuilder {
        fn new(prev: [f64; 5], last: [f64; 5]) -> Self {
            let d0 = NaiveDate::from_ymd_opt(2024, 1, 11).unwrap();
            let bars = vec![
                Bar {
                    date: d0,
                    open: prev[0],
                    high: prev[1],
                    low: prev[2],
                    close: prev[3],
                    adj_close: None,
                    volume: prev[4],
                },
                Bar {
                    date: d0.succ_opt().unwrap(),
                    open: last[0],
                    high: last[1],
                    low: last[2],
                    close: last[3],
                    adj_close: None,
                    volume: last[4],
                },
            ];
            Self {
                series: EnrichedSeries::from_bars(&bars),
            }
        }

        fn col(mut self, name: &str, prev: f64, last: f64) -> Self {
            self.series.insert(name, vec![prev, last]);
            self
        }

        fn build(self) -> EnrichedSeries {
            self.series
        }
    }

    fn engine() -> SignalEngine {
        SignalEngine::new(&AnalysisConfig::default())
    }

    fn plain_bars(prev: [f64; 5], last: [f64; 5]) -> SeriesBuilder {
        SeriesBuilder::new(prev, last)
    }

    #[test]
    fn breaking_above_resistance() {
        let series = plain_bars(
            [100.0, 101.0, 99.0, 100.0, 1e6],
            [101.0, 106.0, 100.0, 105.0, 1e6],
        )
        .col("prev_day_high", f64::NAN, 101.0)
        .col("prev_week_high", f64::NAN, 103.0)
        .build();
        let signals = engine().generate(&series);
        assert!(signals.contains(&"Breaking above Prev Day High".to_string()));
        assert!(signals.contains(&"Breaking above Prev Week High".to_string()));
    }

    #[test]
    fn testing_resistance_without_close_through() {
        // High tags the level but the close stays below it.
        let series = plain_bars(
            [100.0, 101.0, 99.0, 100.0, 1e6],
            [100.0, 103.5, 99.5, 100.5, 1e6],
        )
        .col("prev_week_high", f64::NAN, 103.0)
        .build();
        let signals = engine().generate(&series);
        assert!(signals.contains(&"Testing Prev Week High".to_string()));
        assert!(!signals.iter().any(|s| s.starts_with("Breaking above")));
    }

    #[test]
    fn breaking_below_support() {
        let series = plain_bars(
            [100.0, 101.0, 99.0, 100.0, 1e6],
            [99.0, 99.5, 94.0, 94.5, 1e6],
        )
        .col("prev_week_low", f64::NAN, 96.0)
        .col("prev_day_low", f64::NAN, 99.0)
        .build();
        let signals = engine().generate(&series);
        assert!(signals.contains(&"Breaking below Prev Week Low".to_string()));
        assert!(signals.contains(&"Breaking below Prev Day Low".to_string()));
    }

    #[test]
    fn rsi_ladder_picks_most_extreme() {
        let series = plain_bars(
            [100.0, 101.0, 99.0, 100.0, 1e6],
            [100.0, 101.0, 99.0, 100.0, 1e6],
        )
        .col("rsi", 75.0, 85.0)
        .build();
        let signals = engine().generate(&series);
        assert!(signals.iter().any(|s| s.starts_with("RSI Extreme Overbought")));
        assert!(!signals.iter().any(|s| s.starts_with("RSI Overbought")));
    }

    #[test]
    fn rsi_oversold_band() {
        let series = plain_bars(
            [100.0, 101.0, 99.0, 100.0, 1e6],
            [100.0, 101.0, 99.0, 100.0, 1e6],
        )
        .col("rsi", 40.0, 27.0)
        .build();
        let signals = engine().generate(&series);
        assert!(signals.iter().any(|s| s.starts_with("RSI Oversold")));
    }

    #[test]
    fn bollinger_breakout_and_test() {
        let breakout = plain_bars(
            [100.0, 101.0, 99.0, 100.0, 1e6],
            [100.0, 112.0, 100.0, 111.0, 1e6],
        )
        .col("bb_upper", f64::NAN, 110.0)
        .col("bb_lower", f64::NAN, 90.0)
        .build();
        let signals = engine().generate(&breakout);
        assert!(signals.contains(&"BB Upper Breakout".to_string()));

        let test = plain_bars(
            [100.0, 101.0, 99.0, 100.0, 1e6],
            [100.0, 109.6, 100.0, 105.0, 1e6],
        )
        .col("bb_upper", f64::NAN, 110.0)
        .col("bb_lower", f64::NAN, 90.0)
        .build();
        let signals = engine().generate(&test);
        assert!(signals.contains(&"Testing upper Bollinger Band".to_string()));
        assert!(!signals.contains(&"BB Upper Breakout".to_string()));
    }

    #[test]
    fn volume_surge_over_threshold() {
        let series = plain_bars(
            [100.0, 101.0, 99.0, 100.0, 1e6],
            [100.0, 101.0, 99.0, 100.0, 5e6],
        )
        .col("vol_ratio", 1.0, 3.2)
        .build();
        let signals = engine().generate(&series);
        assert!(signals.iter().any(|s| s.starts_with("Volume Surge")));
    }

    #[test]
    fn gap_up_and_down() {
        let up = plain_bars(
            [100.0, 101.0, 99.0, 100.0, 1e6],
            [103.0, 104.0, 102.0, 103.5, 1e6],
        )
        .build();
        assert!(engine()
            .generate(&up)
            .iter()
            .any(|s| s.starts_with("Gap Up")));

        let down = plain_bars(
            [100.0, 101.0, 99.0, 100.0, 1e6],
            [97.0, 98.0, 96.0, 97.5, 1e6],
        )
        .build();
        assert!(engine()
            .generate(&down)
            .iter()
            .any(|s| s.starts_with("Gap Down")));
    }

    #[test]
    fn small_gap_is_quiet() {
        let series = plain_bars(
            [100.0, 101.0, 99.0, 100.0, 1e6],
            [101.0, 102.0, 100.0, 101.5, 1e6],
        )
        .build();
        assert!(!engine()
            .generate(&series)
            .iter()
            .any(|s| s.starts_with("Gap")));
    }

    #[test]
    fn macd_crossovers() {
        let bullish = plain_bars(
            [100.0, 101.0, 99.0, 100.0, 1e6],
            [100.0, 101.0, 99.0, 100.0, 1e6],
        )
        .col("macd", -0.5, 0.6)
        .col("macd_signal", -0.2, 0.2)
        .build();
        assert!(engine()
            .generate(&bullish)
            .contains(&"MACD Bullish Crossover".to_string()));

        let bearish = plain_bars(
            [100.0, 101.0, 99.0, 100.0, 1e6],
            [100.0, 101.0, 99.0, 100.0, 1e6],
        )
        .col("macd", 0.5, -0.6)
        .col("macd_signal", 0.2, -0.2)
        .build();
        assert!(engine()
            .generate(&bearish)
            .contains(&"MACD Bearish Crossover".to_string()));
    }

    #[test]
    fn golden_and_death_cross() {
        let golden = plain_bars(
            [100.0, 101.0, 99.0, 100.0, 1e6],
            [100.0, 101.0, 99.0, 100.0, 1e6],
        )
        .col("sma_50", 99.9, 100.2)
        .col("sma_200", 100.0, 100.1)
        .build();
        assert!(engine()
            .generate(&golden)
            .contains(&"Golden Cross (SMA50 > SMA200)".to_string()));

        let death = plain_bars(
            [100.0, 101.0, 99.0, 100.0, 1e6],
            [100.0, 101.0, 99.0, 100.0, 1e6],
        )
        .col("sma_50", 100.1, 100.0)
        .col("sma_200", 100.0, 100.1)
        .build();
        assert!(engine()
            .generate(&death)
            .contains(&"Death Cross (SMA50 < SMA200)".to_string()));
    }

    #[test]
    fn strong_trend_over_adx_threshold() {
        let series = plain_bars(
            [100.0, 101.0, 99.0, 100.0, 1e6],
            [100.0, 101.0, 99.0, 100.0, 1e6],
        )
        .col("adx", 20.0, 32.4)
        .build();
        let signals = engine().generate(&series);
        assert!(signals.contains(&"Strong Trend (ADX 32.4)".to_string()));
    }

    #[test]
    fn nan_operands_are_suppressed() {
        let series = plain_bars(
            [100.0, 101.0, 99.0, 100.0, 1e6],
            [100.0, 101.0, 99.0, 100.0, 1e6],
        )
        .col("rsi", f64::NAN, f64::NAN)
        .col("macd", f64::NAN, 0.5)
        .col("macd_signal", f64::NAN, 0.1)
        .col("adx", f64::NAN, f64::NAN)
        .build();
        let signals = engine().generate(&series);
        assert!(signals.is_empty(), "unexpected signals: {signals:?}");
    }

    #[test]
    fn full_pipeline_series_generates_without_panic() {
        let start = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
        let bars: Vec<Bar> = (0..260)
            .map(|i| {
                let close = 100.0 * 1.01_f64.powi(i);
                Bar {
                    date: start + chrono::Duration::days(i as i64),
                    open: close,
                    high: close * 1.001,
                    low: close * 0.999,
                    close,
                    adj_close: Some(close),
                    volume: 1e6,
                }
            })
            .collect();
        let series = compute_all(&bars, &AnalysisConfig::default()).unwrap();
        let signals = engine().generate(&series);
        // A runaway uptrend pins the overbought and breakout signals.
        assert!(signals.iter().any(|s| s.starts_with("RSI Extreme Overbought")));
        assert!(signals.contains(&"Breaking above Prev Week High".to_string()));
        assert!(signals.iter().any(|s| s.starts_with("Strong Trend")));
        // Order is deterministic: price-level signals come first.
        assert_eq!(signals[0], "Breaking above Prev Week High");
    }
}
