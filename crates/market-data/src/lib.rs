use analysis_core::{
    AnalysisConfig, AnalysisError, Bar, DateRange, ProviderHint, SessionStatus, SymbolInfo,
    Universe,
};
use chrono::Duration as ChronoDuration;
use dashmap::DashMap;
use eodhd_client::EodhdClient;
use rand::Rng;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use yahoo_client::YahooChartClient;

/// One symbol that could not be fetched or validated
#[derive(Debug)]
pub struct SymbolFailure {
    pub ticker: String,
    pub error: AnalysisError,
}

/// Outcome of a universe fetch: cleaned raw series keyed by ticker, plus the
/// per-symbol failures that did not abort the run.
#[derive(Debug, Default)]
pub struct UniverseFetch {
    pub series: HashMap<String, Vec<Bar>>,
    pub failures: Vec<SymbolFailure>,
}

/// Drop malformed bars, sort ascending by date, deduplicate dates keeping
/// the most recent occurrence.
pub fn clean_bars(bars: Vec<Bar>) -> Vec<Bar> {
    let mut bars: Vec<Bar> = bars
        .into_iter()
        .filter(|b| b.open > 0.0 && b.high > 0.0 && b.low > 0.0 && b.close > 0.0)
        .collect();
    bars.sort_by_key(|b| b.date);
    bars.dedup_by(|next, prev| {
        if next.date == prev.date {
            // Keep the later row for a duplicated date.
            *prev = next.clone();
            true
        } else {
            false
        }
    });
    bars
}

/// Session-aware trim: a bar stamped with today's NY date is only kept once
/// the session has closed, otherwise it is a partial print.
pub fn trim_session(bars: Vec<Bar>, session: &SessionStatus) -> Vec<Bar> {
    if session.market_closed_for_today {
        return bars;
    }
    bars.into_iter()
        .filter(|b| b.date != session.today_ny)
        .collect()
}

/// Reject series too short to analyze.
pub fn validate_bars(bars: &[Bar], min_required_rows: usize) -> Result<(), AnalysisError> {
    if bars.len() < min_required_rows {
        return Err(AnalysisError::Insufficient(format!(
            "{} rows, need {}",
            bars.len(),
            min_required_rows
        )));
    }
    Ok(())
}

/// Acquisition layer: provider routing, pacing, trimming and validation.
/// Cheap to clone; every fetch worker gets its own copy and builds its own
/// provider client, so no pacing state is ever shared across workers.
#[derive(Clone)]
pub struct MarketDataFetcher {
    config: Arc<AnalysisConfig>,
    eodhd_api_key: Option<Arc<str>>,
}

impl MarketDataFetcher {
    pub fn new(config: Arc<AnalysisConfig>, eodhd_api_key: Option<String>) -> Self {
        Self {
            config,
            eodhd_api_key: eodhd_api_key.map(Into::into),
        }
    }

    /// Analysis window for a run: lookback days ending at the NY date.
    pub fn date_range(&self, session: &SessionStatus) -> DateRange {
        let end = session.today_ny;
        DateRange {
            start: end - ChronoDuration::days(self.config.data_lookback_days),
            end,
        }
    }

    /// Fetch one symbol's history, route by provider, then clean, trim and
    /// validate.
    pub async fn fetch(
        &self,
        symbol: &SymbolInfo,
        range: DateRange,
        session: &SessionStatus,
    ) -> Result<Vec<Bar>, AnalysisError> {
        let raw = match symbol.provider {
            ProviderHint::YahooChart => {
                let client = YahooChartClient::new(&self.config);
                client.fetch_history(&symbol.ticker, range.start).await?
            }
            ProviderHint::Eod => {
                let Some(key) = &self.eodhd_api_key else {
                    return Err(AnalysisError::ConfigMissing(
                        "EODHD_API_KEY is not configured".to_string(),
                    ));
                };
                let client = EodhdClient::new(key.to_string(), &self.config);
                client
                    .fetch_eod(&symbol.ticker, &symbol.exchange, range.start, range.end)
                    .await?
            }
        };

        let bars = trim_session(clean_bars(raw), session);
        validate_bars(&bars, self.config.min_required_rows)?;
        Ok(bars)
    }

    /// Fetch the whole universe with a bounded worker pool. Symbols are taken
    /// in declaration order, at most BATCH_SIZE in flight, with a randomized
    /// pause between batches. Per-symbol failures are collected, never fatal.
    pub async fn fetch_universe(
        &self,
        universe: &Universe,
        range: DateRange,
        session: &SessionStatus,
        cancel: &CancellationToken,
    ) -> UniverseFetch {
        let results: DashMap<String, Result<Vec<Bar>, AnalysisError>> = DashMap::new();
        let symbols: Vec<SymbolInfo> = universe.iter().cloned().collect();
        let batch_size = self.config.batch_size.max(1);

        for (batch_idx, batch) in symbols.chunks(batch_size).enumerate() {
            if cancel.is_cancelled() {
                tracing::warn!("universe fetch cancelled, skipping remaining symbols");
                break;
            }
            if batch_idx > 0 {
                let pause = {
                    let (lo, hi) = (self.config.batch_delay_min, self.config.batch_delay_max);
                    rand::rng().random_range(lo..=hi.max(lo))
                };
                tracing::debug!(batch_idx, pause_secs = pause, "inter-batch pause");
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(Duration::from_secs_f64(pause)) => {}
                }
            }

            let mut workers = JoinSet::new();
            for symbol in batch {
                let fetcher = self.clone();
                let symbol = symbol.clone();
                let session = *session;
                let cancel = cancel.clone();
                workers.spawn(async move {
                    let ticker = symbol.ticker.clone();
                    let outcome = tokio::select! {
                        _ = cancel.cancelled() => None,
                        result = fetcher.fetch(&symbol, range, &session) => Some(result),
                    };
                    (ticker, outcome)
                });
            }

            while let Some(joined) = workers.join_next().await {
                match joined {
                    Ok((ticker, Some(result))) => {
                        results.insert(ticker, result);
                    }
                    Ok((ticker, None)) => {
                        tracing::warn!(%ticker, "fetch aborted by cancellation");
                    }
                    Err(e) => {
                        tracing::error!("fetch worker panicked: {e}");
                    }
                }
            }
        }

        let mut fetch = UniverseFetch::default();
        // Re-walk the universe so map insertion noise cannot leak into
        // iteration-dependent consumers.
        for symbol in universe.iter() {
            let Some((ticker, result)) = results.remove(&symbol.ticker) else {
                continue;
            };
            match result {
                Ok(bars) => {
                    tracing::info!(%ticker, rows = bars.len(), "fetched");
                    fetch.series.insert(ticker, bars);
                }
                Err(error) => {
                    tracing::warn!(%ticker, %error, "symbol failed");
                    fetch.failures.push(SymbolFailure { ticker, error });
                }
            }
        }
        fetch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use analysis_core::SessionOracle;
    use chrono::{NaiveDate, TimeZone, Utc};
    use chrono_tz::America::New_York;

    fn bar(date: NaiveDate, close: f64) -> Bar {
        Bar {
            date,
            open: close,
            high: close * 1.01,
            low: close * 0.99,
            close,
            adj_close: Some(close),
            volume: 1_000.0,
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn session_at(y: i32, m: u32, d: u32, hour: u32, min: u32) -> SessionStatus {
        let instant = New_York
            .with_ymd_and_hms(y, m, d, hour, min, 0)
            .unwrap()
            .with_timezone(&Utc);
        SessionOracle::status_at(instant)
    }

    /// Sessions 2024-01-08 .. 2024-01-15, weekend skipped.
    fn january_bars() -> Vec<Bar> {
        [8, 9, 10, 11, 12, 15]
            .into_iter()
            .map(|d| bar(date(2024, 1, d), 100.0 + d as f64))
            .collect()
    }

    #[test]
    fn open_session_drops_todays_bar() {
        let session = session_at(2024, 1, 15, 14, 0);
        assert!(!session.market_closed_for_today);
        let trimmed = trim_session(january_bars(), &session);
        assert_eq!(trimmed.last().unwrap().date, date(2024, 1, 12));
    }

    #[test]
    fn closed_session_keeps_todays_bar() {
        let session = session_at(2024, 1, 15, 16, 16);
        assert!(session.market_closed_for_today);
        let trimmed = trim_session(january_bars(), &session);
        assert_eq!(trimmed.last().unwrap().date, date(2024, 1, 15));
    }

    #[test]
    fn clean_drops_non_positive_prices() {
        let mut bars = january_bars();
        bars[2].low = 0.0;
        bars[3].close = -5.0;
        let cleaned = clean_bars(bars);
        assert_eq!(cleaned.len(), 4);
        assert!(cleaned.iter().all(|b| b.low > 0.0 && b.close > 0.0));
    }

    #[test]
    fn clean_sorts_and_dedups_dates() {
        let mut bars = january_bars();
        bars.reverse();
        bars.push(bar(date(2024, 1, 10), 555.0)); // late duplicate wins
        let cleaned = clean_bars(bars);
        let dates: Vec<NaiveDate> = cleaned.iter().map(|b| b.date).collect();
        let mut sorted = dates.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(dates, sorted);
        let dup = cleaned.iter().find(|b| b.date == date(2024, 1, 10)).unwrap();
        assert!((dup.close - 555.0).abs() < 1e-12);
    }

    #[test]
    fn validation_boundary_is_exact() {
        let bars = january_bars();
        assert!(validate_bars(&bars, bars.len()).is_ok());
        assert!(matches!(
            validate_bars(&bars, bars.len() + 1),
            Err(AnalysisError::Insufficient(_))
        ));
    }

    #[test]
    fn date_range_spans_lookback() {
        let config = Arc::new(AnalysisConfig {
            data_lookback_days: 10,
            ..AnalysisConfig::default()
        });
        let fetcher = MarketDataFetcher::new(config, None);
        let session = session_at(2024, 1, 15, 12, 0);
        let range = fetcher.date_range(&session);
        assert_eq!(range.end, date(2024, 1, 15));
        assert_eq!(range.start, date(2024, 1, 5));
    }

    #[tokio::test]
    async fn keyed_provider_without_key_is_config_missing() {
        let fetcher = MarketDataFetcher::new(Arc::new(AnalysisConfig::default()), None);
        let symbol = SymbolInfo {
            ticker: "SPY".to_string(),
            name: "S&P 500".to_string(),
            category: "Equity Index".to_string(),
            benchmark: "SPY".to_string(),
            exchange: "US".to_string(),
            provider: ProviderHint::Eod,
        };
        let session = session_at(2024, 1, 15, 12, 0);
        let range = fetcher.date_range(&session);
        let err = fetcher.fetch(&symbol, range, &session).await.unwrap_err();
        assert!(matches!(err, AnalysisError::ConfigMissing(_)));
    }

    #[tokio::test]
    async fn cancelled_fetch_skips_all_symbols() {
        let fetcher = MarketDataFetcher::new(Arc::new(AnalysisConfig::default()), None);
        let universe = Universe::standard();
        let session = session_at(2024, 1, 15, 12, 0);
        let range = fetcher.date_range(&session);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let outcome = fetcher
            .fetch_universe(&universe, range, &session, &cancel)
            .await;
        assert!(outcome.series.is_empty());
        assert!(outcome.failures.is_empty());
    }
}
