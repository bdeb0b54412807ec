use analysis_core::{
    AnalysisConfig, AnalysisError, Bar, DateRange, RunMetadata, Secrets, SessionOracle,
    SessionStatus, Universe,
};
use anyhow::{bail, Result};
use chrono::Utc;
use market_data::MarketDataFetcher;
use market_regime::RegimeClassifier;
use rayon::prelude::*;
use scoring_engine::ScoringEngine;
use signal_engine::SignalEngine;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use technical_analysis::{compute_all, EnrichedSeries};
use tokio_util::sync::CancellationToken;

pub mod report;
pub use report::{
    bottom_n, build_instrument, build_rankings, top_n, AnalysisReport, CurrentBar,
    IndicatorSummary, InstrumentInfo, InstrumentRecord, KeyLevels, Rankings, ScoredSymbol,
};

/// Sequences a full daily run: acquisition, indicator derivation, scoring,
/// regime classification, signal generation and consolidation. Per-symbol
/// failures never abort the run; only an empty fetch does.
pub struct AnalysisOrchestrator {
    config: Arc<AnalysisConfig>,
    universe: Universe,
    fetcher: MarketDataFetcher,
    scoring: ScoringEngine,
    regime: RegimeClassifier,
    signals: SignalEngine,
}

impl AnalysisOrchestrator {
    pub fn new(config: AnalysisConfig, universe: Universe, secrets: &Secrets) -> Self {
        let config = Arc::new(config);
        Self {
            fetcher: MarketDataFetcher::new(Arc::clone(&config), secrets.eodhd_api_key.clone()),
            scoring: ScoringEngine::new(Arc::clone(&config)),
            regime: RegimeClassifier::new(&config),
            signals: SignalEngine::new(&config),
            universe,
            config,
        }
    }

    /// Run against the live wall clock.
    pub async fn run(&self) -> Result<AnalysisReport> {
        self.run_with(SessionOracle::now(), &CancellationToken::new())
            .await
    }

    /// Run against an explicit session status, cancellable. A cancelled run
    /// still consolidates whatever completed.
    pub async fn run_with(
        &self,
        session: SessionStatus,
        cancel: &CancellationToken,
    ) -> Result<AnalysisReport> {
        let range = self.fetcher.date_range(&session);
        tracing::info!(
            start = %range.start,
            end = %range.end,
            symbols = self.universe.len(),
            "starting daily analysis run"
        );

        let fetch = self
            .fetcher
            .fetch_universe(&self.universe, range, &session, cancel)
            .await;
        let mut failed_symbols: Vec<String> =
            fetch.failures.iter().map(|f| f.ticker.clone()).collect();
        if fetch.series.is_empty() {
            bail!("no symbols fetched, aborting run");
        }

        // Indicator derivation is pure and embarrassingly parallel. It must
        // fully finish before scoring starts: relative strength needs every
        // benchmark series enriched.
        let inputs: Vec<(String, Vec<Bar>)> = fetch.series.into_iter().collect();
        let config = Arc::clone(&self.config);
        let computed: Vec<(String, Result<EnrichedSeries, AnalysisError>)> = inputs
            .into_par_iter()
            .map(|(ticker, bars)| {
                let result = compute_all(&bars, &config);
                (ticker, result)
            })
            .collect();

        let mut enriched = HashMap::new();
        for (ticker, result) in computed {
            match result {
                Ok(series) => {
                    enriched.insert(ticker, series);
                }
                Err(error) => {
                    tracing::warn!(%ticker, %error, "indicator computation failed");
                    failed_symbols.push(ticker);
                }
            }
        }

        self.consolidate(range, &enriched, failed_symbols)
    }

    /// Score, classify, signal and assemble the final report from enriched
    /// series. Split out so cached or replayed series can flow through the
    /// same path.
    pub fn consolidate(
        &self,
        range: DateRange,
        enriched: &HashMap<String, EnrichedSeries>,
        failed_symbols: Vec<String>,
    ) -> Result<AnalysisReport> {
        if enriched.is_empty() {
            bail!("no enriched series to consolidate");
        }

        let vix = enriched.get(&self.config.vix_ticker);
        let broad = enriched.get(&self.config.broad_market_ticker);
        if vix.is_none() && broad.is_none() {
            tracing::error!("both reference symbols missing, regime will be unknown");
        }
        let market_regime = self.regime.classify(vix, broad);

        let mut instruments = BTreeMap::new();
        let mut ranked: Vec<ScoredSymbol> = Vec::new();
        for (position, info) in self.universe.iter().enumerate() {
            let Some(series) = enriched.get(&info.ticker) else {
                continue;
            };
            let benchmark = enriched.get(&info.benchmark);
            let scores = self
                .scoring
                .score(&info.ticker, series, &info.benchmark, benchmark);
            let signals = self.signals.generate(series);
            instruments.insert(
                info.ticker.clone(),
                build_instrument(info, series, scores, signals),
            );
            // The volatility index is analyzed but kept out of rankings;
            // its score has no cross-sectional meaning.
            if info.ticker != self.config.vix_ticker {
                ranked.push((info.ticker.clone(), scores, position));
            }
        }

        let rankings = build_rankings(&ranked);
        let processed_data = self.config.include_processed_data.then(|| {
            enriched
                .iter()
                .map(|(ticker, series)| (ticker.clone(), series.to_json()))
                .collect()
        });

        let metadata = RunMetadata {
            analysis_date: range.end,
            generated_at: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            instruments_analyzed: instruments.len(),
            date_range: range,
            failed_symbols,
        };
        tracing::info!(
            analyzed = metadata.instruments_analyzed,
            failed = metadata.failed_symbols.len(),
            condition = market_regime.market_condition.name(),
            "run consolidated"
        );

        Ok(AnalysisReport {
            metadata,
            market_regime,
            instruments,
            rankings,
            processed_data,
            notable_events: Vec::new(),
        })
    }
}
