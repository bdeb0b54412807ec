use analysis_core::{AnalysisConfig, AnalysisError, Bar};
use chrono::{DateTime, NaiveDate};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

const CHART_URL: &str = "https://query2.finance.yahoo.com/v8/finance/chart";

/// Full daily history pulled per request; callers filter locally.
const HISTORY_RANGE: &str = "10y";

/// Keyless chart-history client. Serves the volatility index and any other
/// symbol the keyed provider cannot.
pub struct YahooChartClient {
    client: Client,
    base_url: String,
    max_retries: u32,
}

impl YahooChartClient {
    pub fn new(config: &AnalysisConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url: CHART_URL.to_string(),
            max_retries: config.max_retries,
        }
    }

    /// Override the endpoint; integration tests point this at a local stub.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Daily bars for `ticker` from `from` onwards, ascending by date.
    pub async fn fetch_history(
        &self,
        ticker: &str,
        from: NaiveDate,
    ) -> Result<Vec<Bar>, AnalysisError> {
        let url = format!(
            "{}/{}?range={}&interval=1d",
            self.base_url, ticker, HISTORY_RANGE
        );

        let mut last_error: Option<AnalysisError> = None;
        for attempt in 0..=self.max_retries {
            let response = match self.client.get(&url).send().await {
                Ok(r) => r,
                Err(e) => {
                    let wait = 2.0_f64.powi(attempt as i32);
                    tracing::warn!(ticker, attempt, "chart request failed: {e}, retrying");
                    last_error = Some(AnalysisError::Transient(e.to_string()));
                    tokio::time::sleep(Duration::from_secs_f64(wait)).await;
                    continue;
                }
            };

            let status = response.status();
            if status.as_u16() == 429 || status.is_server_error() {
                let wait = 2.0_f64.powi(attempt as i32);
                tracing::warn!(ticker, attempt, %status, "chart endpoint pushed back, retrying");
                last_error = Some(AnalysisError::Transient(format!(
                    "HTTP {status} for {ticker}"
                )));
                tokio::time::sleep(Duration::from_secs_f64(wait)).await;
                continue;
            }
            if !status.is_success() {
                return Err(AnalysisError::ProviderRejected(format!(
                    "HTTP {status} for {ticker}"
                )));
            }

            let json: Value = response
                .json()
                .await
                .map_err(|e| AnalysisError::ProviderRejected(e.to_string()))?;
            return parse_chart(&json, ticker, from);
        }

        Err(last_error.unwrap_or_else(|| {
            AnalysisError::Transient(format!("retries exhausted for {ticker}"))
        }))
    }
}

/// Walk the chart payload into bars, dropping incomplete rows and anything
/// before `from`. `Adj Close` is used when present, otherwise close.
fn parse_chart(json: &Value, ticker: &str, from: NaiveDate) -> Result<Vec<Bar>, AnalysisError> {
    let chart = json
        .get("chart")
        .and_then(|v| v.get("result"))
        .and_then(|v| v.as_array())
        .and_then(|arr| arr.first())
        .ok_or_else(|| {
            AnalysisError::ProviderRejected(format!("no chart data for {ticker}"))
        })?;

    let timestamps = chart
        .get("timestamp")
        .and_then(|v| v.as_array())
        .ok_or_else(|| AnalysisError::Insufficient(format!("no timestamps for {ticker}")))?;

    let quote = chart
        .get("indicators")
        .and_then(|v| v.get("quote"))
        .and_then(|v| v.as_array())
        .and_then(|arr| arr.first())
        .ok_or_else(|| AnalysisError::Insufficient(format!("no quote block for {ticker}")))?;

    let field = |name: &str| -> Option<&Vec<Value>> {
        quote.get(name).and_then(|v| v.as_array())
    };
    let (opens, highs, lows, closes, volumes) = match (
        field("open"),
        field("high"),
        field("low"),
        field("close"),
        field("volume"),
    ) {
        (Some(o), Some(h), Some(l), Some(c), Some(v)) => (o, h, l, c, v),
        _ => {
            return Err(AnalysisError::Insufficient(format!(
                "missing OHLCV arrays for {ticker}"
            )))
        }
    };

    let adj_closes = chart
        .get("indicators")
        .and_then(|v| v.get("adjclose"))
        .and_then(|v| v.as_array())
        .and_then(|arr| arr.first())
        .and_then(|v| v.get("adjclose"))
        .and_then(|v| v.as_array());

    let mut bars = Vec::with_capacity(timestamps.len());
    for i in 0..timestamps.len() {
        let (Some(ts), Some(o), Some(h), Some(l), Some(c)) = (
            timestamps[i].as_i64(),
            opens.get(i).and_then(Value::as_f64),
            highs.get(i).and_then(Value::as_f64),
            lows.get(i).and_then(Value::as_f64),
            closes.get(i).and_then(Value::as_f64),
        ) else {
            continue;
        };
        let date = DateTime::from_timestamp(ts, 0)
            .ok_or_else(|| AnalysisError::Internal(format!("bad timestamp {ts}")))?
            .date_naive();
        if date < from {
            continue;
        }
        let adj = adj_closes
            .and_then(|arr| arr.get(i))
            .and_then(Value::as_f64);
        bars.push(Bar {
            date,
            open: o,
            high: h,
            low: l,
            close: c,
            adj_close: Some(adj.unwrap_or(c)),
            volume: volumes.get(i).and_then(Value::as_f64).unwrap_or(0.0),
        });
    }

    Ok(bars)
}
