use analysis_core::{AnalysisConfig, AnalysisError, Bar};
use chrono::NaiveDate;
use rand::Rng;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;

const BASE_URL: &str = "https://eodhd.com/api";

/// Exponential backoff base for 5xx/timeout retries.
const RETRY_BASE_SECS: f64 = 2.0;
/// Linear backoff step applied per attempt after a 429.
const RATE_LIMIT_STEP_SECS: f64 = 5.0;

/// One row of the EOD endpoint's JSON array
#[derive(Debug, Deserialize)]
struct EodRow {
    date: NaiveDate,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    adjusted_close: f64,
    volume: f64,
}

/// How a response status should be handled by the retry loop
#[derive(Debug, PartialEq, Eq)]
enum RetryClass {
    /// 5xx and timeouts: exponential backoff then retry
    Transient,
    /// 429: linear backoff scaled by attempt number
    RateLimited,
    /// 401: credentials are wrong, no retry will fix it
    AuthFailed,
    /// Remaining 4xx: the request itself is bad
    Rejected,
}

fn classify_status(status: StatusCode) -> Option<RetryClass> {
    if status.is_success() {
        return None;
    }
    Some(match status.as_u16() {
        401 => RetryClass::AuthFailed,
        429 => RetryClass::RateLimited,
        s if s >= 500 => RetryClass::Transient,
        _ => RetryClass::Rejected,
    })
}

/// Back-adjust one raw row: scale O/H/L by adjusted_close/close and replace
/// close with the adjusted value. A zero close leaves prices untouched.
fn adjust_row(row: EodRow) -> Bar {
    let factor = if row.close != 0.0 {
        row.adjusted_close / row.close
    } else {
        1.0
    };
    Bar {
        date: row.date,
        open: row.open * factor,
        high: row.high * factor,
        low: row.low * factor,
        close: row.adjusted_close,
        adj_close: Some(row.adjusted_close),
        volume: row.volume,
    }
}

/// Client for the keyed EOD history API. One instance per fetch worker; the
/// inter-request pacing state is the instance itself, never shared.
pub struct EodhdClient {
    api_key: String,
    client: Client,
    base_url: String,
    max_retries: u32,
    request_delay: (f64, f64),
}

impl EodhdClient {
    pub fn new(api_key: String, config: &AnalysisConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            api_key,
            client,
            base_url: BASE_URL.to_string(),
            max_retries: config.max_retries,
            request_delay: (config.request_delay_min, config.request_delay_max),
        }
    }

    /// Override the endpoint; integration tests point this at a local stub.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Randomized pause before every request to stay under the provider's
    /// burst radar.
    async fn pace(&self) {
        let (lo, hi) = self.request_delay;
        if hi <= 0.0 {
            return;
        }
        let secs = rand::rng().random_range(lo..=hi.max(lo));
        tokio::time::sleep(Duration::from_secs_f64(secs)).await;
    }

    /// Daily history for `ticker.exchange`, back-adjusted, ascending by date.
    pub async fn fetch_eod(
        &self,
        ticker: &str,
        exchange: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Bar>, AnalysisError> {
        let url = format!("{}/eod/{}.{}", self.base_url, ticker, exchange);

        let mut last_error: Option<AnalysisError> = None;
        for attempt in 0..=self.max_retries {
            self.pace().await;

            let response = self
                .client
                .get(&url)
                .query(&[
                    ("api_token", self.api_key.as_str()),
                    ("from", &from.format("%Y-%m-%d").to_string()),
                    ("to", &to.format("%Y-%m-%d").to_string()),
                    ("fmt", "json"),
                    ("period", "d"),
                ])
                .send()
                .await;

            let response = match response {
                Ok(r) => r,
                Err(e) => {
                    // Connect errors and timeouts land here.
                    let wait = RETRY_BASE_SECS.powi(attempt as i32);
                    tracing::warn!(
                        ticker,
                        attempt,
                        "transient request failure: {e}, retrying in {wait:.0}s"
                    );
                    last_error = Some(AnalysisError::Transient(e.to_string()));
                    tokio::time::sleep(Duration::from_secs_f64(wait)).await;
                    continue;
                }
            };

            match classify_status(response.status()) {
                None => {
                    let rows: Vec<EodRow> = response
                        .json()
                        .await
                        .map_err(|e| AnalysisError::ProviderRejected(e.to_string()))?;
                    return Ok(rows.into_iter().map(adjust_row).collect());
                }
                Some(RetryClass::AuthFailed) => {
                    return Err(AnalysisError::AuthFailed(format!(
                        "provider refused API token for {ticker}"
                    )));
                }
                Some(RetryClass::Rejected) => {
                    return Err(AnalysisError::ProviderRejected(format!(
                        "HTTP {} for {ticker}",
                        response.status()
                    )));
                }
                Some(RetryClass::RateLimited) => {
                    let wait = RATE_LIMIT_STEP_SECS * (attempt + 1) as f64;
                    tracing::warn!(ticker, attempt, "rate limited, backing off {wait:.0}s");
                    last_error = Some(AnalysisError::RateLimited(format!(
                        "HTTP 429 for {ticker}"
                    )));
                    tokio::time::sleep(Duration::from_secs_f64(wait)).await;
                }
                Some(RetryClass::Transient) => {
                    let wait = RETRY_BASE_SECS.powi(attempt as i32);
                    tracing::warn!(
                        ticker,
                        attempt,
                        status = %response.status(),
                        "server error, retrying in {wait:.0}s"
                    );
                    last_error = Some(AnalysisError::Transient(format!(
                        "HTTP {} for {ticker}",
                        response.status()
                    )));
                    tokio::time::sleep(Duration::from_secs_f64(wait)).await;
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            AnalysisError::Transient(format!("retries exhausted for {ticker}"))
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(close: f64, adjusted_close: f64) -> EodRow {
        EodRow {
            date: NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
            open: 100.0,
            high: 110.0,
            low: 95.0,
            close,
            adjusted_close,
            volume: 5_000.0,
        }
    }

    #[test]
    fn status_classification() {
        assert_eq!(classify_status(StatusCode::OK), None);
        assert_eq!(
            classify_status(StatusCode::UNAUTHORIZED),
            Some(RetryClass::AuthFailed)
        );
        assert_eq!(
            classify_status(StatusCode::TOO_MANY_REQUESTS),
            Some(RetryClass::RateLimited)
        );
        assert_eq!(
            classify_status(StatusCode::NOT_FOUND),
            Some(RetryClass::Rejected)
        );
        assert_eq!(
            classify_status(StatusCode::BAD_GATEWAY),
            Some(RetryClass::Transient)
        );
        assert_eq!(
            classify_status(StatusCode::INTERNAL_SERVER_ERROR),
            Some(RetryClass::Transient)
        );
    }

    #[test]
    fn adjustment_scales_ohlc_by_factor() {
        let bar = adjust_row(row(100.0, 50.0));
        assert!((bar.open - 50.0).abs() < 1e-12);
        assert!((bar.high - 55.0).abs() < 1e-12);
        assert!((bar.low - 47.5).abs() < 1e-12);
        assert!((bar.close - 50.0).abs() < 1e-12);
        assert_eq!(bar.adj_close, Some(50.0));
    }

    #[test]
    fn adjustment_with_zero_close_defaults_to_identity() {
        let bar = adjust_row(row(0.0, 42.0));
        assert!((bar.open - 100.0).abs() < 1e-12);
        assert!((bar.high - 110.0).abs() < 1e-12);
        // Close still carries the adjusted value.
        assert!((bar.close - 42.0).abs() < 1e-12);
    }

    #[test]
    fn eod_rows_deserialize() {
        let json = r#"[{"date":"2024-01-10","open":1.0,"high":2.0,"low":0.5,
            "close":1.5,"adjusted_close":1.5,"volume":123.0}]"#;
        let rows: Vec<EodRow> = serde_json::from_str(json).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].date, NaiveDate::from_ymd_opt(2024, 1, 10).unwrap());
    }
}
