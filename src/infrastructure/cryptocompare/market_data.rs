//! CryptoCompare Market Data Gateway
//!
//! Fetches hourly OHLCV history from the min-api `histohour` endpoint,
//! aggregated over the CCCAGG index by default. Long ranges are paginated
//! in 2000-hour batches; each API page's trailing candle is dropped since
//! it covers the still-open hour. Failed requests are retried in a fixed
//! delay loop with a caller-configured, optionally unbounded, limit.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use reqwest_middleware::ClientWithMiddleware;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::domain::candlestick::Candlestick;
use crate::domain::errors::MarketDataError;
use crate::domain::ports::MarketDataGateway;
use crate::infrastructure::core::http_client_factory::{HttpClientFactory, build_url_with_query};

/// Maximum candles per histohour request.
const BATCH_HOURS: i64 = 2000;

const HOUR_SECS: i64 = 3600;

pub struct CryptoCompareGateway {
    client: ClientWithMiddleware,
    base_url: String,
    api_key: Option<String>,
    exchange: String,
    retry_limit: Option<u32>,
    retry_delay: Duration,
}

impl CryptoCompareGateway {
    pub fn builder() -> CryptoCompareGatewayBuilder {
        CryptoCompareGatewayBuilder::default()
    }
}

#[derive(Default)]
pub struct CryptoCompareGatewayBuilder {
    base_url: Option<String>,
    api_key: Option<String>,
    exchange: Option<String>,
    retry_limit: Option<Option<u32>>,
    retry_delay: Option<Duration>,
}

impl CryptoCompareGatewayBuilder {
    pub fn base_url(mut self, base_url: String) -> Self {
        self.base_url = Some(base_url);
        self
    }

    pub fn api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key;
        self
    }

    pub fn exchange(mut self, exchange: String) -> Self {
        self.exchange = Some(exchange);
        self
    }

    /// Maximum retry attempts per request; `None` retries until success.
    pub fn retry_limit(mut self, retry_limit: Option<u32>) -> Self {
        self.retry_limit = Some(retry_limit);
        self
    }

    pub fn retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = Some(retry_delay);
        self
    }

    pub fn build(self) -> CryptoCompareGateway {
        let base_url = self.base_url.expect("base_url is required");

        CryptoCompareGateway {
            client: HttpClientFactory::create_client(),
            base_url,
            api_key: self.api_key,
            exchange: self.exchange.unwrap_or_else(|| "CCCAGG".to_string()),
            retry_limit: self.retry_limit.unwrap_or(Some(5)),
            retry_delay: self.retry_delay.unwrap_or(Duration::from_secs(1)),
        }
    }
}

#[derive(Debug, Deserialize)]
struct HistoHourResponse {
    #[serde(rename = "Response")]
    response: Option<String>,
    #[serde(rename = "Message")]
    message: Option<String>,
    #[serde(rename = "Data")]
    data: Option<Vec<RawCandle>>,
}

#[derive(Debug, Deserialize)]
struct RawCandle {
    time: i64,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    #[allow(dead_code)]
    volumefrom: f64,
    volumeto: f64,
}

impl CryptoCompareGateway {
    async fn request_page(
        &self,
        base: &str,
        counter: &str,
        length: i64,
        to_ts: i64,
    ) -> Result<Vec<RawCandle>> {
        let url = format!("{}/data/histohour", self.base_url);
        let length_str = length.to_string();
        let to_ts_str = to_ts.to_string();
        let url_with_query = build_url_with_query(
            &url,
            &[
                ("fsym", base.to_uppercase().as_str()),
                ("tsym", counter.to_uppercase().as_str()),
                ("limit", &length_str),
                ("e", &self.exchange),
                ("toTs", &to_ts_str),
            ],
        );

        let mut request = self.client.get(&url_with_query);
        if let Some(key) = &self.api_key {
            request = request.header("authorization", format!("Apikey {}", key));
        }

        let response = request
            .send()
            .await
            .context("Failed to reach CryptoCompare")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!(MarketDataError::RequestFailed {
                reason: format!("histohour returned {}: {}", status, error_text),
            });
        }

        let payload: HistoHourResponse = response
            .json()
            .await
            .context("Failed to parse histohour response")?;

        let Some(mut data) = payload.data else {
            anyhow::bail!(MarketDataError::InvalidPayload {
                reason: payload
                    .message
                    .or(payload.response)
                    .unwrap_or_else(|| "missing Data field".to_string()),
            });
        };

        // The trailing candle covers the hour still in progress.
        data.pop();
        Ok(data)
    }

    /// Fixed-delay retry around one page request. The delay never grows;
    /// only the attempt counter does.
    async fn fetch_page(
        &self,
        base: &str,
        counter: &str,
        length: i64,
        to_ts: i64,
    ) -> Result<Vec<RawCandle>> {
        let mut attempt: u32 = 0;
        loop {
            match self.request_page(base, counter, length, to_ts).await {
                Ok(data) => return Ok(data),
                Err(e) => {
                    attempt += 1;
                    if let Some(limit) = self.retry_limit
                        && attempt > limit
                    {
                        warn!(
                            "Giving up on {}/{} page ending {} after {} attempts",
                            base, counter, to_ts, attempt
                        );
                        return Err(MarketDataError::RetriesExhausted { attempts: attempt }.into());
                    }
                    warn!(
                        "Request for {}/{} failed ({}), retrying in {:?}",
                        base, counter, e, self.retry_delay
                    );
                    tokio::time::sleep(self.retry_delay).await;
                }
            }
        }
    }
}

#[async_trait]
impl MarketDataGateway for CryptoCompareGateway {
    async fn fetch_candles(
        &self,
        base: &str,
        counter: &str,
        start_ts: i64,
        end_ts: Option<i64>,
    ) -> Result<Vec<Candlestick>> {
        let end = end_ts.unwrap_or_else(|| Utc::now().timestamp());
        let mut remaining_hours = (end - start_ts).max(0) / HOUR_SECS;

        info!(
            "Downloading {}/{} candlesticks from {} to {}, {} in total",
            base, counter, start_ts, end, remaining_hours
        );

        let mut batch_end = start_ts;
        let mut buffer = Vec::new();
        while remaining_hours > 0 {
            let length = remaining_hours.min(BATCH_HOURS);
            batch_end += length * HOUR_SECS;
            let page = self.fetch_page(base, counter, length, batch_end).await?;
            buffer.extend(page);
            remaining_hours -= length;
            debug!("Progress: {} hours left", remaining_hours);
        }

        let candles: Vec<Candlestick> = buffer
            .into_iter()
            .map(|raw| {
                Candlestick::raw(
                    base, counter, raw.time, raw.open, raw.high, raw.low, raw.close,
                    // volume is quoted in the counter currency
                    raw.volumeto,
                )
            })
            .collect();

        info!(
            "Download complete: {} candles for {}/{}",
            candles.len(),
            base,
            counter
        );
        Ok(candles)
    }
}
