use crate::domain::candlestick::Candlestick;
use anyhow::Result;
use async_trait::async_trait;

// Need async_trait for async functions in traits
#[async_trait]
pub trait MarketDataGateway: Send + Sync {
    /// Fetch the hourly OHLCV series for a pair between `start_ts` and
    /// `end_ts` (now, when `None`), ascending. Pagination against the
    /// remote API happens inside the gateway; an empty result means the
    /// stored series is already caught up.
    async fn fetch_candles(
        &self,
        base: &str,
        counter: &str,
        start_ts: i64,
        end_ts: Option<i64>,
    ) -> Result<Vec<Candlestick>>;
}
