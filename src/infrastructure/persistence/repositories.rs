use crate::domain::candlestick::{Candlestick, IndicatorUpdate};
use crate::domain::repositories::CandleRepository;
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use tracing::{debug, info};

pub struct SqliteCandleRepository {
    pool: SqlitePool,
}

impl SqliteCandleRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn map_rows_to_candles(&self, rows: Vec<sqlx::sqlite::SqliteRow>) -> Result<Vec<Candlestick>> {
        let mut candles = Vec::with_capacity(rows.len());
        for row in rows {
            candles.push(Candlestick {
                id: Some(row.try_get("id")?),
                base: row.try_get("base")?,
                counter: row.try_get("counter")?,
                timestamp: row.try_get("timestamp")?,
                open: row.try_get("open")?,
                high: row.try_get("high")?,
                low: row.try_get("low")?,
                close: row.try_get("close")?,
                volume: row.try_get("volume")?,
                ma1: row.try_get("ma1")?,
                ma2: row.try_get("ma2")?,
                ma3: row.try_get("ma3")?,
                macd_proper: row.try_get("macd_proper")?,
                macd_signal: row.try_get("macd_signal")?,
                macd_diff: row.try_get("macd_diff")?,
            });
        }
        Ok(candles)
    }
}

#[async_trait]
impl CandleRepository for SqliteCandleRepository {
    async fn get_series(
        &self,
        base: &str,
        counter: &str,
        start_ts: Option<i64>,
        end_ts: Option<i64>,
    ) -> Result<Vec<Candlestick>> {
        let mut sql =
            String::from("SELECT * FROM candlesticks WHERE base = ? AND counter = ?");
        if start_ts.is_some() {
            sql.push_str(" AND timestamp >= ?");
        }
        if end_ts.is_some() {
            sql.push_str(" AND timestamp <= ?");
        }
        sql.push_str(" ORDER BY timestamp ASC");

        let mut query = sqlx::query(&sql)
            .bind(base.to_uppercase())
            .bind(counter.to_uppercase());
        if let Some(start) = start_ts {
            query = query.bind(start);
        }
        if let Some(end) = end_ts {
            query = query.bind(end);
        }

        let rows = query
            .fetch_all(&self.pool)
            .await
            .context("Failed to read candlestick series")?;
        let candles = self.map_rows_to_candles(rows)?;
        debug!(
            "Retrieved {} candlesticks for {}/{}",
            candles.len(),
            base,
            counter
        );
        Ok(candles)
    }

    async fn upsert_candles(&self, candles: &[Candlestick]) -> Result<usize> {
        let mut tx = self.pool.begin().await?;
        let mut inserted = 0usize;
        let mut updated = 0usize;

        for candle in candles {
            // all-zero placeholder hours never enter the store
            if candle.is_empty() {
                continue;
            }

            let existing: Option<i64> = sqlx::query_scalar(
                "SELECT id FROM candlesticks WHERE base = ? AND counter = ? AND timestamp = ?",
            )
            .bind(&candle.base)
            .bind(&candle.counter)
            .bind(candle.timestamp)
            .fetch_optional(&mut *tx)
            .await
            .context("Failed to probe for existing candle")?;

            match existing {
                None => {
                    sqlx::query(
                        r#"
                        INSERT INTO candlesticks (base, counter, timestamp, open, high, low, close, volume)
                        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                        "#,
                    )
                    .bind(&candle.base)
                    .bind(&candle.counter)
                    .bind(candle.timestamp)
                    .bind(candle.open)
                    .bind(candle.high)
                    .bind(candle.low)
                    .bind(candle.close)
                    .bind(candle.volume)
                    .execute(&mut *tx)
                    .await
                    .context("Failed to insert candle")?;
                    inserted += 1;
                }
                Some(id) => {
                    // a re-fetch refreshes prices in place, indicators stay
                    sqlx::query(
                        "UPDATE candlesticks SET open = ?, high = ?, low = ?, close = ?, volume = ? WHERE id = ?",
                    )
                    .bind(candle.open)
                    .bind(candle.high)
                    .bind(candle.low)
                    .bind(candle.close)
                    .bind(candle.volume)
                    .bind(id)
                    .execute(&mut *tx)
                    .await
                    .context("Failed to update candle")?;
                    updated += 1;
                }
            }
        }

        tx.commit().await.context("Failed to commit candle batch")?;
        info!(
            "Candle batch saved: {} inserted, {} updated",
            inserted, updated
        );
        Ok(inserted)
    }

    async fn update_indicator_fields(&self, updates: &[IndicatorUpdate]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for update in updates {
            sqlx::query(
                r#"
                UPDATE candlesticks
                SET ma1 = ?, ma2 = ?, ma3 = ?, macd_proper = ?, macd_signal = ?, macd_diff = ?
                WHERE id = ?
                "#,
            )
            .bind(update.ma1)
            .bind(update.ma2)
            .bind(update.ma3)
            .bind(update.macd_proper)
            .bind(update.macd_signal)
            .bind(update.macd_diff)
            .bind(update.id)
            .execute(&mut *tx)
            .await
            .context("Failed to update indicator fields")?;
        }
        tx.commit()
            .await
            .context("Failed to commit indicator batch")?;
        info!("Indicator fields merged onto {} rows", updates.len());
        Ok(())
    }

    async fn latest_timestamp(&self, base: &str, counter: &str) -> Result<Option<i64>> {
        let latest: Option<i64> = sqlx::query_scalar(
            "SELECT timestamp FROM candlesticks WHERE base = ? AND counter = ? ORDER BY timestamp DESC LIMIT 1",
        )
        .bind(base.to_uppercase())
        .bind(counter.to_uppercase())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to read latest timestamp")?;
        Ok(latest)
    }
}
