use {
    anyhow::{Context, Result, anyhow},
    async_trait::async_trait,
    chrono::{NaiveDate, NaiveDateTime},
    serde::Deserialize,
};

use crate::config::STREAM;
use crate::domain::{Candle, Instrument};

/// Abstract interface for fetching historical candles. Implementations may
/// fail or return an empty/partial list; callers own validation and retry
/// policy.
#[async_trait]
pub trait HistoryProvider: Send + Sync {
    async fn fetch(&self, instrument: &Instrument) -> Result<Vec<Candle>>;
}

/// One row of the dashboard backend's history response.
#[derive(Debug, Deserialize)]
struct HistoryRow {
    #[serde(rename = "Date")]
    date: String,
    #[serde(rename = "Open")]
    open: Option<f64>,
    #[serde(rename = "High")]
    high: Option<f64>,
    #[serde(rename = "Low")]
    low: Option<f64>,
    #[serde(rename = "Close")]
    close: Option<f64>,
    #[serde(rename = "Volume")]
    volume: Option<f64>,
}

impl HistoryRow {
    /// Daily rows carry a bare date, intraday rows a full timestamp.
    fn epoch_ms(&self) -> Option<i64> {
        if let Ok(dt) = NaiveDateTime::parse_from_str(&self.date, "%Y-%m-%d %H:%M:%S") {
            return Some(dt.and_utc().timestamp_millis());
        }
        let date = NaiveDate::parse_from_str(&self.date, "%Y-%m-%d").ok()?;
        Some(date.and_hms_opt(0, 0, 0)?.and_utc().timestamp_millis())
    }

    fn into_candle(self) -> Option<Candle> {
        let time = self.epoch_ms()?;
        Some(Candle {
            time,
            open: self.open?,
            high: self.high?,
            low: self.low?,
            close: self.close?,
            // Index symbols come back without volume.
            volume: self.volume.unwrap_or(0.0),
        })
    }
}

/// Fetches candles from the dashboard REST API
/// (`/stocks/{symbol}/history?period=..&interval=..`).
pub struct RestHistoryProvider {
    client: reqwest::Client,
    base_url: String,
}

impl RestHistoryProvider {
    pub fn new() -> Result<Self> {
        Self::with_base_url(STREAM.rest.base_url)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(STREAM.rest.timeout)
            .build()
            .context("building history client")?;
        Ok(RestHistoryProvider {
            client,
            base_url: base_url.into(),
        })
    }
}

#[async_trait]
impl HistoryProvider for RestHistoryProvider {
    async fn fetch(&self, instrument: &Instrument) -> Result<Vec<Candle>> {
        let url = format!("{}/stocks/{}/history", self.base_url, instrument.symbol);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("period", instrument.timeframe.period_str()),
                ("interval", instrument.timeframe.interval_str()),
            ])
            .send()
            .await
            .with_context(|| format!("requesting history for {instrument}"))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "history request for {instrument} failed: {}",
                response.status()
            ));
        }

        let rows: Vec<HistoryRow> = response
            .json()
            .await
            .with_context(|| format!("decoding history for {instrument}"))?;

        Ok(rows.into_iter().filter_map(HistoryRow::into_candle).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_parse_daily_and_intraday_dates() {
        let daily: HistoryRow = serde_json::from_str(
            r#"{"Date":"2024-03-01","Open":1.0,"High":2.0,"Low":0.5,"Close":1.5,"Volume":100.0}"#,
        )
        .unwrap();
        let candle = daily.into_candle().unwrap();
        assert_eq!(candle.close, 1.5);
        assert_eq!(candle.time % 86_400_000, 0, "daily rows land on midnight");

        let intraday: HistoryRow = serde_json::from_str(
            r#"{"Date":"2024-03-01 09:30:00","Open":1.0,"High":2.0,"Low":0.5,"Close":1.5,"Volume":100.0}"#,
        )
        .unwrap();
        assert!(intraday.into_candle().is_some());
    }

    #[test]
    fn rows_with_missing_ohlc_are_dropped() {
        let row: HistoryRow = serde_json::from_str(
            r#"{"Date":"2024-03-01","Open":null,"High":2.0,"Low":0.5,"Close":1.5,"Volume":100.0}"#,
        )
        .unwrap();
        assert!(row.into_candle().is_none());
    }

    #[test]
    fn missing_volume_defaults_to_zero() {
        let row: HistoryRow = serde_json::from_str(
            r#"{"Date":"2024-03-01","Open":1.0,"High":2.0,"Low":0.5,"Close":1.5}"#,
        )
        .unwrap();
        assert_eq!(row.into_candle().unwrap().volume, 0.0);
    }
}
