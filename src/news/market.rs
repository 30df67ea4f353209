//! WTI and Brent quotes from the Alpha Vantage commodities API.
//!
//! Market data is optional: any failure (missing key, throttling, bad
//! payload) is logged and the episode is produced without a market segment.

use crate::config::MarketConfig;
use crate::error::MarketError;
use crate::models::MarketSnapshot;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{info, instrument, warn};

/// Latest price and day-over-day change for one benchmark.
#[derive(Debug, Clone, PartialEq)]
pub struct Quote {
    pub price: f64,
    /// Formatted like `+1.2%`.
    pub change: String,
}

#[derive(Debug, Clone)]
pub struct MarketClient {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl MarketClient {
    pub fn new(config: &MarketConfig, api_key: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(config.timeout_secs))
                .build()
                .unwrap_or_else(|_| Client::new()),
            endpoint: config.endpoint.clone(),
            api_key,
        }
    }

    /// Today's snapshot, or `None` if either benchmark is unavailable.
    #[instrument(level = "info", skip_all)]
    pub async fn snapshot(&self) -> Option<MarketSnapshot> {
        match self.try_snapshot().await {
            Ok(snapshot) => {
                info!(
                    wti = snapshot.wti_crude,
                    brent = snapshot.brent_crude,
                    change_wti = %snapshot.change_wti,
                    change_brent = %snapshot.change_brent,
                    "Fetched market data"
                );
                Some(snapshot)
            }
            Err(e) => {
                warn!(error = %e, "Market data unavailable; continuing without it");
                None
            }
        }
    }

    async fn try_snapshot(&self) -> Result<MarketSnapshot, MarketError> {
        let wti = self.quote("WTI").await?;
        let brent = self.quote("BRENT").await?;
        Ok(MarketSnapshot {
            wti_crude: wti.price,
            brent_crude: brent.price,
            change_wti: wti.change,
            change_brent: brent.change,
        })
    }

    async fn quote(&self, function: &str) -> Result<Quote, MarketError> {
        let body: Value = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("function", function),
                ("interval", "daily"),
                ("apikey", self.api_key.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        parse_commodity_series(&body)
    }
}

/// Extract the latest quote from a commodity time-series payload.
///
/// `data` is newest first. Entries whose value is not a number (the API
/// uses `"."` for missing days) are skipped.
pub fn parse_commodity_series(body: &Value) -> Result<Quote, MarketError> {
    for key in ["Error Message", "Note", "Information"] {
        if let Some(message) = body.get(key).and_then(Value::as_str) {
            return Err(MarketError::Refused(message.to_string()));
        }
    }

    let data = body
        .get("data")
        .and_then(Value::as_array)
        .ok_or_else(|| MarketError::Payload("missing `data` array".to_string()))?;

    let mut values = data.iter().filter_map(|point| {
        point
            .get("value")
            .and_then(Value::as_str)
            .and_then(|v| v.trim().parse::<f64>().ok())
    });

    let latest = values
        .next()
        .ok_or_else(|| MarketError::Payload("no numeric values".to_string()))?;
    let change = match values.next() {
        Some(previous) if previous != 0.0 => (latest - previous) / previous * 100.0,
        _ => 0.0,
    };

    Ok(Quote {
        price: latest,
        change: format!("{change:+.1}%"),
    })
}
