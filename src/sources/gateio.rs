//! Gate.io REST client for OHLCV candlesticks.
//!
//! Symbols in the perpetual-futures spelling ("BTC/USDT:USDT") are routed to
//! the futures candlestick endpoint; the spot spelling ("BTC/USDT") goes to
//! the spot endpoint. Market-data endpoints are public, so requests are
//! unsigned; credentials are validated at startup for parity with the rest
//! of the deployment.

use crate::error::ExchangeError;
use crate::sources::ExchangeApi;
use crate::types::{Candle, Timeframe};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

const GATEIO_API_URL: &str = "https://api.gateio.ws/api/v4";

/// Gate.io error body: {"label": "...", "message": "..."}.
#[derive(Debug, Deserialize)]
struct GateIoError {
    #[serde(default)]
    label: String,
    #[serde(default)]
    message: String,
}

/// Futures candlestick row. Prices come back as strings.
#[derive(Debug, Deserialize)]
struct FuturesCandle {
    /// Bar time, Unix seconds.
    t: i64,
    /// Volume in contracts.
    #[serde(default)]
    v: f64,
    o: String,
    h: String,
    l: String,
    c: String,
}

/// Gate.io REST client.
#[derive(Clone)]
pub struct GateIoClient {
    client: Client,
    base_url: String,
}

impl GateIoClient {
    pub fn new() -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("vigil/0.1")
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url: GATEIO_API_URL.to_string(),
        }
    }

    /// Point the client at a different base URL (used by tests).
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let mut client = Self::new();
        client.base_url = base_url.into();
        client
    }

    /// Lightweight connectivity probe: exchange server time in milliseconds.
    pub async fn server_time(&self) -> Result<i64, ExchangeError> {
        #[derive(Deserialize)]
        struct ServerTime {
            server_time: i64,
        }

        let url = format!("{}/spot/time", self.base_url);
        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ExchangeError::Exchange(format!(
                "server time probe returned {}",
                status
            )));
        }
        let body: ServerTime = response.json().await?;
        Ok(body.server_time)
    }

    /// Map an error response to the exchange error taxonomy.
    async fn classify_error(response: reqwest::Response) -> ExchangeError {
        let status = response.status();
        if status.as_u16() == 429 {
            return ExchangeError::RateLimited;
        }
        if status.as_u16() == 401 || status.as_u16() == 403 {
            return ExchangeError::Authentication(format!("HTTP {}", status));
        }

        let body: GateIoError = match response.json().await {
            Ok(b) => b,
            Err(_) => return ExchangeError::Exchange(format!("HTTP {}", status)),
        };

        match body.label.as_str() {
            "INVALID_CURRENCY" | "INVALID_CURRENCY_PAIR" | "CONTRACT_NOT_FOUND"
            | "INVALID_PARAM_VALUE" => ExchangeError::InvalidSymbol(body.message),
            "TOO_MANY_REQUESTS" => ExchangeError::RateLimited,
            _ => ExchangeError::Exchange(format!("{}: {}", body.label, body.message)),
        }
    }

    async fn fetch_futures(
        &self,
        contract: &str,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<Vec<Candle>, ExchangeError> {
        let url = format!("{}/futures/usdt/candlesticks", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("contract", contract),
                ("interval", timeframe.interval()),
                ("limit", &limit.to_string()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::classify_error(response).await);
        }

        let rows: Vec<FuturesCandle> = response.json().await?;
        let mut candles = Vec::with_capacity(rows.len());
        for row in rows {
            candles.push(Candle {
                time: row.t * 1000,
                open: parse_price(&row.o)?,
                high: parse_price(&row.h)?,
                low: parse_price(&row.l)?,
                close: parse_price(&row.c)?,
                volume: row.v,
            });
        }
        candles.sort_by_key(|c| c.time);
        Ok(candles)
    }

    async fn fetch_spot(
        &self,
        pair: &str,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<Vec<Candle>, ExchangeError> {
        let url = format!("{}/spot/candlesticks", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("currency_pair", pair),
                ("interval", timeframe.interval()),
                ("limit", &limit.to_string()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::classify_error(response).await);
        }

        // Spot rows are arrays of strings:
        // [ts, quote_volume, close, high, low, open, base_volume, closed]
        let rows: Vec<Vec<String>> = response.json().await?;
        let mut candles = Vec::with_capacity(rows.len());
        for row in rows {
            if row.len() < 6 {
                warn!("Malformed spot candlestick row ({} fields), skipping", row.len());
                continue;
            }
            let time: i64 = row[0]
                .parse()
                .map_err(|_| ExchangeError::Exchange(format!("bad timestamp: {}", row[0])))?;
            candles.push(Candle {
                time: time * 1000,
                open: parse_price(&row[5])?,
                high: parse_price(&row[3])?,
                low: parse_price(&row[4])?,
                close: parse_price(&row[2])?,
                volume: row.get(6).and_then(|v| v.parse().ok()).unwrap_or(0.0),
            });
        }
        candles.sort_by_key(|c| c.time);
        Ok(candles)
    }
}

impl Default for GateIoClient {
    fn default() -> Self {
        Self::new()
    }
}

impl ExchangeApi for GateIoClient {
    async fn fetch_ohlcv(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<Vec<Candle>, ExchangeError> {
        debug!("Fetching {} {} candles for {}", limit, timeframe, symbol);
        if let Some(futures_symbol) = symbol.strip_suffix(":USDT") {
            let contract = futures_symbol.replace('/', "_");
            self.fetch_futures(&contract, timeframe, limit).await
        } else {
            let pair = symbol.replace('/', "_");
            self.fetch_spot(&pair, timeframe, limit).await
        }
    }
}

fn parse_price(s: &str) -> Result<f64, ExchangeError> {
    s.parse()
        .map_err(|_| ExchangeError::Exchange(format!("bad price field: {}", s)))
}
