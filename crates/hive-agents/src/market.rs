use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use moka::future::Cache;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::AgentError;

/// Latest price data for one token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MarketSnapshot {
    pub token: String,
    pub price: f64,
    pub price_change_24h: f64,
    pub volume_24h: f64,
    pub timestamp: DateTime<Utc>,
}

impl MarketSnapshot {
    /// One line of prompt context.
    pub fn describe(&self) -> String {
        format!(
            "{}: ${:.2} ({:+.2}% 24h) | Vol: ${:.1}M",
            self.token,
            self.price,
            self.price_change_24h,
            self.volume_24h / 1e6
        )
    }
}

/// Source of market snapshots. Mockable for testing.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Snapshots for the requested tokens. Unknown tokens are omitted.
    async fn fetch_prices(&self, tokens: &[String]) -> Result<Vec<MarketSnapshot>, AgentError>;
}

/// CoinGecko id for a tracked ticker.
pub fn coingecko_id(token: &str) -> Option<&'static str> {
    match token {
        "BTC" => Some("bitcoin"),
        "ETH" => Some("ethereum"),
        "SOL" => Some("solana"),
        "AVAX" => Some("avalanche-2"),
        "MATIC" => Some("matic-network"),
        "ARB" => Some("arbitrum"),
        "OP" => Some("optimism"),
        "LINK" => Some("chainlink"),
        "UNI" => Some("uniswap"),
        "AAVE" => Some("aave"),
        _ => None,
    }
}

#[derive(Debug, Deserialize)]
struct SimplePrice {
    usd: Option<f64>,
    usd_24h_change: Option<f64>,
    usd_24h_vol: Option<f64>,
}

/// CoinGecko `/simple/price` client.
pub struct CoinGeckoSource {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl CoinGeckoSource {
    pub const DEFAULT_BASE_URL: &'static str = "https://api.coingecko.com/api/v3";

    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, AgentError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }
}

#[async_trait]
impl MarketDataSource for CoinGeckoSource {
    async fn fetch_prices(&self, tokens: &[String]) -> Result<Vec<MarketSnapshot>, AgentError> {
        let ids: Vec<&str> = tokens.iter().filter_map(|t| coingecko_id(t)).collect();
        if ids.is_empty() {
            return Ok(vec![]);
        }

        let mut request = self
            .client
            .get(format!("{}/simple/price", self.base_url))
            .query(&[
                ("ids", ids.join(",")),
                ("vs_currencies", "usd".to_string()),
                ("include_24hr_change", "true".to_string()),
                ("include_24hr_vol", "true".to_string()),
            ]);
        if let Some(key) = &self.api_key {
            request = request.header("x-cg-demo-api-key", key);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(AgentError::Market(format!(
                "CoinGecko returned {}",
                response.status()
            )));
        }
        let body: HashMap<String, SimplePrice> = response.json().await?;
        Ok(snapshots_from_response(tokens, &body, Utc::now()))
    }
}

fn snapshots_from_response(
    tokens: &[String],
    body: &HashMap<String, SimplePrice>,
    at: DateTime<Utc>,
) -> Vec<MarketSnapshot> {
    tokens
        .iter()
        .filter_map(|token| {
            let price = body.get(coingecko_id(token)?)?;
            Some(MarketSnapshot {
                token: token.clone(),
                price: price.usd.unwrap_or(0.0),
                price_change_24h: price.usd_24h_change.unwrap_or(0.0),
                volume_24h: price.usd_24h_vol.unwrap_or(0.0),
                timestamp: at,
            })
        })
        .collect()
}

/// Read-through moka cache in front of another source, keyed by token.
pub struct CachedMarketData {
    inner: Arc<dyn MarketDataSource>,
    cache: Cache<String, MarketSnapshot>,
}

impl CachedMarketData {
    pub fn new(inner: Arc<dyn MarketDataSource>, ttl: Duration) -> Self {
        Self {
            inner,
            cache: Cache::builder()
                .max_capacity(1_000)
                .time_to_live(ttl)
                .build(),
        }
    }
}

#[async_trait]
impl MarketDataSource for CachedMarketData {
    async fn fetch_prices(&self, tokens: &[String]) -> Result<Vec<MarketSnapshot>, AgentError> {
        let mut hits: HashMap<String, MarketSnapshot> = HashMap::new();
        let mut missing: Vec<String> = Vec::new();
        for token in tokens {
            match self.cache.get(token).await {
                Some(snapshot) => {
                    hits.insert(token.clone(), snapshot);
                }
                None => missing.push(token.clone()),
            }
        }

        if !missing.is_empty() {
            debug!(missing = missing.len(), hits = hits.len(), "Market cache miss");
            for snapshot in self.inner.fetch_prices(&missing).await? {
                self.cache
                    .insert(snapshot.token.clone(), snapshot.clone())
                    .await;
                hits.insert(snapshot.token.clone(), snapshot);
            }
        }

        Ok(tokens.iter().filter_map(|t| hits.remove(t)).collect())
    }
}

/// Fixed snapshots, for tests and offline runs.
pub struct StaticMarketData {
    snapshots: Vec<MarketSnapshot>,
}

impl StaticMarketData {
    pub fn new(snapshots: Vec<MarketSnapshot>) -> Self {
        Self { snapshots }
    }
}

#[async_trait]
impl MarketDataSource for StaticMarketData {
    async fn fetch_prices(&self, tokens: &[String]) -> Result<Vec<MarketSnapshot>, AgentError> {
        Ok(self
            .snapshots
            .iter()
            .filter(|s| tokens.contains(&s.token))
            .cloned()
            .collect())
    }
}
