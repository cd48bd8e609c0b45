//! Coingecko Capability
//!
//! Market data for memecoins on the Base network.

use agent_core::{Capability, JsonMap, OperationSpec, Result as CoreResult};
use agent_core::AgentError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::{check_status, require_env, USER_AGENT};

const CAPABILITY_ID: &str = "coingecko";
const GET_BASE_MEMECOINS: &str = "coingecko_get_base_memecoins_tool";

const DEFAULT_BASE_URL: &str = "https://api.coingecko.com";

/// One market entry, trimmed to what the agent needs.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MarketEntry {
    pub id: String,
    pub symbol: String,
    pub name: String,
    pub current_price: Option<f64>,
    pub market_cap: Option<f64>,
    pub price_change_percentage_24h: Option<f64>,
}

/// Capability provider for Coingecko market data.
pub struct CoingeckoCapability {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl CoingeckoCapability {
    /// Construct from `COINGECKO_API_KEY`. Fail-fast: a missing key is
    /// a startup error, not a runtime surprise.
    pub fn from_env() -> Result<Self> {
        let api_key = require_env("COINGECKO_API_KEY")?;
        Self::new(api_key, DEFAULT_BASE_URL)
    }

    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(std::time::Duration::from_secs(60))
            .build()?;

        Ok(Self {
            http,
            api_key: api_key.into(),
            base_url: base_url.into(),
        })
    }

    /// Fetch the Base-network memecoin market, ordered by market cap.
    async fn get_base_memecoins(&self) -> Result<Value> {
        let url = format!("{}/api/v3/coins/markets", self.base_url);

        let response = self
            .http
            .get(&url)
            .query(&[
                ("vs_currency", "usd"),
                ("category", "base-meme-coins"),
                ("order", "market_cap_desc"),
                ("per_page", "100"),
                ("page", "1"),
                ("sparkline", "false"),
                ("locale", "en"),
            ])
            .header("x-cg-demo-api-key", &self.api_key)
            .send()
            .await?;
        let response = check_status(response).await?;

        let markets: Vec<MarketEntry> = response.json().await?;
        tracing::debug!(entries = markets.len(), "fetched base memecoin market");

        Ok(serde_json::to_value(markets)?)
    }
}

#[async_trait]
impl Capability for CoingeckoCapability {
    fn id(&self) -> &str {
        CAPABILITY_ID
    }

    fn operations(&self) -> Vec<OperationSpec> {
        vec![OperationSpec::new(
            GET_BASE_MEMECOINS,
            "Get memecoins on the Base network, ordered by market cap. \
             Returns price, market cap and 24h change per coin.",
        )]
    }

    async fn invoke(&self, operation: &str, _args: &JsonMap) -> CoreResult<Value> {
        match operation {
            GET_BASE_MEMECOINS => Ok(self.get_base_memecoins().await?),
            other => Err(AgentError::UnknownOperation {
                capability: CAPABILITY_ID.into(),
                operation: other.into(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn capability() -> CoingeckoCapability {
        CoingeckoCapability::new("test-key", DEFAULT_BASE_URL).unwrap()
    }

    #[test]
    fn declares_one_advertised_operation() {
        let ops = capability().operations();
        assert_eq!(ops.len(), 1);
        assert!(ops[0].is_advertised());
        assert_eq!(ops[0].provider_prefix(), CAPABILITY_ID);
    }

    #[tokio::test]
    async fn unknown_operation_is_rejected() {
        let result = capability()
            .invoke("coingecko_unknown_tool", &JsonMap::new())
            .await;
        assert!(matches!(
            result,
            Err(AgentError::UnknownOperation { .. })
        ));
    }

    #[test]
    fn market_entry_tolerates_missing_numbers() {
        let entry: MarketEntry = serde_json::from_value(serde_json::json!({
            "id": "toshi",
            "symbol": "toshi",
            "name": "Toshi",
            "current_price": null,
            "market_cap": null,
            "price_change_percentage_24h": null
        }))
        .unwrap();
        assert!(entry.current_price.is_none());
    }
}
