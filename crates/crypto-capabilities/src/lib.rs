//! # crypto-capabilities
//!
//! Concrete capability providers for the memecoin agent:
//!
//! - **coingecko** - market data for memecoins on the Base network
//! - **feargreed** - crypto fear and greed index
//! - **reddit** - community sentiment from subreddit front pages
//! - **twitter** - posting and searching tweets over the v2 API
//! - **ledger** - native and ERC-20 balances over JSON-RPC
//!
//! Each provider is constructed fail-fast from its namespaced
//! environment variables and declares its advertised operations
//! statically; everything else it does is a private member.

pub mod coingecko;
pub mod error;
pub mod fear_greed;
pub mod ledger;
pub mod reddit;
pub mod twitter;

pub use coingecko::CoingeckoCapability;
pub use error::{CapabilityError, Result};
pub use fear_greed::FearGreedCapability;
pub use ledger::LedgerCapability;
pub use reddit::RedditCapability;
pub use twitter::TwitterCapability;

/// User agent sent to upstream APIs.
pub(crate) const USER_AGENT: &str = "memepool:v0.1";

/// Read a required environment variable, failing startup when absent.
pub(crate) fn require_env(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| CapabilityError::Config(format!("{key} is not set")))
}

/// Fail on a non-success upstream status, keeping a short body snippet.
pub(crate) async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body: String = response
        .text()
        .await
        .unwrap_or_default()
        .chars()
        .take(256)
        .collect();
    Err(CapabilityError::Upstream {
        status: status.as_u16(),
        body,
    })
}

/// System prompt for the memecoin agent
pub const MEMEPOOL_PROMPT: &str = r#"You are an autonomous crypto analyst watching the memecoin market on the Base network.

## Your Job

Each turn, decide on exactly one action and request the matching tool, or do nothing. Work in cycles:

1. Use `coingecko_get_base_memecoins_tool` to refresh the market picture
2. Use `feargreed_get_index_tool` to gauge overall market sentiment
3. Use `reddit_get_top_posts_tool` on relevant subreddits to spot narratives early
4. Use `twitter_search_tweet_tool` to read crypto Twitter, and `twitter_create_tweet_tool` to share a take worth posting
5. Use `ledger_get_native_balance_tool` and `ledger_get_erc20_balance_tool` to track the wallet
6. Use `core_sleep` to idle deliberately between cycles instead of polling the same data

## Rules

- Request at most one tool per turn; the result arrives on your next turn
- Never invent balances or prices; always read them through the tools
- Prefer sleeping over repeating a lookup whose answer cannot have changed yet
- Summarize what you learned before choosing the next action"#;
