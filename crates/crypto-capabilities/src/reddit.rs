//! Reddit Capability
//!
//! Community sentiment from subreddit front pages, via the app-only
//! OAuth flow (client credentials, no user context).

use std::time::{Duration, Instant};

use agent_core::{AgentError, Capability, JsonMap, OperationSpec, ParamKind, Result as CoreResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Mutex;

use crate::error::{CapabilityError, Result};
use crate::{check_status, require_env, USER_AGENT};

const CAPABILITY_ID: &str = "reddit";
const GET_TOP_POSTS: &str = "reddit_get_top_posts_tool";

const DEFAULT_TOKEN_URL: &str = "https://www.reddit.com/api/v1/access_token";
const DEFAULT_API_URL: &str = "https://oauth.reddit.com";

const DEFAULT_POSTS_LIMIT: u64 = 10;
const MAX_POSTS_LIMIT: u64 = 100;

/// Refresh the token this long before it actually expires.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

#[derive(Clone)]
struct CachedToken {
    value: String,
    expires_at: Instant,
}

/// Capability provider for Reddit reads.
pub struct RedditCapability {
    http: reqwest::Client,
    client_id: String,
    client_secret: String,
    token_url: String,
    api_url: String,
    token: Mutex<Option<CachedToken>>,
}

impl RedditCapability {
    /// Construct from `REDDIT_CLIENT_ID` / `REDDIT_CLIENT_SECRET`.
    pub fn from_env() -> Result<Self> {
        let client_id = require_env("REDDIT_CLIENT_ID")?;
        let client_secret = require_env("REDDIT_CLIENT_SECRET")?;
        Self::new(client_id, client_secret)
    }

    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(std::time::Duration::from_secs(60))
            .build()?;

        Ok(Self {
            http,
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            token_url: DEFAULT_TOKEN_URL.into(),
            api_url: DEFAULT_API_URL.into(),
            token: Mutex::new(None),
        })
    }

    /// Current bearer token, refreshed when missing or about to expire.
    async fn bearer_token(&self) -> Result<String> {
        let mut cached = self.token.lock().await;

        if let Some(token) = cached.as_ref() {
            if token.expires_at > Instant::now() + TOKEN_EXPIRY_MARGIN {
                return Ok(token.value.clone());
            }
        }

        #[derive(Deserialize)]
        struct TokenResponse {
            access_token: String,
            expires_in: u64,
        }

        let response = self
            .http
            .post(&self.token_url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?;
        let response = check_status(response).await?;
        let token: TokenResponse = response.json().await?;

        let value = token.access_token.clone();
        *cached = Some(CachedToken {
            value: token.access_token,
            expires_at: Instant::now() + Duration::from_secs(token.expires_in),
        });

        Ok(value)
    }

    async fn get_top_posts(&self, subreddit: &str, limit: u64) -> Result<Value> {
        validate_subreddit(subreddit)?;
        let limit = limit.clamp(1, MAX_POSTS_LIMIT);

        let token = self.bearer_token().await?;
        let url = format!("{}/r/{subreddit}/hot", self.api_url);
        let response = self
            .http
            .get(&url)
            .bearer_auth(token)
            .query(&[("limit", limit.to_string())])
            .send()
            .await?;
        let response = check_status(response).await?;

        let listing: Listing = response.json().await?;
        let posts: Vec<PostSummary> = listing
            .data
            .children
            .into_iter()
            .map(|child| child.data)
            .collect();

        tracing::debug!(subreddit, posts = posts.len(), "fetched subreddit front page");
        Ok(serde_json::to_value(posts)?)
    }
}

#[async_trait]
impl Capability for RedditCapability {
    fn id(&self) -> &str {
        CAPABILITY_ID
    }

    fn operations(&self) -> Vec<OperationSpec> {
        vec![OperationSpec::new(
            GET_TOP_POSTS,
            "Get the top posts for a given subreddit. Returns title, score and URL per post.",
        )
        .param(
            "subreddit_name",
            ParamKind::String,
            "Subreddit to read, without the 'r/' prefix",
            true,
        )
        .param(
            "posts_limit",
            ParamKind::Integer,
            "How many posts to return (default 10, max 100)",
            false,
        )]
    }

    async fn invoke(&self, operation: &str, args: &JsonMap) -> CoreResult<Value> {
        match operation {
            GET_TOP_POSTS => {
                let subreddit = args
                    .get("subreddit_name")
                    .and_then(Value::as_str)
                    .ok_or_else(|| {
                        AgentError::InvalidArguments("subreddit_name is required".into())
                    })?;
                let limit = args
                    .get("posts_limit")
                    .and_then(Value::as_u64)
                    .unwrap_or(DEFAULT_POSTS_LIMIT);

                Ok(self.get_top_posts(subreddit, limit).await?)
            }
            other => Err(AgentError::UnknownOperation {
                capability: CAPABILITY_ID.into(),
                operation: other.into(),
            }),
        }
    }
}

/// Subreddit names are alphanumeric plus underscore; anything else
/// would end up in the request path.
fn validate_subreddit(subreddit: &str) -> Result<()> {
    let valid = !subreddit.is_empty()
        && subreddit.len() <= 50
        && subreddit
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');

    if valid {
        Ok(())
    } else {
        Err(CapabilityError::InvalidArgument(format!(
            "invalid subreddit name: {subreddit:?}"
        )))
    }
}

#[derive(Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<ListingChild>,
}

#[derive(Deserialize)]
struct ListingChild {
    data: PostSummary,
}

/// One post, trimmed to what the agent needs.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PostSummary {
    pub title: String,
    #[serde(default)]
    pub score: i64,
    #[serde(default)]
    pub url: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn capability() -> RedditCapability {
        RedditCapability::new("id", "secret").unwrap()
    }

    #[test]
    fn declares_the_posts_operation_with_its_schema() {
        let ops = capability().operations();
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].name, GET_TOP_POSTS);
        assert_eq!(ops[0].params.len(), 2);
        assert!(ops[0].params[0].required);
        assert!(!ops[0].params[1].required);
    }

    #[test]
    fn subreddit_names_are_validated() {
        assert!(validate_subreddit("CryptoCurrency").is_ok());
        assert!(validate_subreddit("base_memes").is_ok());
        assert!(validate_subreddit("").is_err());
        assert!(validate_subreddit("a/b").is_err());
        assert!(validate_subreddit("nice try?limit=1000").is_err());
    }

    #[tokio::test]
    async fn missing_subreddit_argument_is_invalid() {
        let result = capability().invoke(GET_TOP_POSTS, &JsonMap::new()).await;
        assert!(matches!(result, Err(AgentError::InvalidArguments(_))));
    }

    #[test]
    fn listing_parses_into_post_summaries() {
        let listing: Listing = serde_json::from_value(json!({
            "data": {
                "children": [
                    { "data": { "title": "gm", "score": 420, "url": "https://example.com" } }
                ]
            }
        }))
        .unwrap();
        assert_eq!(listing.data.children.len(), 1);
        assert_eq!(listing.data.children[0].data.title, "gm");
    }
}
