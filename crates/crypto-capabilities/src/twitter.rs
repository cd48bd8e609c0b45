//! Twitter Capability
//!
//! Posting and searching on Twitter over the v2 REST API, with an
//! OAuth 2.0 user-context bearer token. The agent uses it to push
//! narratives out and to read what the market is talking about.

use agent_core::{AgentError, Capability, JsonMap, OperationSpec, ParamKind, Result as CoreResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{CapabilityError, Result};
use crate::{check_status, require_env, USER_AGENT};

const CAPABILITY_ID: &str = "twitter";
const CREATE_TWEET: &str = "twitter_create_tweet_tool";
const SEARCH_TWEET: &str = "twitter_search_tweet_tool";

const DEFAULT_API_URL: &str = "https://api.twitter.com";

const MAX_TWEET_CHARS: usize = 280;

const DEFAULT_SEARCH_COUNT: u64 = 20;
/// The recent-search endpoint accepts 10 to 100 results per page.
const MIN_SEARCH_COUNT: u64 = 10;
const MAX_SEARCH_COUNT: u64 = 100;
const MAX_QUERY_CHARS: usize = 512;

/// Capability provider for Twitter reads and writes.
pub struct TwitterCapability {
    http: reqwest::Client,
    bearer_token: String,
    api_url: String,
}

impl TwitterCapability {
    /// Construct from `TWITTER_BEARER_TOKEN`.
    pub fn from_env() -> Result<Self> {
        let bearer_token = require_env("TWITTER_BEARER_TOKEN")?;
        Self::new(bearer_token)
    }

    pub fn new(bearer_token: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(std::time::Duration::from_secs(60))
            .build()?;

        Ok(Self {
            http,
            bearer_token: bearer_token.into(),
            api_url: DEFAULT_API_URL.into(),
        })
    }

    async fn create_tweet(&self, text: &str) -> Result<Value> {
        validate_tweet_text(text)?;

        let url = format!("{}/2/tweets", self.api_url);
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.bearer_token)
            .json(&json!({ "text": text }))
            .send()
            .await?;
        let response = check_status(response).await?;

        let created: CreatedTweet = response.json().await?;
        tracing::info!(id = %created.data.id, "tweet posted");
        Ok(json!({
            "id": created.data.id,
            "text": created.data.text,
        }))
    }

    async fn search_tweet(&self, query: &str, count: u64) -> Result<Value> {
        validate_query(query)?;
        let count = count.clamp(MIN_SEARCH_COUNT, MAX_SEARCH_COUNT);

        let url = format!("{}/2/tweets/search/recent", self.api_url);
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.bearer_token)
            .query(&[
                ("query", query),
                ("max_results", &count.to_string()),
                ("tweet.fields", "public_metrics,created_at,author_id"),
            ])
            .send()
            .await?;
        let response = check_status(response).await?;

        let page: SearchPage = response.json().await?;
        let tweets: Vec<TweetSummary> = page.data.into_iter().map(TweetSummary::from).collect();

        tracing::debug!(query, tweets = tweets.len(), "searched recent tweets");
        Ok(serde_json::to_value(tweets)?)
    }
}

#[async_trait]
impl Capability for TwitterCapability {
    fn id(&self) -> &str {
        CAPABILITY_ID
    }

    fn operations(&self) -> Vec<OperationSpec> {
        vec![
            OperationSpec::new(CREATE_TWEET, "Post a new tweet. Returns the created tweet's id.")
                .param(
                    "text",
                    ParamKind::String,
                    "Tweet body, at most 280 characters",
                    true,
                ),
            OperationSpec::new(
                SEARCH_TWEET,
                "Search recent tweets matching a query. Returns text and engagement metrics per tweet.",
            )
            .param("query", ParamKind::String, "Search query", true)
            .param(
                "count",
                ParamKind::Integer,
                "How many tweets to return (default 20, max 100)",
                false,
            ),
        ]
    }

    async fn invoke(&self, operation: &str, args: &JsonMap) -> CoreResult<Value> {
        match operation {
            CREATE_TWEET => {
                let text = args.get("text").and_then(Value::as_str).ok_or_else(|| {
                    AgentError::InvalidArguments("text is required".into())
                })?;

                Ok(self.create_tweet(text).await?)
            }
            SEARCH_TWEET => {
                let query = args.get("query").and_then(Value::as_str).ok_or_else(|| {
                    AgentError::InvalidArguments("query is required".into())
                })?;
                let count = args
                    .get("count")
                    .and_then(Value::as_u64)
                    .unwrap_or(DEFAULT_SEARCH_COUNT);

                Ok(self.search_tweet(query, count).await?)
            }
            other => Err(AgentError::UnknownOperation {
                capability: CAPABILITY_ID.into(),
                operation: other.into(),
            }),
        }
    }
}

fn validate_tweet_text(text: &str) -> Result<()> {
    let length = text.chars().count();
    if text.trim().is_empty() || length > MAX_TWEET_CHARS {
        return Err(CapabilityError::InvalidArgument(format!(
            "tweet text must be 1 to {MAX_TWEET_CHARS} characters, got {length}"
        )));
    }
    Ok(())
}

fn validate_query(query: &str) -> Result<()> {
    let length = query.chars().count();
    if query.trim().is_empty() || length > MAX_QUERY_CHARS {
        return Err(CapabilityError::InvalidArgument(format!(
            "search query must be 1 to {MAX_QUERY_CHARS} characters, got {length}"
        )));
    }
    Ok(())
}

#[derive(Deserialize)]
struct CreatedTweet {
    data: CreatedTweetData,
}

#[derive(Deserialize)]
struct CreatedTweetData {
    id: String,
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct SearchPage {
    #[serde(default)]
    data: Vec<SearchTweet>,
}

#[derive(Deserialize)]
struct SearchTweet {
    id: String,
    text: String,
    #[serde(default)]
    author_id: Option<String>,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    public_metrics: Metrics,
}

#[derive(Default, Deserialize)]
struct Metrics {
    #[serde(default)]
    like_count: i64,
    #[serde(default)]
    retweet_count: i64,
    #[serde(default)]
    quote_count: i64,
}

/// One tweet, trimmed to what the agent needs.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TweetSummary {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub author_id: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub like_count: i64,
    #[serde(default)]
    pub retweet_count: i64,
    #[serde(default)]
    pub quote_count: i64,
}

impl From<SearchTweet> for TweetSummary {
    fn from(tweet: SearchTweet) -> Self {
        Self {
            id: tweet.id,
            text: tweet.text,
            author_id: tweet.author_id,
            created_at: tweet.created_at,
            like_count: tweet.public_metrics.like_count,
            retweet_count: tweet.public_metrics.retweet_count,
            quote_count: tweet.public_metrics.quote_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn capability() -> TwitterCapability {
        TwitterCapability::new("token").unwrap()
    }

    #[test]
    fn declares_post_and_search_operations_with_their_schemas() {
        let ops = capability().operations();
        let names: Vec<&str> = ops.iter().map(|op| op.name.as_str()).collect();
        assert_eq!(names, vec![CREATE_TWEET, SEARCH_TWEET]);

        assert!(ops[0].params[0].required);
        assert_eq!(ops[1].params.len(), 2);
        assert!(ops[1].params[0].required);
        assert!(!ops[1].params[1].required);
    }

    #[test]
    fn tweet_text_is_bounded() {
        assert!(validate_tweet_text("gm, memecoins are moving").is_ok());
        assert!(validate_tweet_text("").is_err());
        assert!(validate_tweet_text("   ").is_err());
        assert!(validate_tweet_text(&"x".repeat(281)).is_err());
        assert!(validate_tweet_text(&"x".repeat(280)).is_ok());
    }

    #[test]
    fn search_queries_are_bounded() {
        assert!(validate_query("(brett OR toshi) lang:en").is_ok());
        assert!(validate_query("").is_err());
        assert!(validate_query(&"q".repeat(513)).is_err());
    }

    #[tokio::test]
    async fn missing_arguments_are_invalid() {
        let capability = capability();

        let result = capability.invoke(CREATE_TWEET, &JsonMap::new()).await;
        assert!(matches!(result, Err(AgentError::InvalidArguments(_))));

        let result = capability.invoke(SEARCH_TWEET, &JsonMap::new()).await;
        assert!(matches!(result, Err(AgentError::InvalidArguments(_))));
    }

    #[test]
    fn search_page_parses_into_tweet_summaries() {
        let page: SearchPage = serde_json::from_value(serde_json::json!({
            "data": [
                {
                    "id": "1",
                    "text": "brett to the moon",
                    "author_id": "42",
                    "created_at": "2026-08-26T00:00:00.000Z",
                    "public_metrics": { "like_count": 7, "retweet_count": 2, "quote_count": 1 }
                },
                { "id": "2", "text": "no metrics here" }
            ]
        }))
        .unwrap();

        let tweets: Vec<TweetSummary> = page.data.into_iter().map(TweetSummary::from).collect();
        assert_eq!(tweets.len(), 2);
        assert_eq!(tweets[0].like_count, 7);
        assert_eq!(tweets[1].like_count, 0);
    }

    #[test]
    fn empty_search_page_parses() {
        let page: SearchPage = serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(page.data.is_empty());
    }
}
