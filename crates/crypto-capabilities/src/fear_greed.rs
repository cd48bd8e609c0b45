//! Fear and Greed Capability
//!
//! Reads the crypto fear and greed index from alternative.me. Needs no
//! credentials.

use agent_core::{AgentError, Capability, JsonMap, OperationSpec, Result as CoreResult};
use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::{check_status, USER_AGENT};

const CAPABILITY_ID: &str = "feargreed";
const GET_INDEX: &str = "feargreed_get_index_tool";

const DEFAULT_BASE_URL: &str = "https://api.alternative.me";

/// Capability provider for the fear and greed index.
pub struct FearGreedCapability {
    http: reqwest::Client,
    base_url: String,
}

impl FearGreedCapability {
    pub fn new() -> Result<Self> {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(std::time::Duration::from_secs(60))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }

    async fn get_index(&self) -> Result<Value> {
        let url = format!("{}/fng/", self.base_url);
        let response = self.http.get(&url).send().await?;
        let response = check_status(response).await?;
        Ok(response.json().await?)
    }
}

#[async_trait]
impl Capability for FearGreedCapability {
    fn id(&self) -> &str {
        CAPABILITY_ID
    }

    fn operations(&self) -> Vec<OperationSpec> {
        vec![OperationSpec::new(
            GET_INDEX,
            "Get the current crypto fear and greed index (0 = extreme fear, 100 = extreme greed).",
        )]
    }

    async fn invoke(&self, operation: &str, _args: &JsonMap) -> CoreResult<Value> {
        match operation {
            GET_INDEX => Ok(self.get_index().await?),
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

    #[test]
    fn declares_one_parameterless_operation() {
        let capability = FearGreedCapability::new().unwrap();
        let ops = capability.operations();
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].name, GET_INDEX);
        assert!(ops[0].params.is_empty());
    }

    #[tokio::test]
    async fn unknown_operation_is_rejected() {
        let capability = FearGreedCapability::new().unwrap();
        let result = capability.invoke("feargreed_nope_tool", &JsonMap::new()).await;
        assert!(matches!(result, Err(AgentError::UnknownOperation { .. })));
    }
}
