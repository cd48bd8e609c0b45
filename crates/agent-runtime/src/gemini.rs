//! Gemini Reasoning Engine
//!
//! `ReasoningEngine` implementation over the Gemini `generateContent`
//! REST API. The catalog's operation specs are serialized into
//! function declarations once at construction; each send replays the
//! full conversation, since the API is stateless.

use std::time::Duration;

use agent_core::{
    AgentError, EngineResponse, JsonMap, OperationSpec, Outbound, ParamKind, PendingCall,
    ReasoningEngine, ResponsePart, Result, Turn,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

const DEFAULT_MODEL: &str = "gemini-2.0-flash";
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// How much of an error body to keep in logs and error values.
const BODY_SNIPPET_LEN: usize = 512;

/// Gemini transport configuration
#[derive(Clone, Debug)]
pub struct GeminiConfig {
    /// API key (`GEMINI_API_KEY`)
    pub api_key: String,

    /// Model identifier
    pub model: String,

    /// API base URL
    pub base_url: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl GeminiConfig {
    /// Read configuration from the environment. The API key is
    /// required; everything else has defaults.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .map_err(|_| AgentError::Config("GEMINI_API_KEY is not set".into()))?;
        let model = std::env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.into());

        Ok(Self {
            api_key,
            model,
            base_url: DEFAULT_BASE_URL.into(),
            timeout_secs: 120,
        })
    }
}

/// Gemini reasoning-engine transport
pub struct GeminiEngine {
    http: reqwest::Client,
    config: GeminiConfig,
    declarations: Vec<FunctionDeclaration>,
}

impl GeminiEngine {
    /// Create the transport, advertising the given operation set.
    pub fn new(config: GeminiConfig, operations: &[OperationSpec]) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AgentError::Config(e.to_string()))?;

        Ok(Self {
            http,
            declarations: operations.iter().map(FunctionDeclaration::from_spec).collect(),
            config,
        })
    }

    /// Create from environment variables.
    pub fn from_env(operations: &[OperationSpec]) -> Result<Self> {
        Self::new(GeminiConfig::from_env()?, operations)
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url, self.config.model
        )
    }

    /// Convert conversation turns to Gemini contents.
    fn convert_history(history: &[Turn]) -> Vec<Content> {
        let mut contents = Vec::with_capacity(history.len());

        for turn in history {
            match turn {
                Turn::Outbound(Outbound::Prompt(text)) => {
                    contents.push(Content::user(vec![Part::text(text.clone())]));
                }
                Turn::Outbound(Outbound::OperationResult { name, value }) => {
                    contents.push(Content::user(vec![Part {
                        function_response: Some(FunctionResponse {
                            name: name.clone(),
                            response: json!({ "result": value }),
                        }),
                        ..Part::default()
                    }]));
                }
                Turn::Inbound(response) => {
                    let parts: Vec<Part> = response
                        .parts
                        .iter()
                        .filter_map(|part| {
                            if part.text.is_none() && part.call.is_none() {
                                return None;
                            }
                            Some(Part {
                                text: part.text.clone(),
                                function_call: part.call.as_ref().map(|call| FunctionCall {
                                    name: call.name.clone(),
                                    args: call.args.clone(),
                                }),
                                ..Part::default()
                            })
                        })
                        .collect();
                    // The API rejects empty model contents.
                    if !parts.is_empty() {
                        contents.push(Content::model(parts));
                    }
                }
            }
        }

        contents
    }

    /// Convert a Gemini response to the engine wire model.
    fn convert_response(response: GenerateResponse) -> EngineResponse {
        let parts = response
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| content.parts)
            .unwrap_or_default();

        EngineResponse {
            parts: parts
                .into_iter()
                .map(|part| ResponsePart {
                    text: part.text,
                    call: part
                        .function_call
                        .map(|call| PendingCall::new(call.name, call.args)),
                })
                .collect(),
        }
    }
}

#[async_trait]
impl ReasoningEngine for GeminiEngine {
    async fn send(&self, history: &[Turn]) -> Result<EngineResponse> {
        let request = GenerateRequest {
            contents: Self::convert_history(history),
            tools: if self.declarations.is_empty() {
                Vec::new()
            } else {
                vec![ToolDeclarations {
                    function_declarations: self.declarations.clone(),
                }]
            },
        };

        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", &self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AgentError::Engine(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let body = snippet(&response.text().await.unwrap_or_default());
            tracing::warn!(%status, "gemini quota exhausted");
            return Err(AgentError::ResourceExhausted(body));
        }
        if !status.is_success() {
            let body = snippet(&response.text().await.unwrap_or_default());
            tracing::warn!(%status, body = %body, "gemini request rejected");
            return Err(AgentError::Engine(format!("{status}: {body}")));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| AgentError::Engine(e.to_string()))?;

        Ok(Self::convert_response(parsed))
    }
}

fn snippet(body: &str) -> String {
    body.chars().take(BODY_SNIPPET_LEN).collect()
}

const fn kind_name(kind: ParamKind) -> &'static str {
    match kind {
        ParamKind::String => "STRING",
        ParamKind::Number => "NUMBER",
        ParamKind::Integer => "INTEGER",
        ParamKind::Boolean => "BOOLEAN",
    }
}

// ============================================================================
// Wire format
// ============================================================================

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<ToolDeclarations>,
}

#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct ToolDeclarations {
    function_declarations: Vec<FunctionDeclaration>,
}

#[derive(Clone, Serialize)]
struct FunctionDeclaration {
    name: String,
    description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    parameters: Option<ParameterObject>,
}

impl FunctionDeclaration {
    fn from_spec(spec: &OperationSpec) -> Self {
        let mut properties = JsonMap::new();
        let mut required = Vec::new();

        for param in &spec.params {
            properties.insert(
                param.name.clone(),
                json!({
                    "type": kind_name(param.kind),
                    "description": param.description,
                }),
            );
            if param.required {
                required.push(param.name.clone());
            }
        }

        Self {
            name: spec.name.clone(),
            description: spec.description.clone(),
            parameters: if properties.is_empty() {
                None
            } else {
                Some(ParameterObject {
                    kind: "OBJECT".into(),
                    properties,
                    required,
                })
            },
        }
    }
}

#[derive(Clone, Serialize)]
struct ParameterObject {
    #[serde(rename = "type")]
    kind: String,
    properties: JsonMap,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    required: Vec<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

impl Content {
    fn user(parts: Vec<Part>) -> Self {
        Self {
            role: Some("user".into()),
            parts,
        }
    }

    fn model(parts: Vec<Part>) -> Self {
        Self {
            role: Some("model".into()),
            parts,
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    function_call: Option<FunctionCall>,
    #[serde(skip_serializing_if = "Option::is_none")]
    function_response: Option<FunctionResponse>,
}

impl Part {
    fn text(content: String) -> Self {
        Self {
            text: Some(content),
            ..Self::default()
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct FunctionCall {
    name: String,
    #[serde(default)]
    args: JsonMap,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct FunctionResponse {
    name: String,
    response: serde_json::Value,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}
