//! Model gateway: one narrow call against the Gemini generateContent API.
//!
//! The trait is the main testability seam: stages take `Arc<dyn ModelGateway>`
//! so tests swap in a deterministic stub. No retry, no backoff; a failed call
//! surfaces to the caller as-is.

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use chronos_core::schema::ResponseSchema;

use crate::config::LlmSection;

#[async_trait]
pub trait ModelGateway: Send + Sync {
    /// Ask the model for JSON-only output; when `schema` is given, request
    /// schema-constrained decoding. Returns the raw JSON text; callers parse
    /// it and own decode-failure handling.
    async fn generate_structured(
        &self,
        system_instruction: &str,
        user_prompt: &str,
        schema: Option<&ResponseSchema>,
    ) -> Result<String>;
}

pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    temperature: f32,
}

impl GeminiClient {
    pub fn new(llm: &LlmSection, api_key: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            model: llm.model.clone(),
            base_url: llm.base_url.trim_end_matches('/').to_string(),
            temperature: llm.temperature,
        }
    }
}

#[derive(Serialize)]
struct Part {
    text: String,
}

#[derive(Serialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: String,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<Value>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Req {
    system_instruction: SystemInstruction,
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct SystemInstruction {
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Resp {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<RespPart>,
}

#[derive(Deserialize)]
struct RespPart {
    text: Option<String>,
}

#[async_trait]
impl ModelGateway for GeminiClient {
    async fn generate_structured(
        &self,
        system_instruction: &str,
        user_prompt: &str,
        schema: Option<&ResponseSchema>,
    ) -> Result<String> {
        let body = Req {
            system_instruction: SystemInstruction {
                parts: vec![Part { text: system_instruction.to_string() }],
            },
            contents: vec![Content {
                role: "user".to_string(),
                parts: vec![Part { text: user_prompt.to_string() }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json".to_string(),
                temperature: self.temperature,
                response_schema: schema.map(|s| s.to_gemini()),
            },
        };

        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );

        let resp = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .context("gemini request")?;

        let status = resp.status();
        if !status.is_success() {
            let txt = resp.text().await.unwrap_or_default();
            bail!("gemini error: {status} {txt}");
        }

        let out: Resp = resp.json().await.context("parse gemini response envelope")?;
        let mut s = String::new();
        for part in out
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts)
            .unwrap_or_default()
        {
            if let Some(t) = part.text {
                s.push_str(&t);
            }
        }

        if s.is_empty() {
            bail!("gemini returned no text candidates");
        }
        Ok(s.trim().to_string())
    }
}
