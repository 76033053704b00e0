use crate::{SummaryError, Summarizer};
use async_trait::async_trait;
use mitosis_core::SummaryConfig;
use mitosis_data::RunRecord;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const SYSTEM_PROMPT: &str = "You are a software simulation logger. Provide a concise \
3-sentence summary of the simulation run. Do not output internal thoughts.";

/// Chat-completions client for a local LM Studio (or any OpenAI-compatible) server.
pub struct LmStudioSummarizer {
    client: reqwest::Client,
    base_url: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    timeout: Duration,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
    stream: bool,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl LmStudioSummarizer {
    #[must_use]
    pub fn new(config: &SummaryConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url)
    }
}

#[async_trait]
impl Summarizer for LmStudioSummarizer {
    async fn summarize(&self, records: &[RunRecord]) -> Result<String, SummaryError> {
        if records.is_empty() {
            return Ok("No data pending analysis.".to_string());
        }
        let metrics = serde_json::to_string(records)
            .map_err(|e| SummaryError::Service(format!("encoding records: {e}")))?;
        let prompt = format!("Summarize these simulation metrics: {metrics}");

        let request = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt,
                },
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            stream: false,
        };

        tracing::debug!(endpoint = %self.endpoint(), runs = records.len(), "Requesting summary");
        let response: ChatResponse = self
            .client
            .post(self.endpoint())
            .timeout(self.timeout)
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content);
        Ok(match content {
            Some(raw) => clean_response(&raw),
            None => "Log entry empty.".to_string(),
        })
    }
}

/// Drops `<think>…</think>` blocks and code fences from a model answer.
#[must_use]
pub fn clean_response(raw: &str) -> String {
    const OPEN: &str = "<think>";
    const CLOSE: &str = "</think>";

    let mut kept = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(start) = rest.find(OPEN) {
        let Some(len) = rest[start..].find(CLOSE) else {
            break;
        };
        kept.push_str(&rest[..start]);
        rest = &rest[start + len + CLOSE.len()..];
    }
    kept.push_str(rest);
    kept.trim().replace("```", "")
}
