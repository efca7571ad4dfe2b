//! Evaluator client: turns a history comparison into optimization feedback.

use crate::config::LlmConfig;
use async_trait::async_trait;
use energy_eval::{Comparison, IndexedRecord, Status};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

#[derive(Debug, thiserror::Error)]
pub enum EvaluatorError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("evaluator API error ({status}): {body}")]
    Api { status: u16, body: String },
    #[error("evaluator returned no content")]
    EmptyResponse,
}

/// Why the previous candidate did not reach measurement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics {
    pub status: Status,
    pub output: String,
}

/// Everything the evaluator sees for one iteration.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedbackRequest {
    pub comparison: Comparison,
    /// Failure output of the previous candidate, if it failed
    pub diagnostics: Option<Diagnostics>,
    /// Structural view of the current code from the analysis helper
    pub structure: Option<String>,
}

impl FeedbackRequest {
    pub fn new(comparison: Comparison) -> Self {
        Self {
            comparison,
            diagnostics: None,
            structure: None,
        }
    }

    /// Render the user prompt.
    pub fn prompt(&self) -> String {
        let mut out = String::from(
            "Evaluate the current code below for time complexity, space complexity, \
             energy usage and performance, relative to the original code and to the \
             lowest-energy version found so far. Analyse its efficiency and energy \
             consumption and propose further optimizations.\n",
        );

        section(&mut out, "Original code", &self.comparison.original);
        section(&mut out, "Lowest-energy code so far", &self.comparison.lowest_avg_energy);
        section(&mut out, "Current code to optimize", &self.comparison.current);

        if let Some(diag) = &self.diagnostics {
            let _ = write!(
                out,
                "\nThe previous attempt ended with status {}. Its output was:\n```\n{}\n```\n",
                diag.status,
                diag.output.trim_end()
            );
        }
        if let Some(structure) = &self.structure {
            let _ = write!(
                out,
                "\nStructure of the current code:\n```\n{}\n```\n",
                structure.trim_end()
            );
        }

        out.push_str(
            "\nAnswer in English with actionable suggestions for reducing the energy usage \
             of the current code, then give the complete optimized code with the lowest \
             energy usage in a single fenced code block.\n",
        );
        out
    }
}

fn section(out: &mut String, title: &str, entry: &IndexedRecord) {
    let record = &entry.record;
    let _ = write!(
        out,
        "\n{title} (iteration {}):\n```\n{}\n```\nAverage energy usage: {}\nAverage run time: {}\n",
        entry.index,
        record.source_code().trim_end(),
        record.avg_energy(),
        record.avg_latency()
    );
}

/// Source of optimization feedback.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EvaluatorClient: Send + Sync {
    /// Return feedback text with the next candidate in a fenced code block.
    async fn feedback(&self, request: &FeedbackRequest) -> Result<String, EvaluatorError>;
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

const SYSTEM_PROMPT: &str = "You are a code optimization assistant. You review source code \
    together with its measured energy usage and run time and suggest changes that lower \
    energy consumption without changing behaviour.";

/// Evaluator backed by an OpenAI-compatible chat completions endpoint.
#[derive(Clone)]
pub struct HttpEvaluator {
    http: reqwest::Client,
    config: LlmConfig,
    api_key: Option<String>,
}

impl HttpEvaluator {
    pub fn new(config: LlmConfig, api_key: Option<String>) -> Result<Self, EvaluatorError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;
        Ok(Self {
            http,
            config,
            api_key,
        })
    }

    fn chat_request(&self, prompt: String) -> ChatRequest {
        ChatRequest {
            model: self.config.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: prompt,
                },
            ],
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        }
    }
}

fn reply_content(response: ChatResponse) -> Result<String, EvaluatorError> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|content| !content.trim().is_empty())
        .ok_or(EvaluatorError::EmptyResponse)
}

#[async_trait]
impl EvaluatorClient for HttpEvaluator {
    async fn feedback(&self, request: &FeedbackRequest) -> Result<String, EvaluatorError> {
        let body = self.chat_request(request.prompt());
        let mut builder = self.http.post(self.config.completions_url()).json(&body);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(EvaluatorError::Api { status, body });
        }

        let chat: ChatResponse = response.json().await?;
        let content = reply_content(chat)?;
        tracing::debug!(model = %self.config.model, chars = content.len(), "Evaluator replied");
        Ok(content)
    }
}
