use std::sync::LazyLock;
use std::time::Instant;

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use spider_client::shapes::request::{ReturnFormat, ReturnFormatHandling};
use spider_client::{RequestParams, Spider};
use tracing::debug;

use super::ExtractionEngine;
use crate::error::EngineError;
use crate::settings::Settings;

static IMAGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"!\[[^\]]*\]\([^)]*\)").expect("valid image regex"));
static BLANKS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid blank-line regex"));

const SYSTEM_PROMPT: &str = "You extract structured data from web pages. \
     Reply with a single JSON object and nothing else.";

/// spider.cloud renders the page to markdown, then a chat model pulls the
/// requested fields out of it as JSON.
pub struct SmartScraper {
    spider: Spider,
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl SmartScraper {
    pub fn new(settings: &Settings) -> Result<Self, EngineError> {
        let spider_key = settings
            .spider_api_key
            .clone()
            .ok_or_else(|| EngineError::Config("SPIDER_API_KEY must be set".into()))?;
        let api_key = settings
            .openai_key
            .clone()
            .ok_or_else(|| EngineError::Config("OPENAI_KEY must be set".into()))?;
        let spider = Spider::new(Some(spider_key))
            .map_err(|e| EngineError::Config(format!("failed to create Spider client: {}", e)))?;

        Ok(Self {
            spider,
            http: reqwest::Client::new(),
            api_key,
            model: settings.model.clone(),
            base_url: settings.openai_base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Fetch `url` as markdown with images stripped.
    async fn fetch_markdown(&self, url: &str) -> Result<String, EngineError> {
        let params = RequestParams {
            return_format: Some(ReturnFormatHandling::Single(ReturnFormat::Markdown)),
            ..Default::default()
        };

        let start = Instant::now();
        let response = self
            .spider
            .scrape_url(url, Some(params), "application/json")
            .await
            .map_err(|e| EngineError::Fetch(e.to_string()))?;
        debug!(url, latency_ms = start.elapsed().as_millis() as u64, "page fetched");

        let parsed: Value = match response.as_str() {
            Some(s) => serde_json::from_str(s).unwrap_or(response.clone()),
            None => response,
        };

        parsed
            .as_array()
            .and_then(|arr| arr.first())
            .and_then(|obj| obj.get("content"))
            .and_then(|c| c.as_str())
            .map(strip_images)
            .filter(|md| !md.trim().is_empty())
            .ok_or_else(|| EngineError::EmptyPage {
                url: url.to_string(),
            })
    }

    /// Ask the chat model for the fields as a JSON object.
    async fn complete_json(&self, instruction: &str, markdown: &str) -> Result<Value, EngineError> {
        let request = ChatRequest {
            model: &self.model,
            temperature: 0.0,
            response_format: ResponseFormat { kind: "json_object" },
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: format!("{}\n\nPage content:\n\n{}", instruction.trim(), markdown),
                },
            ],
        };

        let start = Instant::now();
        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EngineError::Llm(format!("{}: {}", status, body)));
        }

        let completion: ChatResponse = response.json().await?;
        debug!(model = %self.model, latency_ms = start.elapsed().as_millis() as u64, "completion received");

        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| EngineError::Llm("empty completion".into()))?;

        Ok(serde_json::from_str(strip_code_fence(&content))?)
    }
}

#[async_trait]
impl ExtractionEngine for SmartScraper {
    async fn extract(&self, url: &str, instruction: &str) -> Result<Value, EngineError> {
        let markdown = self.fetch_markdown(url).await?;
        self.complete_json(instruction, &markdown).await
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    response_format: ResponseFormat,
    messages: Vec<ChatMessage>,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

/// Remove markdown image syntax: ![alt](url) and [![alt](url)](link)
fn strip_images(md: &str) -> String {
    let cleaned = IMAGE_RE.replace_all(md, "");
    BLANKS_RE.replace_all(&cleaned, "\n\n").to_string()
}

/// Some models wrap JSON in ```json fences even in JSON mode.
fn strip_code_fence(s: &str) -> &str {
    let trimmed = s.trim();
    trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .map(str::trim)
        .unwrap_or(trimmed)
}
