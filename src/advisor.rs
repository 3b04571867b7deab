use crate::charts::format_table;
use crate::config::AdvisorSettings;
use crate::errors::{AppError, AppResult};
use crate::models::{AnswerSource, RiskRow};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const FALLBACK_ANSWER: &str =
    "AI unavailable in cloud. Run locally with Ollama for full AI support.";

#[async_trait]
pub trait Advisor: Send + Sync {
    fn name(&self) -> &str;
    async fn generate(&self, prompt: &str) -> AppResult<String>;
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

/// Non-streaming client for a local Ollama `/api/generate` endpoint.
pub struct OllamaAdvisor {
    client: reqwest::Client,
    endpoint: String,
    model: String,
}

impl OllamaAdvisor {
    pub fn new(settings: &AdvisorSettings) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|error| AppError::Internal(error.to_string()))?;
        Ok(Self {
            client,
            endpoint: settings.endpoint.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
        })
    }
}

#[async_trait]
impl Advisor for OllamaAdvisor {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn generate(&self, prompt: &str) -> AppResult<String> {
        let url = format!("{}/api/generate", self.endpoint);
        let response = self
            .client
            .post(&url)
            .json(&GenerateRequest {
                model: &self.model,
                prompt,
                stream: false,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AppError::Advisor(format!("ollama returned {}", response.status())));
        }

        let body: GenerateResponse = response.json().await?;
        Ok(body.response)
    }
}

/// Stand-in used when the advisor is switched off in settings.
pub struct DisabledAdvisor;

#[async_trait]
impl Advisor for DisabledAdvisor {
    fn name(&self) -> &str {
        "disabled"
    }

    async fn generate(&self, _prompt: &str) -> AppResult<String> {
        Err(AppError::Advisor("advisor disabled by configuration".to_string()))
    }
}

pub fn build_advisor(settings: &AdvisorSettings) -> AppResult<Box<dyn Advisor>> {
    if !settings.enabled {
        return Ok(Box::new(DisabledAdvisor));
    }
    Ok(Box::new(OllamaAdvisor::new(settings)?))
}

pub fn build_prompt(question: &str, rows: Option<&[RiskRow]>) -> String {
    let data = match rows {
        Some(rows) => format_table(rows),
        None => "None".to_string(),
    };
    format!("Project data:\n{}\n\nQuestion:{}", data, question)
}

/// Asks the advisor, substituting [`FALLBACK_ANSWER`] for any failure.
pub async fn answer_or_fallback(advisor: &dyn Advisor, prompt: &str) -> (String, AnswerSource) {
    match advisor.generate(prompt).await {
        Ok(answer) => (answer, AnswerSource::Model),
        Err(error) => {
            tracing::warn!(advisor = advisor.name(), error = %error, "advisor unavailable, using fallback");
            (FALLBACK_ANSWER.to_string(), AnswerSource::Fallback)
        }
    }
}
