use std::env;
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use quiz_core::model::{PASSING_PERCENTAGE, QuizOutcome};

use crate::error::MotivationError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone, Debug)]
pub struct MotivationConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
}

impl MotivationConfig {
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let api_key = env::var("QUIZ_AI_API_KEY").ok()?;
        if api_key.trim().is_empty() {
            return None;
        }
        let base_url =
            env::var("QUIZ_AI_BASE_URL").unwrap_or_else(|_| "https://api.openai.com/v1".into());
        let model = env::var("QUIZ_AI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".into());
        Some(Self {
            base_url,
            api_key,
            model,
        })
    }
}

/// Generates the short encouragement line shown on the result screen.
///
/// The text-generation collaborator is optional and unreliable by contract:
/// whether the service is unconfigured, the request times out or fails, or
/// the reply comes back blank, [`encouragement`](Self::encouragement) falls
/// back to one of two fixed messages chosen by whether the run passed.
#[derive(Clone)]
pub struct MotivationService {
    client: Client,
    config: Option<MotivationConfig>,
}

impl MotivationService {
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(MotivationConfig::from_env())
    }

    #[must_use]
    pub fn new(config: Option<MotivationConfig>) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    #[must_use]
    pub fn enabled(&self) -> bool {
        self.config.is_some()
    }

    /// Encouragement for a finished quiz. Never fails.
    pub async fn encouragement(&self, outcome: &QuizOutcome) -> String {
        let prompt = format!(
            "Génère une phrase d'encouragement très courte (max 10 mots) \
             pour un étudiant qui a eu {}/{} au module {}.",
            outcome.score(),
            outcome.total_questions(),
            outcome.module(),
        );

        match self.generate(&prompt).await {
            Ok(text) if !text.is_empty() => text,
            Ok(_) => {
                debug!("blank encouragement reply, using fallback");
                fallback_message(outcome.percentage()).to_owned()
            }
            Err(err) => {
                debug!(error = %err, "encouragement generation failed, using fallback");
                fallback_message(outcome.percentage()).to_owned()
            }
        }
    }

    /// Generate text from a prompt.
    ///
    /// # Errors
    ///
    /// Returns `MotivationError` when the service is disabled, the request
    /// fails or times out, or the response is empty.
    pub async fn generate(&self, prompt: &str) -> Result<String, MotivationError> {
        let config = self.config.as_ref().ok_or(MotivationError::Disabled)?;

        let url = format!("{}/chat/completions", config.base_url.trim_end_matches('/'));
        let payload = ChatRequest {
            model: config.model.clone(),
            messages: vec![ChatMessage {
                role: "user",
                content: prompt.to_string(),
            }],
            temperature: 0.2,
        };

        let response = self
            .client
            .post(url)
            .bearer_auth(&config.api_key)
            .timeout(REQUEST_TIMEOUT)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(MotivationError::HttpStatus(response.status()));
        }

        let body: ChatResponse = response.json().await?;
        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(MotivationError::EmptyResponse)?;

        Ok(content.trim().to_string())
    }
}

/// The two fixed messages used when generation is unavailable.
#[must_use]
pub fn fallback_message(percentage: u32) -> &'static str {
    if percentage >= PASSING_PERCENTAGE {
        "Excellent travail !"
    } else {
        "Continuez vos révisions, vous y êtes presque."
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Debug, Deserialize)]
struct ChatMessageResponse {
    content: Option<String>,
}
