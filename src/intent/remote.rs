//! Classifier backed by an OpenAI-compatible chat completions API

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use super::{ClassifierError, IntentClassifier};
use crate::config::LlmConfig;
use crate::models::Intent;

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

/// Asks a language model to pick one of a fixed set of actions
pub struct RemoteClassifier {
    endpoint: String,
    model: String,
    api_key: String,
    actions: Vec<String>,
    client: reqwest::Client,
}

impl RemoteClassifier {
    pub fn new(config: LlmConfig, api_key: String, actions: Vec<String>) -> Self {
        Self {
            endpoint: config.endpoint(),
            model: config.model(),
            api_key,
            actions,
            client: reqwest::Client::new(),
        }
    }

    /// Build from config, reading the key from `OPENAI_API_KEY`
    pub fn from_env(config: LlmConfig, actions: Vec<String>) -> Result<Self, ClassifierError> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| ClassifierError::Request("OPENAI_API_KEY not set".to_string()))?;
        Ok(Self::new(config, api_key, actions))
    }

    fn system_prompt(&self) -> String {
        format!(
            r#"You classify user requests for a workflow engine.
Known actions: {}

Reply with a single JSON object and nothing else:
{{"action": "<one known action, or \"unknown\">", "confidence": <number between 0 and 1>}}"#,
            self.actions.join(", ")
        )
    }
}

#[async_trait]
impl IntentClassifier for RemoteClassifier {
    async fn query(&self, prompt: &str) -> Result<Intent, ClassifierError> {
        let request_body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": self.system_prompt() },
                { "role": "user", "content": prompt },
            ],
            "temperature": 0.0,
            "max_tokens": 100,
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.endpoint.trim_end_matches('/')))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request_body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ClassifierError::Status { status, body });
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| ClassifierError::InvalidResponse(e.to_string()))?;

        let reply = completion
            .choices
            .first()
            .ok_or_else(|| ClassifierError::InvalidResponse("no choices in response".to_string()))?;

        parse_intent_reply(&reply.message.content)
    }
}

/// Parse the model's reply, tolerating a fenced code block around the JSON
pub fn parse_intent_reply(content: &str) -> Result<Intent, ClassifierError> {
    let body = content
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();

    let mut intent: Intent = serde_json::from_str(body)
        .map_err(|e| ClassifierError::InvalidResponse(format!("{}: {}", e, body)))?;

    if intent.confidence.is_nan() {
        return Err(ClassifierError::InvalidResponse(
            "confidence is not a number".to_string(),
        ));
    }
    intent.confidence = intent.confidence.clamp(0.0, 1.0);
    Ok(intent)
}
