use crate::config::Config;
use crate::error::{Error, Result};
use crate::models::exam::Exam;
use crate::models::question::Question;
use crate::models::submission::Submission;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value as JsonValue;
use std::sync::Arc;
use std::time::Duration;

pub const EXPLANATION_ERROR: &str = "Error generating explanation.";
pub const EXPLANATION_EMPTY: &str = "No explanation generated.";
pub const INSIGHTS_ERROR: &str = "Complete the review to see your areas of improvement.";
pub const INSIGHTS_EMPTY: &str = "Keep studying to improve your results!";

/// Opaque text-generation collaborator. May fail.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// OpenAI-compatible chat completions endpoint.
#[derive(Clone)]
pub struct OpenAiGenerator {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiGenerator {
    pub fn new(api_key: String, client: Client, base_url: String, model: String) -> Self {
        Self {
            client,
            api_key,
            base_url,
            model,
        }
    }

    async fn chat_openai(&self, payload: JsonValue) -> Result<String> {
        let res = self
            .client
            .post(&self.base_url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("Text generation API error {}: {}", status, text).into());
        }

        let body: JsonValue = res.json().await?;

        body.get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .map(|s| s.to_string())
            .ok_or_else(|| anyhow::anyhow!("Invalid text generation response format").into())
    }
}

#[async_trait]
impl TextGenerator for OpenAiGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let payload = serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "user", "content": prompt}
            ],
            "temperature": 0.4
        });
        self.chat_openai(payload).await
    }
}

/// Stand-in used when no API key is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledGenerator;

#[async_trait]
impl TextGenerator for DisabledGenerator {
    async fn generate(&self, _prompt: &str) -> Result<String> {
        Err(Error::Config("Text generation is not configured".to_string()))
    }
}

/// Explanation and insight synthesis with fixed fallbacks.
///
/// Nothing here returns the collaborator's error to the caller.
#[derive(Clone)]
pub struct AiService {
    generator: Arc<dyn TextGenerator>,
    timeout: Duration,
}

impl AiService {
    pub fn new(generator: Arc<dyn TextGenerator>, timeout: Duration) -> Self {
        Self { generator, timeout }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let generator: Arc<dyn TextGenerator> = match &config.openai_api_key {
            Some(key) => {
                let client = Client::builder().timeout(config.ai_timeout()).build()?;
                Arc::new(OpenAiGenerator::new(
                    key.clone(),
                    client,
                    config.ai_base_url.clone(),
                    config.ai_model.clone(),
                ))
            }
            None => {
                tracing::warn!("Text generation API key is not set, explanations will use fallbacks");
                Arc::new(DisabledGenerator)
            }
        };
        Ok(Self::new(generator, config.ai_timeout()))
    }

    async fn generate_or(&self, prompt: &str, on_error: &str, on_empty: &str) -> String {
        match tokio::time::timeout(self.timeout, self.generator.generate(prompt)).await {
            Ok(Ok(text)) if !text.trim().is_empty() => text.trim().to_string(),
            Ok(Ok(_)) => on_empty.to_string(),
            Ok(Err(e)) => {
                tracing::error!(error = %e, "Text generation failed");
                on_error.to_string()
            }
            Err(elapsed) => {
                tracing::error!(error = %Error::from(elapsed), "Text generation timed out");
                on_error.to_string()
            }
        }
    }

    pub async fn explain(&self, question_text: &str, options: &[String], correct_answer_text: &str) -> String {
        let prompt = format!(
            "Provide a clear, concise educational explanation for the following MCQ question.\n\
             Question: {}\n\
             Options: {}\n\
             Correct Answer: {}",
            question_text,
            options.join(", "),
            correct_answer_text
        );
        self.generate_or(&prompt, EXPLANATION_ERROR, EXPLANATION_EMPTY).await
    }

    /// Explanation for an authored question. The text and a correct option must be filled in.
    pub async fn explain_question(&self, question: &Question) -> Result<String> {
        let correct = question.correct_answer_text();
        if question.text.trim().is_empty() || correct.trim().is_empty() {
            return Err(Error::BadRequest(
                "Fill in the question text and correct answer first".to_string(),
            ));
        }
        Ok(self.explain(&question.text, &question.options, &correct).await)
    }

    pub async fn insights(&self, exam: &Exam, submission: &Submission) -> String {
        let prompt = format!(
            "Analyze this student's exam performance:\n\
             Exam: {}\n\
             Score: {}/{} ({}%)\n\
             Status: {:?}\n\
             Number of Questions: {}\n\
             Provide 3 bullet points: 1 Strength, 1 Weakness, and 1 Growth Suggestion.",
            exam.title,
            submission.score,
            exam.total_marks,
            submission.percentage,
            submission.status,
            exam.questions.len()
        );
        self.generate_or(&prompt, INSIGHTS_ERROR, INSIGHTS_EMPTY).await
    }
}
