use async_trait::async_trait;

use super::connection::ApiConnectionError;
use super::endpoints::{ChatCompletionRequest, ChatMessage, Provider, DEFAULT_CHAT_MODEL};

/// Capability interface for external text generation. Callers must treat any
/// failure identically (fall back to their deterministic path), never
/// branching on the error variant.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str, max_tokens: u32) -> Result<String, ApiConnectionError>;
}

/// OpenRouter-backed generator.
pub struct OpenRouterTextGenerator {
    provider: Provider,
    model: String,
}

impl OpenRouterTextGenerator {
    pub fn new(api_key_env_var: &str) -> Self {
        Self {
            provider: Provider::openrouter(api_key_env_var),
            model: DEFAULT_CHAT_MODEL.to_string(),
        }
    }

    pub fn with_model(api_key_env_var: &str, model: &str) -> Self {
        Self {
            provider: Provider::openrouter(api_key_env_var),
            model: model.to_string(),
        }
    }
}

#[async_trait]
impl TextGenerator for OpenRouterTextGenerator {
    async fn generate(&self, prompt: &str, max_tokens: u32) -> Result<String, ApiConnectionError> {
        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            temperature: Some(0.7),
            max_tokens: Some(max_tokens),
        };

        let response = self.provider.call_chat_completion(request).await?;
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or(ApiConnectionError::EmptyResponse)?;

        Ok(strip_markdown_fences(&choice.message.content))
    }
}

/// Models sometimes wrap plain-text answers in markdown fences.
fn strip_markdown_fences(content: &str) -> String {
    let trimmed = content.trim();
    if trimmed.starts_with("```") && trimmed.ends_with("```") {
        trimmed
            .trim_start_matches("```markdown")
            .trim_start_matches("```text")
            .trim_start_matches("```")
            .trim_end_matches("```")
            .trim()
            .to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_markdown_fences() {
        assert_eq!(strip_markdown_fences("plain answer"), "plain answer");
        assert_eq!(strip_markdown_fences("```\nfenced\n```"), "fenced");
        assert_eq!(strip_markdown_fences("```text\nfenced\n```"), "fenced");
        assert_eq!(
            strip_markdown_fences("  spaced out  "),
            "spaced out"
        );
    }

    // Requires OPENROUTER_API_KEY and network access.
    #[tokio::test]
    #[ignore]
    async fn test_openrouter_generate_live() {
        let generator = OpenRouterTextGenerator::new("OPENROUTER_API_KEY");
        let answer = generator
            .generate("Reply with the single word: pong", 10)
            .await
            .expect("live call failed");
        assert!(!answer.is_empty());
    }
}
