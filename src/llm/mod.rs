//! LLM 모듈 - OpenAI 호환 Chat Completions 클라이언트
//!
//! 라우터 분류 호출과 답변 생성 호출이 모두 이 트레이트를 거칩니다.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::embedding::api_error;
use crate::error::{AskError, Result};

// ============================================================================
// LanguageModel Trait
// ============================================================================

/// 텍스트 생성 모델 트레이트
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// 프롬프트 하나를 보내고 응답 텍스트를 받음
    async fn complete(&self, prompt: &str) -> Result<String>;

    /// 모델 이름
    fn model(&self) -> &str;
}

// ============================================================================
// OpenAiChat
// ============================================================================

/// OpenAI 호환 Chat Completions 구현체
#[derive(Debug)]
pub struct OpenAiChat {
    api_key: String,
    base_url: String,
    model: String,
    temperature: f32,
    client: reqwest::Client,
}

impl OpenAiChat {
    pub fn new(api_key: String, base_url: String, model: String, temperature: f32) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| AskError::Http {
                service: "OpenAI chat",
                source: e,
            })?;

        Ok(Self {
            api_key,
            base_url,
            model,
            temperature,
            client,
        })
    }

    /// 설정에서 생성
    ///
    /// API 키가 없으면 호출 전에 설정 에러로 실패합니다.
    pub fn from_config(config: &Config) -> Result<Self> {
        let api_key = config.require_openai_key()?.to_string();
        Self::new(
            api_key,
            config.openai_base_url.clone(),
            config.llm_model.clone(),
            config.temperature,
        )
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl LanguageModel for OpenAiChat {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.temperature,
        };

        tracing::debug!(
            "Chat completion: model={}, prompt_chars={}",
            self.model,
            prompt.chars().count()
        );

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AskError::Http {
                service: "OpenAI chat",
                source: e,
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| AskError::Http {
            service: "OpenAI chat",
            source: e,
        })?;

        if !status.is_success() {
            return Err(api_error("OpenAI chat", status.as_u16(), &body));
        }

        parse_completion(&body)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// 응답 본문에서 첫 번째 choice의 텍스트 추출
fn parse_completion(body: &str) -> Result<String> {
    let parsed: ChatResponse = serde_json::from_str(body).map_err(|e| AskError::Parse {
        service: "OpenAI chat",
        message: e.to_string(),
    })?;

    parsed
        .choices
        .into_iter()
        .next()
        .map(|c| c.message.content.unwrap_or_default())
        .ok_or_else(|| AskError::Parse {
            service: "OpenAI chat",
            message: "response contained no choices".to_string(),
        })
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_without_key_fails_fast() {
        let config = Config::from_lookup(|_| None);
        let result = OpenAiChat::from_config(&config);
        assert!(matches!(
            result,
            Err(AskError::MissingApiKey {
                name: "OPENAI_API_KEY"
            })
        ));
    }

    #[test]
    fn test_from_config_uses_configured_model() {
        let config = Config::from_lookup(|name| match name {
            "OPENAI_API_KEY" => Some("sk-test".to_string()),
            "LLM_MODEL" => Some("gpt-4o".to_string()),
            _ => None,
        });
        let chat = OpenAiChat::from_config(&config).expect("chat client");
        assert_eq!(chat.model(), "gpt-4o");
    }

    #[test]
    fn test_parse_completion() {
        let body = r#"{"choices": [{"index": 0, "message": {"role": "assistant", "content": "hybrid"}}]}"#;
        assert_eq!(parse_completion(body).ok().as_deref(), Some("hybrid"));
    }

    #[test]
    fn test_parse_completion_without_choices() {
        assert!(parse_completion(r#"{"choices": []}"#).is_err());
        assert!(parse_completion("not json").is_err());
    }
}
