//! 임베딩 모듈 - OpenAI 호환 API를 통한 텍스트 벡터화
//!
//! 문서 청크와 질문을 벡터로 변환합니다.
//! 유사도 검색(DocumentIndex)의 입력이 됩니다.
//!
//! ## 사용법
//! ```rust,ignore
//! let embedder = OpenAiEmbedding::from_config(&config)?;
//! let embedding = embedder.embed("Hello, world!").await?;
//! ```

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::{AskError, Result};

// ============================================================================
// EmbeddingProvider Trait
// ============================================================================

/// 임베딩 프로바이더 트레이트
///
/// 텍스트를 벡터로 변환하는 인터페이스입니다.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// 단일 텍스트 임베딩
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// 배치 임베딩 (기본 구현: 순차 호출)
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }

    /// 임베딩 차원 수
    fn dimension(&self) -> usize;

    /// 프로바이더 이름
    fn name(&self) -> &str;
}

// ============================================================================
// OpenAI Embedding
// ============================================================================

/// text-embedding-3-small 기본 차원
pub const DEFAULT_DIMENSION: usize = 1536;

/// 한 번의 요청에 담을 최대 입력 수
const MAX_BATCH_INPUTS: usize = 96;

/// 모델 이름으로 출력 차원 결정
///
/// source: https://platform.openai.com/docs/guides/embeddings
pub fn dimension_for_model(model: &str) -> usize {
    match model {
        "text-embedding-3-large" => 3072,
        "text-embedding-3-small" | "text-embedding-ada-002" => 1536,
        _ => DEFAULT_DIMENSION,
    }
}

/// OpenAI 호환 임베딩 구현체
#[derive(Debug)]
pub struct OpenAiEmbedding {
    api_key: String,
    base_url: String,
    model: String,
    client: reqwest::Client,
    dimension: usize,
}

impl OpenAiEmbedding {
    /// 새 임베딩 인스턴스 생성
    ///
    /// # Arguments
    /// * `api_key` - OpenAI API 키
    /// * `base_url` - `/v1`까지 포함한 API 기본 URL
    /// * `model` - 임베딩 모델 이름
    pub fn new(api_key: String, base_url: String, model: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| AskError::Http {
                service: "OpenAI embeddings",
                source: e,
            })?;

        let dimension = dimension_for_model(&model);

        Ok(Self {
            api_key,
            base_url,
            model,
            client,
            dimension,
        })
    }

    /// 설정에서 생성 (API 키가 없으면 즉시 실패)
    pub fn from_config(config: &Config) -> Result<Self> {
        let api_key = config.require_openai_key()?.to_string();
        let embedder = Self::new(
            api_key,
            config.openai_base_url.clone(),
            config.embedding_model.clone(),
        )?;
        tracing::debug!(
            "Using OpenAI embedding {} (dimension: {})",
            embedder.model,
            embedder.dimension
        );
        Ok(embedder)
    }

    fn endpoint(&self) -> String {
        format!("{}/embeddings", self.base_url)
    }

    /// 입력 목록을 한 번의 요청으로 임베딩
    async fn request(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>> {
        let request = EmbedRequest {
            model: &self.model,
            input: inputs,
        };

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AskError::Http {
                service: "OpenAI embeddings",
                source: e,
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| AskError::Http {
            service: "OpenAI embeddings",
            source: e,
        })?;

        if !status.is_success() {
            return Err(api_error("OpenAI embeddings", status.as_u16(), &body));
        }

        let mut parsed: EmbedResponse =
            serde_json::from_str(&body).map_err(|e| AskError::Parse {
                service: "OpenAI embeddings",
                message: e.to_string(),
            })?;

        if parsed.data.len() != inputs.len() {
            return Err(AskError::Parse {
                service: "OpenAI embeddings",
                message: format!(
                    "expected {} embeddings, got {}",
                    inputs.len(),
                    parsed.data.len()
                ),
            });
        }

        // 응답 순서는 index 필드 기준
        parsed.data.sort_by_key(|d| d.index);
        Ok(parsed.data.into_iter().map(|d| d.embedding).collect())
    }
}

/// OpenAI 임베딩 요청 본문
#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

/// OpenAI 임베딩 응답
#[derive(Debug, Deserialize)]
struct EmbedResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    #[serde(default)]
    index: usize,
}

/// OpenAI 에러 응답
#[derive(Debug, Deserialize)]
pub(crate) struct OpenAiError {
    pub(crate) error: OpenAiErrorDetail,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OpenAiErrorDetail {
    pub(crate) message: String,
}

/// 실패 응답 본문을 AskError::Api로 변환
pub(crate) fn api_error(service: &'static str, status: u16, body: &str) -> AskError {
    let message = serde_json::from_str::<OpenAiError>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.to_string());
    AskError::Api {
        service,
        status,
        message,
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        // 빈 텍스트 처리
        if text.trim().is_empty() {
            return Ok(vec![0.0; self.dimension]);
        }

        let mut vectors = self.request(&[text.to_string()]).await?;
        vectors.pop().ok_or_else(|| AskError::Parse {
            service: "OpenAI embeddings",
            message: "empty embedding list".to_string(),
        })
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());

        for (i, batch) in texts.chunks(MAX_BATCH_INPUTS).enumerate() {
            tracing::debug!(
                "Embedding batch {} ({} inputs)",
                i + 1,
                batch.len()
            );
            results.extend(self.request(batch).await?);
        }

        Ok(results)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &str {
        &self.model
    }
}

// ============================================================================
// Tests
// ============================================================================
