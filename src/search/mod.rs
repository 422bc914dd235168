//! 웹 검색 모듈 - Serper(Google) 검색 API
//!
//! 검색 응답 타입, 프로바이더 트레이트, LLM 입력용 포맷팅을 제공합니다.
//! source: https://serper.dev

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::{Config, SERPER_API_KEY_VAR};
use crate::error::{AskError, Result};

/// 결과가 하나도 없을 때의 컨텍스트
pub const NO_RESULTS_SENTINEL: &str = "No search results found.";

// ============================================================================
// Types
// ============================================================================

/// 검색 응답
///
/// 모든 필드는 응답에 없을 수 있으며, 없으면 빈 값으로 취급합니다.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub organic: Vec<OrganicResult>,
    #[serde(rename = "answerBox", default, skip_serializing_if = "Option::is_none")]
    pub answer_box: Option<AnswerBox>,
    #[serde(rename = "knowledgeGraph", default, skip_serializing_if = "Option::is_none")]
    pub knowledge_graph: Option<KnowledgeGraph>,
}

/// 일반 검색 결과
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrganicResult {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub snippet: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
}

/// 추천 답변 (Featured snippet)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnswerBox {
    #[serde(default)]
    pub answer: Option<String>,
    #[serde(default)]
    pub snippet: Option<String>,
}

impl AnswerBox {
    /// answer가 있으면 answer, 없으면 snippet (둘 다 비면 None)
    pub fn text(&self) -> Option<&str> {
        non_empty(self.answer.as_deref()).or_else(|| non_empty(self.snippet.as_deref()))
    }
}

/// 지식 그래프 블록
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeGraph {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// 웹 출처 (제목 + URL)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebSource {
    pub title: String,
    pub url: String,
}

// ============================================================================
// SearchProvider Trait
// ============================================================================

/// 검색 프로바이더 트레이트
///
/// 네트워크/API 실패는 에러로 그대로 올려보냅니다.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, query: &str, num_results: usize) -> Result<SearchResponse>;

    fn name(&self) -> &str;
}

// ============================================================================
// Serper
// ============================================================================

/// Serper 검색 클라이언트
#[derive(Debug)]
pub struct SerperClient {
    api_key: String,
    endpoint: String,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct SerperRequest<'a> {
    q: &'a str,
    num: usize,
}

impl SerperClient {
    pub fn new(api_key: String, endpoint: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| AskError::Http {
                service: "Serper",
                source: e,
            })?;

        Ok(Self {
            api_key,
            endpoint,
            client,
        })
    }

    /// 설정에서 생성 (API 키가 없으면 설정 에러)
    pub fn from_config(config: &Config) -> Result<Self> {
        let api_key = config.require_serper_key()?.to_string();
        Self::new(api_key, config.serper_url.clone())
    }
}

#[async_trait]
impl SearchProvider for SerperClient {
    async fn search(&self, query: &str, num_results: usize) -> Result<SearchResponse> {
        tracing::debug!("Serper search: {:?} (num={})", query, num_results);

        let response = self
            .client
            .post(&self.endpoint)
            .header("X-API-KEY", &self.api_key)
            .json(&SerperRequest {
                q: query,
                num: num_results,
            })
            .send()
            .await
            .map_err(|e| AskError::Http {
                service: "Serper",
                source: e,
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| AskError::Http {
            service: "Serper",
            source: e,
        })?;

        if !status.is_success() {
            return Err(AskError::Api {
                service: "Serper",
                status: status.as_u16(),
                message: body,
            });
        }

        serde_json::from_str(&body).map_err(|e| AskError::Parse {
            service: "Serper",
            message: e.to_string(),
        })
    }

    fn name(&self) -> &str {
        "serper"
    }
}

/// 키 없이 실행할 때 쓰는 자리표시 프로바이더
///
/// 호출될 때마다 설정 에러를 돌려줍니다. 문서 전용 모드는 그대로 동작하고,
/// 하이브리드 모드에서는 웹 쪽만 실패로 처리됩니다.
#[derive(Debug, Default)]
pub struct UnconfiguredSearch;

#[async_trait]
impl SearchProvider for UnconfiguredSearch {
    async fn search(&self, _query: &str, _num_results: usize) -> Result<SearchResponse> {
        Err(AskError::MissingApiKey {
            name: SERPER_API_KEY_VAR,
        })
    }

    fn name(&self) -> &str {
        "unconfigured"
    }
}

// ============================================================================
// Formatting
// ============================================================================

/// 검색 응답을 LLM 입력용 문자열로 변환
///
/// 순서: 지식 그래프 → 추천 답변 → 일반 결과(번호순).
/// 아무것도 없으면 `NO_RESULTS_SENTINEL`.
pub fn format_search_results(results: &SearchResponse) -> String {
    let mut parts = Vec::new();

    if let Some(kg) = &results.knowledge_graph {
        let title = kg.title.as_deref().unwrap_or("");
        let description = kg.description.as_deref().unwrap_or("");
        if !title.is_empty() || !description.is_empty() {
            parts.push(format!(
                "[Knowledge Graph]\nTitle: {}\nDescription: {}\n",
                title, description
            ));
        }
    }

    if let Some(answer) = results.answer_box.as_ref().and_then(AnswerBox::text) {
        parts.push(format!("[Featured Answer]\n{}\n", answer));
    }

    for (i, result) in results.organic.iter().enumerate() {
        parts.push(format!(
            "[Result {}]\nTitle: {}\nSnippet: {}\nURL: {}\n",
            i + 1,
            result.title.as_deref().unwrap_or("No title"),
            result.snippet.as_deref().unwrap_or("No description"),
            result.link.as_deref().unwrap_or(""),
        ));
    }

    if parts.is_empty() {
        NO_RESULTS_SENTINEL.to_string()
    } else {
        parts.join("\n")
    }
}

/// 일반 검색 결과에서 출처 목록 추출 (순서 유지)
pub fn extract_sources(results: &SearchResponse) -> Vec<WebSource> {
    results
        .organic
        .iter()
        .map(|r| WebSource {
            title: r.title.clone().unwrap_or_else(|| "Unknown".to_string()),
            url: r.link.clone().unwrap_or_default(),
        })
        .collect()
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.filter(|v| !v.is_empty())
}

// ============================================================================
// Tests
// ============================================================================
