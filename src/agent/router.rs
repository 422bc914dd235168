//! 질의 라우터
//!
//! 질문을 문서 / 웹 / 하이브리드 중 어디로 보낼지 결정합니다.
//! 문서가 없으면 분류 호출 없이 바로 웹으로 보냅니다.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::llm::LanguageModel;

use super::prompts::{render, ROUTER_PROMPT};

/// 라우팅 결정 (= 실제 사용된 답변 모드)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteDecision {
    Documents,
    Web,
    Hybrid,
}

impl RouteDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Documents => "documents",
            Self::Web => "web",
            Self::Hybrid => "hybrid",
        }
    }

    /// 정확히 일치하는 라벨만 인정
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "documents" => Some(Self::Documents),
            "web" => Some(Self::Web),
            "hybrid" => Some(Self::Hybrid),
            _ => None,
        }
    }

    /// 분류기 출력 해석
    ///
    /// 앞뒤 공백 제거 + 소문자화 후 라벨과 비교하고, 아니면 `Hybrid`.
    pub fn from_classifier_output(raw: &str) -> Self {
        let normalized = raw.trim().to_lowercase();
        Self::from_label(&normalized).unwrap_or_else(|| {
            tracing::debug!("Unrecognized route label {:?}, using hybrid", raw);
            Self::Hybrid
        })
    }
}

impl fmt::Display for RouteDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// LLM 기반 라우터
pub struct Router {
    llm: Arc<dyn LanguageModel>,
}

impl Router {
    pub fn new(llm: Arc<dyn LanguageModel>) -> Self {
        Self { llm }
    }

    /// 라우팅 결정
    ///
    /// 재시도 없음. 분류 호출 자체가 실패하면 에러를 그대로 반환합니다.
    pub async fn route(
        &self,
        question: &str,
        document_count: usize,
        known_sources: &[String],
    ) -> Result<RouteDecision> {
        if document_count == 0 {
            tracing::info!("Router: no documents indexed, routing to web");
            return Ok(RouteDecision::Web);
        }

        let sources = if known_sources.is_empty() {
            "None".to_string()
        } else {
            known_sources.join(", ")
        };

        let prompt = render(
            "router",
            ROUTER_PROMPT,
            &[
                ("question", question),
                ("has_documents", "Yes"),
                ("document_sources", &sources),
            ],
        )?;

        let raw = self.llm.complete(&prompt).await?;
        let decision = RouteDecision::from_classifier_output(&raw);

        tracing::info!("Router: documents={}, routing to {}", document_count, decision);
        Ok(decision)
    }
}
