//! Agent 모듈 - 라우팅 + 근거 수집 + 답변 생성
//!
//! - Router: 질문별 근거 소스 결정
//! - DocumentAgent / WebSearchAgent: 단일 소스 질의
//! - HybridOrchestrator: 두 소스를 합친 융합 질의
//! - AnswerGenerator: 템플릿 기반 생성 호출

mod documents;
mod generator;
mod hybrid;
mod prompts;
mod router;
mod web;

#[cfg(test)]
pub(crate) mod testing;

use serde::Serialize;

use crate::knowledge::DocumentIndex;
use crate::search::SearchResponse;

// Re-exports
pub use documents::{
    format_context, unique_sources, DocumentAgent, DocumentRetriever, NO_DOCUMENTS_MESSAGE,
    NO_RELEVANT_DOCUMENTS_MESSAGE,
};
pub use generator::AnswerGenerator;
pub use hybrid::{
    merge_provenance, web_results, DocumentEvidence, HybridOrchestrator, SourceOutcome,
    NO_DOCUMENT_CONTEXT, NO_WEB_CONTEXT,
};
pub use prompts::{render, PromptTemplate, ROUTER_PROMPT};
pub use router::{RouteDecision, Router};
pub use web::{WebSearchAgent, NO_WEB_RESULTS_MESSAGE};

// ============================================================================
// Result Types
// ============================================================================

/// 답변 출처
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Provenance {
    /// 인덱싱된 문서
    Document { name: String },
    /// 웹 검색 결과
    Web { title: String, url: String },
}

impl Provenance {
    pub fn is_document(&self) -> bool {
        matches!(self, Self::Document { .. })
    }
}

/// 모드별 원시 컨텍스트 (디버그/표시용)
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum RawContext {
    Documents {
        context: String,
    },
    Web {
        results: SearchResponse,
    },
    Hybrid {
        document_context: String,
        web_context: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        web_results: Option<Box<SearchResponse>>,
    },
}

/// 질문 하나에 대한 결과
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResult {
    pub answer: String,
    /// 답변에 실제로 쓰인 근거만 (문서 → 웹 순)
    pub sources: Vec<Provenance>,
    /// 실제 사용된 모드 (라우팅으로 요청과 달라질 수 있음)
    pub mode: RouteDecision,
    pub context: RawContext,
}

/// 인덱스 문서 수 (조회 실패는 0으로 취급)
pub(crate) async fn available_documents(index: &dyn DocumentIndex) -> usize {
    match index.document_count().await {
        Ok(count) => count,
        Err(e) => {
            tracing::warn!("Failed to count indexed chunks, assuming none: {}", e);
            0
        }
    }
}
