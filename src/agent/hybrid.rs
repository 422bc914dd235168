//! 하이브리드 오케스트레이터
//!
//! 라우팅 후 단일 소스로 위임하거나, 문서와 웹 근거를 각각 모아
//! 하나의 생성 호출로 합칩니다. 한쪽 실패가 다른 쪽을 막지 않습니다.

use std::sync::Arc;

use crate::error::Result;
use crate::search::{format_search_results, SearchResponse, NO_RESULTS_SENTINEL};

use super::documents::{format_context, unique_sources, DocumentAgent};
use super::generator::AnswerGenerator;
use super::prompts::PromptTemplate;
use super::router::Router;
use super::web::WebSearchAgent;
use super::{available_documents, Provenance, QueryResult, RawContext, RouteDecision};

pub const NO_DOCUMENT_CONTEXT: &str = "No document context available.";
pub const NO_WEB_CONTEXT: &str = "No web search results available.";

/// 하위 근거 수집 결과
#[derive(Debug, Clone, PartialEq)]
pub enum SourceOutcome<T> {
    /// 근거 확보
    Success(T),
    /// 조회하지 않았거나 결과 없음
    Empty,
    /// 조회 실패 (사유)
    Failed(String),
}

impl<T> SourceOutcome<T> {
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// 문서 쪽 근거: 포맷된 컨텍스트 + 중복 제거된 출처
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentEvidence {
    pub context: String,
    pub sources: Vec<String>,
}

pub struct HybridOrchestrator {
    router: Router,
    documents: DocumentAgent,
    web: WebSearchAgent,
    generator: Arc<AnswerGenerator>,
}

impl HybridOrchestrator {
    pub fn new(
        router: Router,
        documents: DocumentAgent,
        web: WebSearchAgent,
        generator: Arc<AnswerGenerator>,
    ) -> Self {
        Self {
            router,
            documents,
            web,
            generator,
        }
    }

    pub fn documents(&self) -> &DocumentAgent {
        &self.documents
    }

    pub fn web(&self) -> &WebSearchAgent {
        &self.web
    }

    /// 하이브리드 질의
    ///
    /// # Arguments
    /// * `question` - 사용자 질문
    /// * `auto_route` - true면 라우터 결정에 따라 단일 소스로 위임할 수 있음
    ///
    /// 융합 경로의 `mode`는 근거가 일부만 모여도 항상 `Hybrid`입니다.
    pub async fn query_hybrid(&self, question: &str, auto_route: bool) -> Result<QueryResult> {
        let index = self.documents.retriever().index();
        let document_count = available_documents(index.as_ref()).await;

        if auto_route {
            let known_sources = if document_count > 0 {
                index.all_source_names().await.unwrap_or_else(|e| {
                    tracing::warn!("Failed to list document sources: {}", e);
                    vec![]
                })
            } else {
                vec![]
            };

            match self
                .router
                .route(question, document_count, &known_sources)
                .await?
            {
                RouteDecision::Documents => return self.documents.query(question).await,
                RouteDecision::Web => return self.web.search(question).await,
                RouteDecision::Hybrid => {}
            }
        }

        let documents = self.gather_documents(question, document_count).await;
        let web = self.gather_web(question).await;

        self.fuse(question, documents, web).await
    }

    async fn gather_documents(
        &self,
        question: &str,
        document_count: usize,
    ) -> SourceOutcome<DocumentEvidence> {
        if document_count == 0 {
            return SourceOutcome::Empty;
        }

        match self.documents.retriever().retrieve(question).await {
            Ok(chunks) if chunks.is_empty() => SourceOutcome::Empty,
            Ok(chunks) => SourceOutcome::Success(DocumentEvidence {
                context: format_context(&chunks),
                sources: unique_sources(&chunks),
            }),
            Err(e) => {
                tracing::warn!("Document retrieval failed in hybrid mode: {}", e);
                SourceOutcome::Failed(e.to_string())
            }
        }
    }

    async fn gather_web(&self, question: &str) -> SourceOutcome<QueryResult> {
        match self.web.search(question).await {
            Ok(result) if has_no_results(&result) => {
                tracing::info!("Web search returned no results in hybrid mode");
                SourceOutcome::Empty
            }
            Ok(result) => SourceOutcome::Success(result),
            Err(e) => {
                tracing::warn!("Web search failed in hybrid mode: {}", e);
                SourceOutcome::Failed(e.to_string())
            }
        }
    }

    async fn fuse(
        &self,
        question: &str,
        documents: SourceOutcome<DocumentEvidence>,
        web: SourceOutcome<QueryResult>,
    ) -> Result<QueryResult> {
        if documents.is_failed() || web.is_failed() {
            tracing::warn!(
                "Fusing with partial evidence (documents failed: {}, web failed: {})",
                documents.is_failed(),
                web.is_failed()
            );
        }

        let (document_context, document_sources) = match documents {
            SourceOutcome::Success(evidence) => (evidence.context, evidence.sources),
            SourceOutcome::Empty => (NO_DOCUMENT_CONTEXT.to_string(), vec![]),
            SourceOutcome::Failed(reason) => (
                format!("Error retrieving from documents: {}", reason),
                vec![],
            ),
        };

        let (web_context, web_sources, web_results) = match web {
            SourceOutcome::Success(result) => {
                let raw = match result.context {
                    RawContext::Web { results } => Some(results),
                    _ => None,
                };
                (result.answer, result.sources, raw)
            }
            SourceOutcome::Empty => (NO_WEB_CONTEXT.to_string(), vec![], None),
            SourceOutcome::Failed(reason) => {
                (format!("Error searching web: {}", reason), vec![], None)
            }
        };

        let answer = self
            .generator
            .generate(
                PromptTemplate::Hybrid,
                &[
                    ("rag_context", &document_context),
                    ("web_context", &web_context),
                    ("question", question),
                ],
            )
            .await?;

        let sources = merge_provenance(document_sources, web_sources);
        tracing::info!("Hybrid answer with {} sources", sources.len());

        Ok(QueryResult {
            answer,
            sources,
            mode: RouteDecision::Hybrid,
            context: RawContext::Hybrid {
                document_context,
                web_context,
                web_results: web_results.map(Box::new),
            },
        })
    }
}

/// 출처 병합: 문서 먼저, 그다음 웹 (각자 순서 유지, 교차 중복 제거 없음)
pub fn merge_provenance(document_sources: Vec<String>, web_sources: Vec<Provenance>) -> Vec<Provenance> {
    document_sources
        .into_iter()
        .map(|name| Provenance::Document { name })
        .chain(web_sources)
        .collect()
}

/// 웹 검색이 빈 결과로 끝났는지 (생성 없이 고정 답변)
fn has_no_results(result: &QueryResult) -> bool {
    web_results(result).map_or(false, |r| format_search_results(r) == NO_RESULTS_SENTINEL)
}

/// 원시 검색 결과 (디버그 표시용)
pub fn web_results(result: &QueryResult) -> Option<&SearchResponse> {
    match &result.context {
        RawContext::Web { results } => Some(results),
        RawContext::Hybrid { web_results, .. } => web_results.as_deref(),
        RawContext::Documents { .. } => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::testing::{FakeIndex, ScriptedModel, ScriptedSearch};
    use crate::agent::DocumentRetriever;

    fn orchestrator(
        index: FakeIndex,
        search: ScriptedSearch,
        model: Arc<ScriptedModel>,
    ) -> (HybridOrchestrator, Arc<FakeIndex>, Arc<ScriptedSearch>) {
        let index = Arc::new(index);
        let search = Arc::new(search);
        let generator = Arc::new(AnswerGenerator::new(model.clone()));
        let orchestrator = HybridOrchestrator::new(
            Router::new(model),
            DocumentAgent::new(DocumentRetriever::new(index.clone(), 4), generator.clone()),
            WebSearchAgent::new(search.clone(), generator.clone(), 5),
            generator,
        );
        (orchestrator, index, search)
    }

    fn three_results() -> ScriptedSearch {
        ScriptedSearch::with_results(&[
            ("One", "https://one.example"),
            ("Two", "https://two.example"),
            ("Three", "https://three.example"),
        ])
    }

    #[test]
    fn test_merge_provenance_order() {
        let merged = merge_provenance(
            vec!["b.txt".to_string(), "a.pdf".to_string()],
            vec![Provenance::Web {
                title: "a.pdf".to_string(),
                url: "https://x.example/a.pdf".to_string(),
            }],
        );
        assert_eq!(merged.len(), 3);
        assert_eq!(merged[0], Provenance::Document { name: "b.txt".to_string() });
        assert_eq!(merged[1], Provenance::Document { name: "a.pdf".to_string() });
        assert!(matches!(merged[2], Provenance::Web { .. }));
    }

    #[tokio::test]
    async fn test_forced_fusion_merges_both_sources() {
        // 웹 답변 → 융합 답변
        let model = Arc::new(ScriptedModel::new(["web summary", "fused"]));
        let (orchestrator, _, _) = orchestrator(
            FakeIndex::with_chunks(&[("a.pdf", "alpha"), ("b.txt", "beta")]),
            three_results(),
            model.clone(),
        );

        let result = orchestrator.query_hybrid("q", false).await.unwrap();

        assert_eq!(result.answer, "fused");
        assert_eq!(result.mode, RouteDecision::Hybrid);
        assert_eq!(result.sources.len(), 5);
        assert_eq!(result.sources[0], Provenance::Document { name: "a.pdf".to_string() });
        assert_eq!(result.sources[1], Provenance::Document { name: "b.txt".to_string() });
        assert!(result.sources[2..]
            .iter()
            .all(|s| matches!(s, Provenance::Web { .. })));

        let prompts = model.prompts();
        assert_eq!(prompts.len(), 2);
        assert!(prompts[1].contains("[Document 1 - Source: a.pdf]"));
        assert!(prompts[1].contains("Web Search Results:\nweb summary\n"));
    }

    #[tokio::test]
    async fn test_document_failure_keeps_web_evidence() {
        let model = Arc::new(ScriptedModel::new(["web summary", "fused"]));
        let index = FakeIndex {
            fail_search: true,
            ..FakeIndex::with_chunks(&[("a.pdf", "alpha")])
        };
        let (orchestrator, _, _) = orchestrator(index, three_results(), model.clone());

        let result = orchestrator.query_hybrid("q", false).await.unwrap();

        assert_eq!(result.mode, RouteDecision::Hybrid);
        assert_eq!(result.sources.len(), 3);
        assert!(model.prompts()[1]
            .contains("Error retrieving from documents: Index error: vector store unavailable"));
    }

    #[tokio::test]
    async fn test_web_failure_keeps_document_evidence() {
        let model = Arc::new(ScriptedModel::new(["fused"]));
        let (orchestrator, _, _) = orchestrator(
            FakeIndex::with_chunks(&[("a.pdf", "alpha")]),
            ScriptedSearch::failing("boom"),
            model.clone(),
        );

        let result = orchestrator.query_hybrid("q", false).await.unwrap();

        assert_eq!(result.mode, RouteDecision::Hybrid);
        assert_eq!(
            result.sources,
            vec![Provenance::Document { name: "a.pdf".to_string() }]
        );
        assert!(model.prompts()[0].contains("Error searching web: Serper API error (500): boom"));
        assert!(web_results(&result).is_none());
    }

    #[tokio::test]
    async fn test_empty_web_results_use_placeholder() {
        // 웹 검색 결과가 없으면 웹 쪽 생성 호출 없이 융합만
        let model = Arc::new(ScriptedModel::new(["fused"]));
        let (orchestrator, _, search) = orchestrator(
            FakeIndex::with_chunks(&[("a.pdf", "alpha")]),
            ScriptedSearch::empty(),
            model.clone(),
        );

        let result = orchestrator.query_hybrid("q", false).await.unwrap();

        assert_eq!(search.call_count(), 1);
        assert_eq!(model.call_count(), 1);
        assert!(model.prompts()[0].contains("Web Search Results:\nNo web search results available.\n"));
        assert_eq!(
            result.sources,
            vec![Provenance::Document { name: "a.pdf".to_string() }]
        );
        match &result.context {
            RawContext::Hybrid { web_context, web_results, .. } => {
                assert_eq!(web_context, NO_WEB_CONTEXT);
                assert!(web_results.is_none());
            }
            other => panic!("unexpected context: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fusion_lists_each_document_source_once() {
        let model = Arc::new(ScriptedModel::new(["web summary", "fused"]));
        let (orchestrator, _, _) = orchestrator(
            FakeIndex::with_chunks(&[("a.pdf", "first"), ("a.pdf", "second"), ("b.txt", "third")]),
            three_results(),
            model.clone(),
        );

        let result = orchestrator.query_hybrid("q", false).await.unwrap();

        assert_eq!(result.sources.len(), 2 + 3);
        assert_eq!(
            result.sources[..2],
            [
                Provenance::Document { name: "a.pdf".to_string() },
                Provenance::Document { name: "b.txt".to_string() },
            ]
        );
        // 컨텍스트에는 청크 셋 모두 포함
        let prompt = &model.prompts()[1];
        assert!(prompt.contains("[Document 2 - Source: a.pdf]"));
        assert!(prompt.contains("[Document 3 - Source: b.txt]"));
    }

    #[tokio::test]
    async fn test_empty_index_is_not_searched() {
        let model = Arc::new(ScriptedModel::new(["web summary", "fused"]));
        let (orchestrator, index, _) =
            orchestrator(FakeIndex::empty(), three_results(), model.clone());

        let result = orchestrator.query_hybrid("q", false).await.unwrap();

        assert_eq!(index.search_count(), 0);
        assert_eq!(result.sources.len(), 3);
        assert!(model.prompts()[1].contains(NO_DOCUMENT_CONTEXT));
        match &result.context {
            RawContext::Hybrid { document_context, .. } => {
                assert_eq!(document_context, NO_DOCUMENT_CONTEXT)
            }
            other => panic!("unexpected context: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_auto_route_delegates_to_documents() {
        let model = Arc::new(ScriptedModel::new(["documents", "doc answer"]));
        let (orchestrator, _, search) = orchestrator(
            FakeIndex::with_chunks(&[("a.pdf", "alpha")]),
            three_results(),
            model.clone(),
        );

        let result = orchestrator.query_hybrid("q", true).await.unwrap();

        assert_eq!(result.mode, RouteDecision::Documents);
        assert_eq!(result.answer, "doc answer");
        assert_eq!(search.call_count(), 0);
        assert!(model.prompts()[0].contains("Types of documents: a.pdf"));
    }

    #[tokio::test]
    async fn test_auto_route_without_documents_goes_to_web() {
        let model = Arc::new(ScriptedModel::new(["web answer"]));
        let (orchestrator, _, search) =
            orchestrator(FakeIndex::empty(), three_results(), model.clone());

        let result = orchestrator.query_hybrid("q", true).await.unwrap();

        assert_eq!(result.mode, RouteDecision::Web);
        assert_eq!(search.call_count(), 1);
        // 분류 호출 없이 생성 한 번
        assert_eq!(model.call_count(), 1);
    }

    #[tokio::test]
    async fn test_auto_route_unrecognized_label_fuses() {
        let model = Arc::new(ScriptedModel::new(["both?", "web summary", "fused"]));
        let (orchestrator, _, _) = orchestrator(
            FakeIndex::with_chunks(&[("a.pdf", "alpha")]),
            three_results(),
            model.clone(),
        );

        let result = orchestrator.query_hybrid("q", true).await.unwrap();

        assert_eq!(result.mode, RouteDecision::Hybrid);
        assert_eq!(result.answer, "fused");
        assert_eq!(model.call_count(), 3);
    }

    #[tokio::test]
    async fn test_count_failure_is_treated_as_empty() {
        let model = Arc::new(ScriptedModel::new(["web answer"]));
        let index = FakeIndex {
            fail_count: true,
            ..FakeIndex::with_chunks(&[("a.pdf", "alpha")])
        };
        let (orchestrator, _, _) = orchestrator(index, three_results(), model);

        let result = orchestrator.query_hybrid("q", true).await.unwrap();
        assert_eq!(result.mode, RouteDecision::Web);
    }

    #[test]
    fn test_source_outcome_is_failed() {
        assert!(SourceOutcome::<()>::Failed("x".to_string()).is_failed());
        assert!(!SourceOutcome::Success(1).is_failed());
    }
}
