//! 문서 검색 (RAG)
//!
//! - `DocumentRetriever`: 인덱스 유사도 검색 래퍼 (랭킹 로직 없음)
//! - `DocumentAgent`: 문서 전용 모드 질의 (검색 → 생성)

use std::sync::Arc;

use crate::error::Result;
use crate::knowledge::{DocumentIndex, EvidenceChunk};

use super::generator::AnswerGenerator;
use super::prompts::PromptTemplate;
use super::{Provenance, QueryResult, RawContext, RouteDecision};

/// 인덱스가 비어 있을 때의 답변
pub const NO_DOCUMENTS_MESSAGE: &str =
    "No documents have been uploaded yet. Please upload some documents first to use RAG mode.";

/// 검색 결과가 없을 때의 답변
pub const NO_RELEVANT_DOCUMENTS_MESSAGE: &str =
    "I couldn't find any relevant information in the uploaded documents to answer your question.";

// ============================================================================
// DocumentRetriever
// ============================================================================

pub struct DocumentRetriever {
    index: Arc<dyn DocumentIndex>,
    k: usize,
}

impl DocumentRetriever {
    pub fn new(index: Arc<dyn DocumentIndex>, k: usize) -> Self {
        Self { index, k }
    }

    /// 상위 k개 청크 검색
    ///
    /// 인덱스가 비어 있으면 검색하지 않고 빈 결과를 돌려줍니다.
    pub async fn retrieve(&self, question: &str) -> Result<Vec<EvidenceChunk>> {
        if self.index.document_count().await? == 0 {
            return Ok(vec![]);
        }

        let chunks = self.index.similarity_search(question, self.k).await?;
        tracing::debug!("Retrieved {} chunks (k={})", chunks.len(), self.k);
        Ok(chunks)
    }

    pub fn index(&self) -> &Arc<dyn DocumentIndex> {
        &self.index
    }

    pub fn k(&self) -> usize {
        self.k
    }
}

/// 청크를 생성용 컨텍스트 문자열로 변환 (검색 순서 유지)
pub fn format_context(chunks: &[EvidenceChunk]) -> String {
    chunks
        .iter()
        .enumerate()
        .map(|(i, chunk)| format!("[Document {} - Source: {}]\n{}\n", i + 1, chunk.source, chunk.text))
        .collect::<Vec<_>>()
        .join("\n")
}

/// 중복 제거된 출처 이름 (처음 등장한 순서)
pub fn unique_sources(chunks: &[EvidenceChunk]) -> Vec<String> {
    let mut sources: Vec<String> = Vec::new();
    for chunk in chunks {
        if !sources.iter().any(|s| s == &chunk.source) {
            sources.push(chunk.source.clone());
        }
    }
    sources
}

// ============================================================================
// DocumentAgent
// ============================================================================

pub struct DocumentAgent {
    retriever: DocumentRetriever,
    generator: Arc<AnswerGenerator>,
}

impl DocumentAgent {
    pub fn new(retriever: DocumentRetriever, generator: Arc<AnswerGenerator>) -> Self {
        Self {
            retriever,
            generator,
        }
    }

    pub fn retriever(&self) -> &DocumentRetriever {
        &self.retriever
    }

    /// 문서 전용 질의
    ///
    /// 근거가 없으면 고정 메시지를 돌려주고 생성 호출은 하지 않습니다.
    /// 인덱스/LLM 에러는 그대로 전파합니다.
    pub async fn query(&self, question: &str) -> Result<QueryResult> {
        if self.retriever.index().document_count().await? == 0 {
            return Ok(fallback(NO_DOCUMENTS_MESSAGE));
        }

        let chunks = self.retriever.retrieve(question).await?;
        if chunks.is_empty() {
            return Ok(fallback(NO_RELEVANT_DOCUMENTS_MESSAGE));
        }

        let context = format_context(&chunks);
        let answer = self
            .generator
            .generate(
                PromptTemplate::Documents,
                &[("context", &context), ("question", question)],
            )
            .await?;

        Ok(QueryResult {
            answer,
            sources: unique_sources(&chunks)
                .into_iter()
                .map(|name| Provenance::Document { name })
                .collect(),
            mode: RouteDecision::Documents,
            context: RawContext::Documents { context },
        })
    }
}

fn fallback(message: &str) -> QueryResult {
    QueryResult {
        answer: message.to_string(),
        sources: vec![],
        mode: RouteDecision::Documents,
        context: RawContext::Documents {
            context: String::new(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::testing::{FakeIndex, ScriptedModel};

    fn agent(index: FakeIndex, model: Arc<ScriptedModel>) -> (DocumentAgent, Arc<FakeIndex>) {
        let index = Arc::new(index);
        let agent = DocumentAgent::new(
            DocumentRetriever::new(index.clone(), 4),
            Arc::new(AnswerGenerator::new(model)),
        );
        (agent, index)
    }

    fn chunk(source: &str, text: &str) -> EvidenceChunk {
        EvidenceChunk {
            text: text.to_string(),
            source: source.to_string(),
            chunk_index: 0,
        }
    }

    #[test]
    fn test_format_context() {
        let chunks = vec![chunk("a.pdf", "alpha"), chunk("b.txt", "beta")];
        assert_eq!(
            format_context(&chunks),
            "[Document 1 - Source: a.pdf]\nalpha\n\n[Document 2 - Source: b.txt]\nbeta\n"
        );
        assert_eq!(format_context(&[]), "");
    }

    #[test]
    fn test_unique_sources_first_appearance() {
        let chunks = vec![
            chunk("b.txt", "1"),
            chunk("a.pdf", "2"),
            chunk("b.txt", "3"),
        ];
        assert_eq!(unique_sources(&chunks), vec!["b.txt", "a.pdf"]);
    }

    #[tokio::test]
    async fn test_retrieve_empty_index_skips_search() {
        let index = Arc::new(FakeIndex::empty());
        let retriever = DocumentRetriever::new(index.clone(), 4);

        assert!(retriever.retrieve("q").await.unwrap().is_empty());
        assert_eq!(index.search_count(), 0);
    }

    #[tokio::test]
    async fn test_retrieve_respects_k() {
        let index = Arc::new(FakeIndex::with_chunks(&[
            ("a", "1"),
            ("b", "2"),
            ("c", "3"),
        ]));
        let retriever = DocumentRetriever::new(index, 2);
        assert_eq!(retriever.retrieve("q").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_query_without_documents_skips_generation() {
        let model = Arc::new(ScriptedModel::new(["unused"]));
        let (agent, _) = agent(FakeIndex::empty(), model.clone());

        let result = agent.query("q").await.unwrap();

        assert_eq!(result.answer, NO_DOCUMENTS_MESSAGE);
        assert!(result.sources.is_empty());
        assert_eq!(result.mode, RouteDecision::Documents);
        assert_eq!(model.call_count(), 0);
    }

    #[tokio::test]
    async fn test_query_without_matches_skips_generation() {
        let model = Arc::new(ScriptedModel::new(["unused"]));
        let index = FakeIndex {
            count: 3,
            ..FakeIndex::empty()
        };
        let (agent, _) = agent(index, model.clone());

        let result = agent.query("q").await.unwrap();

        assert_eq!(result.answer, NO_RELEVANT_DOCUMENTS_MESSAGE);
        assert_eq!(model.call_count(), 0);
    }

    #[tokio::test]
    async fn test_query_generates_with_context() {
        let model = Arc::new(ScriptedModel::new(["grounded answer"]));
        let (agent, _) = agent(
            FakeIndex::with_chunks(&[("a.pdf", "alpha"), ("a.pdf", "more alpha")]),
            model.clone(),
        );

        let result = agent.query("What is alpha?").await.unwrap();

        assert_eq!(result.answer, "grounded answer");
        assert_eq!(
            result.sources,
            vec![Provenance::Document {
                name: "a.pdf".to_string()
            }]
        );
        assert!(model.prompts()[0].contains("[Document 2 - Source: a.pdf]\nmore alpha"));
    }

    #[tokio::test]
    async fn test_query_propagates_index_failure() {
        let model = Arc::new(ScriptedModel::new(["unused"]));
        let index = FakeIndex {
            fail_search: true,
            ..FakeIndex::with_chunks(&[("a.pdf", "alpha")])
        };
        let (agent, _) = agent(index, model);
        assert!(agent.query("q").await.is_err());
    }
}
