//! Assistant - 최상위 조립 지점
//!
//! 인덱스 핸들은 여기서 한 번 만들어 각 에이전트에 `Arc`로 넘깁니다.
//! 전역 싱글턴은 두지 않습니다.

use std::fmt;
use std::sync::Arc;

use crate::agent::{
    AnswerGenerator, DocumentAgent, DocumentRetriever, HybridOrchestrator, QueryResult, Router,
    WebSearchAgent,
};
use crate::config::Config;
use crate::embedding::OpenAiEmbedding;
use crate::error::Result;
use crate::knowledge::{recursive_chunker, ChunkConfig, DocumentIndex, KnowledgeIndex};
use crate::llm::{LanguageModel, OpenAiChat};
use crate::search::{SearchProvider, SerperClient, UnconfiguredSearch};

/// 요청 모드
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryMode {
    /// 하이브리드 (auto_route면 라우터가 단일 소스로 보낼 수 있음)
    Hybrid { auto_route: bool },
    Documents,
    Web,
}

impl QueryMode {
    pub fn from_label(label: &str, auto_route: bool) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "hybrid" => Some(Self::Hybrid { auto_route }),
            "documents" | "docs" => Some(Self::Documents),
            "web" => Some(Self::Web),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hybrid { .. } => "hybrid",
            Self::Documents => "documents",
            Self::Web => "web",
        }
    }
}

impl Default for QueryMode {
    fn default() -> Self {
        Self::Hybrid { auto_route: true }
    }
}

impl fmt::Display for QueryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hybrid { auto_route: false } => f.write_str("hybrid (forced)"),
            other => f.write_str(other.as_str()),
        }
    }
}

/// 설정의 데이터 디렉토리에서 문서 인덱스 열기
pub async fn open_index(config: &Config) -> Result<KnowledgeIndex> {
    let embedder = OpenAiEmbedding::from_config(config)?;
    let chunker = recursive_chunker(ChunkConfig {
        chunk_size: config.chunk_size,
        chunk_overlap: config.chunk_overlap,
    });
    KnowledgeIndex::open(&config.data_dir, Arc::new(embedder), chunker).await
}

pub struct Assistant {
    index: Arc<dyn DocumentIndex>,
    orchestrator: HybridOrchestrator,
}

impl Assistant {
    /// 실제 서비스로 조립
    ///
    /// OpenAI 키가 없으면 설정 에러. Serper 키가 없으면 웹 검색만 비활성화됩니다.
    pub async fn open(config: &Config) -> Result<Self> {
        let llm = OpenAiChat::from_config(config)?;
        let index = open_index(config).await?;

        let search: Arc<dyn SearchProvider> = if config.has_serper_key() {
            Arc::new(SerperClient::from_config(config)?)
        } else {
            tracing::warn!("SERPER_API_KEY is not set, web search is disabled");
            Arc::new(UnconfiguredSearch)
        };

        Ok(Self::with_components(
            Arc::new(index),
            Arc::new(llm),
            search,
            config.top_k,
            config.max_search_results,
        ))
    }

    /// 구성 요소 직접 주입
    ///
    /// # Arguments
    /// * `index` - 문서 인덱스 핸들
    /// * `llm` - 라우팅/생성 공용 모델
    /// * `search` - 웹 검색 프로바이더
    /// * `top_k` - 문서 검색 청크 수
    /// * `num_results` - 웹 검색 결과 수
    pub fn with_components(
        index: Arc<dyn DocumentIndex>,
        llm: Arc<dyn LanguageModel>,
        search: Arc<dyn SearchProvider>,
        top_k: usize,
        num_results: usize,
    ) -> Self {
        let generator = Arc::new(AnswerGenerator::new(llm.clone()));

        let orchestrator = HybridOrchestrator::new(
            Router::new(llm),
            DocumentAgent::new(DocumentRetriever::new(index.clone(), top_k), generator.clone()),
            WebSearchAgent::new(search, generator.clone(), num_results),
            generator,
        );

        Self {
            index,
            orchestrator,
        }
    }

    /// 질문 하나 처리
    pub async fn ask(&self, question: &str, mode: QueryMode) -> Result<QueryResult> {
        tracing::info!("Question (mode={}): {}", mode, question);

        match mode {
            QueryMode::Hybrid { auto_route } => {
                self.orchestrator.query_hybrid(question, auto_route).await
            }
            QueryMode::Documents => self.orchestrator.documents().query(question).await,
            QueryMode::Web => self.orchestrator.web().search(question).await,
        }
    }

    pub fn index(&self) -> &Arc<dyn DocumentIndex> {
        &self.index
    }
}
