//! palank-ask - 문서 + 웹 검색 하이브리드 질의응답
//!
//! 질문마다 근거 소스(인덱싱된 문서 / 웹 검색 / 둘 다)를 라우팅하고,
//! 모은 근거를 하나의 답변과 출처 목록으로 합칩니다.

pub mod agent;
pub mod assistant;
pub mod cli;
pub mod collector;
pub mod config;
pub mod embedding;
pub mod error;
pub mod knowledge;
pub mod llm;
pub mod search;
pub mod session;

// Re-exports
pub use agent::{
    AnswerGenerator, DocumentAgent, DocumentRetriever, HybridOrchestrator, PromptTemplate,
    Provenance, QueryResult, RawContext, RouteDecision, Router, SourceOutcome, WebSearchAgent,
};
pub use assistant::{open_index, Assistant, QueryMode};
pub use config::{get_data_dir, Config};
pub use embedding::{EmbeddingProvider, OpenAiEmbedding};
pub use error::{AskError, Result};
pub use knowledge::{
    ChunkConfig, Chunker, DocumentIndex, EvidenceChunk, IngestOutcome, KnowledgeIndex,
    NewDocument, SourceCatalog,
};
pub use llm::{LanguageModel, OpenAiChat};
pub use search::{SearchProvider, SearchResponse, SerperClient};
pub use session::{ChatSession, ChatTurn};
