//! Knowledge 모듈 - 문서 인덱스
//!
//! - Chunker: 재귀 구분자 기반 텍스트 분할
//! - VectorStore: LanceDB / 인메모리 청크 벡터 저장
//! - SourceCatalog: SQLite 출처 목록 (청크 수, 콘텐츠 해시)
//! - KnowledgeIndex: 위 셋과 임베딩을 묶은 `DocumentIndex` 구현

mod chunker;
mod index;
mod lance;
mod memory;
mod store;
mod vector;

// Re-exports
pub use chunker::{default_chunker, recursive_chunker, ChunkConfig, Chunker, RecursiveChunker};
pub use index::{
    content_hash, DocumentIndex, IngestOutcome, KnowledgeIndex, NewDocument, CATALOG_FILE,
    VECTORS_DIR,
};
pub use lance::LanceVectorStore;
pub use memory::MemoryVectorStore;
pub use store::{CatalogStats, SourceCatalog, SourceEntry};
pub use vector::{cosine_similarity, EvidenceChunk, SearchResult, VectorEntry, VectorStore};
