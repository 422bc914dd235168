//! 문서 인덱스 - 임베딩 + 벡터 저장소 + 출처 카탈로그 통합
//!
//! 질의응답 코어가 의존하는 유일한 문서 접근 경로(`DocumentIndex`)입니다.
//! 인스턴스는 시작 시 한 번 만들어 `Arc`로 각 컴포넌트에 전달합니다.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use sha2::{Digest, Sha256};

use crate::embedding::EmbeddingProvider;
use crate::error::Result;

use super::chunker::{default_chunker, Chunker};
use super::lance::LanceVectorStore;
use super::memory::MemoryVectorStore;
use super::store::{CatalogStats, SourceCatalog, SourceEntry};
use super::vector::{EvidenceChunk, VectorEntry, VectorStore};

// ============================================================================
// Types
// ============================================================================

/// 출처 카탈로그 파일 이름 (데이터 디렉토리 기준)
pub const CATALOG_FILE: &str = "catalog.db";
/// 청크 벡터 테이블 디렉토리 이름
pub const VECTORS_DIR: &str = "chunks.lance";

/// 인덱싱할 새 문서
#[derive(Debug, Clone)]
pub struct NewDocument {
    /// 출처 이름 (파일 이름 등)
    pub source: String,
    /// 파일 확장자 (".md", ".txt")
    pub file_type: String,
    pub content: String,
}

/// 문서 추가 결과
#[derive(Debug, Clone, PartialEq)]
pub enum IngestOutcome {
    /// 새로 인덱싱됨 (기존 청크는 교체)
    Indexed { chunks: usize },
    /// 같은 내용이 이미 인덱싱되어 건너뜀
    Unchanged,
    /// 청크가 하나도 나오지 않음 (빈 문서)
    Empty,
}

// ============================================================================
// DocumentIndex Trait
// ============================================================================

/// 문서 인덱스 트레이트
///
/// 문서가 0개여도 에러가 아니라 빈 결과를 돌려줘야 합니다.
#[async_trait]
pub trait DocumentIndex: Send + Sync {
    /// 질문과 가까운 청크 상위 k개 (인덱스가 돌려준 순서 그대로)
    async fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<EvidenceChunk>>;

    /// 인덱싱된 청크 수
    async fn document_count(&self) -> Result<usize>;

    /// 인덱싱된 출처 이름 목록
    async fn all_source_names(&self) -> Result<Vec<String>>;

    /// 문서 추가 (`force`면 같은 내용이어도 다시 인덱싱)
    async fn add_document(&self, doc: NewDocument, force: bool) -> Result<IngestOutcome>;

    /// 출처 하나 삭제, 삭제된 청크 수 반환
    async fn delete_by_source(&self, source: &str) -> Result<usize>;

    /// 전체 삭제
    async fn clear_all(&self) -> Result<()>;
}

// ============================================================================
// KnowledgeIndex
// ============================================================================

/// 기본 문서 인덱스 구현
pub struct KnowledgeIndex {
    vectors: Box<dyn VectorStore>,
    catalog: SourceCatalog,
    embedder: Arc<dyn EmbeddingProvider>,
    chunker: Box<dyn Chunker>,
}

impl KnowledgeIndex {
    /// 구성 요소로 직접 생성
    pub fn new(
        vectors: Box<dyn VectorStore>,
        catalog: SourceCatalog,
        embedder: Arc<dyn EmbeddingProvider>,
        chunker: Box<dyn Chunker>,
    ) -> Self {
        Self {
            vectors,
            catalog,
            embedder,
            chunker,
        }
    }

    /// 데이터 디렉토리에서 열기
    ///
    /// - `catalog.db`: 출처 카탈로그 (SQLite)
    /// - `chunks.lance`: 청크 벡터 (LanceDB)
    pub async fn open(
        data_dir: &Path,
        embedder: Arc<dyn EmbeddingProvider>,
        chunker: Box<dyn Chunker>,
    ) -> Result<Self> {
        if !data_dir.exists() {
            std::fs::create_dir_all(data_dir)?;
        }

        let catalog = SourceCatalog::open(&data_dir.join(CATALOG_FILE))?;
        let vectors =
            LanceVectorStore::open(&data_dir.join(VECTORS_DIR), embedder.dimension()).await?;

        tracing::debug!("Opened knowledge index at {:?}", data_dir);
        Ok(Self::new(Box::new(vectors), catalog, embedder, chunker))
    }

    /// 프로세스 메모리에만 존재하는 인덱스
    pub fn in_memory(embedder: Arc<dyn EmbeddingProvider>) -> Result<Self> {
        Ok(Self::new(
            Box::new(MemoryVectorStore::new()),
            SourceCatalog::open_in_memory()?,
            embedder,
            default_chunker(),
        ))
    }

    /// 출처 카탈로그 목록
    pub fn sources(&self) -> Result<Vec<SourceEntry>> {
        self.catalog.list()
    }

    /// 카탈로그 통계
    pub fn stats(&self) -> Result<CatalogStats> {
        self.catalog.stats()
    }

    /// 청크 교체 도중 실패한 출처의 카탈로그 행 제거
    fn forget_source(&self, source: &str) {
        if let Err(e) = self.catalog.delete(source) {
            tracing::warn!("Failed to drop catalog entry for {}: {}", source, e);
        }
    }
}

/// 원문 sha256 (hex)
pub fn content_hash(content: &str) -> String {
    format!("{:x}", Sha256::digest(content.as_bytes()))
}

#[async_trait]
impl DocumentIndex for KnowledgeIndex {
    async fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<EvidenceChunk>> {
        if self.vectors.count().await? == 0 {
            return Ok(vec![]);
        }

        let query_embedding = self.embedder.embed(query).await?;
        let results = self.vectors.search(&query_embedding, k).await?;

        Ok(results.into_iter().map(|r| r.chunk).collect())
    }

    async fn document_count(&self) -> Result<usize> {
        self.vectors.count().await
    }

    async fn all_source_names(&self) -> Result<Vec<String>> {
        self.catalog.names()
    }

    async fn add_document(&self, doc: NewDocument, force: bool) -> Result<IngestOutcome> {
        let hash = content_hash(&doc.content);

        if !force {
            if let Some(existing) = self.catalog.get(&doc.source)? {
                if existing.content_hash == hash {
                    tracing::info!("Unchanged, skipping: {}", doc.source);
                    return Ok(IngestOutcome::Unchanged);
                }
            }
        }

        let chunks = self.chunker.chunk(&doc.content);
        if chunks.is_empty() {
            tracing::warn!("No chunks generated for document: {}", doc.source);
            return Ok(IngestOutcome::Empty);
        }

        // 임베딩을 먼저 끝내야 실패 시 기존 청크가 남음
        let embeddings = self.embedder.embed_batch(&chunks).await?;

        let replaced = self.vectors.delete_by_source(&doc.source).await?;
        if replaced > 0 {
            tracing::debug!("Replacing {} chunks of {}", replaced, doc.source);
        }

        let entries: Vec<VectorEntry> = chunks
            .into_iter()
            .zip(embeddings)
            .enumerate()
            .map(|(i, (chunk_text, embedding))| VectorEntry {
                source: doc.source.clone(),
                file_type: doc.file_type.clone(),
                chunk_index: i as i32,
                chunk_text,
                embedding,
            })
            .collect();

        // 삭제 이후 실패하면 카탈로그 행도 지워야 같은 내용 재수집이 Unchanged로 막히지 않음
        let inserted = match self.vectors.insert_batch(&entries).await {
            Ok(n) => n,
            Err(e) => {
                self.forget_source(&doc.source);
                return Err(e);
            }
        };

        let upserted = self.catalog.upsert(&SourceEntry {
            name: doc.source.clone(),
            file_type: doc.file_type.clone(),
            chunk_count: inserted,
            content_bytes: doc.content.len(),
            content_hash: hash,
            created_at: Utc::now(),
        });
        if let Err(e) = upserted {
            self.forget_source(&doc.source);
            return Err(e);
        }

        tracing::info!("Indexed document: {} (chunks={})", doc.source, inserted);
        Ok(IngestOutcome::Indexed { chunks: inserted })
    }

    async fn delete_by_source(&self, source: &str) -> Result<usize> {
        let deleted = self.vectors.delete_by_source(source).await?;
        self.catalog.delete(source)?;
        tracing::info!("Deleted source {} ({} chunks)", source, deleted);
        Ok(deleted)
    }

    async fn clear_all(&self) -> Result<()> {
        self.vectors.clear().await?;
        let removed = self.catalog.clear()?;
        tracing::info!("Cleared index ({} sources)", removed);
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
