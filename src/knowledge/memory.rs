//! 인메모리 벡터 저장소
//!
//! 코사인 유사도 전수 비교. 주로 테스트에서 사용합니다.

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::vector::{cosine_similarity, SearchResult, VectorEntry, VectorStore};
use crate::error::Result;

/// 프로세스 내 벡터 저장소
#[derive(Default)]
pub struct MemoryVectorStore {
    entries: RwLock<Vec<VectorEntry>>,
}

impl MemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn insert_batch(&self, entries: &[VectorEntry]) -> Result<usize> {
        let mut guard = self.entries.write().await;
        guard.extend(entries.iter().cloned());
        Ok(entries.len())
    }

    async fn search(&self, query_embedding: &[f32], limit: usize) -> Result<Vec<SearchResult>> {
        let guard = self.entries.read().await;

        let mut scored: Vec<SearchResult> = guard
            .iter()
            .map(|entry| SearchResult {
                chunk: entry.to_evidence(),
                similarity: cosine_similarity(query_embedding, &entry.embedding),
            })
            .collect();

        // 동점이면 삽입 순서 유지 (stable sort)
        scored.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(limit);

        Ok(scored)
    }

    async fn delete_by_source(&self, source: &str) -> Result<usize> {
        let mut guard = self.entries.write().await;
        let before = guard.len();
        guard.retain(|e| e.source != source);
        Ok(before - guard.len())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.entries.read().await.len())
    }

    async fn clear(&self) -> Result<()> {
        self.entries.write().await.clear();
        Ok(())
    }
}
