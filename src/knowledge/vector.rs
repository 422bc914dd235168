//! Vector Store - 벡터 저장소 트레이트 및 유틸리티
//!
//! 청크 단위로 (출처, 텍스트, 임베딩)을 저장하고 유사도 검색합니다.
//! 구현체: LanceDB(`lance.rs`), 인메모리(`memory.rs`)

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

// ============================================================================
// Types
// ============================================================================

/// 검색으로 얻은 근거 청크
///
/// 텍스트와 출처(문서 이름)를 담습니다. 생성 이후 변경되지 않습니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceChunk {
    /// 청크 텍스트
    pub text: String,
    /// 출처 문서 이름 (예: "report.md")
    pub source: String,
    /// 문서 내 청크 순번 (0-based)
    pub chunk_index: i32,
}

/// 벡터 엔트리 (저장용)
#[derive(Debug, Clone)]
pub struct VectorEntry {
    /// 출처 문서 이름
    pub source: String,
    /// 파일 확장자 (".md", ".txt" 등)
    pub file_type: String,
    /// 청크 인덱스 (0-based)
    pub chunk_index: i32,
    /// 청크 텍스트
    pub chunk_text: String,
    /// 임베딩 벡터
    pub embedding: Vec<f32>,
}

impl VectorEntry {
    /// 근거 청크로 변환
    pub fn to_evidence(&self) -> EvidenceChunk {
        EvidenceChunk {
            text: self.chunk_text.clone(),
            source: self.source.clone(),
            chunk_index: self.chunk_index,
        }
    }
}

/// 검색 결과
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub chunk: EvidenceChunk,
    /// 유사도 스코어 (높을수록 가까움)
    pub similarity: f32,
}

// ============================================================================
// VectorStore Trait
// ============================================================================

/// VectorStore 트레이트 (async)
///
/// 벡터 저장소의 공통 인터페이스입니다.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// 벡터 배치 삽입
    async fn insert_batch(&self, entries: &[VectorEntry]) -> Result<usize>;

    /// 벡터 검색 (유사도 내림차순)
    async fn search(&self, query_embedding: &[f32], limit: usize) -> Result<Vec<SearchResult>>;

    /// 출처 이름으로 벡터 삭제
    async fn delete_by_source(&self, source: &str) -> Result<usize>;

    /// 벡터 개수 조회
    async fn count(&self) -> Result<usize>;

    /// 전체 삭제
    async fn clear(&self) -> Result<()>;
}

// ============================================================================
// Utility Functions
// ============================================================================

/// 코사인 유사도 계산
///
/// 결과는 -1.0 ~ 1.0 범위입니다. 길이가 다르거나 영벡터면 0.0
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_similarity_same() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 0.0001);
    }

    #[test]
    fn test_cosine_similarity_orthogonal() {
        let a = vec![1.0, 0.0, 0.0];
        let c = vec![0.0, 1.0, 0.0];
        assert!(cosine_similarity(&a, &c).abs() < 0.0001);
    }

    #[test]
    fn test_cosine_similarity_mismatched_or_zero() {
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }

    #[test]
    fn test_entry_to_evidence() {
        let entry = VectorEntry {
            source: "notes.md".to_string(),
            file_type: ".md".to_string(),
            chunk_index: 3,
            chunk_text: "hello".to_string(),
            embedding: vec![0.5; 4],
        };
        let chunk = entry.to_evidence();
        assert_eq!(chunk.source, "notes.md");
        assert_eq!(chunk.chunk_index, 3);
        assert_eq!(chunk.text, "hello");
    }
}
