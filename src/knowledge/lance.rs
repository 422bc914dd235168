//! LanceDB Vector Store - 문서 청크 벡터 저장
//!
//! 청크 테이블 하나(`chunks`)에 출처, 텍스트, 임베딩을 함께 저장합니다.
//! ref: https://lancedb.github.io/lancedb/

use std::path::Path;
use std::sync::Arc;

use arrow_array::{
    Array, FixedSizeListArray, Float32Array, Int32Array, RecordBatch, RecordBatchIterator,
    StringArray,
};
use arrow_schema::{DataType, Field, Schema};
use async_trait::async_trait;
use futures::TryStreamExt;
use lancedb::connection::Connection;
use lancedb::query::{ExecutableQuery, QueryBase};

use super::vector::{EvidenceChunk, SearchResult, VectorEntry, VectorStore};
use crate::error::{AskError, Result};

/// 청크 테이블 이름
const TABLE_NAME: &str = "chunks";

// ============================================================================
// LanceVectorStore
// ============================================================================

/// LanceDB 벡터 저장소 구현
pub struct LanceVectorStore {
    db: Connection,
    dimension: i32,
}

impl LanceVectorStore {
    /// LanceDB 저장소 열기
    ///
    /// # Arguments
    /// * `path` - .lance 디렉토리 경로
    /// * `dimension` - 임베딩 차원 (임베딩 모델과 일치해야 함)
    pub async fn open(path: &Path, dimension: usize) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let path_str = path
            .to_str()
            .ok_or_else(|| AskError::index("Invalid path encoding"))?;

        let db = lancedb::connect(path_str).execute().await?;

        Ok(Self {
            db,
            dimension: dimension as i32,
        })
    }

    /// 청크 테이블 스키마
    fn create_schema(dimension: i32) -> Schema {
        Schema::new(vec![
            Field::new("source", DataType::Utf8, false),
            Field::new("file_type", DataType::Utf8, false),
            Field::new("chunk_index", DataType::Int32, false),
            Field::new("chunk_text", DataType::Utf8, false),
            Field::new(
                "embedding",
                DataType::FixedSizeList(
                    Arc::new(Field::new("item", DataType::Float32, true)),
                    dimension,
                ),
                false,
            ),
        ])
    }

    /// 엔트리들을 Arrow RecordBatch로 변환
    fn entries_to_batch(&self, entries: &[VectorEntry]) -> Result<RecordBatch> {
        if let Some(bad) = entries
            .iter()
            .find(|e| e.embedding.len() != self.dimension as usize)
        {
            return Err(AskError::Index(format!(
                "Embedding dimension mismatch for {}: expected {}, got {}",
                bad.source,
                self.dimension,
                bad.embedding.len()
            )));
        }

        let sources: Vec<&str> = entries.iter().map(|e| e.source.as_str()).collect();
        let file_types: Vec<&str> = entries.iter().map(|e| e.file_type.as_str()).collect();
        let chunk_indices: Vec<i32> = entries.iter().map(|e| e.chunk_index).collect();
        let chunk_texts: Vec<&str> = entries.iter().map(|e| e.chunk_text.as_str()).collect();

        let embeddings_flat: Vec<f32> = entries
            .iter()
            .flat_map(|e| e.embedding.iter().copied())
            .collect();

        let values = Float32Array::from(embeddings_flat);
        let field = Arc::new(Field::new("item", DataType::Float32, true));
        let embeddings_list = FixedSizeListArray::try_new(
            field,
            self.dimension,
            Arc::new(values) as Arc<dyn Array>,
            None,
        )
        .map_err(AskError::index)?;

        RecordBatch::try_new(
            Arc::new(Self::create_schema(self.dimension)),
            vec![
                Arc::new(StringArray::from(sources)),
                Arc::new(StringArray::from(file_types)),
                Arc::new(Int32Array::from(chunk_indices)),
                Arc::new(StringArray::from(chunk_texts)),
                Arc::new(embeddings_list),
            ],
        )
        .map_err(AskError::index)
    }

    /// 테이블 존재 여부 확인
    async fn table_exists(&self) -> bool {
        self.db
            .table_names()
            .execute()
            .await
            .map(|names| names.iter().any(|n| n == TABLE_NAME))
            .unwrap_or(false)
    }

    /// 테이블 열기 (없으면 None)
    async fn open_table(&self) -> Result<Option<lancedb::table::Table>> {
        if !self.table_exists().await {
            return Ok(None);
        }
        let table = self.db.open_table(TABLE_NAME).execute().await?;
        Ok(Some(table))
    }
}

/// SQL 문자열 리터럴 이스케이프 (작은따옴표 이중화)
fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

#[async_trait]
impl VectorStore for LanceVectorStore {
    async fn insert_batch(&self, entries: &[VectorEntry]) -> Result<usize> {
        if entries.is_empty() {
            return Ok(0);
        }

        let batch = self.entries_to_batch(entries)?;
        let schema = batch.schema();
        let batches = RecordBatchIterator::new(vec![Ok(batch)], schema);

        match self.open_table().await? {
            Some(table) => {
                table.add(batches).execute().await?;
            }
            None => {
                self.db.create_table(TABLE_NAME, batches).execute().await?;
            }
        }

        Ok(entries.len())
    }

    async fn search(&self, query_embedding: &[f32], limit: usize) -> Result<Vec<SearchResult>> {
        let Some(table) = self.open_table().await? else {
            return Ok(vec![]);
        };

        let stream = table
            .vector_search(query_embedding.to_vec())?
            .limit(limit)
            .execute()
            .await?;

        let batches: Vec<RecordBatch> = stream.try_collect().await.map_err(AskError::index)?;
        let mut results = Vec::new();

        for batch in batches {
            let sources = string_column(&batch, "source")?;
            let chunk_texts = string_column(&batch, "chunk_text")?;
            let chunk_indices = batch
                .column_by_name("chunk_index")
                .and_then(|c| c.as_any().downcast_ref::<Int32Array>())
                .ok_or_else(|| AskError::index("Missing chunk_index column"))?;
            // _distance 컬럼 (LanceDB가 자동 추가)
            let distances = batch
                .column_by_name("_distance")
                .and_then(|c| c.as_any().downcast_ref::<Float32Array>())
                .ok_or_else(|| AskError::index("Missing _distance column"))?;

            for i in 0..batch.num_rows() {
                // L2 거리 -> 유사도
                let similarity = 1.0 / (1.0 + distances.value(i));
                results.push(SearchResult {
                    chunk: EvidenceChunk {
                        text: chunk_texts.value(i).to_string(),
                        source: sources.value(i).to_string(),
                        chunk_index: chunk_indices.value(i),
                    },
                    similarity,
                });
            }
        }

        Ok(results)
    }

    async fn delete_by_source(&self, source: &str) -> Result<usize> {
        let Some(table) = self.open_table().await? else {
            return Ok(0);
        };

        let filter = format!("source = {}", quote_literal(source));
        let before = table.count_rows(Some(filter.clone())).await?;
        if before == 0 {
            return Ok(0);
        }

        table.delete(&filter).await?;
        Ok(before)
    }

    async fn count(&self) -> Result<usize> {
        match self.open_table().await? {
            Some(table) => Ok(table.count_rows(None).await?),
            None => Ok(0),
        }
    }

    async fn clear(&self) -> Result<()> {
        if self.table_exists().await {
            self.db.drop_table(TABLE_NAME).await?;
        }
        Ok(())
    }
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<StringArray>())
        .ok_or_else(|| AskError::Index(format!("Missing {} column", name)))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const DIM: usize = 8;

    fn create_test_entry(source: &str, chunk_index: i32, value: f32) -> VectorEntry {
        VectorEntry {
            source: source.to_string(),
            file_type: ".md".to_string(),
            chunk_index,
            chunk_text: format!("Chunk {} of {}", chunk_index, source),
            embedding: vec![value; DIM],
        }
    }

    #[test]
    fn test_quote_literal() {
        assert_eq!(quote_literal("a.md"), "'a.md'");
        assert_eq!(quote_literal("it's.txt"), "'it''s.txt'");
    }

    #[tokio::test]
    async fn test_lance_store_basic() {
        let temp_dir = TempDir::new().unwrap();
        let store = LanceVectorStore::open(&temp_dir.path().join("test.lance"), DIM)
            .await
            .unwrap();

        assert_eq!(store.count().await.unwrap(), 0);
        assert!(store.search(&[0.1; DIM], 4).await.unwrap().is_empty());

        let entries = vec![create_test_entry("a.md", 0, 0.1), create_test_entry("a.md", 1, 0.2)];
        assert_eq!(store.insert_batch(&entries).await.unwrap(), 2);
        assert_eq!(store.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_lance_search_returns_sources() {
        let temp_dir = TempDir::new().unwrap();
        let store = LanceVectorStore::open(&temp_dir.path().join("search.lance"), DIM)
            .await
            .unwrap();

        let entries = vec![
            create_test_entry("a.md", 0, 0.1),
            create_test_entry("b.txt", 0, 0.5),
            create_test_entry("c.md", 0, 0.9),
        ];
        store.insert_batch(&entries).await.unwrap();

        let results = store.search(&[0.5; DIM], 2).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].chunk.source, "b.txt");
    }

    #[tokio::test]
    async fn test_lance_delete_and_clear() {
        let temp_dir = TempDir::new().unwrap();
        let store = LanceVectorStore::open(&temp_dir.path().join("delete.lance"), DIM)
            .await
            .unwrap();

        let entries = vec![
            create_test_entry("a.md", 0, 0.1),
            create_test_entry("a.md", 1, 0.2),
            create_test_entry("it's.txt", 0, 0.3),
        ];
        store.insert_batch(&entries).await.unwrap();

        assert_eq!(store.delete_by_source("a.md").await.unwrap(), 2);
        assert_eq!(store.count().await.unwrap(), 1);
        assert_eq!(store.delete_by_source("missing.md").await.unwrap(), 0);

        store.clear().await.unwrap();
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_lance_rejects_wrong_dimension() {
        let temp_dir = TempDir::new().unwrap();
        let store = LanceVectorStore::open(&temp_dir.path().join("dim.lance"), DIM)
            .await
            .unwrap();

        let mut entry = create_test_entry("a.md", 0, 0.1);
        entry.embedding = vec![0.1; DIM + 1];
        assert!(store.insert_batch(&[entry]).await.is_err());
    }
}
