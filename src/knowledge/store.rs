//! Source Catalog - rusqlite 기반 출처 목록
//!
//! 인덱싱된 문서(출처)별 메타데이터를 저장합니다.
//! 저장 위치: ~/.palank-ask/catalog.db
//!
//! 청크 본문과 임베딩은 벡터 저장소에, 출처 단위 정보(청크 수, 크기,
//! 콘텐츠 해시)는 여기에 둡니다.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use serde::{Deserialize, Serialize};

use crate::error::{AskError, Result};

// ============================================================================
// Types
// ============================================================================

/// 카탈로그에 저장된 출처
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceEntry {
    pub name: String,
    pub file_type: String,
    pub chunk_count: usize,
    pub content_bytes: usize,
    /// 원문 sha256 (hex)
    pub content_hash: String,
    pub created_at: DateTime<Utc>,
}

/// 카탈로그 통계
#[derive(Debug, Clone, Serialize)]
pub struct CatalogStats {
    pub source_count: usize,
    pub chunk_count: usize,
    pub total_content_bytes: usize,
}

// ============================================================================
// SourceCatalog
// ============================================================================

/// 출처 카탈로그
pub struct SourceCatalog {
    conn: Arc<Mutex<Connection>>,
    db_path: Option<PathBuf>,
}

impl SourceCatalog {
    /// 카탈로그 열기 (없으면 생성)
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;

        let catalog = Self {
            conn: Arc::new(Mutex::new(conn)),
            db_path: Some(path.to_path_buf()),
        };
        catalog.initialize()?;
        Ok(catalog)
    }

    /// 인메모리 카탈로그
    pub fn open_in_memory() -> Result<Self> {
        let catalog = Self {
            conn: Arc::new(Mutex::new(Connection::open_in_memory()?)),
            db_path: None,
        };
        catalog.initialize()?;
        Ok(catalog)
    }

    /// DB 경로 (인메모리면 None)
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| AskError::Index(format!("Lock error: {}", e)))
    }

    /// 스키마 초기화
    fn initialize(&self) -> Result<()> {
        let conn = self.lock()?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS sources (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                file_type TEXT NOT NULL,
                chunk_count INTEGER NOT NULL,
                content_bytes INTEGER NOT NULL,
                content_hash TEXT NOT NULL,
                created_at TEXT NOT NULL
            )",
            [],
        )?;

        tracing::debug!("Source catalog initialized at {:?}", self.db_path);
        Ok(())
    }

    /// 출처 저장 (이름이 같으면 교체)
    pub fn upsert(&self, entry: &SourceEntry) -> Result<()> {
        let conn = self.lock()?;

        conn.execute(
            "INSERT INTO sources (name, file_type, chunk_count, content_bytes, content_hash, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(name) DO UPDATE SET
                file_type = excluded.file_type,
                chunk_count = excluded.chunk_count,
                content_bytes = excluded.content_bytes,
                content_hash = excluded.content_hash,
                created_at = excluded.created_at",
            params![
                entry.name,
                entry.file_type,
                entry.chunk_count as i64,
                entry.content_bytes as i64,
                entry.content_hash,
                entry.created_at.to_rfc3339(),
            ],
        )?;

        Ok(())
    }

    /// 이름으로 조회
    pub fn get(&self, name: &str) -> Result<Option<SourceEntry>> {
        let conn = self.lock()?;

        let entry = conn
            .query_row(
                "SELECT name, file_type, chunk_count, content_bytes, content_hash, created_at
                 FROM sources WHERE name = ?1",
                params![name],
                row_to_entry,
            )
            .optional()?;

        Ok(entry)
    }

    /// 전체 목록 (이름순)
    pub fn list(&self) -> Result<Vec<SourceEntry>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(
            "SELECT name, file_type, chunk_count, content_bytes, content_hash, created_at
             FROM sources ORDER BY name",
        )?;

        let entries = stmt
            .query_map([], row_to_entry)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(entries)
    }

    /// 출처 이름 목록 (이름순)
    pub fn names(&self) -> Result<Vec<String>> {
        Ok(self.list()?.into_iter().map(|e| e.name).collect())
    }

    /// 출처 삭제
    pub fn delete(&self, name: &str) -> Result<bool> {
        let conn = self.lock()?;
        let rows = conn.execute("DELETE FROM sources WHERE name = ?1", params![name])?;
        Ok(rows > 0)
    }

    /// 전체 삭제
    pub fn clear(&self) -> Result<usize> {
        let conn = self.lock()?;
        let rows = conn.execute("DELETE FROM sources", [])?;
        Ok(rows)
    }

    /// 통계
    pub fn stats(&self) -> Result<CatalogStats> {
        let conn = self.lock()?;

        let (sources, chunks, bytes): (i64, i64, i64) = conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(chunk_count), 0), COALESCE(SUM(content_bytes), 0)
             FROM sources",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;

        Ok(CatalogStats {
            source_count: sources as usize,
            chunk_count: chunks as usize,
            total_content_bytes: bytes as usize,
        })
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

fn row_to_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<SourceEntry> {
    Ok(SourceEntry {
        name: row.get(0)?,
        file_type: row.get(1)?,
        chunk_count: row.get::<_, i64>(2)? as usize,
        content_bytes: row.get::<_, i64>(3)? as usize,
        content_hash: row.get(4)?,
        created_at: parse_datetime(row.get::<_, String>(5)?),
    })
}

/// RFC3339 문자열을 DateTime<Utc>로 파싱
fn parse_datetime(s: String) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

// ============================================================================
// Tests
// ============================================================================
