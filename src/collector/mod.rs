//! 파일 수집 모듈
//!
//! 로컬 파일 및 폴더에서 인덱싱할 문서를 모읍니다.
//! .gitignore 패턴을 존중하고, 텍스트/마크다운만 수집합니다.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use ignore::WalkBuilder;

use crate::knowledge::NewDocument;

/// `--text` 입력의 출처 이름
pub const DIRECT_INPUT_SOURCE: &str = "direct-input";

// ============================================================================
// Document Types
// ============================================================================

/// 지원하는 문서 타입
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentType {
    Text,
    Markdown,
}

impl DocumentType {
    /// 확장자로 타입 결정 (대소문자 무시)
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "txt" => Some(Self::Text),
            "md" | "markdown" => Some(Self::Markdown),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }
}

/// 점을 포함한 소문자 확장자 (".md"), 없으면 빈 문자열
pub fn dotted_extension(path: &Path) -> String {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{}", ext.to_lowercase()))
        .unwrap_or_default()
}

// ============================================================================
// Collected File
// ============================================================================

#[derive(Debug, Clone)]
pub struct CollectedFile {
    pub path: PathBuf,
    pub doc_type: DocumentType,
    pub size: u64,
}

impl CollectedFile {
    /// 지원하지 않는 확장자면 `None`
    pub fn from_path(path: PathBuf) -> Result<Option<Self>> {
        let Some(doc_type) = DocumentType::from_path(&path) else {
            return Ok(None);
        };

        let metadata = std::fs::metadata(&path)
            .with_context(|| format!("Failed to read metadata: {:?}", path))?;

        if !metadata.is_file() {
            return Ok(None);
        }

        Ok(Some(Self {
            path,
            doc_type,
            size: metadata.len(),
        }))
    }

    /// 파일을 읽어 인덱싱할 문서로 변환
    ///
    /// 출처 이름은 파일 이름, file_type은 점을 포함한 확장자입니다.
    pub fn load(&self) -> Result<NewDocument> {
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read file as UTF-8: {:?}", self.path))?;

        let source = self
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string());

        Ok(NewDocument {
            source,
            file_type: dotted_extension(&self.path),
            content,
        })
    }
}

/// 단일 파일 로드 (지원하지 않는 타입은 에러)
pub fn load_document(path: &Path) -> Result<NewDocument> {
    if DocumentType::from_path(path).is_none() {
        bail!("Unsupported file type: {}", dotted_extension(path));
    }

    match CollectedFile::from_path(path.to_path_buf())? {
        Some(file) => file.load(),
        None => bail!("Not a file: {:?}", path),
    }
}

/// 직접 입력한 텍스트를 문서로
pub fn direct_input(text: &str) -> NewDocument {
    NewDocument {
        source: DIRECT_INPUT_SOURCE.to_string(),
        file_type: ".txt".to_string(),
        content: text.to_string(),
    }
}

// ============================================================================
// File Collector
// ============================================================================

#[derive(Debug, Clone)]
pub struct CollectorConfig {
    pub respect_gitignore: bool,
    pub include_hidden: bool,
    /// 최대 파일 크기 (바이트, 0이면 제한 없음)
    pub max_file_size: u64,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            respect_gitignore: true,
            include_hidden: false,
            max_file_size: 10 * 1024 * 1024, // 10MB
        }
    }
}

pub struct FileCollector {
    config: CollectorConfig,
}

impl FileCollector {
    pub fn new(config: CollectorConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(CollectorConfig::default())
    }

    /// 폴더 재귀 수집 (경로 순 정렬)
    pub fn collect_directory(&self, path: &Path) -> Result<Vec<CollectedFile>> {
        if !path.exists() {
            bail!("Directory not found: {:?}", path);
        }

        if !path.is_dir() {
            bail!("Not a directory: {:?}", path);
        }

        let mut files = Vec::new();

        let walker = WalkBuilder::new(path)
            .hidden(!self.config.include_hidden)
            .git_ignore(self.config.respect_gitignore)
            .git_global(self.config.respect_gitignore)
            .git_exclude(self.config.respect_gitignore)
            .build();

        for entry in walker {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    tracing::warn!("Failed to read entry: {}", e);
                    continue;
                }
            };

            if !entry.file_type().map(|ft| ft.is_file()).unwrap_or(false) {
                continue;
            }

            match CollectedFile::from_path(entry.path().to_path_buf()) {
                Ok(Some(file)) => {
                    if self.should_include(&file) {
                        files.push(file);
                    }
                }
                Ok(None) => {}
                Err(e) => tracing::warn!("Failed to collect file: {}", e),
            }
        }

        files.sort_by(|a, b| a.path.cmp(&b.path));
        tracing::info!("Collected {} files from {:?}", files.len(), path);
        Ok(files)
    }

    fn should_include(&self, file: &CollectedFile) -> bool {
        if self.config.max_file_size > 0 && file.size > self.config.max_file_size {
            tracing::debug!("Skipping large file: {:?} ({} bytes)", file.path, file.size);
            return false;
        }
        true
    }
}
