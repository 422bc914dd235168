//! 단위 테스트용 가짜 구현 (LLM / 검색 / 인덱스)

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{AskError, Result};
use crate::knowledge::{DocumentIndex, EvidenceChunk, IngestOutcome, NewDocument};
use crate::llm::LanguageModel;
use crate::search::{OrganicResult, SearchProvider, SearchResponse};

/// 정해진 응답을 순서대로 돌려주는 모델
///
/// 스크립트가 바닥나면 마지막 응답을 반복합니다.
pub struct ScriptedModel {
    responses: Mutex<VecDeque<String>>,
    last: Mutex<Option<String>>,
    failure: Option<String>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    pub fn new<'a>(responses: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().map(str::to_string).collect()),
            last: Mutex::new(None),
            failure: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// 모든 호출이 실패하는 모델
    pub fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Self::new(std::iter::empty())
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());

        if let Some(message) = &self.failure {
            return Err(AskError::Api {
                service: "scripted",
                status: 503,
                message: message.clone(),
            });
        }

        let mut last = self.last.lock().unwrap();
        if let Some(next) = self.responses.lock().unwrap().pop_front() {
            *last = Some(next);
        }
        last.clone().ok_or_else(|| AskError::Parse {
            service: "scripted",
            message: "no scripted response".to_string(),
        })
    }

    fn model(&self) -> &str {
        "scripted"
    }
}

/// 고정 응답 검색 프로바이더
pub struct ScriptedSearch {
    response: std::result::Result<SearchResponse, String>,
    calls: AtomicUsize,
}

impl ScriptedSearch {
    pub fn returning(response: SearchResponse) -> Self {
        Self {
            response: Ok(response),
            calls: AtomicUsize::new(0),
        }
    }

    /// (제목, 링크) 목록으로 일반 결과 생성
    pub fn with_results(results: &[(&str, &str)]) -> Self {
        Self::returning(SearchResponse {
            organic: results
                .iter()
                .map(|(title, link)| OrganicResult {
                    title: Some(title.to_string()),
                    snippet: Some(format!("About {}", title)),
                    link: Some(link.to_string()),
                })
                .collect(),
            ..Default::default()
        })
    }

    pub fn empty() -> Self {
        Self::returning(SearchResponse::default())
    }

    pub fn failing(message: &str) -> Self {
        Self {
            response: Err(message.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SearchProvider for ScriptedSearch {
    async fn search(&self, _query: &str, _num_results: usize) -> Result<SearchResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.response.clone().map_err(|message| AskError::Api {
            service: "Serper",
            status: 500,
            message,
        })
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// 고정 청크를 돌려주는 인덱스
#[derive(Default)]
pub struct FakeIndex {
    pub count: usize,
    pub chunks: Vec<EvidenceChunk>,
    pub sources: Vec<String>,
    pub fail_search: bool,
    pub fail_count: bool,
    pub searches: AtomicUsize,
}

impl FakeIndex {
    pub fn empty() -> Self {
        Self::default()
    }

    /// (출처, 본문) 목록으로 구성
    pub fn with_chunks(chunks: &[(&str, &str)]) -> Self {
        let chunks: Vec<EvidenceChunk> = chunks
            .iter()
            .enumerate()
            .map(|(i, (source, text))| EvidenceChunk {
                text: text.to_string(),
                source: source.to_string(),
                chunk_index: i as i32,
            })
            .collect();

        let mut sources: Vec<String> = Vec::new();
        for chunk in &chunks {
            if !sources.contains(&chunk.source) {
                sources.push(chunk.source.clone());
            }
        }

        Self {
            count: chunks.len(),
            chunks,
            sources,
            ..Default::default()
        }
    }

    pub fn search_count(&self) -> usize {
        self.searches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentIndex for FakeIndex {
    async fn similarity_search(&self, _query: &str, k: usize) -> Result<Vec<EvidenceChunk>> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        if self.fail_search {
            return Err(AskError::Index("vector store unavailable".to_string()));
        }
        Ok(self.chunks.iter().take(k).cloned().collect())
    }

    async fn document_count(&self) -> Result<usize> {
        if self.fail_count {
            return Err(AskError::Index("count failed".to_string()));
        }
        Ok(self.count)
    }

    async fn all_source_names(&self) -> Result<Vec<String>> {
        Ok(self.sources.clone())
    }

    async fn add_document(&self, _doc: NewDocument, _force: bool) -> Result<IngestOutcome> {
        Ok(IngestOutcome::Unchanged)
    }

    async fn delete_by_source(&self, _source: &str) -> Result<usize> {
        Ok(0)
    }

    async fn clear_all(&self) -> Result<()> {
        Ok(())
    }
}
