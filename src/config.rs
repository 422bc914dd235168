//! 설정 모듈
//!
//! 환경변수(.env 포함)에서 API 키, 모델, 검색/청킹 파라미터를 읽습니다.
//! API 키 존재 여부는 여기서 검사하지 않고, 각 컴포넌트 생성 시점에 검사합니다.

use std::path::PathBuf;

use crate::error::{AskError, Result};

/// OpenAI 호환 API 기본 URL
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
/// Serper 검색 엔드포인트
/// source: https://serper.dev
pub const DEFAULT_SERPER_URL: &str = "https://google.serper.dev/search";
pub const DEFAULT_LLM_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_CHUNK_SIZE: usize = 1000;
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;
pub const DEFAULT_TOP_K: usize = 4;
pub const DEFAULT_MAX_SEARCH_RESULTS: usize = 5;

pub const OPENAI_API_KEY_VAR: &str = "OPENAI_API_KEY";
pub const SERPER_API_KEY_VAR: &str = "SERPER_API_KEY";

/// 어시스턴트 전체 설정
#[derive(Debug, Clone)]
pub struct Config {
    pub openai_api_key: Option<String>,
    pub serper_api_key: Option<String>,
    pub openai_base_url: String,
    pub serper_url: String,
    pub llm_model: String,
    pub embedding_model: String,
    pub temperature: f32,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub top_k: usize,
    pub max_search_results: usize,
    pub data_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            serper_api_key: None,
            openai_base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            serper_url: DEFAULT_SERPER_URL.to_string(),
            llm_model: DEFAULT_LLM_MODEL.to_string(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            top_k: DEFAULT_TOP_K,
            max_search_results: DEFAULT_MAX_SEARCH_RESULTS,
            data_dir: get_data_dir(),
        }
    }
}

impl Config {
    /// 환경변수에서 설정 로드
    ///
    /// 현재 디렉토리의 `.env`가 있으면 먼저 읽습니다.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// 임의의 조회 함수로 설정 구성 (테스트용 주입 지점)
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        Self {
            openai_api_key: non_empty(OPENAI_API_KEY_VAR),
            serper_api_key: non_empty(SERPER_API_KEY_VAR),
            openai_base_url: non_empty("OPENAI_BASE_URL")
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or(defaults.openai_base_url),
            serper_url: non_empty("SERPER_API_URL").unwrap_or(defaults.serper_url),
            llm_model: non_empty("LLM_MODEL").unwrap_or(defaults.llm_model),
            embedding_model: non_empty("EMBEDDING_MODEL").unwrap_or(defaults.embedding_model),
            temperature: defaults.temperature,
            chunk_size: defaults.chunk_size,
            chunk_overlap: defaults.chunk_overlap,
            top_k: parse_count(non_empty("TOP_K_RESULTS"), "TOP_K_RESULTS", defaults.top_k),
            max_search_results: parse_count(
                non_empty("MAX_SEARCH_RESULTS"),
                "MAX_SEARCH_RESULTS",
                defaults.max_search_results,
            ),
            data_dir: non_empty("PALANK_ASK_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
        }
    }

    /// OpenAI API 키 (없으면 설정 에러)
    pub fn require_openai_key(&self) -> Result<&str> {
        self.openai_api_key
            .as_deref()
            .ok_or(AskError::MissingApiKey {
                name: OPENAI_API_KEY_VAR,
            })
    }

    /// Serper API 키 (없으면 설정 에러)
    pub fn require_serper_key(&self) -> Result<&str> {
        self.serper_api_key
            .as_deref()
            .ok_or(AskError::MissingApiKey {
                name: SERPER_API_KEY_VAR,
            })
    }

    pub fn has_openai_key(&self) -> bool {
        self.openai_api_key.is_some()
    }

    pub fn has_serper_key(&self) -> bool {
        self.serper_api_key.is_some()
    }
}

/// 데이터 디렉토리 경로 (~/.palank-ask/)
pub fn get_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".palank-ask")
}

/// 양의 정수 파싱 (실패 시 기본값 + 경고)
fn parse_count(raw: Option<String>, name: &str, default: usize) -> usize {
    match raw {
        None => default,
        Some(value) => match value.trim().parse::<usize>() {
            Ok(n) if n > 0 => n,
            _ => {
                tracing::warn!("Invalid {}={:?}, using default {}", name, value, default);
                default
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults_without_env() {
        let config = Config::from_lookup(|_| None);
        assert_eq!(config.llm_model, "gpt-4o-mini");
        assert_eq!(config.embedding_model, "text-embedding-3-small");
        assert_eq!(config.top_k, 4);
        assert_eq!(config.max_search_results, 5);
        assert_eq!(config.chunk_size, 1000);
        assert_eq!(config.chunk_overlap, 200);
        assert!(!config.has_openai_key());
        assert!(config.require_openai_key().is_err());
        assert!(config.require_serper_key().is_err());
    }

    #[test]
    fn test_empty_key_counts_as_missing() {
        let config = Config::from_lookup(lookup_from(&[("OPENAI_API_KEY", "  ")]));
        assert!(!config.has_openai_key());
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("SERPER_API_KEY", "serper-test"),
            ("LLM_MODEL", "gpt-4o"),
            ("OPENAI_BASE_URL", "http://localhost:8080/v1/"),
            ("TOP_K_RESULTS", "8"),
            ("PALANK_ASK_DATA_DIR", "/tmp/palank-ask"),
        ]));
        assert_eq!(config.require_openai_key().ok(), Some("sk-test"));
        assert_eq!(config.require_serper_key().ok(), Some("serper-test"));
        assert_eq!(config.llm_model, "gpt-4o");
        assert_eq!(config.openai_base_url, "http://localhost:8080/v1");
        assert_eq!(config.top_k, 8);
        assert_eq!(config.data_dir, PathBuf::from("/tmp/palank-ask"));
    }

    #[test]
    fn test_invalid_count_falls_back() {
        let config = Config::from_lookup(lookup_from(&[
            ("TOP_K_RESULTS", "zero"),
            ("MAX_SEARCH_RESULTS", "0"),
        ]));
        assert_eq!(config.top_k, DEFAULT_TOP_K);
        assert_eq!(config.max_search_results, DEFAULT_MAX_SEARCH_RESULTS);
    }
}
