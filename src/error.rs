//! 에러 타입
//!
//! 라이브러리 경계(LLM, 검색, 임베딩, 인덱스)에서 사용하는 에러입니다.
//! CLI 레이어는 anyhow로 감싸서 컨텍스트를 붙입니다.

use thiserror::Error;

/// palank-ask 공통 에러
#[derive(Debug, Error)]
pub enum AskError {
    /// API 키 미설정 (설정 에러 - 재시도 없음)
    #[error("{name} is not set. Please set it in your environment or .env file.")]
    MissingApiKey { name: &'static str },

    /// HTTP 전송 실패
    #[error("{service} request failed: {source}")]
    Http {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// API가 실패 상태 코드를 반환
    #[error("{service} API error ({status}): {message}")]
    Api {
        service: &'static str,
        status: u16,
        message: String,
    },

    /// 응답 파싱 실패
    #[error("Failed to parse {service} response: {message}")]
    Parse {
        service: &'static str,
        message: String,
    },

    /// 벡터 인덱스 / 카탈로그 에러
    #[error("Index error: {0}")]
    Index(String),

    /// 프롬프트 템플릿 변수 누락
    #[error("Prompt template '{template}' is missing variable '{slot}'")]
    Template {
        template: &'static str,
        slot: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl AskError {
    /// 인덱스 에러 생성 헬퍼
    pub fn index(err: impl std::fmt::Display) -> Self {
        Self::Index(err.to_string())
    }

    /// 설정 에러 여부
    pub fn is_config(&self) -> bool {
        matches!(self, Self::MissingApiKey { .. })
    }
}

impl From<rusqlite::Error> for AskError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Index(format!("SQLite: {}", err))
    }
}

impl From<lancedb::Error> for AskError {
    fn from(err: lancedb::Error) -> Self {
        Self::Index(format!("LanceDB: {}", err))
    }
}

pub type Result<T> = std::result::Result<T, AskError>;
