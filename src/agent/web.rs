//! 웹 검색 에이전트
//!
//! 검색 → 포맷팅 → 생성까지 한 번에 수행합니다.

use std::sync::Arc;

use crate::error::Result;
use crate::search::{extract_sources, format_search_results, SearchProvider, NO_RESULTS_SENTINEL};

use super::generator::AnswerGenerator;
use super::prompts::PromptTemplate;
use super::{Provenance, QueryResult, RawContext, RouteDecision};

/// 검색 결과가 없을 때의 답변
pub const NO_WEB_RESULTS_MESSAGE: &str =
    "I couldn't find any relevant web search results for your query.";

pub struct WebSearchAgent {
    provider: Arc<dyn SearchProvider>,
    generator: Arc<AnswerGenerator>,
    num_results: usize,
}

impl WebSearchAgent {
    pub fn new(
        provider: Arc<dyn SearchProvider>,
        generator: Arc<AnswerGenerator>,
        num_results: usize,
    ) -> Self {
        Self {
            provider,
            generator,
            num_results,
        }
    }

    /// 웹 검색 후 답변 생성
    ///
    /// 검색 실패는 잡지 않고 호출자에게 전파합니다.
    /// 결과가 비면 생성 호출 없이 고정 메시지를 돌려줍니다.
    pub async fn search(&self, question: &str) -> Result<QueryResult> {
        let results = self.provider.search(question, self.num_results).await?;
        let formatted = format_search_results(&results);

        if formatted == NO_RESULTS_SENTINEL {
            tracing::info!("Web search via {} returned nothing", self.provider.name());
            return Ok(QueryResult {
                answer: NO_WEB_RESULTS_MESSAGE.to_string(),
                sources: vec![],
                mode: RouteDecision::Web,
                context: RawContext::Web { results },
            });
        }

        let answer = self
            .generator
            .generate(
                PromptTemplate::Web,
                &[("search_results", &formatted), ("question", question)],
            )
            .await?;

        let sources = extract_sources(&results)
            .into_iter()
            .map(|s| Provenance::Web {
                title: s.title,
                url: s.url,
            })
            .collect();

        Ok(QueryResult {
            answer,
            sources,
            mode: RouteDecision::Web,
            context: RawContext::Web { results },
        })
    }
}
