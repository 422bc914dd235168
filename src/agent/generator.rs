//! 답변 생성기
//!
//! 템플릿을 채워 LLM을 한 번 호출하는 무상태 래퍼입니다.
//! 세 모드(문서/웹/하이브리드)가 같은 생성기를 씁니다.

use std::sync::Arc;

use crate::config::Config;
use crate::error::Result;
use crate::llm::{LanguageModel, OpenAiChat};

use super::prompts::PromptTemplate;

pub struct AnswerGenerator {
    llm: Arc<dyn LanguageModel>,
}

impl AnswerGenerator {
    pub fn new(llm: Arc<dyn LanguageModel>) -> Self {
        Self { llm }
    }

    /// 설정에서 생성 (API 키가 없으면 여기서 실패)
    pub fn from_config(config: &Config) -> Result<Self> {
        let llm = OpenAiChat::from_config(config)?;
        Ok(Self::new(Arc::new(llm)))
    }

    /// 템플릿을 채워 답변 생성
    pub async fn generate(&self, template: PromptTemplate, vars: &[(&str, &str)]) -> Result<String> {
        let prompt = template.render(vars)?;
        tracing::debug!(
            "Generating with {} template via {}",
            template.id(),
            self.llm.model()
        );
        self.llm.complete(&prompt).await
    }

    pub fn llm(&self) -> &Arc<dyn LanguageModel> {
        &self.llm
    }
}
