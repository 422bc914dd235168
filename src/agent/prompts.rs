//! 프롬프트 템플릿
//!
//! `{slot}` 자리표시자를 변수로 채웁니다. 템플릿 본문만 스캔하므로
//! 변수 값(질문 등)에 중괄호가 들어 있어도 다시 치환되지 않습니다.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::{AskError, Result};

pub const DOCUMENTS_PROMPT: &str = r#"You are a helpful AI assistant that answers questions based on the provided context from documents.

Context from documents:
{context}

User Question: {question}

Instructions:
1. Answer the question based ONLY on the provided context
2. If the context doesn't contain enough information to answer, say so clearly
3. Cite which document/source the information comes from when relevant
4. Be concise but thorough

Answer:"#;

pub const WEB_PROMPT: &str = r#"You are a helpful AI assistant that answers questions based on web search results.

Web Search Results:
{search_results}

User Question: {question}

Instructions:
1. Synthesize the information from the search results to answer the question
2. Cite sources by mentioning the website names when relevant
3. If the search results don't contain enough information, acknowledge the limitations
4. Provide a comprehensive but concise answer

Answer:"#;

pub const HYBRID_PROMPT: &str = r#"You are a helpful AI assistant that answers questions using both document knowledge and web search results.

Document Context (from uploaded documents):
{rag_context}

Web Search Results:
{web_context}

User Question: {question}

Instructions:
1. Synthesize information from BOTH the documents and web search results
2. Prioritize document information for specific/local knowledge
3. Use web search results for broader context or recent information
4. Clearly indicate when information comes from documents vs. the web
5. If there are conflicts between sources, acknowledge them
6. Be comprehensive but concise

Answer:"#;

pub const ROUTER_PROMPT: &str = r#"Analyze this question and determine the best way to answer it.

Question: {question}

Context:
- Documents available: {has_documents}
- Types of documents: {document_sources}

Determine if this question is best answered by:
1. "documents" - if it's about specific content in the uploaded documents
2. "web" - if it requires recent/external information not likely in documents
3. "hybrid" - if it could benefit from both document context and web information

Respond with just one word: documents, web, or hybrid"#;

/// 답변 생성 템플릿
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptTemplate {
    /// 문서 전용 (`context`, `question`)
    Documents,
    /// 웹 전용 (`search_results`, `question`)
    Web,
    /// 문서 + 웹 통합 (`rag_context`, `web_context`, `question`)
    Hybrid,
}

impl PromptTemplate {
    pub fn id(&self) -> &'static str {
        match self {
            Self::Documents => "documents",
            Self::Web => "web",
            Self::Hybrid => "hybrid",
        }
    }

    pub fn text(&self) -> &'static str {
        match self {
            Self::Documents => DOCUMENTS_PROMPT,
            Self::Web => WEB_PROMPT,
            Self::Hybrid => HYBRID_PROMPT,
        }
    }

    pub fn render(&self, vars: &[(&str, &str)]) -> Result<String> {
        render(self.id(), self.text(), vars)
    }
}

fn slot_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\{([a-z_]+)\}").expect("valid slot regex"))
}

/// 템플릿 채우기
///
/// 변수가 없는 자리표시자가 있으면 `AskError::Template`.
pub fn render(template_id: &'static str, template: &str, vars: &[(&str, &str)]) -> Result<String> {
    let mut output = String::with_capacity(template.len());
    let mut last = 0;

    for caps in slot_pattern().captures_iter(template) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };

        let value = vars
            .iter()
            .find(|(key, _)| *key == name.as_str())
            .map(|(_, value)| *value)
            .ok_or_else(|| AskError::Template {
                template: template_id,
                slot: name.as_str().to_string(),
            })?;

        output.push_str(&template[last..whole.start()]);
        output.push_str(value);
        last = whole.end();
    }

    output.push_str(&template[last..]);
    Ok(output)
}
