//! 대화 세션 - 프로세스 메모리에만 보관하는 턴 기록

use serde::Serialize;

use crate::agent::{Provenance, QueryResult, RouteDecision};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<Provenance>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<RouteDecision>,
}

#[derive(Debug, Default)]
pub struct ChatSession {
    turns: Vec<ChatTurn>,
}

impl ChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_user(&mut self, question: &str) {
        self.turns.push(ChatTurn {
            role: Role::User,
            content: question.to_string(),
            sources: vec![],
            mode: None,
        });
    }

    pub fn push_result(&mut self, result: &QueryResult) {
        self.turns.push(ChatTurn {
            role: Role::Assistant,
            content: result.answer.clone(),
            sources: result.sources.clone(),
            mode: Some(result.mode),
        });
    }

    /// 실패한 질의는 에러 문구를 어시스턴트 턴으로 남김
    pub fn push_error(&mut self, message: &str) {
        self.turns.push(ChatTurn {
            role: Role::Assistant,
            content: format!("Error: {}", message),
            sources: vec![],
            mode: None,
        });
    }

    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::RawContext;

    #[test]
    fn test_session_records_turns() {
        let mut session = ChatSession::new();
        session.push_user("What is new?");
        session.push_result(&QueryResult {
            answer: "Nothing.".to_string(),
            sources: vec![Provenance::Document {
                name: "a.md".to_string(),
            }],
            mode: RouteDecision::Documents,
            context: RawContext::Documents {
                context: String::new(),
            },
        });
        session.push_error("Serper API error (500): down");

        let turns = session.turns();
        assert_eq!(turns.len(), 3);
        assert_eq!(turns[0].role, Role::User);
        assert_eq!(turns[1].mode, Some(RouteDecision::Documents));
        assert_eq!(turns[1].sources.len(), 1);
        assert_eq!(turns[2].content, "Error: Serper API error (500): down");

        session.clear();
        assert!(session.is_empty());
    }
}
