//! Session and turn types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Role of a turn; serializes to the lowercase names the chat backend expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One conversation turn (`{role, content}` on the wire).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionTurn {
    pub role: Role,
    pub content: String,
}

impl SessionTurn {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Ordered conversation of one session. `messages[0]` is the seed system turn.
#[derive(Debug, Clone)]
pub struct Session {
    pub session_id: String,
    pub messages: Vec<SessionTurn>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// New session containing only the seed system turn.
    pub fn new(session_id: impl Into<String>, system_prompt: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            messages: vec![SessionTurn::system(system_prompt)],
            updated_at: Utc::now(),
        }
    }

    /// The newest turn (the current query right after `session_query`).
    pub fn latest(&self) -> Option<&SessionTurn> {
        self.messages.last()
    }

    /// Turns between the seed turn and the newest turn.
    pub fn history(&self) -> &[SessionTurn] {
        if self.messages.len() <= 2 {
            &[]
        } else {
            &self.messages[1..self.messages.len() - 1]
        }
    }

    pub(crate) fn push(&mut self, turn: SessionTurn) {
        self.messages.push(turn);
        self.updated_at = Utc::now();
    }

    /// Drops the oldest non-seed turns so at most `max_turns` remain after the seed.
    /// The newest turn is always kept, even when `max_turns` is 0.
    pub(crate) fn trim(&mut self, max_turns: usize) -> usize {
        let body = self.messages.len().saturating_sub(1);
        if body <= max_turns {
            return 0;
        }
        let excess = (body - max_turns).min(body - 1);
        if excess == 0 {
            return 0;
        }
        self.messages.drain(1..1 + excess);
        excess
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_serializes_lowercase() {
        let turn = SessionTurn::assistant("hi");
        let json = serde_json::to_string(&turn).unwrap();
        assert_eq!(json, r#"{"role":"assistant","content":"hi"}"#);
    }

    #[test]
    fn test_history_excludes_seed_and_latest() {
        let mut s = Session::new("s", "sys");
        assert!(s.history().is_empty());
        s.push(SessionTurn::user("q1"));
        assert!(s.history().is_empty());
        s.push(SessionTurn::assistant("a1"));
        s.push(SessionTurn::user("q2"));
        assert_eq!(
            s.history(),
            &[SessionTurn::user("q1"), SessionTurn::assistant("a1")]
        );
        assert_eq!(s.latest().unwrap().content, "q2");
    }

    #[test]
    fn test_trim_keeps_seed_turn() {
        let mut s = Session::new("s", "sys");
        for i in 0..5 {
            s.push(SessionTurn::user(format!("q{}", i)));
        }
        assert_eq!(s.trim(3), 2);
        assert_eq!(s.messages.len(), 4);
        assert_eq!(s.messages[0], SessionTurn::system("sys"));
        assert_eq!(s.messages[1].content, "q2");
        assert_eq!(s.trim(3), 0);
    }

    #[test]
    fn test_trim_to_zero_keeps_newest_turn() {
        let mut s = Session::new("s", "sys");
        s.push(SessionTurn::user("q1"));
        s.push(SessionTurn::assistant("a1"));
        s.push(SessionTurn::user("q2"));
        assert_eq!(s.trim(0), 2);
        assert_eq!(
            s.messages,
            vec![SessionTurn::system("sys"), SessionTurn::user("q2")]
        );
        assert_eq!(s.trim(0), 0);
    }
}
