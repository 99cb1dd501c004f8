//! Request body, per-call arguments and buffered-call result.

use serde::Serialize;
use serde_json::Value;
use session::{Session, SessionTurn};
use std::time::Duration;

use crate::BackendError;

pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

/// Body of `POST /api/chat`: the newest turn as `message`, the turns between the seed turn
/// and the newest turn as `history`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatPayload {
    pub message: String,
    pub history: Vec<SessionTurn>,
}

impl ChatPayload {
    pub fn from_session(session: &Session) -> Result<Self, BackendError> {
        let latest = session.latest().ok_or(BackendError::EmptySession)?;
        Ok(Self {
            message: latest.content.clone(),
            history: session.history().to_vec(),
        })
    }
}

/// Reads the answer out of a buffered response.
///
/// Text that is not JSON is the answer itself. JSON without a string `answer` field is a
/// [`BackendError::Decode`].
pub fn parse_answer(response_str: &str) -> Result<String, BackendError> {
    let value = match serde_json::from_str::<Value>(response_str) {
        Ok(value) => value,
        Err(_) => return Ok(response_str.to_string()),
    };
    value
        .get("answer")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| BackendError::Decode(format!("no answer in response: {}", response_str)))
}

/// Model arguments of one call. Built from configuration; a per-call model override works
/// on a copy.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatArgs {
    pub model: String,
    pub temperature: f32,
    pub top_p: f32,
    pub frequency_penalty: f32,
    pub presence_penalty: f32,
    /// HTTP timeout of the backend request.
    pub request_timeout: Option<Duration>,
    /// Azure deployment carrying the model, when running against Azure.
    pub deployment_id: Option<String>,
}

impl Default for ChatArgs {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.9,
            top_p: 1.0,
            frequency_penalty: 0.0,
            presence_penalty: 0.0,
            request_timeout: None,
            deployment_id: None,
        }
    }
}

impl ChatArgs {
    /// Copy of these arguments using `model`.
    pub fn with_model(&self, model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..self.clone()
        }
    }
}

/// Result of a buffered call. `completion_tokens == 0` means the call failed and `content`
/// is the message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyResult {
    pub total_tokens: u64,
    pub completion_tokens: u64,
    pub content: String,
}

impl ReplyResult {
    pub fn success(content: impl Into<String>) -> Self {
        Self {
            total_tokens: 1,
            completion_tokens: 1,
            content: content.into(),
        }
    }

    pub fn failure(content: impl Into<String>) -> Self {
        Self {
            total_tokens: 0,
            completion_tokens: 0,
            content: content.into(),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.completion_tokens == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn session_with(turns: &[&str]) -> Session {
        let mut s = Session::new("s1", "sys");
        for (i, t) in turns.iter().enumerate() {
            s.messages.push(if i % 2 == 0 {
                SessionTurn::user(*t)
            } else {
                SessionTurn::assistant(*t)
            });
        }
        s
    }

    #[test]
    fn test_payload_uses_latest_and_middle_turns() {
        let payload = ChatPayload::from_session(&session_with(&["q1", "a1", "q2"])).unwrap();
        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            json!({
                "message": "q2",
                "history": [
                    {"role": "user", "content": "q1"},
                    {"role": "assistant", "content": "a1"}
                ]
            })
        );
    }

    #[test]
    fn test_payload_first_query_has_empty_history() {
        let payload = ChatPayload::from_session(&session_with(&["q1"])).unwrap();
        assert_eq!(payload.message, "q1");
        assert!(payload.history.is_empty());
    }

    #[test]
    fn test_payload_rejects_empty_session() {
        let mut s = Session::new("s1", "sys");
        s.messages.clear();
        assert!(matches!(
            ChatPayload::from_session(&s),
            Err(BackendError::EmptySession)
        ));
    }

    #[test]
    fn test_parse_answer_json_and_raw_fallback() {
        assert_eq!(parse_answer(r#"{"answer": "多喝水"}"#).unwrap(), "多喝水");
        assert_eq!(parse_answer("plain text").unwrap(), "plain text");
    }

    #[test]
    fn test_parse_answer_json_without_answer_is_decode_error() {
        for body in [r#"{"other": 1}"#, r#"{"answer": 3}"#, "[1, 2]", "42"] {
            assert!(
                matches!(parse_answer(body), Err(BackendError::Decode(_))),
                "body {} should not be taken as an answer",
                body
            );
        }
    }

    #[test]
    fn test_with_model_copies_args() {
        let args = ChatArgs::default();
        let over = args.with_model("gpt-4");
        assert_eq!(over.model, "gpt-4");
        assert_eq!(args.model, DEFAULT_MODEL);
        assert_eq!(over.temperature, args.temperature);
    }

    #[test]
    fn test_reply_result_failure_flag() {
        assert!(ReplyResult::failure("x").is_failure());
        assert!(!ReplyResult::success("x").is_failure());
    }
}
