//! What to tell the user, and whether to retry, after a failed backend call.

use std::collections::HashMap;
use std::time::Duration;

use crate::BackendErrorKind;

/// Reply content when a call fails and per-kind messages are disabled.
pub const FALLBACK_MESSAGE: &str = "我现在有点累了，等会再来吧";

/// Retry budget per call when retries are enabled.
pub const DEFAULT_MAX_RETRIES: u32 = 2;

/// Policy for one error kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyEntry {
    pub user_message: String,
    pub backoff: Duration,
    pub retryable: bool,
}

impl PolicyEntry {
    pub fn new(user_message: impl Into<String>, backoff: Duration, retryable: bool) -> Self {
        Self {
            user_message: user_message.into(),
            backoff,
            retryable,
        }
    }
}

/// Decision for a failed attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureAction {
    /// Wait, then issue the call again.
    Retry(Duration),
    /// Stop and return this content to the user.
    GiveUp(String),
}

/// Policy table `BackendErrorKind -> PolicyEntry` plus two switches. With the defaults
/// (`retry_enabled = false`, `distinct_messages = false`) every failure gives up at once
/// with [`FALLBACK_MESSAGE`].
#[derive(Debug, Clone)]
pub struct FailurePolicy {
    pub retry_enabled: bool,
    pub distinct_messages: bool,
    pub max_retries: u32,
    entries: HashMap<BackendErrorKind, PolicyEntry>,
}

impl Default for FailurePolicy {
    fn default() -> Self {
        let mut entries = HashMap::new();
        entries.insert(
            BackendErrorKind::RateLimit,
            PolicyEntry::new("提问太快啦，请休息一下再问我吧", Duration::from_secs(20), true),
        );
        entries.insert(
            BackendErrorKind::Timeout,
            PolicyEntry::new("我没有收到你的消息", Duration::from_secs(5), true),
        );
        entries.insert(
            BackendErrorKind::Gateway,
            PolicyEntry::new("请再问我一次", Duration::from_secs(10), true),
        );
        entries.insert(
            BackendErrorKind::Connection,
            PolicyEntry::new("我连接不到你的网络", Duration::from_secs(5), true),
        );
        entries.insert(
            BackendErrorKind::Other,
            PolicyEntry::new(FALLBACK_MESSAGE, Duration::ZERO, false),
        );
        Self {
            retry_enabled: false,
            distinct_messages: false,
            max_retries: DEFAULT_MAX_RETRIES,
            entries,
        }
    }
}

impl FailurePolicy {
    pub fn with_retry(mut self, enabled: bool) -> Self {
        self.retry_enabled = enabled;
        self
    }

    pub fn with_distinct_messages(mut self, enabled: bool) -> Self {
        self.distinct_messages = enabled;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Replaces the entry for `kind`.
    pub fn with_entry(mut self, kind: BackendErrorKind, entry: PolicyEntry) -> Self {
        self.entries.insert(kind, entry);
        self
    }

    pub fn entry(&self, kind: BackendErrorKind) -> Option<&PolicyEntry> {
        self.entries.get(&kind)
    }

    /// Content shown to the user for a failure of `kind`.
    pub fn user_message(&self, kind: BackendErrorKind) -> &str {
        if !self.distinct_messages {
            return FALLBACK_MESSAGE;
        }
        self.entry(kind)
            .map(|e| e.user_message.as_str())
            .unwrap_or(FALLBACK_MESSAGE)
    }

    /// Decides what to do after attempt number `retry_count` (0-based) failed with `kind`.
    pub fn decide(&self, kind: BackendErrorKind, retry_count: u32) -> FailureAction {
        let retryable = self.entry(kind).map(|e| e.retryable).unwrap_or(false);
        if self.retry_enabled && retryable && retry_count < self.max_retries {
            let backoff = self.entry(kind).map(|e| e.backoff).unwrap_or_default();
            FailureAction::Retry(backoff)
        } else {
            FailureAction::GiveUp(self.user_message(kind).to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_never_retries_and_uses_fallback() {
        let policy = FailurePolicy::default();
        for kind in [
            BackendErrorKind::RateLimit,
            BackendErrorKind::Timeout,
            BackendErrorKind::Gateway,
            BackendErrorKind::Connection,
            BackendErrorKind::Other,
        ] {
            assert_eq!(
                policy.decide(kind, 0),
                FailureAction::GiveUp(FALLBACK_MESSAGE.to_string())
            );
        }
    }

    #[test]
    fn test_enabled_retry_uses_per_kind_backoff_until_budget_spent() {
        let policy = FailurePolicy::default().with_retry(true);
        assert_eq!(
            policy.decide(BackendErrorKind::RateLimit, 0),
            FailureAction::Retry(Duration::from_secs(20))
        );
        assert_eq!(
            policy.decide(BackendErrorKind::Gateway, 1),
            FailureAction::Retry(Duration::from_secs(10))
        );
        assert_eq!(
            policy.decide(BackendErrorKind::Gateway, 2),
            FailureAction::GiveUp(FALLBACK_MESSAGE.to_string())
        );
        assert!(matches!(
            policy.decide(BackendErrorKind::Other, 0),
            FailureAction::GiveUp(_)
        ));
    }

    #[test]
    fn test_distinct_messages_per_kind() {
        let policy = FailurePolicy::default().with_distinct_messages(true);
        assert_eq!(
            policy.user_message(BackendErrorKind::Timeout),
            "我没有收到你的消息"
        );
        assert_eq!(
            policy.user_message(BackendErrorKind::Connection),
            "我连接不到你的网络"
        );
        assert_eq!(policy.user_message(BackendErrorKind::Other), FALLBACK_MESSAGE);
    }

    #[test]
    fn test_with_entry_overrides_table() {
        let policy = FailurePolicy::default()
            .with_retry(true)
            .with_entry(
                BackendErrorKind::Timeout,
                PolicyEntry::new("slow", Duration::from_millis(1), false),
            );
        assert!(matches!(
            policy.decide(BackendErrorKind::Timeout, 0),
            FailureAction::GiveUp(_)
        ));
    }
}
