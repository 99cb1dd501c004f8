//! HTTP client for the chat backend.

use dbot_core::FragmentStream;
use futures::StreamExt;
use reqwest::header::CONTENT_TYPE;
use session::{Session, SessionStore};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

use crate::chunker::split_text_into_chunks;
use crate::payload::{parse_answer, ChatArgs, ChatPayload, ReplyResult};
use crate::policy::{FailureAction, FailurePolicy};
use crate::rate_limit::TokenBucket;
use crate::stream_state::{StreamState, COMPLETION_MARKER};
use crate::BackendError;

/// Default backend endpoint.
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000/api/chat";

/// Content type of a fully prepared library answer.
pub const PLAIN_TEXT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// A plain-text answer is sent as this many paragraph-aligned chunks.
pub const PLAIN_TEXT_CHUNKS: usize = 5;

/// Builds the shared reqwest client, routing through `proxy` when given.
pub fn build_http_client(proxy: Option<&str>) -> Result<reqwest::Client, BackendError> {
    let mut builder = reqwest::Client::builder();
    if let Some(proxy) = proxy {
        let proxy =
            reqwest::Proxy::all(proxy).map_err(|e| BackendError::Other(e.to_string()))?;
        builder = builder.proxy(proxy);
    }
    builder
        .build()
        .map_err(|e| BackendError::Other(e.to_string()))
}

/// Client for `POST /api/chat`. Cheap to clone; clones share the HTTP pool, the rate
/// limiter and the session store.
#[derive(Clone)]
pub struct ChatBackendClient {
    http: reqwest::Client,
    url: String,
    args: ChatArgs,
    sessions: Arc<dyn SessionStore>,
    rate_limiter: Option<Arc<TokenBucket>>,
    policy: FailurePolicy,
}

/// Backend response after the pre-flight part of a streaming call.
enum Opened {
    /// Plain-text answer, already read and chunked.
    Chunks { chunks: Vec<String>, answer: String },
    /// Incremental body still to be read.
    Raw(reqwest::Response),
}

impl ChatBackendClient {
    pub fn new(url: impl Into<String>, args: ChatArgs, sessions: Arc<dyn SessionStore>) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: url.into(),
            args,
            sessions,
            rate_limiter: None,
            policy: FailurePolicy::default(),
        }
    }

    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    pub fn with_rate_limiter(mut self, bucket: Arc<TokenBucket>) -> Self {
        self.rate_limiter = Some(bucket);
        self
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn args(&self) -> &ChatArgs {
        &self.args
    }

    /// Buffered call: reads the whole body and answers from its last chunk.
    ///
    /// Earlier chunks are dropped; the backend is assumed to send its final answer as one
    /// closing chunk. On any failure the session is cleared and the result carries
    /// `completion_tokens == 0` with the policy's user message.
    #[instrument(skip(self, session, args), fields(session_id = %session.session_id))]
    pub async fn reply_text(&self, session: &Session, args: Option<&ChatArgs>) -> ReplyResult {
        let args = args.unwrap_or(&self.args);
        let mut retry_count = 0;
        loop {
            match self.fetch_buffered(session, args).await {
                Ok(answer) => return ReplyResult::success(answer),
                Err(e) => match self.on_failure(&session.session_id, &e, retry_count).await {
                    FailureAction::Retry(backoff) => {
                        tokio::time::sleep(backoff).await;
                        retry_count += 1;
                    }
                    FailureAction::GiveUp(message) => return ReplyResult::failure(message),
                },
            }
        }
    }

    /// Streaming call: a lazy sequence of fragments ending with [`COMPLETION_MARKER`].
    ///
    /// A `text/plain; charset=utf-8` response is split into [`PLAIN_TEXT_CHUNKS`] chunks;
    /// any other response is shaped incrementally by [`StreamState`]. On failure the
    /// session is cleared and the policy's user message is the last fragment; retries only
    /// happen before the first fragment. A successful answer is appended to the session.
    /// Dropping the stream drops the HTTP response.
    pub fn reply_text_stream(&self, session: Session, args: Option<ChatArgs>) -> FragmentStream {
        let client = self.clone();
        let args = args.unwrap_or_else(|| self.args.clone());

        Box::pin(async_stream::stream! {
            let mut retry_count = 0;
            let opened = loop {
                match client.open_stream(&session, &args).await {
                    Ok(opened) => break Some(opened),
                    Err(e) => match client.on_failure(&session.session_id, &e, retry_count).await {
                        FailureAction::Retry(backoff) => {
                            tokio::time::sleep(backoff).await;
                            retry_count += 1;
                        }
                        FailureAction::GiveUp(message) => {
                            yield message;
                            break None;
                        }
                    },
                }
            };

            match opened {
                None => {}
                Some(Opened::Chunks { chunks, answer }) => {
                    for chunk in chunks {
                        yield chunk;
                    }
                    client.record_reply(&session.session_id, &answer).await;
                }
                Some(Opened::Raw(response)) => {
                    let mut state = StreamState::new();
                    let mut body = response.bytes_stream();
                    let mut failed = false;
                    while let Some(item) = body.next().await {
                        match item {
                            Ok(bytes) => {
                                if let Some(fragment) = state.push(&bytes) {
                                    info!(fragment_len = fragment.chars().count(), "Streaming fragment");
                                    yield fragment;
                                }
                            }
                            Err(e) => {
                                let e = BackendError::from(e);
                                let message = client.give_up(&session.session_id, &e).await;
                                yield message;
                                failed = true;
                                break;
                            }
                        }
                    }
                    if !failed {
                        info!(response_len = state.buffered().len(), "Final response body received");
                        let tail = state.finish();
                        yield tail.fragment;
                        client.record_reply(&session.session_id, &tail.answer).await;
                    }
                }
            }
        })
    }

    async fn fetch_buffered(&self, session: &Session, args: &ChatArgs) -> Result<String, BackendError> {
        let response = self.send(session, args).await?;

        let mut body = response.bytes_stream();
        let mut last_chunk = Vec::new();
        while let Some(chunk) = body.next().await {
            let chunk = chunk?;
            if !chunk.is_empty() {
                last_chunk = chunk.to_vec();
            }
        }

        let response_str = String::from_utf8_lossy(&last_chunk).into_owned();
        info!(response_str = %response_str, "Buffered backend response");
        parse_answer(&response_str)
    }

    async fn open_stream(&self, session: &Session, args: &ChatArgs) -> Result<Opened, BackendError> {
        let response = self.send(session, args).await?;

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        if content_type == PLAIN_TEXT_CONTENT_TYPE {
            let answer = response.text().await?;
            info!(answer = %answer, "Answer from library");
            let chunks = split_text_into_chunks(
                &format!("{}{}", answer, COMPLETION_MARKER),
                PLAIN_TEXT_CHUNKS,
            )
            .map_err(|e| BackendError::Other(e.to_string()))?;
            Ok(Opened::Chunks { chunks, answer })
        } else {
            info!(content_type = %content_type, "Reading incremental backend stream");
            Ok(Opened::Raw(response))
        }
    }

    /// Rate-limit check, payload construction and the POST itself.
    async fn send(&self, session: &Session, args: &ChatArgs) -> Result<reqwest::Response, BackendError> {
        if let Some(bucket) = &self.rate_limiter {
            if !bucket.try_acquire() {
                return Err(BackendError::RateLimitExceeded);
            }
        }

        let payload = ChatPayload::from_session(session)?;
        info!(
            model = %args.model,
            deployment_id = ?args.deployment_id,
            history_len = payload.history.len(),
            message = %payload.message,
            "Chat backend request"
        );

        let mut request = self
            .http
            .post(&self.url)
            .header(CONTENT_TYPE, "application/json")
            .json(&payload);
        if let Some(timeout) = args.request_timeout {
            request = request.timeout(timeout);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::Gateway {
                status: status.as_u16(),
            });
        }
        Ok(response)
    }

    /// Logs the failure, clears the session and asks the policy what to do next.
    async fn on_failure(&self, session_id: &str, e: &BackendError, retry_count: u32) -> FailureAction {
        error!(
            session_id = %session_id,
            error_kind = ?e.kind(),
            error = ?e,
            retry_count,
            "Chat backend call failed"
        );
        self.clear_session(session_id).await;
        let action = self.policy.decide(e.kind(), retry_count);
        if let FailureAction::Retry(backoff) = &action {
            warn!(retry = retry_count + 1, backoff_ms = backoff.as_millis() as u64, "Retrying chat backend call");
        }
        action
    }

    /// Failure after fragments were already sent: never retried.
    async fn give_up(&self, session_id: &str, e: &BackendError) -> String {
        error!(
            session_id = %session_id,
            error_kind = ?e.kind(),
            error = ?e,
            "Chat backend stream broke off"
        );
        self.clear_session(session_id).await;
        self.policy.user_message(e.kind()).to_string()
    }

    async fn clear_session(&self, session_id: &str) {
        if let Err(e) = self.sessions.clear_session(session_id).await {
            warn!(session_id = %session_id, error = %e, "Failed to clear session after backend failure");
        }
    }

    async fn record_reply(&self, session_id: &str, answer: &str) {
        if let Err(e) = self.sessions.session_reply(answer, session_id, 1).await {
            warn!(session_id = %session_id, error = %e, "Failed to record streamed reply");
        }
    }
}
