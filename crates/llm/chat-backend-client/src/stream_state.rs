//! Incremental shaping of a raw backend byte stream into answer fragments.

/// Appended to every completed answer so the front end knows the reply is over.
pub const COMPLETION_MARKER: &str = "\n问题回答完毕";

/// A fragment is flushed once more than this many characters arrived since the last flush.
pub const FLUSH_THRESHOLD_CHARS: usize = 300;

/// Per-call state of a raw stream: the accumulated answer (`*` stripped) and the length of
/// the prefix already flushed. Bytes of a UTF-8 sequence split across network chunks are
/// held back until the sequence completes.
#[derive(Debug, Default)]
pub struct StreamState {
    response_str: String,
    prev_len: usize,
    pending: Vec<u8>,
}

/// What remains when the stream ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamTail {
    /// Unflushed text plus [`COMPLETION_MARKER`], trimmed.
    pub fragment: String,
    /// The full accumulated answer, without the marker.
    pub answer: String,
}

impl StreamState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one network chunk; returns at most one fragment ready to send.
    ///
    /// When the unflushed region exceeds [`FLUSH_THRESHOLD_CHARS`], it is cut at its last
    /// newline (or taken whole when it has none past its first byte) and the trimmed cut is
    /// returned.
    pub fn push(&mut self, chunk: &[u8]) -> Option<String> {
        let text = self.decode(chunk).replace('*', "");
        self.response_str.push_str(&text);

        let unflushed = &self.response_str[self.prev_len..];
        if unflushed.chars().count() <= FLUSH_THRESHOLD_CHARS {
            return None;
        }

        let cut = match unflushed.rfind('\n') {
            Some(pos) if pos > 0 => pos,
            _ => unflushed.len(),
        };
        let fragment = unflushed[..cut].trim().to_string();
        self.prev_len += cut;

        if fragment.is_empty() {
            None
        } else {
            Some(fragment)
        }
    }

    /// Text accumulated so far.
    pub fn buffered(&self) -> &str {
        &self.response_str
    }

    /// Closes the stream: flushes held-back bytes and returns the final fragment.
    pub fn finish(mut self) -> StreamTail {
        if !self.pending.is_empty() {
            let rest = String::from_utf8_lossy(&self.pending).replace('*', "");
            self.response_str.push_str(&rest);
            self.pending.clear();
        }
        let fragment = format!("{}{}", &self.response_str[self.prev_len..], COMPLETION_MARKER)
            .trim()
            .to_string();
        StreamTail {
            fragment,
            answer: self.response_str,
        }
    }

    fn decode(&mut self, chunk: &[u8]) -> String {
        self.pending.extend_from_slice(chunk);
        match std::str::from_utf8(&self.pending) {
            Ok(s) => {
                let s = s.to_string();
                self.pending.clear();
                s
            }
            // Incomplete sequence at the end: keep it for the next chunk.
            Err(e) if e.error_len().is_none() => {
                let valid = e.valid_up_to();
                let s = String::from_utf8_lossy(&self.pending[..valid]).into_owned();
                self.pending.drain(..valid);
                s
            }
            Err(_) => {
                let s = String::from_utf8_lossy(&self.pending).into_owned();
                self.pending.clear();
                s
            }
        }
    }
}
