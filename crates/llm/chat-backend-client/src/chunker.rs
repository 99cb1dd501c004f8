//! Paragraph-aligned splitting of a finished answer into a bounded number of chunks.

use thiserror::Error;

/// Paragraphs are separated by one blank line.
pub const PARAGRAPH_SEPARATOR: &str = "\n\n";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChunkError {
    #[error("Invalid argument: num_chunks must be a positive integer")]
    InvalidArgument,
}

/// Splits `text` on blank lines into at most `num_chunks` chunks of roughly equal paragraph
/// count. A chunk is closed once it holds `paragraphs / num_chunks` paragraphs (integer
/// division) while fewer than `num_chunks - 1` chunks are closed; the rest forms the last
/// chunk.
///
/// Joining the result with [`PARAGRAPH_SEPARATOR`] gives back `text` exactly.
pub fn split_text_into_chunks(text: &str, num_chunks: usize) -> Result<Vec<String>, ChunkError> {
    if num_chunks == 0 {
        return Err(ChunkError::InvalidArgument);
    }

    let paragraphs: Vec<&str> = text.split(PARAGRAPH_SEPARATOR).collect();
    let avg = paragraphs.len() / num_chunks;

    let mut chunks = Vec::with_capacity(num_chunks);
    let mut current: Vec<&str> = Vec::new();

    for paragraph in paragraphs {
        current.push(paragraph);
        if current.len() >= avg && chunks.len() < num_chunks - 1 {
            chunks.push(current.join(PARAGRAPH_SEPARATOR));
            current.clear();
        }
    }

    if !current.is_empty() {
        chunks.push(current.join(PARAGRAPH_SEPARATOR));
    }

    Ok(chunks)
}
