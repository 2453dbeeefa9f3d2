//! Token-bounded chunking.
//!
//! The summarization model accepts a fixed number of input tokens, so documents are split into
//! contiguous token slices:
//!
//! - Encode the whole text once, then cut the token sequence into slices of at most `ceiling`
//!   tokens. Every token lands in exactly one chunk and chunk order follows the source.
//! - Decode each slice back to text. BPE tokens may end inside a multi-byte character; such a
//!   slice is shortened token by token until it decodes, and the remainder opens the next chunk.
//! - Tokenization uses `tiktoken-rs`, resolving the configured model name first and an encoding
//!   name second, falling back to `cl100k_base`.

use anyhow::Error as TokenizerError;
use tiktoken_rs::{
    CoreBPE, cl100k_base, get_bpe_from_model, o200k_base, p50k_base, p50k_edit, r50k_base,
};

use super::types::{Chunk, ChunkingError};

/// Token identifier produced by a [`Tokenizer`].
pub type TokenId = u32;

/// Tokenizing capability supplied by the model collaborator.
pub trait Tokenizer: Send + Sync {
    /// Encode text into token identifiers.
    fn encode(&self, text: &str) -> Vec<TokenId>;

    /// Decode a token slice. Fails when the slice does not form valid text on its own.
    fn decode(&self, tokens: &[TokenId]) -> Result<String, ChunkingError>;
}

/// [`Tokenizer`] backed by a `tiktoken-rs` BPE encoding.
pub struct TiktokenTokenizer {
    encoding: CoreBPE,
    name: String,
}

impl TiktokenTokenizer {
    /// Resolve the encoding for `model` (a model name such as `gpt-4o` or an encoding name).
    pub fn for_model(model: &str) -> Result<Self, ChunkingError> {
        let normalized = model.trim();
        let target = if normalized.is_empty() {
            "cl100k_base"
        } else {
            normalized
        };
        let encoding = resolve_encoding(target).map_err(|source| ChunkingError::Tokenizer {
            model: target.to_string(),
            source,
        })?;
        Ok(Self {
            encoding,
            name: target.to_string(),
        })
    }

    /// Name the tokenizer was resolved from.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Tokenizer for TiktokenTokenizer {
    fn encode(&self, text: &str) -> Vec<TokenId> {
        self.encoding.encode_ordinary(text)
    }

    fn decode(&self, tokens: &[TokenId]) -> Result<String, ChunkingError> {
        self.encoding
            .decode(tokens.to_vec())
            .map_err(|_| ChunkingError::Undecodable { index: 0 })
    }
}

fn resolve_encoding(model: &str) -> Result<CoreBPE, TokenizerError> {
    match get_bpe_from_model(model) {
        Ok(encoding) => Ok(encoding),
        Err(model_err) => {
            tracing::debug!(
                model,
                error = %model_err,
                "Tokenizer model lookup failed; trying encoding name"
            );
            if let Some(candidate) = encoding_from_name(model) {
                candidate
            } else {
                tracing::warn!(model, "Falling back to 'cl100k_base' encoding for chunking");
                cl100k_base()
            }
        }
    }
}

fn encoding_from_name(name: &str) -> Option<Result<CoreBPE, TokenizerError>> {
    match name {
        "cl100k_base" => Some(cl100k_base()),
        "o200k_base" => Some(o200k_base()),
        "p50k_base" => Some(p50k_base()),
        "p50k_edit" => Some(p50k_edit()),
        "r50k_base" | "gpt2" => Some(r50k_base()),
        _ => None,
    }
}

/// Split `text` into ordered chunks of at most `ceiling` tokens.
///
/// Returns an empty vector when the input is blank. The concatenated chunk texts reproduce the
/// input exactly, and the token counts sum to the length of the full encoding.
pub fn chunk_text(
    text: &str,
    ceiling: usize,
    tokenizer: &dyn Tokenizer,
) -> Result<Vec<Chunk>, ChunkingError> {
    if ceiling == 0 {
        return Err(ChunkingError::InvalidCeiling);
    }
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    let tokens = tokenizer.encode(text);
    let mut chunks = Vec::with_capacity(tokens.len().div_ceil(ceiling));
    let mut start = 0;

    while start < tokens.len() {
        let index = chunks.len();
        let (end, chunk_text) = decode_prefix(tokenizer, &tokens, start, ceiling, index)?;
        chunks.push(Chunk {
            index,
            text: chunk_text,
            token_count: end - start,
        });
        start = end;
    }

    Ok(chunks)
}

/// Decode the longest prefix of `tokens[start..]` (up to `ceiling` tokens) that forms valid text.
fn decode_prefix(
    tokenizer: &dyn Tokenizer,
    tokens: &[TokenId],
    start: usize,
    ceiling: usize,
    index: usize,
) -> Result<(usize, String), ChunkingError> {
    let mut end = (start + ceiling).min(tokens.len());
    loop {
        match tokenizer.decode(&tokens[start..end]) {
            Ok(text) => return Ok((end, text)),
            Err(_) if end - start > 1 => end -= 1,
            Err(_) => return Err(ChunkingError::Undecodable { index }),
        }
    }
}

/// The first chunk of `text` under `ceiling`, or the whole text when it already fits.
pub fn leading_chunk(
    text: &str,
    ceiling: usize,
    tokenizer: &dyn Tokenizer,
) -> Result<String, ChunkingError> {
    Ok(chunk_text(text, ceiling, tokenizer)?
        .into_iter()
        .next()
        .map(|chunk| chunk.text)
        .unwrap_or_default())
}
