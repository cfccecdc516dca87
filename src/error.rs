//! Error types for the trie and its value store.

use thiserror::Error;

/// Result type alias using [`TrieError`].
pub type Result<T> = std::result::Result<T, TrieError>;

/// Errors that can occur while mutating, encoding or decoding a trie.
///
/// Decode errors abort the call chain immediately; no partial success is
/// reported and partially decoded structures must be discarded by the
/// caller. Nothing is retried internally.
#[derive(Error, Debug)]
pub enum TrieError {
    /// The byte stream does not describe a valid archive: a control byte
    /// did not match, or a flat-buffer record points outside the buffer.
    #[error("corrupt stream: {0}")]
    CorruptStream(String),

    /// The value type provides no dedup key, so it cannot be interned.
    #[error("unhashable value type {0}: implement TrieValue::dedup_key")]
    UnhashableType(&'static str),

    /// The value type provides no bulk codec, so the value section cannot
    /// be encoded or decoded.
    #[error("unsupported value type {0}: implement the TrieValue codec")]
    UnsupportedType(&'static str),

    /// An I/O error from the underlying byte stream, propagated unchanged.
    /// Truncated sections surface here as `UnexpectedEof`.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl TrieError {
    pub(crate) fn control_byte(expected: u8, found: u8) -> Self {
        TrieError::CorruptStream(format!(
            "expected control byte {expected:#04x}, found {found:#04x}"
        ))
    }
}
