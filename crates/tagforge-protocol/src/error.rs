//! Error types for the protocol layer.
//!
//! Each crate in Tagforge defines its own error enum. A `ProtocolError`
//! always means the problem is in the shape of data (encoding, decoding,
//! textual ids), never in the game rules.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust value into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed: malformed JSON, missing fields, wrong types.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// A session or player id in its textual form could not be parsed.
    ///
    /// Session ids are typed in (or pasted) by players, so this is the
    /// error a transport layer sees for a mistyped invite code.
    #[error("invalid id: {0}")]
    InvalidId(String),
}
