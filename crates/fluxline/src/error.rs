use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The client was built from unusable settings (bad URL, empty org or
    /// token). Surfaced at construction, never mid-call.
    #[error("invalid engine configuration: {0}")]
    Config(String),

    /// Transport-level failure talking to the engine.
    #[error("engine transport error: {0}")]
    Http(#[from] reqwest::Error),

    /// The engine answered with a non-success status.
    #[error("engine rejected request with status {status}: {message}")]
    Api { status: u16, message: String },

    /// A point could not be encoded as line protocol.
    #[error("invalid point: {0}")]
    InvalidPoint(String),

    /// A duration literal failed validation.
    #[error("invalid duration literal: {0:?}")]
    InvalidDuration(String),

    /// A query response could not be decoded.
    #[error("malformed query response at line {line}: {message}")]
    Decode { line: usize, message: String },
}
