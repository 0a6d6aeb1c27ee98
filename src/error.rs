use thiserror::Error;

// ---------------------------------------------------------------------------
// Error kinds surfaced to the UI
// ---------------------------------------------------------------------------

/// Every failure a user action can run into. None of them is fatal: the UI
/// reports the message and stays usable.
#[derive(Debug, Error)]
pub enum ChartError {
    /// Malformed shorthand / JSON input.
    #[error("format error: {0}")]
    Format(String),

    /// Missing or shape-incompatible data at render time.
    #[error("render error: {0}")]
    Render(String),

    /// Missing or invalid AI endpoint configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Network / HTTP failure talking to the summary endpoint.
    #[error("transport error: {0}")]
    Transport(String),

    /// File import / export failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ChartError {
    pub fn format(msg: impl Into<String>) -> Self {
        ChartError::Format(msg.into())
    }

    pub fn render(msg: impl Into<String>) -> Self {
        ChartError::Render(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, ChartError>;
