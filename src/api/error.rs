use thiserror::Error;

/// Why a single fetch produced no data.
///
/// All three kinds are handled the same way at the fetch boundary; the
/// distinction only shows up in the activity log.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network, DNS, TLS or timeout failure.
    #[error("transport error: {0}")]
    Transport(String),
    /// The server answered with a non-success status.
    #[error("HTTP {status}")]
    HttpStatus { status: u16 },
    /// The body was not the JSON shape we expected.
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl FetchError {
    /// Short label for log entries.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transport(_) => "transport",
            Self::HttpStatus { .. } => "http_status",
            Self::Malformed(_) => "malformed",
        }
    }
}

impl From<ureq::Error> for FetchError {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::Status(status, _) => Self::HttpStatus { status },
            ureq::Error::Transport(transport) => Self::Transport(transport.to_string()),
        }
    }
}
