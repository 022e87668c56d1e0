/// Errors produced while building or executing warehouse queries.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The package name does not follow the PyPA naming rules. Names are bound
    /// as query parameters, but a name we would not accept is rejected before
    /// any request is built.
    #[error("invalid package name: {0:?}")]
    InvalidPackageName(String),
    /// The HTTP round trip itself failed: connection refused, TLS, or the
    /// request timeout expired. Retryable from the caller's point of view.
    #[error("warehouse request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The warehouse accepted the request but rejected the query: bad syntax,
    /// quota exceeded, missing credentials.
    #[error("warehouse rejected the query ({reason}): {message}")]
    Query { reason: String, message: String },
    /// The warehouse answered with a payload we cannot interpret.
    #[error("malformed warehouse response: {0}")]
    MalformedResponse(String),
}

impl Error {
    /// Whether a fresh attempt could plausibly succeed without any change to
    /// the query. Query rejections and malformed payloads are not retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Http(inner) => inner.is_timeout() || inner.is_connect() || inner.is_request(),
            Error::InvalidPackageName(_) | Error::Query { .. } | Error::MalformedResponse(_) => false,
        }
    }
}
