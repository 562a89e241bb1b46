use thiserror::Error;

/// Failures surfaced by the retrieval and caching layer.
///
/// The three `Upstream*` kinds are recovered inside the fetcher and the
/// summarizer; only `StoreUnavailable` reaches callers.
#[derive(Error, Debug)]
pub enum NewsError {
    /// No credential configured for the upstream provider
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// Network failure, timeout or non-success HTTP status
    #[error("upstream request failed: {0}")]
    UpstreamRequestFailed(String),

    /// Payload missing expected fields or unparsable
    #[error("upstream response malformed: {0}")]
    UpstreamResponseMalformed(String),

    /// Backing store unreachable
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
}

impl NewsError {
    pub fn unavailable<M: Into<String>>(message: M) -> Self {
        Self::UpstreamUnavailable(message.into())
    }

    pub fn request_failed<M: Into<String>>(message: M) -> Self {
        Self::UpstreamRequestFailed(message.into())
    }

    pub fn malformed<M: Into<String>>(message: M) -> Self {
        Self::UpstreamResponseMalformed(message.into())
    }

    pub fn store<M: Into<String>>(message: M) -> Self {
        Self::StoreUnavailable(message.into())
    }

    /// True for the kinds that have a local fallback.
    pub fn is_upstream(&self) -> bool {
        !matches!(self, Self::StoreUnavailable(_))
    }
}

impl From<reqwest::Error> for NewsError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            Self::malformed(error.to_string())
        } else {
            Self::request_failed(error.to_string())
        }
    }
}

impl From<sqlx::Error> for NewsError {
    fn from(error: sqlx::Error) -> Self {
        Self::store(error.to_string())
    }
}

pub type Result<T> = std::result::Result<T, NewsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_store_errors_propagate() {
        assert!(NewsError::unavailable("no key").is_upstream());
        assert!(NewsError::request_failed("503").is_upstream());
        assert!(NewsError::malformed("bad json").is_upstream());
        assert!(!NewsError::store("pool closed").is_upstream());
    }

    #[test]
    fn sqlx_errors_map_to_store_unavailable() {
        let err: NewsError = sqlx::Error::PoolClosed.into();
        assert!(matches!(err, NewsError::StoreUnavailable(_)));
    }
}
