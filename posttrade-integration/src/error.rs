use thiserror::Error;

/// All transport IO related errors generated in `posttrade-integration`.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("deserialising JSON error: {error} for payload: {payload}")]
    Deserialise {
        error: serde_json::Error,
        payload: String,
    },

    #[error("serialising JSON error: {0}")]
    Serialise(serde_json::Error),

    #[error("error parsing Url: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("channel closed: {0}")]
    ChannelClosed(&'static str),
}

impl TransportError {
    /// Shorthand for constructing a [`TransportError::Deserialise`] with the offending payload.
    pub fn deserialise(error: serde_json::Error, payload: &[u8]) -> Self {
        Self::Deserialise {
            error,
            payload: String::from_utf8_lossy(payload).into_owned(),
        }
    }
}

impl<T> From<tokio::sync::mpsc::error::SendError<T>> for TransportError {
    fn from(_: tokio::sync::mpsc::error::SendError<T>) -> Self {
        Self::ChannelClosed(std::any::type_name::<T>())
    }
}
