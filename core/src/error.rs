use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("corrupt index: {0}")]
    CorruptIndex(String),

    #[error("{service} call failed: {source}")]
    UpstreamFailure {
        service: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Error::InvalidInput(msg.into())
    }

    pub(crate) fn upstream(service: &'static str, source: anyhow::Error) -> Self {
        Error::UpstreamFailure { service, source }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
