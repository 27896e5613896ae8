use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Unknown partition: {0}")]
    UnknownPartition(String),

    #[error("Partition '{partition}' exists with dimension {existing}, requested {requested}")]
    DimensionMismatch { partition: String, existing: usize, requested: usize },

    #[error("Vector dimension {actual} does not match partition '{partition}' dimension {expected}")]
    VectorDimensionError { partition: String, expected: usize, actual: usize },

    #[error("Invalid partition name: {0:?}")]
    InvalidPartitionName(String),

    #[error("Topic not allowed: {0}")]
    TopicNotAllowed(String),

    #[error("Embedding failed: {0}")]
    Embedding(#[source] anyhow::Error),

    #[error("Index backend failure: {0}")]
    Backend(#[source] anyhow::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// True when the failure was caused by caller input rather than by the
    /// system; the boundary renders these as 400-class responses.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::UnsupportedFormat(_)
                | Error::UnknownPartition(_)
                | Error::DimensionMismatch { .. }
                | Error::VectorDimensionError { .. }
                | Error::InvalidPartitionName(_)
                | Error::TopicNotAllowed(_)
        )
    }

    pub fn backend<E>(err: E) -> Self
    where
        E: Into<anyhow::Error>,
    {
        Error::Backend(err.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
