use thiserror::Error;

/// Errors raised by storage adapters outside of the upload/delete contract
#[derive(Debug, Error)]
pub enum StorageError {
    /// Invalid or disallowed configuration detected at construction time
    #[error("Invalid storage configuration: {0}")]
    Configuration(String),

    /// A required setting is absent
    #[error("Missing storage setting: {0}")]
    MissingSetting(String),

    /// The request never produced a response (network, TLS, timeout)
    #[error("Storage request failed: {0}")]
    Request(String),

    /// The backend answered with a non-success status
    #[error("Storage backend returned {status}: {message}")]
    Backend { status: u16, message: String },

    /// The requested object does not exist
    #[error("Object not found: {0}")]
    NotFound(String),

    /// The backend answered with a body we could not interpret
    #[error("Invalid storage response: {0}")]
    InvalidResponse(String),
}

impl StorageError {
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            StorageError::Configuration(_) | StorageError::MissingSetting(_)
        )
    }
}

impl From<reqwest::Error> for StorageError {
    fn from(err: reqwest::Error) -> Self {
        StorageError::Request(err.to_string())
    }
}

/// Turn a non-success response into `StorageError::Backend`, keeping the body text
pub(crate) async fn backend_error(response: reqwest::Response) -> StorageError {
    let status = response.status().as_u16();
    let message = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    StorageError::Backend { status, message }
}
