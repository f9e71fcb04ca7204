// src/error.rs

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DropError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database Error: {0}")]
    Sql(#[from] rusqlite::Error),

    #[error("JSON Error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Home directory not found")]
    HomeDirNotFound,

    #[error("Could not read upload: {0}")]
    UnreadableInput(#[source] std::io::Error),

    #[error("Missing required field: key")]
    MissingKey,

    #[error("Key {0} is already taken")]
    DuplicateKey(String),

    #[error("Could not find a free key after {0} attempts")]
    KeySpaceExhausted(usize),

    #[error("No bundle found for key {0}")]
    BundleNotFound(String),
}

impl DropError {
    /// The caller sent something unusable; retrying the same request won't help.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            DropError::MissingKey | DropError::UnreadableInput(_) | DropError::Json(_)
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, DropError::BundleNotFound(_))
    }

    /// Persistence failures. These are fatal for the request and never retried here.
    pub fn is_backend_error(&self) -> bool {
        !self.is_client_error() && !self.is_not_found()
    }

    /// Process exit code for the command-line front end.
    pub fn exit_code(&self) -> i32 {
        if self.is_client_error() {
            2
        } else if self.is_not_found() {
            3
        } else {
            1
        }
    }
}

pub type Result<T> = std::result::Result<T, DropError>;
