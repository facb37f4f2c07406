use thiserror::Error;

/// Errors raised while talking to the backend.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CmsError {
    #[error("Page not found: {slug}")]
    PageNotFound { slug: String },

    #[error("Block {block_id} is not part of page {page_id}")]
    BlockNotFound { page_id: String, block_id: String },

    /// The page was written by someone else since it was loaded.
    #[error("Page {page_id} changed elsewhere (expected revision {expected}, found {found})")]
    Conflict {
        page_id: String,
        expected: u64,
        found: u64,
    },

    #[error("Not signed in")]
    Unauthorized,

    #[error("Backend error {status}: {message}")]
    Http { status: u16, message: String },

    /// The request never got a response.
    #[error("Network error: {0}")]
    Network(String),

    #[error("Unexpected response: {0}")]
    Decode(String),
}

impl CmsError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, CmsError::PageNotFound { .. }) || matches!(self, CmsError::Http { status: 404, .. })
    }
}

impl From<reqwest::Error> for CmsError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            CmsError::Decode(e.to_string())
        } else if let Some(status) = e.status() {
            CmsError::Http {
                status: status.as_u16(),
                message: e.to_string(),
            }
        } else {
            CmsError::Network(e.to_string())
        }
    }
}

impl From<serde_json::Error> for CmsError {
    fn from(e: serde_json::Error) -> Self {
        CmsError::Decode(e.to_string())
    }
}

/// Why a sign-in attempt failed, as shown to the user.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    #[error("Invalid email or password.")]
    InvalidCredentials,

    #[error("Could not reach the server. Check your connection and try again.")]
    Network,

    #[error("Something went wrong while signing in.")]
    Unknown,
}

impl From<&CmsError> for AuthFailure {
    fn from(e: &CmsError) -> Self {
        match e {
            CmsError::Http { status: 400..=499, .. } | CmsError::Unauthorized => {
                AuthFailure::InvalidCredentials
            }
            CmsError::Network(_) => AuthFailure::Network,
            _ => AuthFailure::Unknown,
        }
    }
}
