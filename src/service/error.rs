use crate::link::LinkError;
use crate::source::error::SourceError;

/// Errors surfaced to callers of the watchlist service.
///
/// Store and scrape failures on the subscribe/list paths are logged where they
/// happen and collapse into [`ServiceError::Internal`].
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ServiceError {
    #[error("Invalid link: {0}")]
    InvalidLink(#[from] LinkError),

    #[error("Internal server error.")]
    Internal,

    #[error("Nothing to remove for `{link}`.")]
    NotFound { link: String },

    #[error("The search query is empty.")]
    EmptyQuery,

    #[error("Search failed: {0}")]
    Search(#[from] SourceError),

    #[error("The notification receiver was already taken.")]
    AlreadyListening,
}
