use crate::model::price::PriceParseError;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum SourceError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("Product not found at `{link}`.")]
    NotFound { link: String },

    #[error("The domain of `{link}` is not allowed.")]
    UnsupportedDomain { link: String },

    #[error("Invalid price: {0}")]
    InvalidPrice(#[from] PriceParseError),

    #[error("Unexpected error: {message}")]
    UnexpectedResult { message: String },
}
