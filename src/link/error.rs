#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum LinkError {
    #[error("The link could not be parsed: {0}")]
    Parse(#[from] url::ParseError),

    #[error("The link `{link}` has no host.")]
    MissingHost { link: String },

    #[error("Could not find a product identifier in the link `{link}`.")]
    MissingId { link: String },

    #[error("Gave up after {hops} nested redirect links.")]
    TooManyRedirects { hops: usize },
}
