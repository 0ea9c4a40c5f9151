//! Canonicalization of product links into the store's key space.
//!
//! Every accepted link is reduced to `scheme://host/dp/<identifier>`. Two
//! links pointing at the same product on the same marketplace always produce
//! the same canonical link, regardless of slugs, `ref=` segments or tracking
//! query parameters.

pub mod error;

pub use error::LinkError;
use url::Url;

/// Path segments that precede a product identifier.
const PRODUCT_MARKERS: [&str; 2] = ["dp", "product"];

/// Path segment of a redirect wrapper whose `url` parameter holds the real link.
const REDIRECT_MARKER: &str = "gp";

/// Upper bound on nested redirect wrappers followed for a single link.
pub const MAX_REDIRECT_HOPS: usize = 8;

/// Normalizes a product link into its canonical form.
///
/// # Errors
/// * [`LinkError::Parse`] if the input is not an absolute URL.
/// * [`LinkError::MissingId`] if no product identifier can be found.
/// * [`LinkError::TooManyRedirects`] past [`MAX_REDIRECT_HOPS`] nested wrappers.
pub fn canonicalize(raw: &str) -> Result<String, LinkError> {
    let mut url = Url::parse(raw.trim())?;

    for _ in 0..=MAX_REDIRECT_HOPS {
        match resolve(&url)? {
            Resolved::Canonical(link) => return Ok(link),
            Resolved::Redirect(next) => url = next,
        }
    }

    Err(LinkError::TooManyRedirects {
        hops: MAX_REDIRECT_HOPS,
    })
}

enum Resolved {
    Canonical(String),
    Redirect(Url),
}

fn resolve(url: &Url) -> Result<Resolved, LinkError> {
    let host = url.host_str().ok_or_else(|| LinkError::MissingHost {
        link: url.to_string(),
    })?;
    let origin = match url.port() {
        Some(port) => format!("{}://{}:{}", url.scheme(), host, port),
        None => format!("{}://{}", url.scheme(), host),
    };

    let segments: Vec<&str> = url.path_segments().map(Iterator::collect).unwrap_or_default();

    for (i, segment) in segments.iter().enumerate() {
        if PRODUCT_MARKERS.contains(segment) {
            let id = segments
                .get(i + 1)
                .filter(|id| !id.is_empty())
                .ok_or_else(|| LinkError::MissingId {
                    link: url.to_string(),
                })?;
            return Ok(Resolved::Canonical(format!("{origin}/dp/{id}")));
        }

        if *segment == REDIRECT_MARKER {
            // A wrapper without a target is an ordinary path, e.g. `/gp/product/<id>`.
            let Some(target) = url
                .query_pairs()
                .find(|(key, _)| key == "url")
                .map(|(_, value)| value.into_owned())
            else {
                continue;
            };

            // Relative targets stay on the wrapper's host.
            let base = Url::parse(&format!("{origin}/"))?;
            return Ok(Resolved::Redirect(base.join(&target)?));
        }
    }

    Err(LinkError::MissingId {
        link: url.to_string(),
    })
}
