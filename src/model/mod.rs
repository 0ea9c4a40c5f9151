//! Domain values shared by the store, the service and the product sources.

use std::collections::BTreeSet;
use std::fmt;

use chrono::DateTime;
use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde::Serialize;

use crate::link::LinkError;

pub mod price;

/// Identifier of a watchlist subscriber, e.g. a chat user id.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for UserId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// Marketplace top-level domain, e.g. `com`, `it`, `de`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Region(String);

impl Region {
    pub fn new(tld: impl Into<String>) -> Self {
        Self(tld.into().trim_start_matches('.').to_lowercase())
    }

    /// Takes the last label of the link's host.
    pub fn from_link(link: &str) -> Result<Self, LinkError> {
        let url = url::Url::parse(link)?;
        let host = url.host_str().ok_or_else(|| LinkError::MissingHost {
            link: link.to_string(),
        })?;
        let tld = host.rsplit('.').next().unwrap_or(host);
        Ok(Self::new(tld))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether prices on this marketplace use `,` as the decimal separator.
    pub fn uses_decimal_comma(&self) -> bool {
        matches!(self.0.as_str(), "it" | "es" | "de" | "fr" | "nl" | "be" | "pl" | "se" | "br")
    }
}

impl Default for Region {
    fn default() -> Self {
        Self::new("com")
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// State of a product page as observed by a single scrape.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Product {
    pub title: String,
    pub image: String,
    /// Canonical link, also the store key.
    pub link: String,
    pub price: Decimal,
    pub checked_at: DateTime<Utc>,
}

impl Product {
    /// Price rounded to hundredths, half away from zero.
    pub fn rounded_price(&self) -> Decimal {
        price::round_price(self.price)
    }

    /// Compares prices at hundredths precision so that formatting noise from
    /// different locales never counts as a change.
    pub fn same_price_as(&self, other: &Product) -> bool {
        self.rounded_price() == other.rounded_price()
    }

    /// Time of the last check, e.g. `2 Jan 2006 at 15:04`.
    pub fn formatted_time(&self) -> String {
        self.checked_at.format("%-d %b %Y at %H:%M").to_string()
    }
}

/// Persisted pairing of a product's latest known state with the users
/// watching it. Never stored with an empty subscriber set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Record {
    pub product: Product,
    pub subscribers: BTreeSet<UserId>,
}

impl Record {
    pub fn new(product: Product, subscriber: UserId) -> Self {
        Self {
            product,
            subscribers: BTreeSet::from([subscriber]),
        }
    }

    pub fn link(&self) -> &str {
        &self.product.link
    }

    pub fn has_subscriber(&self, user: UserId) -> bool {
        self.subscribers.contains(&user)
    }
}

/// A user that must be told the price of a product changed.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub product: Product,
    pub user_id: UserId,
}
