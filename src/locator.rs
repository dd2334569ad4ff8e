//! Immutable IRI locators.
//!
//! A [`Locator`] identifies a resource by an absolute reference string.
//! Parsing and resolution are delegated to the `url` crate; equality,
//! ordering and hashing use the normalized reference only.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{LocatorError, LocatorResult};

/// Absolute IRI identifying a resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Locator {
    reference: Arc<str>,
}

impl Locator {
    /// Parse an absolute IRI.
    pub fn parse(reference: &str) -> LocatorResult<Self> {
        let url = parse_url(reference)?;
        Ok(Self::from_url(&url))
    }

    fn from_url(url: &Url) -> Self {
        Self {
            reference: Arc::from(url.as_str()),
        }
    }

    /// The normalized reference string.
    pub fn reference(&self) -> &str {
        &self.reference
    }

    /// The escaped external form, suitable for serialization.
    pub fn external_form(&self) -> String {
        self.reference.to_string()
    }

    /// Resolve a (possibly relative) reference against this locator.
    pub fn resolve(&self, reference: &str) -> LocatorResult<Self> {
        let base = parse_url(&self.reference)?;
        let joined = base.join(reference).map_err(|source| LocatorError::Malformed {
            reference: reference.to_string(),
            source,
        })?;
        Ok(Self::from_url(&joined))
    }

    /// Copy of this locator with its fragment replaced.
    ///
    /// Works for every absolute IRI, including ones that cannot serve as a
    /// base for relative resolution (such as URNs).
    pub(crate) fn with_fragment(&self, fragment: &str) -> Self {
        match Url::parse(&self.reference) {
            Ok(mut url) => {
                url.set_fragment(Some(fragment));
                Self::from_url(&url)
            }
            // Unreachable for locators built through `parse`.
            Err(_) => Self {
                reference: Arc::from(format!("{}#{fragment}", self.reference)),
            },
        }
    }
}

fn parse_url(reference: &str) -> LocatorResult<Url> {
    Url::parse(reference).map_err(|source| LocatorError::Malformed {
        reference: reference.to_string(),
        source,
    })
}

impl std::fmt::Display for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.reference)
    }
}

impl std::str::FromStr for Locator {
    type Err = LocatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Locator {
    type Error = LocatorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Locator> for String {
    fn from(locator: Locator) -> Self {
        locator.reference.to_string()
    }
}

/// Anything that can be turned into a [`Locator`].
pub trait IntoLocator {
    fn into_locator(self) -> LocatorResult<Locator>;
}

impl IntoLocator for Locator {
    fn into_locator(self) -> LocatorResult<Locator> {
        Ok(self)
    }
}

impl IntoLocator for &Locator {
    fn into_locator(self) -> LocatorResult<Locator> {
        Ok(self.clone())
    }
}

impl IntoLocator for &str {
    fn into_locator(self) -> LocatorResult<Locator> {
        Locator::parse(self)
    }
}

impl IntoLocator for String {
    fn into_locator(self) -> LocatorResult<Locator> {
        Locator::parse(&self)
    }
}
