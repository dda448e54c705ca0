use http::{HeaderName, HeaderValue};

use crate::separated_by_commas;

/// Holds configuration for how to set the [`Access-Control-Expose-Headers`][mdn]
/// header.
///
/// Unset (the default) or empty, no headers are exposed.
///
/// [mdn]: https://developer.mozilla.org/en-US/docs/Web/HTTP/Headers/Access-Control-Expose-Headers
#[derive(Clone, Debug, Default)]
#[must_use]
pub struct ExposeHeaders(Option<HeaderValue>);

impl ExposeHeaders {
    /// Expose no headers.
    ///
    /// This is the default.
    pub fn none() -> Self {
        Self(None)
    }

    /// Set a list of exposed headers, serialized comma-joined in the given
    /// order.
    pub fn list<I>(headers: I) -> Self
    where
        I: IntoIterator<Item = HeaderName>,
    {
        Self(separated_by_commas(headers.into_iter().map(Into::into)))
    }

    pub(crate) fn to_header_val(&self) -> Option<HeaderValue> {
        self.0.clone()
    }
}

impl<const N: usize> From<[HeaderName; N]> for ExposeHeaders {
    fn from(headers: [HeaderName; N]) -> Self {
        Self::list(headers)
    }
}

impl From<Vec<HeaderName>> for ExposeHeaders {
    fn from(headers: Vec<HeaderName>) -> Self {
        Self::list(headers)
    }
}
