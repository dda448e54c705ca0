use http::{HeaderValue, Method};

use crate::separated_by_commas;

/// Holds configuration for how to set the [`Access-Control-Allow-Methods`][mdn]
/// header.
///
/// See [`CorsLayer::allow_methods`] for more details.
///
/// [mdn]: https://developer.mozilla.org/en-US/docs/Web/HTTP/Headers/Access-Control-Allow-Methods
/// [`CorsLayer::allow_methods`]: crate::CorsLayer::allow_methods
#[derive(Clone, Debug)]
#[must_use]
pub struct AllowMethods(Option<HeaderValue>);

impl AllowMethods {
    /// Set a single allowed method.
    pub fn exact(method: Method) -> Self {
        Self::list([method])
    }

    /// Set multiple allowed methods.
    ///
    /// The methods are serialized comma-joined in the given order. An empty
    /// list suppresses the header entirely.
    pub fn list<I>(methods: I) -> Self
    where
        I: IntoIterator<Item = Method>,
    {
        Self(separated_by_commas(
            methods
                .into_iter()
                .map(|m| HeaderValue::from_str(m.as_str()).unwrap()),
        ))
    }

    pub(crate) fn to_header_val(&self) -> Option<HeaderValue> {
        self.0.clone()
    }
}

impl Default for AllowMethods {
    /// `GET,HEAD,PUT,PATCH,POST,DELETE`
    fn default() -> Self {
        Self(Some(HeaderValue::from_static(
            "GET,HEAD,PUT,PATCH,POST,DELETE",
        )))
    }
}

impl From<Method> for AllowMethods {
    fn from(method: Method) -> Self {
        Self::exact(method)
    }
}

impl<const N: usize> From<[Method; N]> for AllowMethods {
    fn from(methods: [Method; N]) -> Self {
        Self::list(methods)
    }
}

impl From<Vec<Method>> for AllowMethods {
    fn from(methods: Vec<Method>) -> Self {
        Self::list(methods)
    }
}
