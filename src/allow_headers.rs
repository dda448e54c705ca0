use http::{header, HeaderMap, HeaderName, HeaderValue};

use crate::{separated_by_commas, HeaderDirective};

/// Holds configuration for how to set the [`Access-Control-Allow-Headers`][mdn]
/// header.
///
/// See [`CorsLayer::allow_headers`] for more details.
///
/// [mdn]: https://developer.mozilla.org/en-US/docs/Web/HTTP/Headers/Access-Control-Allow-Headers
/// [`CorsLayer::allow_headers`]: crate::CorsLayer::allow_headers
#[derive(Clone, Debug, Default)]
#[must_use]
pub struct AllowHeaders(AllowHeadersKind);

impl AllowHeaders {
    /// Allow the headers the client asked for, by mirroring the preflight
    /// [`Access-Control-Request-Headers`][mdn] header.
    ///
    /// This is the default. Mirrored responses carry
    /// `Vary: Access-Control-Request-Headers`.
    ///
    /// [mdn]: https://developer.mozilla.org/en-US/docs/Web/HTTP/Headers/Access-Control-Request-Headers
    pub fn mirror_request() -> Self {
        Self(AllowHeadersKind::MirrorRequest)
    }

    /// Set a fixed list of allowed headers.
    ///
    /// The headers are serialized comma-joined in the given order. An empty
    /// list suppresses the header entirely, without falling back to
    /// mirroring.
    pub fn list<I>(headers: I) -> Self
    where
        I: IntoIterator<Item = HeaderName>,
    {
        Self(AllowHeadersKind::List(separated_by_commas(
            headers.into_iter().map(Into::into),
        )))
    }

    pub(crate) fn append_preflight_directives(
        &self,
        request: &HeaderMap,
        directives: &mut Vec<HeaderDirective>,
    ) {
        match &self.0 {
            AllowHeadersKind::MirrorRequest => {
                directives.push((
                    header::VARY,
                    HeaderValue::from_static("Access-Control-Request-Headers"),
                ));
                if let Some(requested) = request.get(header::ACCESS_CONTROL_REQUEST_HEADERS) {
                    if !requested.is_empty() {
                        directives
                            .push((header::ACCESS_CONTROL_ALLOW_HEADERS, requested.clone()));
                    }
                }
            }
            AllowHeadersKind::List(Some(headers)) => {
                directives.push((header::ACCESS_CONTROL_ALLOW_HEADERS, headers.clone()));
            }
            AllowHeadersKind::List(None) => {}
        }
    }
}

#[derive(Clone, Debug)]
enum AllowHeadersKind {
    MirrorRequest,
    List(Option<HeaderValue>),
}

impl Default for AllowHeadersKind {
    fn default() -> Self {
        Self::MirrorRequest
    }
}

impl<const N: usize> From<[HeaderName; N]> for AllowHeaders {
    fn from(headers: [HeaderName; N]) -> Self {
        Self::list(headers)
    }
}

impl From<Vec<HeaderName>> for AllowHeaders {
    fn from(headers: Vec<HeaderName>) -> Self {
        Self::list(headers)
    }
}
