use std::time::Duration;

use http::{header, HeaderMap, HeaderValue, StatusCode};

use crate::{AllowHeaders, AllowMethods, AllowOrigin, ExposeHeaders, HeaderDirective};

/// A concrete CORS policy.
///
/// The default value allows any origin with the
/// `GET,HEAD,PUT,PATCH,POST,DELETE` methods, mirrors requested headers,
/// exposes nothing, sends no credentials and answers preflights with
/// `204 No Content`.
///
/// Usually configured through the [`CorsLayer`] builder methods; constructed
/// directly when returned from a per-request resolver
/// ([`CorsLayer::resolve_with`]), where fields left untouched keep their
/// defaults:
///
/// ```
/// use tower_cors::CorsOptions;
///
/// let options = CorsOptions::new()
///     .allow_credentials(true)
///     .allow_origin("http://example.com".parse::<http::HeaderValue>().unwrap());
/// ```
///
/// [`CorsLayer`]: crate::CorsLayer
/// [`CorsLayer::resolve_with`]: crate::CorsLayer::resolve_with
#[derive(Clone, Debug)]
#[must_use]
pub struct CorsOptions {
    pub(crate) origin: AllowOrigin,
    pub(crate) methods: AllowMethods,
    pub(crate) allow_headers: AllowHeaders,
    pub(crate) expose_headers: ExposeHeaders,
    pub(crate) credentials: bool,
    pub(crate) max_age: Option<HeaderValue>,
    pub(crate) preflight_continue: bool,
    pub(crate) options_success_status: StatusCode,
}

impl Default for CorsOptions {
    fn default() -> Self {
        Self {
            origin: AllowOrigin::default(),
            methods: AllowMethods::default(),
            allow_headers: AllowHeaders::default(),
            expose_headers: ExposeHeaders::default(),
            credentials: false,
            max_age: None,
            preflight_continue: false,
            options_success_status: StatusCode::NO_CONTENT,
        }
    }
}

impl CorsOptions {
    /// Create the default policy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the [`Access-Control-Allow-Origin`][mdn] policy.
    ///
    /// [mdn]: https://developer.mozilla.org/en-US/docs/Web/HTTP/Headers/Access-Control-Allow-Origin
    pub fn allow_origin<T>(mut self, origin: T) -> Self
    where
        T: Into<AllowOrigin>,
    {
        self.origin = origin.into();
        self
    }

    /// Set the value of the [`Access-Control-Allow-Methods`][mdn] header.
    ///
    /// [mdn]: https://developer.mozilla.org/en-US/docs/Web/HTTP/Headers/Access-Control-Allow-Methods
    pub fn allow_methods<T>(mut self, methods: T) -> Self
    where
        T: Into<AllowMethods>,
    {
        self.methods = methods.into();
        self
    }

    /// Set the value of the [`Access-Control-Allow-Headers`][mdn] header.
    ///
    /// [mdn]: https://developer.mozilla.org/en-US/docs/Web/HTTP/Headers/Access-Control-Allow-Headers
    pub fn allow_headers<T>(mut self, headers: T) -> Self
    where
        T: Into<AllowHeaders>,
    {
        self.allow_headers = headers.into();
        self
    }

    /// Set the value of the [`Access-Control-Expose-Headers`][mdn] header.
    ///
    /// [mdn]: https://developer.mozilla.org/en-US/docs/Web/HTTP/Headers/Access-Control-Expose-Headers
    pub fn expose_headers<T>(mut self, headers: T) -> Self
    where
        T: Into<ExposeHeaders>,
    {
        self.expose_headers = headers.into();
        self
    }

    /// Set the [`Access-Control-Allow-Credentials`][mdn] header.
    ///
    /// The header is only ever sent with the value `true`; when disabled it
    /// is omitted entirely.
    ///
    /// [mdn]: https://developer.mozilla.org/en-US/docs/Web/HTTP/Headers/Access-Control-Allow-Credentials
    pub fn allow_credentials(mut self, allow_credentials: bool) -> Self {
        self.credentials = allow_credentials;
        self
    }

    /// Set the value of the [`Access-Control-Max-Age`][mdn] header.
    ///
    /// A zero duration is sent as `0`, which is distinct from the default of
    /// not sending the header at all.
    ///
    /// [mdn]: https://developer.mozilla.org/en-US/docs/Web/HTTP/Headers/Access-Control-Max-Age
    pub fn max_age(mut self, max_age: Duration) -> Self {
        self.max_age = Some(max_age.as_secs().into());
        self
    }

    /// Pass preflight responses through to the inner service instead of
    /// short-circuiting them.
    ///
    /// The preflight headers are still applied; the inner service produces
    /// the status and body. Default `false`.
    pub fn preflight_continue(mut self, preflight_continue: bool) -> Self {
        self.preflight_continue = preflight_continue;
        self
    }

    /// Set the status code for short-circuited preflight responses.
    ///
    /// Defaults to `204 No Content`; some legacy user agents choke on `204`
    /// and need `200`.
    pub fn options_success_status(mut self, status: StatusCode) -> Self {
        self.options_success_status = status;
        self
    }

    pub(crate) fn is_enabled(&self) -> bool {
        !self.origin.is_disabled()
    }

    /// Header directives for a preflight response, in emission order.
    pub(crate) fn preflight_directives(&self, request: &HeaderMap) -> Vec<HeaderDirective> {
        let mut directives = Vec::new();
        self.origin.append_directives(request, &mut directives);
        self.append_credentials(&mut directives);
        if let Some(methods) = self.methods.to_header_val() {
            directives.push((header::ACCESS_CONTROL_ALLOW_METHODS, methods));
        }
        self.allow_headers
            .append_preflight_directives(request, &mut directives);
        if let Some(max_age) = self.max_age.clone() {
            directives.push((header::ACCESS_CONTROL_MAX_AGE, max_age));
        }
        if let Some(exposed) = self.expose_headers.to_header_val() {
            directives.push((header::ACCESS_CONTROL_EXPOSE_HEADERS, exposed));
        }
        directives
    }

    /// Header directives for an actual (non-preflight) response.
    ///
    /// Methods, allowed headers and max-age are preflight-only.
    pub(crate) fn actual_directives(&self, request: &HeaderMap) -> Vec<HeaderDirective> {
        let mut directives = Vec::new();
        self.origin.append_directives(request, &mut directives);
        self.append_credentials(&mut directives);
        if let Some(exposed) = self.expose_headers.to_header_val() {
            directives.push((header::ACCESS_CONTROL_EXPOSE_HEADERS, exposed));
        }
        directives
    }

    fn append_credentials(&self, directives: &mut Vec<HeaderDirective>) {
        if self.credentials {
            directives.push((
                header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
                HeaderValue::from_static("true"),
            ));
        }
    }
}
