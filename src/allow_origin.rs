use std::{fmt, future::Future, sync::Arc};

use futures_core::future::BoxFuture;
use http::{header, HeaderMap, HeaderValue};
use regex::Regex;

use crate::{BoxError, HeaderDirective, WILDCARD};

type OriginResolver =
    dyn Fn(Option<HeaderValue>) -> BoxFuture<'static, Result<StaticOrigin, BoxError>>
        + Send
        + Sync;

/// Holds configuration for how to set the [`Access-Control-Allow-Origin`][mdn]
/// header.
///
/// An origin policy is either [static](StaticOrigin), decidable from the
/// mounted configuration alone, or dynamic, resolved per request by an
/// asynchronous callback. See [`CorsLayer::allow_origin`] for more details.
///
/// [mdn]: https://developer.mozilla.org/en-US/docs/Web/HTTP/Headers/Access-Control-Allow-Origin
/// [`CorsLayer::allow_origin`]: crate::CorsLayer::allow_origin
#[derive(Clone, Default)]
pub struct AllowOrigin(OriginKind);

impl AllowOrigin {
    /// Turn CORS handling off entirely: no CORS header is set on any
    /// response.
    pub fn disabled() -> Self {
        StaticOrigin::disabled().into()
    }

    /// Allow any origin by sending a wildcard (`*`).
    ///
    /// This is the default.
    pub fn any() -> Self {
        StaticOrigin::any().into()
    }

    /// Send a single fixed allowed origin.
    ///
    /// See [`StaticOrigin::exact`] for more details.
    pub fn exact(origin: HeaderValue) -> Self {
        StaticOrigin::exact(origin).into()
    }

    /// Allow origins matching any of the given patterns, reflecting the
    /// request origin on a match.
    ///
    /// See [`StaticOrigin::list`] for more details.
    pub fn list<I>(patterns: I) -> Self
    where
        I: IntoIterator<Item = OriginPattern>,
    {
        StaticOrigin::list(patterns).into()
    }

    /// Allow any origin, by mirroring the request origin.
    pub fn mirror_request() -> Self {
        StaticOrigin::mirror_request().into()
    }

    /// Resolve the origin policy per request with an asynchronous callback.
    ///
    /// The callback receives the request's `Origin` header value and produces
    /// the [`StaticOrigin`] to apply to that request. It is awaited exactly
    /// once per request; an error fails the request without setting any CORS
    /// header.
    ///
    /// ```
    /// use tower_cors::{AllowOrigin, StaticOrigin};
    ///
    /// let origin = AllowOrigin::resolve_with(|origin| async move {
    ///     match origin {
    ///         Some(origin) if origin.as_bytes().ends_with(b".rust-lang.org") => {
    ///             Ok(StaticOrigin::exact(origin))
    ///         }
    ///         _ => Ok(StaticOrigin::disabled()),
    ///     }
    /// });
    /// ```
    pub fn resolve_with<F, Fut>(resolver: F) -> Self
    where
        F: Fn(Option<HeaderValue>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<StaticOrigin, BoxError>> + Send + 'static,
    {
        Self(OriginKind::Dynamic(Arc::new(move |origin| {
            Box::pin(resolver(origin))
        })))
    }

    pub(crate) fn as_dynamic(&self) -> Option<Arc<OriginResolver>> {
        match &self.0 {
            OriginKind::Dynamic(resolver) => Some(Arc::clone(resolver)),
            OriginKind::Static(_) => None,
        }
    }

    pub(crate) fn is_disabled(&self) -> bool {
        match &self.0 {
            OriginKind::Static(origin) => origin.is_disabled(),
            OriginKind::Dynamic(_) => false,
        }
    }

    pub(crate) fn append_directives(
        &self,
        request: &HeaderMap,
        directives: &mut Vec<HeaderDirective>,
    ) {
        match &self.0 {
            OriginKind::Static(origin) => origin.append_directives(request, directives),
            // Dynamic policies are resolved to a static one before headers
            // are built.
            OriginKind::Dynamic(_) => {}
        }
    }
}

impl fmt::Debug for AllowOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            OriginKind::Static(inner) => fmt::Debug::fmt(inner, f),
            OriginKind::Dynamic(_) => f.debug_tuple("Dynamic").finish(),
        }
    }
}

impl From<StaticOrigin> for AllowOrigin {
    fn from(origin: StaticOrigin) -> Self {
        Self(OriginKind::Static(origin))
    }
}

/// `false` disables CORS entirely; `true` mirrors the request origin.
impl From<bool> for AllowOrigin {
    fn from(allow: bool) -> Self {
        if allow {
            Self::mirror_request()
        } else {
            Self::disabled()
        }
    }
}

impl From<HeaderValue> for AllowOrigin {
    fn from(origin: HeaderValue) -> Self {
        Self::exact(origin)
    }
}

impl From<Regex> for AllowOrigin {
    fn from(pattern: Regex) -> Self {
        Self::list([OriginPattern::Pattern(pattern)])
    }
}

impl<const N: usize> From<[OriginPattern; N]> for AllowOrigin {
    fn from(patterns: [OriginPattern; N]) -> Self {
        Self::list(patterns)
    }
}

impl From<Vec<OriginPattern>> for AllowOrigin {
    fn from(patterns: Vec<OriginPattern>) -> Self {
        Self::list(patterns)
    }
}

#[derive(Clone)]
enum OriginKind {
    Static(StaticOrigin),
    Dynamic(Arc<OriginResolver>),
}

impl Default for OriginKind {
    fn default() -> Self {
        Self::Static(StaticOrigin::default())
    }
}

/// An origin policy that can be evaluated without awaiting anything.
///
/// This is what a dynamic policy resolves to, which keeps resolvers from
/// returning further dynamic policies.
#[derive(Clone, Default)]
pub struct StaticOrigin(StaticKind);

impl StaticOrigin {
    /// Turn CORS handling off entirely.
    pub fn disabled() -> Self {
        Self(StaticKind::Disabled)
    }

    /// Allow any origin by sending a wildcard (`*`).
    ///
    /// No `Vary: Origin` is emitted for wildcard responses.
    pub fn any() -> Self {
        Self(StaticKind::Any)
    }

    /// Send a single fixed allowed origin.
    ///
    /// The configured value is sent verbatim without being matched against
    /// the request origin, along with `Vary: Origin`. A literal `*` is the
    /// wildcard policy.
    pub fn exact(origin: HeaderValue) -> Self {
        if origin == "*" {
            return Self::any();
        }
        Self(StaticKind::Exact(origin))
    }

    /// Allow origins matching any of the given patterns.
    ///
    /// Patterns are tried in order and matching short-circuits. On a match
    /// the request origin is reflected back; otherwise no allow-origin header
    /// is set. `Vary: Origin` is emitted either way.
    pub fn list<I>(patterns: I) -> Self
    where
        I: IntoIterator<Item = OriginPattern>,
    {
        Self(StaticKind::Patterns(
            patterns.into_iter().collect::<Vec<_>>().into(),
        ))
    }

    /// Allow any origin, by mirroring the request origin.
    pub fn mirror_request() -> Self {
        Self::list([OriginPattern::Constant(true)])
    }

    pub(crate) fn is_disabled(&self) -> bool {
        matches!(self.0, StaticKind::Disabled)
    }

    pub(crate) fn append_directives(
        &self,
        request: &HeaderMap,
        directives: &mut Vec<HeaderDirective>,
    ) {
        match &self.0 {
            StaticKind::Disabled => {}
            StaticKind::Any => {
                directives.push((header::ACCESS_CONTROL_ALLOW_ORIGIN, WILDCARD));
            }
            StaticKind::Exact(origin) => {
                directives.push((header::ACCESS_CONTROL_ALLOW_ORIGIN, origin.clone()));
                directives.push((header::VARY, HeaderValue::from_static("Origin")));
            }
            StaticKind::Patterns(patterns) => {
                if let Some(origin) = request.get(header::ORIGIN) {
                    let candidate = origin.to_str().unwrap_or("");
                    if is_origin_allowed(candidate, patterns) {
                        directives.push((header::ACCESS_CONTROL_ALLOW_ORIGIN, origin.clone()));
                    }
                }
                // Callers detect rejection by the absent allow-origin header;
                // caches still have to key on the origin.
                directives.push((header::VARY, HeaderValue::from_static("Origin")));
            }
        }
    }
}

impl fmt::Debug for StaticOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            StaticKind::Disabled => f.write_str("Disabled"),
            StaticKind::Any => f.write_str("Any"),
            StaticKind::Exact(inner) => f.debug_tuple("Exact").field(inner).finish(),
            StaticKind::Patterns(inner) => f.debug_tuple("Patterns").field(inner).finish(),
        }
    }
}

#[derive(Clone)]
enum StaticKind {
    Disabled,
    Any,
    Exact(HeaderValue),
    Patterns(Arc<[OriginPattern]>),
}

impl Default for StaticKind {
    fn default() -> Self {
        Self::Any
    }
}

/// A single member of an origin pattern set.
#[derive(Clone, Debug)]
pub enum OriginPattern {
    /// Matches when the request origin equals this value exactly.
    ///
    /// Comparison is case-sensitive with no scheme or port canonicalization.
    Exact(String),
    /// Matches when the regular expression matches the request origin.
    Pattern(Regex),
    /// Matches every origin (`true`) or no origin (`false`), regardless of
    /// the request origin value.
    Constant(bool),
}

impl OriginPattern {
    /// Returns whether `origin` satisfies this pattern.
    pub fn matches(&self, origin: &str) -> bool {
        match self {
            OriginPattern::Exact(allowed) => allowed == origin,
            OriginPattern::Pattern(pattern) => pattern.is_match(origin),
            OriginPattern::Constant(allowed) => *allowed,
        }
    }
}

impl From<&str> for OriginPattern {
    fn from(origin: &str) -> Self {
        Self::Exact(origin.to_owned())
    }
}

impl From<String> for OriginPattern {
    fn from(origin: String) -> Self {
        Self::Exact(origin)
    }
}

impl From<Regex> for OriginPattern {
    fn from(pattern: Regex) -> Self {
        Self::Pattern(pattern)
    }
}

impl From<bool> for OriginPattern {
    fn from(allow: bool) -> Self {
        Self::Constant(allow)
    }
}

/// Ordered, short-circuiting any-match over a pattern set.
pub(crate) fn is_origin_allowed(origin: &str, patterns: &[OriginPattern]) -> bool {
    patterns.iter().any(|pattern| pattern.matches(origin))
}
