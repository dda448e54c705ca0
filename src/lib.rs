//! Middleware which negotiates response headers for [CORS][mdn].
//!
//! The middleware resolves an origin policy against the request's `Origin`
//! header, attaches the matching CORS headers to the response, and answers
//! preflight (`OPTIONS`) requests itself unless configured to pass them
//! through. Policies can be fixed at mount time or resolved asynchronously
//! per request, see [`CorsLayer::resolve_with`] and
//! [`AllowOrigin::resolve_with`].
//!
//! # Example
//!
//! ```
//! use bytes::Bytes;
//! use http::{header, HeaderValue, Method, Request, Response};
//! use http_body_util::Empty;
//! use std::convert::Infallible;
//! use tower::{Service, ServiceBuilder, ServiceExt};
//! use tower_cors::CorsLayer;
//!
//! async fn handle(request: Request<Empty<Bytes>>) -> Result<Response<Empty<Bytes>>, Infallible> {
//!     Ok(Response::new(Empty::new()))
//! }
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//! let cors = CorsLayer::new()
//!     // allow `GET` and `POST` when accessing the resource
//!     .allow_methods([Method::GET, Method::POST])
//!     // allow requests from `http://example.com`
//!     .allow_origin("http://example.com".parse::<HeaderValue>()?);
//!
//! let mut service = ServiceBuilder::new()
//!     .layer(cors)
//!     .service_fn(handle);
//!
//! let request = Request::builder()
//!     .header(header::ORIGIN, "http://example.com")
//!     .body(Empty::new())?;
//!
//! let response = service
//!     .ready()
//!     .await?
//!     .call(request)
//!     .await?;
//!
//! assert_eq!(
//!     response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
//!     "http://example.com",
//! );
//! assert_eq!(response.headers().get(header::VARY).unwrap(), "Origin");
//! # Ok(())
//! # }
//! ```
//!
//! [mdn]: https://developer.mozilla.org/en-US/docs/Web/HTTP/CORS

#![doc(html_root_url = "https://docs.rs/tower-cors/0.1.0")]
#![allow(elided_lifetimes_in_paths, clippy::type_complexity)]
#![warn(
    clippy::all,
    clippy::dbg_macro,
    clippy::todo,
    clippy::mem_forget,
    clippy::unused_self,
    clippy::filter_map_next,
    clippy::needless_continue,
    clippy::needless_borrow,
    clippy::match_wildcard_for_single_variants,
    clippy::if_let_mutex,
    clippy::imprecise_flops,
    clippy::suboptimal_flops,
    clippy::lossy_float_literal,
    clippy::rest_pat_in_fully_bound_structs,
    clippy::fn_params_excessive_bools,
    clippy::exit,
    clippy::inefficient_to_string,
    clippy::linkedlist,
    clippy::macro_use_imports,
    clippy::option_option,
    clippy::verbose_file_reads,
    clippy::unnested_or_patterns,
    rust_2018_idioms,
    future_incompatible,
    nonstandard_style,
    missing_docs
)]
#![deny(unreachable_pub)]
#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]

use bytes::{BufMut, BytesMut};
use futures_core::{future::BoxFuture, ready};
use http::{
    header::{self, HeaderName, HeaderValue},
    request::Parts as RequestParts,
    HeaderMap, Method, Request, Response, StatusCode,
};
use pin_project_lite::pin_project;
use std::{
    fmt,
    future::Future,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
    time::Duration,
};
use tower_layer::Layer;
use tower_service::Service;

mod allow_headers;
mod allow_methods;
mod allow_origin;
mod expose_headers;
mod options;
mod vary;

#[cfg(test)]
mod test_helpers;

pub use crate::{
    allow_headers::AllowHeaders,
    allow_methods::AllowMethods,
    allow_origin::{AllowOrigin, OriginPattern, StaticOrigin},
    expose_headers::ExposeHeaders,
    options::CorsOptions,
};

/// Alias for a type-erased error type.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A single header to set on the response. `Vary` directives accumulate,
/// everything else overwrites.
pub(crate) type HeaderDirective = (HeaderName, HeaderValue);

#[allow(clippy::declare_interior_mutable_const)]
pub(crate) const WILDCARD: HeaderValue = HeaderValue::from_static("*");

type OptionsResolver =
    dyn Fn(RequestParts) -> BoxFuture<'static, Result<CorsOptions, BoxError>> + Send + Sync;

/// Layer that applies the [`Cors`] middleware which negotiates response
/// headers for [CORS][mdn].
///
/// See the [module docs](self) for an example.
///
/// [mdn]: https://developer.mozilla.org/en-US/docs/Web/HTTP/CORS
#[derive(Clone, Debug)]
pub struct CorsLayer {
    source: OptionsSource,
}

impl CorsLayer {
    /// Create a new `CorsLayer` with the default policy.
    ///
    /// The default allows any origin with the
    /// `GET,HEAD,PUT,PATCH,POST,DELETE` methods and mirrors requested
    /// headers. Use the builder methods to customize the behavior.
    pub fn new() -> Self {
        Self::with_options(CorsOptions::default())
    }

    /// Create a new `CorsLayer` from an already built [`CorsOptions`].
    pub fn with_options(options: CorsOptions) -> Self {
        Self {
            source: OptionsSource::Static(options),
        }
    }

    /// Resolve the whole policy per request with an asynchronous callback.
    ///
    /// The callback receives the request head and produces the
    /// [`CorsOptions`] to apply to that request; fields it leaves untouched
    /// keep their defaults. It is awaited exactly once per request; an error
    /// fails the request without setting any CORS header, exactly as the
    /// resolver produced it.
    ///
    /// ```
    /// use http::request::Parts;
    /// use tower_cors::{CorsLayer, CorsOptions};
    ///
    /// let layer = CorsLayer::resolve_with(|parts: Parts| async move {
    ///     let allow = parts.uri.path().starts_with("/api/");
    ///     Ok(CorsOptions::new().allow_credentials(allow))
    /// });
    /// ```
    ///
    /// Note that the builder methods only configure the static policy and
    /// have no effect on a layer built this way; the resolver's output is
    /// authoritative.
    pub fn resolve_with<F, Fut>(resolver: F) -> Self
    where
        F: Fn(RequestParts) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<CorsOptions, BoxError>> + Send + 'static,
    {
        Self {
            source: OptionsSource::Resolver(Arc::new(move |parts| Box::pin(resolver(parts)))),
        }
    }

    /// Set the [`Access-Control-Allow-Origin`][mdn] policy.
    ///
    /// ```
    /// use tower_cors::{CorsLayer, OriginPattern};
    ///
    /// let layer = CorsLayer::new().allow_origin([
    ///     OriginPattern::from("http://example.com"),
    ///     OriginPattern::from(regex::Regex::new(r"\.example\.com$").unwrap()),
    /// ]);
    /// ```
    ///
    /// See [`AllowOrigin`] for the accepted policies, including per-request
    /// asynchronous resolution.
    ///
    /// [mdn]: https://developer.mozilla.org/en-US/docs/Web/HTTP/Headers/Access-Control-Allow-Origin
    pub fn allow_origin<T>(self, origin: T) -> Self
    where
        T: Into<AllowOrigin>,
    {
        self.map_options(|options| options.allow_origin(origin))
    }

    /// Set the value of the [`Access-Control-Allow-Methods`][mdn] header.
    ///
    /// ```
    /// use tower_cors::CorsLayer;
    /// use http::Method;
    ///
    /// let layer = CorsLayer::new().allow_methods([Method::GET, Method::POST]);
    /// ```
    ///
    /// [mdn]: https://developer.mozilla.org/en-US/docs/Web/HTTP/Headers/Access-Control-Allow-Methods
    pub fn allow_methods<T>(self, methods: T) -> Self
    where
        T: Into<AllowMethods>,
    {
        self.map_options(|options| options.allow_methods(methods))
    }

    /// Set the value of the [`Access-Control-Allow-Headers`][mdn] header.
    ///
    /// ```
    /// use tower_cors::CorsLayer;
    /// use http::header::{ACCEPT, AUTHORIZATION};
    ///
    /// let layer = CorsLayer::new().allow_headers([AUTHORIZATION, ACCEPT]);
    /// ```
    ///
    /// By default the headers named by the preflight's
    /// `Access-Control-Request-Headers` are reflected back.
    ///
    /// [mdn]: https://developer.mozilla.org/en-US/docs/Web/HTTP/Headers/Access-Control-Allow-Headers
    pub fn allow_headers<T>(self, headers: T) -> Self
    where
        T: Into<AllowHeaders>,
    {
        self.map_options(|options| options.allow_headers(headers))
    }

    /// Set the value of the [`Access-Control-Expose-Headers`][mdn] header.
    ///
    /// [mdn]: https://developer.mozilla.org/en-US/docs/Web/HTTP/Headers/Access-Control-Expose-Headers
    pub fn expose_headers<T>(self, headers: T) -> Self
    where
        T: Into<ExposeHeaders>,
    {
        self.map_options(|options| options.expose_headers(headers))
    }

    /// Set the [`Access-Control-Allow-Credentials`][mdn] header.
    ///
    /// [mdn]: https://developer.mozilla.org/en-US/docs/Web/HTTP/Headers/Access-Control-Allow-Credentials
    pub fn allow_credentials(self, allow_credentials: bool) -> Self {
        self.map_options(|options| options.allow_credentials(allow_credentials))
    }

    /// Set the value of the [`Access-Control-Max-Age`][mdn] header.
    ///
    /// ```
    /// use tower_cors::CorsLayer;
    /// use std::time::Duration;
    ///
    /// let layer = CorsLayer::new().max_age(Duration::from_secs(60) * 10);
    /// ```
    ///
    /// By default the header is not set, which disables caching and requires
    /// a preflight call for all requests.
    ///
    /// [mdn]: https://developer.mozilla.org/en-US/docs/Web/HTTP/Headers/Access-Control-Max-Age
    pub fn max_age(self, max_age: Duration) -> Self {
        self.map_options(|options| options.max_age(max_age))
    }

    /// Pass preflight responses through to the inner service instead of
    /// short-circuiting them. Default `false`.
    pub fn preflight_continue(self, preflight_continue: bool) -> Self {
        self.map_options(|options| options.preflight_continue(preflight_continue))
    }

    /// Set the status code for short-circuited preflight responses.
    /// Defaults to `204 No Content`.
    pub fn options_success_status(self, status: StatusCode) -> Self {
        self.map_options(|options| options.options_success_status(status))
    }

    fn map_options<F>(mut self, f: F) -> Self
    where
        F: FnOnce(CorsOptions) -> CorsOptions,
    {
        self.source = match self.source {
            OptionsSource::Static(options) => OptionsSource::Static(f(options)),
            source @ OptionsSource::Resolver(_) => source,
        };
        self
    }

    /// Begin resolving the concrete options for one request.
    ///
    /// Fully static configurations resolve without suspending; a dynamic
    /// options source and a dynamic origin policy chain in that order, each
    /// awaited exactly once.
    fn resolution(&self, parts: &RequestParts) -> OptionsResolution {
        match &self.source {
            OptionsSource::Static(options) => match options.origin.as_dynamic() {
                None => OptionsResolution::Ready(Some(options.clone())),
                Some(resolver) => {
                    let origin = parts.headers.get(header::ORIGIN).cloned();
                    let options = options.clone();
                    OptionsResolution::Pending(Box::pin(async move {
                        let origin = resolver(origin).await?;
                        Ok(options.allow_origin(origin))
                    }))
                }
            },
            OptionsSource::Resolver(resolve) => {
                let future = resolve(parts.clone());
                let origin = parts.headers.get(header::ORIGIN).cloned();
                OptionsResolution::Pending(Box::pin(async move {
                    let options = future.await?;
                    match options.origin.as_dynamic() {
                        None => Ok(options),
                        Some(resolver) => {
                            let origin = resolver(origin).await?;
                            Ok(options.allow_origin(origin))
                        }
                    }
                }))
            }
        }
    }
}

impl Default for CorsLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> Layer<S> for CorsLayer {
    type Service = Cors<S>;

    fn layer(&self, inner: S) -> Self::Service {
        Cors {
            inner,
            layer: self.clone(),
        }
    }
}

#[derive(Clone)]
enum OptionsSource {
    Static(CorsOptions),
    Resolver(Arc<OptionsResolver>),
}

impl fmt::Debug for OptionsSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionsSource::Static(options) => f.debug_tuple("Static").field(options).finish(),
            OptionsSource::Resolver(_) => f.debug_tuple("Resolver").finish(),
        }
    }
}

/// Middleware which negotiates response headers for [CORS][mdn].
///
/// See the [module docs](self) for an example.
///
/// [mdn]: https://developer.mozilla.org/en-US/docs/Web/HTTP/CORS
#[derive(Clone, Debug)]
pub struct Cors<S> {
    inner: S,
    layer: CorsLayer,
}

impl<S> Cors<S> {
    /// Create a new `Cors` wrapping `inner` with the default policy.
    ///
    /// See [`CorsLayer::new`] for more details.
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            layer: CorsLayer::new(),
        }
    }

    /// Create a new `Cors` wrapping `inner` with an already built
    /// [`CorsOptions`].
    pub fn with_options(inner: S, options: CorsOptions) -> Self {
        Self {
            inner,
            layer: CorsLayer::with_options(options),
        }
    }

    /// Gets a reference to the underlying service.
    pub fn get_ref(&self) -> &S {
        &self.inner
    }

    /// Gets a mutable reference to the underlying service.
    pub fn get_mut(&mut self) -> &mut S {
        &mut self.inner
    }

    /// Consumes `self`, returning the underlying service.
    pub fn into_inner(self) -> S {
        self.inner
    }

    /// Returns a new [`Layer`] that wraps services with a [`Cors`] middleware.
    ///
    /// [`Layer`]: tower_layer::Layer
    pub fn layer() -> CorsLayer {
        CorsLayer::new()
    }

    /// Set the [`Access-Control-Allow-Origin`][mdn] policy.
    ///
    /// See [`CorsLayer::allow_origin`] for more details.
    ///
    /// [mdn]: https://developer.mozilla.org/en-US/docs/Web/HTTP/Headers/Access-Control-Allow-Origin
    pub fn allow_origin<T>(self, origin: T) -> Self
    where
        T: Into<AllowOrigin>,
    {
        self.map_layer(|layer| layer.allow_origin(origin))
    }

    /// Set the value of the [`Access-Control-Allow-Methods`][mdn] header.
    ///
    /// See [`CorsLayer::allow_methods`] for more details.
    ///
    /// [mdn]: https://developer.mozilla.org/en-US/docs/Web/HTTP/Headers/Access-Control-Allow-Methods
    pub fn allow_methods<T>(self, methods: T) -> Self
    where
        T: Into<AllowMethods>,
    {
        self.map_layer(|layer| layer.allow_methods(methods))
    }

    /// Set the value of the [`Access-Control-Allow-Headers`][mdn] header.
    ///
    /// See [`CorsLayer::allow_headers`] for more details.
    ///
    /// [mdn]: https://developer.mozilla.org/en-US/docs/Web/HTTP/Headers/Access-Control-Allow-Headers
    pub fn allow_headers<T>(self, headers: T) -> Self
    where
        T: Into<AllowHeaders>,
    {
        self.map_layer(|layer| layer.allow_headers(headers))
    }

    /// Set the value of the [`Access-Control-Expose-Headers`][mdn] header.
    ///
    /// See [`CorsLayer::expose_headers`] for more details.
    ///
    /// [mdn]: https://developer.mozilla.org/en-US/docs/Web/HTTP/Headers/Access-Control-Expose-Headers
    pub fn expose_headers<T>(self, headers: T) -> Self
    where
        T: Into<ExposeHeaders>,
    {
        self.map_layer(|layer| layer.expose_headers(headers))
    }

    /// Set the [`Access-Control-Allow-Credentials`][mdn] header.
    ///
    /// See [`CorsLayer::allow_credentials`] for more details.
    ///
    /// [mdn]: https://developer.mozilla.org/en-US/docs/Web/HTTP/Headers/Access-Control-Allow-Credentials
    pub fn allow_credentials(self, allow_credentials: bool) -> Self {
        self.map_layer(|layer| layer.allow_credentials(allow_credentials))
    }

    /// Set the value of the [`Access-Control-Max-Age`][mdn] header.
    ///
    /// See [`CorsLayer::max_age`] for more details.
    ///
    /// [mdn]: https://developer.mozilla.org/en-US/docs/Web/HTTP/Headers/Access-Control-Max-Age
    pub fn max_age(self, max_age: Duration) -> Self {
        self.map_layer(|layer| layer.max_age(max_age))
    }

    /// Pass preflight responses through to the inner service instead of
    /// short-circuiting them.
    ///
    /// See [`CorsLayer::preflight_continue`] for more details.
    pub fn preflight_continue(self, preflight_continue: bool) -> Self {
        self.map_layer(|layer| layer.preflight_continue(preflight_continue))
    }

    /// Set the status code for short-circuited preflight responses.
    ///
    /// See [`CorsLayer::options_success_status`] for more details.
    pub fn options_success_status(self, status: StatusCode) -> Self {
        self.map_layer(|layer| layer.options_success_status(status))
    }

    fn map_layer<F>(mut self, f: F) -> Self
    where
        F: FnOnce(CorsLayer) -> CorsLayer,
    {
        self.layer = f(self.layer);
        self
    }
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for Cors<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>> + Clone,
    S::Error: Into<BoxError>,
    ResBody: Default,
{
    type Response = S::Response;
    type Error = BoxError;
    type Future = ResponseFuture<S, S::Future, ReqBody>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx).map_err(Into::into)
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        let service = self.inner.clone();
        let (parts, body) = req.into_parts();
        let resolution = self.layer.resolution(&parts);
        let req = Request::from_parts(parts, body);

        ResponseFuture {
            state: State::Resolve {
                resolution,
                req: Some(req),
            },
            service,
        }
    }
}

pin_project! {
    /// Response future for [`Cors`].
    pub struct ResponseFuture<S, F, ReqBody> {
        #[pin]
        state: State<F, ReqBody>,
        service: S,
    }
}

pin_project! {
    #[project = StateProj]
    enum State<F, ReqBody> {
        Resolve {
            resolution: OptionsResolution,
            req: Option<Request<ReqBody>>,
        },
        Respond {
            #[pin]
            future: F,
            directives: Option<Vec<HeaderDirective>>,
        },
    }
}

enum OptionsResolution {
    Ready(Option<CorsOptions>),
    Pending(BoxFuture<'static, Result<CorsOptions, BoxError>>),
}

impl OptionsResolution {
    fn poll(&mut self, cx: &mut Context<'_>) -> Poll<Result<CorsOptions, BoxError>> {
        match self {
            OptionsResolution::Ready(options) => {
                Poll::Ready(Ok(options.take().expect("future polled after completion")))
            }
            OptionsResolution::Pending(future) => future.as_mut().poll(cx),
        }
    }
}

impl<S, F, ReqBody, ResBody> Future for ResponseFuture<S, F, ReqBody>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>, Future = F>,
    S::Error: Into<BoxError>,
    F: Future<Output = Result<Response<ResBody>, S::Error>>,
    ResBody: Default,
{
    type Output = Result<Response<ResBody>, BoxError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut this = self.project();

        loop {
            match this.state.as_mut().project() {
                StateProj::Resolve { resolution, req } => {
                    let options = ready!(resolution.poll(cx))?;
                    let req = req.take().expect("future polled after completion");

                    if !options.is_enabled() {
                        // CORS is off: no headers at all, straight through.
                        let future = this.service.call(req);
                        this.state.set(State::Respond {
                            future,
                            directives: None,
                        });
                        continue;
                    }

                    if is_preflight(req.method()) {
                        let directives = options.preflight_directives(req.headers());

                        if options.preflight_continue {
                            let future = this.service.call(req);
                            this.state.set(State::Respond {
                                future,
                                directives: Some(directives),
                            });
                        } else {
                            let mut response = Response::new(ResBody::default());
                            *response.status_mut() = options.options_success_status;
                            // Safari (and potentially other browsers) hang
                            // waiting for a body on body-less preflight
                            // responses without an explicit length.
                            response
                                .headers_mut()
                                .insert(header::CONTENT_LENGTH, HeaderValue::from_static("0"));
                            apply_headers(directives, response.headers_mut());
                            return Poll::Ready(Ok(response));
                        }
                    } else {
                        let directives = options.actual_directives(req.headers());
                        let future = this.service.call(req);
                        this.state.set(State::Respond {
                            future,
                            directives: Some(directives),
                        });
                    }
                }
                StateProj::Respond { future, directives } => {
                    let mut response = match ready!(future.poll(cx)) {
                        Ok(response) => response,
                        Err(err) => return Poll::Ready(Err(err.into())),
                    };
                    if let Some(directives) = directives.take() {
                        apply_headers(directives, response.headers_mut());
                    }
                    return Poll::Ready(Ok(response));
                }
            }
        }
    }
}

/// Preflights are `OPTIONS` in any casing; `http::Method` keeps extension
/// methods case-sensitive.
fn is_preflight(method: &Method) -> bool {
    method.as_str().eq_ignore_ascii_case("OPTIONS")
}

fn apply_headers(directives: Vec<HeaderDirective>, headers: &mut HeaderMap) {
    for (name, value) in directives {
        if name == header::VARY {
            vary::append_vary(headers, value);
        } else {
            headers.insert(name, value);
        }
    }
}

fn separated_by_commas<I>(mut iter: I) -> Option<HeaderValue>
where
    I: Iterator<Item = HeaderValue>,
{
    match iter.next() {
        Some(fst) => {
            let mut result = BytesMut::from(fst.as_bytes());
            for val in iter {
                result.reserve(val.len() + 1);
                result.put_u8(b',');
                result.extend_from_slice(val.as_bytes());
            }

            Some(HeaderValue::from_maybe_shared(result.freeze()).unwrap())
        }
        None => None,
    }
}
