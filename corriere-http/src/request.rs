// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use std::sync::Arc;

use tracing::debug;

use crate::{
    syntax,
    Body,
    Error,
    HeaderMap,
    HttpMessage,
    HttpVersion,
    Message,
    Method,
    Result,
    ToMethod,
    ToUri,
    Uri,
};

#[derive(Clone, Debug)]
pub(crate) struct RequestParts {
    message: Message,
    method: Method,
    uri: Uri,

    /// Set by [`HttpRequest::with_request_target`]; otherwise the target is
    /// derived from the URI.
    request_target: Option<String>,
}

/// An outgoing request.
///
/// The request is immutable: the `with_*` operations of [`HttpMessage`] and
/// [`HttpRequest`] return a new request. Cloning is cheap.
#[derive(Clone, Debug)]
pub struct Request {
    parts: Arc<RequestParts>,
}

impl Request {
    /// Creates a request without headers and with an empty body.
    pub fn new(method: impl ToMethod, uri: impl ToUri) -> Result<Request> {
        Request::from_parts(method, uri, HeaderMap::new(), None, HttpVersion::default())
    }

    /// Creates a request. When the headers don't contain `Host`, it is taken
    /// from the URI and placed before all other headers.
    pub fn from_parts(
        method: impl ToMethod,
        uri: impl ToUri,
        headers: HeaderMap,
        body: Option<Body>,
        version: HttpVersion,
    ) -> Result<Request> {
        let method = method.to_method()?;
        let uri = uri.to_uri()?;

        let headers = if headers.contains("Host") {
            headers
        } else {
            with_host_from_uri(&headers, &uri)?
        };

        Ok(Request {
            parts: Arc::new(RequestParts {
                message: Message::new(headers, body, version),
                method,
                uri,
                request_target: None,
            }),
        })
    }

    /// Whether both requests share the same state, which is the case for a
    /// `with_*` operation that didn't change anything.
    #[must_use]
    pub fn same_instance(&self, other: &Request) -> bool {
        Arc::ptr_eq(&self.parts, &other.parts)
    }

    pub(crate) fn derive(&self, f: impl FnOnce(&mut RequestParts)) -> Request {
        let mut parts = RequestParts::clone(&self.parts);
        f(&mut parts);
        Request { parts: Arc::new(parts) }
    }
}

impl HttpMessage for Request {
    fn message(&self) -> &Message {
        &self.parts.message
    }

    fn with_message(&self, message: Message) -> Self {
        self.derive(|parts| parts.message = message)
    }
}

/// Computes the `Host` header for the URI, e.g. `example.com:8080`. `None`
/// when the URI has no host.
pub(crate) fn host_header(uri: &Uri) -> Result<Option<String>> {
    if uri.host().is_empty() {
        return Ok(None);
    }

    let host = match uri.port() {
        Some(port) => format!("{}:{port}", uri.host()),
        None => uri.host().to_owned(),
    };

    if let Err(reason) = syntax::validate_field_content(host.as_bytes()) {
        debug!(host, ?reason, "rejected URI host as Host header");
        return Err(Error::MalformedHeader { argument: "value", value: host, index: None, reason });
    }

    Ok(Some(host))
}

fn with_host_from_uri(headers: &HeaderMap, uri: &Uri) -> Result<HeaderMap> {
    Ok(match host_header(uri)? {
        Some(host) => headers.with_first("Host", vec![host]),
        None => headers.clone(),
    })
}

/// The operations of requests, both outgoing ([`Request`]) and incoming
/// ([`ServerRequest`](crate::ServerRequest)).
pub trait HttpRequest: HttpMessage {
    fn request(&self) -> &Request;

    /// Returns a new value of this type carrying `request`.
    fn with_request(&self, request: Request) -> Self;

    fn method(&self) -> Method {
        self.request().parts.method
    }

    fn uri(&self) -> &Uri {
        &self.request().parts.uri
    }

    /// The target of the start line: the explicitly set target, or else the
    /// path (`/` when empty) with the query.
    fn request_target(&self) -> String {
        let parts = &self.request().parts;
        if let Some(target) = &parts.request_target {
            return target.clone();
        }

        let mut target = match parts.uri.path() {
            "" => String::from("/"),
            path => path.to_owned(),
        };

        if !parts.uri.query().is_empty() {
            target.push('?');
            target.push_str(parts.uri.query());
        }

        target
    }

    fn with_request_target(&self, target: &str) -> Result<Self> {
        if target.chars().any(char::is_whitespace) {
            debug!(target, "rejected request target containing whitespace");
            return Err(Error::invalid_argument("request_target", "invalid request target provided; cannot contain whitespace"));
        }

        let request = self.request();
        if request.parts.request_target.as_deref() == Some(target) {
            return Ok(self.clone());
        }

        let target = target.to_owned();
        Ok(self.with_request(request.derive(|parts| parts.request_target = Some(target))))
    }

    fn with_method(&self, method: impl ToMethod) -> Result<Self> {
        let method = method.to_method()?;

        let request = self.request();
        if request.parts.method == method {
            return Ok(self.clone());
        }

        Ok(self.with_request(request.derive(|parts| parts.method = method)))
    }

    /// Replaces the URI. The `Host` header is refreshed from the new URI,
    /// unless `preserve_host` is set and a `Host` header is present.
    fn with_uri(&self, uri: impl ToUri, preserve_host: bool) -> Result<Self> {
        let uri = uri.to_uri()?;

        let request = self.request();
        if request.parts.uri == uri {
            return Ok(self.clone());
        }

        let headers = request.message().headers();
        let headers = if preserve_host && headers.contains("Host") {
            headers.clone()
        } else {
            with_host_from_uri(headers, &uri)?
        };

        Ok(self.with_request(request.derive(|parts| {
            parts.message.set_headers(headers);
            parts.uri = uri;
        })))
    }
}

impl HttpRequest for Request {
    fn request(&self) -> &Request {
        self
    }

    fn with_request(&self, request: Request) -> Self {
        request
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use rstest::rstest;

    #[test]
    fn test_host_is_synthesized_first() {
        let headers = HeaderMap::from_pairs([("Accept", "*/*"), ("X-Foo", "bar")]).unwrap();
        let request = Request::from_parts(Method::Get, "http://a.com/x", headers, None, HttpVersion::Http11).unwrap();

        let names: Vec<&str> = request.headers().names().collect();
        assert_eq!(names, ["Host", "Accept", "X-Foo"]);
        assert_eq!(request.header("host"), ["a.com"]);
    }

    #[test]
    fn test_host_includes_non_default_port() {
        let request = Request::new("GET", "http://a.com:8080/").unwrap();
        assert_eq!(request.header_line("Host"), "a.com:8080");

        let request = Request::new("GET", "https://a.com:443/").unwrap();
        assert_eq!(request.header_line("Host"), "a.com");
    }

    #[test]
    fn test_explicit_host_is_kept() {
        let headers = HeaderMap::from_pairs([("Accept", "*/*"), ("host", "b.com")]).unwrap();
        let request = Request::from_parts(Method::Get, "http://a.com/", headers, None, HttpVersion::Http11).unwrap();
        assert_eq!(request.header("Host"), ["b.com"]);
        assert_eq!(request.headers().names().collect::<Vec<_>>(), ["Accept", "host"]);
    }

    #[test]
    fn test_no_host_without_uri_host() {
        let request = Request::new(Method::Get, "/relative").unwrap();
        assert!(!request.has_header("Host"));
    }

    #[rstest]
    #[case("http://a.com", "/")]
    #[case("http://a.com/x/y", "/x/y")]
    #[case("http://a.com/x?q=1", "/x?q=1")]
    #[case("http://a.com?q=1", "/?q=1")]
    #[case("", "/")]
    fn test_request_target(#[case] uri: &str, #[case] expected: &str) {
        assert_eq!(Request::new(Method::Get, uri).unwrap().request_target(), expected);
    }

    #[test]
    fn test_with_request_target() {
        let request = Request::new(Method::Options, "http://a.com/x").unwrap();
        let star = request.with_request_target("*").unwrap();
        assert_eq!(star.request_target(), "*");
        assert_eq!(request.request_target(), "/x");
        assert!(star.with_request_target("*").unwrap().same_instance(&star));

        let error = request.with_request_target("/a b").unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_with_method() {
        let request = Request::new(Method::Get, "http://a.com/").unwrap();
        assert!(request.with_method("get").unwrap().same_instance(&request));

        let post = request.with_method("post").unwrap();
        assert_eq!(post.method(), Method::Post);
        assert_eq!(request.method(), Method::Get);

        assert_eq!(request.with_method("BREW").unwrap_err().kind(), ErrorKind::TypeMismatch);
    }

    #[test]
    fn test_with_uri_refreshes_host() {
        let request = Request::new(Method::Get, "http://a.com/").unwrap()
            .with_header("Accept", "*/*").unwrap();

        let moved = request.with_uri("http://b.com:81/", false).unwrap();
        assert_eq!(moved.header_line("Host"), "b.com:81");
        assert_eq!(moved.headers().names().next(), Some("Host"));
        assert_eq!(request.header_line("Host"), "a.com");

        let preserved = request.with_uri("http://b.com/", true).unwrap();
        assert_eq!(preserved.header_line("Host"), "a.com");
        assert_eq!(preserved.uri().host(), "b.com");
    }

    #[test]
    fn test_with_uri_preserve_host_without_host_header() {
        let request = Request::new(Method::Get, "/path").unwrap();
        let moved = request.with_uri("http://c.com/", true).unwrap();
        assert_eq!(moved.header("Host"), ["c.com"]);
    }

    #[test]
    fn test_with_same_uri_is_noop() {
        let request = Request::new(Method::Get, "http://a.com/x").unwrap();
        assert!(request.with_uri("http://A.com/x", false).unwrap().same_instance(&request));
    }

    #[test]
    fn test_invalid_uri_is_rejected() {
        let error = Request::new(Method::Get, "http://a.com:99999/").unwrap_err();
        assert_eq!(error.kind(), ErrorKind::MalformedUri);
    }
}
