// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use std::sync::OnceLock;

use crate::{
    Body,
    HeaderMap,
    HeaderValue,
    HttpVersion,
    Result,
};

/// The state every message has: the protocol version, the headers and the
/// body.
#[derive(Clone, Debug, Default)]
pub struct Message {
    version: HttpVersion,
    headers: HeaderMap,

    /// An empty body is created on first access when none was given.
    body: OnceLock<Body>,
}

impl Message {
    #[must_use]
    pub fn new(headers: HeaderMap, body: Option<Body>, version: HttpVersion) -> Message {
        let message = Message { version, headers, body: OnceLock::new() };
        if let Some(body) = body {
            _ = message.body.set(body);
        }
        message
    }

    #[must_use]
    pub fn version(&self) -> HttpVersion {
        self.version
    }

    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    #[must_use]
    pub fn body(&self) -> Body {
        self.body.get_or_init(Body::default).clone()
    }

    pub(crate) fn set_headers(&mut self, headers: HeaderMap) {
        self.headers = headers;
    }
}

/// The operations shared by requests and responses. All `with_*` operations
/// leave `self` untouched and return the derived message, or `self` itself
/// when nothing would change.
pub trait HttpMessage: Clone {
    fn message(&self) -> &Message;

    /// Returns a new message of this type carrying `message`.
    fn with_message(&self, message: Message) -> Self;

    fn protocol_version(&self) -> HttpVersion {
        self.message().version
    }

    fn with_protocol_version(&self, version: HttpVersion) -> Self {
        if version == self.message().version {
            return self.clone();
        }

        let mut message = self.message().clone();
        message.version = version;
        self.with_message(message)
    }

    fn headers(&self) -> &HeaderMap {
        &self.message().headers
    }

    fn has_header(&self, name: &str) -> bool {
        self.message().headers.contains(name)
    }

    /// The values of the header; empty when absent.
    fn header(&self, name: &str) -> &[String] {
        self.message().headers.get(name)
    }

    fn header_line(&self, name: &str) -> String {
        self.message().headers.get_line(name)
    }

    /// Replaces the whole header collection.
    fn with_headers(&self, headers: HeaderMap) -> Self {
        if headers.same_instance(&self.message().headers) {
            return self.clone();
        }

        let mut message = self.message().clone();
        message.headers = headers;
        self.with_message(message)
    }

    fn with_header(&self, name: &str, value: impl Into<HeaderValue>) -> Result<Self> {
        let headers = self.message().headers.with_replaced(name, value)?;
        Ok(self.with_headers(headers))
    }

    fn with_added_header(&self, name: &str, value: impl Into<HeaderValue>) -> Result<Self> {
        let headers = self.message().headers.with_added(name, value)?;
        Ok(self.with_headers(headers))
    }

    fn without_header(&self, name: &str) -> Self {
        self.with_headers(self.message().headers.with_removed(name))
    }

    fn body(&self) -> Body {
        self.message().body()
    }

    fn with_body(&self, body: impl Into<Body>) -> Self {
        let body = body.into();
        if self.message().body.get().is_some_and(|current| current.ptr_eq(&body)) {
            return self.clone();
        }

        let mut message = self.message().clone();
        message.body = OnceLock::from(body);
        self.with_message(message)
    }
}
