// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;

use crate::{
    query,
    HttpMessage,
    HttpRequest,
    Message,
    Request,
    Result,
    ToMethod,
    ToUri,
    UploadNode,
};

pub type Params = IndexMap<String, String>;

#[derive(Clone, Debug)]
struct ServerRequestParts {
    request: Request,
    server_params: Params,
    cookie_params: Params,
    query_params: Params,
    parsed_body: Option<Value>,
    uploaded_files: IndexMap<String, UploadNode>,
    attributes: IndexMap<String, Value>,
}

/// An incoming request, as seen by the server: the request itself plus the
/// server environment, the decoded cookies, query and body, the uploaded
/// files and application-defined attributes.
#[derive(Clone, Debug)]
pub struct ServerRequest {
    parts: Arc<ServerRequestParts>,
}

impl ServerRequest {
    pub fn new(method: impl ToMethod, uri: impl ToUri) -> Result<ServerRequest> {
        Ok(ServerRequest::from_request(Request::new(method, uri)?, Params::new()))
    }

    #[must_use]
    pub fn from_request(request: Request, server_params: Params) -> ServerRequest {
        ServerRequest {
            parts: Arc::new(ServerRequestParts {
                request,
                server_params,
                cookie_params: Params::new(),
                query_params: Params::new(),
                parsed_body: None,
                uploaded_files: IndexMap::new(),
                attributes: IndexMap::new(),
            }),
        }
    }

    #[must_use]
    pub fn same_instance(&self, other: &ServerRequest) -> bool {
        Arc::ptr_eq(&self.parts, &other.parts)
    }

    #[must_use]
    pub fn server_params(&self) -> &Params {
        &self.parts.server_params
    }

    #[must_use]
    pub fn cookie_params(&self) -> &Params {
        &self.parts.cookie_params
    }

    #[must_use]
    pub fn query_params(&self) -> &Params {
        &self.parts.query_params
    }

    #[must_use]
    pub fn parsed_body(&self) -> Option<&Value> {
        self.parts.parsed_body.as_ref()
    }

    #[must_use]
    pub fn uploaded_files(&self) -> &IndexMap<String, UploadNode> {
        &self.parts.uploaded_files
    }

    #[must_use]
    pub fn attributes(&self) -> &IndexMap<String, Value> {
        &self.parts.attributes
    }

    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.parts.attributes.get(name)
    }

    #[must_use]
    pub fn attribute_or<'a>(&'a self, name: &str, default: &'a Value) -> &'a Value {
        self.attribute(name).unwrap_or(default)
    }

    pub fn with_attribute(&self, name: &str, value: impl Into<Value>) -> ServerRequest {
        let value = value.into();
        if self.attribute(name) == Some(&value) {
            return self.clone();
        }

        let name = name.to_owned();
        self.derive(|parts| {
            parts.attributes.insert(name, value);
        })
    }

    pub fn without_attribute(&self, name: &str) -> ServerRequest {
        if !self.parts.attributes.contains_key(name) {
            return self.clone();
        }

        self.derive(|parts| {
            parts.attributes.shift_remove(name);
        })
    }

    pub fn with_cookie_params(&self, cookies: Params) -> ServerRequest {
        if cookies == self.parts.cookie_params {
            return self.clone();
        }

        self.derive(|parts| parts.cookie_params = cookies)
    }

    pub fn with_query_params(&self, query: Params) -> ServerRequest {
        if query == self.parts.query_params {
            return self.clone();
        }

        self.derive(|parts| parts.query_params = query)
    }

    /// Takes the query parameters from the query of the URI. Of repeated
    /// names, the last value is kept.
    pub fn with_query_params_from_uri(&self) -> ServerRequest {
        let query = query::parse_query(self.uri().query()).into_iter().collect();
        self.with_query_params(query)
    }

    pub fn with_parsed_body(&self, body: Option<Value>) -> ServerRequest {
        if body == self.parts.parsed_body {
            return self.clone();
        }

        self.derive(|parts| parts.parsed_body = body)
    }

    /// Replaces the uploaded files. Every leaf of the tree is an
    /// [`UploadedFile`](crate::UploadedFile) by construction.
    pub fn with_uploaded_files(&self, files: IndexMap<String, UploadNode>) -> ServerRequest {
        if files == self.parts.uploaded_files {
            return self.clone();
        }

        self.derive(|parts| parts.uploaded_files = files)
    }

    fn derive(&self, f: impl FnOnce(&mut ServerRequestParts)) -> ServerRequest {
        let mut parts = ServerRequestParts::clone(&self.parts);
        f(&mut parts);
        ServerRequest { parts: Arc::new(parts) }
    }
}

impl HttpMessage for ServerRequest {
    fn message(&self) -> &Message {
        self.parts.request.message()
    }

    fn with_message(&self, message: Message) -> Self {
        let request = self.parts.request.with_message(message);
        self.derive(|parts| parts.request = request)
    }
}

impl HttpRequest for ServerRequest {
    fn request(&self) -> &Request {
        &self.parts.request
    }

    fn with_request(&self, request: Request) -> Self {
        self.derive(|parts| parts.request = request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Method, UploadError, UploadedFile};
    use serde_json::json;

    fn request() -> ServerRequest {
        ServerRequest::new(Method::Post, "http://a.com/upload?tag=x&tag=y&page=2").unwrap()
    }

    #[test]
    fn test_attributes() {
        let request = request();
        let with = request.with_attribute("user", json!({"id": 7}));
        assert_eq!(with.attribute("user"), Some(&json!({"id": 7})));
        assert_eq!(request.attribute("user"), None);

        assert!(with.with_attribute("user", json!({"id": 7})).same_instance(&with));
        assert!(with.without_attribute("absent").same_instance(&with));

        let without = with.without_attribute("user");
        assert!(without.attributes().is_empty());
        assert_eq!(without.attribute_or("user", &Value::Null), &Value::Null);
    }

    #[test]
    fn test_params() {
        let request = request();
        let cookies = Params::from([(String::from("session"), String::from("abc"))]);

        let with = request.with_cookie_params(cookies.clone());
        assert_eq!(with.cookie_params(), &cookies);
        assert!(with.with_cookie_params(cookies).same_instance(&with));
        assert!(request.cookie_params().is_empty());

        let query = request.with_query_params_from_uri();
        assert_eq!(query.query_params().get("tag").map(String::as_str), Some("y"));
        assert_eq!(query.query_params().get("page").map(String::as_str), Some("2"));
    }

    #[test]
    fn test_parsed_body() {
        let request = request();
        assert!(request.with_parsed_body(None).same_instance(&request));

        let with = request.with_parsed_body(Some(json!({"name": "corriere"})));
        assert_eq!(with.parsed_body(), Some(&json!({"name": "corriere"})));
    }

    #[test]
    fn test_uploaded_files() {
        let request = request();
        let file = UploadNode::from(UploadedFile::from_stream("x", Some(1), UploadError::Ok));
        let files = IndexMap::from([(String::from("avatar"), file)]);

        let with = request.with_uploaded_files(files.clone());
        assert_eq!(with.uploaded_files().len(), 1);
        assert!(with.with_uploaded_files(files).same_instance(&with));
    }

    #[test]
    fn test_request_operations() {
        let request = request().with_attribute("a", 1);
        let changed = request.with_method("PUT").unwrap().with_header("X-Foo", "bar").unwrap();

        assert_eq!(changed.method(), Method::Put);
        assert_eq!(changed.header("x-foo"), ["bar"]);
        assert_eq!(changed.attribute("a"), Some(&json!(1)));
        assert_eq!(changed.header_line("Host"), "a.com");
        assert_eq!(request.method(), Method::Post);
        assert!(!request.has_header("X-Foo"));

        assert!(request.with_method("post").unwrap().same_instance(&request));
    }
}
