// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use std::sync::{
    Arc,
    Mutex,
    PoisonError,
};

use tracing::debug;

use corriere_http::{
    Body,
    HeaderMap,
    HttpMessage,
    HttpRequest,
    Method,
    Request,
    Response,
    ToUri,
};

use crate::{
    merge_default_headers,
    ClientConfig,
    ClientError,
    CookieJar,
    Handler,
    HandlerConfig,
};

/// Sends requests through a [`Handler`], taking care of the default headers
/// and the cookies.
#[derive(Clone)]
pub struct Client {
    handler: Box<dyn Handler>,
    config: HandlerConfig,
}

impl Client {
    pub fn new(handler: impl Handler + 'static, config: ClientConfig) -> Result<Client, ClientError> {
        // Reject invalid default headers now rather than on every request.
        HeaderMap::from_pairs(config.default_headers.iter().map(|(name, value)| (name, value.clone())))?;

        let cookie_jar = match config.cookie_file {
            Some(path) => Some(CookieJar::open(path)?),
            None if config.cookies => Some(CookieJar::new()),
            None => None,
        };

        Ok(Client {
            handler: Box::new(handler),
            config: HandlerConfig {
                default_headers: config.default_headers,
                follow_redirects: config.follow_redirects,
                proxy: config.proxy,
                cookie_jar: cookie_jar.map(|jar| Arc::new(Mutex::new(jar))),
            },
        })
    }

    #[must_use]
    pub fn config(&self) -> &HandlerConfig {
        &self.config
    }

    /// The cookies kept by this client, if it keeps any.
    #[must_use]
    pub fn cookie_jar(&self) -> Option<&Arc<Mutex<CookieJar>>> {
        self.config.cookie_jar.as_ref()
    }

    pub fn send(&self, request: Request) -> anyhow::Result<Response> {
        let headers = merge_default_headers(request.headers(), &self.config.default_headers)?;
        let mut request = request.with_headers(headers);

        if let Some(jar) = &self.config.cookie_jar {
            if !request.has_header("Cookie") {
                let line = jar.lock().unwrap_or_else(PoisonError::into_inner).header_line(request.uri());
                if let Some(line) = line {
                    request = request.with_header("Cookie", line)?;
                }
            }
        }

        debug!(
            handler = self.handler.debug_identifier(),
            method = %request.method(),
            uri = %request.uri(),
            "dispatching request"
        );
        let uri = request.uri().clone();
        let response = self.handler.handle(request, &self.config)?;

        if let Some(jar) = &self.config.cookie_jar {
            let mut jar = jar.lock().unwrap_or_else(PoisonError::into_inner);
            if response.has_header("Set-Cookie") {
                jar.set_cookies_from(&uri, response.header("Set-Cookie"));
                jar.save()?;
            }
        }

        Ok(response)
    }

    pub fn get(&self, uri: impl ToUri) -> anyhow::Result<Response> {
        self.send(Request::new(Method::Get, uri)?)
    }

    pub fn post(&self, uri: impl ToUri, body: impl Into<Body>) -> anyhow::Result<Response> {
        self.send(Request::new(Method::Post, uri)?.with_body(body))
    }
}
