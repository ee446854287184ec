// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

//! An in-process [`Handler`] that answers requests by calling registered
//! functions instead of going over the network.

use std::sync::Arc;

use indexmap::IndexMap;
use itertools::Itertools;
use tracing::debug;

use corriere_http::{
    HttpMessage,
    HttpRequest,
    Method,
    Request,
    Response,
    StatusCode,
};

use crate::{
    Handler,
    HandlerConfig,
};

pub type Route = Arc<dyn Fn(&Request) -> anyhow::Result<Response> + Send + Sync>;

#[derive(Clone, Default)]
pub struct Router {
    routes: IndexMap<String, IndexMap<Method, Route>>,
}

impl Router {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, path: &str, method: Method, route: F)
            where F: Fn(&Request) -> anyhow::Result<Response> + Send + Sync + 'static {
        self.routes.entry(path.to_owned())
            .or_default()
            .insert(method, Arc::new(route));
    }

    pub fn register_get<F>(&mut self, path: &str, route: F)
            where F: Fn(&Request) -> anyhow::Result<Response> + Send + Sync + 'static {
        self.register(path, Method::Get, route);
    }

    pub fn register_post<F>(&mut self, path: &str, route: F)
            where F: Fn(&Request) -> anyhow::Result<Response> + Send + Sync + 'static {
        self.register(path, Method::Post, route);
    }

    /// The capabilities of a registered path.
    fn options(methods: &IndexMap<Method, Route>) -> anyhow::Result<Response> {
        let allowed = methods.keys().map(Method::as_str).join(", ");
        Ok(Response::new(StatusCode::Ok)?
            .with_header("Allow", allowed)?
            .with_header("Content-Length", "0")?)
    }
}

impl Handler for Router {
    fn debug_identifier(&self) -> &str {
        "router"
    }

    fn handle(&self, request: Request, _config: &HandlerConfig) -> anyhow::Result<Response> {
        let path = match request.uri().path() {
            "" => "/",
            path => path,
        };

        let Some(methods) = self.routes.get(path) else {
            debug!(path, "no route registered");
            return Ok(Response::new(StatusCode::NotFound)?.with_body("Not Found"));
        };

        match methods.get(&request.method()) {
            Some(route) => route(&request),
            None if request.method() == Method::Options => Self::options(methods),
            None => {
                debug!(path, method = %request.method(), "method not allowed");
                let allowed = methods.keys().map(Method::as_str).join(", ");
                Ok(Response::new(StatusCode::MethodNotAllowed)?
                    .with_header("Allow", allowed)?
                    .with_body("Method Not Allowed"))
            }
        }
    }
}
