// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use std::sync::{
    Arc,
    Mutex,
};

use dyn_clone::DynClone;
use indexmap::IndexMap;

use corriere_http::{
    HeaderValue,
    Request,
    Response,
};

use crate::CookieJar;

/// The settings a [`Handler`] receives with every request.
#[derive(Clone, Debug, Default)]
pub struct HandlerConfig {
    /// Headers sent with every request. These are already merged into the
    /// request by the time a handler sees it.
    pub default_headers: IndexMap<String, HeaderValue>,

    pub follow_redirects: bool,

    /// The proxy to send requests through, e.g. `http://proxy:3128`.
    pub proxy: Option<String>,

    pub cookie_jar: Option<Arc<Mutex<CookieJar>>>,
}

/// A `Handler` executes a request, e.g. by sending it over the network, and
/// produces the response.
///
/// `Handler` must be clone'able so that a client can be cloned and used from
/// multiple threads.
pub trait Handler: DynClone + Send + Sync {
    /// The name of the handler to identify the source of errors.
    fn debug_identifier(&self) -> &str;

    fn handle(&self, request: Request, config: &HandlerConfig) -> anyhow::Result<Response>;
}

dyn_clone::clone_trait_object!(Handler);
