// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

//! The boundaries around the message model: the [`Handler`] that executes
//! requests, the [`Client`] driving it, default headers, and cookies.

pub mod client;
pub mod config;
pub mod cookie;
pub mod error;
pub mod handler;
pub mod merge;
pub mod router;

pub use client::Client;
pub use config::ClientConfig;
pub use cookie::{Cookie, CookieJar};
pub use error::ClientError;
pub use handler::{Handler, HandlerConfig};
pub use merge::merge_default_headers;
pub use router::Router;
