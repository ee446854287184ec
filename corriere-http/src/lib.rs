// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

//! This crate contains the immutable HTTP message model: headers, URIs,
//! body streams, and the request and response values built on top of them.
//!
//! Every message type is a value. The `with_*` operations never change the
//! receiver, they return a derived message instead:
//!
//! ```
//! use corriere_http::{HttpMessage, HttpRequest, Method, Request};
//!
//! let request = Request::new(Method::Get, "http://example.com/search?q=rust").unwrap();
//! let json = request.with_header("Accept", "application/json").unwrap();
//!
//! assert_eq!(json.header_line("accept"), "application/json");
//! assert!(!request.has_header("Accept"));
//! assert_eq!(request.header_line("Host"), "example.com");
//! assert_eq!(request.request_target(), "/search?q=rust");
//! ```

pub mod abnf;
pub mod body;
pub mod error;
pub mod header_map;
pub mod header_value;
pub mod message;
pub mod method;
pub mod query;
pub mod request;
pub mod response;
pub mod serialize;
pub mod server_request;
pub mod status;
pub mod stream;
pub mod syntax;
pub mod upload;
pub mod uri;
pub mod version;

pub use body::*;
pub use error::*;
pub use header_map::*;
pub use header_value::*;
pub use message::*;
pub use method::*;
pub use request::*;
pub use response::*;
pub use server_request::*;
pub use status::*;
pub use stream::*;
pub use upload::*;
pub use uri::*;
pub use version::*;
