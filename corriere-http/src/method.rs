// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use std::fmt;

use phf::phf_map;
use tracing::debug;

use crate::{
    Error,
    Result,
};

/// The request methods a [`Request`](crate::Request) can carry.
///
/// # References
/// * [RFC 9110 - Section 9. Methods](https://www.rfc-editor.org/rfc/rfc9110.html#section-9)
/// * [RFC 5789 - PATCH Method for HTTP](https://www.rfc-editor.org/rfc/rfc5789.html)
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Method {
    Connect,
    Delete,
    Get,
    Head,
    Options,
    Patch,
    Post,
    Put,
    Trace,
}

impl Method {
    /// Get the method in string form.
    ///
    /// # Notes
    /// Method names are case-sensitive, as per
    /// [RFC 9110 - Section 9.1](https://www.rfc-editor.org/rfc/rfc9110.html#section-9.1-5):
    /// > The method token is case-sensitive because it might be used as a
    /// > gateway to object-based systems with case-sensitive method names. By
    /// > convention, standardized methods are defined in all-uppercase US-ASCII
    /// > letters.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connect => "CONNECT",
            Self::Delete => "DELETE",
            Self::Get => "GET",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
            Self::Patch => "PATCH",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Trace => "TRACE",
        }
    }

    /// Parses the method after uppercasing the input. Methods outside the
    /// supported set are a [`Error::TypeMismatch`].
    pub fn parse(value: &str) -> Result<Method> {
        let uppercase = value.to_ascii_uppercase();
        match METHOD_MAP.get(uppercase.as_str()) {
            Some(method) => Ok(*method),
            None => {
                debug!(method = value, "rejected unknown method");
                Err(Error::type_mismatch("method", format!("unknown method {value:?}")))
            }
        }
    }
}

static METHOD_MAP: phf::Map<&'static str, Method> = phf_map!(
    "CONNECT" => Method::Connect,
    "DELETE" => Method::Delete,
    "GET" => Method::Get,
    "HEAD" => Method::Head,
    "OPTIONS" => Method::Options,
    "PATCH" => Method::Patch,
    "POST" => Method::Post,
    "PUT" => Method::Put,
    "TRACE" => Method::Trace,
);

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Method {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        Method::parse(value)
    }
}

/// Anything a method can be taken from: the enumerated [`Method`] itself, or
/// its textual form.
pub trait ToMethod {
    fn to_method(self) -> Result<Method>;
}

impl ToMethod for Method {
    fn to_method(self) -> Result<Method> {
        Ok(self)
    }
}

impl ToMethod for &str {
    fn to_method(self) -> Result<Method> {
        Method::parse(self)
    }
}

impl ToMethod for String {
    fn to_method(self) -> Result<Method> {
        Method::parse(&self)
    }
}

impl ToMethod for &String {
    fn to_method(self) -> Result<Method> {
        Method::parse(self)
    }
}
