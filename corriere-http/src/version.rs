// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use std::{fmt, str::FromStr};

use tracing::debug;

use crate::Error;

/// The protocol version of a message, as carried in the start line
/// (`HTTP/1.1`) without the `HTTP/` prefix.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HttpVersion {
    Http09,
    Http10,
    #[default]
    Http11,
    Http2,
    Http3,
}

impl HttpVersion {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpVersion::Http09 => "0.9",
            HttpVersion::Http10 => "1.0",
            HttpVersion::Http11 => "1.1",
            HttpVersion::Http2 => "2",
            HttpVersion::Http3 => "3",
        }
    }
}

impl fmt::Display for HttpVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpVersion {
    type Err = Error;

    /// Parses the version number, i.e. `"1.1"`. The major-only forms of
    /// HTTP/2 and HTTP/3 may also be written as `"2.0"` and `"3.0"`.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "0.9" => Ok(HttpVersion::Http09),
            "1.0" => Ok(HttpVersion::Http10),
            "1.1" => Ok(HttpVersion::Http11),
            "2" | "2.0" => Ok(HttpVersion::Http2),
            "3" | "3.0" => Ok(HttpVersion::Http3),
            _ => {
                debug!(version = value, "rejected protocol version");
                Err(Error::invalid_argument("version", format!("unsupported protocol version {value:?}")))
            }
        }
    }
}
