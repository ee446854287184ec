// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use std::sync::Arc;

use tracing::debug;

use crate::{
    status::reason_phrase_for,
    Body,
    Error,
    HeaderMap,
    HttpMessage,
    HttpVersion,
    Message,
    Result,
    StatusCode,
};

#[derive(Clone, Debug)]
struct ResponseParts {
    message: Message,
    status: u16,
    reason_phrase: String,
}

/// A response, e.g. as produced by a handler.
#[derive(Clone, Debug)]
pub struct Response {
    parts: Arc<ResponseParts>,
}

impl Response {
    /// A response with the given status, its standard reason phrase, no
    /// headers and an empty body.
    pub fn new(status: impl Into<u16>) -> Result<Response> {
        Response::from_parts(status, HeaderMap::new(), None, HttpVersion::default(), None)
    }

    pub fn from_parts(
        status: impl Into<u16>,
        headers: HeaderMap,
        body: Option<Body>,
        version: HttpVersion,
        reason_phrase: Option<&str>,
    ) -> Result<Response> {
        let status = validate_status(status.into())?;
        let reason_phrase = resolve_reason_phrase(status, reason_phrase)?;

        Ok(Response {
            parts: Arc::new(ResponseParts {
                message: Message::new(headers, body, version),
                status,
                reason_phrase,
            }),
        })
    }

    #[must_use]
    pub fn status(&self) -> u16 {
        self.parts.status
    }

    /// The status as a [`StatusCode`], if it is a registered one.
    #[must_use]
    pub fn status_code(&self) -> Option<StatusCode> {
        StatusCode::try_from(self.parts.status).ok()
    }

    #[must_use]
    pub fn reason_phrase(&self) -> &str {
        &self.parts.reason_phrase
    }

    /// Sets the status. Without a reason phrase (or with an empty one), the
    /// standard phrase of the code is used, which is empty for unregistered
    /// codes.
    pub fn with_status(&self, status: impl Into<u16>, reason_phrase: Option<&str>) -> Result<Response> {
        let status = validate_status(status.into())?;
        let reason_phrase = resolve_reason_phrase(status, reason_phrase)?;

        if status == self.parts.status && reason_phrase == self.parts.reason_phrase {
            return Ok(self.clone());
        }

        Ok(self.derive(|parts| {
            parts.status = status;
            parts.reason_phrase = reason_phrase;
        }))
    }

    #[must_use]
    pub fn same_instance(&self, other: &Response) -> bool {
        Arc::ptr_eq(&self.parts, &other.parts)
    }

    fn derive(&self, f: impl FnOnce(&mut ResponseParts)) -> Response {
        let mut parts = ResponseParts::clone(&self.parts);
        f(&mut parts);
        Response { parts: Arc::new(parts) }
    }
}

impl Default for Response {
    /// `200 OK`
    fn default() -> Self {
        Response {
            parts: Arc::new(ResponseParts {
                message: Message::default(),
                status: StatusCode::Ok.as_u16(),
                reason_phrase: StatusCode::Ok.reason_phrase().to_owned(),
            }),
        }
    }
}

impl HttpMessage for Response {
    fn message(&self) -> &Message {
        &self.parts.message
    }

    fn with_message(&self, message: Message) -> Self {
        self.derive(|parts| parts.message = message)
    }
}

fn validate_status(status: u16) -> Result<u16> {
    if (100..=599).contains(&status) {
        return Ok(status);
    }

    debug!(status, "rejected status code");
    Err(Error::invalid_argument("status", format!("status code {status} must be between 100 and 599")))
}

fn resolve_reason_phrase(status: u16, reason_phrase: Option<&str>) -> Result<String> {
    match reason_phrase {
        Some(phrase) if !phrase.is_empty() => {
            if phrase.contains(['\r', '\n']) {
                debug!(phrase, "rejected reason phrase");
                return Err(Error::invalid_argument("reason_phrase", "the reason phrase must not contain line breaks"));
            }
            Ok(phrase.to_owned())
        }
        _ => Ok(reason_phrase_for(status).to_owned()),
    }
}
