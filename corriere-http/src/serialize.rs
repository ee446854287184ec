// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

//! Renders messages in the HTTP/1.1 textual form, for handlers that speak
//! HTTP/1.x and for diagnostics.

use crate::{
    request::host_header,
    HttpMessage,
    HttpRequest,
    Request,
    Response,
    Result,
};

impl Request {
    /// `GET /path HTTP/1.1`, followed by the headers and the body.
    pub fn to_http_bytes(&self) -> Result<Vec<u8>> {
        let mut head = format!("{} {}", self.method(), self.request_target()).trim().to_owned();
        head.push_str(" HTTP/");
        head.push_str(self.protocol_version().as_str());

        if !self.has_header("Host") {
            if let Some(host) = host_header(self.uri())? {
                head.push_str("\r\nHost: ");
                head.push_str(&host);
            }
        }

        serialize(self, head)
    }
}

impl Response {
    /// `HTTP/1.1 200 OK`, followed by the headers and the body.
    pub fn to_http_bytes(&self) -> Result<Vec<u8>> {
        let head = format!("HTTP/{} {} {}", self.protocol_version(), self.status(), self.reason_phrase());
        serialize(self, head.trim_end().to_owned())
    }
}

fn serialize(message: &impl HttpMessage, mut head: String) -> Result<Vec<u8>> {
    for (name, values) in message.headers().iter() {
        // Set-Cookie can't be folded into a single line.
        if name.eq_ignore_ascii_case("Set-Cookie") {
            for value in values {
                head.push_str(&format!("\r\n{name}: {value}"));
            }
        } else {
            head.push_str(&format!("\r\n{name}: {}", values.join(", ")));
        }
    }
    head.push_str("\r\n\r\n");

    let mut bytes = head.into_bytes();
    bytes.extend(message.body().lock().read_all()?);
    Ok(bytes)
}
