// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use indexmap::IndexMap;

use corriere_http::{
    HeaderMap,
    HeaderValue,
    Result,
};

/// Merges the default headers of a client into the headers of a request.
///
/// A header the request lacks is added. When both have the header, a single
/// default value gives way to the request, while a list of default values is
/// appended to the values of the request, skipping values already present.
pub fn merge_default_headers(headers: &HeaderMap, defaults: &IndexMap<String, HeaderValue>) -> Result<HeaderMap> {
    let mut merged = headers.clone();

    for (name, default) in defaults {
        if !merged.contains(name) {
            merged = merged.with_added(name, default.clone())?;
            continue;
        }

        let HeaderValue::Multi(default_values) = default else {
            continue;
        };

        let mut values = merged.get(name).to_vec();
        for value in default_values {
            if !values.contains(value) {
                values.push(value.clone());
            }
        }

        let stored_name = merged.stored_name(name).unwrap_or(name).to_owned();
        merged = merged.with_replaced(&stored_name, values)?;
    }

    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults() -> IndexMap<String, HeaderValue> {
        IndexMap::from([
            (String::from("User-Agent"), HeaderValue::from("corriere/0.1")),
            (String::from("Accept"), HeaderValue::from(["text/html", "application/json"])),
        ])
    }

    #[test]
    fn test_absent_headers_are_added() {
        let headers = HeaderMap::new();
        let merged = merge_default_headers(&headers, &defaults()).unwrap();
        assert_eq!(merged.get("user-agent"), ["corriere/0.1"]);
        assert_eq!(merged.get("accept"), ["text/html", "application/json"]);
    }

    #[test]
    fn test_request_wins_on_scalar() {
        let headers = HeaderMap::from_pairs([("user-agent", "custom")]).unwrap();
        let merged = merge_default_headers(&headers, &defaults()).unwrap();
        assert_eq!(merged.get("User-Agent"), ["custom"]);
        assert_eq!(merged.stored_name("User-Agent"), Some("user-agent"));
    }

    #[test]
    fn test_lists_concatenate_without_duplicates() {
        let headers = HeaderMap::from_pairs([("accept", "application/json"), ("accept", "image/png")]).unwrap();
        let merged = merge_default_headers(&headers, &defaults()).unwrap();
        assert_eq!(merged.get("Accept"), ["application/json", "image/png", "text/html"]);
        assert_eq!(merged.names().collect::<Vec<_>>(), ["accept", "User-Agent"]);
    }

    #[test]
    fn test_invalid_default_is_rejected() {
        let defaults = IndexMap::from([(String::from("Bad Name"), HeaderValue::from("x"))]);
        assert!(merge_default_headers(&HeaderMap::new(), &defaults).is_err());
    }
}
