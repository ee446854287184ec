// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use std::path::{
    Path,
    PathBuf,
};

use indexmap::IndexMap;
use serde::Deserialize;

use corriere_http::HeaderValue;

use crate::ClientError;

/// The settings of a [`Client`](crate::Client), usually read from a TOML
/// file:
///
/// ```toml
/// follow_redirects = false
/// proxy = "http://proxy.internal:3128"
/// cookie_file = "cookies.json"
///
/// [default_headers]
/// User-Agent = "corriere/0.1"
/// Accept = ["text/html", "application/json"]
/// ```
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    #[serde(deserialize_with = "deserialize_headers")]
    pub default_headers: IndexMap<String, HeaderValue>,

    pub follow_redirects: bool,

    pub proxy: Option<String>,

    /// Keep cookies between requests, in memory.
    pub cookies: bool,

    /// Keep cookies between requests, and persist them to this file. Implies
    /// `cookies`.
    pub cookie_file: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            default_headers: IndexMap::new(),
            follow_redirects: true,
            proxy: None,
            cookies: false,
            cookie_file: None,
        }
    }
}

impl ClientConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ClientError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|source| ClientError::ReadFile { path: path.to_path_buf(), source })?;

        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ClientError> {
        Ok(toml::from_str(content)?)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawHeaderValue {
    Scalar(String),
    Multi(Vec<String>),
}

fn deserialize_headers<'de, D>(deserializer: D) -> Result<IndexMap<String, HeaderValue>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = IndexMap::<String, RawHeaderValue>::deserialize(deserializer)?;

    Ok(raw.into_iter()
        .map(|(name, value)| {
            let value = match value {
                RawHeaderValue::Scalar(value) => HeaderValue::Scalar(value),
                RawHeaderValue::Multi(values) => HeaderValue::Multi(values),
            };
            (name, value)
        })
        .collect())
}
