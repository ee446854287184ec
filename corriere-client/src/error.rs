// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use std::{
    io,
    path::PathBuf,
};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("failed to read {path}: {source}")]
    ReadFile {
        path: PathBuf,
        source: io::Error,
    },

    #[error("failed to write {path}: {source}")]
    WriteFile {
        path: PathBuf,
        source: io::Error,
    },

    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    #[error("invalid cookie file: {0}")]
    CookieFile(#[from] serde_json::Error),

    #[error(transparent)]
    Http(#[from] corriere_http::Error),
}
