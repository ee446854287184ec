// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use std::io;

use strum_macros::AsRefStr;
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// An error raised by a constructor or a `with_*` operation. Validation
/// always happens before anything is derived, so an `Err` never comes with a
/// partially updated value.
#[derive(Debug, Error)]
pub enum Error {
    /// The argument has the wrong kind, e.g. a non-numeric port or an unknown
    /// method.
    #[error("type mismatch for {argument}: {message}")]
    TypeMismatch {
        argument: &'static str,
        message: String,
    },

    /// A header name or value violates the field grammar.
    #[error("malformed header {argument} {value:?}{}: {reason:?}", describe_index(.index))]
    MalformedHeader {
        /// Either `"name"` or `"value"`.
        argument: &'static str,
        value: String,

        /// The position of the offending value when multiple were supplied.
        index: Option<usize>,
        reason: SyntaxViolation,
    },

    /// The URI text couldn't be split into its components.
    #[error("unable to parse URI {0:?}")]
    MalformedUri(String),

    /// The argument has the right kind, but violates an invariant.
    #[error("invalid argument {argument}: {message}")]
    InvalidArgument {
        argument: &'static str,
        message: String,
    },

    /// The operation needs a resource that is detached, closed, moved or
    /// lacks the capability.
    #[error("unreachable resource: {0}")]
    UnreachableResource(String),

    #[error(transparent)]
    Runtime(#[from] io::Error),
}

impl Error {
    pub(crate) fn type_mismatch(argument: &'static str, message: impl Into<String>) -> Self {
        Self::TypeMismatch { argument, message: message.into() }
    }

    pub(crate) fn invalid_argument(argument: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidArgument { argument, message: message.into() }
    }

    pub(crate) fn unreachable(message: impl Into<String>) -> Self {
        Self::UnreachableResource(message.into())
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::TypeMismatch { .. } => ErrorKind::TypeMismatch,
            Self::MalformedHeader { .. } => ErrorKind::MalformedHeader,
            Self::MalformedUri(..) => ErrorKind::MalformedUri,
            Self::InvalidArgument { .. } => ErrorKind::InvalidArgument,
            Self::UnreachableResource(..) => ErrorKind::UnreachableResource,
            Self::Runtime(..) => ErrorKind::Runtime,
        }
    }
}

fn describe_index(index: &Option<usize>) -> String {
    match index {
        Some(index) => format!(" at index {index}"),
        None => String::new(),
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, AsRefStr)]
pub enum ErrorKind {
    TypeMismatch,
    MalformedHeader,
    MalformedUri,
    InvalidArgument,
    UnreachableResource,
    Runtime,
}

/// The rule of the field grammar that was broken.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, AsRefStr)]
pub enum SyntaxViolation {
    TokenContainsDelimiter,
    TokenContainsNonVisibleAscii,
    TokenContainsWhitespace,
    TokenEmpty,

    FieldValueContainsInvalidCharacters,
}
