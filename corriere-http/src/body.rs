// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use std::sync::{
    Arc,
    Mutex,
    MutexGuard,
    PoisonError,
};

use crate::Stream;

/// The body of a message: a [`Stream`] shared between a message and every
/// message derived from it.
///
/// The stream has a single cursor, so callers reading from the same body
/// through different messages observe each other's reads.
#[derive(Clone, Debug, Default)]
pub struct Body(Arc<Mutex<Stream>>);

impl Body {
    #[must_use]
    pub fn new(stream: Stream) -> Body {
        Body(Arc::new(Mutex::new(stream)))
    }

    /// Locks the stream for exclusive use.
    pub fn lock(&self) -> MutexGuard<'_, Stream> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether both handles refer to the same stream.
    #[must_use]
    pub fn ptr_eq(&self, other: &Body) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl From<Stream> for Body {
    fn from(stream: Stream) -> Self {
        Body::new(stream)
    }
}

impl From<&str> for Body {
    fn from(text: &str) -> Self {
        Body::new(Stream::from_text(text))
    }
}

impl From<String> for Body {
    fn from(text: String) -> Self {
        Body::new(Stream::from(text))
    }
}

impl From<Vec<u8>> for Body {
    fn from(bytes: Vec<u8>) -> Self {
        Body::new(Stream::from_bytes(bytes))
    }
}
