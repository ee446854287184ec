// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

//! The header collection shared by every message.
//!
//! Field names are case-insensitive ([RFC 9110 Section 5.1](https://www.rfc-editor.org/rfc/rfc9110.html#section-5.1)),
//! but the casing the caller supplied is kept for display. Each distinct name
//! keeps the position where it was first seen.

use std::sync::Arc;

use indexmap::IndexMap;
use tracing::debug;
use unicase::UniCase;

use crate::{
    syntax,
    Error,
    HeaderValue,
    Result,
};

#[derive(Clone, Debug, PartialEq, Eq)]
struct HeaderEntry {
    /// The name in the casing that was most recently stored.
    name: String,
    values: Vec<String>,
}

type Entries = IndexMap<UniCase<String>, HeaderEntry>;

/// An immutable, ordered, case-insensitive multimap of header fields.
///
/// Cloning is cheap: every clone shares the same storage, and the `with_*`
/// operations build a new storage instead of touching the shared one.
#[derive(Clone, Debug, Default)]
pub struct HeaderMap {
    entries: Arc<Entries>,
}

impl HeaderMap {
    #[must_use]
    pub fn new() -> HeaderMap {
        HeaderMap::default()
    }

    /// Builds a map as if [`HeaderMap::with_added`] were invoked for every
    /// pair, in order.
    pub fn from_pairs<I, N, V>(pairs: I) -> Result<HeaderMap>
            where I: IntoIterator<Item = (N, V)>,
                  N: AsRef<str>,
                  V: Into<HeaderValue> {
        let mut entries = Entries::new();
        for (name, value) in pairs {
            let name = name.as_ref();
            let values = normalize(name, value.into())?;
            append(&mut entries, name, values);
        }

        Ok(HeaderMap { entries: Arc::new(entries) })
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(&key(name))
    }

    /// Returns the values of the header, or an empty slice if the header isn't
    /// present.
    #[must_use]
    pub fn get(&self, name: &str) -> &[String] {
        match self.entries.get(&key(name)) {
            Some(entry) => &entry.values,
            None => &[],
        }
    }

    /// Returns the values of the header, joined by a comma and a space.
    #[must_use]
    pub fn get_line(&self, name: &str) -> String {
        self.get(name).join(", ")
    }

    /// Returns the name as it is stored, in its original casing.
    #[must_use]
    pub fn stored_name(&self, name: &str) -> Option<&str> {
        self.entries.get(&key(name)).map(|entry| entry.name.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over the headers in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries.values().map(|entry| (entry.name.as_str(), entry.values.as_slice()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.values().map(|entry| entry.name.as_str())
    }

    /// Whether or not both maps share the same storage.
    #[must_use]
    pub fn same_instance(&self, other: &HeaderMap) -> bool {
        Arc::ptr_eq(&self.entries, &other.entries)
    }

    /// Returns a map in which the header is replaced by the given values. The
    /// header keeps its position, but takes over the casing of `name`.
    pub fn with_replaced(&self, name: &str, value: impl Into<HeaderValue>) -> Result<HeaderMap> {
        let values = normalize(name, value.into())?;
        let key = key(name);

        if let Some(existing) = self.entries.get(&key) {
            if existing.name == name && existing.values == values {
                return Ok(self.clone());
            }
        }

        Ok(self.derive(|entries| {
            entries.insert(key, HeaderEntry { name: name.to_owned(), values });
        }))
    }

    /// Returns a map in which the values are appended to the header. An
    /// existing header keeps the casing it was stored with.
    pub fn with_added(&self, name: &str, value: impl Into<HeaderValue>) -> Result<HeaderMap> {
        let values = normalize(name, value.into())?;
        Ok(self.derive(|entries| append(entries, name, values)))
    }

    /// Returns a map without the header. When the header isn't present, the
    /// same map is returned.
    #[must_use]
    pub fn with_removed(&self, name: &str) -> HeaderMap {
        let key = key(name);
        if !self.entries.contains_key(&key) {
            return self.clone();
        }

        self.derive(|entries| {
            entries.shift_remove(&key);
        })
    }

    /// Places the header in front of all others, replacing its values. An
    /// existing header keeps its stored casing, otherwise `name` is used.
    ///
    /// The values must already be valid.
    pub(crate) fn with_first(&self, name: &str, values: Vec<String>) -> HeaderMap {
        let key = key(name);
        let name = self.stored_name(name).unwrap_or(name).to_owned();

        let mut entries = Entries::with_capacity(self.entries.len() + 1);
        entries.insert(key.clone(), HeaderEntry { name, values });
        for (existing_key, entry) in self.entries.iter() {
            if *existing_key != key {
                entries.insert(existing_key.clone(), entry.clone());
            }
        }

        HeaderMap { entries: Arc::new(entries) }
    }

    fn derive(&self, f: impl FnOnce(&mut Entries)) -> HeaderMap {
        let mut entries = Entries::clone(&self.entries);
        f(&mut entries);
        HeaderMap { entries: Arc::new(entries) }
    }
}

impl PartialEq for HeaderMap {
    /// Two maps are equal when they hold the same headers in the same order.
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.entries.values().eq(other.entries.values())
    }
}

impl Eq for HeaderMap {}

#[inline]
fn key(name: &str) -> UniCase<String> {
    UniCase::new(name.to_owned())
}

fn append(entries: &mut Entries, name: &str, values: Vec<String>) {
    match entries.entry(key(name)) {
        indexmap::map::Entry::Occupied(mut entry) => entry.get_mut().values.extend(values),
        indexmap::map::Entry::Vacant(entry) => {
            entry.insert(HeaderEntry { name: name.to_owned(), values });
        }
    }
}

/// Validates the name and the values, and returns the values stripped of
/// their surrounding whitespace.
fn normalize(name: &str, value: HeaderValue) -> Result<Vec<String>> {
    if let Err(reason) = syntax::validate_token(name) {
        debug!(name, ?reason, "rejected header name");
        return Err(Error::MalformedHeader {
            argument: "name",
            value: name.to_owned(),
            index: None,
            reason,
        });
    }

    let is_list = matches!(value, HeaderValue::Multi(..));
    if value.is_empty() {
        debug!(name, "rejected empty header value list");
        return Err(Error::invalid_argument("value", format!("header {name} needs at least one value")));
    }

    value.into_vec()
        .into_iter()
        .enumerate()
        .map(|(index, value)| {
            let trimmed = syntax::trim_field_value(&value);
            match syntax::validate_field_content(trimmed.as_bytes()) {
                Ok(()) => Ok(trimmed.to_owned()),
                Err(reason) => {
                    debug!(name, index, ?reason, "rejected header value");
                    Err(Error::MalformedHeader {
                        argument: "value",
                        value: value.clone(),
                        index: is_list.then_some(index),
                        reason,
                    })
                }
            }
        })
        .collect()
}
