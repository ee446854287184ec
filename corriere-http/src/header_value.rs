// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

/// The value(s) handed to a header operation. A single string and a list of
/// strings are both accepted, and normalized to a list internally.
///
/// An empty string is a valid header value; an empty list is not.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum HeaderValue {
    Scalar(String),
    Multi(Vec<String>),
}

impl HeaderValue {
    #[must_use]
    pub fn into_vec(self) -> Vec<String> {
        match self {
            Self::Scalar(value) => vec![value],
            Self::Multi(values) => values,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Scalar(..) => 1,
            Self::Multi(values) => values.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<&str> for HeaderValue {
    fn from(value: &str) -> Self {
        Self::Scalar(value.to_owned())
    }
}

impl From<String> for HeaderValue {
    fn from(value: String) -> Self {
        Self::Scalar(value)
    }
}

impl From<&String> for HeaderValue {
    fn from(value: &String) -> Self {
        Self::Scalar(value.clone())
    }
}

impl From<Vec<String>> for HeaderValue {
    fn from(values: Vec<String>) -> Self {
        Self::Multi(values)
    }
}

impl From<Vec<&str>> for HeaderValue {
    fn from(values: Vec<&str>) -> Self {
        Self::Multi(values.into_iter().map(str::to_owned).collect())
    }
}

impl From<&[&str]> for HeaderValue {
    fn from(values: &[&str]) -> Self {
        Self::Multi(values.iter().map(|value| (*value).to_owned()).collect())
    }
}

impl From<&[String]> for HeaderValue {
    fn from(values: &[String]) -> Self {
        Self::Multi(values.to_vec())
    }
}

impl<const N: usize> From<[&str; N]> for HeaderValue {
    fn from(values: [&str; N]) -> Self {
        Self::Multi(values.into_iter().map(str::to_owned).collect())
    }
}
