// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

//! Helpers for `application/x-www-form-urlencoded` style query strings.

use std::borrow::Cow;

/// Splits the query into decoded pairs, keeping duplicates in order. A `+`
/// decodes to a space. A pair without `=` has an empty value.
#[must_use]
pub fn parse_query(query: &str) -> Vec<(String, String)> {
    query.split('&')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let (name, value) = part.split_once('=').unwrap_or((part, ""));
            (decode(name), decode(value))
        })
        .collect()
}

/// Joins the pairs with `&`, percent-encoding names and values per RFC 3986.
#[must_use]
pub fn build_query<'a, I>(pairs: I) -> String
        where I: IntoIterator<Item = (&'a str, &'a str)> {
    pairs.into_iter()
        .map(|(name, value)| format!("{}={}", urlencoding::encode(name), urlencoding::encode(value)))
        .collect::<Vec<_>>()
        .join("&")
}

fn decode(input: &str) -> String {
    let input = if input.contains('+') {
        Cow::Owned(input.replace('+', " "))
    } else {
        Cow::Borrowed(input)
    };

    String::from_utf8_lossy(&urlencoding::decode_binary(input.as_bytes())).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("", &[])]
    #[case("a=1", &[("a", "1")])]
    #[case("a=1&&b", &[("a", "1"), ("b", "")])]
    #[case("q=hello+world&q=%C3%A9", &[("q", "hello world"), ("q", "\u{e9}")])]
    #[case("x=a%3Db", &[("x", "a=b")])]
    fn test_parse_query(#[case] input: &str, #[case] expected: &[(&str, &str)]) {
        let expected: Vec<(String, String)> = expected.iter()
            .map(|(name, value)| ((*name).to_owned(), (*value).to_owned()))
            .collect();
        assert_eq!(parse_query(input), expected);
    }

    #[test]
    fn test_build_query() {
        assert_eq!(build_query([("a b", "c&d"), ("e", "")]), "a%20b=c%26d&e=");
        assert_eq!(build_query(std::iter::empty()), "");
    }
}
