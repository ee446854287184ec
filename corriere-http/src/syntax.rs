// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

//! This module contains the HTTP field syntax rules that the [`HeaderMap`]
//! enforces on every name and value it stores.
//!
//! # References
//! * [RFC 7230 Section 3.2](https://www.rfc-editor.org/rfc/rfc7230.html#section-3.2)
//! * [RFC 9110 Section 5](https://www.rfc-editor.org/rfc/rfc9110.html#name-fields)
//!
//! [`HeaderMap`]: crate::HeaderMap

use crate::{
    abnf,
    SyntaxViolation,
};

/// Validate a field character. Note that in HTTP, UTF-8 is optional (US-ASCII),
/// and isn't used before validating the content.
///
/// ```text
/// field-vchar    = VCHAR / obs-text
/// ```
#[inline]
fn is_field_value_character(byte: u8) -> bool {
    abnf::is_visible_character(byte) || validate_obs_text(byte)
}

/// Is the given character a character that can occur (anywhere) in a token?
///
/// ```text
/// tchar          = "!" / "#" / "$" / "%" / "&" / "'" / "*"
///                / "+" / "-" / "." / "^" / "_" / "`" / "|" / "~"
///                / DIGIT / ALPHA
///                ; any VCHAR, except delimiters
/// ```
#[inline]
pub fn is_token_character(byte: u8) -> bool {
    validate_token_character(byte).is_ok()
}

/// Returns whether or not the character is whitespace according to the HTTP
/// specification. This is in effect just `U+0020 SPACE` and `U+0009 CHARACTER
/// TABULATION`.
///
/// # Definition
/// ```text
/// OWS            = *( SP / HTAB )
///                ; optional whitespace
/// ```
///
/// # References
/// * [RFC 9110 Section 5.6.3](https://www.rfc-editor.org/rfc/rfc9110.html#name-whitespace)
#[inline]
pub fn is_whitespace_character(character: char) -> bool {
    character == ' ' || character == '\t'
}

/// Strips the optional whitespace (`OWS`) surrounding a field value. Other
/// whitespace, like CR and LF, is left alone so the value check rejects it.
#[must_use]
pub fn trim_field_value(value: &str) -> &str {
    value.trim_matches(is_whitespace_character)
}

/// Validate obs-text.
/// ```text
/// obs-text       = %x80-FF
/// ```
#[inline]
fn validate_obs_text(byte: u8) -> bool {
    matches!(byte, 0x80..=0xFF)
}

/// Validate the content of a field value. The empty string is a valid field
/// value.
///
/// ```text
/// field-value    = *( field-content / obs-fold )
/// ```
pub fn validate_field_content(value: &[u8]) -> Result<(), SyntaxViolation> {
    if value.iter().all(|byte| is_field_value_character(*byte) || *byte == b' ' || *byte == b'\t') {
        Ok(())
    } else {
        Err(SyntaxViolation::FieldValueContainsInvalidCharacters)
    }
}

/// Validate a token, e.g. a field name.
///
/// ```text
/// token          = 1*tchar
/// ```
pub fn validate_token(value: &str) -> Result<(), SyntaxViolation> {
    if value.is_empty() {
        return Err(SyntaxViolation::TokenEmpty);
    }

    for character in value.bytes() {
        validate_token_character(character)?;
    }

    Ok(())
}

/// Validate a token character.
fn validate_token_character(character: u8) -> Result<(), SyntaxViolation> {
    match character {
        b' ' | b'\t' => Err(SyntaxViolation::TokenContainsWhitespace),

        b'!' | b'#' | b'$' | b'%' | b'&' | b'\'' | b'*' | b'+' | b'-' | b'.' |
        b'^' | b'_' | b'`' | b'|' | b'~' => Ok(()),

        b'0'..=b'9' => Ok(()),
        b'A'..=b'Z' => Ok(()),
        b'a'..=b'z' => Ok(()),

        b'"' | b'(' | b')' | b',' | b'/' | b':' | b';' | b'<' | b'=' | b'>' |
        b'?' | b'@' | b'[' | b'\\' | b']' | b'{' | b'}' => Err(SyntaxViolation::TokenContainsDelimiter),

        _ => Err(SyntaxViolation::TokenContainsNonVisibleAscii),
    }
}
