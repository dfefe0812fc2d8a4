//! Typed search values and the parsers that produce them from query-string
//! literals.
//!
//! Search values may escape separator characters with `\`:
//! - `\,` (comma in values)
//! - `\|` (token/quantity system separator)
//! - `\$` (composite separator)
//! - `\\` (literal backslash)
//!
//! Splitting keeps escape sequences intact; each value parser unescapes the
//! parts it keeps.

pub mod date;
pub mod number;
pub mod quantity;
pub mod reference;
pub mod string;
pub mod token;
pub mod uri;

use serde::Serialize;
use std::borrow::Cow;
use std::fmt;
use thiserror::Error;

pub use date::{DateTimePrecision, DateTimeSearchValue};
pub use number::NumberSearchValue;
pub use quantity::QuantitySearchValue;
pub use reference::{
    DefaultReferenceParser, ReferenceKind, ReferenceSearchValue, ReferenceSearchValueParser,
};
pub use string::StringSearchValue;
pub use token::TokenSearchValue;
pub use uri::UriSearchValue;

pub const OR_SEPARATOR: char = ',';
pub const COMPOSITE_SEPARATOR: char = '$';
pub const TOKEN_SEPARATOR: char = '|';

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValueParseError {
    #[error("value must not be empty")]
    Empty,

    #[error("'{0}' is not a valid date/time")]
    Date(String),

    #[error("'{0}' is not a valid number")]
    Number(String),

    #[error("'{0}' is not a valid quantity")]
    Quantity(String),

    #[error("'{0}' is not a valid token")]
    Token(String),

    #[error("'{0}' is not a valid reference")]
    Reference(String),

    #[error("invalid escape sequence in '{0}'")]
    Escape(String),
}

/// A parsed, comparable search value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SearchValue {
    DateTime(DateTimeSearchValue),
    Number(NumberSearchValue),
    Quantity(QuantitySearchValue),
    Reference(ReferenceSearchValue),
    String(StringSearchValue),
    Token(TokenSearchValue),
    Uri(UriSearchValue),
}

impl fmt::Display for SearchValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchValue::DateTime(v) => v.fmt(f),
            SearchValue::Number(v) => v.fmt(f),
            SearchValue::Quantity(v) => v.fmt(f),
            SearchValue::Reference(v) => v.fmt(f),
            SearchValue::String(v) => v.fmt(f),
            SearchValue::Token(v) => v.fmt(f),
            SearchValue::Uri(v) => v.fmt(f),
        }
    }
}

/// Split `input` on `sep`, skipping separators preceded by a backslash.
pub fn split_unescaped(input: &str, sep: char) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0usize;
    let mut i = 0usize;
    let bytes = input.as_bytes();
    while i < bytes.len() {
        match bytes[i] as char {
            '\\' => {
                i += 1;
                if i < bytes.len() {
                    i += 1;
                }
            }
            c if c == sep => {
                out.push(&input[start..i]);
                i += 1;
                start = i;
            }
            _ => i += 1,
        }
    }
    out.push(&input[start..]);
    out
}

/// Resolve `\\`, `\,`, `\$` and `\|`. Any other escape is rejected.
pub fn unescape(input: &str) -> Result<Cow<'_, str>, ValueParseError> {
    if !input.contains('\\') {
        return Ok(Cow::Borrowed(input));
    }

    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some(next @ ('\\' | ',' | '$' | '|')) => out.push(next),
            _ => return Err(ValueParseError::Escape(input.to_string())),
        }
    }
    Ok(Cow::Owned(out))
}
