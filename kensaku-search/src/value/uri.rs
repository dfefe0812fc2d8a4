use serde::Serialize;
use std::fmt;

use super::{unescape, ValueParseError};

/// URI values are compared verbatim; no normalisation is applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UriSearchValue {
    pub uri: String,
}

impl UriSearchValue {
    pub fn parse(s: &str) -> Result<Self, ValueParseError> {
        let uri = unescape(s)?;
        if uri.is_empty() {
            return Err(ValueParseError::Empty);
        }
        Ok(Self {
            uri: uri.into_owned(),
        })
    }
}

impl fmt::Display for UriSearchValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.uri)
    }
}
