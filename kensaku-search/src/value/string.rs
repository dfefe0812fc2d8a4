use serde::Serialize;
use std::fmt;

use super::{unescape, ValueParseError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StringSearchValue {
    pub value: String,
}

impl StringSearchValue {
    pub fn parse(s: &str) -> Result<Self, ValueParseError> {
        let value = unescape(s)?;
        if value.is_empty() {
            return Err(ValueParseError::Empty);
        }
        Ok(Self {
            value: value.into_owned(),
        })
    }
}

impl fmt::Display for StringSearchValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}
