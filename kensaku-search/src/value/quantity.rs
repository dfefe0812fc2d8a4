use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;

use super::number::parse_decimal;
use super::{split_unescaped, unescape, ValueParseError, TOKEN_SEPARATOR};

/// `5.4`, `5.4|http://unitsofmeasure.org|mg`, `5.4||mg`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuantitySearchValue {
    pub value: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl QuantitySearchValue {
    pub fn parse(s: &str) -> Result<Self, ValueParseError> {
        let invalid = || ValueParseError::Quantity(s.to_string());

        let parts = split_unescaped(s, TOKEN_SEPARATOR);
        let (number, system, code) = match parts.as_slice() {
            [number] => (*number, None, None),
            [number, system, code] => (*number, non_empty(system)?, non_empty(code)?),
            _ => return Err(invalid()),
        };

        let value = parse_decimal(number).ok_or_else(invalid)?;
        Ok(Self {
            value,
            system,
            code,
        })
    }
}

fn non_empty(part: &str) -> Result<Option<String>, ValueParseError> {
    let part = unescape(part)?;
    Ok((!part.is_empty()).then(|| part.into_owned()))
}

impl fmt::Display for QuantitySearchValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)?;
        if self.system.is_some() || self.code.is_some() {
            write!(
                f,
                "|{}|{}",
                self.system.as_deref().unwrap_or(""),
                self.code.as_deref().unwrap_or("")
            )?;
        }
        Ok(())
    }
}
