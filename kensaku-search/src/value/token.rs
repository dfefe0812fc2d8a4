use serde::Serialize;
use std::fmt;

use super::{split_unescaped, unescape, ValueParseError, TOKEN_SEPARATOR};

/// Token value.
///
/// - `code` -> any system
/// - `system|code` -> both must match
/// - `|code` -> code without a system (`system == Some("")`)
/// - `system|` -> any code in the system
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenSearchValue {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl TokenSearchValue {
    pub fn parse(s: &str) -> Result<Self, ValueParseError> {
        let parts = split_unescaped(s, TOKEN_SEPARATOR);
        match parts.as_slice() {
            [code] => {
                let code = unescape(code)?;
                if code.is_empty() {
                    return Err(ValueParseError::Empty);
                }
                Ok(Self {
                    system: None,
                    code: Some(code.into_owned()),
                })
            }
            [system, code] => {
                let system = unescape(system)?.into_owned();
                let code = unescape(code)?;
                if system.is_empty() && code.is_empty() {
                    return Err(ValueParseError::Token(s.to_string()));
                }
                Ok(Self {
                    system: Some(system),
                    code: (!code.is_empty()).then(|| code.into_owned()),
                })
            }
            _ => Err(ValueParseError::Token(s.to_string())),
        }
    }
}

impl fmt::Display for TokenSearchValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.system, &self.code) {
            (Some(system), code) => write!(f, "{}|{}", system, code.as_deref().unwrap_or("")),
            (None, Some(code)) => f.write_str(code),
            (None, None) => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_only() {
        let t = TokenSearchValue::parse("4548-4").unwrap();
        assert_eq!(t.system, None);
        assert_eq!(t.code.as_deref(), Some("4548-4"));
    }

    #[test]
    fn test_system_and_code() {
        let t = TokenSearchValue::parse("http://loinc.org|4548-4").unwrap();
        assert_eq!(t.system.as_deref(), Some("http://loinc.org"));
        assert_eq!(t.code.as_deref(), Some("4548-4"));
        assert_eq!(t.to_string(), "http://loinc.org|4548-4");
    }

    #[test]
    fn test_explicit_no_system() {
        let t = TokenSearchValue::parse("|final").unwrap();
        assert_eq!(t.system.as_deref(), Some(""));
        assert_eq!(t.code.as_deref(), Some("final"));
    }

    #[test]
    fn test_system_only() {
        let t = TokenSearchValue::parse("http://loinc.org|").unwrap();
        assert_eq!(t.system.as_deref(), Some("http://loinc.org"));
        assert_eq!(t.code, None);
    }

    #[test]
    fn test_escaped_separator_stays_in_code() {
        let t = TokenSearchValue::parse("a\\|b").unwrap();
        assert_eq!(t.system, None);
        assert_eq!(t.code.as_deref(), Some("a|b"));
    }

    #[test]
    fn test_invalid_tokens() {
        assert!(matches!(TokenSearchValue::parse("|"), Err(ValueParseError::Token(_))));
        assert!(matches!(TokenSearchValue::parse("a|b|c"), Err(ValueParseError::Token(_))));
        assert_eq!(TokenSearchValue::parse(""), Err(ValueParseError::Empty));
    }
}
