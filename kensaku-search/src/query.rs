use kensaku_core::{Result, SearchError};
use serde::{Deserialize, Serialize};

use crate::expression::Expression;
use crate::expression_parser::ExpressionParser;

/// Parameters that shape the result set rather than filter it
pub const RESULT_PARAMETERS: &[&str] = &[
    "_count",
    "_offset",
    "_sort",
    "_include",
    "_revinclude",
    "_summary",
    "_elements",
    "_total",
    "_contained",
    "_containedType",
    "_format",
    "_pretty",
];

/// How unknown or unsupported parameters are treated.
/// See: http://hl7.org/fhir/search.html#errors
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchHandling {
    /// Skip them and report a warning
    #[default]
    Lenient,
    /// Fail the whole search
    Strict,
}

impl SearchHandling {
    /// Read `handling=` from a `Prefer` header value, falling back to `default`.
    pub fn from_prefer_header(prefer: Option<&str>, default: SearchHandling) -> SearchHandling {
        let Some(prefer) = prefer else {
            return default;
        };
        let prefer = prefer.to_ascii_lowercase();
        if prefer.contains("handling=strict") {
            SearchHandling::Strict
        } else if prefer.contains("handling=lenient") {
            SearchHandling::Lenient
        } else {
            default
        }
    }
}

/// FHIR search query parsed from an HTTP query string
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchQuery {
    /// Filtering parameters, in request order
    pub parameters: Vec<(String, String)>,
    /// Result-shaping parameters, uninterpreted
    pub result_parameters: Vec<(String, String)>,
}

/// A query compiled against one resource type
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledSearch {
    /// `None` when no filtering parameter survived
    pub expression: Option<Expression>,
    /// Parameters skipped in lenient mode: key, value, reason
    pub unsupported: Vec<(String, String, SearchError)>,
}

impl SearchQuery {
    /// Parse an `application/x-www-form-urlencoded` query string.
    /// `+` decodes to a space; invalid UTF-8 is replaced with U+FFFD.
    pub fn parse(query_string: &str) -> Self {
        Self::from_pairs(url::form_urlencoded::parse(query_string.as_bytes()).into_owned())
    }

    /// Build from already decoded pairs. Pairs with an empty value are dropped.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut query = Self::default();
        for (key, value) in pairs {
            let (key, value) = (key.into(), value.into());
            if key.is_empty() || value.is_empty() {
                continue;
            }
            if RESULT_PARAMETERS.contains(&key.as_str()) {
                query.result_parameters.push((key, value));
            } else {
                query.parameters.push((key, value));
            }
        }
        query
    }

    /// First value of a result-shaping parameter
    pub fn result_parameter(&self, name: &str) -> Option<&str> {
        self.result_parameters
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Compile every filtering parameter and AND the results.
    ///
    /// Unsupported parameters fail the search in strict mode and are
    /// collected in `unsupported` in lenient mode. Any other error is fatal.
    pub fn compile(
        &self,
        parser: &ExpressionParser,
        resource_type: &str,
        handling: SearchHandling,
    ) -> Result<CompiledSearch> {
        let mut expressions = Vec::with_capacity(self.parameters.len());
        let mut unsupported = Vec::new();

        for (key, value) in &self.parameters {
            match parser.parse(resource_type, key, value) {
                Ok(expression) => expressions.push(expression),
                Err(e) if e.is_not_supported() && handling == SearchHandling::Lenient => {
                    tracing::debug!("Ignoring search parameter {}={}: {}", key, value, e);
                    unsupported.push((key.clone(), value.clone(), e));
                }
                Err(e) => return Err(e),
            }
        }

        let expression = match expressions.len() {
            0 => None,
            1 => expressions.pop(),
            _ => Some(Expression::and(expressions)),
        };

        Ok(CompiledSearch {
            expression,
            unsupported,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::DefaultReferenceParser;
    use kensaku_core::SearchParamRegistry;
    use std::sync::Arc;

    fn parser() -> ExpressionParser {
        ExpressionParser::new(
            Arc::new(SearchParamRegistry::new()),
            Arc::new(DefaultReferenceParser::new()),
        )
    }

    #[test]
    fn test_parse_keeps_order_and_duplicates() {
        let query =
            SearchQuery::parse("date=ge2020-01-01&date=le2020-12-31&code=http%3A%2F%2Floinc.org%7C4548-4");
        assert_eq!(
            query.parameters,
            vec![
                ("date".to_string(), "ge2020-01-01".to_string()),
                ("date".to_string(), "le2020-12-31".to_string()),
                ("code".to_string(), "http://loinc.org|4548-4".to_string()),
            ]
        );
    }

    #[test]
    fn test_result_parameters_are_set_aside() {
        let query = SearchQuery::parse("name=Smith&_count=10&_sort=-date&_include=Patient:organization");
        assert_eq!(query.parameters.len(), 1);
        assert_eq!(query.result_parameters.len(), 3);
        assert_eq!(query.result_parameter("_count"), Some("10"));
        assert_eq!(query.result_parameter("_summary"), None);
    }

    #[test]
    fn test_empty_values_are_dropped() {
        let query = SearchQuery::parse("name=&family=Smith&&gender");
        assert_eq!(
            query.parameters,
            vec![("family".to_string(), "Smith".to_string())]
        );
        assert_eq!(SearchQuery::parse(""), SearchQuery::default());
    }

    #[test]
    fn test_plus_decodes_to_space() {
        let query = SearchQuery::parse("family=van+Dyke&given=Jo%2BAnn");
        assert_eq!(
            query.parameters,
            vec![
                ("family".to_string(), "van Dyke".to_string()),
                ("given".to_string(), "Jo+Ann".to_string()),
            ]
        );
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let query = SearchQuery::parse("name=%FF%FE");
        assert_eq!(query.parameters.len(), 1);
        assert_eq!(query.parameters[0].1, "\u{FFFD}\u{FFFD}");
    }

    #[test]
    fn test_compile_conjoins() {
        let query = SearchQuery::parse("family=Smith&birthdate=ge1970");
        let compiled = query
            .compile(&parser(), "Patient", SearchHandling::Lenient)
            .unwrap();
        let expression = compiled.expression.unwrap();
        assert_eq!(expression.operands().len(), 2);
        assert!(expression.to_string().starts_with("(And (Param family"));
    }

    #[test]
    fn test_compile_single_and_none() {
        let p = parser();
        let compiled = SearchQuery::parse("family=Smith")
            .compile(&p, "Patient", SearchHandling::Strict)
            .unwrap();
        assert!(matches!(compiled.expression, Some(Expression::SearchParameter(_))));

        let compiled = SearchQuery::parse("_count=5")
            .compile(&p, "Patient", SearchHandling::Strict)
            .unwrap();
        assert!(compiled.expression.is_none());
    }

    #[test]
    fn test_lenient_skips_unsupported() {
        let query = SearchQuery::parse("family=Smith&nope=1");
        let compiled = query
            .compile(&parser(), "Patient", SearchHandling::Lenient)
            .unwrap();
        assert!(compiled.expression.is_some());
        assert_eq!(compiled.unsupported.len(), 1);
        assert_eq!(compiled.unsupported[0].0, "nope");
    }

    #[test]
    fn test_strict_rejects_unsupported() {
        let query = SearchQuery::parse("family=Smith&nope=1");
        let err = query
            .compile(&parser(), "Patient", SearchHandling::Strict)
            .unwrap_err();
        assert!(err.is_not_supported());
    }

    #[test]
    fn test_invalid_values_are_always_fatal() {
        let query = SearchQuery::parse("birthdate=yesterday");
        let err = query
            .compile(&parser(), "Patient", SearchHandling::Lenient)
            .unwrap_err();
        assert!(matches!(err, SearchError::InvalidSearchValue { .. }));
    }

    #[test]
    fn test_handling_from_prefer_header() {
        assert_eq!(
            SearchHandling::from_prefer_header(Some("return=minimal, handling=strict"), SearchHandling::Lenient),
            SearchHandling::Strict
        );
        assert_eq!(
            SearchHandling::from_prefer_header(Some("handling=lenient"), SearchHandling::Strict),
            SearchHandling::Lenient
        );
        assert_eq!(
            SearchHandling::from_prefer_header(None, SearchHandling::Strict),
            SearchHandling::Strict
        );
        assert_eq!(
            SearchHandling::from_prefer_header(Some("respond-async"), SearchHandling::Lenient),
            SearchHandling::Lenient
        );
    }
}
