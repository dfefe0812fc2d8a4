//! Search parameter metadata and the literal vocabularies of the query
//! language (comparator prefixes and modifier codes).

use serde::{Deserialize, Serialize};
use std::fmt;


/// FHIR search parameter type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchParamType {
    Date,
    Number,
    Quantity,
    Reference,
    String,
    Token,
    Uri,
    Composite,
}

impl SearchParamType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchParamType::Date => "date",
            SearchParamType::Number => "number",
            SearchParamType::Quantity => "quantity",
            SearchParamType::Reference => "reference",
            SearchParamType::String => "string",
            SearchParamType::Token => "token",
            SearchParamType::Uri => "uri",
            SearchParamType::Composite => "composite",
        }
    }

    /// Ordered types accept comparator prefixes (`gt`, `le`, ...)
    pub fn supports_comparators(&self) -> bool {
        matches!(
            self,
            SearchParamType::Date | SearchParamType::Number | SearchParamType::Quantity
        )
    }
}

impl fmt::Display for SearchParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A component of a composite search parameter, referencing the
/// sub-parameter by canonical URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchParameterComponent {
    pub definition: String,
}

/// Immutable definition of a search parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchParameterInfo {
    /// Parameter code as used in query strings (e.g. "family", "code")
    pub name: String,
    /// Canonical URL
    pub url: String,
    #[serde(rename = "type")]
    pub param_type: SearchParamType,
    /// Resource types declaring this parameter. "Resource" or
    /// "DomainResource" makes it common to every type.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub base: Vec<String>,
    /// Reference parameters only
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub target_resource_types: Vec<String>,
    /// Composite parameters only
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub component: Vec<SearchParameterComponent>,
}

impl SearchParameterInfo {
    pub fn new(name: impl Into<String>, url: impl Into<String>, param_type: SearchParamType) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            param_type,
            base: Vec::new(),
            target_resource_types: Vec::new(),
            component: Vec::new(),
        }
    }

    pub fn with_base(mut self, base: &[&str]) -> Self {
        self.base = base.iter().map(|b| b.to_string()).collect();
        self
    }

    pub fn with_targets(mut self, targets: &[&str]) -> Self {
        self.target_resource_types = targets.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn with_components(mut self, definitions: &[&str]) -> Self {
        self.component = definitions
            .iter()
            .map(|d| SearchParameterComponent {
                definition: d.to_string(),
            })
            .collect();
        self
    }

    pub fn is_common(&self) -> bool {
        self.base
            .iter()
            .any(|b| b == "Resource" || b == "DomainResource")
    }

    pub fn targets(&self, resource_type: &str) -> bool {
        self.target_resource_types.iter().any(|t| t == resource_type)
    }
}

/// Value comparator, given as a two-letter prefix on ordered values
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchComparator {
    #[default]
    Eq,
    Ne,
    Gt,
    Lt,
    Ge,
    Le,
    Sa,
    Eb,
    Ap,
}

/// Prefixes in scan order
const COMPARATOR_PREFIXES: [(&str, SearchComparator); 9] = [
    ("eq", SearchComparator::Eq),
    ("ne", SearchComparator::Ne),
    ("gt", SearchComparator::Gt),
    ("lt", SearchComparator::Lt),
    ("ge", SearchComparator::Ge),
    ("le", SearchComparator::Le),
    ("sa", SearchComparator::Sa),
    ("eb", SearchComparator::Eb),
    ("ap", SearchComparator::Ap),
];

impl SearchComparator {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchComparator::Eq => "eq",
            SearchComparator::Ne => "ne",
            SearchComparator::Gt => "gt",
            SearchComparator::Lt => "lt",
            SearchComparator::Ge => "ge",
            SearchComparator::Le => "le",
            SearchComparator::Sa => "sa",
            SearchComparator::Eb => "eb",
            SearchComparator::Ap => "ap",
        }
    }

    /// Split a leading comparator prefix off `value`.
    ///
    /// `ge2020-01-01` -> `(Ge, "2020-01-01")`; no prefix -> `(Eq, value)`.
    pub fn split_prefix(value: &str) -> (SearchComparator, &str) {
        for (prefix, comparator) in &COMPARATOR_PREFIXES {
            if let Some(rest) = value.strip_prefix(prefix) {
                return (*comparator, rest);
            }
        }
        (SearchComparator::Eq, value)
    }
}

impl fmt::Display for SearchComparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Modifier appended to a parameter name: `name:exact`, `code:text`,
/// `subject:Patient`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SearchModifier {
    Missing,
    Exact,
    Contains,
    Text,
    Not,
    Above,
    Below,
    In,
    NotIn,
    Identifier,
    /// Resource type restriction on a reference parameter
    Type(String),
}

const MODIFIER_CODES: [(&str, SearchModifier); 10] = [
    ("missing", SearchModifier::Missing),
    ("exact", SearchModifier::Exact),
    ("contains", SearchModifier::Contains),
    ("text", SearchModifier::Text),
    ("not", SearchModifier::Not),
    ("above", SearchModifier::Above),
    ("below", SearchModifier::Below),
    ("in", SearchModifier::In),
    ("not-in", SearchModifier::NotIn),
    ("identifier", SearchModifier::Identifier),
];

impl SearchModifier {
    /// Parse a modifier code. Codes accepted by `is_known_type` become `Type`.
    /// Codes are case-sensitive.
    pub fn parse(code: &str, is_known_type: impl Fn(&str) -> bool) -> Option<Self> {
        MODIFIER_CODES
            .iter()
            .find(|(c, _)| *c == code)
            .map(|(_, m)| m.clone())
            .or_else(|| is_known_type(code).then(|| SearchModifier::Type(code.to_string())))
    }

    pub fn code(&self) -> &str {
        match self {
            SearchModifier::Missing => "missing",
            SearchModifier::Exact => "exact",
            SearchModifier::Contains => "contains",
            SearchModifier::Text => "text",
            SearchModifier::Not => "not",
            SearchModifier::Above => "above",
            SearchModifier::Below => "below",
            SearchModifier::In => "in",
            SearchModifier::NotIn => "not-in",
            SearchModifier::Identifier => "identifier",
            SearchModifier::Type(resource_type) => resource_type,
        }
    }

    /// Whether this modifier may be applied to an atomic parameter of the given type.
    pub fn applicable_to(&self, param_type: SearchParamType) -> bool {
        match self {
            SearchModifier::Missing => true,
            SearchModifier::Exact | SearchModifier::Contains => {
                param_type == SearchParamType::String
            }
            SearchModifier::Text
            | SearchModifier::Not
            | SearchModifier::In
            | SearchModifier::NotIn => param_type == SearchParamType::Token,
            SearchModifier::Above | SearchModifier::Below => {
                matches!(param_type, SearchParamType::Token | SearchParamType::Uri)
            }
            SearchModifier::Identifier | SearchModifier::Type(_) => {
                param_type == SearchParamType::Reference
            }
        }
    }
}

impl fmt::Display for SearchModifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_prefix() {
        assert_eq!(
            SearchComparator::split_prefix("ge2020-01-01"),
            (SearchComparator::Ge, "2020-01-01")
        );
        assert_eq!(SearchComparator::split_prefix("ap5"), (SearchComparator::Ap, "5"));
        assert_eq!(SearchComparator::split_prefix("100"), (SearchComparator::Eq, "100"));
        assert_eq!(SearchComparator::split_prefix("eq7"), (SearchComparator::Eq, "7"));
    }

    #[test]
    fn test_prefix_is_case_sensitive() {
        assert_eq!(SearchComparator::split_prefix("GT5"), (SearchComparator::Eq, "GT5"));
    }

    #[test]
    fn test_only_ordered_types_support_comparators() {
        assert!(SearchParamType::Date.supports_comparators());
        assert!(SearchParamType::Number.supports_comparators());
        assert!(SearchParamType::Quantity.supports_comparators());
        assert!(!SearchParamType::Token.supports_comparators());
        assert!(!SearchParamType::String.supports_comparators());
        assert!(!SearchParamType::Reference.supports_comparators());
    }

    #[test]
    fn test_parse_modifier() {
        use crate::resource_type::is_resource_type;

        assert_eq!(SearchModifier::parse("missing", is_resource_type), Some(SearchModifier::Missing));
        assert_eq!(SearchModifier::parse("not-in", is_resource_type), Some(SearchModifier::NotIn));
        assert_eq!(
            SearchModifier::parse("Patient", is_resource_type),
            Some(SearchModifier::Type("Patient".to_string()))
        );
        assert_eq!(SearchModifier::parse("Exact", is_resource_type), None);
        assert_eq!(SearchModifier::parse("bogus", is_resource_type), None);
    }

    #[test]
    fn test_type_modifier_follows_known_types() {
        let only_ships = |rt: &str| rt == "Spaceship";
        assert_eq!(
            SearchModifier::parse("Spaceship", only_ships),
            Some(SearchModifier::Type("Spaceship".to_string()))
        );
        assert_eq!(SearchModifier::parse("Patient", only_ships), None);
        assert_eq!(SearchModifier::parse("missing", only_ships), Some(SearchModifier::Missing));
    }

    #[test]
    fn test_modifier_applicability() {
        assert!(SearchModifier::Exact.applicable_to(SearchParamType::String));
        assert!(!SearchModifier::Exact.applicable_to(SearchParamType::Token));
        assert!(SearchModifier::Below.applicable_to(SearchParamType::Uri));
        assert!(SearchModifier::Not.applicable_to(SearchParamType::Token));
        assert!(!SearchModifier::Not.applicable_to(SearchParamType::Date));
        assert!(SearchModifier::Type("Patient".to_string()).applicable_to(SearchParamType::Reference));
        assert!(SearchModifier::Missing.applicable_to(SearchParamType::Quantity));
    }

    #[test]
    fn test_parameter_builder() {
        let param = SearchParameterInfo::new(
            "subject",
            "http://hl7.org/fhir/SearchParameter/Observation-subject",
            SearchParamType::Reference,
        )
        .with_base(&["Observation"])
        .with_targets(&["Patient", "Group"]);

        assert!(param.targets("Patient"));
        assert!(!param.targets("Practitioner"));
        assert!(!param.is_common());
        assert!(param.component.is_empty());
    }

    #[test]
    fn test_serialize_parameter() {
        let param = SearchParameterInfo::new(
            "_id",
            "http://hl7.org/fhir/SearchParameter/Resource-id",
            SearchParamType::Token,
        )
        .with_base(&["Resource"]);
        let json = serde_json::to_value(&param).unwrap();
        assert_eq!(json["type"], "token");
        assert_eq!(json["name"], "_id");
        assert!(json.get("targetResourceTypes").is_none());
        assert!(param.is_common());
    }
}
