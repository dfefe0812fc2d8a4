//! Turns the value half of a `key=value` pair into an expression for an
//! already resolved parameter.
//!
//! - `:missing` -> `MissingExpression`
//! - `:text` on tokens -> `StartsWithTextExpression`
//! - composite -> `And` of one comparison per `$`-separated component
//! - anything else -> comparator prefix, OR-split on `,`, typed comparisons

use kensaku_core::{
    Result, SearchComparator, SearchError, SearchModifier, SearchParamType,
    SearchParameterDefinitionManager, SearchParameterInfo,
};
use std::sync::Arc;

use crate::expression::Expression;
use crate::value::{
    split_unescaped, DateTimeSearchValue, NumberSearchValue, QuantitySearchValue,
    ReferenceSearchValueParser, SearchValue, StringSearchValue, TokenSearchValue, UriSearchValue,
    ValueParseError, COMPOSITE_SEPARATOR, OR_SEPARATOR,
};
use crate::value_expression_builder::{build_comparison, check_modifier};

#[derive(Clone)]
pub struct SearchValueExpressionParser {
    definitions: Arc<dyn SearchParameterDefinitionManager>,
    references: Arc<dyn ReferenceSearchValueParser>,
}

impl SearchValueExpressionParser {
    pub fn new(
        definitions: Arc<dyn SearchParameterDefinitionManager>,
        references: Arc<dyn ReferenceSearchValueParser>,
    ) -> Self {
        Self {
            definitions,
            references,
        }
    }

    /// Compile `value` for `parameter`, with the raw modifier code taken from
    /// the key (`family:exact` -> `Some("exact")`).
    pub fn parse(
        &self,
        parameter: &Arc<SearchParameterInfo>,
        modifier: Option<&str>,
        value: &str,
    ) -> Result<Expression> {
        if value.is_empty() {
            return Err(SearchError::invalid_operation(format!(
                "Search parameter '{}' has an empty value",
                parameter.name
            )));
        }

        let modifier = match modifier.filter(|m| !m.is_empty()) {
            None => None,
            Some(code) => {
                let known = |rt: &str| self.definitions.is_known_resource_type(rt);
                Some(SearchModifier::parse(code, known).ok_or_else(|| {
                    SearchError::invalid_operation(format!(
                        "Modifier '{}' is not supported for search parameter '{}'",
                        code, parameter.name
                    ))
                })?)
            }
        };

        let inner = match modifier {
            Some(SearchModifier::Missing) => {
                let is_missing = match value {
                    "true" => true,
                    "false" => false,
                    _ => {
                        return Err(SearchError::invalid_operation(format!(
                            "The value of ':missing' must be true or false, got '{}'",
                            value
                        )));
                    }
                };
                return Ok(Expression::missing(parameter.clone(), is_missing));
            }
            Some(SearchModifier::Text) => {
                if parameter.param_type != SearchParamType::Token {
                    return Err(SearchError::invalid_operation(format!(
                        "Modifier 'text' is not supported for search parameter '{}' of type {}",
                        parameter.name, parameter.param_type
                    )));
                }
                Expression::starts_with_text(value)
            }
            _ if parameter.param_type == SearchParamType::Composite => {
                if let Some(modifier) = &modifier {
                    return Err(SearchError::invalid_operation(format!(
                        "Modifier '{}' is not supported for composite search parameter '{}'",
                        modifier, parameter.name
                    )));
                }
                self.parse_composite(parameter, value)?
            }
            _ => self.build(parameter, modifier.as_ref(), None, value)?,
        };

        Ok(Expression::search_parameter(parameter.clone(), inner))
    }

    fn parse_composite(&self, parameter: &SearchParameterInfo, value: &str) -> Result<Expression> {
        let parts = split_unescaped(value, COMPOSITE_SEPARATOR);
        if parts.len() > parameter.component.len() {
            return Err(SearchError::invalid_operation(format!(
                "Composite search parameter '{}' has {} components but {} values were given",
                parameter.name,
                parameter.component.len(),
                parts.len()
            )));
        }

        let mut components = Vec::with_capacity(parts.len());
        for (index, (part, component)) in parts.iter().zip(&parameter.component).enumerate() {
            let component = self
                .definitions
                .get_search_parameter_by_url(&component.definition)?;
            components.push(self.build(&component, None, Some(index), part)?);
        }
        Ok(Expression::and(components))
    }

    /// Build the comparisons for one atomic parameter.
    ///
    /// Comparator prefixes are only read for ordered types. A comma-separated
    /// list becomes an `Or`, which cannot carry a comparator.
    pub fn build(
        &self,
        parameter: &SearchParameterInfo,
        modifier: Option<&SearchModifier>,
        component_index: Option<usize>,
        value: &str,
    ) -> Result<Expression> {
        check_modifier(parameter, modifier)?;

        let (comparator, value) = if parameter.param_type.supports_comparators() {
            SearchComparator::split_prefix(value)
        } else {
            (SearchComparator::Eq, value)
        };

        let parts = split_unescaped(value, OR_SEPARATOR);
        if parts.len() > 1 && comparator != SearchComparator::Eq {
            return Err(SearchError::invalid_operation(format!(
                "Search comparator '{}' is not supported with multiple values for search parameter '{}'",
                comparator, parameter.name
            )));
        }

        let mut comparisons = parts
            .iter()
            .map(|part| {
                let value = self.parse_value(parameter, modifier, part)?;
                build_comparison(parameter, modifier, comparator, component_index, value)
            })
            .collect::<Result<Vec<_>>>()?;

        match comparisons.len() {
            1 => comparisons
                .pop()
                .ok_or_else(|| SearchError::invalid_operation("empty search value")),
            _ => Ok(Expression::or(comparisons)),
        }
    }

    fn parse_value(
        &self,
        parameter: &SearchParameterInfo,
        modifier: Option<&SearchModifier>,
        part: &str,
    ) -> Result<SearchValue> {
        let parsed: std::result::Result<SearchValue, ValueParseError> = match parameter.param_type {
            SearchParamType::Date => DateTimeSearchValue::parse(part).map(SearchValue::DateTime),
            SearchParamType::Number => NumberSearchValue::parse(part).map(SearchValue::Number),
            SearchParamType::Quantity => QuantitySearchValue::parse(part).map(SearchValue::Quantity),
            SearchParamType::String => StringSearchValue::parse(part).map(SearchValue::String),
            SearchParamType::Token => TokenSearchValue::parse(part).map(SearchValue::Token),
            SearchParamType::Uri => UriSearchValue::parse(part).map(SearchValue::Uri),
            SearchParamType::Reference => match modifier {
                Some(SearchModifier::Identifier) => {
                    TokenSearchValue::parse(part).map(SearchValue::Token)
                }
                _ => self.references.parse(part).map(SearchValue::Reference),
            },
            SearchParamType::Composite => {
                return Err(SearchError::invalid_operation(format!(
                    "Composite search parameter '{}' cannot be nested in another composite",
                    parameter.name
                )));
            }
        };

        parsed.map_err(|e| SearchError::InvalidSearchValue {
            parameter: parameter.name.clone(),
            message: e.to_string(),
        })
    }
}
