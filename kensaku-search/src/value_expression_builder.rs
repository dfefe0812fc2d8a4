//! Atomic comparison nodes.

use kensaku_core::{Result, SearchComparator, SearchError, SearchModifier, SearchParameterInfo};

use crate::expression::Expression;
use crate::value::SearchValue;

/// Reject modifiers that make no sense for the parameter's type.
pub(crate) fn check_modifier(
    parameter: &SearchParameterInfo,
    modifier: Option<&SearchModifier>,
) -> Result<()> {
    let Some(modifier) = modifier else {
        return Ok(());
    };

    if !modifier.applicable_to(parameter.param_type) {
        return Err(SearchError::invalid_operation(format!(
            "Modifier '{}' is not supported for search parameter '{}' of type {}",
            modifier, parameter.name, parameter.param_type
        )));
    }

    if let SearchModifier::Type(resource_type) = modifier
        && !parameter.target_resource_types.is_empty()
        && !parameter.targets(resource_type)
    {
        return Err(SearchError::invalid_operation(format!(
            "Search parameter '{}' cannot refer to {}",
            parameter.name, resource_type
        )));
    }

    Ok(())
}

/// Build one `ComparisonExpression` for an already parsed value.
pub(crate) fn build_comparison(
    parameter: &SearchParameterInfo,
    modifier: Option<&SearchModifier>,
    comparator: SearchComparator,
    component_index: Option<usize>,
    value: SearchValue,
) -> Result<Expression> {
    let value = match (modifier, value) {
        (Some(SearchModifier::Type(resource_type)), SearchValue::Reference(mut reference)) => {
            match reference.resource_type.as_deref() {
                None => reference.resource_type = Some(resource_type.clone()),
                Some(given) if given == resource_type => {}
                Some(given) => {
                    return Err(SearchError::InvalidSearchValue {
                        parameter: parameter.name.clone(),
                        message: format!(
                            "reference to {} does not match modifier :{}",
                            given, resource_type
                        ),
                    });
                }
            }
            SearchValue::Reference(reference)
        }
        (_, value) => value,
    };

    Ok(Expression::comparison(
        parameter.name.clone(),
        component_index,
        modifier.cloned(),
        comparator,
        value,
    ))
}
