//! Chain resolution for forward (`subject.name`) and reverse (`_has:`) chains.

use kensaku_core::{Result, SearchError, SearchParamType, SearchParameterInfo};
use std::sync::Arc;

use crate::expression::Expression;
use crate::expression_parser::ExpressionParser;

impl ExpressionParser {
    /// Compile `remaining_key=value` through a reference parameter.
    ///
    /// Every candidate target type is tried. Candidates where the remaining
    /// key does not exist are dropped; exactly one must survive.
    /// Forward chains compile the remaining key against the candidate,
    /// reverse chains against `source_resource_type`.
    pub(crate) fn resolve_chain(
        &self,
        source_resource_type: &str,
        reference: &Arc<SearchParameterInfo>,
        explicit_target_type: Option<&str>,
        remaining_key: &str,
        value: &str,
        reversed: bool,
    ) -> Result<Expression> {
        if reference.param_type != SearchParamType::Reference {
            return Err(SearchError::invalid_operation(format!(
                "Search parameter '{}' is of type {} and cannot be chained",
                reference.name, reference.param_type
            )));
        }

        let candidates: Vec<&str> = match explicit_target_type.filter(|t| !t.is_empty()) {
            Some(target) => {
                if !self.definitions.is_known_resource_type(target) {
                    return Err(SearchError::ResourceNotSupported(target.to_string()));
                }
                vec![target]
            }
            None => reference
                .target_resource_types
                .iter()
                .map(String::as_str)
                .collect(),
        };

        let mut resolved: Vec<(&str, Expression)> = Vec::new();
        for target in candidates {
            if !reference.target_resource_types.is_empty() && !reference.targets(target) {
                tracing::debug!(
                    "Chain candidate {} rejected: not a target of {}",
                    target,
                    reference.name
                );
                continue;
            }

            let recursion_type = if reversed { source_resource_type } else { target };
            match self.parse(recursion_type, remaining_key, value) {
                Ok(inner) => resolved.push((target, inner)),
                Err(e) if e.is_not_supported() => {
                    tracing::debug!(
                        "Chain candidate {} rejected for {}.{}: {}",
                        target,
                        reference.name,
                        remaining_key,
                        e
                    );
                }
                Err(e) => return Err(e),
            }
        }

        if resolved.len() > 1 {
            let alternatives: Vec<String> = resolved
                .iter()
                .map(|(target, _)| format!("{}:{}", reference.name, target))
                .collect();
            return Err(SearchError::invalid_operation(format!(
                "Chained search parameter '{}.{}' is ambiguous; specify one of: {}",
                reference.name,
                remaining_key,
                alternatives.join(", ")
            )));
        }

        match resolved.pop() {
            Some((target, inner)) => Ok(Expression::chained(
                source_resource_type,
                reference.clone(),
                target,
                reversed,
                inner,
            )),
            None => Err(SearchError::invalid_operation(format!(
                "No target resource type of '{}' supports '{}'",
                reference.name, remaining_key
            ))),
        }
    }
}
