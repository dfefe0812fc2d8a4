//! Storage-agnostic search expression tree.
//!
//! Nodes are immutable values built once per compilation. Executors walk the
//! tree; `Display` renders it as an S-expression for logs and tests.

use kensaku_core::{SearchComparator, SearchModifier, SearchParameterInfo};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

use crate::value::SearchValue;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Expression {
    SearchParameter(SearchParameterExpression),
    Chained(ChainedExpression),
    Multiary(MultiaryExpression),
    Comparison(ComparisonExpression),
    Missing(MissingExpression),
    StartsWithText(StartsWithTextExpression),
}

/// Binds an inner expression to the parameter it was compiled from
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchParameterExpression {
    pub parameter: Arc<SearchParameterInfo>,
    pub inner: Box<Expression>,
}

/// Forward (`subject.name`) or reverse (`_has:Observation:patient:code`) chain
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainedExpression {
    pub source_resource_type: String,
    pub reference_parameter: Arc<SearchParameterInfo>,
    pub target_resource_type: String,
    pub reversed: bool,
    pub inner: Box<Expression>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum MultiaryOperator {
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiaryExpression {
    pub op: MultiaryOperator,
    pub expressions: Vec<Expression>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonExpression {
    pub field_name: String,
    /// Position within the owning composite parameter
    #[serde(skip_serializing_if = "Option::is_none")]
    pub component_index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modifier: Option<SearchModifier>,
    pub comparator: SearchComparator,
    pub value: SearchValue,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MissingExpression {
    pub parameter: Arc<SearchParameterInfo>,
    pub is_missing: bool,
}

/// Case-insensitive prefix match on a token's display text
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartsWithTextExpression {
    pub value: String,
}

impl Expression {
    pub fn search_parameter(parameter: Arc<SearchParameterInfo>, inner: Expression) -> Self {
        Expression::SearchParameter(SearchParameterExpression {
            parameter,
            inner: Box::new(inner),
        })
    }

    pub fn chained(
        source_resource_type: impl Into<String>,
        reference_parameter: Arc<SearchParameterInfo>,
        target_resource_type: impl Into<String>,
        reversed: bool,
        inner: Expression,
    ) -> Self {
        Expression::Chained(ChainedExpression {
            source_resource_type: source_resource_type.into(),
            reference_parameter,
            target_resource_type: target_resource_type.into(),
            reversed,
            inner: Box::new(inner),
        })
    }

    pub fn and(expressions: Vec<Expression>) -> Self {
        Expression::Multiary(MultiaryExpression {
            op: MultiaryOperator::And,
            expressions,
        })
    }

    pub fn or(expressions: Vec<Expression>) -> Self {
        Expression::Multiary(MultiaryExpression {
            op: MultiaryOperator::Or,
            expressions,
        })
    }

    pub fn comparison(
        field_name: impl Into<String>,
        component_index: Option<usize>,
        modifier: Option<SearchModifier>,
        comparator: SearchComparator,
        value: SearchValue,
    ) -> Self {
        Expression::Comparison(ComparisonExpression {
            field_name: field_name.into(),
            component_index,
            modifier,
            comparator,
            value,
        })
    }

    pub fn missing(parameter: Arc<SearchParameterInfo>, is_missing: bool) -> Self {
        Expression::Missing(MissingExpression {
            parameter,
            is_missing,
        })
    }

    pub fn starts_with_text(value: impl Into<String>) -> Self {
        Expression::StartsWithText(StartsWithTextExpression {
            value: value.into(),
        })
    }

    /// Children of `And`/`Or` nodes; empty for every other node
    pub fn operands(&self) -> &[Expression] {
        match self {
            Expression::Multiary(m) => &m.expressions,
            _ => &[],
        }
    }
}

fn comparator_name(comparator: SearchComparator) -> &'static str {
    match comparator {
        SearchComparator::Eq => "Eq",
        SearchComparator::Ne => "Ne",
        SearchComparator::Gt => "Gt",
        SearchComparator::Lt => "Lt",
        SearchComparator::Ge => "Ge",
        SearchComparator::Le => "Le",
        SearchComparator::Sa => "Sa",
        SearchComparator::Eb => "Eb",
        SearchComparator::Ap => "Ap",
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::SearchParameter(e) => write!(f, "(Param {} {})", e.parameter.name, e.inner),
            Expression::Chained(e) => write!(
                f,
                "({} {}:{}:{} {})",
                if e.reversed { "ReverseChain" } else { "Chain" },
                e.source_resource_type,
                e.reference_parameter.name,
                e.target_resource_type,
                e.inner
            ),
            Expression::Multiary(e) => {
                let op = match e.op {
                    MultiaryOperator::And => "And",
                    MultiaryOperator::Or => "Or",
                };
                write!(f, "({}", op)?;
                for child in &e.expressions {
                    write!(f, " {}", child)?;
                }
                f.write_str(")")
            }
            Expression::Comparison(e) => {
                write!(f, "(Field{} {}", comparator_name(e.comparator), e.field_name)?;
                if let Some(index) = e.component_index {
                    write!(f, "[{}]", index)?;
                }
                if let Some(modifier) = &e.modifier {
                    write!(f, ":{}", modifier)?;
                }
                write!(f, " {})", e.value)
            }
            Expression::Missing(e) => write!(f, "(Missing {} {})", e.parameter.name, e.is_missing),
            Expression::StartsWithText(e) => write!(f, "(TextStartsWith {})", e.value),
        }
    }
}
