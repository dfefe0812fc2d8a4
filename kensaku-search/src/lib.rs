mod chain;
pub mod expression;
pub mod expression_parser;
pub mod query;
pub mod search_value_parser;
pub mod value;
mod value_expression_builder;

pub use expression::{
    ChainedExpression, ComparisonExpression, Expression, MissingExpression, MultiaryExpression,
    MultiaryOperator, SearchParameterExpression, StartsWithTextExpression,
};
pub use expression_parser::ExpressionParser;
pub use query::{CompiledSearch, SearchHandling, SearchQuery, RESULT_PARAMETERS};
pub use search_value_parser::SearchValueExpressionParser;
pub use value::{
    DefaultReferenceParser, ReferenceKind, ReferenceSearchValue, ReferenceSearchValueParser,
    SearchValue, ValueParseError,
};
