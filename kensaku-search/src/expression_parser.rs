//! Entry point of the compiler: one `(resource type, key, value)` triple in,
//! one expression out.
//!
//! Keys are classified in a single left-to-right pass:
//! - `_has:Type:ref:rest` -> reverse chain
//! - `ref[:Type].rest` -> forward chain
//! - `name[:modifier]` -> plain parameter

use kensaku_core::{Result, SearchError, SearchParameterDefinitionManager};
use std::sync::Arc;

use crate::expression::Expression;
use crate::search_value_parser::SearchValueExpressionParser;
use crate::value::ReferenceSearchValueParser;

const REVERSE_CHAIN_PREFIX: &str = "_has:";

#[derive(Clone)]
pub struct ExpressionParser {
    pub(crate) definitions: Arc<dyn SearchParameterDefinitionManager>,
    pub(crate) values: SearchValueExpressionParser,
}

impl ExpressionParser {
    pub fn new(
        definitions: Arc<dyn SearchParameterDefinitionManager>,
        references: Arc<dyn ReferenceSearchValueParser>,
    ) -> Self {
        let values = SearchValueExpressionParser::new(definitions.clone(), references);
        Self {
            definitions,
            values,
        }
    }

    pub fn definitions(&self) -> &Arc<dyn SearchParameterDefinitionManager> {
        &self.definitions
    }

    /// Compile one query parameter against `resource_type`.
    pub fn parse(&self, resource_type: &str, key: &str, value: &str) -> Result<Expression> {
        if key.is_empty() {
            return Err(SearchError::invalid_operation("Search parameter name is empty"));
        }
        if value.is_empty() {
            return Err(SearchError::invalid_operation(format!(
                "Search parameter '{}' has an empty value",
                key
            )));
        }

        if let Some(rest) = key.strip_prefix(REVERSE_CHAIN_PREFIX) {
            tracing::trace!("Reverse chain {} on {}", key, resource_type);
            return self.parse_reverse_chain(resource_type, rest, value);
        }

        if let Some((chained, remaining)) = key.split_once('.') {
            tracing::trace!("Forward chain {} on {}", key, resource_type);
            return self.parse_forward_chain(resource_type, chained, remaining, value);
        }

        let (name, modifier) = match key.split_once(':') {
            Some((name, modifier)) => (name, Some(modifier)),
            None => (key, None),
        };
        let parameter = self.definitions.get_search_parameter(resource_type, name)?;
        self.values.parse(&parameter, modifier, value)
    }

    /// `Observation:patient:code` from `_has:Observation:patient:code`
    fn parse_reverse_chain(&self, resource_type: &str, rest: &str, value: &str) -> Result<Expression> {
        let mut segments = rest.splitn(3, ':');
        let source_type = segments.next().unwrap_or_default();
        let reference = segments.next().unwrap_or_default();
        let remaining = segments.next().unwrap_or_default();

        if source_type.is_empty() {
            return Err(SearchError::invalid_operation(format!(
                "Reverse chain '{}{}' has no resource type",
                REVERSE_CHAIN_PREFIX, rest
            )));
        }
        if reference.is_empty() {
            return Err(SearchError::invalid_operation(format!(
                "Reverse chain '{}{}' has no reference parameter",
                REVERSE_CHAIN_PREFIX, rest
            )));
        }

        let reference = self.definitions.get_search_parameter(source_type, reference)?;
        self.resolve_chain(
            source_type,
            &reference,
            Some(resource_type),
            remaining,
            value,
            true,
        )
    }

    /// `subject:Patient` + `name` from `subject:Patient.name`
    fn parse_forward_chain(
        &self,
        resource_type: &str,
        chained: &str,
        remaining: &str,
        value: &str,
    ) -> Result<Expression> {
        let (name, target_type) = match chained.split_once(':') {
            Some((name, target_type)) => (name, Some(target_type)),
            None => (chained, None),
        };
        if name.is_empty() {
            return Err(SearchError::parameter_not_supported(resource_type, name));
        }

        let reference = self.definitions.get_search_parameter(resource_type, name)?;
        self.resolve_chain(resource_type, &reference, target_type, remaining, value, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::MultiaryOperator;
    use crate::value::{DefaultReferenceParser, SearchValue};
    use kensaku_core::{
        SearchComparator, SearchParamRegistry, SearchParamType, SearchParameterInfo,
    };

    fn parser() -> ExpressionParser {
        ExpressionParser::new(
            Arc::new(SearchParamRegistry::new()),
            Arc::new(DefaultReferenceParser::new()),
        )
    }

    /// Patient.general-practitioner narrowed to Practitioner only
    fn single_target_parser() -> ExpressionParser {
        let mut registry = SearchParamRegistry::new();
        registry.register(
            SearchParameterInfo::new(
                "general-practitioner",
                "http://hl7.org/fhir/SearchParameter/Patient-general-practitioner",
                SearchParamType::Reference,
            )
            .with_base(&["Patient"])
            .with_targets(&["Practitioner"]),
        );
        ExpressionParser::new(Arc::new(registry), Arc::new(DefaultReferenceParser::new()))
    }

    #[test]
    fn test_plain_parameter_is_wrapped() {
        let expr = parser().parse("Patient", "family", "Smith").unwrap();
        assert!(matches!(expr, Expression::SearchParameter(ref p) if p.parameter.name == "family"));
    }

    #[test]
    fn test_or_list_on_token() {
        let expr = parser().parse("Observation", "code", "4548-4,718-7").unwrap();
        let Expression::SearchParameter(outer) = expr else {
            panic!("expected parameter wrapper");
        };
        let Expression::Multiary(or) = *outer.inner else {
            panic!("expected Or");
        };
        assert_eq!(or.op, MultiaryOperator::Or);
        assert_eq!(or.expressions.len(), 2);
        for child in &or.expressions {
            assert!(matches!(
                child,
                Expression::Comparison(c)
                    if c.field_name == "code"
                        && c.comparator == SearchComparator::Eq
                        && matches!(c.value, SearchValue::Token(_))
            ));
        }
    }

    #[test]
    fn test_three_values() {
        let expr = parser().parse("Patient", "family", "a,b,c").unwrap();
        assert_eq!(
            expr.to_string(),
            "(Param family (Or (FieldEq family a) (FieldEq family b) (FieldEq family c)))"
        );
    }

    #[test]
    fn test_comparator_with_or_list() {
        let err = parser()
            .parse("RiskAssessment", "probability", "gt5,lt10")
            .unwrap_err();
        assert!(matches!(err, SearchError::InvalidSearchOperation(_)));
    }

    #[test]
    fn test_composite_parts() {
        let p = parser();
        let err = p
            .parse("Observation", "code-value-quantity", "a$5$c")
            .unwrap_err();
        assert!(matches!(err, SearchError::InvalidSearchOperation(_)));

        let expr = p.parse("Observation", "code-value-quantity", "a$5").unwrap();
        let Expression::SearchParameter(outer) = expr else {
            panic!("expected parameter wrapper");
        };
        assert!(matches!(*outer.inner, Expression::Multiary(ref m) if m.op == MultiaryOperator::And));
        assert_eq!(outer.inner.operands().len(), 2);
    }

    #[test]
    fn test_forward_chain_matches_direct_parse() {
        let p = single_target_parser();
        let expr = p
            .parse("Patient", "general-practitioner.name", "Smith")
            .unwrap();
        let direct = p.parse("Practitioner", "name", "Smith").unwrap();

        let Expression::Chained(chain) = expr else {
            panic!("expected chain");
        };
        assert!(!chain.reversed);
        assert_eq!(chain.source_resource_type, "Patient");
        assert_eq!(chain.target_resource_type, "Practitioner");
        assert_eq!(chain.reference_parameter.name, "general-practitioner");
        assert_eq!(*chain.inner, direct);
    }

    #[test]
    fn test_forward_chain_prunes_dead_ends() {
        // Organization has a `name`, Practitioner has a `name`,
        // PractitionerRole does not.
        let err = parser()
            .parse("Patient", "general-practitioner.name", "Smith")
            .unwrap_err();
        let SearchError::InvalidSearchOperation(message) = err else {
            panic!("expected ambiguity error");
        };
        assert!(message.contains("general-practitioner:Organization"));
        assert!(message.contains("general-practitioner:Practitioner"));
        assert!(!message.contains("general-practitioner:PractitionerRole"));
    }

    #[test]
    fn test_forward_chain_with_type_hint() {
        let expr = parser()
            .parse("Patient", "general-practitioner:Practitioner.family", "Smith")
            .unwrap();
        let Expression::Chained(chain) = expr else {
            panic!("expected chain");
        };
        assert_eq!(chain.target_resource_type, "Practitioner");
        assert_eq!(
            chain.inner.to_string(),
            "(Param family (FieldEq family Smith))"
        );
    }

    #[test]
    fn test_forward_chain_hint_errors() {
        let p = parser();
        let err = p.parse("Patient", "general-practitioner:Foo.name", "x").unwrap_err();
        assert_eq!(err, SearchError::ResourceNotSupported("Foo".to_string()));

        // Known type outside the declared targets
        let err = p
            .parse("Patient", "general-practitioner:Patient.name", "x")
            .unwrap_err();
        assert!(matches!(err, SearchError::InvalidSearchOperation(_)));

        let err = p.parse("Patient", ":Practitioner.name", "x").unwrap_err();
        assert!(matches!(err, SearchError::SearchParameterNotSupported { .. }));

        let err = p.parse("Patient", "nope.name", "x").unwrap_err();
        assert!(matches!(err, SearchError::SearchParameterNotSupported { .. }));
    }

    #[test]
    fn test_chain_through_non_reference() {
        let err = parser().parse("Patient", "family.name", "x").unwrap_err();
        assert!(matches!(err, SearchError::InvalidSearchOperation(_)));
    }

    #[test]
    fn test_chain_without_viable_target() {
        let err = parser()
            .parse("Patient", "organization.family", "x")
            .unwrap_err();
        assert!(matches!(err, SearchError::InvalidSearchOperation(_)));
    }

    #[test]
    fn test_chain_propagates_value_errors() {
        let err = parser()
            .parse("Observation", "patient.birthdate", "not-a-date")
            .unwrap_err();
        assert!(matches!(err, SearchError::InvalidSearchValue { .. }));
    }

    #[test]
    fn test_multi_level_chain() {
        let expr = parser()
            .parse("Observation", "patient.organization.name", "Acme")
            .unwrap();
        assert_eq!(
            expr.to_string(),
            "(Chain Observation:patient:Patient (Chain Patient:organization:Organization (Param name (FieldEq name Acme))))"
        );
    }

    #[test]
    fn test_reverse_chain() {
        let expr = parser()
            .parse("Patient", "_has:Observation:patient:status", "final")
            .unwrap();
        let Expression::Chained(chain) = expr else {
            panic!("expected chain");
        };
        assert!(chain.reversed);
        assert_eq!(chain.source_resource_type, "Observation");
        assert_eq!(chain.target_resource_type, "Patient");
        assert_eq!(chain.reference_parameter.name, "patient");
        assert_eq!(
            chain.inner.to_string(),
            "(Param status (FieldEq status final))"
        );
    }

    #[test]
    fn test_reverse_chain_with_modifier_and_nesting() {
        let p = parser();
        let expr = p
            .parse("Patient", "_has:Observation:patient:code:text", "glucose")
            .unwrap();
        assert_eq!(
            expr.to_string(),
            "(ReverseChain Observation:patient:Patient (Param code (TextStartsWith glucose)))"
        );

        let expr = p
            .parse(
                "Patient",
                "_has:Observation:patient:_has:DiagnosticReport:result:status",
                "final",
            )
            .unwrap_or_else(|e| panic!("{}", e));
        let Expression::Chained(outer) = expr else {
            panic!("expected chain");
        };
        assert!(matches!(*outer.inner, Expression::Chained(ref inner) if inner.reversed));
    }

    #[test]
    fn test_reverse_chain_malformed() {
        let p = parser();
        for key in ["_has:", "_has::patient:code", "_has:Observation", "_has:Observation:"] {
            let err = p.parse("Patient", key, "x").unwrap_err();
            assert!(
                matches!(err, SearchError::InvalidSearchOperation(_)),
                "{} -> {:?}",
                key,
                err
            );
        }
    }

    #[test]
    fn test_reverse_chain_unknown_parameter() {
        let err = parser()
            .parse("Patient", "_has:Observation:nope:status", "final")
            .unwrap_err();
        assert!(matches!(err, SearchError::SearchParameterNotSupported { .. }));

        // Observation.patient does not point at Practitioner
        let err = parser()
            .parse("Practitioner", "_has:Observation:patient:status", "final")
            .unwrap_err();
        assert!(matches!(err, SearchError::InvalidSearchOperation(_)));
    }

    #[test]
    fn test_missing() {
        let p = parser();
        let expr = p.parse("Patient", "birthdate:missing", "true").unwrap();
        assert!(matches!(expr, Expression::Missing(ref m) if m.is_missing));

        let err = p.parse("Patient", "birthdate:missing", "notabool").unwrap_err();
        assert!(matches!(err, SearchError::InvalidSearchOperation(_)));
    }

    #[test]
    fn test_empty_key_or_value() {
        let p = parser();
        assert!(matches!(
            p.parse("Patient", "", "x").unwrap_err(),
            SearchError::InvalidSearchOperation(_)
        ));
        assert!(matches!(
            p.parse("Patient", "family", "").unwrap_err(),
            SearchError::InvalidSearchOperation(_)
        ));
    }

    #[test]
    fn test_unknown_parameter_and_resource() {
        let p = parser();
        assert!(matches!(
            p.parse("Patient", "nope", "x").unwrap_err(),
            SearchError::SearchParameterNotSupported { .. }
        ));
        assert!(matches!(
            p.parse("NotAResource", "family", "x").unwrap_err(),
            SearchError::SearchParameterNotSupported { .. }
        ));
    }

    #[test]
    fn test_common_parameter() {
        let expr = parser().parse("Observation", "_id", "abc").unwrap();
        assert_eq!(expr.to_string(), "(Param _id (FieldEq _id abc))");
    }

    #[test]
    fn test_parser_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ExpressionParser>();

        let p = parser();
        let expected = p.parse("Patient", "_has:Observation:patient:status", "final").unwrap();
        std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    s.spawn(|| {
                        p.parse("Patient", "_has:Observation:patient:status", "final")
                            .unwrap()
                    })
                })
                .collect();
            for handle in handles {
                assert_eq!(handle.join().unwrap(), expected);
            }
        });
    }
}
