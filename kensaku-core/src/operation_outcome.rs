use serde::{Deserialize, Serialize};

use crate::error::SearchError;

/// FHIR OperationOutcome resource for error reporting
/// See: https://www.hl7.org/fhir/operationoutcome.html
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationOutcome {
    pub resource_type: String,
    pub issue: Vec<OperationOutcomeIssue>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationOutcomeIssue {
    pub severity: IssueSeverity,
    pub code: IssueType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expression: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum IssueSeverity {
    Error,
    Warning,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum IssueType {
    Invalid,
    Value,
    NotSupported,
}

impl OperationOutcomeIssue {
    pub fn new(severity: IssueSeverity, code: IssueType, diagnostics: impl Into<String>) -> Self {
        Self {
            severity,
            code,
            diagnostics: Some(diagnostics.into()),
            expression: None,
        }
    }
}

impl OperationOutcome {
    /// Create a new OperationOutcome with a single issue
    pub fn new(severity: IssueSeverity, code: IssueType, diagnostics: impl Into<String>) -> Self {
        Self {
            resource_type: "OperationOutcome".to_string(),
            issue: vec![OperationOutcomeIssue::new(severity, code, diagnostics)],
        }
    }

    /// Create an error OperationOutcome
    pub fn error(code: IssueType, diagnostics: impl Into<String>) -> Self {
        Self::new(IssueSeverity::Error, code, diagnostics)
    }

    /// Warning about a search parameter that was ignored
    pub fn ignored_parameter(key: &str, value: &str, reason: &SearchError) -> OperationOutcomeIssue {
        OperationOutcomeIssue {
            severity: IssueSeverity::Warning,
            code: IssueType::NotSupported,
            diagnostics: Some(format!("Search parameter '{}' was ignored: {}", key, reason)),
            expression: Some(vec![format!("{}={}", key, value)]),
        }
    }
}

impl From<&SearchError> for OperationOutcome {
    fn from(err: &SearchError) -> Self {
        let code = match err {
            SearchError::SearchParameterNotSupported { .. } => IssueType::NotSupported,
            SearchError::ResourceNotSupported(_) => IssueType::NotSupported,
            SearchError::InvalidSearchOperation(_) => IssueType::Invalid,
            SearchError::InvalidSearchValue { .. } => IssueType::Value,
        };
        Self::error(code, err.to_string())
    }
}
