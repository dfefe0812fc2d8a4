use axum::{
    extract::{Path, RawQuery, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use kensaku_core::{OperationOutcome, OperationOutcomeIssue, SearchError, SearchParameterDefinitionManager};
use kensaku_search::{SearchHandling, SearchQuery};
use serde_json::json;
use std::sync::Arc;

use super::{error_response, fhir_response, HandlerError};
use crate::AppState;

/// Compile a search query without executing it
/// (GET /{resource_type}/$compile-search?...)
pub async fn compile_search(
    State(state): State<Arc<AppState>>,
    Path(resource_type): Path<String>,
    RawQuery(query_string): RawQuery,
    headers: HeaderMap,
) -> Result<impl IntoResponse, HandlerError> {
    if !state.registry.is_known_resource_type(&resource_type) {
        return Err(error_response(&SearchError::ResourceNotSupported(
            resource_type,
        )));
    }

    let query = SearchQuery::parse(query_string.as_deref().unwrap_or_default());

    let prefer = headers.get("prefer").and_then(|v| v.to_str().ok());
    let handling = SearchHandling::from_prefer_header(prefer, state.config.search.handling);

    let compiled = query
        .compile(&state.parser, &resource_type, handling)
        .map_err(|e| {
            tracing::debug!("Search on {} rejected: {}", resource_type, e);
            error_response(&e)
        })?;

    let issues: Vec<OperationOutcomeIssue> = compiled
        .unsupported
        .iter()
        .map(|(key, value, reason)| OperationOutcome::ignored_parameter(key, value, reason))
        .collect();

    Ok(fhir_response(
        StatusCode::OK,
        json!({
            "resourceType": resource_type,
            "expression": compiled.expression,
            "display": compiled.expression.as_ref().map(|e| e.to_string()),
            "issue": issues,
        }),
    ))
}
