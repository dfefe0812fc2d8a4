use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use kensaku_core::SearchParameterDefinitionManager;
use serde_json::{json, Value};
use std::sync::Arc;

use super::fhir_response;
use crate::AppState;

/// Health check (GET /health)
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "fhirVersion": "4.0.1"
    }))
}

/// CapabilityStatement built from the parameter registry (GET /metadata)
pub async fn capability_statement(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let resources: Vec<Value> = state
        .registry
        .resource_types()
        .iter()
        .map(|rt| {
            json!({
                "type": rt,
                "interaction": [{"code": "search-type"}],
                "searchParam": search_params_from_registry(state.registry.as_ref(), rt),
                "operation": [{
                    "name": "compile-search",
                    "definition": "http://kensaku.dev/OperationDefinition/compile-search",
                }],
            })
        })
        .collect();

    fhir_response(
        StatusCode::OK,
        json!({
            "resourceType": "CapabilityStatement",
            "status": "active",
            "kind": "instance",
            "fhirVersion": "4.0.1",
            "format": ["json"],
            "software": {
                "name": "kensaku",
                "version": env!("CARGO_PKG_VERSION"),
            },
            "implementation": {
                "description": "kensaku - FHIR search expression compiler",
                "url": format!("http://{}:{}", state.config.server.host, state.config.server.port),
            },
            "rest": [{
                "mode": "server",
                "resource": resources,
            }]
        }),
    )
}

/// Search parameter entries for one resource type
fn search_params_from_registry(
    registry: &dyn SearchParameterDefinitionManager,
    resource_type: &str,
) -> Vec<Value> {
    registry
        .search_parameters(resource_type)
        .iter()
        .map(|def| {
            json!({
                "name": def.name,
                "definition": def.url,
                "type": def.param_type.as_str(),
            })
        })
        .collect()
}
