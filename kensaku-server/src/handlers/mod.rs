pub mod compile;
pub mod metadata;

use axum::{
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Json},
};
use kensaku_core::{OperationOutcome, SearchError};
use serde_json::{json, Value};

pub type HandlerError = (StatusCode, HeaderMap, Json<Value>);

fn fhir_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/fhir+json; charset=utf-8"),
    );
    headers
}

/// Build a FHIR JSON response
pub fn fhir_response(status: StatusCode, body: Value) -> impl IntoResponse {
    (status, fhir_headers(), Json(body))
}

/// Map a compiler error to an OperationOutcome response.
/// Unknown resource types are 404, everything else 400.
pub fn error_response(err: &SearchError) -> HandlerError {
    let status = match err {
        SearchError::ResourceNotSupported(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::BAD_REQUEST,
    };
    (status, fhir_headers(), Json(json!(OperationOutcome::from(err))))
}
