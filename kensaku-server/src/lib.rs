//! kensaku - FHIR search expression compiler service
//!
//! Exposes the search compiler over HTTP so clients can inspect how a
//! search query is interpreted.

pub mod config;
pub mod handlers;

use axum::{http::Method, routing::get, Router};
use kensaku_core::SearchParamRegistry;
use kensaku_search::{DefaultReferenceParser, ExpressionParser};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Application state
pub struct AppState {
    pub config: config::ServerConfig,
    pub registry: Arc<SearchParamRegistry>,
    pub parser: ExpressionParser,
}

impl AppState {
    /// Build the state with the built-in parameter registry.
    pub fn new(config: config::ServerConfig) -> Result<Self, Box<dyn std::error::Error>> {
        Self::with_registry(config, SearchParamRegistry::new())
    }

    pub fn with_registry(
        config: config::ServerConfig,
        registry: SearchParamRegistry,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let registry = Arc::new(registry);
        let references = match config.search.base_url.as_deref() {
            Some(base_url) => DefaultReferenceParser::with_base_url(base_url)?,
            None => DefaultReferenceParser::new(),
        }
        .with_definitions(registry.clone());
        let parser = ExpressionParser::new(registry.clone(), Arc::new(references));

        Ok(Self {
            config,
            registry,
            parser,
        })
    }
}

/// Build the application router with all routes and middleware
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::metadata::health_check))
        .route("/metadata", get(handlers::metadata::capability_statement))
        .route(
            "/{resource_type}/$compile-search",
            get(handlers::compile::compile_search),
        )
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
