//! HTTP pipeline collaborators: CORS, request filters, API doc groups and
//! the object mapper registry.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tower_http::cors::CorsLayer;

use crate::contracts::RequestFilter;
use quay_bootstrap::config::DocGroup;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorsMode {
    Disabled,
    AllowAll,
}

/// Layer permissive CORS over the router when enabled.
pub fn apply_cors(router: Router, mode: CorsMode) -> Router {
    match mode {
        CorsMode::Disabled => router,
        CorsMode::AllowAll => router.layer(CorsLayer::very_permissive()),
    }
}

/// Published API documentation groups.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ApiDocs {
    pub groups: Vec<DocGroup>,
}

impl ApiDocs {
    pub fn new(groups: Vec<DocGroup>) -> Self {
        Self { groups }
    }

    /// Whether `operation` belongs to the named group. A `*` keyword claims
    /// everything; otherwise membership is a prefix match on the keyword.
    pub fn includes(&self, group: &str, operation: &str) -> bool {
        self.groups
            .iter()
            .filter(|g| g.name == group)
            .any(|g| g.keyword == "*" || operation.starts_with(&g.keyword))
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// Router serving the configured doc groups.
pub fn docs_router(docs: &ApiDocs) -> Router {
    let groups = docs.groups.clone();
    Router::new().route(
        "/api-docs",
        get(move || {
            let groups = groups.clone();
            async move { Json(groups) }
        }),
    )
}

type MapFn = Box<dyn Fn(&dyn std::any::Any) -> Box<dyn std::any::Any> + Send + Sync>;

/// Registered conversions between value types, keyed by source and target.
#[derive(Default)]
pub struct MapperRegistry {
    maps: HashMap<(TypeId, TypeId), MapFn>,
}

impl std::fmt::Debug for MapperRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapperRegistry")
            .field("maps", &self.maps.len())
            .finish()
    }
}

impl MapperRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<S: 'static, T: 'static>(&mut self, map: fn(&S) -> T) {
        self.maps.insert(
            (TypeId::of::<S>(), TypeId::of::<T>()),
            Box::new(move |source| {
                let source = source
                    .downcast_ref::<S>()
                    .unwrap_or_else(|| unreachable!("mapper keyed by source TypeId"));
                Box::new(map(source))
            }),
        );
    }

    pub fn map<S: 'static, T: 'static>(&self, source: &S) -> Option<T> {
        let map = self.maps.get(&(TypeId::of::<S>(), TypeId::of::<T>()))?;
        map(source).downcast::<T>().ok().map(|b| *b)
    }

    pub fn len(&self) -> usize {
        self.maps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.maps.is_empty()
    }
}

/// Intrinsic filter: logs every request before routing.
pub struct RequestLogFilter;

impl RequestFilter for RequestLogFilter {
    fn name(&self) -> &'static str {
        "request_log"
    }

    fn on_request(&self, parts: &axum::http::request::Parts) -> Result<(), axum::http::StatusCode> {
        tracing::info!(method = %parts.method, uri = %parts.uri, "request");
        Ok(())
    }
}

type FilterChain = Arc<Vec<Arc<dyn RequestFilter>>>;

async fn run_filters(State(filters): State<FilterChain>, request: Request, next: Next) -> Response {
    let (parts, body) = request.into_parts();
    for filter in filters.iter() {
        if let Err(status) = filter.on_request(&parts) {
            tracing::warn!(filter = filter.name(), status = %status, "request rejected");
            return status.into_response();
        }
    }
    next.run(Request::from_parts(parts, body)).await
}

/// Layer the filter chain over the router. Filters run in registration
/// order; the first rejection wins.
pub fn apply_filters(router: Router, filters: Vec<Arc<dyn RequestFilter>>) -> Router {
    if filters.is_empty() {
        return router;
    }
    let chain: FilterChain = Arc::new(filters);
    router.layer(middleware::from_fn_with_state(chain, run_filters))
}
