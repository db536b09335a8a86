use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{COOKIE, SET_COOKIE},
        Request,
    },
    middleware::{from_fn, from_fn_with_state},
    routing::get,
    Router,
};
use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};
use tower::{Layer, ServiceBuilder};
use tower_http::{
    normalize_path::{NormalizePath, NormalizePathLayer},
    request_id::{MakeRequestId, RequestId},
    sensitive_headers::SetSensitiveRequestHeadersLayer,
    services::ServeDir,
    timeout::TimeoutLayer,
    trace::{DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
    LatencyUnit, ServiceBuilderExt,
};
use tracing::Level;

use crate::{
    auth::{self, login_required_middleware, sessions_middleware},
    boards, groups, profile,
    state::WebsiteState,
    website::{error_404, index},
};

/// Every page and endpoint of the site behind the shared middleware stack.
///
/// Trailing slashes are trimmed before routing, so the router is wrapped
/// instead of layered.
pub fn app(state: WebsiteState) -> NormalizePath<Router> {
    NormalizePathLayer::trim_trailing_slash().layer(get_router(state))
}

fn get_router(state: WebsiteState) -> Router {
    let static_dir = state.config().static_dir.clone();
    let body_limit = state.config().max_upload_size;
    let sensitive_headers: Arc<[_]> = vec![COOKIE, SET_COOKIE].into();

    let middleware = ServiceBuilder::new()
        // Keep session cookies out of the logs.
        .layer(SetSensitiveRequestHeadersLayer::from_shared(
            sensitive_headers.clone(),
        ))
        .set_x_request_id(SequentialRequestId::default())
        .layer(
            TraceLayer::new_for_http()
                .on_request(DefaultOnRequest::new())
                .on_response(
                    DefaultOnResponse::new()
                        .level(Level::INFO)
                        .latency_unit(LatencyUnit::Micros)
                        .include_headers(true),
                )
                .on_failure(DefaultOnFailure::new().level(Level::ERROR)),
        )
        .sensitive_response_headers(sensitive_headers)
        .layer(TimeoutLayer::new(Duration::from_secs(10)))
        .compression()
        .propagate_x_request_id();

    let protected = Router::new()
        .merge(boards::routes(state.clone()))
        .merge(groups::routes(state.clone()))
        .merge(profile::routes(state.clone()))
        .route_layer(from_fn(login_required_middleware));

    let pages = Router::new()
        .route("/", get(index))
        .merge(auth::routes(state.clone()))
        .merge(protected)
        .layer(from_fn_with_state(state.clone(), sessions_middleware));

    Router::new()
        .merge(pages)
        .route("/api/openapi.json", get(boards::openapi))
        .nest_service("/static", ServeDir::new(static_dir))
        .fallback(error_404)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(middleware)
        .with_state(state)
}

#[derive(Clone, Default)]
struct SequentialRequestId {
    counter: Arc<AtomicU64>,
}

impl MakeRequestId for SequentialRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        self.counter
            .fetch_add(1, Ordering::SeqCst)
            .to_string()
            .parse()
            .ok()
            .map(RequestId::new)
    }
}
