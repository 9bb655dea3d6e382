use axum::{Router, body::Body, http::Request};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{Span, info_span};

/// Version header sent by broker platforms; recorded, not enforced.
pub const BROKER_API_VERSION_HEADER: &str = "X-Broker-API-Version";

fn broker_span(req: &Request<Body>) -> Span {
    let api_version = req
        .headers()
        .get(BROKER_API_VERSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-");
    info_span!(
        "broker_request",
        method = %req.method(),
        path = %req.uri().path(),
        api_version,
    )
}

/// Wrap broker routes with per-request spans and permissive CORS.
pub fn with_middleware<S>(router: Router<S>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http().make_span_with(broker_span))
            .layer(CorsLayer::permissive()),
    )
}
