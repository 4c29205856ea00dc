use axum::body::Body;
use axum::http::{header, HeaderValue, Method, Request, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{middleware, Router};
use tower::ServiceBuilder;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::services::ServeDir;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::response::Envelope;
use crate::state::{ApiOptions, AppState};
use crate::{metrics, realtime, routes};

/// Assembles the full application router.
pub fn router(state: AppState, options: &ApiOptions) -> Router {
    let api = Router::new()
        .nest("/auth", routes::auth::router())
        .nest("/users", routes::users::router())
        .nest("/games", routes::games::router())
        .nest("/bookings", routes::bookings::router())
        .nest("/messages", routes::messages::router())
        .nest("/admin", routes::admin::router())
        .nest("/payments", routes::payments::router())
        .nest("/upload", routes::upload::router(options.max_upload_bytes));

    let mut app = Router::new()
        .nest("/api", api)
        .route("/ws", get(realtime::upgrade))
        .route("/health", get(routes::health::health))
        .route_layer(middleware::from_fn_with_state(state.clone(), metrics::track))
        .route("/metrics", get(metrics::export));

    if let Some((root, prefix)) = &options.media {
        app = app.nest_service(prefix, ServeDir::new(root));
    }

    let layers = ServiceBuilder::new()
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(TraceLayer::new_for_http().make_span_with(|req: &Request<Body>| {
            let request_id = req
                .headers()
                .get("x-request-id")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("-");
            tracing::info_span!("http", method = %req.method(), uri = %req.uri(), request_id)
        }))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TimeoutLayer::new(options.request_timeout))
        .layer(CompressionLayer::new())
        .layer(cors(&options.cors_origins));

    app.fallback(not_found).layer(layers).with_state(state)
}

fn cors(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins.iter().filter_map(|o| HeaderValue::from_str(o).ok()).collect();
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);
    if allowed.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(AllowOrigin::list(allowed))
    }
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Envelope::<()>::failure("route not found"))
}
