//! HTTP 라우터 구성.

pub mod health;

use std::sync::Arc;

use axum::{extract::State, routing::get, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::state::AppState;
use crate::websocket::websocket_router;

pub use health::{health_check, health_router, HealthResponse};

/// 전체 라우터 생성.
///
/// 메트릭 핸들이 없으면 `/metrics` 라우트를 등록하지 않습니다.
pub fn create_router(
    state: Arc<AppState>,
    metrics_handle: Option<PrometheusHandle>,
    cors_origins: &[String],
) -> Router {
    let mut router = Router::new()
        .merge(health_router())
        .merge(websocket_router())
        .with_state(state);

    if let Some(handle) = metrics_handle {
        // 메트릭 라우터 (별도 상태)
        let metrics_router = Router::new()
            .route("/metrics", get(metrics_handler))
            .with_state(handle);
        router = router.merge(metrics_router);
    }

    router
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(cors_origins))
}

/// Prometheus 메트릭 렌더링.
///
/// GET /metrics
async fn metrics_handler(State(handle): State<PrometheusHandle>) -> String {
    handle.render()
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let parsed: Vec<_> = origins
        .iter()
        .filter_map(|s| s.trim().parse().ok())
        .collect();

    let allow_origin = if parsed.is_empty() {
        if !origins.is_empty() {
            warn!("cors_origins contains no valid origins, allowing any");
        }
        AllowOrigin::any()
    } else {
        info!("CORS configured with {} allowed origins", parsed.len());
        AllowOrigin::list(parsed)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any)
}
