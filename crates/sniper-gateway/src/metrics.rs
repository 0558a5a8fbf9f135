//! Prometheus 메트릭 설정 및 유틸리티.
//!
//! WebSocket 연결/프레임/이벤트 메트릭을 수집하고 `/metrics` 엔드포인트로 노출합니다.

use metrics::{counter, gauge};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

/// 활성 연결 수 게이지.
pub const CONNECTIONS_ACTIVE: &str = "websocket_connections_active";
/// 수신 프레임 카운터.
pub const FRAMES_INBOUND: &str = "websocket_frames_inbound_total";
/// 발행 이벤트 카운터.
pub const EVENTS_PUBLISHED: &str = "websocket_events_published_total";

/// Prometheus 메트릭 레코더를 설치하고 핸들을 반환합니다.
///
/// 레코더가 이미 설치되어 있으면 에러를 반환합니다.
pub fn setup_metrics_recorder() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// WebSocket 연결 수 설정.
pub fn set_websocket_connections(count: usize) {
    gauge!(CONNECTIONS_ACTIVE).set(count as f64);
}

/// 수신 프레임 카운터 증가.
pub fn record_inbound_frame(outcome: &'static str) {
    counter!(FRAMES_INBOUND, "outcome" => outcome).increment(1);
}

/// 발행 이벤트 카운터 증가.
pub fn record_event_published(topic: &'static str, recipients: usize) {
    counter!(EVENTS_PUBLISHED, "topic" => topic).increment(recipients as u64);
}
