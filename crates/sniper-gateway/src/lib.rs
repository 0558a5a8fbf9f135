//! 실시간 이벤트 게이트웨이.
//!
//! 이 크레이트는 다음을 제공합니다:
//! - 토픽 구독 기반 WebSocket 이벤트 스트리밍
//! - 연결별 주기적 시세 틱
//! - JWT 자격 증명 검증
//! - 헬스 체크 엔드포인트
//! - Prometheus 메트릭
//!
//! # 모듈 구성
//!
//! - [`websocket`]: 게이트웨이, 구독 집합, 소켓 핸들러
//! - [`state`]: 애플리케이션 공유 상태 (AppState)
//! - [`routes`]: HTTP 라우터
//! - [`auth`]: JWT 검증
//! - [`metrics`]: Prometheus 메트릭 수집

pub mod auth;
pub mod error;
pub mod metrics;
pub mod routes;
pub mod state;
pub mod websocket;

pub use auth::{create_token, decode_token, AuthError, Claims};
pub use error::ApiErrorResponse;
pub use metrics::setup_metrics_recorder;
pub use routes::create_router;
pub use state::AppState;
pub use websocket::{Connection, Gateway, InboundOutcome, SubscriptionSet, TickSettings};
