//! 애플리케이션 공유 상태.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sniper_core::WsConfig;

use crate::websocket::Gateway;

/// 핸들러 간 공유 상태.
pub struct AppState {
    /// 이벤트 게이트웨이
    pub gateway: Arc<Gateway>,
    /// 인증되지 않은 업그레이드 거부 여부
    pub require_auth: bool,
    /// JWT 검증 시크릿
    pub jwt_secret: String,
    /// 서버 버전
    pub version: String,
    /// 서버 시작 시각
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// 새 상태 생성.
    pub fn new(gateway: Arc<Gateway>, ws: &WsConfig) -> Self {
        Self {
            gateway,
            require_auth: ws.require_auth,
            jwt_secret: ws.jwt_secret.clone(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            started_at: Utc::now(),
        }
    }

    /// 업타임 (초).
    pub fn uptime_secs(&self) -> i64 {
        (Utc::now() - self.started_at).num_seconds()
    }
}

/// 테스트용 상태 생성.
#[cfg(test)]
pub fn create_test_state() -> AppState {
    AppState::new(Arc::new(Gateway::default()), &WsConfig::default())
}
