//! 동기화 에러 타입.

use sniper_core::ProtocolError;
use thiserror::Error;

/// 동기화 에이전트 및 낙관적 변경 관련 에러.
#[derive(Debug, Error)]
pub enum SyncError {
    /// 전송 계층 연결 에러 (재연결로 처리)
    #[error("Connection error: {0}")]
    Connection(String),

    /// 프레임 파싱/페이로드 에러
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// 서버가 거부한 변경 요청
    #[error("Application error: {0}")]
    Application(#[from] ApiError),

    /// 캐시에 없는 엔티티
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// 명시적으로 종료된 에이전트
    #[error("Agent terminated")]
    Terminated,

    /// 잘못된 설정
    #[error("Config error: {0}")]
    Config(String),
}

impl SyncError {
    /// 엔티티 미존재 에러 생성.
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        SyncError::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// 재시도 가능한 에러인지 확인.
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Connection(_) => true,
            SyncError::Application(e) => e.is_retryable(),
            _ => false,
        }
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for SyncError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        SyncError::Connection(err.to_string())
    }
}

/// REST 협력 서버 에러.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ApiError {
    /// 404
    #[error("Not found: {0}")]
    NotFound(String),

    /// 400
    #[error("Validation failed: {0}")]
    Validation(String),

    /// 기타 비정상 상태 코드
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// 네트워크/타임아웃
    #[error("Network error: {0}")]
    Network(String),

    /// 응답 파싱 실패
    #[error("Decode error: {0}")]
    Decode(String),
}

impl ApiError {
    /// 재시도 가능한 에러인지 확인.
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::Network(_) => true,
            ApiError::Status { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else {
            ApiError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Decode(err.to_string())
    }
}
