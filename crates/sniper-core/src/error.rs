//! 동기화 계층의 에러 타입.
//!
//! 와이어 프레임 파싱 실패는 `ProtocolError`로 표현됩니다.
//! 프로토콜 에러는 해당 프레임만 버리고 연결은 유지합니다.

use thiserror::Error;

/// 와이어 프로토콜 에러.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// JSON으로 파싱할 수 없는 프레임
    #[error("잘못된 프레임: {0}")]
    Malformed(String),

    /// 알 수 없는 토픽 이름
    #[error("알 수 없는 토픽: {0}")]
    UnknownTopic(String),

    /// 엔티티 스키마와 맞지 않는 페이로드
    #[error("잘못된 페이로드: {0}")]
    InvalidPayload(String),

    /// 지원하지 않는 프레임 타입 (바이너리 등)
    #[error("지원되지 않는 프레임: {0}")]
    Unsupported(String),
}

/// 프로토콜 작업을 위한 Result 타입.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

impl From<serde_json::Error> for ProtocolError {
    fn from(err: serde_json::Error) -> Self {
        ProtocolError::Malformed(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_serde_error() {
        let err: ProtocolError = serde_json::from_str::<serde_json::Value>("{not json")
            .unwrap_err()
            .into();
        assert!(matches!(err, ProtocolError::Malformed(_)));
    }
}
