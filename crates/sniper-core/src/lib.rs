//! # Sniper Core
//!
//! 실시간 동기화 계층의 공통 타입을 제공합니다.
//!
//! 게이트웨이 서버와 클라이언트 동기화 에이전트가 함께 사용하는 타입:
//! - 구독 토픽 ([`Topic`])
//! - 도메인 엔티티 (토큰, 거래, 포지션, 전략)
//! - 와이어 프로토콜 메시지와 내부 이벤트 표현
//! - 설정 관리
//! - 로깅 인프라

pub mod config;
pub mod domain;
pub mod error;
pub mod event;
pub mod logging;
pub mod protocol;
pub mod topic;

pub use config::*;
pub use domain::*;
pub use error::*;
pub use event::*;
pub use logging::*;
pub use protocol::*;
pub use topic::*;
