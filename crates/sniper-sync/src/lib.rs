//! 대시보드 클라이언트 동기화 계층.
//!
//! 이 크레이트는 다음을 제공합니다:
//! - [`SyncAgent`]: 재연결하는 이벤트 스트림 연결
//! - [`Dispatcher`]: 이벤트 종류별 캐시 갱신 및 알림
//! - [`DomainCaches`]: 토큰/거래/포지션/전략 인메모리 캐시
//! - [`OptimisticCoordinator`]: 낙관적 변경과 실패 시 롤백
//! - [`RestClient`]: REST 협력 서버 클라이언트

pub mod agent;
pub mod cache;
pub mod dispatch;
pub mod error;
pub mod notify;
pub mod optimistic;
pub mod rest;
pub mod transport;

pub use agent::{ConnectionState, SyncAgent};
pub use cache::{CacheEntity, DomainCache, DomainCaches, InsertOrder, UpsertOutcome};
pub use dispatch::Dispatcher;
pub use error::{ApiError, SyncError};
pub use notify::{ChannelNotifier, LogNotifier, Notification, NotificationLevel, NotificationSink};
pub use optimistic::OptimisticCoordinator;
pub use rest::{MutationApi, RestClient};
pub use transport::{Connector, Link, LinkEvent, WsConnector};
