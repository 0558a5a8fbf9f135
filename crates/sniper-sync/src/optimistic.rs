//! 낙관적 변경 조정.
//!
//! 변경을 캐시에 먼저 반영하고 권위 있는 요청을 보냅니다.
//! 요청이 실패하면 필드를 이전 값으로 되돌리고 에러 알림을 한 번 보냅니다.
//! 서로 다른 엔티티에 대한 변경은 독립적입니다.

use std::sync::Arc;

use serde_json::Value;
use sniper_core::PositionStatus;
use tracing::{info, warn};

use crate::cache::{CacheEntity, DomainCache, DomainCaches};
use crate::error::{ApiError, SyncError};
use crate::notify::{Notification, NotificationSink};
use crate::rest::MutationApi;

/// 낙관적 변경 코디네이터.
#[derive(Clone)]
pub struct OptimisticCoordinator {
    caches: Arc<DomainCaches>,
    api: Arc<dyn MutationApi>,
    notifier: Arc<dyn NotificationSink>,
}

impl OptimisticCoordinator {
    pub fn new(
        caches: Arc<DomainCaches>,
        api: Arc<dyn MutationApi>,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            caches,
            api,
            notifier,
        }
    }

    /// 전략 실행 여부를 바꿉니다.
    ///
    /// `active`면 start, 아니면 pause 요청을 보냅니다.
    pub async fn set_strategy_active(&self, id: &str, active: bool) -> Result<Value, SyncError> {
        let api = self.api.clone();
        let request_id = id.to_string();
        let label = if active { "start" } else { "pause" };

        self.apply(
            &self.caches.strategies,
            id,
            "is_active",
            Value::Bool(active),
            label,
            async move {
                if active {
                    api.start_strategy(&request_id).await
                } else {
                    api.pause_strategy(&request_id).await
                }
            },
        )
        .await
    }

    /// 포지션 청산을 요청합니다. 상태는 즉시 `CLOSING`이 됩니다.
    pub async fn close_position(&self, id: &str) -> Result<Value, SyncError> {
        let api = self.api.clone();
        let request_id = id.to_string();
        let closing = serde_json::to_value(PositionStatus::Closing)
            .map_err(|e| SyncError::Config(e.to_string()))?;

        self.apply(
            &self.caches.positions,
            id,
            "status",
            closing,
            "close",
            async move { api.close_position(&request_id).await },
        )
        .await
    }

    async fn apply<T, F>(
        &self,
        cache: &DomainCache<T>,
        id: &str,
        field: &str,
        speculative: Value,
        label: &str,
        request: F,
    ) -> Result<Value, SyncError>
    where
        T: CacheEntity,
        F: std::future::Future<Output = Result<Value, ApiError>>,
    {
        let prior = cache
            .replace_field(id, field, speculative)
            .await?
            .ok_or_else(|| SyncError::not_found(T::KIND, id))?;

        match request.await {
            Ok(data) => {
                info!(kind = T::KIND, id, action = label, "Mutation confirmed");
                Ok(data)
            }
            Err(e) => {
                warn!(kind = T::KIND, id, action = label, error = %e, "Mutation failed, rolling back");
                if let Err(rollback) = cache.replace_field(id, field, prior).await {
                    warn!(kind = T::KIND, id, error = %rollback, "Rollback rejected");
                }
                self.notifier
                    .notify(Notification::error(
                        format!("Failed to {} {}", label, T::KIND),
                        e.to_string(),
                    ))
                    .await;
                Err(SyncError::Application(e))
            }
        }
    }
}
