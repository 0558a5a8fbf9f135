//! 이벤트 디스패치.
//!
//! 이벤트 종류마다 정확히 하나의 처리기가 있습니다. 처리기는 도메인
//! 캐시를 갱신하고 필요하면 알림을 보냅니다.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde_json::Value;
use sniper_core::{
    Event, EventKind, Position, ProtocolError, ProtocolResult, ServerMessage, Strategy, Token,
    Trade,
};
use tracing::{debug, warn};

use crate::cache::{key_of, parse_entity, CacheEntity, DomainCache, DomainCaches};
use crate::notify::{Notification, NotificationSink};

/// 정상으로 간주하는 시스템 상태 값.
const HEALTHY_STATUSES: [&str; 2] = ["ok", "healthy"];

/// 이벤트를 캐시와 알림으로 전달하는 디스패처.
#[derive(Clone)]
pub struct Dispatcher {
    caches: Arc<DomainCaches>,
    notifier: Arc<dyn NotificationSink>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("notifier", &self.notifier.name())
            .finish()
    }
}

impl Dispatcher {
    pub fn new(caches: Arc<DomainCaches>, notifier: Arc<dyn NotificationSink>) -> Self {
        Self { caches, notifier }
    }

    pub fn caches(&self) -> &Arc<DomainCaches> {
        &self.caches
    }

    /// 텍스트 프레임을 파싱해서 처리합니다.
    pub async fn dispatch_frame(&self, text: &str) -> ProtocolResult<()> {
        let event = Event::from(ServerMessage::from_json(text)?);
        self.dispatch(&event).await
    }

    /// 이벤트 하나를 처리합니다.
    ///
    /// 페이로드 에러는 반환되지만 캐시는 부분적으로 바뀌지 않습니다.
    pub async fn dispatch(&self, event: &Event) -> ProtocolResult<()> {
        let payload = &event.payload;

        match &event.kind {
            EventKind::ConnectionEstablished => {
                debug!(payload = %payload, "Connection established");
            }
            EventKind::Echo => {
                debug!(payload = %payload, "Echo received");
            }
            EventKind::PriceUpdate => self.on_price_update(payload).await?,

            EventKind::TokenDiscovered => {
                let token = self.insert::<Token>(&self.caches.tokens, payload).await?;
                self.notifier
                    .notify(Notification::info(
                        "New token discovered",
                        format!("{} ({})", token.symbol, token.mint),
                    ))
                    .await;
            }
            EventKind::TokenUpdated => {
                self.update(&self.caches.tokens, payload).await?;
            }
            EventKind::TokenRemoved => self.remove(&self.caches.tokens, payload).await?,

            EventKind::TradeExecuted => {
                self.caches.trades.upsert_merge(payload).await?;
                let key = key_of::<Trade>(payload)?;
                if let Some(trade) = self.caches.trades.get(&key).await {
                    self.notifier
                        .notify(Notification::success(
                            "Trade executed",
                            format!(
                                "{} {} for ${}",
                                trade.side, trade.token_symbol, trade.amount_usd
                            ),
                        ))
                        .await;
                }
            }
            EventKind::TradeUpdated => {
                self.update(&self.caches.trades, payload).await?;
            }
            EventKind::TradeFailed => {
                let mut partial = payload.clone();
                if let Value::Object(fields) = &mut partial {
                    fields
                        .entry("status")
                        .or_insert_with(|| Value::String("FAILED".to_string()));
                }
                // 캐시에 없는 거래의 실패는 알리지 않음
                if self.update(&self.caches.trades, &partial).await? {
                    let reason = payload
                        .get("error_message")
                        .and_then(Value::as_str)
                        .unwrap_or("unknown error");
                    self.notifier
                        .notify(Notification::error("Trade failed", reason))
                        .await;
                }
            }

            EventKind::PositionOpened => {
                let position = self
                    .insert::<Position>(&self.caches.positions, payload)
                    .await?;
                self.notifier
                    .notify(Notification::info(
                        "Position opened",
                        format!("{} via {}", position.token_symbol, position.strategy_name),
                    ))
                    .await;
            }
            EventKind::PositionUpdated => {
                self.update(&self.caches.positions, payload).await?;
            }
            EventKind::PositionClosed => {
                let key = key_of::<Position>(payload)?;
                let removed = self.caches.positions.remove(&key).await;
                let symbol = removed
                    .map(|p| p.token_symbol)
                    .unwrap_or_else(|| key.clone());
                self.notifier
                    .notify(Notification::info("Position closed", symbol))
                    .await;
            }

            EventKind::StrategyCreated => {
                self.insert::<Strategy>(&self.caches.strategies, payload)
                    .await?;
            }
            EventKind::StrategyUpdated => {
                self.update(&self.caches.strategies, payload).await?;
            }
            EventKind::StrategyDeleted => self.remove(&self.caches.strategies, payload).await?,

            EventKind::RiskAlert => {
                let message = payload
                    .get("message")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| payload.to_string());
                self.notifier
                    .notify(Notification::warning("Risk alert", message))
                    .await;
            }
            EventKind::MetricsUpdate => {
                debug!(payload = %payload, "Metrics update");
            }
            EventKind::SystemStatus => {
                let status = payload
                    .get("status")
                    .and_then(Value::as_str)
                    .unwrap_or_default();
                if !HEALTHY_STATUSES.contains(&status.to_lowercase().as_str()) {
                    let message = payload
                        .get("message")
                        .and_then(Value::as_str)
                        .unwrap_or(status);
                    self.notifier
                        .notify(Notification::warning("System status", message))
                        .await;
                }
            }

            EventKind::Unhandled(name) => {
                warn!(event = %name, topic = %event.topic, "Unhandled event kind");
            }
        }

        Ok(())
    }

    async fn on_price_update(&self, payload: &Value) -> ProtocolResult<()> {
        let symbol = payload
            .get("symbol")
            .and_then(Value::as_str)
            .ok_or_else(|| ProtocolError::InvalidPayload("price_update missing `symbol`".into()))?;
        let price: Decimal = payload
            .get("price")
            .cloned()
            .map(serde_json::from_value::<Decimal>)
            .transpose()?
            .ok_or_else(|| ProtocolError::InvalidPayload("price_update missing `price`".into()))?;

        let updated = self
            .caches
            .tokens
            .modify_where(|t| t.symbol == symbol, |t| t.price = price)
            .await;
        debug!(symbol, %price, updated, "Price tick applied");
        Ok(())
    }

    async fn insert<T: CacheEntity>(
        &self,
        cache: &DomainCache<T>,
        payload: &Value,
    ) -> ProtocolResult<T> {
        let entity = parse_entity::<T>(payload)?;
        cache.upsert_new(entity.clone()).await;
        Ok(entity)
    }

    async fn update<T: CacheEntity>(
        &self,
        cache: &DomainCache<T>,
        payload: &Value,
    ) -> ProtocolResult<bool> {
        let key = key_of::<T>(payload)?;
        let updated = cache.upsert_update(&key, payload).await?;
        if !updated {
            debug!(kind = T::KIND, key = %key, "Update for unknown key ignored");
        }
        Ok(updated)
    }

    async fn remove<T: CacheEntity>(
        &self,
        cache: &DomainCache<T>,
        payload: &Value,
    ) -> ProtocolResult<()> {
        let key = key_of::<T>(payload)?;
        if cache.remove(&key).await.is_none() {
            debug!(kind = T::KIND, key = %key, "Remove for unknown key ignored");
        }
        Ok(())
    }
}
