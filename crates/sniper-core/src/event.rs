//! 내부 이벤트 표현.
//!
//! 두 가지 와이어 봉투(`{topic, event, data}`와 `{type, data}`)를
//! 하나의 [`Event`]로 통일합니다. 이벤트 종류는 닫힌 열거형이며
//! 알 수 없는 종류는 [`EventKind::Unhandled`]로 보존됩니다.

use serde_json::Value;

use crate::protocol::ServerMessage;
use crate::topic::Topic;

/// 이벤트 종류.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// 연결 수립 (`{type: "connection"}`)
    ConnectionEstablished,
    /// 주기적 시세 틱 (`{type: "price_update"}`)
    PriceUpdate,
    /// 서버 echo
    Echo,
    /// 새 토큰 발견
    TokenDiscovered,
    /// 토큰 정보 변경
    TokenUpdated,
    /// 토큰 모니터링 제외
    TokenRemoved,
    /// 거래 체결
    TradeExecuted,
    /// 거래 상태 변경
    TradeUpdated,
    /// 거래 실패
    TradeFailed,
    /// 포지션 진입
    PositionOpened,
    /// 포지션 변경
    PositionUpdated,
    /// 포지션 청산
    PositionClosed,
    /// 전략 생성
    StrategyCreated,
    /// 전략 변경
    StrategyUpdated,
    /// 전략 삭제
    StrategyDeleted,
    /// 리스크 경고
    RiskAlert,
    /// 성과 지표 갱신
    MetricsUpdate,
    /// 시스템 상태
    SystemStatus,
    /// 처리기가 없는 종류
    Unhandled(String),
}

impl EventKind {
    /// 와이어 이름에서 이벤트 종류 파싱.
    pub fn from_wire(name: &str) -> Self {
        match name {
            "connection" => EventKind::ConnectionEstablished,
            "price_update" => EventKind::PriceUpdate,
            "echo" => EventKind::Echo,
            "token_discovered" => EventKind::TokenDiscovered,
            "token_updated" => EventKind::TokenUpdated,
            "token_removed" => EventKind::TokenRemoved,
            "trade_executed" => EventKind::TradeExecuted,
            "trade_updated" => EventKind::TradeUpdated,
            "trade_failed" => EventKind::TradeFailed,
            "position_opened" => EventKind::PositionOpened,
            "position_updated" => EventKind::PositionUpdated,
            "position_closed" => EventKind::PositionClosed,
            "strategy_created" => EventKind::StrategyCreated,
            "strategy_updated" => EventKind::StrategyUpdated,
            "strategy_deleted" => EventKind::StrategyDeleted,
            "risk_alert" => EventKind::RiskAlert,
            "metrics_update" => EventKind::MetricsUpdate,
            "system_status" => EventKind::SystemStatus,
            other => EventKind::Unhandled(other.to_string()),
        }
    }

    /// 와이어 이름.
    pub fn as_wire(&self) -> &str {
        match self {
            EventKind::ConnectionEstablished => "connection",
            EventKind::PriceUpdate => "price_update",
            EventKind::Echo => "echo",
            EventKind::TokenDiscovered => "token_discovered",
            EventKind::TokenUpdated => "token_updated",
            EventKind::TokenRemoved => "token_removed",
            EventKind::TradeExecuted => "trade_executed",
            EventKind::TradeUpdated => "trade_updated",
            EventKind::TradeFailed => "trade_failed",
            EventKind::PositionOpened => "position_opened",
            EventKind::PositionUpdated => "position_updated",
            EventKind::PositionClosed => "position_closed",
            EventKind::StrategyCreated => "strategy_created",
            EventKind::StrategyUpdated => "strategy_updated",
            EventKind::StrategyDeleted => "strategy_deleted",
            EventKind::RiskAlert => "risk_alert",
            EventKind::MetricsUpdate => "metrics_update",
            EventKind::SystemStatus => "system_status",
            EventKind::Unhandled(name) => name,
        }
    }

    /// 이 종류가 일반적으로 발행되는 토픽.
    pub fn topic(&self) -> Option<Topic> {
        match self {
            EventKind::ConnectionEstablished | EventKind::Echo | EventKind::SystemStatus => {
                Some(Topic::System)
            }
            EventKind::PriceUpdate
            | EventKind::TokenDiscovered
            | EventKind::TokenUpdated
            | EventKind::TokenRemoved => Some(Topic::Tokens),
            EventKind::TradeExecuted | EventKind::TradeUpdated | EventKind::TradeFailed => {
                Some(Topic::Trades)
            }
            EventKind::PositionOpened
            | EventKind::PositionUpdated
            | EventKind::PositionClosed => Some(Topic::Positions),
            EventKind::StrategyCreated
            | EventKind::StrategyUpdated
            | EventKind::StrategyDeleted => Some(Topic::Strategies),
            EventKind::RiskAlert => Some(Topic::Risk),
            EventKind::MetricsUpdate => Some(Topic::Metrics),
            EventKind::Unhandled(_) => None,
        }
    }
}

/// 토픽, 종류, 페이로드, 타임스탬프로 구성된 도메인 이벤트.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// 토픽
    pub topic: Topic,
    /// 이벤트 종류
    pub kind: EventKind,
    /// 페이로드
    pub payload: Value,
    /// 타임스탬프 (밀리초)
    pub timestamp: i64,
}

impl Event {
    /// 새 이벤트 생성.
    pub fn new(topic: Topic, kind: EventKind, payload: Value, timestamp: i64) -> Self {
        Self {
            topic,
            kind,
            payload,
            timestamp,
        }
    }
}

impl From<ServerMessage> for Event {
    fn from(message: ServerMessage) -> Self {
        let topic = message.topic();

        match message {
            ServerMessage::Connection { data } => {
                let timestamp = data.timestamp;
                let payload = serde_json::to_value(data).unwrap_or_default();
                Event::new(topic, EventKind::ConnectionEstablished, payload, timestamp)
            }
            ServerMessage::PriceUpdate { data } => {
                let timestamp = data.timestamp;
                let payload = serde_json::to_value(data).unwrap_or_default();
                Event::new(topic, EventKind::PriceUpdate, payload, timestamp)
            }
            ServerMessage::Event {
                event,
                data,
                timestamp,
                ..
            } => Event::new(topic, EventKind::from_wire(&event), data, timestamp),
            ServerMessage::Echo { data } => Event::new(topic, EventKind::Echo, data, 0),
        }
    }
}
