//! WebSocket 와이어 프로토콜.
//!
//! 클라이언트-서버 간 교환되는 JSON 텍스트 프레임 정의.
//!
//! ## 클라이언트 → 서버
//!
//! ```json
//! {"type": "subscribe", "topics": ["trades", "positions"]}
//! {"type": "unsubscribe", "topics": ["trades"]}
//! ```
//!
//! ## 서버 → 클라이언트
//!
//! ```json
//! {"type": "connection", "data": {"status": "connected", "timestamp": 1700000000000}}
//! {"type": "event", "topic": "trades", "event": "trade_executed", "data": {...}, "timestamp": 1700000000000}
//! {"type": "price_update", "data": {"symbol": "SOL", "price": "101.5", "timestamp": 1700000000000}}
//! {"type": "echo", "data": {...}}
//! ```
//!
//! `connection`과 `price_update`는 `{type, data}` 형태의 단순 봉투를 사용합니다.
//! 두 형태 모두 [`Event`](crate::event::Event)로 변환됩니다.

use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ProtocolError, ProtocolResult};
use crate::event::EventKind;
use crate::topic::Topic;

// ==================== 클라이언트 → 서버 메시지 ====================

/// 클라이언트에서 서버로 보내는 제어 메시지.
///
/// 토픽은 문자열로 받고, 알 수 없는 이름은 구독 처리 시 걸러냅니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// 토픽 구독
    Subscribe {
        /// 구독할 토픽 목록
        topics: Vec<String>,
    },
    /// 토픽 구독 해제
    Unsubscribe {
        /// 구독 해제할 토픽 목록
        topics: Vec<String>,
    },
}

impl ClientMessage {
    /// 구독 메시지 생성.
    pub fn subscribe(topics: &[Topic]) -> Self {
        ClientMessage::Subscribe {
            topics: topics.iter().map(|t| t.as_str().to_string()).collect(),
        }
    }

    /// 구독 해제 메시지 생성.
    pub fn unsubscribe(topics: &[Topic]) -> Self {
        ClientMessage::Unsubscribe {
            topics: topics.iter().map(|t| t.as_str().to_string()).collect(),
        }
    }

    /// JSON 문자열로 직렬화.
    pub fn to_json(&self) -> ProtocolResult<String> {
        serde_json::to_string(self).map_err(ProtocolError::from)
    }
}

/// 서버가 수신한 텍스트 프레임의 분류 결과.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundFrame {
    /// 구독/구독 해제 제어 메시지
    Control(ClientMessage),
    /// 유효한 JSON이지만 제어 메시지가 아님 (echo 대상)
    Unrecognized(Value),
}

impl InboundFrame {
    /// 텍스트 프레임 파싱.
    ///
    /// JSON이 아니면 `ProtocolError::Malformed`를 반환합니다.
    pub fn parse(text: &str) -> ProtocolResult<Self> {
        let value: Value = serde_json::from_str(text)?;

        match ClientMessage::deserialize(&value) {
            Ok(message) => Ok(InboundFrame::Control(message)),
            Err(_) => Ok(InboundFrame::Unrecognized(value)),
        }
    }
}

// ==================== 서버 → 클라이언트 메시지 ====================

/// 서버에서 클라이언트로 보내는 메시지.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// 연결 수립 알림
    Connection {
        /// 연결 상태
        data: ConnectionStatus,
    },
    /// 도메인 이벤트 (표준 봉투)
    Event {
        /// 이벤트 토픽
        topic: Topic,
        /// 이벤트 종류 (예: "trade_executed")
        event: String,
        /// 이벤트 페이로드
        data: Value,
        /// 서버 타임스탬프 (밀리초)
        timestamp: i64,
    },
    /// 주기적 시세 틱
    PriceUpdate {
        /// 시세 데이터
        data: PriceTick,
    },
    /// 인식되지 않은 메시지 echo
    Echo {
        /// 원본 메시지
        data: Value,
    },
}

impl ServerMessage {
    /// 연결 수립 메시지 생성.
    pub fn connected() -> Self {
        ServerMessage::Connection {
            data: ConnectionStatus {
                status: "connected".to_string(),
                timestamp: Utc::now().timestamp_millis(),
            },
        }
    }

    /// 도메인 이벤트 메시지 생성.
    pub fn event(topic: Topic, kind: &EventKind, data: Value) -> Self {
        ServerMessage::Event {
            topic,
            event: kind.as_wire().to_string(),
            data,
            timestamp: Utc::now().timestamp_millis(),
        }
    }

    /// echo 메시지 생성.
    pub fn echo(original: Value) -> Self {
        ServerMessage::Echo { data: original }
    }

    /// JSON 문자열로 직렬화.
    pub fn to_json(&self) -> ProtocolResult<String> {
        serde_json::to_string(self).map_err(ProtocolError::from)
    }

    /// JSON 문자열에서 파싱.
    pub fn from_json(json: &str) -> ProtocolResult<Self> {
        serde_json::from_str(json).map_err(ProtocolError::from)
    }

    /// 메시지가 속한 토픽. 단순 봉투는 고정 토픽을 가집니다.
    pub fn topic(&self) -> Topic {
        match self {
            ServerMessage::Connection { .. } | ServerMessage::Echo { .. } => Topic::System,
            ServerMessage::Event { topic, .. } => *topic,
            ServerMessage::PriceUpdate { .. } => Topic::Tokens,
        }
    }
}

// ==================== 데이터 타입 ====================

/// 연결 상태 데이터.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionStatus {
    /// 상태 문자열 ("connected")
    pub status: String,
    /// 서버 타임스탬프 (밀리초)
    pub timestamp: i64,
}

/// 시세 틱 데이터.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceTick {
    /// 심볼
    pub symbol: String,
    /// 가격
    pub price: Decimal,
    /// 타임스탬프 (밀리초)
    pub timestamp: i64,
}
