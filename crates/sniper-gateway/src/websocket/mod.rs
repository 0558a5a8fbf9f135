//! 실시간 이벤트 스트리밍을 위한 WebSocket 게이트웨이.
//!
//! # 구독 토픽
//!
//! `tokens`, `trades`, `positions`, `strategies`, `risk`, `metrics`, `system`
//!
//! # 메시지 형식
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
//! `price_update` 틱은 구독과 무관하게 모든 연결로 전송되고,
//! `event` 메시지는 해당 토픽을 구독한 연결에만 전송됩니다.

pub mod gateway;
pub mod handler;
pub mod subscriptions;
pub mod ticker;

pub use gateway::{Connection, ConnectionId, Gateway, InboundOutcome, TickSettings};
pub use handler::{websocket_handler, websocket_router, WsParams};
pub use subscriptions::{ClientSession, SubscriptionSet};
pub use ticker::{spawn_ticker, PriceWalk, TickerGuard};
