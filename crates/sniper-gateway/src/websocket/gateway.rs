//! 이벤트 게이트웨이.
//!
//! 연결 레지스트리와 프레임 처리를 담당합니다. 전역 상태 없이
//! `main`에서 생성한 [`Gateway`]를 공유해 사용합니다.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::Value;
use sniper_core::{ClientMessage, EventKind, InboundFrame, ServerMessage, Topic, WsConfig};
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info, warn};

use super::subscriptions::ClientSession;
use super::ticker::{spawn_ticker, PriceWalk, TickerGuard};
use crate::metrics::{record_event_published, record_inbound_frame, set_websocket_connections};

/// 연결 ID.
pub type ConnectionId = String;

/// 시세 틱 설정.
#[derive(Debug, Clone)]
pub struct TickSettings {
    /// 틱 간격
    pub interval: Duration,
    /// 심볼
    pub symbol: String,
    /// 시작 가격
    pub base_price: Decimal,
}

impl Default for TickSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(5000),
            symbol: "SOL".to_string(),
            base_price: dec!(100),
        }
    }
}

impl From<&WsConfig> for TickSettings {
    fn from(config: &WsConfig) -> Self {
        Self {
            interval: config.tick_interval(),
            symbol: config.tick_symbol.clone(),
            ..Default::default()
        }
    }
}

/// 수신 프레임 처리 결과.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundOutcome {
    /// 구독 추가 (유효한 토픽만)
    Subscribed(Vec<Topic>),
    /// 구독 해제 (유효한 토픽만)
    Unsubscribed(Vec<Topic>),
    /// echo 응답 전송
    Echoed,
    /// 처리하지 않고 버림 (JSON 아님 또는 알 수 없는 연결)
    Dropped,
}

impl InboundOutcome {
    fn label(&self) -> &'static str {
        match self {
            InboundOutcome::Subscribed(_) => "subscribe",
            InboundOutcome::Unsubscribed(_) => "unsubscribe",
            InboundOutcome::Echoed => "echo",
            InboundOutcome::Dropped => "dropped",
        }
    }
}

/// 수락된 연결. 송신 프레임 수신기를 포함합니다.
pub struct Connection {
    /// 세션 정보
    pub session: Arc<ClientSession>,
    /// 이 연결로 보낼 메시지 수신기
    pub outbound: mpsc::UnboundedReceiver<ServerMessage>,
}

impl Connection {
    pub fn id(&self) -> &str {
        &self.session.id
    }
}

/// 레지스트리 항목. drop되면 틱 태스크도 중단됩니다.
struct ConnectionEntry {
    session: Arc<ClientSession>,
    outbound: mpsc::UnboundedSender<ServerMessage>,
    _ticker: TickerGuard,
}

/// 이벤트 게이트웨이.
pub struct Gateway {
    connections: RwLock<HashMap<ConnectionId, ConnectionEntry>>,
    active: AtomicUsize,
    tick: TickSettings,
}

impl Gateway {
    /// 새 게이트웨이 생성.
    pub fn new(tick: TickSettings) -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
            active: AtomicUsize::new(0),
            tick,
        }
    }

    /// 설정에서 게이트웨이 생성.
    pub fn from_config(config: &WsConfig) -> Self {
        Self::new(TickSettings::from(config))
    }

    /// 새 연결 수락.
    ///
    /// 빈 구독 집합으로 등록하고, 첫 송신 프레임으로 연결 수립 메시지를
    /// 넣은 뒤 틱 태스크를 시작합니다.
    pub async fn accept(&self, user_id: Option<String>) -> Connection {
        let session = Arc::new(ClientSession::new(user_id));
        let (tx, rx) = mpsc::unbounded_channel();

        // 수신기가 아직 살아 있으므로 실패하지 않음
        let _ = tx.send(ServerMessage::connected());

        let ticker = spawn_ticker(
            session.id.clone(),
            tx.clone(),
            self.tick.interval,
            PriceWalk::new(self.tick.symbol.clone(), self.tick.base_price),
        );

        let entry = ConnectionEntry {
            session: session.clone(),
            outbound: tx,
            _ticker: ticker,
        };

        // 카운터는 레지스트리 쓰기 잠금 안에서만 변경
        let count = {
            let mut connections = self.connections.write().await;
            connections.insert(session.id.clone(), entry);
            self.active.fetch_add(1, Ordering::SeqCst) + 1
        };
        set_websocket_connections(count);

        info!(
            session_id = %session.id,
            authenticated = session.is_authenticated(),
            connections = count,
            "WebSocket connected"
        );

        Connection {
            session,
            outbound: rx,
        }
    }

    /// 클라이언트 텍스트 프레임 처리.
    ///
    /// 어떤 입력도 연결을 닫지 않습니다.
    pub async fn handle_inbound(&self, session_id: &str, text: &str) -> InboundOutcome {
        let outcome = self.process_inbound(session_id, text).await;
        record_inbound_frame(outcome.label());
        outcome
    }

    async fn process_inbound(&self, session_id: &str, text: &str) -> InboundOutcome {
        let Some((session, outbound)) = self.lookup(session_id).await else {
            debug!(session_id, "Frame for unknown connection");
            return InboundOutcome::Dropped;
        };

        let frame = match InboundFrame::parse(text) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(session_id, error = %e, "Malformed frame dropped");
                return InboundOutcome::Dropped;
            }
        };

        match frame {
            InboundFrame::Control(ClientMessage::Subscribe { topics }) => {
                let topics = known_topics(session_id, &topics);
                session.subscribe(&topics).await;
                debug!(session_id, ?topics, "Subscribed");
                InboundOutcome::Subscribed(topics)
            }
            InboundFrame::Control(ClientMessage::Unsubscribe { topics }) => {
                let topics = known_topics(session_id, &topics);
                session.unsubscribe(&topics).await;
                debug!(session_id, ?topics, "Unsubscribed");
                InboundOutcome::Unsubscribed(topics)
            }
            InboundFrame::Unrecognized(value) => {
                debug!(session_id, "Echoing unrecognized message");
                let _ = outbound.send(ServerMessage::echo(value));
                InboundOutcome::Echoed
            }
        }
    }

    /// 연결 종료. 멱등입니다.
    ///
    /// 레지스트리 항목을 제거하면 틱 태스크가 중단되고 송신 채널이 닫힙니다.
    pub async fn close(&self, session_id: &str) -> bool {
        let removed = {
            let mut connections = self.connections.write().await;
            connections
                .remove(session_id)
                .map(|entry| (entry, self.active.fetch_sub(1, Ordering::SeqCst) - 1))
        };

        match removed {
            Some((entry, count)) => {
                drop(entry);
                set_websocket_connections(count);
                info!(session_id, connections = count, "WebSocket disconnected");
                true
            }
            None => false,
        }
    }

    /// 모든 연결 종료 (서버 종료 시).
    pub async fn close_all(&self) -> usize {
        let (drained, count) = {
            let mut connections = self.connections.write().await;
            let drained: Vec<_> = connections.drain().collect();
            let count = self.active.fetch_sub(drained.len(), Ordering::SeqCst) - drained.len();
            (drained, count)
        };
        let closed = drained.len();
        drop(drained);

        set_websocket_connections(count);
        if closed > 0 {
            info!(closed, "All WebSocket connections closed");
        }
        closed
    }

    /// 토픽을 구독한 모든 연결에 표준 이벤트를 발행합니다.
    ///
    /// 수신자 수를 반환합니다.
    pub async fn publish(&self, topic: Topic, kind: &EventKind, data: Value) -> usize {
        let message = ServerMessage::event(topic, kind, data);
        let connections = self.connections.read().await;
        let mut recipients = 0;

        for entry in connections.values() {
            if entry.session.is_subscribed(topic).await
                && entry.outbound.send(message.clone()).is_ok()
            {
                recipients += 1;
            }
        }

        record_event_published(topic.as_str(), recipients);
        debug!(%topic, event = kind.as_wire(), recipients, "Event published");
        recipients
    }

    /// 활성 연결 수.
    pub fn connection_count(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// 토픽 구독자 수.
    pub async fn subscriber_count(&self, topic: Topic) -> usize {
        let connections = self.connections.read().await;
        let mut count = 0;
        for entry in connections.values() {
            if entry.session.is_subscribed(topic).await {
                count += 1;
            }
        }
        count
    }

    async fn lookup(
        &self,
        session_id: &str,
    ) -> Option<(Arc<ClientSession>, mpsc::UnboundedSender<ServerMessage>)> {
        self.connections
            .read()
            .await
            .get(session_id)
            .map(|entry| (entry.session.clone(), entry.outbound.clone()))
    }
}

impl Default for Gateway {
    fn default() -> Self {
        Self::new(TickSettings::default())
    }
}

/// 알 수 없는 토픽 이름을 경고 로그와 함께 걸러냅니다.
fn known_topics(session_id: &str, names: &[String]) -> Vec<Topic> {
    let (topics, unknown) = Topic::partition_names(names);
    for name in unknown {
        warn!(session_id, topic = %name, "Unknown topic skipped");
    }
    topics
}
