//! 클라이언트 동기화 에이전트.
//!
//! 게이트웨이와의 논리적 연결 하나를 유지합니다. 연결될 때마다 설정된
//! 모든 토픽을 구독하고, 끊기면 고정 지연 후 재연결합니다.
//! 수신 프레임은 드라이버 태스크 하나가 도착 순서대로 처리합니다.
//!
//! 상태 전이:
//! `Disconnected → Connecting → Connected → Reconnecting → Connecting → ...`
//! 종료 상태는 [`SyncAgent::disconnect`]로만 도달합니다.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use secrecy::SecretString;
use sniper_core::{ClientMessage, SyncConfig, Topic};
use tokio::sync::{broadcast, mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::cache::DomainCaches;
use crate::dispatch::Dispatcher;
use crate::error::SyncError;
use crate::notify::NotificationSink;
use crate::transport::{Connector, Link, LinkEvent, WsConnector};

/// 상태 전이 기록 채널 용량.
const TRANSITION_CAPACITY: usize = 64;

/// 연결 상태.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// 연결 안 됨
    Disconnected,
    /// 연결 시도 중
    Connecting,
    /// 연결됨
    Connected,
    /// 재연결 대기 중
    Reconnecting,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Reconnecting => "reconnecting",
        };
        f.write_str(name)
    }
}

/// 드라이버 태스크와 공유하는 상태.
struct Shared {
    config: SyncConfig,
    connector: Arc<dyn Connector>,
    dispatcher: Dispatcher,
    state: watch::Sender<ConnectionState>,
    transitions: broadcast::Sender<ConnectionState>,
    cancel: CancellationToken,
}

impl Shared {
    fn set_state(&self, next: ConnectionState) {
        let prev = self.state.send_replace(next);
        if prev != next {
            info!(from = %prev, to = %next, "Sync state changed");
        }
        let _ = self.transitions.send(next);
    }
}

/// 연결 종료 원인.
enum PumpExit {
    Cancelled,
    Closed(Option<String>),
}

struct DriverSlot {
    handle: JoinHandle<()>,
    commands: mpsc::UnboundedSender<String>,
}

/// 클라이언트 동기화 에이전트.
pub struct SyncAgent {
    shared: Arc<Shared>,
    credential: Option<SecretString>,
    driver: Mutex<Option<DriverSlot>>,
    terminated: AtomicBool,
}

impl fmt::Debug for SyncAgent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncAgent")
            .field("ws_url", &self.shared.config.ws_url)
            .field("state", &self.state())
            .field("terminated", &self.terminated.load(Ordering::SeqCst))
            .finish()
    }
}

impl SyncAgent {
    /// WebSocket 커넥터를 사용하는 에이전트 생성.
    pub fn new(
        config: SyncConfig,
        credential: Option<SecretString>,
        caches: Arc<DomainCaches>,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        Self::with_connector(config, credential, caches, notifier, Arc::new(WsConnector))
    }

    /// 커넥터를 지정해서 에이전트 생성.
    pub fn with_connector(
        config: SyncConfig,
        credential: Option<SecretString>,
        caches: Arc<DomainCaches>,
        notifier: Arc<dyn NotificationSink>,
        connector: Arc<dyn Connector>,
    ) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        let (transitions, _) = broadcast::channel(TRANSITION_CAPACITY);

        Self {
            shared: Arc::new(Shared {
                config,
                connector,
                dispatcher: Dispatcher::new(caches, notifier),
                state,
                transitions,
                cancel: CancellationToken::new(),
            }),
            credential,
            driver: Mutex::new(None),
            terminated: AtomicBool::new(false),
        }
    }

    /// 현재 연결 상태.
    pub fn state(&self) -> ConnectionState {
        *self.shared.state.borrow()
    }

    /// 연결 상태 관찰용 watch 수신자.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state.subscribe()
    }

    /// 모든 상태 전이를 순서대로 받는 수신자.
    pub fn state_events(&self) -> broadcast::Receiver<ConnectionState> {
        self.shared.transitions.subscribe()
    }

    pub fn caches(&self) -> &Arc<DomainCaches> {
        self.shared.dispatcher.caches()
    }

    /// 연결을 시작합니다.
    ///
    /// 자격 증명이 없으면 경고만 남기고 `Disconnected`로 남습니다.
    /// 이미 실행 중이면 아무것도 하지 않습니다.
    pub async fn connect(&self) -> Result<(), SyncError> {
        if self.terminated.load(Ordering::SeqCst) {
            return Err(SyncError::Terminated);
        }

        let Some(credential) = self.credential.clone() else {
            warn!("No credential available, staying disconnected");
            return Ok(());
        };

        let mut driver = self.driver.lock().await;
        if self.terminated.load(Ordering::SeqCst) {
            return Err(SyncError::Terminated);
        }
        if driver.as_ref().is_some_and(|d| !d.handle.is_finished()) {
            debug!("Sync agent already running");
            return Ok(());
        }

        let (commands, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(run_driver(self.shared.clone(), credential, rx));
        *driver = Some(DriverSlot { handle, commands });

        Ok(())
    }

    /// 연결을 종료합니다. 이 인스턴스는 다시 연결할 수 없습니다.
    ///
    /// 재연결 대기를 취소하고 드라이버 태스크가 끝날 때까지 기다립니다.
    /// 반환 후에는 어떤 이벤트도 처리되지 않습니다.
    pub async fn disconnect(&self) {
        self.terminated.store(true, Ordering::SeqCst);
        self.shared.cancel.cancel();

        let slot = self.driver.lock().await.take();
        if let Some(slot) = slot {
            drop(slot.commands);
            if let Err(e) = slot.handle.await {
                warn!(error = %e, "Sync driver task failed");
            }
            info!("Sync agent disconnected");
        }

        if self.state() != ConnectionState::Disconnected {
            self.shared.set_state(ConnectionState::Disconnected);
        }
    }

    /// 토픽 구독. 연결되어 있지 않으면 버려집니다.
    pub async fn subscribe(&self, topics: &[Topic]) -> bool {
        self.send_control(ClientMessage::subscribe(topics)).await
    }

    /// 토픽 구독 해제. 연결되어 있지 않으면 버려집니다.
    pub async fn unsubscribe(&self, topics: &[Topic]) -> bool {
        self.send_control(ClientMessage::unsubscribe(topics)).await
    }

    async fn send_control(&self, message: ClientMessage) -> bool {
        if self.state() != ConnectionState::Connected {
            debug!(?message, "Not connected, control message dropped");
            return false;
        }

        let text = match message.to_json() {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "Failed to encode control message");
                return false;
            }
        };

        match self.driver.lock().await.as_ref() {
            Some(slot) => slot.commands.send(text).is_ok(),
            None => false,
        }
    }
}

impl Drop for SyncAgent {
    fn drop(&mut self) {
        self.shared.cancel.cancel();
    }
}

/// 드라이버 루프. 연결, 수신 처리, 재연결 대기를 반복합니다.
///
/// 설정 오류처럼 재시도해도 성공할 수 없는 실패면 `Disconnected`로 끝납니다.
async fn run_driver(
    shared: Arc<Shared>,
    credential: SecretString,
    mut commands: mpsc::UnboundedReceiver<String>,
) {
    let delay = shared.config.reconnect_delay();

    'driver: loop {
        shared.set_state(ConnectionState::Connecting);

        let connected = tokio::select! {
            biased;
            _ = shared.cancel.cancelled() => break 'driver,
            result = shared.connector.connect(&shared.config.ws_url, &credential) => result,
        };

        match connected {
            Ok(link) => {
                shared.set_state(ConnectionState::Connected);

                // 연결 전에 들어온 명령은 버림
                while commands.try_recv().is_ok() {}

                match pump(&shared, link, &mut commands).await {
                    PumpExit::Cancelled => break 'driver,
                    PumpExit::Closed(reason) => {
                        warn!(reason = reason.as_deref().unwrap_or("none"), "Connection lost");
                    }
                }
            }
            Err(e) if !e.is_retryable() => {
                error!(error = %e, "Connection cannot succeed, giving up");
                break 'driver;
            }
            Err(e) => {
                warn!(error = %e, "Connection attempt failed");
            }
        }

        if !shared.config.auto_reconnect {
            break 'driver;
        }

        shared.set_state(ConnectionState::Reconnecting);
        debug!(delay_ms = delay.as_millis() as u64, "Waiting before reconnect");

        let wait = tokio::time::sleep(delay);
        tokio::pin!(wait);
        loop {
            tokio::select! {
                biased;
                _ = shared.cancel.cancelled() => break 'driver,
                _ = &mut wait => break,
                Some(_) = commands.recv() => {
                    debug!("Reconnecting, control message dropped");
                }
            }
        }
    }

    shared.set_state(ConnectionState::Disconnected);
}

/// 연결 하나의 수명 동안 프레임을 처리합니다.
async fn pump(
    shared: &Shared,
    mut link: Link,
    commands: &mut mpsc::UnboundedReceiver<String>,
) -> PumpExit {
    let topics = &shared.config.topics;
    if !topics.is_empty() {
        match ClientMessage::subscribe(topics).to_json() {
            Ok(text) => {
                if link.outbound.send(text).is_err() {
                    return PumpExit::Closed(None);
                }
                debug!(count = topics.len(), "Subscribed to configured topics");
            }
            Err(e) => warn!(error = %e, "Failed to encode subscribe message"),
        }
    }

    loop {
        tokio::select! {
            biased;
            _ = shared.cancel.cancelled() => return PumpExit::Cancelled,
            event = link.inbound.recv() => match event {
                Some(LinkEvent::Frame(text)) => {
                    if let Err(e) = shared.dispatcher.dispatch_frame(&text).await {
                        warn!(error = %e, "Frame dropped");
                    }
                }
                Some(LinkEvent::Closed(reason)) => return PumpExit::Closed(reason),
                None => return PumpExit::Closed(None),
            },
            Some(text) = commands.recv() => {
                if link.outbound.send(text).is_err() {
                    debug!("Link closed, control message dropped");
                }
            }
        }
    }
}
