//! 실제 게이트웨이와 동기화 에이전트 통합 테스트.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;
use serde_json::json;
use sniper_core::{EventKind, SyncConfig, Token, Topic, WsConfig};
use sniper_gateway::{create_router, create_token, AppState, Claims, Gateway};
use sniper_sync::{ChannelNotifier, ConnectionState, DomainCaches, NotificationLevel, SyncAgent};
use tokio::time::timeout;

const SECRET: &str = "integration-secret";
const WAIT: Duration = Duration::from_secs(5);

async fn start_gateway(ws: WsConfig) -> (SocketAddr, Arc<Gateway>) {
    let gateway = Arc::new(Gateway::from_config(&ws));
    let state = Arc::new(AppState::new(gateway.clone(), &ws));
    let app = create_router(state, None, &[]);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (addr, gateway)
}

fn ws_config() -> WsConfig {
    WsConfig {
        tick_interval_ms: 50,
        tick_symbol: "SOL".to_string(),
        require_auth: true,
        jwt_secret: SECRET.to_string(),
    }
}

fn sync_config(addr: SocketAddr) -> SyncConfig {
    SyncConfig {
        ws_url: format!("ws://{}/ws", addr),
        api_base_url: format!("http://{}", addr),
        reconnect_delay_ms: 100,
        ..Default::default()
    }
}

fn credential() -> SecretString {
    let token = create_token(&Claims::new("dashboard-user", 60), SECRET).unwrap();
    SecretString::from(token)
}

async fn wait_until<F, Fut>(mut check: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    timeout(WAIT, async {
        while !check().await {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not met in time");
}

#[tokio::test]
async fn test_published_events_reach_caches() {
    let (addr, gateway) = start_gateway(ws_config()).await;
    let caches = Arc::new(DomainCaches::new());
    let (notifier, mut notifications) = ChannelNotifier::new();

    let agent = SyncAgent::new(
        sync_config(addr),
        Some(credential()),
        caches.clone(),
        Arc::new(notifier),
    );
    let mut state = agent.watch_state();

    agent.connect().await.unwrap();
    timeout(WAIT, state.wait_for(|s| *s == ConnectionState::Connected))
        .await
        .unwrap()
        .unwrap();

    // 접속 직후 보낸 구독 메시지가 처리될 때까지
    let gw = gateway.clone();
    wait_until(move || {
        let gw = gw.clone();
        async move { gw.subscriber_count(Topic::Trades).await == 1 }
    })
    .await;

    let recipients = gateway
        .publish(
            Topic::Trades,
            &EventKind::TradeExecuted,
            json!({"id": "t1", "side": "SELL", "token_symbol": "WIF", "status": "COMPLETED"}),
        )
        .await;
    assert_eq!(recipients, 1);

    let c = caches.clone();
    wait_until(move || {
        let c = c.clone();
        async move { c.trades.contains("t1").await }
    })
    .await;

    let notification = timeout(WAIT, notifications.recv()).await.unwrap().unwrap();
    assert_eq!(notification.level, NotificationLevel::Success);

    agent.disconnect().await;
    assert_eq!(agent.state(), ConnectionState::Disconnected);

    let gw = gateway.clone();
    wait_until(move || {
        let gw = gw.clone();
        async move { gw.connection_count() == 0 }
    })
    .await;
}

#[tokio::test]
async fn test_price_ticks_update_matching_tokens() {
    let (addr, _gateway) = start_gateway(ws_config()).await;
    let caches = Arc::new(DomainCaches::new());
    caches.tokens.upsert_new(Token::new("sol-mint", "SOL")).await;

    let agent = SyncAgent::new(
        SyncConfig {
            topics: Vec::new(),
            ..sync_config(addr)
        },
        Some(credential()),
        caches.clone(),
        Arc::new(sniper_sync::LogNotifier),
    );
    agent.connect().await.unwrap();

    let c = caches.clone();
    wait_until(move || {
        let c = c.clone();
        async move {
            c.tokens
                .get("sol-mint")
                .await
                .is_some_and(|t| !t.price.is_zero())
        }
    })
    .await;

    agent.disconnect().await;
}

#[tokio::test]
async fn test_rejected_credential_keeps_reconnecting() {
    let (addr, gateway) = start_gateway(ws_config()).await;

    let agent = SyncAgent::new(
        sync_config(addr),
        Some(SecretString::from("forged".to_string())),
        Arc::new(DomainCaches::new()),
        Arc::new(sniper_sync::LogNotifier),
    );
    let mut transitions = agent.state_events();
    agent.connect().await.unwrap();

    let mut reconnecting = 0;
    timeout(WAIT, async {
        while reconnecting < 2 {
            if transitions.recv().await.unwrap() == ConnectionState::Reconnecting {
                reconnecting += 1;
            }
        }
    })
    .await
    .unwrap();

    assert_eq!(gateway.connection_count(), 0);
    agent.disconnect().await;
    assert!(agent.connect().await.is_err());
}
