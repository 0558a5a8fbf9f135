//! 이벤트 게이트웨이 서버.
//!
//! `/ws` WebSocket 엔드포인트와 `/health`, `/metrics`를 제공합니다.
//!
//! 설정 파일 경로는 `SNIPER_CONFIG` 환경 변수로 지정할 수 있습니다
//! (기본값: `config/gateway.toml`, 없으면 무시).

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use sniper_core::{init_logging, GatewayConfig, LogConfig};
use sniper_gateway::{create_router, setup_metrics_recorder, AppState, Gateway};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env 파일 로드 (있는 경우)
    let _ = dotenvy::dotenv();

    let config_path =
        std::env::var("SNIPER_CONFIG").unwrap_or_else(|_| "config/gateway.toml".to_string());
    let config = GatewayConfig::load(Some(&config_path))
        .with_context(|| format!("설정 로드 실패: {}", config_path))?;

    init_logging(LogConfig::from_config(&config.logging))
        .map_err(|e| anyhow::anyhow!("로깅 초기화 실패: {}", e))?;

    info!("Starting event gateway...");

    // Prometheus 메트릭 레코더 설정
    let metrics_handle = match setup_metrics_recorder() {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!(error = %e, "Prometheus recorder unavailable, /metrics disabled");
            None
        }
    };

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .with_context(|| {
            format!(
                "소켓 주소 설정이 유효하지 않습니다: {}:{}",
                config.server.host, config.server.port
            )
        })?;

    if config.ws.jwt_secret == sniper_core::WsConfig::default().jwt_secret {
        warn!("JWT secret not set, using default (INSECURE for development only)");
    }

    let gateway = Arc::new(Gateway::from_config(&config.ws));
    let state = Arc::new(AppState::new(gateway.clone(), &config.ws));
    info!(
        version = %state.version,
        require_auth = config.ws.require_auth,
        tick_interval_ms = config.ws.tick_interval_ms,
        "Application state initialized"
    );

    let app = create_router(state, metrics_handle, &config.server.cors_origins);

    let shutdown_token = CancellationToken::new();

    info!(%addr, "Gateway listening");
    info!("WebSocket available at ws://{}/ws", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("바인딩 실패: {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown_token.clone()))
        .await?;

    info!("Server shutdown initiated, cleaning up...");
    shutdown_token.cancel();

    // 업그레이드된 연결은 서버 종료 대기에 포함되지 않으므로 직접 닫음
    let closed = gateway.close_all().await;

    // 송신 태스크가 close 프레임을 보낼 시간
    tokio::time::sleep(Duration::from_millis(500)).await;
    info!(closed, "Cleanup completed");

    info!("Server stopped gracefully");
    Ok(())
}

/// Graceful shutdown 시그널 대기.
///
/// Ctrl+C 또는 SIGTERM 시그널을 수신하면 종료 토큰을 취소합니다.
async fn shutdown_signal(shutdown_token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            warn!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            warn!("Received SIGTERM, initiating graceful shutdown...");
        }
        _ = shutdown_token.cancelled() => {}
    }

    shutdown_token.cancel();
}
