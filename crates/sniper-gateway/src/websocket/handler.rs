//! WebSocket 연결 handler.
//!
//! Axum WebSocket 엔드포인트 및 소켓 입출력 처리.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{rejection::WebSocketUpgradeRejection, Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tracing::{debug, warn};

use super::gateway::Gateway;
use crate::auth::{authenticate, extract_credential};
use crate::error::ApiErrorResponse;
use crate::state::AppState;

/// `/ws` 쿼리 파라미터.
#[derive(Debug, Default, Deserialize)]
pub struct WsParams {
    /// 브라우저 클라이언트용 토큰 (헤더를 설정할 수 없는 경우)
    pub token: Option<String>,
}

/// WebSocket 업그레이드 핸들러.
///
/// 자격 증명이 없거나 유효하지 않아도 기본적으로 연결을 수락합니다.
/// `require_auth`가 켜져 있으면 401로 거부합니다.
///
/// # 엔드포인트
///
/// `GET /ws`
pub async fn websocket_handler(
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<WsParams>,
) -> Response {
    let credential = extract_credential(&headers, params.token.as_deref());

    let user_id = match authenticate(credential.as_deref(), &state.jwt_secret) {
        Ok(claims) => Some(claims.sub),
        Err(e) if state.require_auth => {
            warn!(error = %e, "WebSocket upgrade rejected");
            return ApiErrorResponse::new("UNAUTHORIZED", e.to_string())
                .with_status(StatusCode::UNAUTHORIZED);
        }
        Err(e) => {
            warn!(error = %e, "Unauthenticated WebSocket connection accepted");
            None
        }
    };

    // 인증 판단 후에 업그레이드 가능 여부 확인
    let ws = match ws {
        Ok(ws) => ws,
        Err(rejection) => return rejection.into_response(),
    };

    let gateway = state.gateway.clone();
    ws.on_upgrade(move |socket| handle_socket(socket, gateway, user_id))
        .into_response()
}

/// WebSocket 연결 처리.
async fn handle_socket(socket: WebSocket, gateway: Arc<Gateway>, user_id: Option<String>) {
    let connection = gateway.accept(user_id).await;
    let session_id = connection.session.id.clone();
    let mut outbound = connection.outbound;

    let (mut sender, mut receiver) = socket.split();

    // 송신 태스크: 게이트웨이 큐 → 소켓
    let mut send_task = tokio::spawn(async move {
        while let Some(message) = outbound.recv().await {
            let json = match message.to_json() {
                Ok(json) => json,
                Err(e) => {
                    warn!(error = %e, "Failed to serialize outbound message");
                    continue;
                }
            };
            if sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
        let _ = sender.close().await;
    });

    // 수신 태스크: 소켓 → 게이트웨이
    let recv_gateway = gateway.clone();
    let recv_session_id = session_id.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(result) = receiver.next().await {
            match result {
                Ok(Message::Text(text)) => {
                    recv_gateway
                        .handle_inbound(&recv_session_id, text.as_str())
                        .await;
                }
                Ok(Message::Binary(_)) => {
                    warn!(session_id = %recv_session_id, "Binary messages not supported");
                }
                Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
                Ok(Message::Close(_)) => {
                    debug!(session_id = %recv_session_id, "Close message received");
                    break;
                }
                Err(e) => {
                    warn!(session_id = %recv_session_id, error = %e, "WebSocket receive error");
                    break;
                }
            }
        }
    });

    // 하나의 태스크가 종료되면 다른 것도 종료
    tokio::select! {
        _ = &mut send_task => {
            debug!(session_id = %session_id, "Send task ended");
            recv_task.abort();
        }
        _ = &mut recv_task => {
            debug!(session_id = %session_id, "Receive task ended");
            send_task.abort();
        }
    }

    gateway.close(&session_id).await;
}

/// WebSocket 라우터 생성.
pub fn websocket_router() -> Router<Arc<AppState>> {
    Router::new().route("/ws", get(websocket_handler))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::create_test_state;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn upgrade_request(uri: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header("connection", "upgrade")
            .header("upgrade", "websocket")
            .header("sec-websocket-version", "13")
            .header("sec-websocket-key", "dGhlIHNhbXBsZSBub25jZQ==")
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn test_require_auth_rejects_missing_credential() {
        let mut state = create_test_state();
        state.require_auth = true;
        let app = websocket_router().with_state(Arc::new(state));

        let response = app.oneshot(upgrade_request("/ws")).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_require_auth_rejects_invalid_token() {
        let mut state = create_test_state();
        state.require_auth = true;
        let app = websocket_router().with_state(Arc::new(state));

        let response = app
            .oneshot(upgrade_request("/ws?token=not-a-jwt"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let error: ApiErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(error.code, "UNAUTHORIZED");
    }
}
