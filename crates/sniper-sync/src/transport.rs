//! WebSocket 전송 계층.
//!
//! 에이전트는 [`Connector`] trait을 통해 연결을 열고, 연결은 송신/수신
//! 채널 쌍([`Link`])으로 표현됩니다. 실제 구현은 tokio-tungstenite를
//! 사용하는 [`WsConnector`]입니다.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};

use crate::error::SyncError;

/// 연결에서 올라오는 이벤트.
#[derive(Debug, Clone, PartialEq)]
pub enum LinkEvent {
    /// 텍스트 프레임
    Frame(String),
    /// 연결 종료 (사유가 있으면 포함)
    Closed(Option<String>),
}

/// 열린 연결 하나.
///
/// `outbound`를 drop하면 연결이 닫힙니다.
#[derive(Debug)]
pub struct Link {
    /// 송신 채널
    pub outbound: mpsc::UnboundedSender<String>,
    /// 수신 채널
    pub inbound: mpsc::UnboundedReceiver<LinkEvent>,
}

impl Link {
    /// 채널 쌍으로 연결 생성. 반대쪽 끝을 함께 반환합니다.
    pub fn pair() -> (
        Self,
        mpsc::UnboundedReceiver<String>,
        mpsc::UnboundedSender<LinkEvent>,
    ) {
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let (in_tx, in_rx) = mpsc::unbounded_channel();
        (
            Self {
                outbound: out_tx,
                inbound: in_rx,
            },
            out_rx,
            in_tx,
        )
    }
}

/// 게이트웨이 연결을 여는 trait.
#[async_trait]
pub trait Connector: Send + Sync {
    /// 연결을 엽니다.
    ///
    /// 일시적 실패는 `SyncError::Connection`, 재시도해도 소용없는 설정 오류는
    /// `SyncError::Config`입니다.
    async fn connect(&self, url: &str, credential: &SecretString) -> Result<Link, SyncError>;
}

/// tokio-tungstenite 기반 커넥터.
///
/// 자격 증명은 `Authorization: Bearer` 헤더로 전송됩니다.
#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self, url: &str, credential: &SecretString) -> Result<Link, SyncError> {
        let mut request = url
            .into_client_request()
            .map_err(|e| SyncError::Config(format!("invalid gateway url `{}`: {}", url, e)))?;
        let bearer = format!("Bearer {}", credential.expose_secret());
        let header = HeaderValue::from_str(&bearer)
            .map_err(|e| SyncError::Config(format!("invalid credential header: {}", e)))?;
        request.headers_mut().insert("Authorization", header);

        info!("WebSocket 연결 중: {}", url);
        let (ws_stream, _) = connect_async(request).await?;
        info!("WebSocket 연결 성공");

        let (mut write, mut read) = ws_stream.split();
        let (link, mut outbound, inbound) = Link::pair();

        tokio::spawn(async move {
            let reason = loop {
                tokio::select! {
                    msg = read.next() => {
                        match msg {
                            Some(Ok(Message::Text(text))) => {
                                if inbound.send(LinkEvent::Frame(text)).is_err() {
                                    break None;
                                }
                            }
                            Some(Ok(Message::Ping(data))) => {
                                debug!("Ping 수신, Pong 응답");
                                let _ = write.send(Message::Pong(data)).await;
                            }
                            Some(Ok(Message::Close(frame))) => {
                                warn!("서버에서 연결 종료 요청");
                                break frame.map(|f| f.reason.to_string());
                            }
                            Some(Ok(_)) => {}
                            Some(Err(e)) => {
                                warn!(error = %e, "WebSocket 에러");
                                break Some(e.to_string());
                            }
                            None => {
                                warn!("WebSocket 스트림 종료");
                                break None;
                            }
                        }
                    }
                    text = outbound.recv() => {
                        match text {
                            Some(text) => {
                                if let Err(e) = write.send(Message::Text(text)).await {
                                    warn!(error = %e, "프레임 전송 실패");
                                    break Some(e.to_string());
                                }
                            }
                            None => {
                                debug!("송신 채널 종료, 연결을 닫습니다");
                                let _ = write.send(Message::Close(None)).await;
                                break None;
                            }
                        }
                    }
                }
            };

            let _ = inbound.send(LinkEvent::Closed(reason));
        });

        Ok(link)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_refused_is_connection_error() {
        let credential = SecretString::from("token".to_string());
        let err = WsConnector
            .connect("ws://127.0.0.1:1/ws", &credential)
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Connection(_)));
    }

    #[tokio::test]
    async fn test_invalid_url_is_config_error() {
        let credential = SecretString::from("token".to_string());
        let err = WsConnector
            .connect("not a url", &credential)
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Config(_)));
        assert!(!err.is_retryable());
    }
}
