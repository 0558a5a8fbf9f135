//! REST 협력 서버 클라이언트.
//!
//! 변경 요청(전략 시작/일시정지, 포지션 청산)과 조회 기반 캐시 갱신에
//! 사용합니다. 응답은 `{success, data, error: {code, message}}` 봉투입니다.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use sniper_core::{Position, Strategy, SyncConfig, Token, Trade};
use tracing::{debug, error, info};

use crate::cache::DomainCaches;
use crate::error::ApiError;

/// 거래 목록 조회 개수.
const TRADES_LIMIT: u32 = 100;

/// 권위 있는 변경 요청 API.
#[async_trait]
pub trait MutationApi: Send + Sync {
    /// 전략 시작.
    async fn start_strategy(&self, id: &str) -> Result<Value, ApiError>;

    /// 전략 일시정지.
    async fn pause_strategy(&self, id: &str) -> Result<Value, ApiError>;

    /// 포지션 청산.
    async fn close_position(&self, id: &str) -> Result<Value, ApiError>;
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    success: bool,
    data: Option<T>,
    error: Option<EnvelopeError>,
}

#[derive(Debug, Deserialize)]
struct EnvelopeError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

/// reqwest 기반 REST 클라이언트.
#[derive(Debug, Clone)]
pub struct RestClient {
    client: Client,
    base_url: String,
    credential: Option<SecretString>,
}

impl RestClient {
    /// 새 클라이언트 생성.
    pub fn new(config: &SyncConfig, credential: Option<SecretString>) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            credential,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.credential {
            Some(credential) => request.bearer_auth(credential.expose_secret()),
            None => request,
        }
    }

    async fn execute<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let response = self.authorize(request).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<Envelope<Value>>(&body)
                .ok()
                .and_then(|envelope| envelope.error)
                .map(|e| e.message)
                .unwrap_or(body);
            error!(status = status.as_u16(), %message, "API request failed");
            return Err(match status {
                StatusCode::NOT_FOUND => ApiError::NotFound(message),
                StatusCode::BAD_REQUEST => ApiError::Validation(message),
                other => ApiError::Status {
                    status: other.as_u16(),
                    message,
                },
            });
        }

        let envelope: Envelope<T> = serde_json::from_str(&body)?;
        if !envelope.success {
            let (code, message) = envelope
                .error
                .map(|e| (e.code, e.message))
                .unwrap_or_default();
            return Err(ApiError::Validation(format!("{}: {}", code, message)));
        }

        envelope
            .data
            .ok_or_else(|| ApiError::Decode("response missing `data`".to_string()))
    }

    async fn post(&self, path: &str) -> Result<Value, ApiError> {
        debug!(path, "POST");
        self.execute(self.client.post(self.url(path))).await
    }

    async fn get_list<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>, ApiError> {
        debug!(path, "GET");
        self.execute(self.client.get(self.url(path))).await
    }

    pub async fn fetch_tokens(&self) -> Result<Vec<Token>, ApiError> {
        self.get_list("/api/v1/tokens").await
    }

    pub async fn fetch_trades(&self) -> Result<Vec<Trade>, ApiError> {
        self.get_list(&format!("/api/v1/trades?limit={}", TRADES_LIMIT))
            .await
    }

    pub async fn fetch_positions(&self) -> Result<Vec<Position>, ApiError> {
        self.get_list("/api/v1/positions").await
    }

    pub async fn fetch_strategies(&self) -> Result<Vec<Strategy>, ApiError> {
        self.get_list("/api/v1/strategies").await
    }

    /// 네 캐시를 모두 서버 목록으로 교체합니다.
    ///
    /// 하나라도 실패하면 에러를 반환하며, 그 전에 성공한 캐시는 이미 교체된 상태입니다.
    pub async fn refresh_all(&self, caches: &DomainCaches) -> Result<(), ApiError> {
        let tokens = self.fetch_tokens().await?;
        let token_count = tokens.len();
        caches.tokens.replace_all(tokens).await;

        let trades = self.fetch_trades().await?;
        let trade_count = trades.len();
        caches.trades.replace_all(trades).await;

        let positions = self.fetch_positions().await?;
        let position_count = positions.len();
        caches.positions.replace_all(positions).await;

        let strategies = self.fetch_strategies().await?;
        let strategy_count = strategies.len();
        caches.strategies.replace_all(strategies).await;

        info!(
            tokens = token_count,
            trades = trade_count,
            positions = position_count,
            strategies = strategy_count,
            "Caches refreshed"
        );
        Ok(())
    }
}

#[async_trait]
impl MutationApi for RestClient {
    async fn start_strategy(&self, id: &str) -> Result<Value, ApiError> {
        self.post(&format!("/api/v1/strategies/{}/start", id)).await
    }

    async fn pause_strategy(&self, id: &str) -> Result<Value, ApiError> {
        self.post(&format!("/api/v1/strategies/{}/pause", id)).await
    }

    async fn close_position(&self, id: &str) -> Result<Value, ApiError> {
        self.post(&format!("/api/v1/positions/{}/close", id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    fn client_for(server: &Server, credential: Option<&str>) -> RestClient {
        let config = SyncConfig {
            api_base_url: server.url(),
            ..Default::default()
        };
        RestClient::new(&config, credential.map(|c| SecretString::from(c.to_string()))).unwrap()
    }

    #[tokio::test]
    async fn test_start_strategy_sends_bearer() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v1/strategies/s1/start")
            .match_header("authorization", "Bearer secret-token")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"success":true,"data":{"id":"s1","is_active":true}}"#)
            .create_async()
            .await;

        let client = client_for(&server, Some("secret-token"));
        let data = client.start_strategy("s1").await.unwrap();

        assert_eq!(data["is_active"], true);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_status_mapping() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/api/v1/strategies/s9/pause")
            .with_status(404)
            .with_body(
                r#"{"success":false,"error":{"code":"NOT_FOUND","message":"Strategy not found"}}"#,
            )
            .create_async()
            .await;
        server
            .mock("POST", "/api/v1/positions/p1/close")
            .with_status(400)
            .with_body(r#"{"success":false,"error":{"code":"INVALID","message":"already closed"}}"#)
            .create_async()
            .await;
        server
            .mock("POST", "/api/v1/positions/p2/close")
            .with_status(503)
            .with_body("upstream unavailable")
            .create_async()
            .await;

        let client = client_for(&server, None);

        assert_eq!(
            client.pause_strategy("s9").await.unwrap_err(),
            ApiError::NotFound("Strategy not found".to_string())
        );
        assert_eq!(
            client.close_position("p1").await.unwrap_err(),
            ApiError::Validation("already closed".to_string())
        );
        let err = client.close_position("p2").await.unwrap_err();
        assert_eq!(
            err,
            ApiError::Status {
                status: 503,
                message: "upstream unavailable".to_string()
            }
        );
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_refresh_all_replaces_caches() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/api/v1/tokens")
            .with_body(r#"{"success":true,"data":[{"mint":"m1","symbol":"BONK","price":"0.00002"}]}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/api/v1/trades")
            .match_query(Matcher::UrlEncoded("limit".into(), "100".into()))
            .with_body(r#"{"success":true,"data":[{"id":"t1"},{"id":"t2"},{"id":"t1","status":"FAILED"}]}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/api/v1/positions")
            .with_body(r#"{"success":true,"data":[]}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/api/v1/strategies")
            .with_body(r#"{"success":true,"data":[{"id":"s1","name":"Momentum","is_active":true}]}"#)
            .create_async()
            .await;

        let caches = DomainCaches::new();
        caches.positions.upsert_new(Position::new("stale", "OLD")).await;

        client_for(&server, None).refresh_all(&caches).await.unwrap();

        assert_eq!(caches.tokens.get("m1").await.unwrap().symbol, "BONK");
        assert_eq!(caches.trades.len().await, 2);
        assert!(caches.positions.is_empty().await);
        assert!(caches.strategies.get("s1").await.unwrap().is_active);
    }

    #[tokio::test]
    async fn test_unsuccessful_envelope() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/api/v1/tokens")
            .with_body(r#"{"success":false,"error":{"code":"RATE_LIMIT","message":"slow down"}}"#)
            .create_async()
            .await;

        let err = client_for(&server, None).fetch_tokens().await.unwrap_err();
        assert_eq!(err, ApiError::Validation("RATE_LIMIT: slow down".to_string()));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_network_error() {
        let config = SyncConfig {
            api_base_url: "http://127.0.0.1:1".to_string(),
            ..Default::default()
        };
        let client = RestClient::new(&config, None).unwrap();
        assert!(matches!(
            client.fetch_strategies().await,
            Err(ApiError::Network(_))
        ));
    }
}
