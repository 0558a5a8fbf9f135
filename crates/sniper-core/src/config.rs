//! 설정 관리.
//!
//! 게이트웨이 서버와 동기화 에이전트의 설정을 정의합니다.
//! 기본값 → 설정 파일(선택) → `SNIPER__` 접두사 환경 변수 순으로 덮어씁니다.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::topic::Topic;

/// 환경 변수 접두사.
pub const ENV_PREFIX: &str = "SNIPER";

/// 게이트웨이 서버 설정.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// HTTP 서버 설정
    pub server: ServerConfig,
    /// WebSocket 설정
    pub ws: WsConfig,
    /// 로깅 설정
    pub logging: LoggingConfig,
}

/// 서버 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// 바인딩할 호스트
    pub host: String,
    /// 리스닝할 포트
    pub port: u16,
    /// 허용할 CORS origin 목록 (비어 있으면 모두 허용)
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            cors_origins: Vec::new(),
        }
    }
}

/// WebSocket 게이트웨이 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WsConfig {
    /// 주기적 시세 틱 간격 (밀리초)
    pub tick_interval_ms: u64,
    /// 시세 틱 심볼
    pub tick_symbol: String,
    /// 인증되지 않은 연결 거부 여부
    pub require_auth: bool,
    /// JWT 검증 시크릿
    pub jwt_secret: String,
}

impl Default for WsConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 5000,
            tick_symbol: "SOL".to_string(),
            require_auth: false,
            jwt_secret: "dev-secret-key-change-in-production".to_string(),
        }
    }
}

impl WsConfig {
    /// 틱 간격.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }
}

/// 로깅 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 로그 레벨
    pub level: String,
    /// 로그 형식 (pretty, json, compact)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

/// 클라이언트 동기화 에이전트 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SyncConfig {
    /// 게이트웨이 WebSocket URL
    pub ws_url: String,
    /// REST API 기본 URL
    pub api_base_url: String,
    /// (재)연결 시 구독할 토픽
    pub topics: Vec<Topic>,
    /// 자동 재연결 여부
    pub auto_reconnect: bool,
    /// 재연결 대기 시간 (밀리초)
    pub reconnect_delay_ms: u64,
    /// REST 요청 타임아웃 (초)
    pub request_timeout_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            ws_url: "ws://127.0.0.1:3000/ws".to_string(),
            api_base_url: "http://127.0.0.1:3000".to_string(),
            topics: Topic::ALL.to_vec(),
            auto_reconnect: true,
            reconnect_delay_ms: 5000,
            request_timeout_secs: 10,
        }
    }
}

impl SyncConfig {
    /// 재연결 대기 시간.
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    /// REST 요청 타임아웃.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// 설정 로드 공통 로직.
fn load_layered<T, P>(path: Option<P>, section: Option<&str>) -> Result<T, config::ConfigError>
where
    T: serde::de::DeserializeOwned + Default,
    P: AsRef<Path>,
{
    let mut builder = config::Config::builder();

    if let Some(path) = path {
        builder = builder.add_source(config::File::from(path.as_ref()).required(false));
    }

    builder = builder.add_source(
        config::Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .list_separator(",")
            .with_list_parse_key("sync.topics")
            .with_list_parse_key("server.cors_origins")
            .try_parsing(true),
    );

    let config = builder.build()?;
    match section {
        Some(section) => match config.get::<T>(section) {
            Ok(value) => Ok(value),
            Err(config::ConfigError::NotFound(_)) => Ok(T::default()),
            Err(e) => Err(e),
        },
        None => config.try_deserialize(),
    }
}

impl GatewayConfig {
    /// 파일과 환경 변수에서 설정을 로드합니다.
    ///
    /// 예: `SNIPER__SERVER__PORT=8080`, `SNIPER__WS__REQUIRE_AUTH=true`
    pub fn load<P: AsRef<Path>>(path: Option<P>) -> Result<Self, config::ConfigError> {
        load_layered(path, None)
    }

    /// 환경 변수만으로 설정을 로드합니다.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        Self::load(None::<&Path>)
    }
}

impl SyncConfig {
    /// 파일의 `[sync]` 섹션과 환경 변수에서 설정을 로드합니다.
    ///
    /// 예: `SNIPER__SYNC__WS_URL=ws://host:3000/ws`, `SNIPER__SYNC__TOPICS=trades,positions`
    pub fn load<P: AsRef<Path>>(path: Option<P>) -> Result<Self, config::ConfigError> {
        load_layered(path, Some("sync"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateway_defaults() {
        let config = GatewayConfig::default();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.ws.tick_interval(), Duration::from_secs(5));
        assert!(!config.ws.require_auth);
    }

    #[test]
    fn test_sync_defaults() {
        let config = SyncConfig::default();
        assert!(config.auto_reconnect);
        assert_eq!(config.reconnect_delay(), Duration::from_millis(5000));
        assert_eq!(config.topics.len(), Topic::ALL.len());
    }

    #[test]
    fn test_sync_config_from_partial_toml() {
        let toml = r#"
            ws_url = "ws://example:9000/ws"
            topics = ["trades", "positions"]
        "#;
        let config: SyncConfig = config::Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.ws_url, "ws://example:9000/ws");
        assert_eq!(config.topics, vec![Topic::Trades, Topic::Positions]);
        assert_eq!(config.reconnect_delay_ms, 5000);
    }
}
