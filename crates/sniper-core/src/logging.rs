//! 로깅 초기화.
//!
//! 게이트웨이 바이너리와 동기화 에이전트를 내장하는 애플리케이션이
//! 같은 방식으로 tracing 구독자를 설치하도록 합니다.
//! 출력 형식은 `pretty`(개발), `json`(로그 수집), `compact` 중 하나입니다.

use std::fmt;
use std::str::FromStr;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt as tfmt, EnvFilter, Layer};

use crate::config::LoggingConfig;

/// 로그 출력 형식.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            "compact" => Ok(Self::Compact),
            other => Err(format!("Unknown log format: {}", other)),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogFormat::Pretty => "pretty",
            LogFormat::Json => "json",
            LogFormat::Compact => "compact",
        };
        f.write_str(name)
    }
}

/// 구독자 설정.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// EnvFilter 지시어 (예: "info,sniper_sync=debug")
    pub level: String,
    pub format: LogFormat,
    /// 파일명/줄 번호 출력 여부
    pub with_source: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
            with_source: false,
        }
    }
}

impl LogConfig {
    /// `[logging]` 설정 섹션에서 생성합니다. 알 수 없는 형식은 `Pretty`로 대체됩니다.
    pub fn from_config(config: &LoggingConfig) -> Self {
        let format = config.format.parse().unwrap_or_else(|e: String| {
            eprintln!("{}, falling back to pretty", e);
            LogFormat::Pretty
        });

        Self {
            level: config.level.clone(),
            format,
            with_source: format == LogFormat::Json,
        }
    }
}

/// 전역 tracing 구독자를 설치합니다.
///
/// `RUST_LOG`가 설정되어 있으면 `config.level`보다 우선합니다.
/// 이미 구독자가 설치되어 있으면 에러를 반환합니다.
pub fn init_logging(config: LogConfig) -> Result<(), Box<dyn std::error::Error>> {
    let filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&config.level))?;

    let layer = tfmt::layer()
        .with_file(config.with_source)
        .with_line_number(config.with_source)
        .with_target(true);

    let layer = match config.format {
        LogFormat::Pretty => layer.pretty().boxed(),
        LogFormat::Json => layer.json().flatten_event(true).boxed(),
        LogFormat::Compact => layer.compact().boxed(),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(layer)
        .try_init()?;

    tracing::debug!(format = %config.format, level = %config.level, "Logging initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_parse() {
        assert_eq!(" JSON ".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("compact".parse::<LogFormat>().unwrap(), LogFormat::Compact);
        assert!("yaml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_from_config() {
        let config = LogConfig::from_config(&LoggingConfig {
            level: "sniper_gateway=debug".to_string(),
            format: "yaml".to_string(),
        });
        assert_eq!(config.level, "sniper_gateway=debug");
        assert_eq!(config.format, LogFormat::Pretty);
        assert!(!config.with_source);

        let config = LogConfig::from_config(&LoggingConfig {
            level: "info".to_string(),
            format: "json".to_string(),
        });
        assert!(config.with_source);
    }
}
