//! 구독 토픽 정의.
//!
//! 토픽은 관련 도메인 이벤트를 묶는 고정된 채널 이름입니다.
//! 와이어 상에서는 소문자 문자열로 표현됩니다.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;

/// 구독 토픽.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Topic {
    /// 토큰 발견 및 시세
    Tokens,
    /// 거래 체결
    Trades,
    /// 포지션 변경
    Positions,
    /// 전략 상태 변경
    Strategies,
    /// 리스크 경고
    Risk,
    /// 성과 지표
    Metrics,
    /// 시스템 상태
    System,
}

impl Topic {
    /// 모든 토픽 목록.
    pub const ALL: [Topic; 7] = [
        Topic::Tokens,
        Topic::Trades,
        Topic::Positions,
        Topic::Strategies,
        Topic::Risk,
        Topic::Metrics,
        Topic::System,
    ];

    /// 와이어 표현 문자열.
    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::Tokens => "tokens",
            Topic::Trades => "trades",
            Topic::Positions => "positions",
            Topic::Strategies => "strategies",
            Topic::Risk => "risk",
            Topic::Metrics => "metrics",
            Topic::System => "system",
        }
    }

    /// 토픽 이름 파싱. 알 수 없는 이름이면 `None`.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "tokens" => Some(Topic::Tokens),
            "trades" => Some(Topic::Trades),
            "positions" => Some(Topic::Positions),
            "strategies" => Some(Topic::Strategies),
            "risk" => Some(Topic::Risk),
            "metrics" => Some(Topic::Metrics),
            "system" => Some(Topic::System),
            _ => None,
        }
    }

    /// 토픽 이름 목록을 파싱합니다.
    ///
    /// 알려진 토픽과 알 수 없는 이름을 분리해서 반환합니다.
    pub fn partition_names<S: AsRef<str>>(names: &[S]) -> (Vec<Topic>, Vec<String>) {
        let mut known = Vec::new();
        let mut unknown = Vec::new();

        for name in names {
            match Topic::from_name(name.as_ref()) {
                Some(topic) => known.push(topic),
                None => unknown.push(name.as_ref().to_string()),
            }
        }

        (known, unknown)
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Topic {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Topic::from_name(s).ok_or_else(|| ProtocolError::UnknownTopic(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topic_round_trip_names() {
        for topic in Topic::ALL {
            assert_eq!(Topic::from_name(topic.as_str()), Some(topic));
        }
        assert_eq!(Topic::from_name(" Trades "), Some(Topic::Trades));
        assert_eq!(Topic::from_name("orders"), None);
    }

    #[test]
    fn test_topic_from_str_error() {
        let err = "market:BTC".parse::<Topic>().unwrap_err();
        assert!(matches!(err, ProtocolError::UnknownTopic(name) if name == "market:BTC"));
    }

    #[test]
    fn test_partition_names() {
        let (known, unknown) = Topic::partition_names(&["trades", "bogus", "risk"]);
        assert_eq!(known, vec![Topic::Trades, Topic::Risk]);
        assert_eq!(unknown, vec!["bogus".to_string()]);
    }

    #[test]
    fn test_topic_serde_lowercase() {
        let json = serde_json::to_string(&Topic::Strategies).unwrap();
        assert_eq!(json, "\"strategies\"");

        let topic: Topic = serde_json::from_str("\"system\"").unwrap();
        assert_eq!(topic, Topic::System);
    }

    proptest::proptest! {
        #[test]
        fn prop_partition_keeps_every_name(names in proptest::collection::vec("[a-z]{1,10}", 0..12)) {
            let (known, unknown) = Topic::partition_names(&names);
            proptest::prop_assert_eq!(known.len() + unknown.len(), names.len());
            for name in &unknown {
                proptest::prop_assert!(Topic::from_name(name).is_none());
            }
        }
    }
}
