//! 전략 엔티티.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 전략 성과 통계.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StrategyStats {
    /// 총 거래 수
    pub total_trades: i64,
    /// 승률 (%)
    pub win_rate: Decimal,
    /// 누적 손익 (USD)
    pub total_pnl: Decimal,
    /// 샤프 비율
    pub sharpe_ratio: Decimal,
}

/// 트레이딩 전략.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Strategy {
    /// 전략 ID (키)
    pub id: String,
    /// 전략 이름
    pub name: String,
    /// 전략 유형 (예: "early_bird", "smart_money")
    #[serde(rename = "type", alias = "strategy_type")]
    pub strategy_type: String,
    /// 실행 여부
    pub is_active: bool,
    /// 우선순위 (높을수록 먼저)
    pub priority: i32,
    /// 성과 통계
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<StrategyStats>,
}

impl Strategy {
    /// 새 전략 생성.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            priority: 50,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_type_alias() {
        let strategy: Strategy = serde_json::from_value(serde_json::json!({
            "id": "s1",
            "strategy_type": "sniper",
            "stats": {"totalTrades": 12, "winRate": "58.3"}
        }))
        .unwrap();

        assert_eq!(strategy.strategy_type, "sniper");
        let stats = strategy.stats.unwrap();
        assert_eq!(stats.total_trades, 12);

        let json = serde_json::to_value(Strategy::new("s2", "Momentum")).unwrap();
        assert!(json.get("type").is_some());
        assert_eq!(json["priority"], 50);
    }
}
