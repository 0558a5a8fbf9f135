//! 거래 엔티티.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 주문 방향.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    /// 매수
    #[default]
    Buy,
    /// 매도
    Sell,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

/// 거래 상태.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeStatus {
    /// 전송됨, 확정 대기
    #[default]
    Pending,
    /// 체결 완료
    Completed,
    /// 실패
    Failed,
}

impl TradeStatus {
    /// 최종 상태인지 확인.
    pub fn is_final(&self) -> bool {
        matches!(self, TradeStatus::Completed | TradeStatus::Failed)
    }
}

/// 실행된 거래.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Trade {
    /// 거래 ID (키)
    pub id: String,
    /// 생성 시각
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// 매수/매도
    pub side: Side,
    /// 토큰 심볼
    pub token_symbol: String,
    /// 토큰 mint 주소
    pub token_mint: String,
    /// 거래를 발생시킨 전략 이름
    pub strategy_name: String,
    /// 거래 금액 (USD)
    pub amount_usd: Decimal,
    /// 거래 금액 (SOL)
    pub amount_sol: Decimal,
    /// 체결 가격 (USD)
    pub price_usd: Decimal,
    /// 거래 상태
    pub status: TradeStatus,
    /// 실현 손익 (USD)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pnl_usd: Option<Decimal>,
    /// 트랜잭션 해시
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
    /// 실패 사유
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl Trade {
    /// 새 거래 생성.
    pub fn new(id: impl Into<String>, side: Side, token_symbol: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            side,
            token_symbol: token_symbol.into(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trade_from_partial_payload() {
        let trade: Trade =
            serde_json::from_value(serde_json::json!({"id": "t1", "status": "COMPLETED"})).unwrap();

        assert_eq!(trade.id, "t1");
        assert_eq!(trade.status, TradeStatus::Completed);
        assert_eq!(trade.side, Side::Buy);
        assert!(trade.error_message.is_none());
    }

    #[test]
    fn test_trade_status_final() {
        assert!(!TradeStatus::Pending.is_final());
        assert!(TradeStatus::Completed.is_final());
        assert!(TradeStatus::Failed.is_final());
    }
}
