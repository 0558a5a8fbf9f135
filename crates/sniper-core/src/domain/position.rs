//! 포지션 엔티티.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 포지션 상태.
///
/// `Closing`은 청산 요청이 전송되었지만 아직 확정되지 않은 상태입니다.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PositionStatus {
    /// 보유 중
    #[default]
    Open,
    /// 청산 요청 중
    Closing,
}

/// 보유 포지션.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Position {
    /// 포지션 ID (키)
    pub id: String,
    /// 토큰 심볼
    pub token_symbol: String,
    /// 토큰 mint 주소
    pub token_mint: String,
    /// 포지션을 연 전략 이름
    pub strategy_name: String,
    /// 진입가 (USD)
    pub entry_price_usd: Decimal,
    /// 현재가 (USD)
    pub current_price_usd: Decimal,
    /// 투입 수량 (SOL)
    pub amount_sol: Decimal,
    /// 투입 금액 (USD)
    pub invested_usd: Decimal,
    /// 평가 금액 (USD)
    pub current_value_usd: Decimal,
    /// 미실현 손익 (USD)
    pub pnl_usd: Decimal,
    /// 수익률 (%)
    pub pnl_percentage: Decimal,
    /// 보유 시간 (초)
    pub holding_time: i64,
    /// 진입 시각
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// 포지션 상태
    pub status: PositionStatus,
}

impl Position {
    /// 새 포지션 생성.
    pub fn new(id: impl Into<String>, token_symbol: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            token_symbol: token_symbol.into(),
            ..Default::default()
        }
    }

    /// 수익 중인지 확인.
    pub fn is_profitable(&self) -> bool {
        self.pnl_usd > Decimal::ZERO
    }
}
