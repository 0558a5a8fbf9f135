//! 토큰 엔티티.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 모니터링 중인 토큰.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Token {
    /// 토큰 mint 주소 (키)
    pub mint: String,
    /// 심볼
    pub symbol: String,
    /// 토큰 이름
    pub name: String,
    /// 유동성 (USD)
    pub liquidity: Decimal,
    /// 보유자 수
    pub holders: i32,
    /// 현재가 (USD)
    pub price: Decimal,
    /// 1시간 가격 변화율 (%)
    pub price_change_1h: Decimal,
    /// 생성 후 경과 시간 (분)
    pub age: i32,
    /// 리스크 점수 (0-100)
    pub risk_score: i32,
    /// 민팅 권한 포기 여부
    pub is_renounced: bool,
    /// 메타데이터 변경 불가 여부
    pub is_immutable: bool,
    /// 최초 발견 시각
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Token {
    /// 새 토큰 생성.
    pub fn new(mint: impl Into<String>, symbol: impl Into<String>) -> Self {
        Self {
            mint: mint.into(),
            symbol: symbol.into(),
            ..Default::default()
        }
    }

    /// 리스크 점수가 임계값 이상인지 확인.
    pub fn is_high_risk(&self, threshold: i32) -> bool {
        self.risk_score >= threshold
    }
}
