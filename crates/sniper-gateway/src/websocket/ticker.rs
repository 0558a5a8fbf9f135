//! 연결별 주기적 시세 틱.
//!
//! 구독 여부와 관계없이 모든 연결에 `price_update` 메시지를 보냅니다.
//! 틱 태스크는 [`TickerGuard`]가 소유하며 가드가 drop되면 중단됩니다.

use std::time::Duration;

use chrono::Utc;
use rand::Rng;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sniper_core::{PriceTick, ServerMessage};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, trace};

/// 랜덤 워크 가격 생성기.
#[derive(Debug, Clone)]
pub struct PriceWalk {
    symbol: String,
    current_price: Decimal,
}

impl PriceWalk {
    /// 새 가격 생성기.
    pub fn new(symbol: impl Into<String>, base_price: Decimal) -> Self {
        Self {
            symbol: symbol.into(),
            current_price: base_price,
        }
    }

    /// 가격을 한 스텝 움직이고 틱을 반환합니다.
    pub fn next_tick(&mut self) -> PriceTick {
        let mut rng = rand::thread_rng();

        // 랜덤 가격 변동 (-0.5% ~ +0.5%)
        let change_pct = rng.gen_range(-0.005..0.005);
        let change = self.current_price * Decimal::try_from(change_pct).unwrap_or(dec!(0));
        self.current_price = (self.current_price + change).round_dp(6);

        PriceTick {
            symbol: self.symbol.clone(),
            price: self.current_price,
            timestamp: Utc::now().timestamp_millis(),
        }
    }

    pub fn current_price(&self) -> Decimal {
        self.current_price
    }
}

/// 틱 태스크 소유 가드. drop 시 태스크를 중단합니다.
#[derive(Debug)]
pub struct TickerGuard {
    handle: JoinHandle<()>,
}

impl TickerGuard {
    /// 태스크가 종료되었는지 확인.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for TickerGuard {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// 틱 태스크 시작.
///
/// 첫 틱은 `period` 후에 발생합니다. 수신 측이 닫히면 스스로 종료합니다.
pub fn spawn_ticker(
    session_id: String,
    outbound: mpsc::UnboundedSender<ServerMessage>,
    period: Duration,
    mut walk: PriceWalk,
) -> TickerGuard {
    let handle = tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let tick = walk.next_tick();
            trace!(session_id = %session_id, price = %tick.price, "Price tick");

            if outbound.send(ServerMessage::PriceUpdate { data: tick }).is_err() {
                debug!(session_id = %session_id, "Ticker receiver closed");
                break;
            }
        }
    });

    TickerGuard { handle }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_walk_stays_near_base() {
        let mut walk = PriceWalk::new("SOL", dec!(100));

        for _ in 0..10 {
            let tick = walk.next_tick();
            assert_eq!(tick.symbol, "SOL");
        }

        // 스텝당 최대 0.5%
        let change_ratio = (walk.current_price() - dec!(100)) / dec!(100);
        assert!(change_ratio > dec!(-0.06) && change_ratio < dec!(0.06));
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticker_emits_after_period() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let _guard = spawn_ticker(
            "s1".to_string(),
            tx,
            Duration::from_secs(5),
            PriceWalk::new("SOL", dec!(100)),
        );

        tokio::time::sleep(Duration::from_millis(4900)).await;
        assert!(rx.try_recv().is_err());

        tokio::time::sleep(Duration::from_millis(200)).await;
        let msg = rx.try_recv().unwrap();
        assert!(matches!(msg, ServerMessage::PriceUpdate { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_guard_drop_stops_ticks() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let guard = spawn_ticker(
            "s1".to_string(),
            tx,
            Duration::from_secs(1),
            PriceWalk::new("SOL", dec!(100)),
        );

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(rx.try_recv().is_ok());

        drop(guard);
        // 중단된 태스크의 송신자가 drop되어 채널이 닫힘
        assert!(rx.recv().await.is_none());
    }
}
