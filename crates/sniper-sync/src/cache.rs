//! 도메인 캐시.
//!
//! 토큰, 거래, 포지션, 전략을 키 기준으로 보관하는 인메모리 캐시.
//! 키당 항목은 최대 하나이며, 부분 업데이트는 JSON 필드 단위 얕은 병합입니다.
//! 조회 기반 갱신과 푸시 이벤트가 같은 필드를 쓰면 나중에 쓴 쪽이 남습니다.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use sniper_core::{Position, ProtocolError, ProtocolResult, Strategy, Token, Trade};
use tokio::sync::RwLock;

/// 새 항목 삽입 위치.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOrder {
    /// 맨 앞 (최신 우선)
    Front,
    /// 맨 뒤
    Back,
}

/// 캐시에 보관할 수 있는 엔티티.
pub trait CacheEntity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// 로그/에러용 엔티티 이름
    const KIND: &'static str;
    /// 키 필드 이름 (JSON)
    const KEY_FIELD: &'static str;
    /// 새 항목 삽입 위치
    const INSERT_ORDER: InsertOrder;
    /// 입력 전용 필드 별칭 (별칭, 직렬화 이름)
    const FIELD_ALIASES: &'static [(&'static str, &'static str)] = &[];

    fn key(&self) -> &str;
}

impl CacheEntity for Token {
    const KIND: &'static str = "token";
    const KEY_FIELD: &'static str = "mint";
    const INSERT_ORDER: InsertOrder = InsertOrder::Front;

    fn key(&self) -> &str {
        &self.mint
    }
}

impl CacheEntity for Trade {
    const KIND: &'static str = "trade";
    const KEY_FIELD: &'static str = "id";
    const INSERT_ORDER: InsertOrder = InsertOrder::Front;

    fn key(&self) -> &str {
        &self.id
    }
}

impl CacheEntity for Position {
    const KIND: &'static str = "position";
    const KEY_FIELD: &'static str = "id";
    const INSERT_ORDER: InsertOrder = InsertOrder::Front;

    fn key(&self) -> &str {
        &self.id
    }
}

impl CacheEntity for Strategy {
    const KIND: &'static str = "strategy";
    const KEY_FIELD: &'static str = "id";
    const INSERT_ORDER: InsertOrder = InsertOrder::Back;
    const FIELD_ALIASES: &'static [(&'static str, &'static str)] = &[("strategy_type", "type")];

    fn key(&self) -> &str {
        &self.id
    }
}

/// 삽입 결과.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// 새 항목 추가
    Inserted,
    /// 같은 키의 기존 항목 교체/병합
    Replaced,
}

/// 키 기준 엔티티 캐시.
#[derive(Debug)]
pub struct DomainCache<T> {
    entries: RwLock<Vec<T>>,
}

impl<T: CacheEntity> Default for DomainCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: CacheEntity> DomainCache<T> {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
        }
    }

    /// 새 엔티티 삽입. 같은 키가 있으면 그 자리에서 교체합니다.
    pub async fn upsert_new(&self, entity: T) -> UpsertOutcome {
        let mut entries = self.entries.write().await;

        if let Some(slot) = entries.iter_mut().find(|e| e.key() == entity.key()) {
            *slot = entity;
            return UpsertOutcome::Replaced;
        }

        match T::INSERT_ORDER {
            InsertOrder::Front => entries.insert(0, entity),
            InsertOrder::Back => entries.push(entity),
        }
        UpsertOutcome::Inserted
    }

    /// 부분 업데이트. 키가 없으면 아무것도 하지 않고 `Ok(false)`를 반환합니다.
    ///
    /// 타입이 맞지 않거나 키를 바꾸려는 업데이트는 거부되고 항목은 그대로 남습니다.
    pub async fn upsert_update(&self, key: &str, partial: &Value) -> ProtocolResult<bool> {
        let mut entries = self.entries.write().await;

        let Some(slot) = entries.iter_mut().find(|e| e.key() == key) else {
            return Ok(false);
        };

        *slot = merge_entity(slot, partial)?;
        Ok(true)
    }

    /// 키가 있으면 병합하고, 없으면 페이로드로 새 항목을 만듭니다.
    pub async fn upsert_merge(&self, payload: &Value) -> ProtocolResult<UpsertOutcome> {
        let key = key_of::<T>(payload)?;
        let mut entries = self.entries.write().await;

        if let Some(slot) = entries.iter_mut().find(|e| e.key() == key) {
            *slot = merge_entity(slot, payload)?;
            return Ok(UpsertOutcome::Replaced);
        }

        let entity = parse_entity::<T>(payload)?;
        match T::INSERT_ORDER {
            InsertOrder::Front => entries.insert(0, entity),
            InsertOrder::Back => entries.push(entity),
        }
        Ok(UpsertOutcome::Inserted)
    }

    /// 항목 제거. 없으면 `None`.
    pub async fn remove(&self, key: &str) -> Option<T> {
        let mut entries = self.entries.write().await;
        let index = entries.iter().position(|e| e.key() == key)?;
        Some(entries.remove(index))
    }

    /// 전체 교체 (조회 기반 갱신). 중복 키는 나중 값이 남습니다.
    pub async fn replace_all(&self, entities: Vec<T>) {
        let mut deduped: Vec<T> = Vec::with_capacity(entities.len());
        for entity in entities {
            match deduped.iter_mut().find(|e| e.key() == entity.key()) {
                Some(slot) => *slot = entity,
                None => deduped.push(entity),
            }
        }
        *self.entries.write().await = deduped;
    }

    pub async fn get(&self, key: &str) -> Option<T> {
        self.entries
            .read()
            .await
            .iter()
            .find(|e| e.key() == key)
            .cloned()
    }

    pub async fn contains(&self, key: &str) -> bool {
        self.entries.read().await.iter().any(|e| e.key() == key)
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// 현재 항목 복사본 (표시 순서).
    pub async fn snapshot(&self) -> Vec<T> {
        self.entries.read().await.clone()
    }

    /// 항목의 JSON 필드 값.
    pub async fn field(&self, key: &str, name: &str) -> Option<Value> {
        let entries = self.entries.read().await;
        let entry = entries.iter().find(|e| e.key() == key)?;
        serde_json::to_value(entry).ok()?.get(name).cloned()
    }

    /// 조건을 만족하는 첫 항목의 키.
    pub async fn find_key<F>(&self, predicate: F) -> Option<String>
    where
        F: Fn(&T) -> bool,
    {
        self.entries
            .read()
            .await
            .iter()
            .find(|e| predicate(e))
            .map(|e| e.key().to_string())
    }

    /// 필드 하나를 바꾸고 이전 값을 반환합니다. 키가 없으면 `Ok(None)`.
    pub async fn replace_field(
        &self,
        key: &str,
        name: &str,
        value: Value,
    ) -> ProtocolResult<Option<Value>> {
        let mut entries = self.entries.write().await;

        let Some(slot) = entries.iter_mut().find(|e| e.key() == key) else {
            return Ok(None);
        };

        let current = to_object(slot)?;
        let prior = current.get(name).cloned().unwrap_or(Value::Null);

        let mut partial = Map::new();
        partial.insert(name.to_string(), value);
        *slot = merge_entity(slot, &Value::Object(partial))?;

        Ok(Some(prior))
    }

    /// 조건을 만족하는 모든 항목을 제자리에서 수정합니다. 수정된 수를 반환합니다.
    pub async fn modify_where<P, F>(&self, predicate: P, mut modify: F) -> usize
    where
        P: Fn(&T) -> bool,
        F: FnMut(&mut T),
    {
        let mut entries = self.entries.write().await;
        let mut modified = 0;
        for entry in entries.iter_mut().filter(|e| predicate(e)) {
            modify(entry);
            modified += 1;
        }
        modified
    }
}

/// 네 종류의 도메인 캐시 묶음.
#[derive(Debug, Default)]
pub struct DomainCaches {
    pub tokens: DomainCache<Token>,
    pub trades: DomainCache<Trade>,
    pub positions: DomainCache<Position>,
    pub strategies: DomainCache<Strategy>,
}

impl DomainCaches {
    pub fn new() -> Self {
        Self::default()
    }
}

/// 페이로드에서 키 필드 추출.
pub fn key_of<T: CacheEntity>(payload: &Value) -> ProtocolResult<String> {
    match payload.get(T::KEY_FIELD) {
        Some(Value::String(key)) if !key.is_empty() => Ok(key.clone()),
        _ => Err(ProtocolError::InvalidPayload(format!(
            "{} payload missing `{}`",
            T::KIND,
            T::KEY_FIELD
        ))),
    }
}

/// 페이로드를 엔티티로 파싱. 빠진 필드는 기본값으로 채워집니다.
pub fn parse_entity<T: CacheEntity>(payload: &Value) -> ProtocolResult<T> {
    key_of::<T>(payload)?;
    T::deserialize(payload)
        .map_err(|e| ProtocolError::InvalidPayload(format!("{}: {}", T::KIND, e)))
}

fn to_object<T: CacheEntity>(entity: &T) -> ProtocolResult<Map<String, Value>> {
    match serde_json::to_value(entity) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(ProtocolError::InvalidPayload(format!(
            "{} is not a JSON object",
            T::KIND
        ))),
        Err(e) => Err(ProtocolError::InvalidPayload(e.to_string())),
    }
}

/// 별칭으로 들어온 필드 이름을 직렬화 이름으로 바꿉니다.
fn canonical_field<T: CacheEntity>(name: &str) -> &str {
    T::FIELD_ALIASES
        .iter()
        .find(|(alias, _)| *alias == name)
        .map(|(_, canonical)| *canonical)
        .unwrap_or(name)
}

/// 얕은 병합. 언급되지 않은 필드는 유지됩니다.
fn merge_entity<T: CacheEntity>(entity: &T, partial: &Value) -> ProtocolResult<T> {
    let Value::Object(fields) = partial else {
        return Err(ProtocolError::InvalidPayload(format!(
            "{} update must be a JSON object",
            T::KIND
        )));
    };

    let mut merged = to_object(entity)?;
    for (name, value) in fields {
        merged.insert(canonical_field::<T>(name).to_string(), value.clone());
    }

    let updated = T::deserialize(Value::Object(merged))
        .map_err(|e| ProtocolError::InvalidPayload(format!("{}: {}", T::KIND, e)))?;

    if updated.key() != entity.key() {
        return Err(ProtocolError::InvalidPayload(format!(
            "{} key cannot change ({} -> {})",
            T::KIND,
            entity.key(),
            updated.key()
        )));
    }

    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;
    use sniper_core::{PositionStatus, TradeStatus};

    fn trade(id: &str) -> Trade {
        Trade::new(id, sniper_core::Side::Buy, "BONK")
    }

    #[tokio::test]
    async fn test_insert_order() {
        let trades: DomainCache<Trade> = DomainCache::new();
        trades.upsert_new(trade("t1")).await;
        trades.upsert_new(trade("t2")).await;

        let ids: Vec<String> = trades.snapshot().await.into_iter().map(|t| t.id).collect();
        assert_eq!(ids, vec!["t2", "t1"]);

        let strategies: DomainCache<Strategy> = DomainCache::new();
        strategies.upsert_new(Strategy::new("s1", "A")).await;
        strategies.upsert_new(Strategy::new("s2", "B")).await;

        let ids: Vec<String> = strategies
            .snapshot()
            .await
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(ids, vec!["s1", "s2"]);
    }

    #[tokio::test]
    async fn test_upsert_new_replaces_in_place() {
        let cache: DomainCache<Trade> = DomainCache::new();
        cache.upsert_new(trade("t1")).await;
        cache.upsert_new(trade("t2")).await;

        let mut replacement = trade("t1");
        replacement.status = TradeStatus::Completed;
        assert_eq!(cache.upsert_new(replacement).await, UpsertOutcome::Replaced);

        let snapshot = cache.snapshot().await;
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[1].id, "t1");
        assert_eq!(snapshot[1].status, TradeStatus::Completed);
    }

    #[tokio::test]
    async fn test_update_merges_shallowly() {
        let cache: DomainCache<Position> = DomainCache::new();
        let mut position = Position::new("p1", "WIF");
        position.amount_sol = dec!(2.5);
        cache.upsert_new(position).await;

        let updated = cache
            .upsert_update("p1", &json!({"id": "p1", "current_price_usd": "1.75"}))
            .await
            .unwrap();
        assert!(updated);

        let position = cache.get("p1").await.unwrap();
        assert_eq!(position.current_price_usd, dec!(1.75));
        assert_eq!(position.amount_sol, dec!(2.5));
        assert_eq!(position.token_symbol, "WIF");
    }

    #[tokio::test]
    async fn test_update_is_idempotent() {
        let cache: DomainCache<Trade> = DomainCache::new();
        cache.upsert_new(trade("t1")).await;
        let patch = json!({"id": "t1", "status": "COMPLETED", "pnl_usd": "12.5"});

        cache.upsert_update("t1", &patch).await.unwrap();
        let once = cache.snapshot().await;
        cache.upsert_update("t1", &patch).await.unwrap();
        assert_eq!(cache.snapshot().await, once);
    }

    #[tokio::test]
    async fn test_update_unknown_key_is_noop() {
        let cache: DomainCache<Trade> = DomainCache::new();
        cache.upsert_new(trade("t1")).await;

        let updated = cache
            .upsert_update("ghost", &json!({"id": "ghost", "status": "FAILED"}))
            .await
            .unwrap();
        assert!(!updated);
        assert_eq!(cache.len().await, 1);
        assert!(cache.get("ghost").await.is_none());
    }

    #[tokio::test]
    async fn test_update_rejects_bad_types_and_key_change() {
        let cache: DomainCache<Strategy> = DomainCache::new();
        cache.upsert_new(Strategy::new("s1", "Momentum")).await;
        let before = cache.get("s1").await;

        let err = cache
            .upsert_update("s1", &json!({"is_active": "yes"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidPayload(_)));

        let err = cache
            .upsert_update("s1", &json!({"id": "s2"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidPayload(_)));

        assert_eq!(cache.get("s1").await, before);
    }

    #[tokio::test]
    async fn test_update_accepts_field_alias() {
        let cache: DomainCache<Strategy> = DomainCache::new();
        cache
            .upsert_merge(&json!({"id": "s1", "strategy_type": "sniper"}))
            .await
            .unwrap();

        let updated = cache
            .upsert_update("s1", &json!({"id": "s1", "strategy_type": "smart_money"}))
            .await
            .unwrap();
        assert!(updated);
        assert_eq!(cache.get("s1").await.unwrap().strategy_type, "smart_money");

        cache
            .upsert_update("s1", &json!({"type": "early_bird"}))
            .await
            .unwrap();
        assert_eq!(cache.get("s1").await.unwrap().strategy_type, "early_bird");
    }

    #[tokio::test]
    async fn test_upsert_merge() {
        let cache: DomainCache<Trade> = DomainCache::new();

        let outcome = cache
            .upsert_merge(&json!({"id": "t1", "token_symbol": "BONK", "status": "COMPLETED"}))
            .await
            .unwrap();
        assert_eq!(outcome, UpsertOutcome::Inserted);

        let outcome = cache
            .upsert_merge(&json!({"id": "t1", "tx_hash": "5xyz"}))
            .await
            .unwrap();
        assert_eq!(outcome, UpsertOutcome::Replaced);

        let trade = cache.get("t1").await.unwrap();
        assert_eq!(trade.status, TradeStatus::Completed);
        assert_eq!(trade.tx_hash.as_deref(), Some("5xyz"));
        assert_eq!(cache.len().await, 1);

        assert!(cache.upsert_merge(&json!({"token_symbol": "X"})).await.is_err());
    }

    #[tokio::test]
    async fn test_remove_and_replace_all() {
        let cache: DomainCache<Token> = DomainCache::new();
        cache.upsert_new(Token::new("m1", "AAA")).await;

        assert!(cache.remove("missing").await.is_none());
        assert_eq!(cache.remove("m1").await.unwrap().symbol, "AAA");
        assert!(cache.is_empty().await);

        cache
            .replace_all(vec![
                Token::new("m1", "OLD"),
                Token::new("m2", "BBB"),
                Token::new("m1", "NEW"),
            ])
            .await;
        let snapshot = cache.snapshot().await;
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].symbol, "NEW");
    }

    #[tokio::test]
    async fn test_replace_field_returns_prior() {
        let cache: DomainCache<Position> = DomainCache::new();
        cache.upsert_new(Position::new("p1", "WIF")).await;

        let prior = cache
            .replace_field("p1", "status", json!("CLOSING"))
            .await
            .unwrap();
        assert_eq!(prior, Some(json!("OPEN")));
        assert_eq!(cache.get("p1").await.unwrap().status, PositionStatus::Closing);
        assert_eq!(cache.field("p1", "status").await, Some(json!("CLOSING")));

        assert_eq!(
            cache.replace_field("p9", "status", json!("CLOSING")).await.unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn test_find_key_and_modify_where() {
        let cache: DomainCache<Token> = DomainCache::new();
        cache.upsert_new(Token::new("m1", "SOL")).await;
        cache.upsert_new(Token::new("m2", "BONK")).await;

        assert_eq!(
            cache.find_key(|t| t.symbol == "BONK").await,
            Some("m2".to_string())
        );

        let modified = cache
            .modify_where(|t| t.symbol == "SOL", |t| t.price = dec!(150))
            .await;
        assert_eq!(modified, 1);
        assert_eq!(cache.get("m1").await.unwrap().price, dec!(150));
    }
}
