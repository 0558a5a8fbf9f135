//! WebSocket 구독 관리.
//!
//! 연결별 토픽 구독 집합과 클라이언트 세션 정보.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use sniper_core::Topic;
use tokio::sync::Mutex;

/// 연결 하나의 토픽 구독 집합.
///
/// 추가/제거는 멱등이며 다른 연결과 공유되지 않습니다.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscriptionSet {
    topics: BTreeSet<Topic>,
}

impl SubscriptionSet {
    /// 빈 구독 집합 생성.
    pub fn new() -> Self {
        Self::default()
    }

    /// 토픽 추가. 새로 추가된 토픽 수를 반환합니다.
    pub fn add(&mut self, topics: &[Topic]) -> usize {
        topics.iter().filter(|t| self.topics.insert(**t)).count()
    }

    /// 토픽 제거. 실제로 제거된 토픽 수를 반환합니다.
    pub fn remove(&mut self, topics: &[Topic]) -> usize {
        topics.iter().filter(|t| self.topics.remove(*t)).count()
    }

    /// 토픽 구독 여부.
    pub fn contains(&self, topic: Topic) -> bool {
        self.topics.contains(&topic)
    }

    /// 구독 중인 토픽 목록 (정렬됨).
    pub fn topics(&self) -> Vec<Topic> {
        self.topics.iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.topics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }
}

/// 클라이언트 세션 정보.
#[derive(Debug)]
pub struct ClientSession {
    /// 세션 ID (UUID v4)
    pub id: String,
    /// 연결 시각
    pub created_at: DateTime<Utc>,
    /// 인증된 사용자 ID (JWT `sub`)
    pub user_id: Option<String>,
    /// 구독 집합. 같은 연결의 변경은 이 뮤텍스로 직렬화됩니다.
    subscriptions: Mutex<SubscriptionSet>,
}

impl ClientSession {
    /// 새 세션 생성.
    pub fn new(user_id: Option<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            user_id,
            subscriptions: Mutex::new(SubscriptionSet::new()),
        }
    }

    /// 인증 여부.
    pub fn is_authenticated(&self) -> bool {
        self.user_id.is_some()
    }

    /// 토픽 구독 추가.
    pub async fn subscribe(&self, topics: &[Topic]) -> usize {
        self.subscriptions.lock().await.add(topics)
    }

    /// 토픽 구독 해제.
    pub async fn unsubscribe(&self, topics: &[Topic]) -> usize {
        self.subscriptions.lock().await.remove(topics)
    }

    /// 토픽 구독 여부.
    pub async fn is_subscribed(&self, topic: Topic) -> bool {
        self.subscriptions.lock().await.contains(topic)
    }

    /// 현재 구독 목록.
    pub async fn topics(&self) -> Vec<Topic> {
        self.subscriptions.lock().await.topics()
    }
}
