//! 세션 저장소.
//!
//! 업스트림 브로커 로그인으로 만들어진 세션을 메모리에 보관합니다.
//! 세션은 생성 후 일정 시간(기본 8시간)이 지나면 만료되며, 만료된
//! 세션은 검증 시점 또는 주기적 정리 때 제거됩니다.

use chrono::{DateTime, Duration, Utc};
use dash_core::{DashError, DashResult, SessionTokens};
use rand::Rng;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// 세션 항목.
#[derive(Debug, Clone)]
pub struct SessionEntry {
    /// 세션 ID
    pub id: String,
    /// 업스트림 세션 토큰
    pub tokens: SessionTokens,
    /// 클라이언트 식별자 (브로커 클라이언트 코드)
    pub client_id: String,
    /// 접속 출처 (User-Agent 등, 선택적)
    pub origin: Option<String>,
    /// 생성 시각
    pub created_at: DateTime<Utc>,
}

impl SessionEntry {
    /// 주어진 시각 기준으로 만료 여부 확인.
    pub fn is_expired_at(&self, now: DateTime<Utc>, timeout: Duration) -> bool {
        now - self.created_at > timeout
    }
}

/// 인메모리 세션 저장소.
pub struct SessionStore {
    sessions: RwLock<HashMap<String, SessionEntry>>,
    timeout: Duration,
}

impl SessionStore {
    /// 주어진 만료 시간으로 저장소를 생성합니다.
    pub fn new(timeout_secs: u64) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            timeout: Duration::seconds(timeout_secs as i64),
        }
    }

    /// 새 세션 ID 생성. 밀리초 타임스탬프 + 랜덤 16진수 접미사로
    /// 재사용이 불가능합니다.
    fn new_id() -> String {
        let suffix: u64 = rand::thread_rng().gen();
        format!("{}-{:016x}", Utc::now().timestamp_millis(), suffix)
    }

    /// 새 세션을 생성하고 ID를 반환합니다.
    pub async fn create(
        &self,
        tokens: SessionTokens,
        client_id: impl Into<String>,
        origin: Option<String>,
    ) -> String {
        let id = Self::new_id();
        let entry = SessionEntry {
            id: id.clone(),
            tokens,
            client_id: client_id.into(),
            origin,
            created_at: Utc::now(),
        };
        self.sessions.write().await.insert(id.clone(), entry);
        id
    }

    /// 만료 검사 없이 세션을 조회합니다.
    pub async fn get(&self, id: &str) -> Option<SessionEntry> {
        self.sessions.read().await.get(id).cloned()
    }

    /// 세션을 검증합니다. 만료된 세션은 즉시 제거됩니다.
    pub async fn validate(&self, id: &str) -> DashResult<SessionEntry> {
        self.validate_at(id, Utc::now()).await
    }

    /// 주어진 시각 기준으로 세션을 검증합니다.
    pub async fn validate_at(&self, id: &str, now: DateTime<Utc>) -> DashResult<SessionEntry> {
        let mut sessions = self.sessions.write().await;
        match sessions.get(id) {
            None => Err(DashError::Session("invalid session".to_string())),
            Some(entry) if entry.is_expired_at(now, self.timeout) => {
                sessions.remove(id);
                Err(DashError::Session("session expired".to_string()))
            }
            Some(entry) => Ok(entry.clone()),
        }
    }

    /// 세션을 제거합니다. 이미 없는 세션이어도 에러가 아닙니다.
    pub async fn destroy(&self, id: &str) {
        self.sessions.write().await.remove(id);
    }

    /// 만료된 세션을 모두 제거하고 제거된 수를 반환합니다.
    pub async fn sweep_expired(&self) -> usize {
        self.sweep_expired_at(Utc::now()).await
    }

    /// 주어진 시각 기준으로 만료 세션을 정리합니다.
    pub async fn sweep_expired_at(&self, now: DateTime<Utc>) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, entry| !entry.is_expired_at(now, self.timeout));
        before - sessions.len()
    }

    /// 활성 세션 수.
    pub async fn count(&self) -> usize {
        self.sessions.read().await.len()
    }
}
