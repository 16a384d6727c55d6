//! 관심목록 저장소.
//!
//! 관심목록은 소유 클라이언트 식별자(브로커 클라이언트 코드)로
//! 구분됩니다. 세션이 만료되어도 유지되며, 자동으로 만료되지
//! 않습니다. 모든 연산이 클라이언트 범위로 제한되므로 다른
//! 클라이언트의 목록은 보이지 않습니다.

use chrono::{DateTime, Utc};
use dash_core::{DashError, DashResult, ExchangeCode};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// 관심목록 항목.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchlistItem {
    /// 종목 토큰
    pub token: String,
    /// 거래소
    pub exchange: ExchangeCode,
    /// 표시용 심볼
    pub display_symbol: String,
}

/// 관심목록.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Watchlist {
    /// 목록 ID
    pub id: Uuid,
    /// 소유 클라이언트 식별자
    pub client_id: String,
    /// 목록 이름
    pub name: String,
    /// 항목
    pub items: Vec<WatchlistItem>,
    /// 생성 시각
    pub created_at: DateTime<Utc>,
    /// 마지막 수정 시각
    pub updated_at: DateTime<Utc>,
}

/// 인메모리 관심목록 저장소.
#[derive(Default)]
pub struct WatchlistStore {
    lists: RwLock<HashMap<Uuid, Watchlist>>,
}

impl WatchlistStore {
    /// 빈 저장소를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 클라이언트의 모든 목록 (이름순).
    pub async fn list(&self, client_id: &str) -> Vec<Watchlist> {
        let lists = self.lists.read().await;
        let mut result: Vec<Watchlist> = lists
            .values()
            .filter(|w| w.client_id == client_id)
            .cloned()
            .collect();
        result.sort_by(|a, b| a.name.cmp(&b.name));
        result
    }

    /// 새 목록을 생성합니다.
    pub async fn create(
        &self,
        client_id: impl Into<String>,
        name: impl Into<String>,
        items: Vec<WatchlistItem>,
    ) -> Watchlist {
        let now = Utc::now();
        let watchlist = Watchlist {
            id: Uuid::new_v4(),
            client_id: client_id.into(),
            name: name.into(),
            items,
            created_at: now,
            updated_at: now,
        };
        self.lists
            .write()
            .await
            .insert(watchlist.id, watchlist.clone());
        watchlist
    }

    /// 단일 목록 조회. 다른 클라이언트의 목록은 존재하지 않는 것과
    /// 같이 취급합니다.
    pub async fn get(&self, client_id: &str, id: Uuid) -> DashResult<Watchlist> {
        let lists = self.lists.read().await;
        lists
            .get(&id)
            .filter(|w| w.client_id == client_id)
            .cloned()
            .ok_or_else(|| DashError::NotFound(format!("watchlist {}", id)))
    }

    /// 소유 목록을 수정하는 내부 헬퍼.
    async fn update_owned<F>(&self, client_id: &str, id: Uuid, apply: F) -> DashResult<Watchlist>
    where
        F: FnOnce(&mut Watchlist),
    {
        let mut lists = self.lists.write().await;
        let watchlist = lists
            .get_mut(&id)
            .filter(|w| w.client_id == client_id)
            .ok_or_else(|| DashError::NotFound(format!("watchlist {}", id)))?;

        apply(watchlist);
        watchlist.updated_at = Utc::now();
        Ok(watchlist.clone())
    }

    /// 목록 이름 변경.
    pub async fn rename(
        &self,
        client_id: &str,
        id: Uuid,
        name: impl Into<String>,
    ) -> DashResult<Watchlist> {
        let name = name.into();
        self.update_owned(client_id, id, |w| w.name = name).await
    }

    /// 항목 추가. 이미 있는 토큰은 건너뜁니다.
    pub async fn add_items(
        &self,
        client_id: &str,
        id: Uuid,
        items: Vec<WatchlistItem>,
    ) -> DashResult<Watchlist> {
        self.update_owned(client_id, id, |w| {
            for item in items {
                if !w.items.iter().any(|existing| existing.token == item.token) {
                    w.items.push(item);
                }
            }
        })
        .await
    }

    /// 토큰으로 항목 제거.
    pub async fn remove_item(
        &self,
        client_id: &str,
        id: Uuid,
        token: &str,
    ) -> DashResult<Watchlist> {
        self.update_owned(client_id, id, |w| {
            w.items.retain(|item| item.token != token);
        })
        .await
    }

    /// 항목 전체 교체.
    pub async fn replace_items(
        &self,
        client_id: &str,
        id: Uuid,
        items: Vec<WatchlistItem>,
    ) -> DashResult<Watchlist> {
        self.update_owned(client_id, id, |w| w.items = items).await
    }

    /// 목록 삭제.
    pub async fn delete(&self, client_id: &str, id: Uuid) -> DashResult<()> {
        let mut lists = self.lists.write().await;
        match lists.get(&id) {
            Some(w) if w.client_id == client_id => {
                lists.remove(&id);
                Ok(())
            }
            _ => Err(DashError::NotFound(format!("watchlist {}", id))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(token: &str, symbol: &str) -> WatchlistItem {
        WatchlistItem {
            token: token.to_string(),
            exchange: ExchangeCode::Nse,
            display_symbol: symbol.to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_and_list() {
        let store = WatchlistStore::new();
        store.create("C1", "Indices", vec![item("99926000", "NIFTY")]).await;
        store.create("C1", "Banks", vec![]).await;

        let lists = store.list("C1").await;
        assert_eq!(lists.len(), 2);
        // 이름순 정렬
        assert_eq!(lists[0].name, "Banks");
        assert_eq!(lists[1].name, "Indices");
    }

    #[tokio::test]
    async fn test_client_isolation() {
        let store = WatchlistStore::new();
        let owned = store.create("C1", "Mine", vec![item("t1", "NIFTY")]).await;

        // C2는 목록도 못 보고 접근도 불가
        assert!(store.list("C2").await.is_empty());
        assert!(store.get("C2", owned.id).await.is_err());
        assert!(store.remove_item("C2", owned.id, "t1").await.is_err());
        assert!(store.delete("C2", owned.id).await.is_err());

        // C1에게는 그대로
        assert_eq!(store.get("C1", owned.id).await.unwrap().items.len(), 1);
    }

    #[tokio::test]
    async fn test_add_items_skips_duplicates() {
        let store = WatchlistStore::new();
        let list = store.create("C1", "Indices", vec![item("t1", "NIFTY")]).await;

        let updated = store
            .add_items(
                "C1",
                list.id,
                vec![item("t1", "NIFTY"), item("t2", "BANKNIFTY")],
            )
            .await
            .unwrap();

        assert_eq!(updated.items.len(), 2);
    }

    #[tokio::test]
    async fn test_remove_and_replace() {
        let store = WatchlistStore::new();
        let list = store
            .create("C1", "Indices", vec![item("t1", "NIFTY"), item("t2", "BANKNIFTY")])
            .await;

        let updated = store.remove_item("C1", list.id, "t1").await.unwrap();
        assert_eq!(updated.items.len(), 1);
        assert_eq!(updated.items[0].token, "t2");

        let replaced = store
            .replace_items("C1", list.id, vec![item("t3", "FINNIFTY")])
            .await
            .unwrap();
        assert_eq!(replaced.items.len(), 1);
        assert_eq!(replaced.items[0].token, "t3");
    }

    #[tokio::test]
    async fn test_updated_at_advances() {
        let store = WatchlistStore::new();
        let list = store.create("C1", "Indices", vec![]).await;

        let renamed = store.rename("C1", list.id, "Renamed").await.unwrap();
        assert_eq!(renamed.name, "Renamed");
        assert!(renamed.updated_at >= list.updated_at);
    }

    #[tokio::test]
    async fn test_delete() {
        let store = WatchlistStore::new();
        let list = store.create("C1", "Indices", vec![]).await;

        store.delete("C1", list.id).await.unwrap();
        assert!(store.get("C1", list.id).await.is_err());
        // 두 번째 삭제는 NotFound
        assert!(store.delete("C1", list.id).await.is_err());
    }
}
