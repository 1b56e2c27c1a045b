//! In-memory search session store.
//!
//! Durable persistence of sessions, results, and clicks is a deliberate
//! non-goal of this service; sessions live for the reuse window and die
//! with the process. The store is the single shared-state component of
//! the server and every method takes the lock briefly with no awaits
//! inside.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use uuid::Uuid;

use partscout_core::NormalizedResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Processing,
    Complete,
    Empty,
    Failed,
}

/// One stored result row: a pipeline output with a server-assigned id so
/// clicks can reference it.
#[derive(Debug, Clone, Serialize)]
pub struct StoredResult {
    pub id: Uuid,
    #[serde(flatten)]
    pub result: NormalizedResult,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClickEvent {
    pub result_id: Uuid,
    pub clicked_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchSession {
    pub id: Uuid,
    #[serde(skip)]
    pub search_hash: String,
    pub query: Option<String>,
    pub image_url: Option<String>,
    pub country: Option<String>,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
    pub results: Vec<StoredResult>,
    pub clicks: Vec<ClickEvent>,
}

#[derive(Clone, Default)]
pub struct SessionStore {
    inner: Arc<RwLock<HashMap<Uuid, SearchSession>>>,
}

impl SessionStore {
    /// Creates a new `processing` session and returns its id.
    pub async fn create_session(
        &self,
        search_hash: String,
        query: Option<String>,
        image_url: Option<String>,
        country: Option<String>,
    ) -> Uuid {
        let id = Uuid::new_v4();
        let session = SearchSession {
            id,
            search_hash,
            query,
            image_url,
            country,
            status: SessionStatus::Processing,
            created_at: Utc::now(),
            results: Vec::new(),
            clicks: Vec::new(),
        };
        self.inner.write().await.insert(id, session);
        id
    }

    /// Finds the most recent `complete` session with the given search hash
    /// inside the reuse window.
    pub async fn find_reusable(
        &self,
        search_hash: &str,
        window: chrono::Duration,
    ) -> Option<Uuid> {
        let cutoff = Utc::now()
            .checked_sub_signed(window)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        self.inner
            .read()
            .await
            .values()
            .filter(|s| {
                s.search_hash == search_hash
                    && s.status == SessionStatus::Complete
                    && s.created_at > cutoff
            })
            .max_by_key(|s| s.created_at)
            .map(|s| s.id)
    }

    pub async fn set_status(&self, id: Uuid, status: SessionStatus) {
        if let Some(session) = self.inner.write().await.get_mut(&id) {
            session.status = status;
        }
    }

    /// Stores pipeline output on the session, assigning result ids, and
    /// marks it `complete`.
    pub async fn store_results(&self, id: Uuid, results: Vec<NormalizedResult>) {
        if let Some(session) = self.inner.write().await.get_mut(&id) {
            session.results = results
                .into_iter()
                .map(|result| StoredResult {
                    id: Uuid::new_v4(),
                    result,
                })
                .collect();
            session.status = SessionStatus::Complete;
        }
    }

    pub async fn get(&self, id: Uuid) -> Option<SearchSession> {
        self.inner.read().await.get(&id).cloned()
    }

    /// Records a click against a session. Returns `false` when the session
    /// does not exist.
    pub async fn record_click(&self, session_id: Uuid, result_id: Uuid) -> bool {
        match self.inner.write().await.get_mut(&session_id) {
            Some(session) => {
                session.clicks.push(ClickEvent {
                    result_id,
                    clicked_at: Utc::now(),
                });
                true
            }
            None => false,
        }
    }

    #[cfg(test)]
    async fn backdate(&self, id: Uuid, created_at: DateTime<Utc>) {
        if let Some(session) = self.inner.write().await.get_mut(&id) {
            session.created_at = created_at;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_result(title: &str) -> NormalizedResult {
        NormalizedResult {
            provider_id: "ebay".to_owned(),
            title: title.to_owned(),
            brand: None,
            image: "https://cdn.example.com/img.jpg".to_owned(),
            store: "store.example.com".to_owned(),
            price: 49.99,
            currency: "USD".to_owned(),
            shipping_price: None,
            condition: None,
            availability: None,
            rating: None,
            review_count: None,
            marketplace: None,
            product_url: "https://store.example.com/pads".to_owned(),
            match_score: 0.5,
        }
    }

    #[tokio::test]
    async fn created_session_is_processing() {
        let store = SessionStore::default();
        let id = store
            .create_session("hash".into(), Some("brake pads".into()), None, None)
            .await;
        let session = store.get(id).await.unwrap();
        assert_eq!(session.status, SessionStatus::Processing);
        assert!(session.results.is_empty());
    }

    #[tokio::test]
    async fn store_results_assigns_ids_and_completes() {
        let store = SessionStore::default();
        let id = store
            .create_session("hash".into(), Some("brake pads".into()), None, None)
            .await;
        store
            .store_results(id, vec![make_result("a"), make_result("b")])
            .await;
        let session = store.get(id).await.unwrap();
        assert_eq!(session.status, SessionStatus::Complete);
        assert_eq!(session.results.len(), 2);
        assert_ne!(session.results[0].id, session.results[1].id);
    }

    #[tokio::test]
    async fn reuse_finds_recent_complete_session() {
        let store = SessionStore::default();
        let id = store
            .create_session("hash".into(), Some("brake pads".into()), None, None)
            .await;
        store.store_results(id, vec![make_result("a")]).await;
        let found = store
            .find_reusable("hash", chrono::Duration::hours(24))
            .await;
        assert_eq!(found, Some(id));
    }

    #[tokio::test]
    async fn reuse_ignores_processing_and_failed_sessions() {
        let store = SessionStore::default();
        store.create_session("hash".into(), None, None, None).await;
        let failed = store.create_session("hash".into(), None, None, None).await;
        store.set_status(failed, SessionStatus::Failed).await;
        assert!(store
            .find_reusable("hash", chrono::Duration::hours(24))
            .await
            .is_none());
    }

    #[tokio::test]
    async fn reuse_ignores_sessions_outside_the_window() {
        let store = SessionStore::default();
        let id = store.create_session("hash".into(), None, None, None).await;
        store.store_results(id, vec![make_result("a")]).await;
        store
            .backdate(id, Utc::now() - chrono::Duration::hours(25))
            .await;
        assert!(store
            .find_reusable("hash", chrono::Duration::hours(24))
            .await
            .is_none());
    }

    #[tokio::test]
    async fn reuse_does_not_cross_hashes() {
        let store = SessionStore::default();
        let id = store
            .create_session("hash-a".into(), None, None, None)
            .await;
        store.store_results(id, vec![make_result("a")]).await;
        assert!(store
            .find_reusable("hash-b", chrono::Duration::hours(24))
            .await
            .is_none());
    }

    #[tokio::test]
    async fn clicks_append_to_the_session() {
        let store = SessionStore::default();
        let id = store.create_session("hash".into(), None, None, None).await;
        let result_id = Uuid::new_v4();
        assert!(store.record_click(id, result_id).await);
        let session = store.get(id).await.unwrap();
        assert_eq!(session.clicks.len(), 1);
        assert_eq!(session.clicks[0].result_id, result_id);
    }

    #[tokio::test]
    async fn click_on_unknown_session_is_rejected() {
        let store = SessionStore::default();
        assert!(!store.record_click(Uuid::new_v4(), Uuid::new_v4()).await);
    }
}
