use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;

const DEFAULT_CAP: usize = 1000;

#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub id: String,
    pub source: String,
    pub kind: String,
    pub title: String,
    pub url: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Query filters for listing notifications.
#[derive(Debug, Default, Clone)]
pub struct ListQuery {
    pub limit: usize,
    pub offset: usize,
    pub source: Option<String>,
    pub kind: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct FeedStats {
    pub total: usize,
    pub by_source: HashMap<String, usize>,
    pub by_kind: HashMap<String, usize>,
    pub last_fetch: Option<DateTime<Utc>>,
    /// Most recent fetch error per source; None once a source recovers.
    pub errors: HashMap<String, Option<String>>,
}

struct StoreInner {
    notifications: Vec<Notification>,
    last_fetch: Option<DateTime<Utc>>,
    errors: HashMap<String, Option<String>>,
}

/// Bounded newest-first notification buffer with id de-duplication.
pub struct NotificationStore {
    inner: RwLock<StoreInner>,
    cap: usize,
}

impl NotificationStore {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAP)
    }

    pub fn with_capacity(cap: usize) -> Self {
        Self {
            inner: RwLock::new(StoreInner {
                notifications: Vec::new(),
                last_fetch: None,
                errors: HashMap::new(),
            }),
            cap,
        }
    }

    /// Merge a fetched batch: drop ids already present, sort newest first,
    /// keep at most `cap` entries. Returns how many were actually new.
    pub async fn merge(&self, batch: Vec<Notification>) -> usize {
        let mut inner = self.inner.write().await;

        let existing: HashSet<String> =
            inner.notifications.iter().map(|n| n.id.clone()).collect();
        let fresh: Vec<Notification> = batch
            .into_iter()
            .filter(|n| !existing.contains(&n.id))
            .collect();
        let added = fresh.len();

        inner.notifications.extend(fresh);
        inner
            .notifications
            .sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        let cap = self.cap;
        inner.notifications.truncate(cap);

        added
    }

    pub async fn mark_fetched(&self) {
        self.inner.write().await.last_fetch = Some(Utc::now());
    }

    pub async fn record_error(&self, source: &str, error: Option<String>) {
        self.inner.write().await.errors.insert(source.to_string(), error);
    }

    pub async fn list(&self, query: &ListQuery) -> (Vec<Notification>, usize) {
        let inner = self.inner.read().await;
        let filtered: Vec<&Notification> = inner
            .notifications
            .iter()
            .filter(|n| query.source.as_deref().is_none_or(|s| n.source == s))
            .filter(|n| query.kind.as_deref().is_none_or(|k| n.kind == k))
            .collect();

        let total = filtered.len();
        let limit = if query.limit == 0 { 50 } else { query.limit };
        let page = filtered
            .into_iter()
            .skip(query.offset)
            .take(limit)
            .cloned()
            .collect();
        (page, total)
    }

    pub async fn last_fetch(&self) -> Option<DateTime<Utc>> {
        self.inner.read().await.last_fetch
    }

    pub async fn stats(&self) -> FeedStats {
        let inner = self.inner.read().await;
        let mut by_source: HashMap<String, usize> = HashMap::new();
        let mut by_kind: HashMap<String, usize> = HashMap::new();
        for n in &inner.notifications {
            *by_source.entry(n.source.clone()).or_default() += 1;
            *by_kind.entry(n.kind.clone()).or_default() += 1;
        }
        FeedStats {
            total: inner.notifications.len(),
            by_source,
            by_kind,
            last_fetch: inner.last_fetch,
            errors: inner.errors.clone(),
        }
    }
}

impl Default for NotificationStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn n(id: &str, source: &str, ts_secs: i64) -> Notification {
        Notification {
            id: id.to_string(),
            source: source.to_string(),
            kind: "post".to_string(),
            title: format!("item {}", id),
            url: None,
            timestamp: Utc.timestamp_opt(ts_secs, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn merge_dedups_by_id() {
        let store = NotificationStore::new();
        assert_eq!(store.merge(vec![n("a", "chess", 10), n("b", "chess", 20)]).await, 2);
        assert_eq!(store.merge(vec![n("a", "chess", 10), n("c", "chess", 30)]).await, 1);

        let (page, total) = store.list(&ListQuery::default()).await;
        assert_eq!(total, 3);
        // Newest first
        let ids: Vec<&str> = page.iter().map(|x| x.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "b", "a"]);
    }

    #[tokio::test]
    async fn buffer_is_capped_keeping_newest() {
        let store = NotificationStore::with_capacity(2);
        store.merge(vec![n("a", "x", 1), n("b", "x", 2), n("c", "x", 3)]).await;

        let (page, total) = store.list(&ListQuery::default()).await;
        assert_eq!(total, 2);
        let ids: Vec<&str> = page.iter().map(|x| x.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "b"]);
    }

    #[tokio::test]
    async fn list_filters_and_pages() {
        let store = NotificationStore::new();
        store
            .merge(vec![n("a", "chess", 1), n("b", "reddit", 2), n("c", "chess", 3)])
            .await;

        let (page, total) = store
            .list(&ListQuery {
                source: Some("chess".to_string()),
                ..Default::default()
            })
            .await;
        assert_eq!(total, 2);
        assert_eq!(page.len(), 2);

        let (page, total) = store
            .list(&ListQuery {
                limit: 1,
                offset: 1,
                ..Default::default()
            })
            .await;
        assert_eq!(total, 3);
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].id, "b");
    }

    #[tokio::test]
    async fn errors_track_latest_state_per_source() {
        let store = NotificationStore::new();
        store.record_error("chess", Some("timeout".to_string())).await;
        store.record_error("reddit", None).await;

        let stats = store.stats().await;
        assert_eq!(stats.errors.get("chess").unwrap().as_deref(), Some("timeout"));
        assert!(stats.errors.get("reddit").unwrap().is_none());

        store.record_error("chess", None).await;
        let stats = store.stats().await;
        assert!(stats.errors.get("chess").unwrap().is_none());
    }
}
