use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::sources::FeedSource;
use crate::store::NotificationStore;

/// Background task that polls every source on an interval.
///
/// Sources fail independently: an error is recorded against that source and
/// cleared on its next success, while the other sources still merge.
pub async fn run_poll_loop(
    store: Arc<NotificationStore>,
    sources: Vec<Box<dyn FeedSource>>,
    interval_secs: u64,
) {
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));

    loop {
        interval.tick().await;
        poll_once(&store, &sources).await;
    }
}

pub async fn poll_once(store: &NotificationStore, sources: &[Box<dyn FeedSource>]) {
    let mut added = 0;

    for source in sources {
        match source.fetch().await {
            Ok(batch) => {
                added += store.merge(batch).await;
                store.record_error(source.name(), None).await;
            }
            Err(e) => {
                warn!(source = source.name(), error = %e, "feed fetch failed");
                store.record_error(source.name(), Some(e.to_string())).await;
            }
        }
    }

    store.mark_fetched().await;
    if added > 0 {
        info!(added, "merged new notifications");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Notification;
    use anyhow::anyhow;
    use chrono::Utc;
    use futures_util::future::BoxFuture;

    struct FixedSource {
        name: &'static str,
        items: Vec<Notification>,
    }

    impl FeedSource for FixedSource {
        fn name(&self) -> &'static str {
            self.name
        }
        fn fetch(&self) -> BoxFuture<'_, anyhow::Result<Vec<Notification>>> {
            Box::pin(async move { Ok(self.items.clone()) })
        }
    }

    struct BrokenSource;

    impl FeedSource for BrokenSource {
        fn name(&self) -> &'static str {
            "broken"
        }
        fn fetch(&self) -> BoxFuture<'_, anyhow::Result<Vec<Notification>>> {
            Box::pin(async move { Err(anyhow!("connection refused")) })
        }
    }

    fn item(id: &str) -> Notification {
        Notification {
            id: id.to_string(),
            source: "fixed".to_string(),
            kind: "post".to_string(),
            title: id.to_string(),
            url: None,
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn one_broken_source_does_not_stop_the_pass() {
        let store = NotificationStore::new();
        let sources: Vec<Box<dyn FeedSource>> = vec![
            Box::new(BrokenSource),
            Box::new(FixedSource {
                name: "fixed",
                items: vec![item("a"), item("b")],
            }),
        ];

        poll_once(&store, &sources).await;

        let stats = store.stats().await;
        assert_eq!(stats.total, 2);
        assert!(stats.errors.get("broken").unwrap().is_some());
        assert!(stats.errors.get("fixed").unwrap().is_none());
        assert!(store.last_fetch().await.is_some());
    }
}
