use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
    response::IntoResponse,
};
use serde::Deserialize;

use askbox_feeds::store::{ListQuery, NotificationStore};

#[derive(Debug, Deserialize)]
pub struct NotificationsQuery {
    #[serde(default)]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
    pub source: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

pub async fn list_notifications(
    State(store): State<Arc<NotificationStore>>,
    Query(query): Query<NotificationsQuery>,
) -> impl IntoResponse {
    let (notifications, total) = store
        .list(&ListQuery {
            limit: query.limit,
            offset: query.offset,
            source: query.source,
            kind: query.kind,
        })
        .await;

    Json(serde_json::json!({
        "notifications": notifications,
        "total": total,
        "last_fetch": store.last_fetch().await,
    }))
}

pub async fn feed_stats(State(store): State<Arc<NotificationStore>>) -> impl IntoResponse {
    Json(store.stats().await)
}
