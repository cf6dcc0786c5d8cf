//! In-memory Timeline Store (§4.C).

use std::collections::HashMap;

use async_trait::async_trait;
use cco_proto::{
    Cta, MessageId, TimelineItem, TimelineItemId, TimelineStoreError, WorkspaceId,
};
use tokio::sync::RwLock;

/// Timeline Store backed by a `HashMap<TimelineItemId, TimelineItem>` plus
/// insertion order, behind a `RwLock`.
pub struct MemoryTimelineStore {
    items: RwLock<HashMap<TimelineItemId, TimelineItem>>,
    order: RwLock<Vec<TimelineItemId>>,
}

impl MemoryTimelineStore {
    /// Create a new, empty timeline store.
    pub fn new() -> Self {
        Self { items: RwLock::new(HashMap::new()), order: RwLock::new(Vec::new()) }
    }
}

impl Default for MemoryTimelineStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl cco_proto::TimelineStore for MemoryTimelineStore {
    async fn create(&self, item: TimelineItem) -> Result<(), TimelineStoreError> {
        let mut items = self.items.write().await;
        let mut order = self.order.write().await;
        order.push(item.id.clone());
        items.insert(item.id.clone(), item);
        Ok(())
    }

    async fn list_by_workspace(
        &self,
        workspace_id: &WorkspaceId,
        limit: Option<usize>,
    ) -> Result<Vec<TimelineItem>, TimelineStoreError> {
        let items = self.items.read().await;
        let order = self.order.read().await;
        let mut matched: Vec<TimelineItem> = order
            .iter()
            .rev()
            .filter_map(|id| items.get(id))
            .filter(|i| &i.workspace_id == workspace_id)
            .cloned()
            .collect();
        if let Some(limit) = limit {
            matched.truncate(limit);
        }
        Ok(matched)
    }

    async fn list_by_message(
        &self,
        message_id: &MessageId,
    ) -> Result<Vec<TimelineItem>, TimelineStoreError> {
        let items = self.items.read().await;
        Ok(items.values().filter(|i| &i.message_id == message_id).cloned().collect())
    }

    async fn update(
        &self,
        item_id: &TimelineItemId,
        data: Option<serde_json::Value>,
        cta: Option<Vec<Cta>>,
    ) -> Result<(), TimelineStoreError> {
        let mut items = self.items.write().await;
        let item = items
            .get_mut(item_id)
            .ok_or_else(|| TimelineStoreError::NotFound(item_id.to_string()))?;
        if let Some(data) = data {
            item.data = data;
        }
        if cta.is_some() {
            item.cta = cta;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cco_proto::{TimelineItemType, TimelineStore as _};
    use chrono::Utc;

    fn sample_item(id: &str, workspace_id: &str) -> TimelineItem {
        TimelineItem {
            id: TimelineItemId::from(id),
            workspace_id: WorkspaceId::from(workspace_id),
            message_id: MessageId::from("msg-1"),
            task_id: None,
            item_type: TimelineItemType::DailyPlan,
            title: "Today's plan".into(),
            summary: "3 items".into(),
            data: serde_json::json!({}),
            cta: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn create_then_list_by_workspace_most_recent_first() {
        let store = MemoryTimelineStore::new();
        store.create(sample_item("item-1", "ws-1")).await.unwrap();
        store.create(sample_item("item-2", "ws-1")).await.unwrap();

        let items = store.list_by_workspace(&WorkspaceId::from("ws-1"), None).await.unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].id, TimelineItemId::from("item-2"));
    }

    #[tokio::test]
    async fn update_patches_only_supplied_fields() {
        let store = MemoryTimelineStore::new();
        let item = sample_item("item-1", "ws-1");
        store.create(item.clone()).await.unwrap();

        store
            .update(
                &item.id,
                Some(serde_json::json!({"patched": true})),
                Some(vec![Cta {
                    label: "Confirm".into(),
                    action: "confirm".into(),
                    pack_id: None,
                }]),
            )
            .await
            .unwrap();

        let items = store.list_by_workspace(&WorkspaceId::from("ws-1"), None).await.unwrap();
        assert_eq!(items[0].data, serde_json::json!({"patched": true}));
        assert_eq!(items[0].cta.as_ref().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn list_by_message_finds_matching_items() {
        let store = MemoryTimelineStore::new();
        store.create(sample_item("item-1", "ws-1")).await.unwrap();
        let found = store.list_by_message(&MessageId::from("msg-1")).await.unwrap();
        assert_eq!(found.len(), 1);
    }
}
