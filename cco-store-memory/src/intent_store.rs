//! In-memory IntentCard/IntentSignal/IntentLog storage (§3, §4.F, §4.L).

use std::collections::HashMap;

use async_trait::async_trait;
use cco_proto::{
    CoreError, IntentCard, IntentCardId, IntentCardStatus, IntentLog, IntentLogId, IntentPriority,
    IntentSignal, IntentSignalId, IntentSignalStatus, ProfileId, WorkspaceId,
};
use chrono::Duration;
use tokio::sync::RwLock;

/// Combined IntentCard/IntentSignal/IntentLog store.
///
/// Cards track a move-to-back insertion order so `list_visible_cards` can
/// return "most recently touched first" without requiring every card to
/// carry its own timestamp.
pub struct MemoryIntentStore {
    cards: RwLock<HashMap<IntentCardId, IntentCard>>,
    card_order: RwLock<Vec<IntentCardId>>,
    signals: RwLock<HashMap<IntentSignalId, (IntentSignal, chrono::DateTime<chrono::Utc>)>>,
    logs: RwLock<Vec<IntentLog>>,
}

impl MemoryIntentStore {
    /// Create a new, empty store.
    pub fn new() -> Self {
        Self {
            cards: RwLock::new(HashMap::new()),
            card_order: RwLock::new(Vec::new()),
            signals: RwLock::new(HashMap::new()),
            logs: RwLock::new(Vec::new()),
        }
    }
}

impl Default for MemoryIntentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl cco_proto::IntentStore for MemoryIntentStore {
    async fn put_card(&self, card: IntentCard) -> Result<(), CoreError> {
        let mut cards = self.cards.write().await;
        let mut order = self.card_order.write().await;
        order.retain(|id| id != &card.id);
        order.push(card.id.clone());
        cards.insert(card.id.clone(), card);
        Ok(())
    }

    async fn get_card(&self, id: &IntentCardId) -> Result<Option<IntentCard>, CoreError> {
        let cards = self.cards.read().await;
        Ok(cards.get(id).cloned())
    }

    async fn list_visible_cards(
        &self,
        profile_id: &ProfileId,
        limit: usize,
    ) -> Result<Vec<IntentCard>, CoreError> {
        let cards = self.cards.read().await;
        let order = self.card_order.read().await;
        let visible: Vec<IntentCard> = order
            .iter()
            .rev()
            .filter_map(|id| cards.get(id))
            .filter(|c| &c.profile_id == profile_id)
            .filter(|c| c.status == IntentCardStatus::Active)
            .filter(|c| matches!(c.priority, IntentPriority::High | IntentPriority::Medium))
            .take(limit)
            .cloned()
            .collect();
        Ok(visible)
    }

    async fn put_signal(&self, signal: IntentSignal) -> Result<(), CoreError> {
        let mut signals = self.signals.write().await;
        signals.insert(signal.id.clone(), (signal, chrono::Utc::now()));
        Ok(())
    }

    async fn recent_candidate_signals(
        &self,
        workspace_id: &WorkspaceId,
        window: Duration,
    ) -> Result<Vec<IntentSignal>, CoreError> {
        let signals = self.signals.read().await;
        let cutoff = chrono::Utc::now() - window;
        Ok(signals
            .values()
            .filter(|(s, seen_at)| {
                &s.workspace_id == workspace_id
                    && s.status == IntentSignalStatus::Candidate
                    && *seen_at >= cutoff
            })
            .map(|(s, _)| s.clone())
            .collect())
    }

    async fn update_signal_status(
        &self,
        id: &IntentSignalId,
        status: IntentSignalStatus,
    ) -> Result<(), CoreError> {
        let mut signals = self.signals.write().await;
        match signals.get_mut(id) {
            Some((signal, _)) => {
                signal.status = status;
                Ok(())
            }
            None => Err(CoreError::UserError(format!("unknown intent signal: {id}"))),
        }
    }

    async fn append_log(&self, log: IntentLog) -> Result<IntentLogId, CoreError> {
        let id = log.id.clone();
        let mut logs = self.logs.write().await;
        logs.push(log);
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cco_proto::{IntentLogPhase, IntentSignalSource, IntentStore as _};

    fn sample_card(id: &str, profile: &str, priority: IntentPriority) -> IntentCard {
        IntentCard {
            id: IntentCardId::from(id),
            profile_id: ProfileId::from(profile),
            title: "Ship the launch plan".into(),
            description: String::new(),
            status: IntentCardStatus::Active,
            priority,
            tags: vec![],
            category: None,
            progress_percentage: 0,
            metadata: serde_json::json!({}),
        }
    }

    #[tokio::test]
    async fn visible_cards_excludes_low_priority_and_other_profiles() {
        let store = MemoryIntentStore::new();
        store.put_card(sample_card("card-1", "profile-1", IntentPriority::High)).await.unwrap();
        store.put_card(sample_card("card-2", "profile-1", IntentPriority::Low)).await.unwrap();
        store.put_card(sample_card("card-3", "profile-2", IntentPriority::High)).await.unwrap();

        let visible =
            store.list_visible_cards(&ProfileId::from("profile-1"), 20).await.unwrap();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].id, IntentCardId::from("card-1"));
    }

    #[tokio::test]
    async fn visible_cards_respects_limit_and_recency_order() {
        let store = MemoryIntentStore::new();
        for i in 0..3 {
            store
                .put_card(sample_card(
                    &format!("card-{i}"),
                    "profile-1",
                    IntentPriority::Medium,
                ))
                .await
                .unwrap();
        }
        let visible =
            store.list_visible_cards(&ProfileId::from("profile-1"), 2).await.unwrap();
        assert_eq!(visible.len(), 2);
        assert_eq!(visible[0].id, IntentCardId::from("card-2"));
    }

    #[tokio::test]
    async fn recent_candidate_signals_filters_by_status_and_window() {
        let store = MemoryIntentStore::new();
        let ws = WorkspaceId::from("ws-1");
        let candidate = IntentSignal {
            id: IntentSignalId::from("sig-1"),
            workspace_id: ws.clone(),
            profile_id: ProfileId::from("profile-1"),
            label: "wants to plan a trip".into(),
            confidence: 0.8,
            source: IntentSignalSource::Rule,
            message_id: None,
            status: IntentSignalStatus::Candidate,
        };
        store.put_signal(candidate.clone()).await.unwrap();

        let recent =
            store.recent_candidate_signals(&ws, Duration::minutes(5)).await.unwrap();
        assert_eq!(recent.len(), 1);

        store
            .update_signal_status(&candidate.id, IntentSignalStatus::Accepted)
            .await
            .unwrap();
        let recent =
            store.recent_candidate_signals(&ws, Duration::minutes(5)).await.unwrap();
        assert!(recent.is_empty());
    }

    #[tokio::test]
    async fn append_log_is_retained() {
        let store = MemoryIntentStore::new();
        let log = IntentLog {
            id: IntentLogId::from("log-1"),
            workspace_id: WorkspaceId::from("ws-1"),
            profile_id: ProfileId::from("profile-1"),
            raw_input: "plan my week".into(),
            channel: "api".into(),
            pipeline_steps: serde_json::json!({}),
            final_decision: serde_json::json!({}),
            user_override: None,
            phase: IntentLogPhase::Pipeline,
            created_at: chrono::Utc::now(),
        };
        let id = store.append_log(log).await.unwrap();
        assert_eq!(id, IntentLogId::from("log-1"));
    }
}
