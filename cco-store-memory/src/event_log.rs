//! In-memory Event Log (§4.A).

use async_trait::async_trait;
use cco_proto::{Event, EventId, EventLog, EventLogError, EventType, ThreadId, WorkspaceId};
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

/// Append-only event log backed by a `Vec` behind a `RwLock`.
///
/// Ordering is insertion order, which is also chronological since callers
/// assign monotonic timestamps before appending (§3 Event invariant).
pub struct MemoryEventLog {
    events: RwLock<Vec<Event>>,
}

impl MemoryEventLog {
    /// Create a new, empty event log.
    pub fn new() -> Self {
        Self { events: RwLock::new(Vec::new()) }
    }
}

impl Default for MemoryEventLog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventLog for MemoryEventLog {
    async fn append(&self, event: Event) -> Result<EventId, EventLogError> {
        let id = event.id.clone();
        let mut events = self.events.write().await;
        events.push(event);
        Ok(id)
    }

    async fn list(
        &self,
        workspace_id: &WorkspaceId,
        thread_id: Option<&ThreadId>,
        types: Option<&[EventType]>,
        start_time: Option<DateTime<Utc>>,
        end_time: Option<DateTime<Utc>>,
        limit: Option<usize>,
        before_id: Option<&EventId>,
    ) -> Result<Vec<Event>, EventLogError> {
        let events = self.events.read().await;

        let before_index = match before_id {
            Some(id) => match events.iter().position(|e| &e.id == id) {
                Some(idx) => idx,
                None => events.len(),
            },
            None => events.len(),
        };

        let mut matched: Vec<Event> = events[..before_index]
            .iter()
            .filter(|e| &e.workspace_id == workspace_id)
            .filter(|e| thread_id.is_none_or(|t| e.thread_id.as_ref() == Some(t)))
            .filter(|e| types.is_none_or(|ts| ts.contains(&e.event_type)))
            .filter(|e| start_time.is_none_or(|s| e.timestamp >= s))
            .filter(|e| end_time.is_none_or(|en| e.timestamp <= en))
            .cloned()
            .collect();

        if let Some(limit) = limit {
            let cut = matched.len().saturating_sub(limit);
            matched.drain(..cut);
        }

        Ok(matched)
    }

    async fn count_messages_by_thread(
        &self,
        workspace_id: &WorkspaceId,
        thread_id: &ThreadId,
    ) -> Result<u64, EventLogError> {
        let events = self.events.read().await;
        let count = events
            .iter()
            .filter(|e| &e.workspace_id == workspace_id)
            .filter(|e| e.thread_id.as_ref() == Some(thread_id))
            .filter(|e| matches!(e.event_type, EventType::Message))
            .count();
        Ok(count as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cco_proto::Actor;

    fn sample_event(workspace_id: &WorkspaceId, ts_offset_secs: i64) -> Event {
        Event::new(
            EventId::from(format!("evt-{ts_offset_secs}")),
            Utc::now() + chrono::Duration::seconds(ts_offset_secs),
            Actor::User,
            EventType::Message,
            workspace_id.clone(),
        )
    }

    #[tokio::test]
    async fn append_then_list_round_trips() {
        let log = MemoryEventLog::new();
        let ws = WorkspaceId::from("ws-1");
        let ev = sample_event(&ws, 0);
        log.append(ev.clone()).await.unwrap();

        let found = log.list(&ws, None, None, None, None, None, None).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, ev.id);
    }

    #[tokio::test]
    async fn list_isolates_by_workspace() {
        let log = MemoryEventLog::new();
        let ws_a = WorkspaceId::from("ws-a");
        let ws_b = WorkspaceId::from("ws-b");
        log.append(sample_event(&ws_a, 0)).await.unwrap();
        log.append(sample_event(&ws_b, 1)).await.unwrap();

        let found = log.list(&ws_a, None, None, None, None, None, None).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].workspace_id, ws_a);
    }

    #[tokio::test]
    async fn limit_keeps_most_recent() {
        let log = MemoryEventLog::new();
        let ws = WorkspaceId::from("ws-1");
        for i in 0..5 {
            log.append(sample_event(&ws, i)).await.unwrap();
        }
        let found = log.list(&ws, None, None, None, None, Some(2), None).await.unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].id, EventId::from("evt-3"));
        assert_eq!(found[1].id, EventId::from("evt-4"));
    }

    #[tokio::test]
    async fn count_messages_by_thread_only_counts_message_events() {
        let log = MemoryEventLog::new();
        let ws = WorkspaceId::from("ws-1");
        let thread = ThreadId::from("thread-1");
        let mut msg = sample_event(&ws, 0);
        msg.thread_id = Some(thread.clone());
        log.append(msg).await.unwrap();

        let mut other = sample_event(&ws, 1);
        other.thread_id = Some(thread.clone());
        other.event_type = EventType::TaskUpdate;
        log.append(other).await.unwrap();

        let count = log.count_messages_by_thread(&ws, &thread).await.unwrap();
        assert_eq!(count, 1);
    }
}
