//! In-memory Task Store (§4.B).

use std::collections::HashMap;

use async_trait::async_trait;
use cco_proto::{ExecutionId, Task, TaskId, TaskStatus, TaskStoreError, WorkspaceId};
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

/// Task Store backed by a `HashMap<TaskId, Task>` behind a `RwLock`.
pub struct MemoryTaskStore {
    tasks: RwLock<HashMap<TaskId, Task>>,
}

impl MemoryTaskStore {
    /// Create a new, empty task store.
    pub fn new() -> Self {
        Self { tasks: RwLock::new(HashMap::new()) }
    }
}

impl Default for MemoryTaskStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl cco_proto::TaskStore for MemoryTaskStore {
    async fn create(&self, task: Task) -> Result<(), TaskStoreError> {
        let mut tasks = self.tasks.write().await;
        tasks.insert(task.id.clone(), task);
        Ok(())
    }

    async fn update_status(
        &self,
        task_id: &TaskId,
        status: TaskStatus,
        result: Option<serde_json::Value>,
        error: Option<String>,
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<(), TaskStoreError> {
        let mut tasks = self.tasks.write().await;
        let task =
            tasks.get_mut(task_id).ok_or_else(|| TaskStoreError::NotFound(task_id.to_string()))?;

        if !task.status.can_transition_to(status) {
            return Err(TaskStoreError::IllegalTransition {
                task_id: task_id.to_string(),
                from: format!("{:?}", task.status),
                to: format!("{status:?}"),
            });
        }

        if status == TaskStatus::Running {
            task.started_at.get_or_insert_with(Utc::now);
        }
        task.status = status;
        if result.is_some() {
            task.result = result;
        }
        if error.is_some() {
            task.error = error;
        }
        if status.is_terminal() {
            task.completed_at = Some(completed_at.unwrap_or_else(Utc::now));
        }
        Ok(())
    }

    async fn get(&self, task_id: &TaskId) -> Result<Task, TaskStoreError> {
        let tasks = self.tasks.read().await;
        tasks.get(task_id).cloned().ok_or_else(|| TaskStoreError::NotFound(task_id.to_string()))
    }

    async fn get_by_execution_id(
        &self,
        execution_id: &ExecutionId,
    ) -> Result<Vec<Task>, TaskStoreError> {
        let tasks = self.tasks.read().await;
        Ok(tasks.values().filter(|t| &t.execution_id == execution_id).cloned().collect())
    }

    async fn list_pending(&self, workspace_id: &WorkspaceId) -> Result<Vec<Task>, TaskStoreError> {
        let tasks = self.tasks.read().await;
        Ok(tasks
            .values()
            .filter(|t| &t.workspace_id == workspace_id && t.status == TaskStatus::Pending)
            .cloned()
            .collect())
    }

    async fn list_running(&self, workspace_id: &WorkspaceId) -> Result<Vec<Task>, TaskStoreError> {
        let tasks = self.tasks.read().await;
        Ok(tasks
            .values()
            .filter(|t| &t.workspace_id == workspace_id && t.status == TaskStatus::Running)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cco_proto::{MessageId, SideEffectLevel, TaskStore as _};

    fn sample_task(id: &str) -> Task {
        let (auto_execute, requires_cta) = Task::defaults_for(SideEffectLevel::Readonly);
        Task {
            id: TaskId::from(id),
            workspace_id: WorkspaceId::from("ws-1"),
            message_id: MessageId::from("msg-1"),
            execution_id: ExecutionId::from("exec-1"),
            pack_id: "daily_plan".into(),
            task_type: "generate".into(),
            status: TaskStatus::Pending,
            params: serde_json::json!({}),
            result: None,
            side_effect_level: SideEffectLevel::Readonly,
            auto_execute,
            requires_cta,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            error: None,
        }
    }

    #[tokio::test]
    async fn create_then_get_round_trips() {
        let store = MemoryTaskStore::new();
        let task = sample_task("task-1");
        store.create(task.clone()).await.unwrap();
        let found = store.get(&task.id).await.unwrap();
        assert_eq!(found.id, task.id);
        assert_eq!(found.status, TaskStatus::Pending);
    }

    #[tokio::test]
    async fn legal_transition_sequence_succeeds() {
        let store = MemoryTaskStore::new();
        let task = sample_task("task-1");
        store.create(task.clone()).await.unwrap();

        store.update_status(&task.id, TaskStatus::Running, None, None, None).await.unwrap();
        let running = store.get(&task.id).await.unwrap();
        assert!(running.started_at.is_some());

        store
            .update_status(
                &task.id,
                TaskStatus::Succeeded,
                Some(serde_json::json!({"ok": true})),
                None,
                None,
            )
            .await
            .unwrap();
        let done = store.get(&task.id).await.unwrap();
        assert_eq!(done.status, TaskStatus::Succeeded);
        assert!(done.completed_at.is_some());
        assert_eq!(done.result, Some(serde_json::json!({"ok": true})));
    }

    #[tokio::test]
    async fn transition_out_of_terminal_status_is_rejected() {
        let store = MemoryTaskStore::new();
        let task = sample_task("task-1");
        store.create(task.clone()).await.unwrap();
        store.update_status(&task.id, TaskStatus::Running, None, None, None).await.unwrap();
        store.update_status(&task.id, TaskStatus::Failed, None, None, None).await.unwrap();

        let err = store
            .update_status(&task.id, TaskStatus::Running, None, None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, TaskStoreError::IllegalTransition { .. }));
    }

    #[tokio::test]
    async fn list_pending_and_running_are_workspace_scoped() {
        let store = MemoryTaskStore::new();
        let mut t1 = sample_task("task-1");
        let mut t2 = sample_task("task-2");
        t2.workspace_id = WorkspaceId::from("ws-2");
        store.create(t1.clone()).await.unwrap();
        store.create(t2.clone()).await.unwrap();

        let pending = store.list_pending(&WorkspaceId::from("ws-1")).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, t1.id);

        store.update_status(&t1.id, TaskStatus::Running, None, None, None).await.unwrap();
        t1.status = TaskStatus::Running;
        let running = store.list_running(&WorkspaceId::from("ws-1")).await.unwrap();
        assert_eq!(running.len(), 1);
    }
}
