//! Default single-user [`IdentityPort`] implementation (§4.Q).

use async_trait::async_trait;
use cco_proto::{ExecutionContext, IdentityPort, ProfileId, WorkspaceId};

/// Always resolves to a fixed actor derived from whatever workspace/profile
/// ids the caller supplied, with an empty tag set. A deployment that needs
/// real multi-user identity swaps this adapter out; nothing upstream of the
/// [`IdentityPort`] trait changes.
#[derive(Debug, Clone, Default)]
pub struct LocalIdentityPort;

impl LocalIdentityPort {
    /// Build the default adapter.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl IdentityPort for LocalIdentityPort {
    async fn get_current_context(
        &self,
        workspace_id: Option<&WorkspaceId>,
        profile_id: Option<&ProfileId>,
    ) -> ExecutionContext {
        let workspace_id = workspace_id.cloned().unwrap_or_else(|| WorkspaceId::from("default"));
        let actor_id = profile_id.map(|p| p.as_str().to_string()).unwrap_or_else(|| "local-user".to_string());
        ExecutionContext { actor_id, workspace_id, tags: Vec::new(), mind_lens: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resolves_actor_from_supplied_profile() {
        let port = LocalIdentityPort::new();
        let ws = WorkspaceId::from("ws-1");
        let profile = ProfileId::from("profile-7");
        let ctx = port.get_current_context(Some(&ws), Some(&profile)).await;
        assert_eq!(ctx.actor_id, "profile-7");
        assert_eq!(ctx.workspace_id, ws);
        assert!(ctx.tags.is_empty());
    }

    #[tokio::test]
    async fn falls_back_when_nothing_supplied() {
        let port = LocalIdentityPort::new();
        let ctx = port.get_current_context(None, None).await;
        assert_eq!(ctx.actor_id, "local-user");
        assert_eq!(ctx.workspace_id, WorkspaceId::from("default"));
    }
}
