#![deny(missing_docs)]
//! In-process Playbook Registry (§4.D).
//!
//! Modeled after `agent-tool`'s `ToolRegistry`: a `HashMap` keyed by a
//! stable code, behind a lock, with a plain `register`/`get` surface.
//! Unlike the tool registry, `register` here is also the override
//! mechanism — the resolved reading of §4.D's Open Question is that a
//! later `register` call for the same `playbook_code` simply replaces the
//! earlier row, so precedence falls entirely out of call order rather than
//! out of any priority comparison at lookup time. Callers (typically a
//! capability-pack loader) are responsible for calling `register` in
//! `BuiltIn`, then `CapabilityPack`, then `UserDefined` order at startup.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use cco_proto::{Playbook, PlaybookMetadata, PlaybookRegistryError, PlaybookRun, PlaybookSource, WorkspaceId};

struct Entry {
    playbook: Playbook,
    source: PlaybookSource,
}

/// In-memory Playbook Registry.
pub struct MemoryPlaybookRegistry {
    entries: RwLock<HashMap<String, Entry>>,
}

impl MemoryPlaybookRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self { entries: RwLock::new(HashMap::new()) }
    }

    /// Seed the registry with the built-in system capabilities this process
    /// ships with. Call before loading any capability pack or user-defined
    /// playbook, so later `register` calls win on code collision.
    pub fn with_built_ins(self, built_ins: impl IntoIterator<Item = Playbook>) -> Self {
        {
            let mut entries = self.entries.write().expect("registry lock poisoned");
            for playbook in built_ins {
                entries.insert(
                    playbook.playbook_code.clone(),
                    Entry { playbook, source: PlaybookSource::BuiltIn },
                );
            }
        }
        self
    }
}

impl Default for MemoryPlaybookRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl cco_proto::PlaybookRegistry for MemoryPlaybookRegistry {
    async fn list(
        &self,
        _workspace_id: &WorkspaceId,
        _locale: &str,
        source: Option<PlaybookSource>,
    ) -> Result<Vec<PlaybookMetadata>, PlaybookRegistryError> {
        let entries = self.entries.read().expect("registry lock poisoned");
        Ok(entries
            .values()
            .filter(|e| source.is_none_or(|s| e.source == s))
            .map(|e| PlaybookMetadata {
                playbook_code: e.playbook.playbook_code.clone(),
                name: e.playbook.name.clone(),
                description: e.playbook.description.clone(),
                tags: e.playbook.tags.clone(),
                source: e.source,
            })
            .collect())
    }

    async fn get(
        &self,
        playbook_code: &str,
        _locale: &str,
        _workspace_id: &WorkspaceId,
    ) -> Result<Option<Playbook>, PlaybookRegistryError> {
        let entries = self.entries.read().expect("registry lock poisoned");
        Ok(entries.get(playbook_code).map(|e| e.playbook.clone()))
    }

    async fn load_run(
        &self,
        playbook_code: &str,
        _locale: &str,
        _workspace_id: &WorkspaceId,
    ) -> Result<Option<PlaybookRun>, PlaybookRegistryError> {
        let entries = self.entries.read().expect("registry lock poisoned");
        Ok(entries.get(playbook_code).map(|e| PlaybookRun { playbook: e.playbook.clone() }))
    }

    async fn register(
        &self,
        playbook: Playbook,
        source: PlaybookSource,
    ) -> Result<(), PlaybookRegistryError> {
        if playbook.playbook_code.trim().is_empty() {
            return Err(PlaybookRegistryError::MalformedManifest {
                code: playbook.playbook_code,
                reason: "playbook_code must not be empty".into(),
            });
        }
        let mut entries = self.entries.write().expect("registry lock poisoned");
        tracing::debug!(
            playbook_code = %playbook.playbook_code,
            ?source,
            replaced = entries.contains_key(&playbook.playbook_code),
            "registering playbook"
        );
        entries.insert(playbook.playbook_code.clone(), Entry { playbook, source });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cco_proto::{InteractionMode, PlaybookKind, PlaybookRegistry as _};

    fn sample(code: &str) -> Playbook {
        Playbook {
            playbook_code: code.into(),
            name: "Daily plan".into(),
            description: "Generates a daily plan".into(),
            tags: vec!["planning".into()],
            output_types: vec!["daily_plan".into()],
            kind: PlaybookKind::SystemTool,
            interaction_mode: vec![InteractionMode::Conversational],
            steps: None,
        }
    }

    #[tokio::test]
    async fn later_register_replaces_earlier_regardless_of_source() {
        use cco_proto::PlaybookRegistry as _;
        let registry = MemoryPlaybookRegistry::new();
        registry.register(sample("daily_plan"), PlaybookSource::BuiltIn).await.unwrap();

        let mut overridden = sample("daily_plan");
        overridden.name = "Custom daily plan".into();
        registry.register(overridden, PlaybookSource::UserDefined).await.unwrap();

        let resolved = registry
            .get("daily_plan", "en", &WorkspaceId::from("ws-1"))
            .await
            .unwrap()
            .expect("playbook should resolve");
        assert_eq!(resolved.name, "Custom daily plan");

        let listed = registry.list(&WorkspaceId::from("ws-1"), "en", None).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].source, PlaybookSource::UserDefined);
    }

    #[tokio::test]
    async fn list_can_filter_by_source() {
        let registry = MemoryPlaybookRegistry::new();
        registry.register(sample("a"), PlaybookSource::BuiltIn).await.unwrap();
        registry.register(sample("b"), PlaybookSource::UserDefined).await.unwrap();

        let builtins = registry
            .list(&WorkspaceId::from("ws-1"), "en", Some(PlaybookSource::BuiltIn))
            .await
            .unwrap();
        assert_eq!(builtins.len(), 1);
        assert_eq!(builtins[0].playbook_code, "a");
    }

    #[tokio::test]
    async fn empty_playbook_code_is_rejected() {
        let registry = MemoryPlaybookRegistry::new();
        let mut bad = sample("");
        bad.playbook_code = String::new();
        let err = registry.register(bad, PlaybookSource::BuiltIn).await.unwrap_err();
        assert!(matches!(err, PlaybookRegistryError::MalformedManifest { .. }));
    }

    #[test]
    fn with_built_ins_seeds_before_any_register_call() {
        let registry = MemoryPlaybookRegistry::new().with_built_ins([sample("daily_plan")]);
        let entries = registry.entries.read().unwrap();
        assert!(entries.contains_key("daily_plan"));
    }
}
