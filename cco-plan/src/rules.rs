//! Deterministic fallback planner, used when `use_llm` is false or the LLM
//! path fails (§4.G step 2).

use cco_proto::{PlaybookMetadata, SideEffectLevel, TaskPlan};

use crate::types::{PlanBuilderInput, PlanInputFile};

/// Capability codes the fallback planner may target without a matching
/// entry in the effective playbook set — the §4.G pack-id invariant only
/// binds LLM-produced tasks.
pub const FILE_ANALYSIS_PACK: &str = "file_analysis";
/// See [`FILE_ANALYSIS_PACK`].
pub const IMAGE_ANALYSIS_PACK: &str = "image_analysis";
/// See [`FILE_ANALYSIS_PACK`].
pub const DOCUMENT_ANALYSIS_PACK: &str = "document_analysis";
/// The catch-all substituted for any illegal LLM `pack_id` pick (§4.G step 1).
pub const CONTENT_DRAFTING_PACK: &str = "content_drafting";

const WELL_KNOWN_PACKS: &[&str] =
    &[FILE_ANALYSIS_PACK, IMAGE_ANALYSIS_PACK, DOCUMENT_ANALYSIS_PACK, CONTENT_DRAFTING_PACK];

/// Whether `pack_id` is one of the always-available capability codes.
pub fn is_well_known_pack(pack_id: &str) -> bool {
    WELL_KNOWN_PACKS.contains(&pack_id)
}

fn mime_group(mime_type: &str) -> &'static str {
    if mime_type.starts_with("image/") {
        IMAGE_ANALYSIS_PACK
    } else if mime_type == "application/pdf" || mime_type.starts_with("text/") {
        DOCUMENT_ANALYSIS_PACK
    } else {
        FILE_ANALYSIS_PACK
    }
}

fn file_task(file: &PlanInputFile) -> TaskPlan {
    TaskPlan {
        pack_id: mime_group(&file.mime_type).to_string(),
        task_type: "analyze_file".to_string(),
        params: serde_json::json!({ "file_id": file.id }),
        side_effect_level: SideEffectLevel::Readonly,
        auto_execute: None,
        requires_cta: None,
    }
}

/// Keyword -> playbook tag, checked against the effective playbook set's
/// own tags so the fallback planner never invents a pack id (§4.G step 2b).
const KEYWORD_TAGS: &[(&str, &str)] = &[
    ("proposal", "proposal_writing"),
    ("yearly review", "yearly_review"),
    ("habit", "habit_learning"),
    ("project plan", "project_planning"),
    ("draft", "content_writing"),
    ("write", "content_writing"),
];

fn keyword_task(message: &str, playbooks: &[PlaybookMetadata]) -> Option<TaskPlan> {
    let lower = message.to_ascii_lowercase();
    let tag = KEYWORD_TAGS.iter().find(|(keyword, _)| lower.contains(keyword))?.1;
    let matched = playbooks.iter().find(|p| p.tags.iter().any(|t| t == tag))?;

    Some(TaskPlan {
        pack_id: matched.playbook_code.clone(),
        task_type: "run_playbook".to_string(),
        params: serde_json::json!({ "trigger": "keyword_match", "tag": tag }),
        side_effect_level: SideEffectLevel::SoftWrite,
        auto_execute: None,
        requires_cta: None,
    })
}

fn artifact_task(artifact: &str) -> TaskPlan {
    TaskPlan {
        pack_id: CONTENT_DRAFTING_PACK.to_string(),
        task_type: "draft_artifact".to_string(),
        params: serde_json::json!({ "artifact": artifact }),
        side_effect_level: SideEffectLevel::SoftWrite,
        auto_execute: None,
        requires_cta: None,
    }
}

/// Build the fallback plan's task list. An empty result is a legitimate
/// "no action needed" outcome (§4.G step 2).
pub fn build_fallback_tasks(input: &PlanBuilderInput) -> Vec<TaskPlan> {
    let mut tasks: Vec<TaskPlan> = input.files.iter().map(file_task).collect();

    if let Some(task) = keyword_task(&input.message, &input.effective_playbooks) {
        tasks.push(task);
    }

    if tasks.is_empty() {
        tasks.extend(input.expected_artifacts.iter().map(|artifact| artifact_task(artifact)));
    }

    tasks
}

#[cfg(test)]
mod tests {
    use super::*;
    use cco_proto::{MessageId, PlaybookSource, ProfileId, WorkspaceId};

    fn base_input() -> PlanBuilderInput {
        PlanBuilderInput {
            message: String::new(),
            files: vec![],
            workspace_id: WorkspaceId::from("ws-1"),
            profile_id: ProfileId::from("profile-1"),
            message_id: MessageId::from("msg-1"),
            use_llm: false,
            project_id: None,
            effective_playbooks: vec![],
            expected_artifacts: vec![],
        }
    }

    #[test]
    fn image_file_routes_to_image_analysis() {
        let mut input = base_input();
        input.files.push(PlanInputFile { id: "f1".into(), mime_type: "image/png".into() });
        let tasks = build_fallback_tasks(&input);
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].pack_id, IMAGE_ANALYSIS_PACK);
    }

    #[test]
    fn pdf_file_routes_to_document_analysis() {
        let mut input = base_input();
        input.files.push(PlanInputFile { id: "f1".into(), mime_type: "application/pdf".into() });
        let tasks = build_fallback_tasks(&input);
        assert_eq!(tasks[0].pack_id, DOCUMENT_ANALYSIS_PACK);
    }

    #[test]
    fn keyword_match_requires_a_tagged_playbook_to_fire() {
        let mut input = base_input();
        input.message = "help me write a proposal".into();
        assert!(build_fallback_tasks(&input).is_empty());

        input.effective_playbooks.push(PlaybookMetadata {
            playbook_code: "proposal_v1".into(),
            name: "Proposal writer".into(),
            description: "Drafts a proposal".into(),
            tags: vec!["proposal_writing".into()],
            source: PlaybookSource::BuiltIn,
        });
        let tasks = build_fallback_tasks(&input);
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].pack_id, "proposal_v1");
    }

    #[test]
    fn expected_artifacts_only_fire_when_nothing_else_matched() {
        let mut input = base_input();
        input.expected_artifacts.push("weekly_summary".into());
        let tasks = build_fallback_tasks(&input);
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].pack_id, CONTENT_DRAFTING_PACK);
    }

    #[test]
    fn no_files_no_keywords_no_artifacts_is_no_action_needed() {
        let input = base_input();
        assert!(build_fallback_tasks(&input).is_empty());
    }
}
