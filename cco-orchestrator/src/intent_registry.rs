//! Default keyword/theme [`IntentRegistryPort`] implementation (§4.Q): a
//! lightweight rule-based extractor good enough to drive
//! `TimelineItem(intent_seeds)` without an LLM round-trip.

use async_trait::async_trait;
use cco_proto::{ExecutionContext, IntentDefinition, IntentRegistryPort, ResolvedIntent};

/// One lexicon entry: a named intent, its themes, and the keywords that
/// trigger it.
struct LexiconEntry {
    name: &'static str,
    description: &'static str,
    themes: &'static [&'static str],
    keywords: &'static [&'static str],
}

const LEXICON: &[LexiconEntry] = &[
    LexiconEntry {
        name: "draft_proposal",
        description: "Drafting a business proposal or pitch document",
        themes: &["business", "writing"],
        keywords: &["proposal", "pitch", "rfp"],
    },
    LexiconEntry {
        name: "yearly_review",
        description: "Compiling a yearly review or retrospective",
        themes: &["review", "reflection"],
        keywords: &["yearly review", "year in review", "annual review", "retrospective"],
    },
    LexiconEntry {
        name: "build_habit",
        description: "Building or tracking a recurring habit",
        themes: &["habit", "routine"],
        keywords: &["habit", "streak", "routine", "daily practice"],
    },
    LexiconEntry {
        name: "plan_project",
        description: "Planning a project's scope or milestones",
        themes: &["planning", "project"],
        keywords: &["project plan", "roadmap", "milestones", "timeline for"],
    },
    LexiconEntry {
        name: "draft_content",
        description: "Drafting other written content",
        themes: &["writing"],
        keywords: &["draft", "write up", "blog post", "article"],
    },
];

/// Matches free text against [`LEXICON`] by lower-cased substring. Not
/// LLM-backed; exists so intent extraction (§4.H step 6) has a result even
/// when no LLM path is configured or available.
#[derive(Debug, Clone, Default)]
pub struct LexiconIntentRegistryPort;

impl LexiconIntentRegistryPort {
    /// Build the default adapter.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl IntentRegistryPort for LexiconIntentRegistryPort {
    async fn resolve_intent(
        &self,
        user_input: &str,
        _ctx: &ExecutionContext,
        _context: Option<&serde_json::Value>,
        _locale: Option<&str>,
    ) -> ResolvedIntent {
        let lowered = user_input.to_ascii_lowercase();
        let mut intents = Vec::new();
        let mut themes = Vec::new();

        for entry in LEXICON {
            if entry.keywords.iter().any(|kw| lowered.contains(kw)) {
                intents.push(entry.name.to_string());
                for theme in entry.themes {
                    if !themes.contains(&theme.to_string()) {
                        themes.push(theme.to_string());
                    }
                }
            }
        }

        let confidence = if intents.is_empty() { None } else { Some(0.6) };
        ResolvedIntent { intents, themes, confidence, llm_analysis: None }
    }

    async fn list_available_intents(&self, _ctx: &ExecutionContext) -> Vec<IntentDefinition> {
        LEXICON
            .iter()
            .map(|entry| IntentDefinition {
                name: entry.name.to_string(),
                description: entry.description.to_string(),
                themes: entry.themes.iter().map(|t| t.to_string()).collect(),
            })
            .collect()
    }
}
