//! Context assembly and token-budget truncation (§4.I "Context budgeting").

use cco_proto::ConfigSnapshot;

/// One named block of the assembled prompt. `protected` sections are never
/// removed by truncation — the system instructions prefix and the user
/// turn itself.
#[derive(Debug, Clone)]
pub struct ContextSection {
    /// Stable name, also used as the truncation placeholder's label.
    pub name: &'static str,
    /// The section's rendered text.
    pub content: String,
    /// Whether truncation may ever remove this section.
    pub protected: bool,
}

impl ContextSection {
    /// Build an unprotected section.
    pub fn new(name: &'static str, content: impl Into<String>) -> Self {
        Self { name, content: content.into(), protected: false }
    }

    /// Build a section truncation must never touch.
    pub fn protected(name: &'static str, content: impl Into<String>) -> Self {
        Self { name, content: content.into(), protected: true }
    }
}

/// Crude chars/4 heuristic, the same order-of-magnitude approximation used
/// across the ambient provider crates when an exact tokenizer isn't worth
/// the dependency for a budgeting check rather than a billing figure.
pub fn estimate_tokens(text: &str) -> u32 {
    (text.chars().count() as u32).div_ceil(4)
}

/// The names removed in priority order by §4.I's three-tier truncation:
/// first "Recent Conversation", then "Recent Timeline", then everything
/// else is collapsed down to the final allowed set.
const TRUNCATION_PRIORITY: &[&str] = &["Recent Conversation", "Recent Timeline"];

/// Sections that survive the final collapse tier, by name.
const FINAL_ALLOWED_SECTIONS: &[&str] = &["Workspace Context", "Active Intents", "Current Tasks"];

/// Result of [`build_context`].
#[derive(Debug, Clone)]
pub struct BuiltContext {
    /// The final, possibly truncated prompt text (sections joined with a
    /// blank line, in input order).
    pub prompt: String,
    /// Token estimate for [`BuiltContext::prompt`].
    pub context_tokens: u32,
    /// Names of sections removed or collapsed by truncation, in the order
    /// truncation acted on them.
    pub truncated_sections: Vec<&'static str>,
}

/// Assemble `sections` into one prompt, truncating deterministically if the
/// naive render exceeds `model`'s available prompt budget.
///
/// Truncation removes, in order: (1) "Recent Conversation" replaced by a
/// placeholder, (2) "Recent Timeline" replaced by a placeholder, (3) every
/// section other than {"Workspace Context", "Active Intents", "Current
/// Tasks"} and any `protected` section is dropped outright. Each tier is
/// only applied if the prior tier still left the render over budget, so the
/// same input always truncates to the same result (§8 "the truncation
/// applied is deterministic given the same inputs").
pub fn build_context(
    model: &str,
    config: &ConfigSnapshot,
    mut sections: Vec<ContextSection>,
) -> BuiltContext {
    let budget = config.token_budget_for(model).available_for_prompt();
    let mut truncated = Vec::new();

    let mut rendered = render(&sections);
    let mut tokens = estimate_tokens(&rendered);

    if tokens > budget {
        for name in TRUNCATION_PRIORITY {
            if tokens <= budget {
                break;
            }
            if let Some(section) = sections.iter_mut().find(|s| &s.name == name && !s.protected) {
                section.content = placeholder(section.name);
                truncated.push(*name);
                rendered = render(&sections);
                tokens = estimate_tokens(&rendered);
            }
        }
    }

    if tokens > budget {
        sections.retain(|s| s.protected || FINAL_ALLOWED_SECTIONS.contains(&s.name));
        truncated.push("collapsed_to_minimal_context");
        rendered = render(&sections);
        tokens = estimate_tokens(&rendered);
    }

    BuiltContext { prompt: rendered, context_tokens: tokens, truncated_sections: truncated }
}

fn render(sections: &[ContextSection]) -> String {
    sections
        .iter()
        .map(|s| format!("## {}:\n{}", s.name, s.content))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn placeholder(name: &str) -> String {
    format!("[{name} omitted to stay within the model's context budget]")
}
