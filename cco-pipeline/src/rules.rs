//! Layer 1 rule matcher: closed regex/prefix set (§4.F).

use std::sync::LazyLock;

use regex::Regex;

use crate::types::InteractionType;

static MANAGE_SETTINGS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(change|update|edit)\s+my\s+(settings|preferences|profile)\b").unwrap()
});

static START_PLAYBOOK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(help me|can you)\s+(write|draft|plan|create|generate|build)\b").unwrap()
});

/// Confidence assigned to any rule hit (§4.F "0.9 on rule hit").
pub const RULE_HIT_CONFIDENCE: f32 = 0.9;

/// Apply the closed rule set to one utterance.
///
/// A leading `/` on the `chat_app` channel is treated as an explicit
/// playbook invocation (§4.F "channel-specific prefixes"). Absent a rule
/// hit, returns `None` so the coordinator can decide whether to fall
/// through to the LLM matcher.
pub fn match_interaction_type(channel: &str, raw_input: &str) -> Option<InteractionType> {
    let trimmed = raw_input.trim();

    if channel == "chat_app" && trimmed.starts_with('/') {
        return Some(InteractionType::StartPlaybook);
    }
    if MANAGE_SETTINGS_RE.is_match(trimmed) {
        return Some(InteractionType::ManageSettings);
    }
    if START_PLAYBOOK_RE.is_match(trimmed) {
        return Some(InteractionType::StartPlaybook);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leading_slash_on_chat_app_is_start_playbook() {
        assert_eq!(
            match_interaction_type("chat_app", "/daily_plan"),
            Some(InteractionType::StartPlaybook)
        );
    }

    #[test]
    fn leading_slash_on_api_channel_is_not_special_cased() {
        assert_eq!(match_interaction_type("api", "/daily_plan"), None);
    }

    #[test]
    fn settings_phrase_matches() {
        assert_eq!(
            match_interaction_type("api", "please change my settings for email digests"),
            Some(InteractionType::ManageSettings)
        );
    }

    #[test]
    fn playbook_trigger_phrase_matches() {
        assert_eq!(
            match_interaction_type("api", "Can you help me write a proposal?"),
            Some(InteractionType::StartPlaybook)
        );
    }

    #[test]
    fn ordinary_question_has_no_rule_hit() {
        assert_eq!(match_interaction_type("api", "What's the weather like?"), None);
    }
}
