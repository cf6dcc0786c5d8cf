//! LLM-backed layout analysis (§4.L step 3).
//!
//! Mirrors `cco_plan::llm`'s shape: build a constrained JSON-only system
//! prompt, send one call, and parse the response defensively so a malformed
//! or empty completion degrades to the heuristic fallback rather than
//! panicking the steward.

use cco_proto::{ChatMessage, IntentCard, IntentOperation, IntentOperationType, IntentSignal, Provider, ProviderError};

const MAX_RESPONSE_TOKENS: u32 = 800;
const MAX_CREATES: usize = 3;
const MAX_UPDATES: usize = 5;

/// Parsed, still-unvalidated LLM layout proposal.
pub struct LlmLayout {
    /// Proposed CREATE/UPDATE operations, before the create/update caps.
    pub operations: Vec<IntentOperation>,
    /// Signals the model judged not worth a durable card.
    pub ephemeral: Vec<serde_json::Value>,
}

fn build_prompt(signals: &[IntentSignal], visible_cards: &[IntentCard], recent_messages: &[String]) -> String {
    let mut prompt = String::from(
        "You maintain a user's long-term IntentCards. Given recent conversation, candidate \
         signals, and the user's currently visible cards, propose at most 3 \
         CREATE_INTENT_CARD and 5 UPDATE_INTENT_CARD operations, plus an `ephemeral` list \
         for signals that don't warrant a durable card this run. Reply with JSON only, \
         shaped as: {\"operations\": [{\"type\": \"CREATE_INTENT_CARD\"|\"UPDATE_INTENT_CARD\", \
         \"intent_id\": null or an existing card id, \"data\": {\"title\": ..., \
         \"description\": ...}, \"relation_signals\": [signal ids], \"confidence\": 0.0-1.0, \
         \"reasoning\": \"...\"}], \"ephemeral\": [...]}.\n",
    );
    if !recent_messages.is_empty() {
        prompt.push_str("\nRecent conversation:\n");
        for m in recent_messages {
            prompt.push_str(&format!("- {m}\n"));
        }
    }
    prompt.push_str("\nCandidate signals:\n");
    for s in signals {
        prompt.push_str(&format!("- id={} label=\"{}\" confidence={:.2}\n", s.id, s.label, s.confidence));
    }
    prompt.push_str("\nCurrently visible cards:\n");
    for c in visible_cards {
        prompt.push_str(&format!("- id={} title=\"{}\"\n", c.id, c.title));
    }
    prompt
}

fn parse_op_type(raw: &str) -> Option<IntentOperationType> {
    match raw {
        "CREATE_INTENT_CARD" => Some(IntentOperationType::CreateIntentCard),
        "UPDATE_INTENT_CARD" => Some(IntentOperationType::UpdateIntentCard),
        _ => None,
    }
}

fn parse_response(text: &str) -> Option<LlmLayout> {
    let parsed: serde_json::Value = serde_json::from_str(text.trim()).ok()?;

    let mut creates = 0usize;
    let mut updates = 0usize;
    let mut operations = Vec::new();
    for raw in parsed["operations"].as_array().into_iter().flatten() {
        let Some(op_type) = raw["type"].as_str().and_then(parse_op_type) else { continue };
        match op_type {
            IntentOperationType::CreateIntentCard => {
                if creates >= MAX_CREATES {
                    continue;
                }
                creates += 1;
            }
            IntentOperationType::UpdateIntentCard => {
                if updates >= MAX_UPDATES {
                    continue;
                }
                updates += 1;
            }
        }

        let relation_signals = raw["relation_signals"]
            .as_array()
            .into_iter()
            .flatten()
            .filter_map(|v| v.as_str())
            .map(cco_proto::IntentSignalId::from)
            .collect();

        operations.push(IntentOperation {
            op_type,
            intent_id: raw["intent_id"].as_str().map(cco_proto::IntentCardId::from),
            data: raw.get("data").cloned().unwrap_or(serde_json::Value::Null),
            relation_signals,
            confidence: raw["confidence"].as_f64().unwrap_or(0.5) as f32,
            reasoning: raw["reasoning"].as_str().unwrap_or_default().to_string(),
        });
    }

    let ephemeral = parsed["ephemeral"].as_array().cloned().unwrap_or_default();
    Some(LlmLayout { operations, ephemeral })
}

/// Ask the Provider for a layout proposal; `None` on any transport or parse
/// failure so the caller can fall through to the heuristic clusterer.
pub async fn build_layout(
    provider: &dyn Provider,
    model: &str,
    signals: &[IntentSignal],
    visible_cards: &[IntentCard],
    recent_messages: &[String],
) -> Result<Option<LlmLayout>, ProviderError> {
    let prompt = build_prompt(signals, visible_cards, recent_messages);
    let messages = vec![ChatMessage::system(prompt), ChatMessage::user("Propose the layout plan now.")];
    let completion = provider.chat_completion(messages, model, None, Some(MAX_RESPONSE_TOKENS)).await?;
    Ok(parse_response(&completion.text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_response_and_enforces_caps() {
        let mut ops = String::new();
        for i in 0..5 {
            ops.push_str(&format!(
                "{{\"type\": \"CREATE_INTENT_CARD\", \"intent_id\": null, \"data\": {{\"title\": \"t{i}\"}}, \
                 \"relation_signals\": [], \"confidence\": 0.9, \"reasoning\": \"r\"}},"
            ));
        }
        ops.pop();
        let text = format!("{{\"operations\": [{ops}], \"ephemeral\": []}}");
        let layout = parse_response(&text).unwrap();
        assert_eq!(layout.operations.iter().filter(|o| o.op_type == IntentOperationType::CreateIntentCard).count(), MAX_CREATES);
    }

    #[test]
    fn malformed_json_returns_none() {
        assert!(parse_response("not json").is_none());
    }
}
