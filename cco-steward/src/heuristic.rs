//! Deterministic heuristic fallback clusterer, used when the LLM analysis
//! path fails to parse or transport-errors (§4.L step 3).

use std::collections::HashMap;

use cco_proto::{IntentCard, IntentOperation, IntentOperationType, IntentSignal, SignalMappingEntry};

const GROUP_KEY_LEN: usize = 20;
const MIN_GROUP_SIZE: usize = 2;
const MIN_TOP_CONFIDENCE: f32 = 0.8;
const MAX_CREATES: usize = 3;
const MAX_UPDATES: usize = 5;

fn group_key(label: &str) -> String {
    label.trim().to_ascii_lowercase().chars().take(GROUP_KEY_LEN).collect()
}

/// Find an existing visible card whose title matches a group either by a
/// full lower-cased match or by sharing the same first-[`GROUP_KEY_LEN`]-char
/// key (§4.L step 3 "UPDATE if a similar existing title is found").
fn find_matching_card<'a>(group_label: &str, cards: &'a [IntentCard]) -> Option<&'a IntentCard> {
    let lower = group_label.trim().to_ascii_lowercase();
    let key = group_key(group_label);
    cards.iter().find(|c| {
        let title_lower = c.title.trim().to_ascii_lowercase();
        title_lower == lower || group_key(&c.title) == key
    })
}

/// Output of one heuristic clustering pass, mirroring the three
/// [`cco_proto::IntentLayoutPlan`] fields this stage contributes to.
pub struct HeuristicResult {
    /// Proposed CREATE/UPDATE operations.
    pub operations: Vec<IntentOperation>,
    /// Signals that didn't cluster into a durable group.
    pub ephemeral: Vec<serde_json::Value>,
    /// Per-signal disposition, independent of whether execution happens.
    pub signal_mapping: Vec<SignalMappingEntry>,
}

/// Group surviving signals by first-20-chars (lower-cased) and propose one
/// operation per group that clears the occurrence/confidence bar; everything
/// else is marked ephemeral. Enforces the same `MAX_CREATES`/`MAX_UPDATES`
/// plan caps as the LLM path (§4.L invariant): groups that qualify once the
/// relevant cap is already spent fall back to ephemeral too.
pub fn cluster(signals: &[IntentSignal], visible_cards: &[IntentCard]) -> HeuristicResult {
    let mut groups: HashMap<String, Vec<&IntentSignal>> = HashMap::new();
    for signal in signals {
        groups.entry(group_key(&signal.label)).or_default().push(signal);
    }

    let mut operations = Vec::new();
    let mut ephemeral = Vec::new();
    let mut signal_mapping = Vec::new();
    let mut creates = 0usize;
    let mut updates = 0usize;

    for members in groups.values() {
        let top_confidence =
            members.iter().map(|s| s.confidence).fold(0.0f32, |acc, c| acc.max(c));

        if members.len() < MIN_GROUP_SIZE || top_confidence < MIN_TOP_CONFIDENCE {
            for signal in members {
                ephemeral.push(serde_json::json!({
                    "label": signal.label,
                    "confidence": signal.confidence,
                    "signal_id": signal.id.as_str(),
                }));
                signal_mapping.push(SignalMappingEntry {
                    signal_id: signal.id.clone(),
                    action: "ephemeral".to_string(),
                    target_intent_id: None,
                    reasoning: "group below occurrence/confidence bar for a durable card".to_string(),
                });
            }
            continue;
        }

        let representative = members
            .iter()
            .max_by(|a, b| a.confidence.partial_cmp(&b.confidence).unwrap_or(std::cmp::Ordering::Equal))
            .expect("members is non-empty");
        let relation_signals = members.iter().map(|s| s.id.clone()).collect::<Vec<_>>();

        let matched_card = find_matching_card(&representative.label, visible_cards);
        let (op_type, intent_id, action, target_intent_id) = match matched_card {
            Some(card) => (
                IntentOperationType::UpdateIntentCard,
                Some(card.id.clone()),
                "updated".to_string(),
                Some(card.id.clone()),
            ),
            None => (IntentOperationType::CreateIntentCard, None, "created".to_string(), None),
        };

        let at_cap = match op_type {
            IntentOperationType::CreateIntentCard => creates >= MAX_CREATES,
            IntentOperationType::UpdateIntentCard => updates >= MAX_UPDATES,
        };
        if at_cap {
            for signal in members {
                ephemeral.push(serde_json::json!({
                    "label": signal.label,
                    "confidence": signal.confidence,
                    "signal_id": signal.id.as_str(),
                }));
                signal_mapping.push(SignalMappingEntry {
                    signal_id: signal.id.clone(),
                    action: "ephemeral".to_string(),
                    target_intent_id: None,
                    reasoning: "group qualified but exceeds the create/update cap for this plan".to_string(),
                });
            }
            continue;
        }
        match op_type {
            IntentOperationType::CreateIntentCard => creates += 1,
            IntentOperationType::UpdateIntentCard => updates += 1,
        }

        let reasoning = format!(
            "heuristic cluster of {} signals, top confidence {top_confidence:.2}",
            members.len()
        );
        operations.push(IntentOperation {
            op_type,
            intent_id,
            data: serde_json::json!({
                "title": representative.label,
                "description": representative.label,
            }),
            relation_signals: relation_signals.clone(),
            confidence: top_confidence,
            reasoning: reasoning.clone(),
        });

        for signal_id in relation_signals {
            signal_mapping.push(SignalMappingEntry {
                signal_id,
                action: action.clone(),
                target_intent_id: target_intent_id.clone(),
                reasoning: reasoning.clone(),
            });
        }
    }

    HeuristicResult { operations, ephemeral, signal_mapping }
}
