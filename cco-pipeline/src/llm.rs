//! LLM-backed matchers for layers 1-3 (§4.F).
//!
//! Every call follows the same shape: build a short system prompt that
//! constrains the model to a closed answer format, send one user turn, and
//! parse the response defensively — a malformed or empty completion never
//! panics the pipeline, it just degrades to `Unknown`/no-selection so the
//! coordinator can fall through.

use cco_proto::{ChatMessage, PlaybookMetadata, Provider, ProviderError};

use crate::types::{HandoffPlan, InteractionType, TaskDomain};

const MAX_RESPONSE_TOKENS: u32 = 200;

/// Parse a `"label|confidence"` response, defaulting confidence to 0.6 when
/// the model didn't include one (§4.F "LLM self-reported otherwise").
fn split_label_confidence(text: &str) -> (String, f32) {
    match text.trim().split_once('|') {
        Some((label, conf)) => {
            let confidence = conf.trim().parse::<f32>().unwrap_or(0.6).clamp(0.0, 1.0);
            (label.trim().to_string(), confidence)
        }
        None => (text.trim().to_string(), 0.6),
    }
}

/// Layer 1 LLM matcher.
pub async fn classify_interaction_type(
    provider: &dyn Provider,
    model: &str,
    raw_input: &str,
) -> Result<(InteractionType, f32), ProviderError> {
    let messages = vec![
        ChatMessage::system(
            "Classify the user's message into exactly one of: qa, start_playbook, \
             manage_settings. Reply with `label|confidence` where confidence is a \
             number between 0 and 1, and nothing else.",
        ),
        ChatMessage::user(raw_input),
    ];
    let completion = provider.chat_completion(messages, model, None, Some(MAX_RESPONSE_TOKENS)).await?;
    let (label, confidence) = split_label_confidence(&completion.text);
    Ok((InteractionType::parse(&label), confidence))
}

/// Layer 2 LLM matcher. `examples` are titles drawn from the profile's
/// active IntentCards, used as few-shot context (§4.F "few-shot examples
/// derived from the user's active IntentCards").
pub async fn classify_task_domain(
    provider: &dyn Provider,
    model: &str,
    raw_input: &str,
    examples: &[String],
) -> Result<(TaskDomain, f32), ProviderError> {
    let mut system = String::from(
        "Classify the user's playbook request into exactly one of: proposal_writing, \
         yearly_review, habit_learning, project_planning, content_writing. Reply with \
         `label|confidence` and nothing else.",
    );
    if !examples.is_empty() {
        system.push_str("\n\nThe user's other active goals include:\n");
        for example in examples {
            system.push_str("- ");
            system.push_str(example);
            system.push('\n');
        }
    }

    let messages = vec![ChatMessage::system(system), ChatMessage::user(raw_input)];
    let completion = provider.chat_completion(messages, model, None, Some(MAX_RESPONSE_TOKENS)).await?;
    let (label, confidence) = split_label_confidence(&completion.text);
    Ok((TaskDomain::parse(&label), confidence))
}

/// Confidence assigned to a legal layer-3 pick (§4.F "0.8 on a legal pick").
pub const PLAYBOOK_PICK_CONFIDENCE: f32 = 0.8;

/// Layer 3 LLM matcher: ask the Provider to pick one playbook code from the
/// effective set. Any answer not present in `candidates` is "no selection".
pub async fn select_playbook(
    provider: &dyn Provider,
    model: &str,
    raw_input: &str,
    candidates: &[PlaybookMetadata],
) -> Result<Option<String>, ProviderError> {
    if candidates.is_empty() {
        return Ok(None);
    }

    let mut system = String::from(
        "Pick exactly one playbook_code from the list below that best satisfies the \
         user's request. Reply with only the playbook_code and nothing else. If none \
         fit, reply with `none`.\n\nAvailable playbooks:\n",
    );
    for c in candidates {
        system.push_str(&format!(
            "- {} (\"{}\"): {} [tags: {}]\n",
            c.playbook_code,
            c.name,
            c.description,
            c.tags.join(", ")
        ));
    }

    let messages = vec![ChatMessage::system(system), ChatMessage::user(raw_input)];
    let completion = provider.chat_completion(messages, model, None, Some(MAX_RESPONSE_TOKENS)).await?;
    let answer = completion.text.trim();

    Ok(candidates.iter().map(|c| c.playbook_code.as_str()).find(|code| *code == answer).map(String::from))
}

/// Ask the Provider whether the request spans multiple playbooks
/// (§4.F "multi-step detection"). Returns `None` on any parse failure or a
/// negative answer — this branch is explicitly non-fatal to the pipeline.
pub async fn detect_multi_step(
    provider: &dyn Provider,
    model: &str,
    raw_input: &str,
    selected_playbook_code: &str,
) -> Option<HandoffPlan> {
    let system = format!(
        "The user's request was routed to playbook `{selected_playbook_code}`. Decide \
         whether fulfilling it actually requires running more than one playbook in \
         sequence. If so, reply with JSON: \
         {{\"multi_step\": true, \"steps\": [{{\"playbook_code\": \"...\"}}], \
         \"step_dependencies\": {{}}}}. Otherwise reply with \
         {{\"multi_step\": false}}. Reply with JSON only.",
    );
    let messages = vec![ChatMessage::system(system), ChatMessage::user(raw_input)];

    let completion = provider.chat_completion(messages, model, None, Some(MAX_RESPONSE_TOKENS)).await.ok()?;
    let parsed: serde_json::Value = serde_json::from_str(completion.text.trim()).ok()?;

    if !parsed["multi_step"].as_bool().unwrap_or(false) {
        return None;
    }

    let steps = parsed["steps"].as_array()?;
    if steps.is_empty() {
        return None;
    }

    let steps = steps
        .iter()
        .filter_map(|s| {
            let playbook_code = s["playbook_code"].as_str()?.to_string();
            Some(cco_proto::WorkflowStep {
                playbook_code,
                kind: cco_proto::PlaybookKind::UserWorkflow,
                interaction_mode: vec![cco_proto::InteractionMode::Conversational],
                inputs: serde_json::Value::Null,
                input_mapping: serde_json::Value::Null,
            })
        })
        .collect();

    Some(HandoffPlan {
        steps,
        step_dependencies: parsed["step_dependencies"].clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_label_confidence_parses_both_parts() {
        let (label, confidence) = split_label_confidence("qa|0.95");
        assert_eq!(label, "qa");
        assert!((confidence - 0.95).abs() < f32::EPSILON);
    }

    #[test]
    fn split_label_confidence_defaults_when_no_pipe() {
        let (label, confidence) = split_label_confidence("qa");
        assert_eq!(label, "qa");
        assert_eq!(confidence, 0.6);
    }

    #[test]
    fn split_label_confidence_clamps_out_of_range_values() {
        let (_, confidence) = split_label_confidence("qa|5.0");
        assert_eq!(confidence, 1.0);
    }
}
