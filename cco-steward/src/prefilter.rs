//! Signal prefilter (§4.L step 2).

use std::collections::HashMap;

use cco_proto::IntentSignal;

const MIN_CONFIDENCE: f32 = 0.7;
const MIN_LABEL_LEN: usize = 3;
const MAX_LABEL_LEN: usize = 200;
const MAX_SURVIVORS: usize = 20;

/// Keep only signals worth clustering: confident enough, a sane label
/// length, de-duplicated by lower-cased label (the highest-confidence
/// occurrence wins), then capped at [`MAX_SURVIVORS`] by descending
/// confidence.
pub fn prefilter(signals: Vec<IntentSignal>) -> Vec<IntentSignal> {
    let mut by_label: HashMap<String, IntentSignal> = HashMap::new();

    for signal in signals {
        if signal.confidence < MIN_CONFIDENCE {
            continue;
        }
        let len = signal.label.trim().chars().count();
        if !(MIN_LABEL_LEN..=MAX_LABEL_LEN).contains(&len) {
            continue;
        }
        let key = signal.label.trim().to_ascii_lowercase();
        match by_label.get(&key) {
            Some(existing) if existing.confidence >= signal.confidence => {}
            _ => {
                by_label.insert(key, signal);
            }
        }
    }

    let mut survivors: Vec<IntentSignal> = by_label.into_values().collect();
    survivors.sort_by(|a, b| b.confidence.partial_cmp(&a.confidence).unwrap_or(std::cmp::Ordering::Equal));
    survivors.truncate(MAX_SURVIVORS);
    survivors
}

#[cfg(test)]
mod tests {
    use super::*;
    use cco_proto::{IntentSignalId, IntentSignalSource, IntentSignalStatus, MessageId, ProfileId, WorkspaceId};

    fn signal(label: &str, confidence: f32) -> IntentSignal {
        IntentSignal {
            id: IntentSignalId::from(format!("sig-{label}-{confidence}")),
            workspace_id: WorkspaceId::from("ws-1"),
            profile_id: ProfileId::from("profile-1"),
            label: label.to_string(),
            confidence,
            source: IntentSignalSource::Rule,
            message_id: Some(MessageId::from("msg-1")),
            status: IntentSignalStatus::Candidate,
        }
    }

    #[test]
    fn drops_low_confidence_and_bad_length() {
        let survivors = prefilter(vec![
            signal("plan a trip", 0.5),
            signal("ok", 0.9),
            signal("launch the new product", 0.95),
        ]);
        assert_eq!(survivors.len(), 1);
        assert_eq!(survivors[0].label, "launch the new product");
    }

    #[test]
    fn dedups_by_lowercased_label_keeping_highest_confidence() {
        let survivors = prefilter(vec![
            signal("Launch the product", 0.75),
            signal("launch the product", 0.92),
        ]);
        assert_eq!(survivors.len(), 1);
        assert!((survivors[0].confidence - 0.92).abs() < f32::EPSILON);
    }

    #[test]
    fn caps_survivors_at_twenty_by_confidence() {
        let signals: Vec<IntentSignal> =
            (0..30).map(|i| signal(&format!("distinct goal number {i}"), 0.7 + (i as f32) * 0.001)).collect();
        let survivors = prefilter(signals);
        assert_eq!(survivors.len(), 20);
        assert!(survivors.windows(2).all(|w| w[0].confidence >= w[1].confidence));
    }
}
