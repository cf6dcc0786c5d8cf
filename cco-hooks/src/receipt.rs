//! Receipt evaluation: deciding whether a hook step should run given a
//! caller-supplied IDE attestation (§4.J step 1).

use std::sync::LazyLock;

use cco_proto::{Receipt, ReceiptDecision, ReceiptReason};
use regex::Regex;

static OUTPUT_HASH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9a-fA-F]{16,64}$").expect("valid regex"));

/// Apply the four ordered rules from §4.J step 1 to decide whether `step`
/// should run, given the receipt (if any) the caller supplied for it.
pub fn evaluate(step: &str, receipt: Option<&Receipt>) -> ReceiptDecision {
    let Some(receipt) = receipt else {
        return ReceiptDecision {
            step: step.to_string(),
            should_run: true,
            reason: ReceiptReason::NoReceipt,
            receipt_trace_id: None,
            receipt_output_hash: None,
        };
    };

    let receipt_trace_id = Some(receipt.trace_id.clone());
    let receipt_output_hash = Some(receipt.output_hash.clone());

    if receipt.trace_id.is_empty() {
        return ReceiptDecision {
            step: step.to_string(),
            should_run: true,
            reason: ReceiptReason::MissingTraceId,
            receipt_trace_id,
            receipt_output_hash,
        };
    }

    if !OUTPUT_HASH_RE.is_match(&receipt.output_hash) {
        return ReceiptDecision {
            step: step.to_string(),
            should_run: true,
            reason: ReceiptReason::InvalidOutputHash,
            receipt_trace_id,
            receipt_output_hash,
        };
    }

    if let Some(completed_at) = receipt.completed_at {
        if completed_at > chrono::Utc::now() {
            return ReceiptDecision {
                step: step.to_string(),
                should_run: true,
                reason: ReceiptReason::FutureCompletedAt,
                receipt_trace_id,
                receipt_output_hash,
            };
        }
    }

    ReceiptDecision {
        step: step.to_string(),
        should_run: false,
        reason: ReceiptReason::ReceiptAccepted,
        receipt_trace_id,
        receipt_output_hash,
    }
}

/// Pick the receipt (if any) whose `step` matches `step` out of a
/// caller-supplied list.
pub fn find_receipt<'a>(step: &str, receipts: &'a [Receipt]) -> Option<&'a Receipt> {
    receipts.iter().find(|r| r.step == step)
}
