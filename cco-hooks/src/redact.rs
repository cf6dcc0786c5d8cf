//! Prompt redaction applied before any string reaches `sampling_fn` (§4.K
//! "Redaction").

use std::sync::LazyLock;

use regex::Regex;

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").expect("valid regex"));

static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\+?\d[\d\-. ]{8,}\d)").expect("valid regex"));

/// Replace email addresses and phone-number-shaped digit groups with
/// placeholder tokens before a prompt reaches `sampling_fn`.
pub fn redact(prompt: &str) -> String {
    let redacted = EMAIL_RE.replace_all(prompt, "[REDACTED_EMAIL]");
    PHONE_RE.replace_all(&redacted, "[REDACTED_PHONE]").into_owned()
}
