//! Process-wide Configuration Snapshot (§4.N, §6.4).
//!
//! `ConfigSnapshot` covers the closed set of process-level keys from §6.4
//! plus the model-token-budget table consulted by context budgeting. It is
//! constructed once, from the environment, and handed out as an immutable
//! shared reference; nothing mutates it after construction. Workspace-scoped
//! settings such as `auto_intent_layout` are deliberately NOT here — they
//! vary per workspace and are read from a [`crate::ports::IntentStore`]-
//! adjacent store at call time instead.

use std::collections::HashMap;
use std::sync::OnceLock;

/// Default chat model used when no per-system override is configured.
pub const DEFAULT_CHAT_MODEL: &str = "claude-sonnet-4-5";

/// Default hook allow-set (§6.1).
pub const DEFAULT_ENABLED_HOOKS: &[&str] = &["intent_extract", "steward_analyze"];

/// Default Sampling Gate template allowlist (§4.K step 1).
pub const DEFAULT_ALLOWED_TEMPLATES: &[&str] =
    &["intent_extract", "steward_analyze", "plan_build", "agent_task_dispatch"];

/// Default per-workspace sliding-window rate limit: requests per window.
pub const DEFAULT_RATE_LIMIT: u32 = 10;

/// Default sliding-window width, in seconds.
pub const DEFAULT_RATE_WINDOW_SECONDS: u64 = 60;

/// Default Sampling Gate per-call timeout, in seconds.
pub const DEFAULT_SAMPLING_TIMEOUT_SECONDS: u64 = 30;

/// Default per-workspace concurrent task dispatch cap (§5).
pub const DEFAULT_WORKSPACE_CONCURRENCY_CAP: usize = 4;

/// Default file storage root for uploads.
pub const DEFAULT_UPLOADS_DIR: &str = "./uploads";

/// A model's context window budget, in tokens, consulted by §4.I's
/// truncation strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelTokenBudget {
    /// Total context window for this model.
    pub context_window: u32,
    /// Tokens reserved for the completion itself, subtracted from
    /// `context_window` before the available prompt budget is computed.
    pub reserved_for_output: u32,
}

impl ModelTokenBudget {
    /// Tokens available for prompt content after reserving completion room.
    pub fn available_for_prompt(&self) -> u32 {
        self.context_window.saturating_sub(self.reserved_for_output)
    }
}

fn default_model_token_budgets() -> HashMap<String, ModelTokenBudget> {
    let mut m = HashMap::new();
    m.insert(
        "claude-sonnet-4-5".to_string(),
        ModelTokenBudget { context_window: 200_000, reserved_for_output: 8_192 },
    );
    m.insert(
        "claude-opus-4-1".to_string(),
        ModelTokenBudget { context_window: 200_000, reserved_for_output: 8_192 },
    );
    m.insert(
        "gpt-4o".to_string(),
        ModelTokenBudget { context_window: 128_000, reserved_for_output: 4_096 },
    );
    m.insert(
        "gpt-4o-mini".to_string(),
        ModelTokenBudget { context_window: 128_000, reserved_for_output: 4_096 },
    );
    m
}

/// Fallback budget for a model not present in the table, conservative enough
/// to avoid ever silently overrunning a real window.
const FALLBACK_TOKEN_BUDGET: ModelTokenBudget =
    ModelTokenBudget { context_window: 32_000, reserved_for_output: 2_048 };

/// The process-wide, lazily-initialised, read-mostly settings object (§4.N).
#[derive(Debug, Clone)]
pub struct ConfigSnapshot {
    /// Default chat model identifier (`chat_model` system setting).
    pub chat_model: String,
    /// Hooks enabled at the process level (`ENABLED_HOOKS`).
    pub enabled_hooks: Vec<String>,
    /// Sampling Gate's allowed prompt templates (`ALLOWED_TEMPLATES`).
    pub allowed_templates: Vec<String>,
    /// Sampling Gate per-workspace rate limit, requests per window (`RATE_LIMIT`).
    pub rate_limit: u32,
    /// Sampling Gate sliding-window width, seconds (`RATE_WINDOW_SECONDS`).
    pub rate_window_seconds: u64,
    /// Sampling Gate per-call timeout, seconds (`SAMPLING_TIMEOUT`).
    pub sampling_timeout_seconds: u64,
    /// Per-workspace concurrent task dispatch cap (`WORKSPACE_CONCURRENCY_CAP`).
    pub workspace_concurrency_cap: usize,
    /// File storage root for uploads (`UPLOADS_DIR`).
    pub uploads_dir: String,
    /// Per-model context window / output reservation table.
    pub model_token_budgets: HashMap<String, ModelTokenBudget>,
}

impl Default for ConfigSnapshot {
    fn default() -> Self {
        Self {
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            enabled_hooks: DEFAULT_ENABLED_HOOKS.iter().map(|s| s.to_string()).collect(),
            allowed_templates: DEFAULT_ALLOWED_TEMPLATES.iter().map(|s| s.to_string()).collect(),
            rate_limit: DEFAULT_RATE_LIMIT,
            rate_window_seconds: DEFAULT_RATE_WINDOW_SECONDS,
            sampling_timeout_seconds: DEFAULT_SAMPLING_TIMEOUT_SECONDS,
            workspace_concurrency_cap: DEFAULT_WORKSPACE_CONCURRENCY_CAP,
            uploads_dir: DEFAULT_UPLOADS_DIR.to_string(),
            model_token_budgets: default_model_token_budgets(),
        }
    }
}

impl ConfigSnapshot {
    /// Build a snapshot from process environment variables, falling back to
    /// documented defaults for anything unset or unparsable.
    ///
    /// | Variable | Default |
    /// |---|---|
    /// | `CCO_CHAT_MODEL` | [`DEFAULT_CHAT_MODEL`] |
    /// | `CCO_ENABLED_HOOKS` (comma-separated) | [`DEFAULT_ENABLED_HOOKS`] |
    /// | `CCO_ALLOWED_TEMPLATES` (comma-separated) | [`DEFAULT_ALLOWED_TEMPLATES`] |
    /// | `CCO_RATE_LIMIT` | [`DEFAULT_RATE_LIMIT`] |
    /// | `CCO_RATE_WINDOW_SECONDS` | [`DEFAULT_RATE_WINDOW_SECONDS`] |
    /// | `CCO_SAMPLING_TIMEOUT_SECONDS` | [`DEFAULT_SAMPLING_TIMEOUT_SECONDS`] |
    /// | `CCO_WORKSPACE_CONCURRENCY_CAP` | [`DEFAULT_WORKSPACE_CONCURRENCY_CAP`] |
    /// | `CCO_UPLOADS_DIR` | [`DEFAULT_UPLOADS_DIR`] |
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            chat_model: std::env::var("CCO_CHAT_MODEL").unwrap_or(defaults.chat_model),
            enabled_hooks: std::env::var("CCO_ENABLED_HOOKS")
                .ok()
                .map(|v| split_csv(&v))
                .unwrap_or(defaults.enabled_hooks),
            allowed_templates: std::env::var("CCO_ALLOWED_TEMPLATES")
                .ok()
                .map(|v| split_csv(&v))
                .unwrap_or(defaults.allowed_templates),
            rate_limit: parse_env_or("CCO_RATE_LIMIT", defaults.rate_limit),
            rate_window_seconds: parse_env_or(
                "CCO_RATE_WINDOW_SECONDS",
                defaults.rate_window_seconds,
            ),
            sampling_timeout_seconds: parse_env_or(
                "CCO_SAMPLING_TIMEOUT_SECONDS",
                defaults.sampling_timeout_seconds,
            ),
            workspace_concurrency_cap: parse_env_or(
                "CCO_WORKSPACE_CONCURRENCY_CAP",
                defaults.workspace_concurrency_cap,
            ),
            uploads_dir: std::env::var("CCO_UPLOADS_DIR").unwrap_or(defaults.uploads_dir),
            model_token_budgets: defaults.model_token_budgets,
        }
    }

    /// The token budget for `model`, or a conservative fallback if it is not
    /// in the table (§4.I context budgeting never hard-fails on an unknown
    /// model identifier).
    pub fn token_budget_for(&self, model: &str) -> ModelTokenBudget {
        self.model_token_budgets.get(model).copied().unwrap_or(FALLBACK_TOKEN_BUDGET)
    }

    /// Whether `hook_name` is in the process-level enabled set.
    pub fn hook_enabled(&self, hook_name: &str) -> bool {
        self.enabled_hooks.iter().any(|h| h == hook_name)
    }

    /// Whether `template` is in the Sampling Gate's allowlist.
    pub fn template_allowed(&self, template: &str) -> bool {
        self.allowed_templates.iter().any(|t| t == template)
    }
}

fn split_csv(v: &str) -> Vec<String> {
    v.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect()
}

fn parse_env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

static GLOBAL: OnceLock<ConfigSnapshot> = OnceLock::new();

/// The process-wide snapshot, built from the environment on first access and
/// reused for the lifetime of the process (§4.N "constructed once").
pub fn global() -> &'static ConfigSnapshot {
    GLOBAL.get_or_init(ConfigSnapshot::from_env)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = ConfigSnapshot::default();
        assert_eq!(cfg.chat_model, DEFAULT_CHAT_MODEL);
        assert_eq!(cfg.enabled_hooks, vec!["intent_extract", "steward_analyze"]);
        assert_eq!(cfg.rate_limit, 10);
        assert_eq!(cfg.rate_window_seconds, 60);
        assert_eq!(cfg.sampling_timeout_seconds, 30);
        assert_eq!(cfg.workspace_concurrency_cap, 4);
    }

    #[test]
    fn unknown_model_falls_back_to_conservative_budget() {
        let cfg = ConfigSnapshot::default();
        let budget = cfg.token_budget_for("some-future-model-nobody-has-heard-of");
        assert_eq!(budget, FALLBACK_TOKEN_BUDGET);
        assert!(budget.available_for_prompt() < budget.context_window);
    }

    #[test]
    fn known_model_budget_reserves_output_room() {
        let cfg = ConfigSnapshot::default();
        let budget = cfg.token_budget_for("claude-sonnet-4-5");
        assert_eq!(budget.context_window, 200_000);
        assert_eq!(budget.available_for_prompt(), 200_000 - 8_192);
    }

    #[test]
    fn hook_and_template_membership() {
        let cfg = ConfigSnapshot::default();
        assert!(cfg.hook_enabled("intent_extract"));
        assert!(!cfg.hook_enabled("not_a_real_hook"));
        assert!(cfg.template_allowed("plan_build"));
        assert!(!cfg.template_allowed("not_a_real_template"));
    }

    #[test]
    fn csv_split_trims_and_drops_empties() {
        assert_eq!(split_csv(" a, b ,,c"), vec!["a", "b", "c"]);
    }
}
