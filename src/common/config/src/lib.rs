//! Configuration management for planeq.
//!
//! Provides the tunables of the rule application engine and the tiered
//! equivalence comparison. Every field has a default, so partial JSON
//! documents are accepted.

use std::path::Path;

use common_error::{PlanEqError, PlanEqResult};
use serde::{Deserialize, Serialize};

/// Global planeq configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanEqConfig {
    /// Rule application engine configuration.
    pub rules: RuleEngineConfig,
    /// Comparison tier configuration.
    pub compare: CompareConfig,
}

impl PlanEqConfig {
    /// Parse a configuration from a JSON string.
    pub fn from_json_str(json: &str) -> PlanEqResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> PlanEqResult<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&text)
    }

    /// Check that the numeric bounds are usable.
    pub fn validate(&self) -> PlanEqResult<()> {
        if self.rules.max_passes == 0 {
            return Err(PlanEqError::config("rules.max_passes must be at least 1"));
        }
        if self.rules.match_limit == 0 {
            return Err(PlanEqError::config("rules.match_limit must be at least 1"));
        }
        Ok(())
    }

    /// Replace the rule engine configuration.
    #[must_use]
    pub fn with_rules(mut self, rules: RuleEngineConfig) -> Self {
        self.rules = rules;
        self
    }

    /// Replace the comparison configuration.
    #[must_use]
    pub fn with_compare(mut self, compare: CompareConfig) -> Self {
        self.compare = compare;
        self
    }
}

/// Rule application engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleEngineConfig {
    /// Maximum number of outer fixpoint passes.
    pub max_passes: usize,
    /// Maximum number of rewrite matches within one pass.
    pub match_limit: usize,
    /// Record a before/after trace for every applied rule.
    pub enable_trace: bool,
}

impl Default for RuleEngineConfig {
    fn default() -> Self {
        Self {
            max_passes: 3,
            match_limit: 200,
            enable_trace: false,
        }
    }
}

impl RuleEngineConfig {
    /// Set the maximum number of outer passes.
    #[must_use]
    pub fn with_max_passes(mut self, max: usize) -> Self {
        self.max_passes = max;
        self
    }

    /// Set the per-pass match ceiling.
    #[must_use]
    pub fn with_match_limit(mut self, limit: usize) -> Self {
        self.match_limit = limit;
        self
    }

    /// Enable or disable tracing.
    #[must_use]
    pub fn with_trace(mut self, enable: bool) -> Self {
        self.enable_trace = enable;
        self
    }
}

/// Comparison tier configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompareConfig {
    /// Run the independent labeled-tree comparison tier.
    pub enable_tree_compare: bool,
    /// Consult the rule advisor when the structural tiers disagree.
    pub enable_rule_assist: bool,
    /// Use the physical-plan oracle as the final tie-break.
    pub enable_oracle_tiebreak: bool,
    /// Treat a `dont_know` advisor verdict like `true` for the oracle tie-break.
    pub trust_dont_know: bool,
    /// Schema description handed to the rule advisor.
    pub schema_summary: Option<String>,
}

impl Default for CompareConfig {
    fn default() -> Self {
        Self {
            enable_tree_compare: true,
            enable_rule_assist: true,
            enable_oracle_tiebreak: true,
            trust_dont_know: false,
            schema_summary: None,
        }
    }
}

impl CompareConfig {
    /// Enable or disable the tree comparison tier.
    #[must_use]
    pub fn with_tree_compare(mut self, enable: bool) -> Self {
        self.enable_tree_compare = enable;
        self
    }

    /// Enable or disable the rule-assisted tier.
    #[must_use]
    pub fn with_rule_assist(mut self, enable: bool) -> Self {
        self.enable_rule_assist = enable;
        self
    }

    /// Enable or disable the oracle tie-break.
    #[must_use]
    pub fn with_oracle_tiebreak(mut self, enable: bool) -> Self {
        self.enable_oracle_tiebreak = enable;
        self
    }

    /// Trust `dont_know` advisor verdicts for the oracle tie-break.
    #[must_use]
    pub fn with_trust_dont_know(mut self, trust: bool) -> Self {
        self.trust_dont_know = trust;
        self
    }

    /// Set the schema summary passed to rule advisors.
    #[must_use]
    pub fn with_schema_summary(mut self, summary: impl Into<String>) -> Self {
        self.schema_summary = Some(summary.into());
        self
    }
}
