//! Comparison outcomes.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Final answer of a comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    Equivalent,
    NotEquivalent,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Equivalent => write!(f, "Equivalent"),
            Self::NotEquivalent => write!(f, "NotEquivalent"),
        }
    }
}

/// The comparison tier that proved two plans equivalent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tier {
    /// Identical query text.
    Text,
    /// Identical raw explain digests.
    Raw,
    /// Identical raw digests once positions and whitespace are normalized.
    Normalized,
    /// Identical canonical digests.
    Canonical,
    /// Identical labeled-tree digests.
    Tree,
    /// A structural tier matched after applying advisor-suggested rules.
    RuleAssisted(Box<Tier>),
    /// Identical cleaned physical plans.
    Oracle,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Raw => write!(f, "raw"),
            Self::Normalized => write!(f, "normalized"),
            Self::Canonical => write!(f, "canonical"),
            Self::Tree => write!(f, "tree"),
            Self::RuleAssisted(inner) => write!(f, "rule-assisted {inner}"),
            Self::Oracle => write!(f, "oracle"),
        }
    }
}

/// A decided comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub outcome: Outcome,
    /// Deciding tier, set only for equivalent outcomes.
    pub tier: Option<Tier>,
    /// Why equivalence could not be proven.
    pub diagnostic: Option<String>,
    /// Recognized rules applied during the rule-assisted tier.
    pub applied_rules: Vec<String>,
}

impl Decision {
    pub fn equivalent(tier: Tier) -> Self {
        Self {
            outcome: Outcome::Equivalent,
            tier: Some(tier),
            diagnostic: None,
            applied_rules: Vec::new(),
        }
    }

    pub fn not_equivalent(diagnostic: impl Into<String>) -> Self {
        Self {
            outcome: Outcome::NotEquivalent,
            tier: None,
            diagnostic: Some(diagnostic.into()),
            applied_rules: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_applied_rules(mut self, rules: Vec<String>) -> Self {
        self.applied_rules = rules;
        self
    }

    pub fn is_equivalent(&self) -> bool {
        self.outcome == Outcome::Equivalent
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.outcome)?;
        if let Some(tier) = &self.tier {
            write!(f, " ({tier})")?;
        }
        if !self.applied_rules.is_empty() {
            write!(f, " via [{}]", self.applied_rules.join(", "))?;
        }
        if let Some(diagnostic) = &self.diagnostic {
            write!(f, ": {diagnostic}")?;
        }
        Ok(())
    }
}
