//! Tiered query-plan equivalence checking.
//!
//! [`EquivalenceChecker`] plans both queries through a [`PlanSource`] and
//! walks the tiers below, stopping at the first that matches:
//!
//! 1. identical query text
//! 2. raw explain digests, after correlation normalization
//! 3. raw digests with positions placeheld and whitespace collapsed
//! 4. canonical digests
//! 5. labeled-tree digests (optional)
//! 6. rule-assisted: a [`RuleAdvisor`] names rewrite rules, tiers 2-5 are
//!    repeated on the rewritten plans, and a [`PlanOracle`] may break the tie
//!
//! Anything that fails along the way decides [`Outcome::NotEquivalent`].

mod checker;
mod collaborator;
mod decision;
mod oracle;
mod suggestion;

pub use checker::EquivalenceChecker;
pub use collaborator::{JsonPlanSource, PlanOracle, PlanSource, RuleAdvisor};
pub use decision::{Decision, Outcome, Tier};
pub use oracle::{VOLATILE_PLAN_KEYS, clean_plan_json};
pub use suggestion::{RuleSuggestion, Verdict};
