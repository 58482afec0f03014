//! Plan rewriting for planeq.
//!
//! Two independent pieces live here:
//!
//! - the rule engine, which applies a named subset of the rule catalogue to
//!   a plan until a bounded fixpoint ([`RuleEngine`], [`supported_rules`]);
//! - the correlation normalizer, which lifts scalar subqueries into explicit
//!   correlated joins and then decorrelates them where it can ([`normalize`]).

mod decorrelate;
mod rules;

use std::sync::Arc;

pub use decorrelate::{decorrelate, lift_subqueries, normalize};
pub use rules::{
    AggregateRemoveRule, FilterIntoJoinRule, FilterMergeRule, FilterProjectTransposeRule,
    JoinAssociateRule, JoinCommuteRule, ProjectMergeRule, ProjectRemoveRule, PushNotDownRule,
    ReduceExpressionsRule, RewriteRule, RewrittenPlan, RuleEngine, RuleTrace, SetOpMergeRule,
    SortRemoveRule, lookup, push_not_down, reduce, supported_rules,
};

use common_config::RuleEngineConfig;
use common_error::PlanEqResult;
use planeq_logical::LogicalPlanNode;

/// Apply the named rules with the default engine configuration.
pub fn apply_rules<S: AsRef<str>>(
    plan: &Arc<LogicalPlanNode>,
    names: &[S],
) -> PlanEqResult<Arc<LogicalPlanNode>> {
    RuleEngine::new(RuleEngineConfig::default())
        .apply(plan, names)
        .map(|result| result.plan)
}
