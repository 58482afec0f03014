//! Named rewrite rules and the engine that applies them.
//!
//! Every rule rewrites a single node into a semantically equivalent one.
//! Rules only fire where their preconditions can be checked locally: column
//! positions must be resolvable, and expressions carrying subqueries are
//! left alone.

mod aggregate;
mod engine;
mod filter;
mod join;
mod project;
mod reduce;
mod registry;
mod rule;
mod set_op;
mod sort;

pub use aggregate::AggregateRemoveRule;
pub use engine::RuleEngine;
pub use filter::{FilterIntoJoinRule, FilterMergeRule, FilterProjectTransposeRule};
pub use join::{JoinAssociateRule, JoinCommuteRule};
pub use project::{ProjectMergeRule, ProjectRemoveRule};
pub use reduce::{PushNotDownRule, ReduceExpressionsRule, push_not_down, reduce};
pub use registry::{lookup, supported_rules};
pub use rule::{RewriteRule, RewrittenPlan, RuleTrace};
pub use set_op::SetOpMergeRule;
pub use sort::SortRemoveRule;
