//! Bounded fixpoint application of named rules.
//!
//! The engine resolves the requested names against the catalogue, then
//! repeatedly sweeps the combined rule set over the plan. Each sweep is a
//! bottom-up transform; sweeps repeat within a pass until nothing matches or
//! the per-pass match limit is reached. Passes repeat until the plan's
//! explain digest stops changing or the pass budget runs out.

use std::cell::{Cell, RefCell};
use std::sync::Arc;

use common_config::RuleEngineConfig;
use common_error::PlanEqResult;
use log::debug;
use planeq_logical::LogicalPlanNode;

use super::registry;
use super::rule::{RewriteRule, RewrittenPlan, RuleTrace};

/// Applies named rules to plans.
#[derive(Debug, Clone, Default)]
pub struct RuleEngine {
    config: RuleEngineConfig,
}

impl RuleEngine {
    /// Create an engine with the given configuration.
    pub const fn new(config: RuleEngineConfig) -> Self {
        Self { config }
    }

    /// The engine configuration.
    pub const fn config(&self) -> &RuleEngineConfig {
        &self.config
    }

    /// Apply the rules named in `names` to `plan`.
    ///
    /// Unknown names are skipped. When no name resolves, the plan is
    /// returned unchanged.
    pub fn apply<S: AsRef<str>>(
        &self,
        plan: &Arc<LogicalPlanNode>,
        names: &[S],
    ) -> PlanEqResult<RewrittenPlan> {
        let mut rules: Vec<&'static dyn RewriteRule> = Vec::new();
        let mut unknown = Vec::new();
        for name in names {
            let name = name.as_ref();
            match registry::lookup(name) {
                Some(rule) if rules.iter().any(|r| r.name() == rule.name()) => {}
                Some(rule) => rules.push(rule),
                None => {
                    debug!("Skipping unknown rule '{name}'");
                    unknown.push(name.to_string());
                }
            }
        }

        if rules.is_empty() {
            debug!("No recognized rules, plan left unchanged");
            let mut result = RewrittenPlan::unchanged(Arc::clone(plan));
            result.unknown = unknown;
            return Ok(result);
        }

        let mut current = Arc::clone(plan);
        let mut digest = current.explain();
        let mut passes = 0;
        let mut rules_applied = 0;
        let mut trace = Vec::new();

        while passes < self.config.max_passes {
            passes += 1;
            let (next, matched) = self.run_pass(&current, &rules, passes, &mut trace)?;
            rules_applied += matched;
            current = next;

            let next_digest = current.explain();
            if next_digest == digest {
                debug!("No changes in pass {passes}, reached fixpoint");
                break;
            }
            digest = next_digest;
        }
        if passes == self.config.max_passes {
            debug!("Rule engine stopped after {passes} passes");
        }

        Ok(RewrittenPlan {
            plan: current,
            passes,
            rules_applied,
            recognized: rules.iter().map(|r| r.name()).collect(),
            unknown,
            trace,
        })
    }

    /// One pass: sweep until no rule matches or the match limit is hit.
    fn run_pass(
        &self,
        plan: &Arc<LogicalPlanNode>,
        rules: &[&'static dyn RewriteRule],
        pass: usize,
        trace: &mut Vec<RuleTrace>,
    ) -> PlanEqResult<(Arc<LogicalPlanNode>, usize)> {
        let limit = self.config.match_limit;
        let matches = Cell::new(0usize);
        let entries = RefCell::new(Vec::new());

        let rewrite_node = |node: &LogicalPlanNode| -> PlanEqResult<Option<LogicalPlanNode>> {
            if matches.get() >= limit {
                return Ok(None);
            }
            for rule in rules {
                let Some(rewritten) = rule.rewrite(node)? else {
                    continue;
                };
                if rewritten == *node {
                    continue;
                }
                matches.set(matches.get() + 1);
                debug!("Rule '{}' applied in pass {pass}", rule.name());
                if self.config.enable_trace {
                    entries.borrow_mut().push(RuleTrace::new(
                        rule.name(),
                        node.explain(),
                        rewritten.explain(),
                        pass,
                    ));
                }
                return Ok(Some(rewritten));
            }
            Ok(None)
        };

        let mut current = Arc::clone(plan);
        loop {
            let before = matches.get();
            current = current.try_transform(&rewrite_node)?;
            if matches.get() == before {
                break;
            }
            if matches.get() >= limit {
                debug!("Match limit ({limit}) reached in pass {pass}");
                break;
            }
        }

        trace.extend(entries.into_inner());
        Ok((current, matches.get()))
    }
}
