//! The tiered equivalence orchestrator.

use std::sync::Arc;

use common_config::PlanEqConfig;
use common_error::PlanEqResult;
use log::{debug, info, trace, warn};
use planeq_canonical::{canonical_digest, normalized_digest, raw_digest};
use planeq_logical::LogicalPlanNode;
use planeq_optimizer::{RuleEngine, normalize};
use planeq_tree::tree_digest;

use crate::{Decision, PlanOracle, PlanSource, RuleAdvisor, RuleSuggestion, Tier, Verdict};

/// Decides whether two queries are equivalent.
///
/// Tiers run cheapest first and the first match decides `Equivalent`.
/// Every failure along the way decides `NotEquivalent`; the checker never
/// reports equivalence it could not establish.
pub struct EquivalenceChecker {
    source: Box<dyn PlanSource>,
    advisor: Option<Box<dyn RuleAdvisor>>,
    oracle: Option<Box<dyn PlanOracle>>,
    config: PlanEqConfig,
}

impl EquivalenceChecker {
    /// Create a checker planning queries with `source`.
    pub fn new(source: impl PlanSource + 'static) -> Self {
        Self {
            source: Box::new(source),
            advisor: None,
            oracle: None,
            config: PlanEqConfig::default(),
        }
    }

    /// Consult `advisor` when the structural tiers disagree.
    #[must_use]
    pub fn with_advisor(mut self, advisor: impl RuleAdvisor + 'static) -> Self {
        self.advisor = Some(Box::new(advisor));
        self
    }

    /// Use `oracle` as the final tie-break of the rule-assisted tier.
    #[must_use]
    pub fn with_oracle(mut self, oracle: impl PlanOracle + 'static) -> Self {
        self.oracle = Some(Box::new(oracle));
        self
    }

    /// Replace the configuration.
    #[must_use]
    pub fn with_config(mut self, config: PlanEqConfig) -> Self {
        self.config = config;
        self
    }

    /// Get the configuration.
    pub fn config(&self) -> &PlanEqConfig {
        &self.config
    }

    // ========== Queries ==========

    /// Compare two queries through every enabled tier.
    pub fn compare_queries(&self, query_a: &str, query_b: &str) -> Decision {
        let decision = self.decide(query_a, query_b);
        info!("Comparison decided {decision}");
        decision
    }

    fn decide(&self, query_a: &str, query_b: &str) -> Decision {
        if query_a.trim() == query_b.trim() {
            debug!("Query texts are identical");
            return Decision::equivalent(Tier::Text);
        }

        let (plan_a, plan_b) = match self.plan_both(query_a, query_b) {
            Ok(plans) => plans,
            Err(e) => {
                warn!("Planning failed, comparison aborted: {e}");
                return Decision::not_equivalent(format!("planning failed: {e}"));
            }
        };

        if let Some(tier) = self.structural_tier(&plan_a, &plan_b) {
            return Decision::equivalent(tier);
        }

        if !self.config.compare.enable_rule_assist {
            return Decision::not_equivalent("no structural tier matched");
        }
        match &self.advisor {
            Some(advisor) => self.rule_assisted(advisor.as_ref(), query_a, query_b, &plan_a, &plan_b),
            None => Decision::not_equivalent("no structural tier matched and no rule advisor is configured"),
        }
    }

    fn plan_both(
        &self,
        query_a: &str,
        query_b: &str,
    ) -> PlanEqResult<(Arc<LogicalPlanNode>, Arc<LogicalPlanNode>)> {
        let plan_a = Arc::new(self.source.to_plan(query_a)?);
        let plan_b = Arc::new(self.source.to_plan(query_b)?);
        Ok((plan_a, plan_b))
    }

    // ========== Plans ==========

    /// Compare two already-built plans through the structural tiers.
    pub fn compare_plans(&self, plan_a: &Arc<LogicalPlanNode>, plan_b: &Arc<LogicalPlanNode>) -> Decision {
        match self.structural_tier(plan_a, plan_b) {
            Some(tier) => Decision::equivalent(tier),
            None => Decision::not_equivalent("no structural tier matched"),
        }
    }

    /// The first structural tier under which the normalized plans agree.
    fn structural_tier(&self, plan_a: &Arc<LogicalPlanNode>, plan_b: &Arc<LogicalPlanNode>) -> Option<Tier> {
        let plan_a = normalize(plan_a);
        let plan_b = normalize(plan_b);

        let (raw_a, raw_b) = (raw_digest(&plan_a), raw_digest(&plan_b));
        trace!("Raw digests:\n{raw_a}\n{raw_b}");
        if raw_a == raw_b {
            debug!("Plans match on raw digest");
            return Some(Tier::Raw);
        }

        if normalized_digest(&plan_a) == normalized_digest(&plan_b) {
            debug!("Plans match on normalized digest");
            return Some(Tier::Normalized);
        }

        let (canonical_a, canonical_b) = (canonical_digest(&plan_a), canonical_digest(&plan_b));
        trace!("Canonical digests:\n{canonical_a}\n{canonical_b}");
        if canonical_a == canonical_b {
            debug!("Plans match on canonical digest");
            return Some(Tier::Canonical);
        }

        if self.config.compare.enable_tree_compare {
            let (tree_a, tree_b) = (tree_digest(&plan_a), tree_digest(&plan_b));
            trace!("Tree digests:\n{tree_a}\n{tree_b}");
            if tree_a == tree_b {
                debug!("Plans match on tree digest");
                return Some(Tier::Tree);
            }
        }

        debug!("No structural tier matched");
        None
    }

    // ========== Rule assistance ==========

    fn rule_assisted(
        &self,
        advisor: &dyn RuleAdvisor,
        query_a: &str,
        query_b: &str,
        plan_a: &Arc<LogicalPlanNode>,
        plan_b: &Arc<LogicalPlanNode>,
    ) -> Decision {
        let schema = self.config.compare.schema_summary.as_deref();
        let suggestion = advisor
            .suggest_rules(&plan_a.display_tree(), &plan_b.display_tree(), schema)
            .unwrap_or_else(|e| {
                warn!("Rule advisor failed: {e}");
                RuleSuggestion::dont_know()
            });
        debug!(
            "Advisor verdict {} with rules {:?}",
            suggestion.verdict, suggestion.rules
        );
        for (rule, precondition) in suggestion.rules.iter().zip(&suggestion.preconditions) {
            debug!("Precondition of {rule}: {precondition}");
        }

        if suggestion.verdict == Verdict::False {
            return Decision::not_equivalent("rule advisor judged the plans different");
        }

        let mut applied = Vec::new();
        if !suggestion.rules.is_empty() {
            match self.rewrite_and_compare(plan_a, plan_b, &suggestion.rules, &mut applied) {
                Ok(Some(tier)) => {
                    return Decision::equivalent(Tier::RuleAssisted(Box::new(tier))).with_applied_rules(applied);
                }
                Ok(None) => {}
                Err(e) => {
                    warn!("Rule application failed, comparison aborted: {e}");
                    return Decision::not_equivalent(format!("rule application failed: {e}"))
                        .with_applied_rules(applied);
                }
            }
        }

        let trusted = match suggestion.verdict {
            Verdict::True => true,
            Verdict::DontKnow => self.config.compare.trust_dont_know,
            Verdict::False => false,
        };
        if trusted && self.config.compare.enable_oracle_tiebreak {
            if let Some(oracle) = &self.oracle {
                if self.oracle_agrees(oracle.as_ref(), query_a, query_b) {
                    return Decision::equivalent(Tier::Oracle).with_applied_rules(applied);
                }
            }
        }

        Decision::not_equivalent("plans still differ after rule assistance").with_applied_rules(applied)
    }

    /// Rewrite plan A and compare; if that fails, rewrite plan B as well.
    fn rewrite_and_compare(
        &self,
        plan_a: &Arc<LogicalPlanNode>,
        plan_b: &Arc<LogicalPlanNode>,
        rules: &[String],
        applied: &mut Vec<String>,
    ) -> PlanEqResult<Option<Tier>> {
        let engine = RuleEngine::new(self.config.rules.clone());

        let rewritten_a = engine.apply(plan_a, rules)?;
        record_applied(applied, &rewritten_a.recognized);
        if !rewritten_a.unknown.is_empty() {
            debug!("Ignoring unknown rules {:?}", rewritten_a.unknown);
        }
        if rewritten_a.changed() {
            debug!("Rewrote plan A:\n{}", rewritten_a.format_trace());
            if let Some(tier) = self.structural_tier(&rewritten_a.plan, plan_b) {
                return Ok(Some(tier));
            }
        }

        let rewritten_b = engine.apply(plan_b, rules)?;
        if !rewritten_a.changed() && !rewritten_b.changed() {
            return Ok(None);
        }
        debug!("Rewrote plan B:\n{}", rewritten_b.format_trace());
        Ok(self.structural_tier(&rewritten_a.plan, &rewritten_b.plan))
    }

    fn oracle_agrees(&self, oracle: &dyn PlanOracle, query_a: &str, query_b: &str) -> bool {
        let explained = oracle.explain(query_a).and_then(|a| Ok((a, oracle.explain(query_b)?)));
        match explained {
            Ok((physical_a, physical_b)) => {
                trace!("Physical plans:\n{physical_a}\n{physical_b}");
                physical_a == physical_b
            }
            Err(e) if e.is_recoverable() => {
                info!("Skipping oracle tie-break: {e}");
                false
            }
            Err(e) => {
                warn!("Oracle failed, skipping tie-break: {e}");
                false
            }
        }
    }
}

fn record_applied(applied: &mut Vec<String>, names: &[&'static str]) {
    for name in names {
        if !applied.iter().any(|a| a == name) {
            applied.push((*name).to_string());
        }
    }
}

impl std::fmt::Debug for EquivalenceChecker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EquivalenceChecker")
            .field("advisor", &self.advisor.is_some())
            .field("oracle", &self.oracle.is_some())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use common_error::PlanEqError;
    use planeq_logical::{PlanBuilder, col, col_idx, lit};

    use super::*;
    use crate::JsonPlanSource;

    fn json(plan: &LogicalPlanNode) -> String {
        serde_json::to_string(plan).unwrap()
    }

    #[test]
    fn test_identical_text() {
        let checker = EquivalenceChecker::new(JsonPlanSource);
        let decision = checker.compare_queries("not even json", "  not even json ");
        assert_eq!(decision.tier, Some(Tier::Text));
    }

    #[test]
    fn test_raw_tier() {
        let checker = EquivalenceChecker::new(JsonPlanSource);
        let plan = PlanBuilder::scan("orders").filter(col("o_totalprice").gt(lit("100"))).build();
        let decision = checker.compare_queries(&json(&plan), &format!("{} ;", json(&plan)));
        assert_eq!(decision.tier, Some(Tier::Raw));
    }

    #[test]
    fn test_normalized_tier() {
        let checker = EquivalenceChecker::new(JsonPlanSource);
        let a = PlanBuilder::scan("orders").project(vec![col_idx(0)]).build_arc();
        let b = PlanBuilder::scan("orders").project(vec![col_idx(3)]).build_arc();
        assert_eq!(checker.compare_plans(&a, &b).tier, Some(Tier::Normalized));
    }

    #[test]
    fn test_canonical_tier() {
        let checker = EquivalenceChecker::new(JsonPlanSource);
        let a = PlanBuilder::scan("t").filter(col("a").eq(col("b"))).build_arc();
        let b = PlanBuilder::scan("t").filter(col("b").eq(col("a"))).build_arc();
        assert_eq!(checker.compare_plans(&a, &b).tier, Some(Tier::Canonical));
    }

    #[test]
    fn test_tree_tier_can_be_disabled() {
        // the tree leaves positions anonymous, the canonical form does not
        let a = PlanBuilder::scan("t")
            .filter(col_idx(0).eq(lit("'x'")).and(col_idx(1).eq(lit("'y'"))))
            .build_arc();
        let b = PlanBuilder::scan("t")
            .filter(col_idx(2).eq(lit("'y'")).and(col_idx(0).eq(lit("'x'"))))
            .build_arc();

        let checker = EquivalenceChecker::new(JsonPlanSource);
        assert_eq!(checker.compare_plans(&a, &b).tier, Some(Tier::Tree));

        let config = PlanEqConfig::default()
            .with_compare(common_config::CompareConfig::default().with_tree_compare(false));
        let checker = EquivalenceChecker::new(JsonPlanSource).with_config(config);
        assert!(!checker.compare_plans(&a, &b).is_equivalent());
    }

    #[test]
    fn test_planning_failure_is_not_equivalent() {
        let checker = EquivalenceChecker::new(JsonPlanSource);
        let decision = checker.compare_queries(&json(&LogicalPlanNode::scan("a")), "SELECT 1");
        assert!(!decision.is_equivalent());
        assert!(decision.diagnostic.unwrap().contains("ParseOrPlanError"));
    }

    struct FixedAdvisor(RuleSuggestion);

    impl RuleAdvisor for FixedAdvisor {
        fn suggest_rules(&self, _: &str, _: &str, _: Option<&str>) -> PlanEqResult<RuleSuggestion> {
            Ok(self.0.clone())
        }
    }

    struct FailingAdvisor;

    impl RuleAdvisor for FailingAdvisor {
        fn suggest_rules(&self, _: &str, _: &str, _: Option<&str>) -> PlanEqResult<RuleSuggestion> {
            Err(PlanEqError::advisor("model unavailable"))
        }
    }

    #[test]
    fn test_rules_cannot_force_equivalence() {
        let a = PlanBuilder::scan("t")
            .filter(col("a").gt(lit("1")))
            .filter(col("b").lt(lit("2")))
            .build();
        let b = PlanBuilder::scan("t")
            .filter(col("b").lt(lit("2")).and(col("c").eq(lit("3"))))
            .build();
        let advisor = FixedAdvisor(RuleSuggestion::new(Verdict::True, ["FilterMergeRule"]));
        let checker = EquivalenceChecker::new(JsonPlanSource).with_advisor(advisor);
        // merging alone cannot make different predicates equal
        assert!(!checker.compare_queries(&json(&a), &json(&b)).is_equivalent());
    }

    #[test]
    fn test_advisor_failure_is_dont_know() {
        let a = LogicalPlanNode::scan("a");
        let b = LogicalPlanNode::scan("b");
        let checker = EquivalenceChecker::new(JsonPlanSource).with_advisor(FailingAdvisor);
        let decision = checker.compare_queries(&json(&a), &json(&b));
        assert!(!decision.is_equivalent());
        assert_eq!(decision.diagnostic.as_deref(), Some("plans still differ after rule assistance"));
    }
}
