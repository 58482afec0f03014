//! Rewrite rule trait and application results.

use std::fmt::Write as _;
use std::sync::Arc;

use common_error::PlanEqResult;
use planeq_logical::LogicalPlanNode;

/// A named rewrite that matches a single plan node.
///
/// Rules are pure: `rewrite` inspects one node (and, where the pattern
/// requires it, that node's inputs) and returns a semantically equivalent
/// replacement, or `None` when the pattern does not match. The engine takes
/// care of traversal and fixpoint iteration.
pub trait RewriteRule: Send + Sync {
    /// Get the name of this rule.
    fn name(&self) -> &'static str;

    /// Get a description of what this rule does.
    fn description(&self) -> &'static str {
        "No description available"
    }

    /// Rewrite `node`, or return `None` if the rule does not apply.
    fn rewrite(&self, node: &LogicalPlanNode) -> PlanEqResult<Option<LogicalPlanNode>>;
}

/// A trace entry for a single rule application.
#[derive(Debug, Clone)]
pub struct RuleTrace {
    /// The name of the rule that was applied.
    pub rule_name: String,
    /// The matched node before the rewrite (as explain string).
    pub before: String,
    /// The replacement node (as explain string).
    pub after: String,
    /// The outer pass in which the rule fired.
    pub pass: usize,
}

impl RuleTrace {
    /// Create a new trace entry.
    pub fn new(
        rule_name: impl Into<String>,
        before: impl Into<String>,
        after: impl Into<String>,
        pass: usize,
    ) -> Self {
        Self {
            rule_name: rule_name.into(),
            before: before.into(),
            after: after.into(),
            pass,
        }
    }
}

/// The result of applying a rule set with optional trace information.
#[derive(Debug, Clone)]
pub struct RewrittenPlan {
    /// The final plan.
    pub plan: Arc<LogicalPlanNode>,
    /// Number of outer passes performed.
    pub passes: usize,
    /// Number of rewrites performed.
    pub rules_applied: usize,
    /// Names of the recognized rules in application order.
    pub recognized: Vec<&'static str>,
    /// Names that did not match any known rule.
    pub unknown: Vec<String>,
    /// Detailed trace of rule applications (if tracing was enabled).
    pub trace: Vec<RuleTrace>,
}

impl RewrittenPlan {
    /// Create a result for an unchanged plan.
    pub fn unchanged(plan: Arc<LogicalPlanNode>) -> Self {
        Self {
            plan,
            passes: 0,
            rules_applied: 0,
            recognized: Vec::new(),
            unknown: Vec::new(),
            trace: Vec::new(),
        }
    }

    /// Whether any rewrite fired.
    pub const fn changed(&self) -> bool {
        self.rules_applied > 0
    }

    /// Format the trace as a human-readable string.
    pub fn format_trace(&self) -> String {
        let mut output = format!(
            "Rule application completed in {} passes, {} rewrites applied\n",
            self.passes, self.rules_applied
        );

        if self.trace.is_empty() {
            output.push_str("  (no trace available)\n");
        } else {
            for (i, entry) in self.trace.iter().enumerate() {
                let _ = writeln!(
                    output,
                    "\n--- Rewrite {} (pass {}): {} ---",
                    i + 1,
                    entry.pass,
                    entry.rule_name
                );
                output.push_str("Before:\n");
                output.push_str(&entry.before);
                output.push_str("After:\n");
                output.push_str(&entry.after);
            }
        }

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unchanged() {
        let result = RewrittenPlan::unchanged(Arc::new(LogicalPlanNode::scan("orders")));
        assert!(!result.changed());
        assert_eq!(result.passes, 0);
        assert!(result.format_trace().contains("(no trace available)"));
    }

    #[test]
    fn test_rule_trace() {
        let trace = RuleTrace::new("FilterMergeRule", "before\n", "after\n", 2);
        assert_eq!(trace.rule_name, "FilterMergeRule");
        assert_eq!(trace.pass, 2);

        let mut result = RewrittenPlan::unchanged(Arc::new(LogicalPlanNode::scan("orders")));
        result.rules_applied = 1;
        result.passes = 2;
        result.trace.push(trace);
        let formatted = result.format_trace();
        assert!(formatted.contains("Rewrite 1 (pass 2): FilterMergeRule"));
        assert!(formatted.contains("Before:\nbefore\nAfter:\nafter\n"));
    }
}
