//! Subquery and correlation normalization.
//!
//! Normalization runs in two steps:
//!
//! 1. Scalar subqueries embedded in filter predicates, projection lists and
//!    inner join conditions are lifted into explicit [`Correlate`] inputs, and
//!    the subquery expression is replaced by a reference to the new column.
//! 2. Each `Correlate` is turned into a plain join. An uncorrelated right
//!    side becomes a join on `true`; a correlated aggregate of the form
//!    `Aggregate(no keys, Filter(outer = e AND rest, R))` becomes a left join
//!    against `Aggregate(group by e, Filter(rest, R))`.
//!
//! [`normalize`] is total: if either step is inapplicable the plan from
//! before that step is returned.
//!
//! [`Correlate`]: LogicalPlanNode::Correlate

use std::cell::{Cell, RefCell};
use std::sync::Arc;

use common_error::{PlanEqError, PlanEqResult, decorrelation_err, ensure};
use log::debug;
use planeq_logical::{
    AggregateCall, ColumnRef, CorrelationId, Expr, JoinKind, LogicalPlanNode, OperatorKind,
    col_idx,
};

/// Normalize correlated subqueries in `plan`, never failing.
pub fn normalize(plan: &Arc<LogicalPlanNode>) -> Arc<LogicalPlanNode> {
    let lifted = match lift_subqueries(plan) {
        Ok(lifted) => lifted,
        Err(e) => {
            debug!("Subquery lifting skipped: {e}");
            return Arc::clone(plan);
        }
    };
    match decorrelate(&lifted) {
        Ok(decorrelated) => decorrelated,
        Err(e) => {
            debug!("Decorrelation skipped: {e}");
            lifted
        }
    }
}

/// Step 1: replace embedded scalar subqueries with `Correlate` inputs.
pub fn lift_subqueries(plan: &Arc<LogicalPlanNode>) -> PlanEqResult<Arc<LogicalPlanNode>> {
    let next_id = max_correlation(plan).map_or(0, |id| id + 1);
    let lifter = SubqueryLifter {
        next_id: Cell::new(next_id),
    };
    lifter.lift(plan)
}

/// Step 2: rewrite every `Correlate` into a join.
pub fn decorrelate(plan: &Arc<LogicalPlanNode>) -> PlanEqResult<Arc<LogicalPlanNode>> {
    plan.try_transform(&decorrelate_node)
}

// ========== Lifting ==========

struct SubqueryLifter {
    next_id: Cell<u32>,
}

impl SubqueryLifter {
    fn lift(&self, plan: &Arc<LogicalPlanNode>) -> PlanEqResult<Arc<LogicalPlanNode>> {
        plan.try_transform(&|node: &LogicalPlanNode| self.lift_node(node))
    }

    fn fresh_id(&self) -> CorrelationId {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        CorrelationId(id)
    }

    fn lift_node(&self, node: &LogicalPlanNode) -> PlanEqResult<Option<LogicalPlanNode>> {
        if !node.expressions().iter().any(|e| e.contains_subquery()) {
            return Ok(None);
        }
        match node {
            LogicalPlanNode::Filter { predicate, input } => {
                let width = known_width(input)?;
                let (predicate, source) =
                    self.extract(predicate, &Cell::new(width), Arc::clone(input))?;
                Ok(Some(LogicalPlanNode::project(
                    (0..width).map(col_idx).collect(),
                    LogicalPlanNode::filter(predicate, source),
                )))
            }
            LogicalPlanNode::Project { exprs, input } => {
                let next_column = Cell::new(known_width(input)?);
                let mut source = Arc::clone(input);
                let mut lifted = Vec::with_capacity(exprs.len());
                for expr in exprs {
                    let (expr, next) = self.extract(expr, &next_column, source)?;
                    lifted.push(expr);
                    source = next;
                }
                Ok(Some(LogicalPlanNode::project(lifted, source)))
            }
            LogicalPlanNode::Join {
                kind: JoinKind::Inner,
                condition,
                left,
                right,
            } => {
                let width = known_width(left)? + known_width(right)?;
                let cross = LogicalPlanNode::join(
                    JoinKind::Inner,
                    Expr::true_literal(),
                    Arc::clone(left),
                    Arc::clone(right),
                );
                let (condition, source) =
                    self.extract(condition, &Cell::new(width), Arc::new(cross))?;
                Ok(Some(LogicalPlanNode::project(
                    (0..width).map(col_idx).collect(),
                    LogicalPlanNode::filter(condition, source),
                )))
            }
            LogicalPlanNode::Join { kind, .. } => {
                decorrelation_err!("subquery in {kind} join condition")
            }
            _ => Ok(None),
        }
    }

    /// Replace each subquery in `expr` by a reference to `next_column`,
    /// stacking one `Correlate` per subquery on top of `input`.
    fn extract(
        &self,
        expr: &Expr,
        next_column: &Cell<usize>,
        input: Arc<LogicalPlanNode>,
    ) -> PlanEqResult<(Expr, Arc<LogicalPlanNode>)> {
        let source = RefCell::new(input);
        let mut failure = None;

        let rewritten = expr.clone().rewrite(&mut |e| match e {
            Expr::ScalarSubquery { plan, correlation } if failure.is_none() => {
                match self.correlate(&plan, correlation, &source) {
                    Ok(()) => {
                        let column = next_column.get();
                        next_column.set(column + 1);
                        col_idx(column)
                    }
                    Err(err) => {
                        failure = Some(err);
                        Expr::ScalarSubquery { plan, correlation }
                    }
                }
            }
            other => other,
        });

        match failure {
            Some(err) => Err(err),
            None => Ok((rewritten, source.into_inner())),
        }
    }

    fn correlate(
        &self,
        subquery: &Arc<LogicalPlanNode>,
        correlation: Option<CorrelationId>,
        source: &RefCell<Arc<LogicalPlanNode>>,
    ) -> PlanEqResult<()> {
        let subquery = self.lift(subquery)?;
        if let Some(width) = subquery.output_width() {
            ensure!(
                width == 1,
                DecorrelationInapplicable: "scalar subquery produces {width} columns"
            );
        }
        let correlation = correlation.unwrap_or_else(|| self.fresh_id());
        let outer = Arc::clone(&source.borrow());
        *source.borrow_mut() = Arc::new(LogicalPlanNode::correlate(
            correlation,
            JoinKind::Left,
            outer,
            subquery,
        ));
        Ok(())
    }
}

fn known_width(plan: &LogicalPlanNode) -> PlanEqResult<usize> {
    plan.output_width().ok_or_else(|| {
        PlanEqError::decorrelation(format!("output width of {} is unknown", plan.name()))
    })
}

// ========== Decorrelation ==========

fn decorrelate_node(node: &LogicalPlanNode) -> PlanEqResult<Option<LogicalPlanNode>> {
    let LogicalPlanNode::Correlate {
        correlation,
        kind,
        left,
        right,
    } = node
    else {
        return Ok(None);
    };
    let id = *correlation;

    if !plan_references(right, id) {
        return Ok(Some(LogicalPlanNode::Join {
            kind: *kind,
            condition: Expr::true_literal(),
            left: Arc::clone(left),
            right: Arc::clone(right),
        }));
    }

    ensure!(
        matches!(kind, JoinKind::Left | JoinKind::Inner),
        DecorrelationInapplicable: "{kind} correlate on {id}"
    );
    let left_width = known_width(left)?;
    let LogicalPlanNode::Aggregate {
        group_keys,
        calls,
        input,
    } = right.as_ref()
    else {
        decorrelation_err!("correlated {} is not a scalar aggregate", right.name())
    };
    ensure!(
        group_keys.is_empty(),
        DecorrelationInapplicable: "correlated aggregate already groups"
    );
    // COUNT over no rows is 0, which a left join would turn into NULL
    ensure!(
        !calls.iter().any(AggregateCall::is_count),
        DecorrelationInapplicable: "correlated COUNT"
    );
    ensure!(
        !calls.iter().flat_map(|c| &c.args).any(|a| expr_references(a, id)),
        DecorrelationInapplicable: "aggregate argument references {id}"
    );
    let LogicalPlanNode::Filter {
        predicate,
        input: source,
    } = input.as_ref()
    else {
        decorrelation_err!("correlated aggregate input is {}", input.name())
    };
    ensure!(
        !plan_references(source, id),
        DecorrelationInapplicable: "{id} referenced below the correlated filter"
    );

    let mut outer_columns = Vec::new();
    let mut keys = Vec::new();
    let mut rest = Vec::new();
    for conjunct in predicate.clone().into_conjuncts() {
        if !expr_references(&conjunct, id) {
            rest.push(conjunct);
            continue;
        }
        let Some((column, key)) = correlated_equality(&conjunct, id) else {
            decorrelation_err!("unsupported correlated predicate {conjunct}")
        };
        if let ColumnRef::Index(i) = column {
            ensure!(
                i < left_width,
                DecorrelationInapplicable: "outer column ${i} beyond width {left_width}"
            );
        }
        outer_columns.push(column);
        keys.push(key);
    }

    let key_count = keys.len();
    let call_count = calls.len();
    let filtered = if rest.is_empty() {
        Arc::clone(source)
    } else {
        Arc::new(LogicalPlanNode::filter(Expr::conjunction(rest), Arc::clone(source)))
    };
    let grouped = LogicalPlanNode::aggregate(keys, calls.clone(), filtered);
    let condition = Expr::conjunction(
        outer_columns
            .into_iter()
            .enumerate()
            .map(|(j, column)| Expr::Column(column).eq(col_idx(left_width + j)))
            .collect(),
    );
    let outputs = (0..left_width)
        .chain(left_width + key_count..left_width + key_count + call_count)
        .map(col_idx)
        .collect();

    debug!("Decorrelated {id} into a {kind} join on {key_count} keys");
    Ok(Some(LogicalPlanNode::project(
        outputs,
        LogicalPlanNode::join(*kind, condition, Arc::clone(left), grouped),
    )))
}

/// Split `outer = e` (either orientation) into the outer column and `e`.
fn correlated_equality(conjunct: &Expr, id: CorrelationId) -> Option<(ColumnRef, Expr)> {
    let Expr::Call {
        op: OperatorKind::Equals,
        operands,
    } = conjunct
    else {
        return None;
    };
    let [lhs, rhs] = operands.as_slice() else {
        return None;
    };
    let (outer, inner) = match (lhs, rhs) {
        (Expr::OuterRef { correlation, column }, other)
        | (other, Expr::OuterRef { correlation, column })
            if *correlation == id =>
        {
            (column, other)
        }
        _ => return None,
    };
    (!expr_references(inner, id)).then(|| (outer.clone(), inner.clone()))
}

// ========== Correlation queries ==========

/// Whether `expr` references `id`, including inside nested subqueries.
fn expr_references(expr: &Expr, id: CorrelationId) -> bool {
    let mut found = false;
    expr.visit(&mut |e| match e {
        Expr::OuterRef { correlation, .. } if *correlation == id => found = true,
        Expr::ScalarSubquery { plan, .. } if !found => found = plan_references(plan, id),
        _ => {}
    });
    found
}

/// Whether any expression in `plan` references `id`.
fn plan_references(plan: &LogicalPlanNode, id: CorrelationId) -> bool {
    plan.expressions().iter().any(|e| expr_references(e, id))
        || plan.inputs().iter().any(|input| plan_references(input, id))
}

/// Largest correlation id used anywhere in `plan`.
fn max_correlation(plan: &LogicalPlanNode) -> Option<u32> {
    let mut max = match plan {
        LogicalPlanNode::Correlate { correlation, .. } => Some(correlation.0),
        _ => None,
    };
    for expr in plan.expressions() {
        expr.visit(&mut |e| {
            let id = match e {
                Expr::OuterRef { correlation, .. } => Some(correlation.0),
                Expr::ScalarSubquery { plan, correlation } => {
                    max_correlation(plan).max(correlation.map(|c| c.0))
                }
                _ => None,
            };
            max = max.max(id);
        });
    }
    plan.inputs()
        .iter()
        .filter_map(|input| max_correlation(input))
        .fold(max, |acc, id| acc.max(Some(id)))
}
