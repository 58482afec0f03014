//! Logical plan layer for planeq.
//!
//! `planeq-logical` provides the relational plan and scalar expression IR that
//! the canonicalizer, comparator and rewrite engine consume.
//!
//! # Overview
//!
//! - **Expressions**: column references, literals, operator calls, scalar
//!   subqueries and correlated outer references
//! - **Plan nodes**: Scan, Filter, Project, Join, Aggregate, Sort, SetOp,
//!   Correlate and a generic escape hatch for unmodeled node kinds
//! - **Plan building**: fluent [`PlanBuilder`] API
//! - **Explain**: indented one-node-per-line rendering used as the raw
//!   structural digest
//!
//! # Example
//!
//! ```rust
//! use planeq_logical::{JoinKind, LogicalPlanNode, PlanBuilder};
//! use planeq_logical::expr::{col, lit};
//!
//! let plan = PlanBuilder::scan("orders")
//!     .join(
//!         JoinKind::Inner,
//!         col("o_custkey").eq(col("c_custkey")),
//!         LogicalPlanNode::scan("customer"),
//!     )
//!     .filter(col("o_totalprice").gt(lit("1000")))
//!     .build();
//!
//! println!("{}", plan.explain());
//! ```

pub mod expr;
pub mod ops;
mod plan;

pub use plan::{LogicalPlanNode, PlanBuilder};

pub use ops::{AggregateCall, JoinKind, SetOpKind, SortDirection, SortKey};

pub use expr::{ColumnRef, CorrelationId, Expr, OperatorKind};

pub use expr::{call, cast, col, col_idx, lit};
