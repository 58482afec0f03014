//! planeq - compare serialized query plans
//!
//! Plans are read as JSON-encoded logical plans.
//!
//! # Usage
//!
//! ```bash
//! cargo run --package planeq-cli -- compare a.json b.json --verbose
//! cargo run --package planeq-cli -- digest a.json
//! cargo run --package planeq-cli -- rules
//! ```

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use env_logger::Env;
use log::{debug, error};

use common_config::PlanEqConfig;
use common_display::{DisplayTree, indent};
use common_error::PlanEqResult;
use planeq_canonical::{canonical_digest, normalized_digest, raw_digest};
use planeq_equivalence::{EquivalenceChecker, JsonPlanSource, PlanSource};
use planeq_logical::LogicalPlanNode;
use planeq_optimizer::{RuleEngine, lookup, normalize, supported_rules};
use planeq_tree::plan_tree;

/// planeq CLI.
#[derive(Parser, Debug)]
#[command(name = "planeq")]
#[command(about = "Decide whether two query plans are equivalent")]
#[command(version)]
struct Args {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// JSON configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compare two plans through the structural tiers
    Compare {
        /// First plan
        left: PathBuf,

        /// Second plan
        right: PathBuf,

        /// Rewrite rules to apply to both plans before comparing
        #[arg(short, long, num_args = 1..)]
        rules: Vec<String>,

        /// Print the decision as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the digests of a plan
    Digest {
        /// Plan file
        plan: PathBuf,

        /// Truncate plan node labels to this many characters
        #[arg(short, long)]
        width: Option<usize>,
    },

    /// List the supported rewrite rules
    Rules,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let default_filter = if args.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();

    match run(args) {
        Ok(code) => code,
        Err(e) => {
            error!("{e}");
            ExitCode::from(2)
        }
    }
}

fn run(args: Args) -> PlanEqResult<ExitCode> {
    let config = match &args.config {
        Some(path) => PlanEqConfig::load(path)?,
        None => PlanEqConfig::default(),
    };
    debug!("Using configuration {config:?}");

    match args.command {
        Commands::Compare {
            left,
            right,
            rules,
            json,
        } => compare(config, &left, &right, &rules, json),
        Commands::Digest { plan, width } => {
            digest(&read_plan(&plan)?, width);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Rules => {
            for name in supported_rules() {
                let description = lookup(name).map_or("", |rule| rule.description());
                println!("{name:<32} {description}");
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn compare(
    config: PlanEqConfig,
    left: &Path,
    right: &Path,
    rules: &[String],
    json: bool,
) -> PlanEqResult<ExitCode> {
    let mut plan_a = read_plan(left)?;
    let mut plan_b = read_plan(right)?;

    if !rules.is_empty() {
        let engine = RuleEngine::new(config.rules.clone());
        for plan in [&mut plan_a, &mut plan_b] {
            let rewritten = engine.apply(plan, rules)?;
            if !rewritten.unknown.is_empty() {
                eprintln!("Unknown rules ignored: {}", rewritten.unknown.join(", "));
            }
            *plan = rewritten.plan;
        }
    }

    let checker = EquivalenceChecker::new(JsonPlanSource).with_config(config);
    let decision = checker.compare_plans(&plan_a, &plan_b);
    if json {
        println!("{}", serde_json::to_string_pretty(&decision)?);
    } else {
        println!("{decision}");
    }

    Ok(if decision.is_equivalent() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    })
}

fn digest(plan: &Arc<LogicalPlanNode>, width: Option<usize>) {
    let normalized = normalize(plan);
    let mut tree = DisplayTree::new(&**plan);
    if let Some(width) = width {
        tree = tree.with_max_label_width(width);
    }
    let sections = [
        ("Plan", tree.to_string()),
        ("Raw", raw_digest(&normalized)),
        ("Normalized", normalized_digest(&normalized)),
        ("Canonical", canonical_digest(&normalized)),
        ("Tree", plan_tree(&normalized).explain()),
    ];
    for (title, body) in sections {
        println!("{title}:\n{}", indent(body.trim_end(), "  "));
    }
}

fn read_plan(path: &Path) -> PlanEqResult<Arc<LogicalPlanNode>> {
    let text = std::fs::read_to_string(path)?;
    Ok(Arc::new(JsonPlanSource.to_plan(&text)?))
}
