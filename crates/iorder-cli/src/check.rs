//! Check command - validate a test case transaction step by step.

use anyhow::{Context, Result};
use clap::Args;
use console::style;
use std::collections::HashSet;
use std::path::PathBuf;

use iorder_pm::{
    unexpected_solver_transacts, validate, Config, OrderPolicy, TestCase, TransactionSet,
};

use crate::output::{describe_finding, name_of};
use crate::progress::ProgressManager;

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Test case file (JSON)
    pub testcase: PathBuf,

    /// Only analyze these idents (can be used multiple times)
    #[arg(short, long = "interest", value_name = "IDENT", action = clap::ArgAction::Append)]
    pub interest: Vec<String>,

    /// Keep pool order instead of ordering by media
    #[arg(long)]
    pub unordered: bool,

    /// Stop as soon as progress reporting asks to
    #[arg(long)]
    pub honor_abort: bool,

    /// Do not show progress bars
    #[arg(long)]
    pub no_progress: bool,

    /// Configuration file (default: ./iorder.toml)
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

pub fn execute(args: CheckArgs) -> Result<i32> {
    let mut config = Config::load(args.config.as_deref()).context("Failed to load configuration")?;
    if args.unordered {
        config.order.policy = OrderPolicy::Unordered;
    }
    if args.honor_abort {
        config.validate.honor_abort = true;
    }
    if args.no_progress {
        config.output.progress = false;
    }

    let testcase = TestCase::from_file(&args.testcase)
        .with_context(|| format!("Failed to load test case {}", args.testcase.display()))?;

    let mut pool = testcase.build_pool();
    pool.save_state();
    testcase
        .apply_transaction(&mut pool)
        .context("Failed to apply test case transaction")?;

    for id in unexpected_solver_transacts(&pool) {
        println!(
            "{} {} transacts on behalf of the solver",
            style("Warning:").yellow().bold(),
            name_of(&pool, id)
        );
    }

    let set = TransactionSet::build(&pool, config.order.policy);
    println!("{} {}", style("Transaction:").green().bold(), set.summary());

    let expected = testcase
        .expected_members(&pool)
        .context("Failed to resolve expected members")?;
    for id in set.missing_members(&expected) {
        println!(
            "{} {} is missing from the transaction",
            style("Warning:").yellow().bold(),
            name_of(&pool, id)
        );
    }

    pool.restore_state();

    // --interest beats the test case, which beats the configuration
    let interest: HashSet<String> = if !args.interest.is_empty() {
        args.interest.iter().cloned().collect()
    } else if !testcase.interest.is_empty() {
        testcase.interest_set()
    } else {
        config.validate.interest.iter().cloned().collect()
    };
    log::debug!("Validating {} element(s), interest {:?}", set.len(), interest);

    let mut progress = ProgressManager::new(config.output.progress);
    let report = validate(
        &mut pool,
        &set,
        &interest,
        config.validation_options(),
        Some(&mut progress),
    )
    .context("Validation failed")?;
    progress.finish();

    for finding in report.findings() {
        println!("{}", describe_finding(&pool, finding));
    }

    if report.is_clean() {
        println!("{} {}", style("Success:").green().bold(), report);
        Ok(0)
    } else {
        println!("{} {}", style("Failed:").red().bold(), report);
        Ok(1)
    }
}
