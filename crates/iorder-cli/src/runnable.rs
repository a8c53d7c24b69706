//! Runnable command - query the analyzer against an unmodified test case pool.

use anyhow::{Context, Result};
use clap::Args;
use console::style;
use std::path::PathBuf;

use iorder_pm::{Analyzer, TestCase};

use crate::output::{describe_diagnostic, name_of};

#[derive(Args, Debug)]
pub struct RunnableArgs {
    /// Test case file (JSON)
    pub testcase: PathBuf,

    /// Idents to query, e.g. `bash` or `pattern:x11`
    #[arg(required = true)]
    pub idents: Vec<String>,
}

fn verdict(value: bool) -> console::StyledObject<&'static str> {
    if value {
        style("yes").green()
    } else {
        style("no").red()
    }
}

pub fn execute(args: RunnableArgs) -> Result<i32> {
    let testcase = TestCase::from_file(&args.testcase)
        .with_context(|| format!("Failed to load test case {}", args.testcase.display()))?;
    let pool = testcase.build_pool();

    let mut analyzer = Analyzer::new();
    let mut exit_code = 0;

    for ident in &args.idents {
        let ids = pool.by_ident(ident);
        if ids.is_empty() {
            eprintln!("{} No resolvable named {}", style("Warning:").yellow().bold(), ident);
            exit_code = 1;
            continue;
        }

        for &id in ids {
            let runnable = analyzer.is_runnable(&pool, id)?;
            let installable = analyzer.is_installable(&pool, id)?;
            println!(
                "{}  runnable: {}  installable: {}",
                style(name_of(&pool, id)).white().bold(),
                verdict(runnable),
                verdict(installable)
            );
            for diagnostic in analyzer.take_diagnostics() {
                println!("{}", describe_diagnostic(&pool, &diagnostic));
            }
        }
    }

    Ok(exit_code)
}
