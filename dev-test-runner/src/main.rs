//! Runs JSON fixture files against the evaluator and reports every mismatch.
//!
//! ```text
//! cargo run -p dev-test-runner -- 'fixtures/*.json'
//! ```
use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;

use schema_required::cli::resolve_file_path_patterns;
use schema_required::fixture::Fixture;

/// run requiredness fixtures
#[derive(Parser, Debug)]
struct Args {
    /// fixture files or quoted glob patterns
    #[arg(num_args = 1.., required = true)]
    fixtures: Vec<String>,

    /// only print failures
    #[arg(long, short, default_value_t = false)]
    quiet: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let mut failures = 0usize;
    let mut total = 0usize;

    for file in resolve_file_path_patterns(&args.fixtures)? {
        let fixture = Fixture::from_path(&file).with_context(|| format!("invalid fixture {}", file.display()))?;
        let outcomes = fixture
            .run()
            .with_context(|| format!("invalid schema in {}", file.display()))?;

        let title = fixture.name.clone().unwrap_or_else(|| file.display().to_string());
        eprintln!("—— {} ——", title.bold());
        for outcome in &outcomes {
            total += 1;
            let case = outcome.case;
            if !outcome.passed() {
                failures += 1;
                eprintln!(
                    "❌ {:?} ({:?}): expected required={} matched={:?}, got {:?}",
                    case.path, case.policy, case.required, case.matched, outcome.got
                );
            } else if !args.quiet {
                eprintln!("✅ {:?}", case.path);
            }
        }
    }

    eprintln!("{} / {} cases passed", total - failures, total);
    if failures > 0 {
        anyhow::bail!("{failures} fixture case(s) failed");
    }
    Ok(())
}
