//! Minimal CLI: schema document → (check paths | report every field)
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use serde::Serialize;

use crate::evaluate::{Evaluation, Evaluator, Policy};
use crate::schema::SchemaDocument;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// report which fields of a schema document are required
#[derive(Parser, Debug)]
pub struct CommandLineInterface {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// evaluate one or more field paths against a single schema
    Check(CheckOut),
    /// list every reachable field path with its requiredness
    Report(ReportOut),
}

#[derive(Args, Debug, Clone)]
struct EvalSettings {
    /// how the last path segment is judged
    #[arg(long, value_enum, default_value_t = Policy::Constrained)]
    policy: Policy,

    /// print JSON instead of text
    #[arg(long, default_value_t = false)]
    json: bool,
}

#[derive(clap::Parser, Debug)]
struct CheckOut {
    #[command(flatten)]
    eval_settings: EvalSettings,

    /// schema document (.json)
    #[arg(long, short)]
    schema: PathBuf,

    /// dotted field path, e.g. `items.*.name`
    #[arg(long, short, num_args = 1.., required = true)]
    path: Vec<String>,
}

#[derive(clap::Parser, Debug)]
struct ReportOut {
    #[command(flatten)]
    eval_settings: EvalSettings,

    /// One or more schema documents. May be literal paths or quoted glob patterns
    #[arg(long, short, num_args = 1.., required = true)]
    schema: Vec<String>,

    /// longest path (in segments) to enumerate
    #[arg(long, default_value_t = 4)]
    max_depth: usize,
}

#[derive(Debug, Serialize)]
struct PathLine<'a> {
    path: &'a str,
    #[serde(flatten)]
    evaluation: Evaluation,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    pub fn run(&self) -> Result<()> {
        match &self.cmd {
            Command::Check(target) => {
                let compiled = load_document(&target.schema)?;
                let evaluator = Evaluator::with_policy(target.eval_settings.policy);
                let lines = target
                    .path
                    .iter()
                    .map(|path| PathLine { path, evaluation: evaluator.evaluate(compiled.root(), path.as_str()) })
                    .collect::<Vec<_>>();
                if target.eval_settings.json {
                    println!("{}", serde_json::to_string_pretty(&lines)?);
                } else {
                    for line in &lines {
                        println!("{}\t{}", verdict(line.evaluation), line.path);
                    }
                }
            }
            Command::Report(target) => {
                let evaluator = Evaluator::with_policy(target.eval_settings.policy);
                let sources = resolve_file_path_patterns(&target.schema)?;
                let mut documents = Vec::with_capacity(sources.len());
                for source in &sources {
                    let compiled = load_document(source)?;
                    let rows = crate::report::report(compiled.root(), target.max_depth, &evaluator);
                    tracing::info!(schema = %source.display(), fields = rows.len(), "reported");
                    documents.push((source.display().to_string(), rows));
                }
                if target.eval_settings.json {
                    let out = documents
                        .iter()
                        .map(|(source, rows)| serde_json::json!({ "schema": source, "fields": rows }))
                        .collect::<Vec<_>>();
                    println!("{}", serde_json::to_string_pretty(&out)?);
                } else {
                    for (source, rows) in &documents {
                        println!("{}", source.bold());
                        for row in rows {
                            match &row.description {
                                Some(text) => println!("  {}\t{}\t{}", verdict(row.evaluation), row.path, text.dimmed()),
                                None => println!("  {}\t{}", verdict(row.evaluation), row.path),
                            }
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

// ————————————————————————————————————————————————————————————————————————————
// HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn load_document(path: &std::path::Path) -> Result<crate::schema::doc::CompiledSchema> {
    let document = SchemaDocument::from_path(path)?;
    document
        .compile()
        .with_context(|| format!("failed to compile schema document {}", path.display()))
}

fn verdict(evaluation: Evaluation) -> colored::ColoredString {
    match evaluation {
        Evaluation { matched: false, .. } => "unmatched".dimmed(),
        Evaluation { required: true, .. } => "required".green(),
        Evaluation { required: false, .. } => "optional".yellow(),
    }
}

/// Expand quoted glob patterns; literal paths pass through unchecked.
pub fn resolve_file_path_patterns<I>(patterns: I) -> Result<Vec<PathBuf>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        // Minimal glob detection for the `glob` crate syntax.
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'[' | b'{' ))
    }

    let mut out = Vec::<PathBuf>::new();

    for raw in patterns {
        let pattern = raw.as_ref();

        if has_glob_chars(pattern) {
            let mut matched_any = false;
            for entry in glob::glob(pattern).with_context(|| format!("invalid glob pattern: {pattern}"))? {
                out.push(entry?);
                matched_any = true;
            }
            if !matched_any {
                anyhow::bail!("glob pattern matched no files: {pattern}");
            }
        } else {
            out.push(PathBuf::from(pattern));
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_check_arguments() {
        let cli = CommandLineInterface::try_parse_from([
            "schema-required", "check", "--schema", "s.json", "--path", "a.b", "c", "--policy", "presence",
        ])
        .unwrap();
        match cli.cmd {
            Command::Check(c) => {
                assert_eq!(c.path, vec!["a.b", "c"]);
                assert_eq!(c.eval_settings.policy, Policy::Presence);
                assert!(!c.eval_settings.json);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn report_defaults() {
        let cli = CommandLineInterface::try_parse_from(["schema-required", "report", "-s", "a.json"]).unwrap();
        match cli.cmd {
            Command::Report(r) => {
                assert_eq!(r.max_depth, 4);
                assert_eq!(r.eval_settings.policy, Policy::Constrained);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn literal_paths_pass_through() {
        let out = resolve_file_path_patterns(["fixtures/a.json", "b.json"]).unwrap();
        assert_eq!(out, vec![PathBuf::from("fixtures/a.json"), PathBuf::from("b.json")]);
    }

    #[test]
    fn verdict_labels() {
        assert!(verdict(Evaluation { matched: false, required: false }).to_string().contains("unmatched"));
        assert!(verdict(Evaluation { matched: true, required: true }).to_string().contains("required"));
        assert!(verdict(Evaluation { matched: true, required: false }).to_string().contains("optional"));
    }
}
