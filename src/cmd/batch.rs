/*!
`batch.rs`

Implements `iris batch <FILE>`: one invocation per line, run in order.

  # comments and blank lines are skipped
  leads.search "Tha Juan"
  leads.notes.create 412 content="Called, left voicemail"
  workflows.execute 9 inputs='{"lead": 412}'

Lines are split with shell quoting rules. The first failure stops the run
unless `--keep-going` is set; the exit code is that of the first failure.
*/

use anyhow::{Context, Result, anyhow};
use clap::Args;
use serde_json::{Value, json};
use std::path::PathBuf;

use crate::cmd::format::{Role, StyleOptions, TableOpts, box_header, color, emoji, table};
use crate::cmd::shared::{GlobalOpts, Reported, Session, exit_code_for, print_json, report_failure};
use crate::dispatch::output::cell_text;
use crate::dispatch::{Dispatched, Dispatcher};

#[derive(Args, Debug)]
pub struct BatchArgs {
    /// Script file, one `endpoint [arg ...]` per line (`-` for stdin)
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Continue after a failed line
    #[arg(long)]
    pub keep_going: bool,

    /// Output JSON
    #[arg(long)]
    pub json: bool,
}

/// One parsed script line.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptLine {
    pub line: usize,
    pub endpoint: String,
    pub args: Vec<String>,
}

#[derive(Debug)]
pub struct Step {
    pub line: usize,
    pub endpoint: String,
    pub outcome: Result<Dispatched>,
}

pub fn execute_batch(args: BatchArgs, global: &GlobalOpts) -> Result<()> {
    let prepared = read_script(&args.file)
        .and_then(|text| parse_script(&text))
        .and_then(|lines| Session::open(global).map(|s| (lines, s)));
    let (lines, session) = match prepared {
        Ok(p) => p,
        Err(err) => return Err(report_failure("Batch Failed", err, args.json, global.verbose)),
    };

    let steps = run_script(&session.dispatcher, &lines, args.keep_going);
    let failed: Vec<&Step> = steps.iter().filter(|s| s.outcome.is_err()).collect();

    if args.json {
        print_json(&json!({
            "status": if failed.is_empty() { "ok" } else { "error" },
            "count": lines.len(),
            "executed": steps.len(),
            "failed": failed.len(),
            "results": steps.iter().map(step_json).collect::<Vec<_>>(),
        }));
    } else {
        render_table(&steps, lines.len(), failed.len(), global.quiet);
    }

    match failed.first() {
        None => Ok(()),
        Some(first) => {
            let Err(err) = &first.outcome else {
                return Ok(());
            };
            Err(Reported {
                message: format!(
                    "{} of {} lines failed; first at line {}: {err:#}",
                    failed.len(),
                    steps.len(),
                    first.line
                ),
                code: exit_code_for(err),
            }
            .into())
        }
    }
}

fn read_script(path: &std::path::Path) -> Result<String> {
    if path.as_os_str() == "-" {
        return std::io::read_to_string(std::io::stdin()).context("failed to read script from stdin");
    }
    std::fs::read_to_string(path).with_context(|| format!("failed to read script: {}", path.display()))
}

/// Split a script into invocations (1-based line numbers).
pub fn parse_script(text: &str) -> Result<Vec<ScriptLine>> {
    let mut out = Vec::new();
    for (idx, raw) in text.lines().enumerate() {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let mut words = shell_words::split(trimmed)
            .map_err(|e| anyhow!("line {}: {e}", idx + 1))?
            .into_iter();
        let Some(endpoint) = words.next() else {
            continue;
        };
        out.push(ScriptLine {
            line: idx + 1,
            endpoint,
            args: words.collect(),
        });
    }
    Ok(out)
}

/// Dispatch each line in order; stop at the first failure unless `keep_going`.
pub fn run_script(dispatcher: &Dispatcher, lines: &[ScriptLine], keep_going: bool) -> Vec<Step> {
    let mut steps = Vec::with_capacity(lines.len());
    for l in lines {
        let outcome = dispatcher
            .dispatch(&l.endpoint, &l.args)
            .with_context(|| format!("line {}", l.line));
        let failed = outcome.is_err();
        if let Err(e) = &outcome {
            tracing::debug!(line = l.line, "batch step failed: {e:#}");
        }
        steps.push(Step {
            line: l.line,
            endpoint: l.endpoint.clone(),
            outcome,
        });
        if failed && !keep_going {
            break;
        }
    }
    steps
}

fn step_json(step: &Step) -> Value {
    match &step.outcome {
        Ok(done) => json!({
            "line": step.line,
            "endpoint": done.endpoint,
            "status": "ok",
            "arguments": done.arguments,
            "result": done.value,
        }),
        Err(err) => json!({
            "line": step.line,
            "endpoint": step.endpoint,
            "status": "error",
            "error": format!("{err:#}"),
            "exit_code": exit_code_for(err),
        }),
    }
}

fn render_table(steps: &[Step], total: usize, failed: usize, quiet: bool) {
    let style = StyleOptions::detect();
    if !quiet {
        let tag = if failed == 0 { "success" } else { "warn" };
        println!(
            "{}",
            box_header(
                format!("{} batch", emoji(tag, &style)),
                Some(format!("{} of {total} lines run • {failed} failed", steps.len())),
                &style
            )
        );
    }
    let rows: Vec<Vec<String>> = steps
        .iter()
        .map(|s| match &s.outcome {
            Ok(done) => vec![
                s.line.to_string(),
                s.endpoint.clone(),
                color(Role::Success, "ok", &style),
                cell_text(&done.value),
            ],
            Err(err) => vec![
                s.line.to_string(),
                s.endpoint.clone(),
                color(Role::Error, "error", &style),
                err.root_cause().to_string(),
            ],
        })
        .collect();
    println!(
        "{}",
        table(&["LINE", "ENDPOINT", "STATUS", "DETAIL"], &rows, TableOpts::default(), &style)
    );
}
