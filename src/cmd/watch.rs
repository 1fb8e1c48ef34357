/*!
`watch.rs`

Implements `iris watch <endpoint> [arg ...] --until KEY=VALUE`.

Repeats one dispatch every `--interval-ms` until the value at the dotted
`KEY` of the result equals `VALUE` (coerced like any CLI argument), or until
`--timeout-secs` elapses. Attempts run one after another; nothing is issued
concurrently.

  iris watch workflows.status run-42 --until data.state=completed --interval-ms 1000

Exit code 3 on timeout.
*/

use anyhow::{Context, Result, bail};
use clap::Args;
use serde_json::Value;
use std::path::Path;
use std::time::{Duration, Instant};

use crate::cmd::format::{Role, StyleOptions, box_header, color, emoji, render_value};
use crate::cmd::shared::{GlobalOpts, Session, print_json, report_failure};
use crate::dispatch::args::coerce_value;
use crate::dispatch::output::cell_text;
use crate::dispatch::{Dispatched, Dispatcher};

#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Endpoint path: resource[.sub...].method
    #[arg(value_name = "ENDPOINT")]
    pub endpoint: String,

    /// Arguments: positional values or key=value pairs
    #[arg(value_name = "ARG", allow_negative_numbers = true)]
    pub args: Vec<String>,

    /// Stop when the dotted KEY of the result equals VALUE
    #[arg(long, value_name = "KEY=VALUE")]
    pub until: String,

    /// Delay between attempts
    #[arg(long, value_name = "MS", default_value_t = 2000)]
    pub interval_ms: u64,

    /// Give up after this many seconds
    #[arg(long, value_name = "SECS", default_value_t = 60)]
    pub timeout_secs: u64,

    /// Output JSON
    #[arg(long)]
    pub json: bool,
}

/// `KEY=VALUE` stop condition.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub key: String,
    pub expected: Value,
}

impl Condition {
    pub fn parse(raw: &str, cwd: &Path) -> Result<Self> {
        let Some((key, value)) = raw.split_once('=') else {
            bail!("invalid --until '{raw}' (expected KEY=VALUE)");
        };
        let key = key.trim();
        if key.is_empty() {
            bail!("invalid --until '{raw}' (empty key)");
        }
        Ok(Condition {
            key: key.to_string(),
            expected: coerce_value(value, cwd),
        })
    }

    /// Follow the dotted key through objects (and arrays by index).
    pub fn lookup<'a>(&self, value: &'a Value) -> Option<&'a Value> {
        self.key.split('.').try_fold(value, |current, segment| match current {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        })
    }

    /// Exact match, or the same text (`"3"` matches `3`).
    pub fn is_met(&self, value: &Value) -> bool {
        match self.lookup(value) {
            Some(found) => found == &self.expected || cell_text(found) == cell_text(&self.expected),
            None => false,
        }
    }
}

/// The stop condition was never met.
#[derive(Debug, thiserror::Error)]
#[error(
    "{endpoint}: '{key}' did not become {expected} within {timeout_secs}s ({attempts} attempts, last seen: {last})"
)]
pub struct WatchTimeout {
    pub endpoint: String,
    pub key: String,
    pub expected: Value,
    pub timeout_secs: u64,
    pub attempts: u32,
    pub last: Value,
}

#[derive(Debug)]
pub struct WatchOutcome {
    pub attempts: u32,
    pub elapsed_ms: u128,
    pub last: Dispatched,
}

pub fn execute_watch(args: WatchArgs, global: &GlobalOpts) -> Result<()> {
    let started = Instant::now();
    let style = StyleOptions::detect();
    let show_progress = !args.json && !global.quiet;

    let outcome = Session::open(global).and_then(|session| {
        let condition = Condition::parse(&args.until, &session.dispatcher.options().cwd)?;
        let rt = tokio::runtime::Runtime::new().context("Failed to create Tokio runtime")?;
        rt.block_on(poll_until(
            &session.dispatcher,
            &args.endpoint,
            &args.args,
            &condition,
            Duration::from_millis(args.interval_ms),
            Duration::from_secs(args.timeout_secs),
            |attempt, done| {
                if show_progress {
                    let seen = condition.lookup(&done.value).map(cell_text).unwrap_or_default();
                    println!(
                        "{} {}",
                        emoji("clock", &style),
                        color(
                            Role::Dim,
                            format!("attempt {attempt}: {}={seen}", condition.key),
                            &style
                        )
                    );
                }
            },
        ))
    });

    let outcome = match outcome {
        Ok(o) => o,
        Err(err) => return Err(report_failure("Watch Failed", err, args.json, global.verbose)),
    };

    if args.json {
        print_json(&serde_json::json!({
            "status": "ok",
            "endpoint": outcome.last.endpoint,
            "attempts": outcome.attempts,
            "elapsed_ms": outcome.elapsed_ms,
            "arguments": outcome.last.arguments,
            "result": outcome.last.value,
        }));
        return Ok(());
    }

    if !global.quiet {
        println!(
            "{}",
            box_header(
                format!("{} {} settled", emoji("success", &style), outcome.last.endpoint),
                Some(format!(
                    "{} attempts • {} ms",
                    outcome.attempts,
                    started.elapsed().as_millis()
                )),
                &style
            )
        );
    }
    println!("{}", render_value(&outcome.last.value, &style));
    Ok(())
}

/// Dispatch until `condition` holds, sleeping `interval` between attempts.
/// A dispatch failure ends the watch immediately.
pub async fn poll_until<F>(
    dispatcher: &Dispatcher,
    endpoint: &str,
    tokens: &[String],
    condition: &Condition,
    interval: Duration,
    timeout: Duration,
    mut on_attempt: F,
) -> Result<WatchOutcome>
where
    F: FnMut(u32, &Dispatched),
{
    let started = Instant::now();
    let mut attempts = 0u32;
    let mut last = Value::Null;

    let polling = async {
        loop {
            attempts += 1;
            let done = dispatcher.dispatch(endpoint, tokens)?;
            on_attempt(attempts, &done);
            if condition.is_met(&done.value) {
                return Ok::<_, anyhow::Error>(done);
            }
            tracing::debug!(endpoint, attempts, "condition not met yet");
            last = done.value;
            tokio::time::sleep(interval).await;
        }
    };
    let result = tokio::time::timeout(timeout, polling).await;

    match result {
        Ok(done) => Ok(WatchOutcome {
            attempts,
            elapsed_ms: started.elapsed().as_millis(),
            last: done?,
        }),
        Err(_) => Err(WatchTimeout {
            endpoint: endpoint.to_string(),
            key: condition.key.clone(),
            expected: condition.expected.clone(),
            timeout_secs: timeout.as_secs(),
            attempts,
            last,
        }
        .into()),
    }
}
