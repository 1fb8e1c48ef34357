/*!
`call.rs`

Implements `iris call <endpoint> [arg ...]`.

Arguments follow the endpoint as loose tokens:
  - `key=value`  named (split on the first `=`)
  - anything else positional, in order
Values are coerced (bool / null / numbers / JSON / `@file`) before binding.
`--param-file` supplies named defaults; CLI tokens win.

JSON Success Output:
{
  "status": "ok",
  "endpoint": "leads.search",
  "elapsed_ms": 3,
  "arguments": [ {"search": "Tha Juan"} ],
  "user_scoped": false,
  "result": { ... }
}

Errors go through `shared::report_failure` (exit 2 for resolution / binding
problems, 1 when the target call itself failed).
*/

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;
use std::time::Instant;

use crate::cmd::format::{Role, StyleOptions, box_header, color, emoji, render_value};
use crate::cmd::shared::{GlobalOpts, Session, load_param_file, print_json, report_failure};
use crate::dispatch::{Dispatched, Dispatcher, RawArguments};

#[derive(Args, Debug)]
pub struct CallArgs {
    /// Endpoint path: resource[.sub...].method (e.g. leads.notes.create)
    #[arg(value_name = "ENDPOINT")]
    pub endpoint: String,

    /// Arguments: positional values or key=value pairs
    #[arg(value_name = "ARG", allow_negative_numbers = true)]
    pub args: Vec<String>,

    /// Load named arguments from a JSON or YAML object
    #[arg(long = "param-file", value_name = "PATH")]
    pub param_file: Option<PathBuf>,

    /// Output JSON
    #[arg(long)]
    pub json: bool,

    /// Print the returned value unformatted
    #[arg(long)]
    pub raw: bool,
}

pub fn execute_call(args: CallArgs, global: &GlobalOpts) -> Result<()> {
    let started = Instant::now();
    let outcome = Session::open(global).and_then(|session| {
        call_once(
            &session.dispatcher,
            &args.endpoint,
            &args.args,
            args.param_file.as_deref(),
        )
    });

    match outcome {
        Ok(done) => {
            render_success(&done, started.elapsed().as_millis(), &args, global.quiet);
            Ok(())
        }
        Err(err) => Err(report_failure("Call Failed", err, args.json, global.verbose)),
    }
}

/// Parse tokens, merge the param file underneath, dispatch.
pub fn call_once(
    dispatcher: &Dispatcher,
    endpoint: &str,
    tokens: &[String],
    param_file: Option<&std::path::Path>,
) -> Result<Dispatched> {
    let mut raw = RawArguments::parse_in(tokens, &dispatcher.options().cwd);
    if let Some(path) = param_file {
        raw.merge_named_defaults(load_param_file(path)?);
    }
    Ok(dispatcher.dispatch_args(endpoint, raw)?)
}

fn render_success(done: &Dispatched, elapsed_ms: u128, args: &CallArgs, quiet: bool) {
    if args.json {
        print_json(&serde_json::json!({
            "status": "ok",
            "endpoint": done.endpoint,
            "elapsed_ms": elapsed_ms,
            "arguments": done.arguments,
            "user_scoped": done.user_scoped,
            "result": done.value,
        }));
        return;
    }

    if args.raw {
        println!("{:#?}", done.value);
        return;
    }

    let style = StyleOptions::detect();
    if !quiet {
        let header = box_header(
            format!("{} {}", emoji("call", &style), done.endpoint),
            Some(format!("{} args • {elapsed_ms} ms", done.arguments.len())),
            &style,
        );
        println!("{header}");
        if !done.dropped.is_empty() {
            println!(
                "{} {}",
                emoji("warn", &style),
                color(
                    Role::Warning,
                    format!("ignored: {}", done.dropped.join(", ")),
                    &style
                )
            );
        }
    }
    println!("{}", render_value(&done.value, &style));
}
