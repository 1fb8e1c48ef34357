use clap::{Parser, Subcommand};

mod cmd;
mod config;
mod dispatch;
mod registry;
mod utils;

use cmd::{BatchArgs, CallArgs, DescribeArgs, GlobalOpts, ListArgs, WatchArgs};

/// iris - call any IRIS API endpoint by its dotted path.
///
/// Command layout:
///   iris call     <endpoint> [arg ...] [--json] [--raw] [--param-file PATH]
///   iris list     <resources|endpoints|aliases|globals> [--json]
///   iris describe <endpoint> [--json]
///   iris watch    <endpoint> [arg ...] --until KEY=VALUE [--interval-ms N] [--timeout-secs N]
///   iris batch    <FILE> [--keep-going] [--json]
///
/// Arguments:
///   key=value      named argument (split on the first '=')
///   value          positional argument, in order
///   Values: true/false/null, numbers, JSON objects/arrays, @file (contents), else text.
///
/// Credentials (flag > env > ~/.iris/config.yaml):
///   --api-key / IRIS_API_KEY, --user-id / IRIS_USER_ID, --base-url / IRIS_BASE_URL
///
/// Examples:
///   iris call leads.search "Tha Juan"
///   iris call leads.notes.create 412 content="Called, left voicemail"
///   iris call agents.chat 12 prompt="Summarise lead 412" --json
///   iris watch workflows.status run-42 --until data.state=completed
///
/// Exit codes: 0 ok, 1 call failed, 2 bad endpoint or arguments, 3 watch timed out.
#[derive(Parser, Debug)]
#[command(
    name = "iris",
    version,
    author,
    about = "iris - dynamic command-line caller for the IRIS platform API",
    propagate_version = true,
    disable_help_subcommand = true
)]
pub struct Cli {
    #[command(flatten)]
    global: GlobalOpts,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Call an endpoint
    Call(CallArgs),

    /// List resources, endpoints, aliases or global endpoints
    List(ListArgs),

    /// Show an endpoint's parameters without calling it
    Describe(DescribeArgs),

    /// Call an endpoint repeatedly until a result field has a value
    Watch(WatchArgs),

    /// Run a script of invocations, one per line
    Batch(BatchArgs),
}

fn main() {
    let cli = Cli::parse();

    let level = utils::derive_level(cli.global.verbose, cli.global.quiet);
    utils::init_logging(level);

    let global = cli.global;
    let result = match cli.command {
        Commands::Call(args) => cmd::execute_call(args, &global),
        Commands::List(args) => cmd::execute_list(args, &global),
        Commands::Describe(args) => cmd::execute_describe(args, &global),
        Commands::Watch(args) => cmd::execute_watch(args, &global),
        Commands::Batch(args) => cmd::execute_batch(args, &global),
    };

    if let Err(err) = result {
        let code = cmd::shared::exit_code_for(&err);
        if err.downcast_ref::<cmd::shared::Reported>().is_none() {
            eprintln!("error: {err:#}");
        }
        tracing::debug!(code, "exiting with failure");
        std::process::exit(code);
    }
}
