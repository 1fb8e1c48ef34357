/*!
shared.rs - helpers shared by every subcommand.

Focus:
  - GlobalOpts: flags accepted before or after any subcommand
  - Session: config + credentials + catalog + policy wired into a Dispatcher
  - load_param_file: JSON / YAML object merged under CLI arguments
  - report_failure / exit_code_for: print an error once, pick the exit code
  - print_json
*/

use anyhow::{Context, Result, anyhow};
use clap::Args;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::cmd::format::{Role, StyleOptions, box_header, color, emoji};
use crate::config::{Config, CredentialFlags, Credentials, ENV_CONFIG};
use crate::dispatch::{DispatchError, DispatchOptions, Dispatcher, Policy, Strictness};
use crate::registry::{Catalog, CatalogRegistry, DryRunTransport};

/* ---- Global Flags ---- */

#[derive(Args, Debug, Clone, Default)]
pub struct GlobalOpts {
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Silence all non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// API key (overrides IRIS_API_KEY and the config file)
    #[arg(long, global = true, value_name = "KEY")]
    pub api_key: Option<String>,

    /// Current user id (overrides IRIS_USER_ID and the config file)
    #[arg(long, global = true, value_name = "ID")]
    pub user_id: Option<i64>,

    /// API base URL (overrides IRIS_BASE_URL and the config file)
    #[arg(long, global = true, value_name = "URL")]
    pub base_url: Option<String>,

    /// Config file (default ~/.iris/config.yaml, or IRIS_CONFIG)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Replace the built-in API catalog
    #[arg(long, global = true, value_name = "PATH")]
    pub catalog: Option<PathBuf>,

    /// Fail when a sub-resource accessor is missing required arguments
    #[arg(long, global = true)]
    pub strict: bool,
}

impl GlobalOpts {
    fn config_path(&self) -> Option<PathBuf> {
        self.config.clone().or_else(|| {
            std::env::var(ENV_CONFIG)
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from)
        })
    }

    fn credential_flags(&self) -> CredentialFlags {
        CredentialFlags {
            api_key: self.api_key.clone(),
            user_id: self.user_id,
            base_url: self.base_url.clone(),
        }
    }
}

/* ---- Session ---- */

/// Everything a command needs to resolve and call endpoints.
pub struct Session {
    pub catalog: Catalog,
    pub dispatcher: Dispatcher,
}

impl Session {
    pub fn open(global: &GlobalOpts) -> Result<Self> {
        let config = Config::load(global.config_path().as_deref())?;
        let credentials = Credentials::resolve(&global.credential_flags(), &config)?;

        let catalog = match global.catalog.as_ref().or(config.catalog.as_ref()) {
            Some(path) => Catalog::load(path)?,
            None => Catalog::builtin()?,
        };
        let policy = Policy::builtin()?.merged(config.policy.clone());

        let strictness = if global.strict || config.strict_accessors {
            Strictness::Strict
        } else {
            Strictness::Lenient
        };
        let cwd = std::env::current_dir().context("cannot determine working directory")?;

        tracing::debug!(
            base_url = %credentials.base_url,
            user_id = ?credentials.current_user_id(),
            ?strictness,
            "session ready"
        );

        let transport = Rc::new(DryRunTransport::new(
            credentials.base_url.clone(),
            credentials.current_api_key().map(str::to_string),
        ));
        let registry = CatalogRegistry::new(catalog.clone(), transport);
        let dispatcher = Dispatcher::new(
            Box::new(registry),
            policy,
            DispatchOptions {
                current_user_id: credentials.current_user_id(),
                strictness,
                cwd,
            },
        );

        Ok(Session {
            catalog,
            dispatcher,
        })
    }
}

/* ---- Parameter File ---- */

/// Read a JSON or YAML object of named arguments (`.yaml`/`.yml` by extension).
pub fn load_param_file(path: &Path) -> Result<Map<String, Value>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read param file: {}", path.display()))?;
    let is_yaml = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"));

    let value: Value = if is_yaml {
        serde_yaml::from_str(&raw).context("failed to parse YAML param file")?
    } else {
        serde_json::from_str(&raw).context("failed to parse JSON param file")?
    };

    match value {
        Value::Object(map) => Ok(map),
        _ => Err(anyhow!("param file root must be an object")),
    }
}

/* ---- Errors / Exit Codes ---- */

pub const EXIT_FAILURE: i32 = 1;
pub const EXIT_USAGE: i32 = 2;
pub const EXIT_TIMEOUT: i32 = 3;

/// An error that has already been shown to the user.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct Reported {
    pub message: String,
    pub code: i32,
}

/// Exit code for an error that escaped a command.
pub fn exit_code_for(err: &anyhow::Error) -> i32 {
    if let Some(reported) = err.downcast_ref::<Reported>() {
        return reported.code;
    }
    for cause in err.chain() {
        if cause.is::<crate::cmd::watch::WatchTimeout>() {
            return EXIT_TIMEOUT;
        }
        if let Some(dispatch) = cause.downcast_ref::<DispatchError>() {
            return if dispatch.is_usage() {
                EXIT_USAGE
            } else {
                EXIT_FAILURE
            };
        }
    }
    EXIT_FAILURE
}

/// Print `err` once (JSON envelope or boxed) and return it wrapped as
/// `Reported` so `main` only sets the exit code.
pub fn report_failure(title: &str, err: anyhow::Error, json: bool, verbose: u8) -> anyhow::Error {
    let code = exit_code_for(&err);
    let message = format!("{err:#}");

    if json {
        let mut envelope = serde_json::json!({
            "status": "error",
            "error": message,
            "exit_code": code,
        });
        if verbose > 0 {
            envelope["causes"] = err.chain().skip(1).map(|c| Value::String(c.to_string())).collect();
        }
        print_json(&envelope);
    } else {
        let style = StyleOptions::detect();
        let title = format!("{} {title}", emoji("error", &style));
        eprintln!("{}", box_header(title, Some(color(Role::Error, &message, &style)), &style));
        if verbose > 0 {
            eprintln!("{}", color(Role::Dim, format!("{err:?}"), &style));
        }
    }

    Reported { message, code }.into()
}

pub fn print_json(value: &Value) {
    println!(
        "{}",
        serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
    );
}
