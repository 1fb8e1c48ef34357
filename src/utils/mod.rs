//! Utilities: logging setup (verbosity -> tracing filter) and parameter-name
//! transliteration shared by the walker, binder and catalog.
//!
//! Key items:
//!   init_logging / derive_level
//!   naming::{to_snake_case, to_camel_case}

/// Logging helpers.
pub mod logging {
    use tracing_subscriber::EnvFilter;

    /// Environment variable that overrides the derived filter (`IRIS_LOG=debug`).
    pub const LOG_ENV: &str = "IRIS_LOG";

    #[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd)]
    pub enum LogLevel {
        Error = 0,
        Info = 1,
        Debug = 2,
        Trace = 3,
    }

    impl LogLevel {
        pub fn as_str(&self) -> &'static str {
            match self {
                LogLevel::Error => "error",
                LogLevel::Info => "info",
                LogLevel::Debug => "debug",
                LogLevel::Trace => "trace",
            }
        }
    }

    pub fn derive_level(verbose: u8, quiet: bool) -> LogLevel {
        if quiet {
            return LogLevel::Error;
        }
        match verbose {
            0 => LogLevel::Info,
            1 => LogLevel::Debug,
            _ => LogLevel::Trace,
        }
    }

    /// Install the global subscriber. Logs go to stderr so stdout stays
    /// clean for `--json` output. A second call is a no-op.
    pub fn init_logging(level: LogLevel) {
        let filter = EnvFilter::try_from_env(LOG_ENV)
            .unwrap_or_else(|_| EnvFilter::new(format!("iris={0},iris_call={0}", level.as_str())));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
    }
}

pub use logging::{derive_level, init_logging};

/// camelCase <-> snake_case for parameter names (`leadId` <-> `lead_id`).
pub mod naming {
    pub fn to_snake_case(name: &str) -> String {
        let mut out = String::with_capacity(name.len() + 4);
        let mut prev_lower = false;
        for ch in name.chars() {
            if ch.is_ascii_uppercase() {
                if prev_lower {
                    out.push('_');
                }
                out.push(ch.to_ascii_lowercase());
                prev_lower = false;
            } else {
                out.push(ch);
                prev_lower = ch.is_ascii_lowercase() || ch.is_ascii_digit();
            }
        }
        out
    }

    pub fn to_camel_case(name: &str) -> String {
        let mut out = String::with_capacity(name.len());
        let mut upper_next = false;
        for ch in name.chars() {
            if ch == '_' {
                upper_next = !out.is_empty();
                continue;
            }
            if upper_next {
                out.push(ch.to_ascii_uppercase());
                upper_next = false;
            } else {
                out.push(ch);
            }
        }
        out
    }
}
