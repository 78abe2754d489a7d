#![forbid(unsafe_code)]

//! Command-line argument parsing for the binding demo.
//!
//! Parses args manually to keep the binary lean. `FBIND_DEMO_DATA` sets the
//! data file when `--data` is absent.

use std::env;
use std::process;

const VERSION: &str = env!("CARGO_PKG_VERSION");

pub const ENV_DATA: &str = "FBIND_DEMO_DATA";

const HELP_TEXT: &str = "\
FrankenBind demo: mount a template, then script writes and input

USAGE:
    fbind-demo [OPTIONS]

OPTIONS:
    --data=PATH          JSON object to bind against (default: built-in sample)
    --set=PATH=JSON      Write JSON at a dotted path (repeatable, in order)
    --input=TEXT         Type TEXT into the bound input (repeatable, in order)
    --watch=PATH         Print every notification for PATH (repeatable)
    --help, -h           Show this help message
    --version, -V        Show version

ENVIRONMENT VARIABLES:
    FBIND_DEMO_DATA          Data file when --data is absent
    FBIND_LOG                Log filter (default: warn)
    FBIND_ISOLATE_PANICS     Catch panicking callbacks (default: on)
    FBIND_DEDUP_SUBSCRIBERS  Register each binding once per property
    FBIND_VIEW_DELIMITERS    Interpolation delimiters as open,close
    FBIND_VIEW_MODEL_ATTR    Input attribute naming the bound path";

/// One scripted action, applied in command-line order.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Set {
        path: String,
        value: serde_json::Value,
    },
    Input(String),
}

/// Parsed command-line options.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Opts {
    /// Data file; `None` uses the built-in sample.
    pub data: Option<String>,
    pub steps: Vec<Step>,
    /// Extra paths to watch and report.
    pub watch: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ParseError {
    Help,
    Version,
    InvalidValue { flag: &'static str, value: String },
    UnknownArg(String),
}

impl Opts {
    /// Parse `std::env::args` and the environment, exiting on `--help`,
    /// `--version` or bad usage.
    pub fn parse() -> Self {
        match Self::parse_from_env_and_args(env::args().skip(1), |key| env::var(key).ok()) {
            Ok(opts) => opts,
            Err(ParseError::Help) => {
                println!("{HELP_TEXT}");
                process::exit(0);
            }
            Err(ParseError::Version) => {
                println!("fbind-demo {VERSION}");
                process::exit(0);
            }
            Err(ParseError::InvalidValue { flag, value }) => {
                eprintln!("Invalid {flag} value: {value}");
                process::exit(2);
            }
            Err(ParseError::UnknownArg(arg)) => {
                eprintln!("Unknown argument: {arg}");
                eprintln!("Run with --help for usage information.");
                process::exit(2);
            }
        }
    }

    pub(crate) fn parse_from_env_and_args<I, S, F>(
        args: I,
        get_env: F,
    ) -> Result<Self, ParseError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
        F: Fn(&str) -> Option<String>,
    {
        let mut opts = Self::default();

        if let Some(val) = get_env(ENV_DATA)
            && !val.trim().is_empty()
        {
            opts.data = Some(val);
        }

        for arg in args {
            let arg = arg.as_ref();
            match arg {
                "--help" | "-h" => return Err(ParseError::Help),
                "--version" | "-V" => return Err(ParseError::Version),
                other => {
                    if let Some(val) = other.strip_prefix("--data=") {
                        if val.is_empty() {
                            return Err(ParseError::InvalidValue {
                                flag: "--data",
                                value: val.to_string(),
                            });
                        }
                        opts.data = Some(val.to_string());
                    } else if let Some(val) = other.strip_prefix("--set=") {
                        opts.steps.push(parse_set(val)?);
                    } else if let Some(val) = other.strip_prefix("--input=") {
                        opts.steps.push(Step::Input(val.to_string()));
                    } else if let Some(val) = other.strip_prefix("--watch=") {
                        if val.trim().is_empty() {
                            return Err(ParseError::InvalidValue {
                                flag: "--watch",
                                value: val.to_string(),
                            });
                        }
                        opts.watch.push(val.trim().to_string());
                    } else {
                        return Err(ParseError::UnknownArg(other.to_string()));
                    }
                }
            }
        }

        Ok(opts)
    }
}

/// `PATH=JSON`; a value that is not valid JSON is taken as a plain string.
fn parse_set(val: &str) -> Result<Step, ParseError> {
    let invalid = || ParseError::InvalidValue {
        flag: "--set",
        value: val.to_string(),
    };
    let (path, raw) = val.split_once('=').ok_or_else(invalid)?;
    let path = path.trim();
    if path.is_empty() {
        return Err(invalid());
    }
    let value = serde_json::from_str(raw)
        .unwrap_or_else(|_| serde_json::Value::String(raw.to_string()));
    Ok(Step::Set {
        path: path.to_string(),
        value,
    })
}
