#![forbid(unsafe_code)]

//! FrankenBind demo binary: mounts a small page against JSON data, then
//! replays scripted writes and input edits, printing the render after each.

mod cli;

use std::cell::RefCell;
use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::process;
use std::rc::Rc;

use fbind_core::{Binding, LookupError, NotifyReport, create_binding};
use fbind_view::{NodeRef, ViewError, ViewModel, element, text};
use serde_json::json;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt as log_fmt};

use crate::cli::{Opts, Step};

/// Log filter variable; falls back to `warn`.
const ENV_LOG: &str = "FBIND_LOG";

#[derive(Debug)]
enum DemoError {
    Io { path: String, source: io::Error },
    Json { path: String, source: serde_json::Error },
    View(ViewError),
    Write { path: String, source: LookupError },
    Watch { path: String, source: LookupError },
    NoInput,
    Output(io::Error),
}

impl DemoError {
    /// Usage mistakes exit with 2, everything else with 1.
    fn exit_code(&self) -> i32 {
        match self {
            Self::NoInput => 2,
            _ => 1,
        }
    }
}

impl fmt::Display for DemoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "cannot read {path}: {source}"),
            Self::Json { path, source } => write!(f, "invalid JSON in {path}: {source}"),
            Self::View(err) => fmt::Display::fmt(err, f),
            Self::Write { path, source } => write!(f, "--set {path}: {source}"),
            Self::Watch { path, source } => write!(f, "--watch {path}: {source}"),
            Self::NoInput => write!(f, "--input given but the template has no bound input"),
            Self::Output(err) => write!(f, "cannot write output: {err}"),
        }
    }
}

impl std::error::Error for DemoError {}

impl From<ViewError> for DemoError {
    fn from(err: ViewError) -> Self {
        Self::View(err)
    }
}

impl From<io::Error> for DemoError {
    fn from(err: io::Error) -> Self {
        Self::Output(err)
    }
}

fn main() {
    init_tracing();
    let opts = Opts::parse();
    let stdout = io::stdout();
    if let Err(err) = run(&opts, &mut stdout.lock()) {
        eprintln!("fbind-demo: {err}");
        process::exit(err.exit_code());
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(ENV_LOG).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::registry()
        .with(log_fmt::layer().with_writer(io::stderr))
        .with(filter)
        .try_init();
}

fn sample_data() -> serde_json::Value {
    json!({
        "title": "Profile",
        "user": {"name": "Ann", "age": 30}
    })
}

fn sample_page() -> NodeRef {
    element("div")
        .child(element("h1").child(text("{{ title }}")))
        .child(element("p").child(text("Hello, {{ user.name }}!")))
        .child(element("input").attr("model", "user.name"))
}

fn load_data(path: Option<&str>) -> Result<serde_json::Value, DemoError> {
    let Some(path) = path else {
        return Ok(sample_data());
    };
    let raw = fs::read_to_string(path).map_err(|source| DemoError::Io {
        path: path.to_string(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| DemoError::Json {
        path: path.to_string(),
        source,
    })
}

fn run<W: Write>(opts: &Opts, out: &mut W) -> Result<(), DemoError> {
    let data = load_data(opts.data.as_deref())?;
    tracing::debug!(
        data = opts.data.as_deref().unwrap_or("<sample>"),
        steps = opts.steps.len(),
        watches = opts.watch.len(),
        "demo.start"
    );
    let mut vm = ViewModel::new(data)?;
    let page = sample_page();
    vm.mount(&page).map_err(ViewError::from)?;
    let input = vm.inputs().into_iter().next();

    let events = Rc::new(RefCell::new(Vec::new()));
    let _watches = watch_all(&vm, &opts.watch, &events)?;

    writeln!(out, "initial: {}", page.render_html())?;
    for step in &opts.steps {
        let (label, report) = match step {
            Step::Set { path, value } => {
                let report = vm
                    .write(path, value.clone())
                    .map_err(|source| DemoError::Write {
                        path: path.clone(),
                        source,
                    })?;
                (format!("set {path}={value}"), report)
            }
            Step::Input(typed) => {
                let node = input.as_ref().ok_or(DemoError::NoInput)?;
                (format!("input {typed:?}"), vm.input(node, typed)?)
            }
        };
        for line in events.borrow_mut().drain(..) {
            writeln!(out, "  {line}")?;
        }
        writeln!(out, "{label}: {}", page.render_html())?;
        report_failures(out, &report)?;
    }
    Ok(())
}

fn watch_all(
    vm: &ViewModel,
    paths: &[String],
    events: &Rc<RefCell<Vec<String>>>,
) -> Result<Vec<Binding>, DemoError> {
    paths
        .iter()
        .map(|path| {
            let sink = Rc::clone(events);
            let label = path.clone();
            create_binding(vm.data(), path, move |value| {
                sink.borrow_mut().push(format!("watch {label} -> {value}"));
            })
            .map_err(|source| DemoError::Watch {
                path: path.clone(),
                source,
            })
        })
        .collect()
}

fn report_failures<W: Write>(out: &mut W, report: &NotifyReport) -> io::Result<()> {
    for failure in &report.failed {
        writeln!(out, "  failed: {failure}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_to_string(opts: &Opts) -> Result<String, DemoError> {
        let mut out = Vec::new();
        run(opts, &mut out)?;
        Ok(String::from_utf8(out).expect("utf8 output"))
    }

    #[test]
    fn initial_render_uses_sample() {
        let output = run_to_string(&Opts::default()).unwrap();
        assert_eq!(
            output,
            "initial: <div><h1>Profile</h1><p>Hello, Ann!</p>\
             <input model=\"user.name\" value=\"Ann\"></div>\n"
        );
    }

    #[test]
    fn steps_print_render_after_each() {
        let opts = Opts {
            steps: vec![
                Step::Set {
                    path: "title".into(),
                    value: json!("Account"),
                },
                Step::Input("Bo".into()),
            ],
            watch: vec!["user.name".into()],
            ..Opts::default()
        };
        let output = run_to_string(&opts).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 4, "{output}");
        assert!(lines[1].starts_with("set title=\"Account\": <div><h1>Account</h1>"));
        assert_eq!(lines[2], "  watch user.name -> Bo");
        assert!(lines[3].starts_with("input \"Bo\": "));
        assert!(lines[3].contains("Hello, Bo!"));
    }

    #[test]
    fn bad_set_path_is_an_error() {
        let opts = Opts {
            steps: vec![Step::Set {
                path: "user.name.first".into(),
                value: json!("x"),
            }],
            ..Opts::default()
        };
        let err = run_to_string(&opts).unwrap_err();
        assert!(matches!(err, DemoError::Write { .. }));
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn watch_on_missing_path_fails_before_render() {
        let opts = Opts {
            watch: vec!["nope".into()],
            ..Opts::default()
        };
        assert!(matches!(
            run_to_string(&opts),
            Err(DemoError::Watch { .. })
        ));
    }

    #[test]
    fn missing_data_file_is_io_error() {
        let err = load_data(Some("/definitely/not/here.json")).unwrap_err();
        assert!(matches!(err, DemoError::Io { .. }));
        assert!(err.to_string().starts_with("cannot read /definitely/not/here.json"));
    }
}
