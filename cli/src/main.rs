use std::error::Error;
use std::fmt::{self, Display, Formatter};
use std::fs;
use std::io::stdout;
use std::path::PathBuf;

use clap::ArgAction::{Set, SetTrue};
use clap::Parser;
use tracing::{event, span, Level};
use tracing_subscriber::prelude::*;

use soc::{ConfigError, RunError, ScriptedHost, System, SystemConfig};

mod report;
mod script;

use report::Report;
use script::{parse_script, ScriptError};

/// Run a script of bus requests against the simulated compute subsystem
#[derive(Parser, Debug)]
#[clap(version, about, long_about = None)]
struct Cli {
    /// File containing the requests to issue.
    #[clap(action = Set)]
    script: PathBuf,

    /// JSON file holding the system configuration.  Fields which are
    /// not given take their default values.
    #[clap(action = Set, long)]
    config: Option<PathBuf>,

    /// Give up if the script has not completed after this many cycles.
    #[clap(action = Set, long, default_value_t = 100_000)]
    max_cycles: u64,

    /// Print a JSON report instead of one line per request.
    #[clap(action = SetTrue, long)]
    json: bool,
}

#[derive(Debug)]
enum Fail {
    /// We were not able to correctly initialise the simulator.
    InitialisationFailure(String),
    Read(PathBuf, std::io::Error),
    ConfigSyntax(PathBuf, serde_json::Error),
    Config(ConfigError),
    Script(ScriptError),
    Run(RunError),
    Output(String),
}

impl Display for Fail {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            Fail::InitialisationFailure(msg) | Fail::Output(msg) => f.write_str(msg.as_str()),
            Fail::Read(path, e) => write!(f, "failed to read {}: {e}", path.display()),
            Fail::ConfigSyntax(path, e) => write!(f, "{}: {e}", path.display()),
            Fail::Config(e) => write!(f, "bad configuration: {e}"),
            Fail::Script(e) => e.fmt(f),
            Fail::Run(e) => e.fmt(f),
        }
    }
}

impl Error for Fail {}

fn load_config(path: Option<&PathBuf>) -> Result<SystemConfig, Fail> {
    match path {
        None => Ok(SystemConfig::default()),
        Some(path) => {
            let text = fs::read_to_string(path).map_err(|e| Fail::Read(path.clone(), e))?;
            serde_json::from_str(&text).map_err(|e| Fail::ConfigSyntax(path.clone(), e))
        }
    }
}

fn run_script() -> Result<(), Fail> {
    let cli = Cli::parse();

    // See
    // https://docs.rs/tracing-subscriber/0.3/tracing_subscriber/filter/struct.EnvFilter.html
    // for instructions on how to select which trace messages get
    // printed.
    let fmt_layer = tracing_subscriber::fmt::layer().with_target(true);
    let filter_layer = match tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new("info"))
    {
        Err(e) => {
            return Err(Fail::InitialisationFailure(format!(
                "failed to initialise tracing filter (perhaps there is a problem with environment variables): {e}"
            )));
        }
        Ok(layer) => layer,
    };

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();

    let config = load_config(cli.config.as_ref())?;
    let text = fs::read_to_string(&cli.script).map_err(|e| Fail::Read(cli.script.clone(), e))?;
    let ops = parse_script(&text).map_err(Fail::Script)?;

    let span = span!(Level::ERROR, "run", script=?cli.script);
    let _enter = span.enter();
    event!(Level::INFO, "running {} requests", ops.len());
    let mut system = System::new(&config, ScriptedHost::new(ops)).map_err(Fail::Config)?;
    let outcome = system.run_until_idle(cli.max_cycles);

    let report = Report {
        cycles: system.cycle(),
        finished: outcome.is_ok(),
        completions: system.host().completions(),
        phases: system.phase_log(),
    };
    if cli.json {
        report
            .write_json(stdout())
            .map_err(|e| Fail::Output(format!("failed to write report: {e}")))?;
        println!();
    } else {
        report
            .print()
            .map_err(|e| Fail::Output(format!("failed to write report: {e}")))?;
    }
    outcome.map(|_| ()).map_err(Fail::Run)
}

fn main() {
    match run_script() {
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
        Ok(()) => {
            std::process::exit(0);
        }
    }
}
