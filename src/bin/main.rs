use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use console::Term;
use tracing::error;

include!(concat!(env!("OUT_DIR"), "/version.rs"));

/// A declarative test runner for shell commands and interactive CLI programs.
#[derive(Debug, Parser)]
#[clap(about = "Run .spec files against shell commands and interactive CLI programs", version = VERSION)]
struct Args {
    /// Path to the .spec file to run.
    spec_file: PathBuf,

    /// Run only the test matching this 1-based index or name substring.
    #[clap(long)]
    test: Option<String>,

    /// Include full captured output for every shell statement.
    #[clap(long, short = 'v')]
    verbose: bool,

    /// Timeout in seconds for batch (`$.`/`$!`) shell statements.
    #[clap(long)]
    shell_timeout: Option<u64>,

    /// Timeout in seconds for each `$<` expect step.
    #[clap(long)]
    expect_timeout: Option<u64>,

    /// Command alias in `name=path` form; may be repeated.
    #[clap(long = "alias", value_name = "NAME=PATH")]
    aliases: Vec<String>,
}

#[cfg(feature = "logging")]
fn init_logging() {
    use tracing_subscriber::EnvFilter;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(not(feature = "logging"))]
fn init_logging() {}

fn parse_aliases(raw: &[String]) -> Result<spectest::AliasTable, String> {
    let mut table = spectest::AliasTable::new();
    for entry in raw {
        let Some((name, path)) = entry.split_once('=') else {
            return Err(format!("invalid --alias value {entry:?}, expected NAME=PATH"));
        };
        table.insert(name, path);
    }
    Ok(table)
}

pub fn main() -> ExitCode {
    init_logging();
    let args = Args::parse();

    let text = match fs::read_to_string(&args.spec_file) {
        Ok(text) => text,
        Err(source) => {
            eprintln!("error: could not read {:?}: {source}", args.spec_file);
            return ExitCode::from(2);
        }
    };

    let doc = match spectest::parser::parse(&text, &args.spec_file) {
        Ok(doc) => doc,
        Err(err) => {
            error!("{err}");
            eprintln!("error: {err}");
            return ExitCode::from(2);
        }
    };

    let alias_table = match parse_aliases(&args.aliases) {
        Ok(table) => table,
        Err(message) => {
            eprintln!("error: {message}");
            return ExitCode::from(2);
        }
    };

    let mut builder = spectest::RunnerConfigBuilder::default();
    builder.alias_table(alias_table).verbose(args.verbose);
    if let Some(secs) = args.shell_timeout {
        builder.shell_timeout(Duration::from_secs(secs));
    }
    if let Some(secs) = args.expect_timeout {
        builder.expect_timeout(Duration::from_secs(secs));
    }
    let config = match builder.finish() {
        Ok(config) => config,
        Err(source) => {
            eprintln!("error: invalid configuration: {source}");
            return ExitCode::from(2);
        }
    };

    let selector = args.test.as_deref().map(spectest::TestSelector::parse);
    if let Some(spectest::TestSelector::Index(n)) = &selector {
        if *n == 0 || *n > doc.tests.len() {
            eprintln!("error: --test index {n} is out of range (1..={})", doc.tests.len());
            return ExitCode::from(2);
        }
    }

    let runner = spectest::Runner::new(doc, config);
    let report = runner.run(selector.as_ref());

    if report.outcomes.is_empty() {
        eprintln!("error: no test matched the given selector");
        return ExitCode::from(2);
    }

    let term = Term::stdout();
    let failed = match spectest::report::render(&report, args.verbose, &term) {
        Ok(failed) => failed,
        Err(source) => {
            eprintln!("error: could not write report: {source}");
            return ExitCode::from(2);
        }
    };

    if failed > 0 {
        ExitCode::from(1)
    } else {
        ExitCode::SUCCESS
    }
}
