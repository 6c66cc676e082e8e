mod debug_report;

use regshift::{AnalyzeOptions, Corpus, Thresholds, run};
use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const LOG_ENV: &str = "REGSHIFT_LOG";

fn main() {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let config = match parse_args() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(2);
        }
    };

    let corpus = match load_corpus(config.corpus.as_ref()) {
        Ok(corpus) => corpus,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(2);
        }
    };

    let options = AnalyzeOptions { parallel: config.parallel, ..AnalyzeOptions::default() };
    let result = run(&corpus, &options, config.thresholds);
    debug_report::print_run(&result, config.thresholds, config.color);

    if let Some(path) = &config.rules_out {
        let written = result
            .rules
            .to_json()
            .map_err(|err| err.to_string())
            .and_then(|json| std::fs::write(path, json).map_err(|err| err.to_string()));
        if let Err(err) = written {
            eprintln!("error: failed to write rules to {}: {err}", path.display());
            std::process::exit(1);
        }
    }
}

struct CliConfig {
    corpus: Option<PathBuf>,
    thresholds: Thresholds,
    rules_out: Option<PathBuf>,
    parallel: bool,
    color: bool,
}

fn parse_args() -> Result<CliConfig, String> {
    let mut corpus: Option<PathBuf> = None;
    let mut min_confidence = Thresholds::default().min_confidence();
    let mut min_frequency = Thresholds::default().min_frequency();
    let mut rules_out: Option<PathBuf> = None;
    let mut parallel = true;
    let mut color = io::stdout().is_terminal();
    let mut args = std::env::args().skip(1);

    while let Some(arg) = args.next() {
        let (flag, inline) = match arg.split_once('=') {
            Some((flag, value)) if flag.starts_with("--") => (flag.to_string(), Some(value.to_string())),
            _ => (arg.clone(), None),
        };
        let mut value = |name: &str| -> Result<String, String> {
            inline.clone().or_else(|| args.next()).ok_or_else(|| format!("error: {name} expects a value"))
        };

        match flag.as_str() {
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            "-V" | "--version" => {
                println!("regshift {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "--color" => color = true,
            "--no-color" => color = false,
            "--sequential" => parallel = false,
            "--corpus" | "-c" => {
                if corpus.is_some() {
                    return Err("error: corpus provided multiple times".to_string());
                }
                corpus = Some(PathBuf::from(value("--corpus")?));
            }
            "--rules-out" | "-o" => rules_out = Some(PathBuf::from(value("--rules-out")?)),
            "--min-confidence" => {
                let raw = value("--min-confidence")?;
                min_confidence =
                    raw.parse().map_err(|_| format!("error: invalid --min-confidence '{raw}' (expected a number)"))?;
            }
            "--min-frequency" => {
                let raw = value("--min-frequency")?;
                min_frequency = raw
                    .parse()
                    .map_err(|_| format!("error: invalid --min-frequency '{raw}' (expected a non-negative integer)"))?;
            }
            _ if arg.starts_with('-') => return Err(format!("error: unknown option '{arg}'")),
            _ => {
                if corpus.is_some() {
                    return Err("error: corpus provided multiple times".to_string());
                }
                corpus = Some(PathBuf::from(arg));
            }
        }
    }

    let thresholds = Thresholds::new(min_confidence, min_frequency).map_err(|err| format!("error: {err}"))?;
    Ok(CliConfig { corpus, thresholds, rules_out, parallel, color })
}

/// Read the corpus from `path`, or from stdin when no path was given.
fn load_corpus(path: Option<&PathBuf>) -> Result<Corpus, String> {
    let json = match path {
        Some(path) => std::fs::read_to_string(path)
            .map_err(|err| format!("error: failed to read corpus {}: {err}", path.display()))?,
        None => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer).map_err(|err| format!("error: failed to read stdin: {err}"))?;
            buffer
        }
    };
    if json.trim().is_empty() {
        return Err(format!("error: no corpus provided\n\n{}", help_text()));
    }
    Corpus::from_json(&json).map_err(|err| format!("error: invalid corpus JSON: {err}"))
}

fn print_help() {
    println!("{}", help_text());
}

fn help_text() -> String {
    let defaults = Thresholds::default();
    format!(
        "regshift {version}

Mine headline-to-canonical transformation rules from a parsed corpus and
evaluate them.

Usage:
  regshift [OPTIONS] [<corpus.json>]
  regshift [OPTIONS] --corpus <corpus.json>
  regshift [OPTIONS] < corpus.json

Options:
  -c, --corpus <path>        Corpus JSON file. Reads stdin when omitted.
  --min-confidence <f64>     Minimum rule confidence in [0, 1]. Default: {confidence}
  --min-frequency <n>        Minimum rule frequency. Default: {frequency}
  -o, --rules-out <path>     Write the mined rule set as JSON.
  --sequential               Do not use the thread pool.
  --color                    Force ANSI color output.
  --no-color                 Disable ANSI color output.
  -h, --help                 Show this help message.
  -V, --version              Print version information.

Environment:
  {log_env}=<filter>     Log filter, e.g. regshift=debug. Default: warn

Exit codes:
  0  Success.
  1  Internal error.
  2  Invalid arguments, thresholds or corpus.
",
        version = env!("CARGO_PKG_VERSION"),
        confidence = defaults.min_confidence(),
        frequency = defaults.min_frequency(),
        log_env = LOG_ENV,
    )
}
