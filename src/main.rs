//! Chartgrid - command-line front end for the spreadsheet grid engine

use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result, bail};
use directories::ProjectDirs;
use log::{LevelFilter, Log, Metadata, Record};

use chartgrid_core::storage::write_csv_file;
use chartgrid_core::{CellRef, CellValue, Document, Settings};

const LOG_ENV: &str = "CHARTGRID_LOG";

struct StderrLogger;

static LOGGER: StderrLogger = StderrLogger;

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            eprintln!("[{}] {}: {}", record.level(), record.target(), record.args());
        }
    }

    fn flush(&self) {}
}

fn init_logging() {
    let level = env::var(LOG_ENV)
        .ok()
        .and_then(|value| LevelFilter::from_str(value.trim()).ok())
        .unwrap_or(LevelFilter::Warn);
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(level);
    }
}

fn print_usage() {
    eprintln!("Usage: chartgrid [OPTIONS] [FILE]");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  [FILE]                    CSV or TSV file to load into the first sheet");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -c, --command <FORMULA>   Evaluate a formula against the sheet and print it");
    eprintln!("  --paste <TEXT>            Paste a CSV/TSV buffer into the sheet");
    eprintln!("  --at <CELL>               Where --paste lands (default: A1)");
    eprintln!("  -o, --output <FILE>       Write the sheet as CSV instead of printing it");
    eprintln!("  --config <FILE>           Settings file (default: <config dir>/settings.toml)");
    eprintln!("  -h, --help                Print help");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  {}              error|warn|info|debug|trace|off (default: warn)", LOG_ENV);
}

#[derive(Debug, Default)]
struct Options {
    file: Option<PathBuf>,
    command: Option<String>,
    paste: Option<String>,
    at: Option<String>,
    output: Option<PathBuf>,
    config: Option<PathBuf>,
}

fn next_value(args: &[String], i: &mut usize, flag: &str, what: &str) -> String {
    *i += 1;
    match args.get(*i) {
        Some(value) => value.clone(),
        None => {
            eprintln!("Error: {} requires {}", flag, what);
            std::process::exit(1);
        }
    }
}

fn parse_args(args: &[String]) -> Options {
    let mut options = Options::default();
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => {
                print_usage();
                std::process::exit(0);
            }
            flag @ ("-c" | "--command") => {
                options.command = Some(next_value(args, &mut i, flag, "a formula"));
            }
            "--paste" => {
                options.paste = Some(next_value(args, &mut i, "--paste", "a value"));
            }
            "--at" => {
                options.at = Some(next_value(args, &mut i, "--at", "a cell reference"));
            }
            flag @ ("-o" | "--output") => {
                options.output = Some(PathBuf::from(next_value(args, &mut i, flag, "a file path")));
            }
            "--config" => {
                options.config = Some(PathBuf::from(next_value(args, &mut i, "--config", "a file path")));
            }
            arg if arg.starts_with('-') => {
                eprintln!("Error: Unknown option: {}", arg);
                print_usage();
                std::process::exit(1);
            }
            arg => {
                if options.file.is_none() {
                    options.file = Some(PathBuf::from(arg));
                } else {
                    eprintln!("Error: Unexpected argument: {}", arg);
                    print_usage();
                    std::process::exit(1);
                }
            }
        }
        i += 1;
    }
    options
}

fn default_settings_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "chartgrid").map(|dirs| dirs.config_dir().join("settings.toml"))
}

/// An explicit --config must load; the default file is optional.
fn load_settings(explicit: Option<&Path>) -> Result<Settings> {
    if let Some(path) = explicit {
        return Settings::load(path)
            .with_context(|| format!("failed to load settings from {}", path.display()));
    }
    match default_settings_path() {
        Some(path) if path.exists() => Settings::load(&path).or_else(|e| {
            log::warn!("ignoring {}: {}", path.display(), e);
            Ok(Settings::default())
        }),
        _ => Ok(Settings::default()),
    }
}

/// Returns the process exit code.
fn run(options: Options) -> Result<i32> {
    let settings = load_settings(options.config.as_deref())?;
    let mut doc = Document::with_settings(settings);

    if let Some(path) = &options.file {
        doc.import_delimited_file(path)
            .with_context(|| format!("failed to load {}", path.display()))?;
    }

    if let Some(text) = &options.paste {
        let at = options.at.as_deref().unwrap_or("A1");
        let Some(target) = CellRef::from_a1(at) else {
            bail!("invalid cell reference: {}", at);
        };
        let written = doc.paste_at(target, text)?;
        log::info!("pasted {} cells at {}", written, target);
    }

    let mut code = 0;
    if let Some(formula) = &options.command {
        let value = doc.evaluate(formula);
        println!("{}", value.display_string());
        if matches!(value, CellValue::Error(_)) {
            code = 1;
        }
    }

    if let Some(path) = &options.output {
        write_csv_file(path, &doc.export_active())
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("Exported to {}", path.display());
    } else if options.command.is_none() {
        print!("{}", doc.to_csv());
    }

    Ok(code)
}

fn main() {
    init_logging();
    let args: Vec<String> = env::args().collect();
    let options = parse_args(&args);

    match run(options) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}
