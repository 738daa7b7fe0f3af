use std::env;
use std::path::PathBuf;

use chrono::NaiveDate;

use bimestre::billing::period::PeriodSelector;
use bimestre::reading::NewReading;

/// Reading file used when `--readings` is not given.
pub const DEFAULT_READINGS: &str = "readings.csv";

pub struct CliOptions {
    pub readings: PathBuf,
    pub config: Option<PathBuf>,
    pub preset: Option<String>,
    pub today: Option<NaiveDate>,
    pub period: PeriodSelector,
    pub add: Option<NewReading>,
    pub results_out: Option<PathBuf>,
    pub projection_out: Option<PathBuf>,
    #[cfg_attr(not(feature = "api"), allow(dead_code))]
    pub serve: bool,
    #[cfg_attr(not(feature = "api"), allow(dead_code))]
    pub port: u16,
}

pub fn parse_args() -> Result<CliOptions, String> {
    let args: Vec<String> = env::args().skip(1).collect();
    parse_options(&args)
}

fn parse_options(args: &[String]) -> Result<CliOptions, String> {
    let mut i = 0usize;
    let mut readings = None;
    let mut config = None;
    let mut preset = None;
    let mut today = None;
    let mut period = None;
    let mut add = None;
    let mut results_out = None;
    let mut projection_out = None;
    let mut serve = false;
    let mut port = 3000u16;

    while i < args.len() {
        match args[i].as_str() {
            "--readings" => {
                i += 1;
                let path = args.next_or_err(
                    i,
                    "missing value for --readings (expected a CSV file path)",
                )?;
                if readings.replace(PathBuf::from(path)).is_some() {
                    return Err("--readings provided more than once".to_string());
                }
            }
            "--config" => {
                i += 1;
                let path =
                    args.next_or_err(i, "missing value for --config (expected a TOML file path)")?;
                if config.replace(PathBuf::from(path)).is_some() {
                    return Err("--config provided more than once".to_string());
                }
            }
            "--preset" => {
                i += 1;
                let name =
                    args.next_or_err(i, "missing value for --preset (expected a preset name)")?;
                if preset.replace(name.to_string()).is_some() {
                    return Err("--preset provided more than once".to_string());
                }
            }
            "--today" => {
                i += 1;
                let raw =
                    args.next_or_err(i, "missing value for --today (expected YYYY-MM-DD)")?;
                today = Some(parse_date(raw)?);
            }
            "--period" => {
                i += 1;
                let raw = args.next_or_err(
                    i,
                    "missing value for --period (expected an index or a label)",
                )?;
                period = Some(PeriodSelector::parse(raw));
            }
            "--add" => {
                i += 1;
                let raw = args.next_or_err(
                    i,
                    "missing value for --add (expected date,drawn,injected,cut[,note])",
                )?;
                add = Some(parse_new_reading(raw)?);
            }
            "--results-out" => {
                i += 1;
                let path = args.next_or_err(
                    i,
                    "missing value for --results-out (expected a file path)",
                )?;
                results_out = Some(PathBuf::from(path));
            }
            "--projection-out" => {
                i += 1;
                let path = args.next_or_err(
                    i,
                    "missing value for --projection-out (expected a file path)",
                )?;
                projection_out = Some(PathBuf::from(path));
            }
            "--serve" => serve = true,
            "--port" => {
                i += 1;
                let raw = args.next_or_err(i, "missing value for --port (expected a u16)")?;
                port = raw
                    .parse::<u16>()
                    .map_err(|_| format!("--port value \"{raw}\" is not a valid u16"))?;
            }
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            other => return Err(format!("unknown argument: {other}")),
        }
        i += 1;
    }

    if config.is_some() && preset.is_some() {
        return Err(
            "arguments `--config` and `--preset` are mutually exclusive; choose one source"
                .to_string(),
        );
    }
    if serve && !cfg!(feature = "api") {
        return Err("--serve requires building with the `api` feature".to_string());
    }

    Ok(CliOptions {
        readings: readings.unwrap_or_else(|| PathBuf::from(DEFAULT_READINGS)),
        config,
        preset,
        today,
        period: period.unwrap_or_default(),
        add,
        results_out,
        projection_out,
        serve,
        port,
    })
}

fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|e| format!("invalid date \"{raw}\" (expected YYYY-MM-DD): {e}"))
}

fn parse_number(raw: &str, what: &str) -> Result<f64, String> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| format!("invalid {what} \"{raw}\" (expected a number)"))
}

/// Parses `date,drawn,injected,cut[,note]`; the note may contain commas.
fn parse_new_reading(raw: &str) -> Result<NewReading, String> {
    let mut parts = raw.splitn(5, ',');
    let mut next = |what: &str| {
        parts
            .next()
            .ok_or_else(|| format!("--add is missing the {what} field"))
    };
    let date = parse_date(next("date")?)?;
    let energy_drawn = parse_number(next("drawn")?, "drawn energy")?;
    let energy_injected = parse_number(next("injected")?, "injected energy")?;
    let is_cut_marker = match next("cut")?.trim() {
        "true" => true,
        "false" => false,
        other => return Err(format!("invalid cut flag \"{other}\" (expected true/false)")),
    };
    let note = parts
        .next()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string);

    Ok(NewReading {
        date,
        energy_drawn,
        energy_injected,
        is_cut_marker,
        note,
    })
}

trait SliceArgExt {
    fn next_or_err(&self, index: usize, err: &str) -> Result<&str, String>;
}

impl SliceArgExt for [String] {
    fn next_or_err(&self, index: usize, err: &str) -> Result<&str, String> {
        self.get(index)
            .map(String::as_str)
            .ok_or_else(|| err.to_string())
    }
}

pub fn print_usage() {
    eprintln!("bimestre: net-metering billing per two-month period");
    eprintln!();
    eprintln!("Usage:");
    eprintln!(
        "  bimestre [--readings <csv>] [--config <toml> | --preset <name>] [--today <date>]"
    );
    eprintln!("           [--period <index|label>] [--add <date,drawn,injected,cut[,note]>]");
    eprintln!("           [--results-out <csv>] [--projection-out <csv>]");
    #[cfg(feature = "api")]
    eprintln!("           [--serve [--port <u16>]]");
    eprintln!();
    eprintln!("Defaults: --readings {DEFAULT_READINGS}, preset cfe_1, today = local date.");
    eprintln!("Set RUST_LOG=debug for diagnostic output.");
}
