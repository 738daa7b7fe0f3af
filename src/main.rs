//! Billing CLI entry point: load readings and config, recompute, report.

mod cli;

use std::process;

use chrono::Local;
use tracing::error;
use tracing_subscriber::EnvFilter;

use bimestre::billing::engine::{BillingEngine, Recomputation};
use bimestre::billing::projection::PointKind;
use bimestre::config::BillingConfig;
use bimestre::io::export::{export_projection_csv, export_results_csv};
use bimestre::store::{CsvReadingStore, ReadingStore};

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(opts: &cli::CliOptions) -> BillingConfig {
    let config = if let Some(ref path) = opts.config {
        BillingConfig::from_toml_file(path)
    } else if let Some(ref name) = opts.preset {
        BillingConfig::from_preset(name)
    } else {
        Ok(BillingConfig::default())
    };
    let config = config.unwrap_or_else(|e| {
        eprintln!("{e}");
        process::exit(1);
    });

    let errors = config.validate();
    if !errors.is_empty() {
        for e in &errors {
            eprintln!("{e}");
        }
        process::exit(1);
    }
    config
}

fn print_report(engine: &BillingEngine, out: &Recomputation) {
    let aggregator = engine.aggregator();
    println!(
        "Ledger: {} credit, shortfall {}, {}-day cycle",
        aggregator.ledger().mode(),
        aggregator.ledger().shortfall(),
        aggregator.cycle_days()
    );
    println!();

    if !out.has_data() {
        println!("No billing periods: the readings contain no cut marker.");
        return;
    }

    println!("--- Periods ---");
    for p in &out.periods {
        let marker = if out.active == Some(p.index) { ">" } else { " " };
        println!("{marker} {p}");
    }
    println!();

    match (out.active_period(), out.active_result()) {
        (Some(_), Some(result)) => println!("{result}\n"),
        (Some(period), None) => {
            println!("{}: insufficient data for an estimate.\n", period.label);
        }
        (None, _) => println!("Selected period not found.\n"),
    }

    if !out.projection.is_empty() {
        println!("--- Cumulative net consumption ---");
        for p in &out.projection {
            let tag = match p.kind {
                PointKind::Actual => "",
                PointKind::Projected => "  (projected)",
            };
            println!("{:>12}  {:>10.2} kWh{tag}", p.label, p.cumulative_net_kwh);
        }
        println!();
    }

    println!("{}", out.summary);
}

fn main() {
    init_logging();

    let opts = cli::parse_args().unwrap_or_else(|e| {
        eprintln!("error: {e}");
        cli::print_usage();
        process::exit(1);
    });

    let config = load_config(&opts);
    let engine = BillingEngine::from_config(&config);
    let today = opts.today.unwrap_or_else(|| Local::now().date_naive());

    let mut store = CsvReadingStore::new(&opts.readings);
    if let Some(new_reading) = opts.add.clone() {
        match store.append(new_reading) {
            Ok(stored) => eprintln!("Stored reading {stored} in {}", store.path().display()),
            Err(e) => {
                eprintln!("error: {e}");
                process::exit(1);
            }
        }
    }

    // A failed fetch still renders the empty "no data" report before exiting non-zero.
    let (readings, fetch_failed) = match store.fetch() {
        Ok(readings) => (readings, false),
        Err(e) => {
            error!(error = %e, "failed to fetch readings");
            eprintln!("error: {e}");
            (Vec::new(), true)
        }
    };

    let out = engine.recompute_with(&readings, today, &opts.period);
    print_report(&engine, &out);

    if let Some(ref path) = opts.results_out {
        if let Err(e) = export_results_csv(&out.results, path) {
            eprintln!("error: failed to write results CSV: {e}");
            process::exit(1);
        }
        eprintln!("Results written to {}", path.display());
    }
    if let Some(ref path) = opts.projection_out {
        if let Err(e) = export_projection_csv(&out.projection, path) {
            eprintln!("error: failed to write projection CSV: {e}");
            process::exit(1);
        }
        eprintln!("Projection written to {}", path.display());
    }

    #[cfg(feature = "api")]
    if opts.serve {
        use std::net::SocketAddr;
        use std::sync::Arc;

        let state = Arc::new(bimestre::api::AppState::new(engine, readings, today));
        let addr = SocketAddr::from(([0, 0, 0, 0], opts.port));
        let rt = tokio::runtime::Runtime::new().unwrap_or_else(|e| {
            eprintln!("error: failed to create tokio runtime: {e}");
            process::exit(1);
        });
        if let Err(e) = rt.block_on(bimestre::api::serve(state, addr)) {
            eprintln!("error: API server failed: {e}");
            process::exit(1);
        }
    }

    if fetch_failed {
        process::exit(1);
    }
}
