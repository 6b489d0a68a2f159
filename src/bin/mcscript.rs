//! Compile a payoff script and price it on simulated GBM paths.
//!
//! Usage: `mcscript <SCRIPT> --valuation-date YYYY-MM-DD [--price NAME ...]`
//!
//! The script is compiled with two initial bindings: `S`, the asset observed
//! at the horizon, and `T`, the horizon as a fixed amount.

use chrono::NaiveDate;
use clap::Parser;
use mcscript::prelude::*;
use std::fs;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "mcscript")]
#[command(about = "Compile a payoff script and price it by Monte Carlo")]
struct Args {
    /// Script file, one `name = expression` statement per line
    script: PathBuf,

    /// Reference date for date literals (YYYY-MM-DD)
    #[arg(long = "valuation-date")]
    valuation_date: NaiveDate,

    /// Reject re-binding of an existing name
    #[arg(long = "no-overwrite")]
    no_overwrite: bool,

    /// Number of simulated paths
    #[arg(long, default_value_t = 10_000)]
    paths: usize,

    /// RNG seed
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Initial asset level
    #[arg(long, default_value_t = 100.0)]
    spot: f64,

    /// Black-Scholes volatility
    #[arg(long, default_value_t = 0.2)]
    vol: f64,

    /// Continuously compounded risk-free rate
    #[arg(long, default_value_t = 0.0)]
    rate: f64,

    /// Continuous dividend yield
    #[arg(long = "dividend-yield", default_value_t = 0.0)]
    dividend_yield: f64,

    /// Simulation horizon in years
    #[arg(long, default_value_t = 1.0)]
    horizon: f64,

    /// Time steps per path
    #[arg(long, default_value_t = 12)]
    steps: usize,

    /// Payoff names to price; defaults to the script result
    #[arg(long = "price", num_args = 1..)]
    price: Vec<String>,
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() {
    init_logging();

    let args = Args::parse();
    if let Err(e) = run(&args) {
        error!("{e}");
        process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), ScriptError> {
    let source = fs::read_to_string(&args.script).map_err(|e| {
        ScriptError::InvalidInput(format!("cannot read {}: {e}", args.script.display()))
    })?;
    let lines: Vec<&str> = source.lines().collect();

    let config = ScriptConfig::new(args.valuation_date).with_overwrite(!args.no_overwrite);
    let initial: Vec<PayoffRef> = vec![
        Arc::new(Asset::new(args.horizon)),
        Arc::new(FixedAmount::new(args.horizon)),
    ];
    let script = McScript::new(&["S", "T"], initial, &lines, config)?;

    println!("Expressions:");
    for expr in script.expressions() {
        println!("  {expr}");
    }
    println!("Log:");
    for entry in script.log() {
        println!("  {entry}");
    }

    let names = if args.price.is_empty() {
        default_names(&script)
    } else {
        args.price.clone()
    };

    let simulation = GbmSimulation::new(
        args.spot,
        args.vol,
        args.rate,
        args.dividend_yield,
        args.horizon,
        args.steps,
        args.paths,
        args.seed,
    )?;
    info!(paths = args.paths, steps = args.steps, "simulation ready");

    let npv = script.npv(&simulation, &names)?;
    println!("NPV:");
    for (name, value) in names.iter().zip(npv) {
        println!("  {name} = {value:.6}");
    }
    Ok(())
}

/// `payoff` if bound, else the most recently written name.
fn default_names(script: &McScript) -> Vec<String> {
    let table = script.payoffs();
    if table.contains(mcscript::script::RESULT_NAME) {
        return vec![mcscript::script::RESULT_NAME.to_string()];
    }
    table
        .last()
        .map(|(name, _)| vec![name.to_string()])
        .unwrap_or_default()
}
