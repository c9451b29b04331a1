//! Options Pricer CLI
//!
//! Prices a single contract with Black-Scholes, the CRR lattice or Monte Carlo:
//!
//! ```text
//! options-pricer --spot 100 --strike 100 --rate 0.05 --vol 0.2 --time 1 --type call
//! options-pricer --spot 100 --strike 100 --rate 0.05 --vol 0.2 --time 1 --type put \
//!     --style american --method binomial --steps 200
//! options-pricer --spot 100 --strike 105 --rate 0.05 --vol 0.3 --time 1 --type call \
//!     --method mc --paths 200000 --seed 42 --greeks --json
//! options-pricer --spot 100 --strike 100 --rate 0.05 --time 1 --type call --implied 10.45
//! ```

use std::path::PathBuf;
use std::process;

use clap::{Parser, ValueEnum};
use serde::Serialize;

use options_pricing_engine::models::black_scholes;
use options_pricing_engine::prelude::*;

/// Placeholder volatility when only `--implied` is given; the solver ignores it
const PLACEHOLDER_VOL: f64 = 0.2;

/// Price options with Black-Scholes, a binomial lattice or Monte Carlo
#[derive(Parser)]
#[command(name = "options-pricer", version, about)]
struct Cli {
    /// Current spot price
    #[arg(long)]
    spot: f64,

    /// Strike price
    #[arg(long)]
    strike: f64,

    /// Continuously compounded risk-free rate (0.05 = 5%)
    #[arg(long, allow_hyphen_values = true)]
    rate: f64,

    /// Volatility (0.2 = 20%)
    #[arg(long, required_unless_present = "implied")]
    vol: Option<f64>,

    /// Time to maturity in years
    #[arg(long)]
    time: f64,

    /// Option type
    #[arg(long = "type", value_enum)]
    option_type: TypeArg,

    /// Exercise style
    #[arg(long, value_enum, default_value = "european")]
    style: StyleArg,

    /// Pricing method
    #[arg(long, value_enum, default_value = "bs")]
    method: Method,

    /// Lattice steps (overrides the config file)
    #[arg(long)]
    steps: Option<usize>,

    /// Monte Carlo paths (overrides the config file)
    #[arg(long)]
    paths: Option<usize>,

    /// Monte Carlo seed (overrides the config file)
    #[arg(long)]
    seed: Option<u64>,

    /// Disable antithetic variates
    #[arg(long)]
    no_antithetic: bool,

    /// Also report Greeks (analytic for bs, finite-difference delta/gamma for mc)
    #[arg(long)]
    greeks: bool,

    /// Back out implied volatility from this market price, then price with it
    #[arg(long)]
    implied: Option<f64>,

    /// JSON engine configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Emit JSON instead of a text report
    #[arg(long)]
    json: bool,

    /// Debug logging on stderr
    #[arg(long, short)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum TypeArg {
    Call,
    Put,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum StyleArg {
    European,
    American,
}

#[derive(Debug, Clone, Copy, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
enum Method {
    Bs,
    Binomial,
    Mc,
}

impl Method {
    fn label(&self) -> &'static str {
        match self {
            Method::Bs => "Black-Scholes",
            Method::Binomial => "Binomial (CRR)",
            Method::Mc => "Monte Carlo",
        }
    }
}

#[derive(Serialize)]
struct Report {
    contract: OptionContract,
    method: Method,
    price: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    std_error: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    steps: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    paths: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    greeks: Option<Greeks>,
    #[serde(skip_serializing_if = "Option::is_none")]
    mc_greeks: Option<McGreeks>,
    #[serde(skip_serializing_if = "Option::is_none")]
    implied: Option<IvSolution>,
}

fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        tracing_subscriber::EnvFilter::new("debug")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(&cli) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn load_config(cli: &Cli) -> PricingResult<EngineConfig> {
    let mut config = match &cli.config {
        Some(path) => EngineConfig::from_json_file(path)?,
        None => EngineConfig::default(),
    };
    if let Some(steps) = cli.steps {
        config.lattice.steps = steps;
    }
    if let Some(paths) = cli.paths {
        config.monte_carlo.paths = paths;
    }
    if cli.seed.is_some() {
        config.monte_carlo.seed = cli.seed;
    }
    if cli.no_antithetic {
        config.monte_carlo.antithetic = false;
    }
    Ok(config)
}

fn run(cli: &Cli) -> PricingResult<()> {
    let config = load_config(cli)?;

    let option_type = match cli.option_type {
        TypeArg::Call => OptionType::Call,
        TypeArg::Put => OptionType::Put,
    };
    let style = match cli.style {
        StyleArg::European => ExerciseStyle::European,
        StyleArg::American => ExerciseStyle::American,
    };
    let mut contract = OptionContract::new(
        cli.spot,
        cli.strike,
        cli.rate,
        cli.vol.unwrap_or(PLACEHOLDER_VOL),
        cli.time,
        option_type,
        style,
    )?;

    let implied = match cli.implied {
        Some(market_price) => {
            // The solver is analytic: invert on the European twin
            let european = contract.with_exercise_style(ExerciseStyle::European);
            let solution = solve_implied_volatility(&european, market_price, &config.implied_vol)?;
            contract = contract.with_volatility(solution.volatility)?;
            Some(solution)
        }
        None => None,
    };

    let mut report = Report {
        contract,
        method: cli.method,
        price: 0.0,
        std_error: None,
        steps: None,
        paths: None,
        seed: None,
        greeks: None,
        mc_greeks: None,
        implied,
    };

    match cli.method {
        Method::Bs => {
            report.price = black_scholes::price(&contract)?;
            if cli.greeks {
                report.greeks = Some(black_scholes::greeks(&contract)?);
            }
        }
        Method::Binomial => {
            report.price = price_binomial(&contract, config.lattice.steps)?;
            report.steps = Some(config.lattice.steps);
            if cli.greeks {
                tracing::warn!("Greeks are reported for --method bs and mc only");
            }
        }
        Method::Mc => {
            let est = price_monte_carlo_with(&contract, &config.monte_carlo)?;
            report.price = est.price;
            report.std_error = Some(est.std_error);
            report.paths = Some(est.paths);
            report.seed = Some(est.seed);
            if cli.greeks {
                report.mc_greeks = Some(monte_carlo_greeks(&contract, est.paths, Some(est.seed))?);
            }
        }
    }

    if cli.json {
        let json = serde_json::to_string_pretty(&report)
            .map_err(|e| PricingError::Serialization(e.to_string()))?;
        println!("{json}");
    } else {
        print_report(&report);
    }
    Ok(())
}

fn print_report(report: &Report) {
    let c = &report.contract;
    println!();
    println!(
        "Option: {} @ K={}, S={} ({})",
        c.option_type().label().to_uppercase(),
        c.strike(),
        c.spot(),
        c.exercise_style().label()
    );
    println!(
        "Params: r={:.2}%, vol={:.2}%, T={:.4}y",
        c.rate() * 100.0,
        c.volatility() * 100.0,
        c.time_to_maturity()
    );
    println!("{}", "-".repeat(50));

    if let Some(iv) = &report.implied {
        println!(
            "Implied vol: {:.4}% ({} iterations, {:?} phase, residual {:.2e})",
            iv.volatility * 100.0,
            iv.iterations,
            iv.phase,
            iv.residual
        );
    }

    match (report.steps, report.std_error) {
        (Some(steps), _) => println!(
            "{} price ({steps} steps): {:.4}",
            report.method.label(),
            report.price
        ),
        (_, Some(se)) => println!(
            "{} price ({} paths, seed {}): {:.4} ± {:.4}",
            report.method.label(),
            report.paths.unwrap_or_default(),
            report.seed.unwrap_or_default(),
            report.price,
            se
        ),
        _ => println!("{} price: {:.4}", report.method.label(), report.price),
    }

    if let Some(g) = &report.greeks {
        println!("\nGreeks:");
        println!("  Delta: {:+.4}", g.delta);
        println!("  Gamma: {:+.6}", g.gamma);
        println!("  Vega:  {:+.4} ({:+.4} per vol point)", g.vega, g.vega_per_point());
        println!("  Theta: {:+.4} per year ({:+.4} per day)", g.theta, g.theta_per_day());
        println!("  Rho:   {:+.4} ({:+.4} per rate point)", g.rho, g.rho_per_point());
        if let (Some(vanna), Some(volga)) = (g.vanna, g.volga) {
            println!("  Vanna: {vanna:+.4}");
            println!("  Volga: {volga:+.4}");
        }
    }

    if let Some(g) = &report.mc_greeks {
        println!("\nMonte Carlo Greeks (1% spot bump, common random numbers):");
        println!("  Delta: {:+.4}", g.delta);
        println!("  Gamma: {:+.6}", g.gamma);
    }
    println!();
}
