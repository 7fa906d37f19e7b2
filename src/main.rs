use std::path::PathBuf;

use alt_allocator::input;
use alt_allocator::market::validate_symbols;
use alt_allocator::report;
use alt_allocator::AllocationEngine;
use alt_allocator::AllocationRequest;
use alt_allocator::AllocatorConfig;
use alt_allocator::CandidateSelection;
use alt_allocator::CandidateSet;
use alt_allocator::Holdings;
use alt_allocator::MergePolicy;
use alt_allocator::PriceSource;
use alt_allocator::SyntheticSource;
use anyhow::Context;
use anyhow::Result;
use clap::Args;
use clap::Parser;
use clap::Subcommand;
use tracing::Level;
use tracing::info;

#[derive(Parser)]
#[command(name = "alt-allocator")]
#[command(about = "Add alternative assets to a stock portfolio at maximum Sharpe ratio", long_about = None)]
struct Cli {
  #[command(subcommand)]
  command: Commands,

  /// TOML file overriding the default configuration
  #[arg(short, long, global = true)]
  config: Option<PathBuf>,

  /// Log level (error, warn, info, debug, trace)
  #[arg(short, long, global = true, default_value = "warn")]
  log_level: String,
}

#[derive(Args, Clone)]
struct SourceArgs {
  /// Use deterministic synthetic prices instead of Yahoo Finance
  #[arg(long)]
  offline: bool,
}

#[derive(Subcommand)]
enum Commands {
  /// Reference run: AAPL/MSFT/GOOGL plus 2000 into GLD, VNQ, BND and BTC-USD
  Demo {
    #[command(flatten)]
    source: SourceArgs,

    /// Write the blended-allocation pie chart to this HTML file
    #[arg(long)]
    chart: Option<PathBuf>,
  },

  /// Optimize a user portfolio
  Optimize {
    /// Comma-separated US stock tickers
    #[arg(short, long, default_value = "AAPL,MSFT,GOOGL")]
    tickers: String,

    /// Comma-separated invested amounts, one per ticker
    #[arg(short, long, default_value = "1000,2000,1500")]
    amounts: String,

    /// Amount to invest in alternatives ($)
    #[arg(short, long, default_value = "2000")]
    invest: String,

    /// Include all alternative assets (default when --candidates is absent)
    #[arg(long, conflicts_with = "candidates")]
    all: bool,

    /// Comma-separated subset of alternative assets to consider
    #[arg(long)]
    candidates: Option<String>,

    /// How new money combines with an existing holding of the same symbol (sum, overwrite)
    #[arg(long)]
    merge: Option<MergePolicy>,

    /// Risk-free rate override
    #[arg(long)]
    risk_free: Option<f64>,

    #[command(flatten)]
    source: SourceArgs,

    /// Write the blended-allocation pie chart to this HTML file
    #[arg(long)]
    chart: Option<PathBuf>,
  },

  /// Check which tickers have recent price data
  Validate {
    /// Comma-separated tickers
    #[arg(short, long)]
    tickers: String,

    #[command(flatten)]
    source: SourceArgs,
  },

  /// List the alternative-asset universe
  Universe,
}

enum Job {
  Run {
    request: AllocationRequest,
    chart: Option<PathBuf>,
  },
  Validate {
    symbols: Vec<String>,
  },
}

fn init_tracing(level: &str) -> Result<()> {
  let level: Level = level
    .parse()
    .with_context(|| format!("invalid log level '{level}'"))?;
  tracing_subscriber::fmt()
    .with_max_level(level)
    .with_writer(std::io::stderr)
    .init();
  Ok(())
}

fn demo_request() -> Result<AllocationRequest> {
  let holdings = Holdings::new([("AAPL", 1000.0), ("MSFT", 2000.0), ("GOOGL", 1500.0)])?;
  let candidates = CandidateSet::resolve(&CandidateSelection::Subset(
    input::DEFAULT_CANDIDATES
      .iter()
      .map(|s| s.to_string())
      .collect(),
  ))?;

  Ok(AllocationRequest {
    holdings,
    candidates,
    additional_investment: 2000.0,
  })
}

async fn execute<S: PriceSource>(engine: AllocationEngine<S>, job: Job) -> Result<()> {
  match job {
    Job::Run { request, chart } => {
      info!(
        holdings = request.holdings.len(),
        candidates = %request.candidates,
        investment = request.additional_investment,
        "optimizing"
      );
      let run = engine.run(&request).await?;
      print!("{}", report::render(&run.outcome, Some(&run.validation)));

      if let Some(path) = chart {
        report::write_pie_html(&run.outcome.blended_weights, &path)
          .with_context(|| format!("writing pie chart to {}", path.display()))?;
        println!("\nPie chart written to {}", path.display());
      }
    }
    Job::Validate { symbols } => {
      let report = validate_symbols(
        engine.source(),
        &symbols,
        engine.config().probe_concurrency,
      )
      .await;
      if report.all_valid() {
        println!("all {} tickers have recent data", report.valid.len());
      } else {
        println!("valid: {}", report.valid.join(", "));
        println!("invalid: {}", report.invalid.join(", "));
      }
    }
  }
  Ok(())
}

async fn dispatch(offline: bool, config: AllocatorConfig, job: Job) -> Result<()> {
  if offline {
    return execute(AllocationEngine::new(SyntheticSource, config), job).await;
  }

  #[cfg(feature = "yahoo")]
  {
    let source = alt_allocator::market::YahooSource::new(config.probe_range.clone())?;
    execute(AllocationEngine::new(source, config), job).await
  }

  #[cfg(not(feature = "yahoo"))]
  {
    let _ = (config, job);
    anyhow::bail!("built without the `yahoo` feature; pass --offline")
  }
}

#[tokio::main]
async fn main() -> Result<()> {
  let cli = Cli::parse();
  init_tracing(&cli.log_level)?;

  let mut config = match &cli.config {
    Some(path) => AllocatorConfig::from_file(path)
      .with_context(|| format!("loading config from {}", path.display()))?,
    None => AllocatorConfig::default(),
  };

  match cli.command {
    Commands::Universe => {
      for symbol in input::ALTERNATIVE_UNIVERSE {
        println!("{symbol}");
      }
      Ok(())
    }
    Commands::Demo { source, chart } => {
      let request = demo_request()?;
      dispatch(source.offline, config, Job::Run { request, chart }).await
    }
    Commands::Optimize {
      tickers,
      amounts,
      invest,
      all,
      candidates,
      merge,
      risk_free,
      source,
      chart,
    } => {
      let selection = match candidates {
        Some(list) if !all => CandidateSelection::Subset(input::parse_tickers(&list)),
        _ => CandidateSelection::All,
      };
      let (holdings, candidates) = input::resolve(&tickers, &amounts, &selection)?;
      let additional_investment = input::parse_amount(&invest)?;

      if let Some(policy) = merge {
        config.merge_policy = policy;
      }
      if let Some(rf) = risk_free {
        config.risk_free = rf;
      }
      config.validate()?;

      let request = AllocationRequest {
        holdings,
        candidates,
        additional_investment,
      };
      dispatch(source.offline, config, Job::Run { request, chart }).await
    }
    Commands::Validate { tickers, source } => {
      let symbols = input::parse_tickers(&tickers);
      if symbols.is_empty() {
        anyhow::bail!("enter at least one ticker");
      }
      dispatch(source.offline, config, Job::Validate { symbols }).await
    }
  }
}
