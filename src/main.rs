use analytics::{
    AggregateOptions, EquityCurveOptions, SortMetric, agent_key, aggregate_by_signal_strength,
    build_agent_equity_curves, build_equity_curve, by_agent, by_signal_type, compute_drawdown,
    compute_risk_metrics, compute_summary, cross_tabulate, load_trades, mark_to_market,
    signal_type_key,
};
use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use configuration::{Config, init_logging, load_config};
use core_types::{Trade, TradeMode};
use engine::PriceReconciler;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

mod render;

/// The main entry point for the Edgeboard trade analytics tool.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A .env file is optional; it only seeds EDGE__* overrides.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = load_config(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    let _log_guard = init_logging(&config.logging)?;

    match cli.command {
        Commands::Report(args) => handle_report(args, &config),
        Commands::Segments(args) => handle_segments(args, &config),
        Commands::Curve(args) => handle_curve(args, &config),
        Commands::Watch(args) => handle_watch(args, &config).await,
    }
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// Performance analytics for autonomous trading agents.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file. A missing file means defaults.
    #[arg(long, global = true, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the headline statistics and risk metrics for a trade set.
    Report(ReportArgs),
    /// Break the statistics down by agent, signal type or signal strength.
    Segments(SegmentArgs),
    /// Print the equity curve built from closed trades.
    Curve(CurveArgs),
    /// Keep open positions priced live and print a rolling summary.
    Watch(WatchArgs),
}

/// The trade file and the view filters shared by every command.
#[derive(Args)]
struct TradeInput {
    /// JSON file holding an array of trade records.
    #[arg(long)]
    trades: PathBuf,

    /// Only include trades from this agent.
    #[arg(long)]
    agent: Option<String>,

    /// Only include trades of this mode.
    #[arg(long, value_enum)]
    mode: Option<ModeFilter>,
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeFilter {
    Live,
    Simulation,
}

#[derive(Args)]
struct ReportArgs {
    #[command(flatten)]
    input: TradeInput,

    /// Emit JSON instead of a table.
    #[arg(long)]
    json: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum Dimension {
    Agent,
    SignalType,
    SignalStrength,
    /// Agent x signal type.
    AgentSignal,
}

#[derive(Clone, Copy, ValueEnum)]
enum SortKey {
    Expectancy,
    AvgReturn,
    EdgeScore,
    WinRate,
    ProfitFactor,
    TotalPnl,
    Trades,
}

impl From<SortKey> for SortMetric {
    fn from(key: SortKey) -> Self {
        match key {
            SortKey::Expectancy => SortMetric::Expectancy,
            SortKey::AvgReturn => SortMetric::AvgReturn,
            SortKey::EdgeScore => SortMetric::EdgeScore,
            SortKey::WinRate => SortMetric::WinRate,
            SortKey::ProfitFactor => SortMetric::ProfitFactor,
            SortKey::TotalPnl => SortMetric::TotalPnl,
            SortKey::Trades => SortMetric::TradeCount,
        }
    }
}

#[derive(Args)]
struct SegmentArgs {
    #[command(flatten)]
    input: TradeInput,

    #[arg(long, value_enum, default_value = "agent")]
    by: Dimension,

    /// Hide groups with fewer trades. Defaults to 1, or to the configured
    /// cross-tab threshold for two-dimensional breakdowns.
    #[arg(long)]
    min_samples: Option<usize>,

    #[arg(long, value_enum, default_value = "expectancy")]
    sort: SortKey,

    #[arg(long)]
    ascending: bool,

    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct CurveArgs {
    #[command(flatten)]
    input: TradeInput,

    /// One curve per agent instead of a single pooled curve.
    #[arg(long)]
    per_agent: bool,

    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct WatchArgs {
    #[command(flatten)]
    input: TradeInput,

    /// Seconds between summary refreshes. The trade file is re-read on each refresh.
    #[arg(long, default_value_t = 10)]
    refresh_secs: u64,
}

// ==============================================================================
// Command Logic
// ==============================================================================

/// Loads the trade file and applies the view filters.
fn load_view(input: &TradeInput) -> anyhow::Result<Vec<Trade>> {
    let trades = load_trades(&input.trades)
        .with_context(|| format!("Failed to read trades from {}", input.trades.display()))?;
    let total = trades.len();

    let view: Vec<Trade> = trades
        .into_iter()
        .filter(|t| input.agent.as_deref().is_none_or(|a| t.agent_id == a))
        .filter(|t| match input.mode {
            None => true,
            Some(ModeFilter::Live) => t.mode == TradeMode::Live,
            Some(ModeFilter::Simulation) => t.mode == TradeMode::Simulation,
        })
        .collect();

    debug!(total, in_view = view.len(), "Loaded trade records.");
    Ok(view)
}

fn curve_options(config: &Config) -> EquityCurveOptions {
    EquityCurveOptions {
        baseline: config.analytics.starting_balance,
        risk_free_rate: config.analytics.risk_free_rate,
    }
}

fn handle_report(args: ReportArgs, config: &Config) -> anyhow::Result<()> {
    let trades = load_view(&args.input)?;
    let summary = compute_summary(&trades);
    let risk = compute_risk_metrics(&trades, &curve_options(config));

    if args.json {
        let body = serde_json::json!({ "summary": summary, "risk": risk });
        println!("{}", serde_json::to_string_pretty(&body)?);
    } else {
        println!("{}", render::summary_table(&summary));
        println!("{}", render::risk_table(&risk));
    }
    Ok(())
}

fn handle_segments(args: SegmentArgs, config: &Config) -> anyhow::Result<()> {
    let trades = load_view(&args.input)?;
    let options = AggregateOptions::default()
        .sorted_by(args.sort.into(), !args.ascending)
        .with_min_samples(args.min_samples.unwrap_or(1));

    match args.by {
        Dimension::Agent | Dimension::SignalType => {
            let segments = match args.by {
                Dimension::Agent => by_agent(&trades, &options),
                _ => by_signal_type(&trades, &options),
            };
            if args.json {
                println!("{}", serde_json::to_string_pretty(&segments)?);
            } else {
                println!("{}", render::segment_table(&segments));
            }
        }
        Dimension::SignalStrength => {
            let segments = aggregate_by_signal_strength(&trades, options.min_samples);
            if args.json {
                println!("{}", serde_json::to_string_pretty(&segments)?);
            } else {
                println!("{}", render::strength_table(&segments));
            }
        }
        Dimension::AgentSignal => {
            let min_samples = args
                .min_samples
                .unwrap_or(config.analytics.cross_tab_min_samples);
            let cells = cross_tabulate(
                &trades,
                agent_key,
                signal_type_key,
                &options.with_min_samples(min_samples),
            );
            if args.json {
                println!("{}", serde_json::to_string_pretty(&cells)?);
            } else {
                println!("{}", render::cross_table(&cells));
            }
        }
    }
    Ok(())
}

fn handle_curve(args: CurveArgs, config: &Config) -> anyhow::Result<()> {
    let trades = load_view(&args.input)?;
    let options = curve_options(config);

    if args.per_agent {
        let mut agents: Vec<String> = trades.iter().map(|t| t.agent_id.clone()).collect();
        agents.sort();
        agents.dedup();
        let curves = build_agent_equity_curves(&trades, &agents, &options);
        if args.json {
            println!("{}", serde_json::to_string_pretty(&curves)?);
        } else {
            for (agent, curve) in &curves {
                let drawdown = compute_drawdown(curve);
                println!(
                    "Agent: {agent} (max drawdown ${}, {}%)",
                    drawdown.max_drawdown.round_dp(2),
                    drawdown.max_drawdown_percent.round_dp(2)
                );
                println!("{}", render::curve_table(curve));
            }
        }
    } else {
        let curve = build_equity_curve(&trades, &options);
        if args.json {
            println!("{}", serde_json::to_string_pretty(&curve)?);
        } else {
            println!("{}", render::curve_table(&curve));
            println!("{}", render::risk_table(&compute_risk_metrics(&trades, &options)));
        }
    }
    Ok(())
}

/// Runs the price reconciler against the trade file until Ctrl-C.
async fn handle_watch(args: WatchArgs, config: &Config) -> anyhow::Result<()> {
    let mut trades = load_view(&args.input)?;
    let reconciler = PriceReconciler::from_config(config)?;
    let store = reconciler.store();
    let mut events = reconciler.subscribe();

    reconciler.set_open_trades(&trades);
    let handle = reconciler.spawn();
    info!(open = trades.iter().filter(|t| t.is_open()).count(), "Watching open positions. Press Ctrl-C to stop.");

    let mut refresh = tokio::time::interval(Duration::from_secs(args.refresh_secs.max(1)));
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown requested.");
                break;
            }
            event = events.recv() => match event {
                Ok(event) => match event.to_json() {
                    Ok(json) => debug!(event = %json, "Price event."),
                    Err(e) => warn!(error = %e, "Could not serialize price event."),
                },
                Err(RecvError::Lagged(skipped)) => debug!(skipped, "Price event stream lagged."),
                Err(RecvError::Closed) => break,
            },
            _ = refresh.tick() => {
                match load_view(&args.input) {
                    Ok(latest) => {
                        trades = latest;
                        reconciler.set_open_trades(&trades);
                    }
                    Err(e) => warn!(error = %e, "Keeping previous trade set."),
                }
                let marked = mark_to_market(&trades, &store);
                println!("{}", render::watch_line(&compute_summary(&marked), &marked, &store));
            }
        }
    }

    handle.shutdown().await;
    Ok(())
}
