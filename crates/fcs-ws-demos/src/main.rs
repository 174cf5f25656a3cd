/*
[INPUT]:  CLI arguments, optional YAML configuration file, OS shutdown signals
[OUTPUT]: Running feed demo (terminal, background or web) with graceful shutdown
[POS]:    Binary entry point
[UPDATE]: When changing CLI commands, startup flow, or shutdown handling
*/

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use console::style;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use fcs_ws_adapter::{EventHandler, FcsClient};
use fcs_ws_demos::{
    run_monitor, ConfigOverrides, DemoConfig, Engine, MonitorOptions, Preset, SimplePrinter,
    TerminalPrinter,
};

/// Time allowed for the close handshake after Ctrl+C.
const DISCONNECT_GRACE: Duration = Duration::from_secs(5);

#[derive(Parser, Debug)]
#[command(name = "fcs-ws-demos", version, about = "FCS real-time price feed demos")]
struct Cli {
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info", global = true)]
    log_level: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Stream a preset's symbols to the terminal
    Stream(StreamArgs),
    /// Print BTCUSDT closes, nothing else
    Simple {
        #[arg(long = "api-key", value_name = "KEY")]
        api_key: Option<String>,
    },
    /// Run the client on a background thread and poll prices from the main thread
    Background {
        #[arg(long = "api-key", value_name = "KEY")]
        api_key: Option<String>,
        #[arg(long, default_value_t = 20)]
        ticks: u32,
        #[arg(long = "interval-secs", value_name = "SECS", default_value_t = 3)]
        interval_secs: u64,
    },
    /// Serve the browser dashboard
    Serve(ServeArgs),
    /// Validate a configuration file and exit
    Check {
        #[arg(long = "config", value_name = "PATH")]
        config_path: PathBuf,
    },
}

#[derive(Args, Debug)]
struct StreamArgs {
    #[arg(long, value_enum)]
    preset: Option<Preset>,
    #[arg(long = "config", value_name = "PATH")]
    config_path: Option<PathBuf>,
    #[arg(long = "api-key", value_name = "KEY")]
    api_key: Option<String>,
    /// Repeatable; replaces the preset's symbol list
    #[arg(long = "symbol", value_name = "EXCHANGE:TICKER")]
    symbols: Vec<String>,
    #[arg(long, value_name = "TF")]
    timeframe: Option<String>,
}

#[derive(Args, Debug)]
struct ServeArgs {
    #[arg(long, value_enum)]
    preset: Option<Preset>,
    #[arg(long, value_enum, default_value_t = Engine::Router)]
    engine: Engine,
    #[arg(long = "config", value_name = "PATH")]
    config_path: Option<PathBuf>,
    #[arg(long = "api-key", value_name = "KEY")]
    api_key: Option<String>,
    #[arg(long)]
    host: Option<String>,
    /// Defaults to 5001 for router, 5002 for raw
    #[arg(long)]
    port: Option<u16>,
    #[arg(long = "static-dir", value_name = "DIR")]
    static_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(&args.log_level)?;

    let shutdown = CancellationToken::new();
    setup_signal_handlers(shutdown.clone());

    match args.command {
        Command::Stream(stream) => run_stream(stream, shutdown).await,
        Command::Simple { api_key } => run_simple(api_key, shutdown).await,
        Command::Background {
            api_key,
            ticks,
            interval_secs,
        } => {
            let options = MonitorOptions {
                ticks,
                interval: Duration::from_secs(interval_secs),
                ..MonitorOptions::default()
            };
            run_background(api_key, options, shutdown).await
        }
        Command::Serve(serve) => run_serve(serve, shutdown).await,
        Command::Check { config_path } => run_check(&config_path),
    }
}

async fn run_stream(args: StreamArgs, shutdown: CancellationToken) -> Result<()> {
    let overrides = ConfigOverrides {
        api_key: args.api_key,
        preset: args.preset,
        symbols: args.symbols,
        timeframe: args.timeframe,
        ..ConfigOverrides::default()
    };
    let config = resolve_config(args.config_path.as_deref(), Preset::Crypto, overrides)?;
    info!(
        preset = ?config.preset,
        symbols = config.resolved_symbols().len(),
        timeframe = %config.resolved_timeframe(),
        "starting stream demo"
    );

    let client = FcsClient::with_config(config.api_key.clone(), config.client_config())
        .context("create feed client")?;
    let mut printer = TerminalPrinter::new(&config);

    println!("\nConnecting to FCS WebSocket...");
    println!("Press Ctrl+C to stop\n");
    run_until_shutdown(&client, &mut printer, &shutdown).await
}

async fn run_simple(api_key: Option<String>, shutdown: CancellationToken) -> Result<()> {
    let overrides = ConfigOverrides {
        api_key,
        ..ConfigOverrides::default()
    };
    let config = resolve_config(None, Preset::Crypto, overrides)?;
    let client = FcsClient::with_config(config.api_key.clone(), config.client_config())
        .context("create feed client")?;

    println!("{}", style("FCS WebSocket - Simple Example").bold());
    println!("Press Ctrl+C to stop\n");
    run_until_shutdown(&client, &mut SimplePrinter, &shutdown).await
}

async fn run_background(
    api_key: Option<String>,
    options: MonitorOptions,
    shutdown: CancellationToken,
) -> Result<()> {
    let overrides = ConfigOverrides {
        api_key,
        ..ConfigOverrides::default()
    };
    let config = resolve_config(None, Preset::Crypto, overrides)?;
    let client = FcsClient::with_config(config.api_key.clone(), config.client_config())
        .context("create feed client")?;

    println!("{}", style("FCS WebSocket - Background Thread Example").bold());
    println!("{}", "=".repeat(50));

    tokio::task::spawn_blocking(move || run_monitor(&client, &options, &shutdown))
        .await
        .context("join monitor thread")?
}

async fn run_serve(args: ServeArgs, shutdown: CancellationToken) -> Result<()> {
    let overrides = ConfigOverrides {
        api_key: args.api_key,
        preset: args.preset,
        host: args.host,
        port: args.port,
        static_dir: args.static_dir,
        ..ConfigOverrides::default()
    };
    let config = resolve_config(args.config_path.as_deref(), Preset::Forex, overrides)?;
    info!(engine = ?args.engine, preset = ?config.preset, "starting web demo");

    fcs_ws_demos::web::serve(args.engine, &config, shutdown).await
}

fn run_check(path: &Path) -> Result<()> {
    info!(config_path = %path.display(), "validating configuration");
    let mut config = DemoConfig::from_file(path).context("load config")?;
    config.apply_env();
    config.validate().context("validate config")?;

    let symbols = config.resolved_symbols();
    info!(
        preset = ?config.preset,
        symbol_count = symbols.len(),
        timeframe = %config.resolved_timeframe(),
        "configuration valid"
    );
    println!(
        "{} {} ({} symbols, timeframe {})",
        style("OK").green().bold(),
        path.display(),
        symbols.len(),
        config.resolved_timeframe()
    );
    Ok(())
}

/// File (or preset defaults), then `FCS_API_KEY`, then CLI flags.
fn resolve_config(
    path: Option<&Path>,
    fallback: Preset,
    overrides: ConfigOverrides,
) -> Result<DemoConfig> {
    let mut config = match path {
        Some(path) => DemoConfig::from_file(path).context("load config")?,
        None => DemoConfig::for_preset(overrides.preset.unwrap_or(fallback)),
    };
    config.apply_env();
    config.apply_overrides(overrides);
    config.validate().context("validate config")?;
    Ok(config)
}

/// Drive `handler` until the client stops on its own or a shutdown signal arrives.
async fn run_until_shutdown<H: EventHandler>(
    client: &FcsClient,
    handler: &mut H,
    shutdown: &CancellationToken,
) -> Result<()> {
    let run = client.run_forever(handler);
    tokio::pin!(run);

    tokio::select! {
        result = &mut run => result.context("feed client stopped"),
        _ = shutdown.cancelled() => {
            println!("\n\nDisconnecting...");
            client.disconnect();
            match tokio::time::timeout(DISCONNECT_GRACE, &mut run).await {
                Ok(result) => result.context("feed client shutdown")?,
                Err(_) => warn!("feed client did not stop within grace period"),
            }
            println!("Goodbye!");
            Ok(())
        }
    }
}

fn init_tracing(log_level: &str) -> Result<()> {
    let filter = EnvFilter::try_new(log_level).context("invalid log level")?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow!(err))
        .context("initialize tracing subscriber")?;
    Ok(())
}

fn setup_signal_handlers(shutdown: CancellationToken) {
    let shutdown_clone = shutdown.clone();
    tokio::spawn(async move {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "failed to install SIGINT handler");
            return;
        }
        info!("received SIGINT");
        shutdown_clone.cancel();
    });

    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let shutdown_clone = shutdown.clone();
        tokio::spawn(async move {
            match signal(SignalKind::terminate()) {
                Ok(mut stream) => {
                    stream.recv().await;
                    info!("received SIGTERM");
                    shutdown_clone.cancel();
                }
                Err(err) => {
                    warn!(error = %err, "failed to install SIGTERM handler");
                }
            }
        });
    }
}
