use std::process::ExitCode;

use anyhow::Result;
use auth_broker::broker::AuthBrokerBuilder;
use auth_broker::browser::Browser;
use auth_broker::config::loader;
use auth_broker::observability::metrics::get_metrics;
use auth_broker::utils::logging;
use auth_broker::utils::logging::LogLevel;
use auth_broker::AuthError;
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, env = "AUTH_BROKER_CONFIG")]
    config: Option<String>,
    #[arg(long, env = "LOG_LEVEL", value_enum)]
    log_level: Option<LogLevel>,
    /// print the metrics exposition on stderr before exiting
    #[arg(long)]
    print_metrics: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print a valid token for the destination
    Token(TokenArgs),
    /// Force a fresh exchange and print the new token
    Refresh(TokenArgs),
}

#[derive(clap::Args)]
struct TokenArgs {
    destination: String,
    /// fail with BrowserAuthRequired instead of opening a browser
    #[arg(long)]
    no_browser: bool,
    /// override the configured browser
    #[arg(long, value_enum)]
    browser: Option<Browser>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    match run(args).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{:#}", e);
            ExitCode::from(1)
        }
    }
}

async fn run(args: Args) -> Result<ExitCode> {
    // -------------------------------
    // 1. Load YAML config, start logging
    // -------------------------------

    let mut config = loader::run(args.config.as_deref()).await?;
    logging::run(&config, args.log_level);

    let (token_args, refresh) = match &args.command {
        Command::Token(a) => (a, false),
        Command::Refresh(a) => (a, true),
    };
    if let Some(browser) = token_args.browser {
        config.settings.browser.browser = browser;
    }

    // -------------------------------
    // 2. Ctrl-C cancels a pending browser login
    // -------------------------------

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            debug!("interrupt received");
            on_signal.cancel();
        }
    });

    // -------------------------------
    // 3. Build the broker and resolve
    // -------------------------------

    let broker = AuthBrokerBuilder::from_config(&config, cancel)?
        .allow_browser_auth(config.settings.allow_browser_auth && !token_args.no_browser)
        .build()?;

    info!(destination = %token_args.destination, refresh, "resolving token");
    let result = if refresh {
        broker.refresh_token(&token_args.destination).await
    } else {
        broker.get_token(&token_args.destination).await
    };

    if args.print_metrics || config.settings.metrics.is_enabled {
        eprintln!("{}", get_metrics().await.render()?);
    }

    Ok(report(result))
}

fn report(result: Result<String, AuthError>) -> ExitCode {
    match result {
        Ok(token) => {
            println!("{}", token);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::from(u8::try_from(e.exit_code()).unwrap_or(1))
        }
    }
}
