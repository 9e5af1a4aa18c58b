use std::io;
use std::process::ExitCode;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use dotenvy::dotenv;
use owo_colors::OwoColorize;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

use lucid_log::cli::{AwsArgs, Cli, Commands};
use lucid_log::config::{FileConfig, Settings};
use lucid_log::cw_source::CloudWatchSource;
use lucid_log::render::ConsoleRenderer;
use lucid_log::runner::{plan_tail, run_tail};
use lucid_log::show::run_show;
use lucid_log::traceback::TracebackFormatter;

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenv();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{} {err:#}", "Error:".red());
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Show { log_file } => {
            let color = !cli.no_color && std::env::var_os("NO_COLOR").is_none();
            if log_file.is_none() {
                eprintln!("{}", "Parsing logs from standard input...".green());
            }
            let renderer = ConsoleRenderer::new(color);
            tokio::task::spawn_blocking(move || {
                let mut out = io::stdout().lock();
                run_show(log_file.as_deref(), &mut out, &renderer)
            })
            .await
            .context("show task panicked")??;
            Ok(())
        }
        Commands::Aws(args) => run_aws(args, cli.no_color).await,
    }
}

async fn run_aws(args: AwsArgs, no_color: bool) -> Result<()> {
    eprintln!("{}", "Parsing logs from cloudwatch...".green());

    let mut file = FileConfig::load(args.config.as_deref())?;
    file.apply_env();
    let settings = Settings::resolve(args.overrides(no_color), file)?;
    info!(
        log_group = %settings.log_group,
        pattern = %settings.log_stream_pattern,
        watch = settings.watch,
        "starting tail"
    );

    let source = CloudWatchSource::from_env(settings.region.as_deref(), settings.http_timeout).await;
    let plan = plan_tail(&source, &settings, Utc::now()).await?;

    let renderer = ConsoleRenderer::new(settings.color).with_traceback(TracebackFormatter {
        colors: settings.color,
        show_locals: settings.show_locals,
        max_frames: settings.max_frames,
        ..TracebackFormatter::default()
    });

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            info!("interrupt received");
            interrupt.cancel();
        }
    });

    let mut out = io::stdout().lock();
    run_tail(source, plan, &renderer, &mut out, cancel).await?;
    Ok(())
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}
