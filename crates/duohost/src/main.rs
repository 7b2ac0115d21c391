//! duo-companion - serves the fixture library to one initiator.
//!
//! Binds the request and callback ports, prints the readiness line on stdout,
//! and serves until the initiator closes the request channel. Logs go to stderr
//! (stdout carries the readiness line) or to a file under `--log-dir`.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use duohost::Dispatcher;
use duohost::fixture;
use duohost::fixture::FixtureOptions;
use duonet::Endpoints;
use duonet::endpoints::DEFAULT_CALLBACK_PORT;
use duonet::endpoints::DEFAULT_REQUEST_PORT;
use tracing::Level;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::FmtSubscriber;

const LOG_FILE_NAME: &str = "duo-companion.log";

#[derive(Parser, Debug)]
#[command(name = "duo-companion")]
#[command(about = "Companion process for the duo call bridge")]
struct Args {
    /// Port for the request/response channel (0 = auto-assign)
    #[arg(long, default_value_t = DEFAULT_REQUEST_PORT)]
    request_port: u16,

    /// Port for the callback channel (0 = auto-assign)
    #[arg(long, default_value_t = DEFAULT_CALLBACK_PORT)]
    callback_port: u16,

    /// Callbacks emitted per SetCallback request
    #[arg(long, default_value_t = fixture::DEFAULT_CALLBACK_COUNT)]
    callbacks: i32,

    /// Pause between callbacks, in milliseconds
    #[arg(long, default_value_t = 500)]
    callback_interval_ms: u64,

    /// Write logs to this directory instead of stderr
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

fn init_logging(args: &Args) -> Result<Option<WorkerGuard>> {
    let log_level = if args.debug { Level::DEBUG } else { Level::INFO };
    let builder = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(true)
        .compact();

    match &args.log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, LOG_FILE_NAME));
            builder.with_ansi(false).with_writer(writer).init();
            Ok(Some(guard))
        }
        None => {
            builder.with_writer(std::io::stderr).init();
            Ok(None)
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();
    let _guard = init_logging(&args)?;

    info!("Starting duo companion (pid {})", std::process::id());

    let options = FixtureOptions {
        callbacks: args.callbacks,
        interval: Duration::from_millis(args.callback_interval_ms),
    };
    let mut dispatcher = Dispatcher::new(fixture::registry(options)?);

    let endpoints = Endpoints::new(args.request_port, args.callback_port);
    let code = dispatcher
        .run(endpoints, |bound| {
            // Intentional stdout: the initiator reads the bound ports from this line
            println!("{}", bound.ready_line());
        })
        .await;

    info!("Exiting with code {}", code);
    Ok(ExitCode::from(code as u8))
}
