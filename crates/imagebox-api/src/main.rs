//! imagebox CLI.
//!
//! `serve` runs the HTTP API, `invoke` answers a single Lambda proxy event
//! and `lambda` runs the Lambda Runtime API loop.

use std::io::Read;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};

use imagebox_api::api::create_router;
use imagebox_api::config::AppConfig;
use imagebox_api::lambda::{self, ProxyEvent, RuntimeClient};
use imagebox_api::server;
use imagebox_telemetry::{LogFormat, LoggingConfig};

#[derive(Parser, Debug)]
#[command(name = "imagebox", about = "Image upload and listing service", version)]
struct Cli {
    /// Log filter directive (RUST_LOG takes precedence).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Log output format: json or pretty.
    #[arg(long, global = true, env = "LOG_FORMAT", default_value = "json")]
    log_format: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP server.
    Serve {
        /// Listen address.
        #[arg(long, default_value = "127.0.0.1:8080")]
        listen: SocketAddr,

        #[command(flatten)]
        config: AppConfig,
    },

    /// Handle one proxy event and print the response.
    Invoke {
        /// Event file; stdin when omitted.
        #[arg(long)]
        event: Option<PathBuf>,

        #[command(flatten)]
        config: AppConfig,
    },

    /// Serve events from the Lambda Runtime API.
    Lambda {
        /// Runtime API address.
        #[arg(long, env = "AWS_LAMBDA_RUNTIME_API")]
        runtime_api: String,

        #[command(flatten)]
        config: AppConfig,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let Some(log_format) = LogFormat::parse(&cli.log_format) else {
        eprintln!("error: unknown log format '{}'", cli.log_format);
        return ExitCode::from(2);
    };
    if let Err(e) = imagebox_telemetry::init(&LoggingConfig {
        log_level: cli.log_level.clone(),
        log_format,
    }) {
        eprintln!("error: {}", e);
        return ExitCode::from(1);
    }
    imagebox_telemetry::log_startup!(version = env!("CARGO_PKG_VERSION"), "starting");

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("error: failed to create runtime: {}", e);
            return ExitCode::from(1);
        }
    };

    match rt.block_on(run(cli.command)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "fatal");
            eprintln!("error: {:#}", e);
            ExitCode::from(1)
        }
    }
}

async fn run(command: Command) -> anyhow::Result<()> {
    match command {
        Command::Serve { listen, config } => {
            let state = config.build_state().await?;
            server::run(server::ServerConfig {
                listen_addr: listen,
                router: create_router(state, config.max_body_bytes),
            })
            .await
        }

        Command::Invoke { event, config } => {
            let raw = match &event {
                Some(path) => std::fs::read_to_string(path)
                    .with_context(|| format!("failed to read {}", path.display()))?,
                None => {
                    let mut buf = String::new();
                    std::io::stdin()
                        .read_to_string(&mut buf)
                        .context("failed to read event from stdin")?;
                    buf
                }
            };
            let event: ProxyEvent = serde_json::from_str(&raw).context("invalid proxy event")?;

            let state = config.build_state().await?;
            let router = create_router(state, config.max_body_bytes);
            let response = lambda::handle_event(&router, event).await?;
            println!("{}", serde_json::to_string_pretty(&response)?);
            Ok(())
        }

        Command::Lambda {
            runtime_api,
            config,
        } => {
            let state = config.build_state().await?;
            let router = create_router(state, config.max_body_bytes);
            lambda::run(&RuntimeClient::new(&runtime_api), &router, None).await?;
            Ok(())
        }
    }
}
