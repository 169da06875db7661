//! Tandem CLI and REST API entry point.
//!
//! Binary name: `tandem`
//!
//! Parses CLI arguments, initializes the store and services, then dispatches
//! to the appropriate command handler or starts the REST API server.

mod cli;
mod http;
mod state;

use clap::Parser;
use clap_complete::generate;
use tandem_observe::LogFormat;

use cli::conversation::SendArgs;
use cli::output::Output;
use cli::{Cli, Commands};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Shell completions don't need app state
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "tandem", &mut std::io::stdout());
        return Ok(());
    }

    let (format, otel, serving) = match &cli.command {
        Commands::Serve { log_json, otel, .. } => (
            if *log_json { LogFormat::Json } else { LogFormat::Pretty },
            *otel,
            true,
        ),
        _ => (LogFormat::Pretty, false, false),
    };
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 if serving => "info",
        0 => "warn",
        1 => "info,tandem_core=debug,tandem_infra=debug",
        _ => "trace",
    };
    tandem_observe::init_tracing(filter, format, otel)
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    let result = run(cli).await;
    tandem_observe::shutdown_tracing();
    result
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let out = Output {
        json: cli.json,
        quiet: cli.quiet,
    };
    let state = AppState::init(cli.ephemeral).await?;

    match cli.command {
        Commands::Send {
            sender,
            recipient,
            body,
            id,
            origin,
            role,
            owner,
        } => {
            let args = SendArgs {
                sender,
                recipient,
                body,
                id,
                origin,
                role,
                owner,
            };
            cli::conversation::send(&state, args, out).await?;
        }

        Commands::Read { key, reader, ids } => {
            cli::conversation::read(&state, &key, &reader, &ids, out).await?;
        }

        Commands::Messages {
            key,
            requester,
            unread,
        } => {
            cli::conversation::messages(&state, &key, &requester, unread, out).await?;
        }

        Commands::Session { action } => {
            cli::session::handle_session_command(action, &state, out).await?;
        }

        Commands::Route {
            twin,
            message,
            agent,
            turn,
        } => {
            cli::route::route(&state, &twin, &message, agent.as_deref(), turn, out).await?;
        }

        Commands::Serve { port, host, .. } => {
            let addr = format!("{host}:{port}");
            let listener = tokio::net::TcpListener::bind(&addr).await?;

            let store_desc = if state.ephemeral {
                "in-memory store".to_string()
            } else {
                format!("store at {}", state.data_dir.display())
            };
            println!(
                "  {} Tandem API listening on {} ({store_desc})",
                console::style("⚡").bold(),
                console::style(format!("http://{addr}")).cyan()
            );
            println!("  {}", console::style("Press Ctrl+C to stop").dim());

            let router = http::router::build_router(state);

            axum::serve(listener, router)
                .with_graceful_shutdown(shutdown_signal())
                .await?;

            println!("\n  Server stopped.");
        }

        Commands::Completions { .. } => {}
    }

    Ok(())
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
