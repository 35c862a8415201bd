use std::process::ExitCode;

use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use capstone_proxy::Cache;

fn usage_and_exit(program: &str) -> ExitCode {
    eprintln!("usage: {program} <port>");
    ExitCode::FAILURE
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut args = std::env::args();
    let program = args.next().unwrap_or_else(|| "proxy".to_string());
    let Some(port) = args.next() else {
        return usage_and_exit(&program);
    };
    if args.next().is_some() {
        return usage_and_exit(&program);
    }

    let listener = match TcpListener::bind(format!("0.0.0.0:{port}")).await {
        Ok(listener) => listener,
        Err(e) => {
            eprintln!("failed to listen on port {port}: {e}");
            return ExitCode::FAILURE;
        }
    };
    info!("listening on port {port}");

    let cache = Cache::new();

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, peer)) => {
                        let cache = cache.clone();
                        tokio::spawn(async move {
                            capstone_proxy::handle_connection(stream, peer, cache).await;
                        });
                    }
                    Err(e) => {
                        warn!("accept failed: {e}");
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("received ctrl-c, shutting down");
                return ExitCode::SUCCESS;
            }
        }
    }
}
