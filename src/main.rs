//! Multi-user TCP Chat - Entry Point
//!
//! Runs either the chat server or the terminal client, chosen by `--mode`.

use std::process::ExitCode;

use tokio::io::BufReader;
use tracing::error;
use tracing_subscriber::EnvFilter;

use tcp_chat::{ChatClient, ChatLog, ChatServer, Config, Mode};

/// Exit status for fatal startup and connection errors
const EXIT_FAILURE: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::from(EXIT_FAILURE);
        }
    };

    // Initialize logging with environment filter
    // Use RUST_LOG env var to override the configured level
    // e.g., RUST_LOG=debug or RUST_LOG=tcp_chat=trace
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match config.mode {
        Mode::Server => run_server(config).await,
        Mode::Client => run_client(config).await,
    }
}

async fn run_server(config: Config) -> ExitCode {
    let chat_log = ChatLog::new(config.log_file);

    let server = match ChatServer::bind(&config.addr, chat_log).await {
        Ok(server) => server,
        Err(e) => {
            error!("Failed to bind {}: {}", config.addr, e);
            println!("Server is shutdown");
            return ExitCode::from(EXIT_FAILURE);
        }
    };
    println!("Server is running ...");

    // `run` only comes back on a fatal accept error
    if let Err(e) = server.run().await {
        error!("Listener failed: {}", e);
    }
    println!("Server is shutdown");
    ExitCode::from(EXIT_FAILURE)
}

async fn run_client(config: Config) -> ExitCode {
    let client = ChatClient::new(config.addr);
    let input = BufReader::new(tokio::io::stdin());

    let result = client.run(input, tokio::io::stdout()).await;
    match result {
        Ok(()) => {
            println!("You are now disconnected !");
            ExitCode::SUCCESS
        }
        Err(e) => {
            println!("{}", e);
            println!("You are now disconnected !");
            ExitCode::from(EXIT_FAILURE)
        }
    }
}
