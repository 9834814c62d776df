use std::net::SocketAddr;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;
use wallet_mock::config::{DEFAULT_TOKEN, ServerConfig};

#[derive(Parser, Debug)]
#[command(name = "wallet-mock", version, about = "Mock gaming wallet endpoint", long_about = None)]
struct Cli {
    /// Socket address to listen on.
    #[arg(long, env = "WALLET_MOCK_LISTEN", default_value = "0.0.0.0:3001")]
    listen: SocketAddr,
    /// Shared secret used for request and response signatures.
    #[arg(long, env = "WALLET_MOCK_TOKEN", default_value = DEFAULT_TOKEN)]
    token: String,
    /// Ignore the `skipSig` query flag and always verify signatures.
    #[arg(long)]
    disable_skip_sig: bool,
    /// Sign error responses too.
    #[arg(long)]
    sign_errors: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = ServerConfig {
        listen: cli.listen,
        secret: cli.token,
        allow_skip_sig: !cli.disable_skip_sig,
        sign_errors: cli.sign_errors,
        ..ServerConfig::default()
    };
    wallet_mock::server::serve(config).await
}

fn init_tracing() {
    let subscriber = tracing_subscriber::fmt().with_env_filter(
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    );
    let _ = subscriber.try_init();
}
