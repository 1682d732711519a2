use std::process::ExitCode;
use std::sync::Arc;

use ferrodash_core::ReqwestHttpClient;
use ferrodash_relay::{RelayConfig, RelayServer};
use tracing::error;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let config = match RelayConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            error!(error = %err, "invalid relay configuration");
            return ExitCode::from(2);
        }
    };

    let client = ReqwestHttpClient::with_user_agent(&config.user_agent);
    let server = RelayServer::new(config, Arc::new(client));
    match server.serve().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "relay failed");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
