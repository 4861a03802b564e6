//! bmi-server: computes body-mass-index over TCP.
//!
//! Each connection carries one JSON request and gets one JSON response.
//! Configuration via CLI arguments or TOML file.

use bmi_server::config::Config;
use bmi_server::protocol::MAX_MESSAGE_SIZE;
use bmi_server::server::Server;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::load()?;

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    info!(
        listen = %config.listen,
        backlog = config.backlog,
        read_budget = MAX_MESSAGE_SIZE,
        read_timeout = ?config.read_timeout,
        write_timeout = ?config.write_timeout,
        "Starting BMI server"
    );

    let server = Server::bind(&config)?;
    server.run().await?;
    Ok(())
}
