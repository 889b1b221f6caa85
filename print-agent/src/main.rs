use std::sync::Arc;

use print_agent::backend::SpoolBackend;
use print_agent::utils::logger;
use print_agent::{AgentState, Config, Server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let config = Config::from_env();
    logger::init_logger_with_file(
        Some(&config.log_level),
        config.log_dir.as_deref().and_then(|d| d.to_str()),
    );

    tracing::info!(
        environment = %config.environment,
        printers = ?config.printers,
        "Print agent starting"
    );

    let backend = Arc::new(SpoolBackend::new(&config.spool_dir, config.printers.clone())?);
    let state = AgentState::new(config.clone(), backend);

    Server::new(config, state).run().await?;
    Ok(())
}
