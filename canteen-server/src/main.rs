use canteen_server::{Config, Server, ServerState, print_banner, setup_environment};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Environment (dotenv, log directory, tracing)
    setup_environment()?;

    print_banner();

    tracing::info!("Canteen server starting...");

    // 2. Configuration
    let config = Config::from_env();

    // 3. Open storage and replay reservations into the ledger
    let state = ServerState::initialize(&config);

    // 4. Serve until ctrl-c
    let server = Server::with_state(config, state);

    if let Err(e) = server.run().await {
        tracing::error!("Server error: {}", e);
        return Err(e.into());
    }

    Ok(())
}
