use proteggo_api::setup;
use proteggo_core::Config;

// Use mimalloc as the global allocator for lower fragmentation under concurrent image work.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize the application (stores, collaborators, routes)
    let (state, router) = setup::initialize_app(config.clone()).await?;

    // Start the server
    setup::server::start_server(&config, router).await?;

    state.shutdown().await;

    Ok(())
}
