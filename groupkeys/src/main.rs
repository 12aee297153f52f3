use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use groupkeys_api::{create_router, AppState};
use groupkeys_bridge::{
    ConnectionProvider, MessageBridge, ResponsePublisher, TopicRouter, WorkflowExecutor,
};
use groupkeys_core::{
    bootstrap::{init_database, load_config},
    logging,
    repository::KeyRepository,
    service::EmailNotifier,
};

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Load configuration
    let config = load_config()?;

    // 2. Initialize logging
    logging::init_logging(&config.logging)?;
    info!("Groupkeys service starting...");
    info!("HTTP address: {}", config.http_address());
    info!("AMQP address: {}", config.amqp_url());

    // 3. Initialize database
    let pool = init_database(&config).await?;
    let repository = KeyRepository::new(pool);

    // 4. Failure notifier (no-op unless SMTP is configured)
    let notifier = Arc::new(EmailNotifier::new(
        config.email_configured().then(|| config.email.clone()),
    ));

    // 5. Wire the message bridge
    let provider = ConnectionProvider::new();
    let publisher = ResponsePublisher::new(provider.clone());
    let executor = WorkflowExecutor::new(
        Arc::new(repository.clone()),
        notifier.clone(),
        Arc::new(publisher),
    );
    let router = TopicRouter::new(Arc::new(executor), config.amqp.ack_policy);
    let bridge = Arc::new(MessageBridge::new(
        config.amqp.clone(),
        provider,
        router,
    ));
    let bridge_handle = bridge.clone().start();

    // 6. HTTP server
    let state = AppState {
        reader: Arc::new(repository),
        notifier: notifier.clone(),
    };
    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(config.http_address()).await?;
    info!("HTTP server listening on {}", config.http_address());

    notifier.notify_startup().await;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // 7. Shut the bridge down and wait for its loop to exit
    info!("Shutting down...");
    bridge.shutdown();
    let _ = bridge_handle.await;
    info!("Shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
}
