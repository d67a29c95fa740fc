use tokio::net::TcpListener;
use todo_server::{
    app,
    config::ServerConfig,
    observability::{init_tracing, LogFormat},
    AppState, TodoService,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing(LogFormat::from_env());

    let config = ServerConfig::from_env()?;
    let store = config.store.build();
    tracing::info!(backend = config.store.backend_name(), "document store ready");

    let state = AppState::new(TodoService::new(store), config.owner_header.clone());
    let addr = config.bind_addr();
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(owner_header = %config.owner_header, "listening on {addr}");

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
