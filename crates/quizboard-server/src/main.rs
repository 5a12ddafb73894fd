use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use quizboard_server::build_app;
use quizboard_server::catalog::InMemoryCatalog;
use quizboard_server::config::ServerConfig;

#[tokio::main]
async fn main() {
    let json_logs = std::env::var("QUIZBOARD_LOG_FORMAT").is_ok_and(|v| v == "json");
    let subscriber = tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env());
    if json_logs {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    let config = ServerConfig::load();
    config.validate();

    let catalog = match InMemoryCatalog::from_config(&config.catalog) {
        Ok(catalog) => catalog,
        Err(e) => {
            tracing::error!(error = %e, "Failed to load quiz catalog");
            std::process::exit(1);
        },
    };

    let addr = config.listen_addr.clone();
    let (app, _state) = build_app(config, Arc::new(catalog));

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| panic!("Failed to bind to {addr}: {e}"));

    tracing::info!("Quizboard server listening on {addr}");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .expect("Server error");
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
