use rawhttp::config::ServerConfig;
use rawhttp::handler::App;
use rawhttp::net::Server;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[async_std::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rawhttp=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = match std::env::args().nth(1) {
        Some(path) => ServerConfig::from_file(&path),
        None => ServerConfig::default(),
    };
    if let Some(port) = std::env::var("PORT").ok().and_then(|p| p.parse().ok()) {
        config = config.with_port(port);
    }

    let mut server = Server::serve(&config, App).await?;
    tracing::info!(port = server.local_addr().port(), "server started");

    let (tx, rx) = async_std::channel::bounded::<()>(1);
    ctrlc::set_handler(move || {
        let _ = tx.try_send(());
    })
    .map_err(std::io::Error::other)?;

    let _ = rx.recv().await;
    server.close().await;
    tracing::info!("server gracefully stopped");
    Ok(())
}
