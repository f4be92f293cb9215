//! spanircd - a multi-connect IRC daemon.

mod ack;
mod broadcast;
mod collision;
mod config;
mod directory;
mod dispatch;
mod error;
mod handlers;
mod idgen;
mod modes;
mod network;
mod security;
mod stats;
mod sync;
mod telemetry;
mod topology;

use clap::Parser;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "spanircd", about = "A multi-connect IRC daemon")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config_path = std::fs::canonicalize(&cli.config).map(|p| p.to_string_lossy().into_owned()).unwrap_or(cli.config);

    let cfg = config::load(&config_path).map_err(|e| {
        eprintln!("ERROR: failed to load config from {}: {}", config_path, e);
        e
    })?;

    telemetry::init(&cfg.logging);

    if let Err(e) = config::validate(&cfg) {
        error!(error = %e, "configuration validation failed");
        return Err(anyhow::anyhow!("configuration validation failed: {e}"));
    }

    info!(server = %cfg.server.name, sid = %cfg.server.sid, "starting spanircd");

    let (dispatch_tx, dispatch_rx) = tokio::sync::mpsc::unbounded_channel();
    let (connect_tx, connect_rx) = tokio::sync::mpsc::unbounded_channel();

    let dispatch_cfg = cfg.clone();
    let dispatch_path = config_path.clone();
    let dispatch_connect_tx = connect_tx.clone();
    let dispatch_task = tokio::spawn(async move {
        dispatch::run(dispatch_rx, dispatch_cfg, dispatch_path, dispatch_connect_tx).await;
    });

    let mut listener_tasks = Vec::new();
    for listen in &cfg.listen {
        let listener = network::Listener::bind(listen.address, dispatch_tx.clone(), listen.class.clone(), listen.server_port).await?;
        listener_tasks.push(tokio::spawn(listener.run()));
    }
    for tls in &cfg.tls_listen {
        let listener = network::TlsListener::bind(
            tls.address,
            &tls.cert_path,
            &tls.key_path,
            dispatch_tx.clone(),
            tls.class.clone(),
            tls.server_port,
        )
        .await?;
        listener_tasks.push(tokio::spawn(listener.run()));
    }

    if cfg.listen.is_empty() && cfg.tls_listen.is_empty() {
        error!("no listeners configured");
    }

    let connector_task = tokio::spawn(network::connector::run_connector(
        connect_rx,
        cfg.server.name.clone(),
        cfg.server.sid.clone(),
        dispatch_tx.clone(),
    ));

    for link in cfg.links.iter().filter(|l| l.autoconnect) {
        let _ = connect_tx.send(network::connector::ConnectRequest { link: link.clone() });
    }

    tokio::select! {
        _ = shutdown_signal() => {
            info!("shutdown signal received");
        }
        _ = dispatch_task => {
            info!("dispatch task exited");
        }
    }

    for task in listener_tasks {
        task.abort();
    }
    connector_task.abort();

    Ok(())
}

async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};
    let mut sigint = signal(SignalKind::interrupt()).expect("failed to install SIGINT handler");
    let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");

    tokio::select! {
        _ = sigint.recv() => info!("received SIGINT"),
        _ = sigterm.recv() => info!("received SIGTERM"),
    }
}
