//! Listener: binds one configured address and spawns a connection task per
//! accepted socket.

use std::net::SocketAddr;

use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{error, info, instrument};

use crate::dispatch::DispatchEvent;

use super::connection::run_connection;

pub struct Listener {
    listener: TcpListener,
    dispatch_tx: mpsc::UnboundedSender<DispatchEvent>,
    class: String,
    server_port: bool,
}

impl Listener {
    pub async fn bind(
        addr: SocketAddr,
        dispatch_tx: mpsc::UnboundedSender<DispatchEvent>,
        class: String,
        server_port: bool,
    ) -> std::io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        info!(%addr, class = %class, server_port, "listening");
        Ok(Listener { listener, dispatch_tx, class, server_port })
    }

    #[instrument(skip(self), name = "listener")]
    pub async fn run(self) {
        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    let dispatch_tx = self.dispatch_tx.clone();
                    let class = self.class.clone();
                    let server_port = self.server_port;
                    tokio::spawn(async move {
                        run_connection(stream, addr, dispatch_tx, class, server_port).await;
                    });
                }
                Err(e) => error!(error = %e, "accept failed"),
            }
        }
    }
}
