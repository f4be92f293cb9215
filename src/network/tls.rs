//! TLS listener: wraps the same per-connection loop as the plain
//! listener, accepting over a `rustls` server config built from a
//! configured cert/key pair.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_rustls::rustls::pki_types::{CertificateDer, PrivateKeyDer};
use tokio_rustls::rustls::ServerConfig as RustlsServerConfig;
use tokio_rustls::TlsAcceptor;
use tracing::{error, info, instrument, warn};

use crate::dispatch::DispatchEvent;

use super::connection::run_connection;

pub struct TlsListener {
    listener: TcpListener,
    acceptor: TlsAcceptor,
    dispatch_tx: mpsc::UnboundedSender<DispatchEvent>,
    class: String,
    server_port: bool,
}

impl TlsListener {
    pub async fn bind(
        addr: SocketAddr,
        cert_path: &str,
        key_path: &str,
        dispatch_tx: mpsc::UnboundedSender<DispatchEvent>,
        class: String,
        server_port: bool,
    ) -> std::io::Result<Self> {
        let config = load_server_config(cert_path, key_path)?;
        let listener = TcpListener::bind(addr).await?;
        info!(%addr, class = %class, server_port, "listening (tls)");
        Ok(TlsListener { listener, acceptor: TlsAcceptor::from(Arc::new(config)), dispatch_tx, class, server_port })
    }

    #[instrument(skip(self), name = "tls_listener")]
    pub async fn run(self) {
        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    let acceptor = self.acceptor.clone();
                    let dispatch_tx = self.dispatch_tx.clone();
                    let class = self.class.clone();
                    let server_port = self.server_port;
                    tokio::spawn(async move {
                        match acceptor.accept(stream).await {
                            Ok(tls_stream) => run_connection(tls_stream, addr, dispatch_tx, class, server_port).await,
                            Err(e) => warn!(%addr, error = %e, "tls handshake failed"),
                        }
                    });
                }
                Err(e) => error!(error = %e, "accept failed"),
            }
        }
    }
}

fn load_server_config(cert_path: &str, key_path: &str) -> std::io::Result<RustlsServerConfig> {
    let cert_bytes = std::fs::read(cert_path)?;
    let key_bytes = std::fs::read(key_path)?;

    let certs: Vec<CertificateDer<'static>> =
        rustls_pemfile::certs(&mut cert_bytes.as_slice()).collect::<Result<_, _>>()?;
    let key: PrivateKeyDer<'static> = rustls_pemfile::private_key(&mut key_bytes.as_slice())?
        .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::InvalidData, "no private key found in key file"))?;

    RustlsServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
}
