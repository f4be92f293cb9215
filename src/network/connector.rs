//! Outbound S2S connector: dials a configured (or `CONNECT`-requested)
//! uplink, writes our side of the PASS/SERVER handshake straight onto the
//! freshly-opened socket, then hands the stream to the same per-connection
//! loop an inbound accept uses. From dispatch's point of view the two are
//! indistinguishable once the peer's own `SERVER` line arrives as an
//! ordinary `DispatchEvent::Line`.

use std::net::SocketAddr;

use ircd_proto::Message;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::config::LinkBlock;
use crate::dispatch::DispatchEvent;

use super::connection::run_outbound_connection;

/// Resolves `link.hostname:link.port`, writes `PASS`/`SERVER`, then enters
/// the normal connection loop. Runs to completion (i.e. until the link
/// drops); callers spawn this on its own task.
pub async fn connect_link(link: LinkBlock, our_name: String, our_sid: String, dispatch_tx: mpsc::UnboundedSender<DispatchEvent>) {
    // Jitter the dial so a batch of autoconnect links started together at
    // boot doesn't hammer the remote side's accept queue all at once.
    let jitter_ms = rand::random::<u64>() % 2000;
    tokio::time::sleep(std::time::Duration::from_millis(jitter_ms)).await;

    let target = format!("{}:{}", link.hostname, link.port);
    let addr: SocketAddr = match tokio::net::lookup_host(&target).await.ok().and_then(|mut a| a.next()) {
        Some(a) => a,
        None => {
            warn!(%target, "could not resolve outbound link address");
            return;
        }
    };

    let mut stream = match TcpStream::connect(addr).await {
        Ok(s) => s,
        Err(e) => {
            warn!(%target, error = %e, "outbound link connect failed");
            return;
        }
    };

    let opts = crate::sync::capab::encode(&crate::sync::capab::default_local_offer());
    let pass_line = Message::new(None, ircd_proto::Command::PASS(link.password.clone()));
    let server_line =
        Message::new(None, ircd_proto::Command::SERVER { name: our_name.clone(), hopcount: 1, info: format!("{our_sid} {opts}") });

    if let Err(e) = write_handshake(&mut stream, &[pass_line, server_line]).await {
        warn!(%target, error = %e, "failed to write outbound handshake");
        return;
    }

    info!(%target, server = %link.name, "outbound link established, awaiting peer SERVER");
    run_outbound_connection(stream, addr, dispatch_tx, link.class.clone(), true).await;
}

/// Requests the connector can receive from dispatch: either a configured
/// link (looked up by name from an OPER's `CONNECT`) or an autoconnect
/// entry read at startup.
pub struct ConnectRequest {
    pub link: LinkBlock,
}

/// Owns no state beyond the channel; spawns one `connect_link` task per
/// request so a slow/failing dial never blocks the next one.
pub async fn run_connector(
    mut rx: mpsc::UnboundedReceiver<ConnectRequest>,
    our_name: String,
    our_sid: String,
    dispatch_tx: mpsc::UnboundedSender<DispatchEvent>,
) {
    while let Some(req) = rx.recv().await {
        let our_name = our_name.clone();
        let our_sid = our_sid.clone();
        let dispatch_tx = dispatch_tx.clone();
        tokio::spawn(connect_link(req.link, our_name, our_sid, dispatch_tx));
    }
}

async fn write_handshake(stream: &mut TcpStream, lines: &[Message]) -> std::io::Result<()> {
    for line in lines {
        stream.write_all(line.to_string().as_bytes()).await?;
        stream.write_all(b"\r\n").await?;
    }
    Ok(())
}
