//! Per-connection task: decode wire lines into `Command`s and forward them
//! to the dispatch task; write whatever the dispatch task hands back. No
//! state beyond the socket and the two channels lives here.

use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use ircd_proto::{raw, Command, Message};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio_util::codec::{Framed, LinesCodec};
use tracing::{debug, warn};

use crate::dispatch::DispatchEvent;

/// Handed to the dispatch task at connection time; used to write outbound
/// messages and to know the remote's address for logging/class matching.
pub struct ConnectionHandle {
    pub addr: SocketAddr,
    pub outbound: mpsc::UnboundedSender<Arc<Message>>,
    /// Connection class this listener counts its clients against.
    pub class: String,
    /// Whether the listener this came in on accepts server links
    /// (SERVER/PASS handshakes), not just client registration.
    pub server_port: bool,
    /// True when this link was dialed by `network::connector` (we already
    /// wrote our own PASS/SERVER before handing the socket to this loop),
    /// false for an ordinary accept. Lets the SERVER handler know whether
    /// it still owes the peer our side of the handshake.
    pub initiated_locally: bool,
}

/// Runs until the socket closes or a fatal line error occurs, forwarding
/// every well-formed line to `dispatch_tx` and writing every message it
/// receives back on `outbound_rx`. Generic over the byte stream so both
/// plain TCP and TLS-wrapped sockets (and an outbound connector's own
/// stream, after it writes its handshake preamble) share one loop.
pub async fn run_connection<S>(
    stream: S,
    addr: SocketAddr,
    dispatch_tx: mpsc::UnboundedSender<DispatchEvent>,
    class: String,
    server_port: bool,
) where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    run_connection_inner(stream, addr, dispatch_tx, class, server_port, false).await
}

/// Same as `run_connection` but marks the link as one we dialed out
/// ourselves, so the SERVER handler knows not to resend our handshake.
pub async fn run_outbound_connection<S>(
    stream: S,
    addr: SocketAddr,
    dispatch_tx: mpsc::UnboundedSender<DispatchEvent>,
    class: String,
    server_port: bool,
) where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    run_connection_inner(stream, addr, dispatch_tx, class, server_port, true).await
}

async fn run_connection_inner<S>(
    stream: S,
    addr: SocketAddr,
    dispatch_tx: mpsc::UnboundedSender<DispatchEvent>,
    class: String,
    server_port: bool,
    initiated_locally: bool,
) where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Arc<Message>>();
    let mut framed = Framed::new(stream, LinesCodec::new_with_max_length(raw::MAX_LINE_LEN));

    let Ok(conn_id) = register(&dispatch_tx, addr, outbound_tx, class, server_port, initiated_locally).await else {
        return;
    };

    loop {
        tokio::select! {
            line = framed.next() => {
                match line {
                    Some(Ok(line)) => {
                        match parse_command(&line) {
                            Ok(command) => {
                                if dispatch_tx.send(DispatchEvent::Line(conn_id, command)).is_err() {
                                    break;
                                }
                            }
                            Err(e) => debug!(%addr, error = %e, "dropping malformed line"),
                        }
                    }
                    Some(Err(e)) => {
                        warn!(%addr, error = %e, "connection read error");
                        break;
                    }
                    None => break,
                }
            }
            outbound = outbound_rx.recv() => {
                match outbound {
                    Some(msg) => {
                        if framed.send(msg.to_string()).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }
        }
    }

    let _ = dispatch_tx.send(DispatchEvent::Disconnect(conn_id));
}

async fn register(
    dispatch_tx: &mpsc::UnboundedSender<DispatchEvent>,
    addr: SocketAddr,
    outbound: mpsc::UnboundedSender<Arc<Message>>,
    class: String,
    server_port: bool,
    initiated_locally: bool,
) -> Result<crate::directory::client::ClientId, ()> {
    let (reply_tx, reply_rx) = tokio::sync::oneshot::channel();
    let handle = ConnectionHandle { addr, outbound, class, server_port, initiated_locally };
    dispatch_tx.send(DispatchEvent::Connect(handle, reply_tx)).map_err(|_| ())?;
    reply_rx.await.map_err(|_| ())
}

fn parse_command(line: &str) -> ircd_proto::Result<Command> {
    let raw = raw::parse_line(line)?;
    Command::from_raw(&raw)
}
