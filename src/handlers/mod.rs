//! Command handlers. Unlike a typical per-connection design, every
//! handler here runs synchronously inside the single dispatch task —
//! there is no `async_trait` indirection because nothing a handler
//! does blocks: all state lives in `Directory` and output is a queue push.

mod info;
mod join;
mod mode;
mod nick;
mod part;
mod ping;
mod privmsg;
mod quit;
mod register;
mod server;
mod topic;

pub use quit::process as process_quit;

use std::sync::Arc;

use ircd_proto::{Command, Message, ModeFlags, Prefix};
use tokio::sync::mpsc;
use tracing::debug;

use crate::broadcast::Outbound;
use crate::config::Config;
use crate::directory::client::ClientId;
use crate::directory::Directory;
use crate::error::HandlerError;
use crate::network::connector::ConnectRequest;
use crate::stats::CommandStats;
use crate::sync::PeerRegistry;

pub struct Context<'a> {
    pub dir: &'a mut Directory,
    pub out: &'a mut Outbound,
    pub config: &'a Config,
    pub stats: &'a mut CommandStats,
    pub peers: &'a mut PeerRegistry,
    pub connect_tx: &'a mpsc::UnboundedSender<ConnectRequest>,
    pub id: ClientId,
}

impl Context<'_> {
    pub fn server_name(&self) -> &str {
        &self.config.server.name
    }

    /// Send one message straight back to the client this command came
    /// from — the common reply path for numerics.
    pub fn reply(&self, msg: Message) {
        self.out.send_to(self.id, &Arc::new(msg));
    }

    pub fn nick(&self) -> &str {
        self.dir.client(self.id).map(|c| c.nick.as_str()).unwrap_or("*")
    }
}

/// Whether the client driving this command carries the operator flag
/// (`+o`), shared by every handler that gates on oper privilege.
pub(crate) fn is_oper(ctx: &Context) -> bool {
    ctx.dir.client(ctx.id).is_some_and(|c| c.modes.contains(ModeFlags::A_OP))
}

/// Top-level entry point the dispatch task calls for every decoded
/// command. Errors are turned into the matching numeric and sent back to
/// the originator; `Quit` is special-cased by the caller.
pub fn dispatch(ctx: &mut Context, command: Command) -> Result<(), HandlerError> {
    ctx.stats.record(command.name());
    debug!(cmd = command.name(), "dispatch");

    match command {
        Command::NICK(nickname) => nick::handle(ctx, &nickname),
        Command::USER { user, mode, realname } => register::handle_user(ctx, &user, &mode, &realname),
        Command::PING(token) => ping::handle_ping(ctx, &token),
        Command::PONG(_) => Ok(()),
        Command::QUIT(message) => Err(HandlerError::Quit(message)),
        Command::JOIN { channels, keys } => join::handle(ctx, &channels, keys.as_deref()),
        Command::PART { channels, message } => part::handle(ctx, &channels, message.as_deref()),
        Command::PRIVMSG { target, text } => privmsg::handle_privmsg(ctx, &target, &text),
        Command::NOTICE { target, text } => privmsg::handle_notice(ctx, &target, &text),
        Command::TOPIC { channel, topic } => topic::handle(ctx, &channel, topic.as_deref()),
        Command::ChannelMode { channel, modes, params } => mode::handle_channel(ctx, &channel, &modes, params),
        Command::UserMode { nick, modes, .. } => mode::handle_user(ctx, &nick, &modes),
        Command::PASS(password) => server::handle_pass(ctx, &password),
        Command::OPER(name, password) => server::handle_oper(ctx, &name, &password),
        Command::WALLOPS(text) => server::handle_wallops(ctx, &text),
        Command::KILL { nick, comment } => server::handle_kill(ctx, &nick, &comment),
        Command::SQUIT { server, comment } => server::handle_squit(ctx, &server, &comment),
        Command::SERVER { name, hopcount, info } => server::handle_server(ctx, &name, hopcount, &info),
        Command::ISERVER { name, hopcount, token, info } => server::handle_iserver(ctx, &name, hopcount, token, &info),
        Command::NJOIN { channel, nicks } => server::handle_njoin(ctx, &channel, &nicks),
        Command::ACK { cmd, target, channel } => server::handle_ack(ctx, &cmd, &target, channel.as_deref()),
        Command::CONNECT { target, port, remote } => server::handle_connect(ctx, &target, &port, remote.as_deref()),
        Command::IMODE { id, target, modes, params } => server::handle_imode(ctx, id, &target, &modes, params),
        Command::ITOPIC { id, channel, topic } => server::handle_itopic(ctx, id, &channel, &topic),
        Command::INUM { id, numeric, params } => server::handle_inum(ctx, id, numeric, params),
        Command::IWALLOPS { id, text } => server::handle_iwallops(ctx, id, &text),
        Command::LUSERS => info::handle_lusers(ctx),
        Command::VERSION(_) => info::handle_version(ctx),
        Command::ADMIN(_) => info::handle_admin(ctx),
        Command::TIME(_) => info::handle_time(ctx),
        Command::INFO(_) => info::handle_info(ctx),
        Command::MOTD(_) => info::handle_motd(ctx),
        Command::REHASH => {
            if is_oper(ctx) {
                Err(HandlerError::Rehash)
            } else {
                Err(HandlerError::AccessDenied)
            }
        }
        other => Err(HandlerError::UnknownCommand(other.name().to_string())),
    }
}

pub(crate) fn server_prefix(server_name: &str) -> Prefix {
    Prefix::server(server_name.to_string())
}
