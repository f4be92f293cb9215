use ircd_proto::Message;

use crate::error::HandlerError;

use super::Context;

pub fn handle_ping(ctx: &mut Context, token: &str) -> Result<(), HandlerError> {
    let server_name = ctx.server_name().to_string();
    ctx.reply(Message::pong(token).with_prefix(super::server_prefix(&server_name)));
    Ok(())
}
