use std::sync::Arc;
use std::time::Instant;

use ircd_proto::Message;

use crate::collision::{resolve_nick_collision, Policy, Resolution};
use crate::error::HandlerError;

use super::Context;

/// A plain client `/nick` request only ever takes a free (or
/// expired-phantom) key or rejects; the kill-both/rename collision policy
/// is reserved for a peer introducing a nick we already hold (see
/// `crate::collision`), which this handler never triggers on its own.
pub fn handle(ctx: &mut Context, new_nick: &str) -> Result<(), HandlerError> {
    if !is_valid_nick(new_nick, ctx.config.limits.nick_len) {
        return Err(HandlerError::ErroneousNickname(new_nick.to_string()));
    }

    if let Some(existing) = ctx.dir.find_client(new_nick, false) {
        if existing == ctx.id {
            return Ok(());
        }
        let now = Instant::now();
        let resolution = resolve_nick_collision(ctx.dir, new_nick, "", Policy::KillBoth, now);
        if !matches!(resolution, Resolution::TookOverExpiredKey) {
            return Err(HandlerError::NicknameInUse(new_nick.to_string()));
        }
        // `existing` was an expired phantom; the key is free to take.
    }

    let was_unregistered = ctx.dir.client(ctx.id).map(|c| c.nick_lower.starts_with('*')).unwrap_or(true);
    let has_ident = ctx.dir.client(ctx.id).map(|c| !c.ident.is_empty()).unwrap_or(false);
    let old_mask = (!was_unregistered).then(|| ctx.dir.client(ctx.id).map(|c| c.mask())).flatten();

    let hold_period = ctx.config.limits.hold_period;
    let server_name = ctx.server_name().to_string();
    let now = std::time::Instant::now();
    ctx.dir.rename(ctx.id, new_nick, now, hold_period, &server_name);

    if let Some(old_mask) = old_mask {
        let notice = Message::nick(new_nick).with_prefix(ircd_proto::Prefix::parse(&old_mask));
        let msg = Arc::new(notice);
        let channels = ctx.dir.client(ctx.id).map(|c| c.channels.clone()).unwrap_or_default();
        for chan_id in channels {
            crate::broadcast::sendto_channel(ctx.dir, ctx.out, chan_id, msg.clone(), None);
        }
    } else if was_unregistered && has_ident {
        super::register::send_welcome_burst(ctx)?;
    }
    Ok(())
}

pub fn is_valid_nick(nick: &str, max_len: usize) -> bool {
    if nick.is_empty() || nick.len() > max_len {
        return false;
    }
    let mut chars = nick.chars();
    let Some(first) = chars.next() else { return false };
    if !(first.is_ascii_alphabetic() || "[]\\`_^{|}".contains(first)) {
        return false;
    }
    chars.all(|c| c.is_ascii_alphanumeric() || "[]\\`_^{|}-".contains(c))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_nick_starting_with_digit() {
        assert!(!is_valid_nick("1abc", 30));
    }

    #[test]
    fn accepts_rfc1459_special_chars() {
        assert!(is_valid_nick("[alice]_{x}", 30));
    }

    #[test]
    fn rejects_overlength_nick() {
        assert!(!is_valid_nick("a".repeat(40).as_str(), 30));
    }
}
