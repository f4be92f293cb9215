//! Applies a parsed channel MODE batch against a `Channel`, producing the
//! list of changes that actually took effect for the broadcast layer.

use std::time::Instant;

use ircd_proto::mode::{ModeToken, Sign};
use ircd_proto::ModeFlags;

use crate::directory::channel::{Channel, ListEntry, ListKind};
use crate::directory::client::ClientId;
use crate::error::ChannelError;

use super::{find_letter, AppliedMode, MEMBER_MODES};

/// Apply one token against the channel, given the acting client (for
/// ban/exempt/invex `set_by` stamps) and a nick resolver for `o`/`h`/`v`
/// targets. Returns the applied change plus any masks cancelled as a
/// side effect.
pub fn apply_channel_token(
    chan: &mut Channel,
    token: &ModeToken,
    actor_nick: &str,
    resolve_member: impl Fn(&str) -> Option<ClientId>,
    now: Instant,
) -> Result<(Vec<AppliedMode>, Vec<String>), ChannelError> {
    if let Some(member_letter) = find_letter(MEMBER_MODES, token.letter) {
        let target_nick = token.param.clone().ok_or(ChannelError::UnknownMode(token.letter, chan.name.clone()))?;
        let target = resolve_member(&target_nick).ok_or_else(|| ChannelError::UserNotInChannel(target_nick.clone()))?;
        let member = chan.member_mut(target).ok_or_else(|| ChannelError::UserNotInChannel(target_nick.clone()))?;
        match token.sign {
            Sign::Add => member.modes.insert(member_letter.flag),
            Sign::Remove => member.modes.remove(member_letter.flag),
        }
        return Ok((vec![AppliedMode { sign: token.sign, letter: token.letter, param: Some(target_nick) }], vec![]));
    }

    match token.letter {
        'b' | 'e' | 'I' => apply_list_mode(chan, token, actor_nick, now),
        'k' => apply_key_mode(chan, token),
        'l' => apply_limit_mode(chan, token),
        _ => apply_flag_mode(chan, token),
    }
}

fn list_kind(letter: char) -> ListKind {
    match letter {
        'b' => ListKind::Ban,
        'e' => ListKind::Except,
        _ => ListKind::InviteExempt,
    }
}

fn list_for<'a>(chan: &'a mut Channel, letter: char) -> &'a mut Vec<ListEntry> {
    match letter {
        'b' => &mut chan.bans,
        'e' => &mut chan.excepts,
        _ => &mut chan.invex,
    }
}

fn apply_list_mode(
    chan: &mut Channel,
    token: &ModeToken,
    actor_nick: &str,
    now: Instant,
) -> Result<(Vec<AppliedMode>, Vec<String>), ChannelError> {
    let mask = token.param.clone().ok_or(ChannelError::UnknownMode(token.letter, chan.name.clone()))?;
    let kind = list_kind(token.letter);
    match token.sign {
        Sign::Add => {
            let list = list_for(chan, token.letter);
            let removed = Channel::add_mask_with_cancellation(kind, list, &mask, actor_nick, now);
            let mut applied = vec![AppliedMode { sign: Sign::Add, letter: token.letter, param: Some(mask) }];
            applied.extend(removed.iter().map(|m| AppliedMode {
                sign: Sign::Remove,
                letter: token.letter,
                param: Some(m.clone()),
            }));
            Ok((applied, removed))
        }
        Sign::Remove => {
            let list = list_for(chan, token.letter);
            let before = list.len();
            list.retain(|e| e.mask != mask);
            if list.len() == before {
                return Ok((vec![], vec![]));
            }
            Ok((vec![AppliedMode { sign: Sign::Remove, letter: token.letter, param: Some(mask) }], vec![]))
        }
    }
}

fn apply_key_mode(chan: &mut Channel, token: &ModeToken) -> Result<(Vec<AppliedMode>, Vec<String>), ChannelError> {
    match token.sign {
        Sign::Add => {
            let key = token.param.clone().ok_or(ChannelError::UnknownMode('k', chan.name.clone()))?;
            chan.key = Some(key.clone());
            chan.modes.insert(ModeFlags::A_KEYSET);
            Ok((vec![AppliedMode { sign: Sign::Add, letter: 'k', param: Some(key) }], vec![]))
        }
        Sign::Remove => {
            if chan.key.is_none() {
                return Ok((vec![], vec![]));
            }
            chan.key = None;
            chan.modes.remove(ModeFlags::A_KEYSET);
            Ok((vec![AppliedMode { sign: Sign::Remove, letter: 'k', param: Some("*".into()) }], vec![]))
        }
    }
}

fn apply_limit_mode(chan: &mut Channel, token: &ModeToken) -> Result<(Vec<AppliedMode>, Vec<String>), ChannelError> {
    match token.sign {
        Sign::Add => {
            let limit: u32 =
                token.param.as_deref().and_then(|p| p.parse().ok()).ok_or(ChannelError::UnknownMode('l', chan.name.clone()))?;
            chan.limit = Some(limit);
            chan.modes.insert(ModeFlags::A_LIMIT);
            Ok((vec![AppliedMode { sign: Sign::Add, letter: 'l', param: Some(limit.to_string()) }], vec![]))
        }
        Sign::Remove => {
            if chan.limit.is_none() {
                return Ok((vec![], vec![]));
            }
            chan.limit = None;
            chan.modes.remove(ModeFlags::A_LIMIT);
            Ok((vec![AppliedMode { sign: Sign::Remove, letter: 'l', param: None }], vec![]))
        }
    }
}

fn apply_flag_mode(chan: &mut Channel, token: &ModeToken) -> Result<(Vec<AppliedMode>, Vec<String>), ChannelError> {
    let letter = find_letter(super::CHANNEL_MODES, token.letter).ok_or(ChannelError::UnknownMode(token.letter, chan.name.clone()))?;
    match token.sign {
        Sign::Add => chan.modes.insert(letter.flag),
        Sign::Remove => chan.modes.remove(letter.flag),
    }
    Ok((vec![AppliedMode { sign: token.sign, letter: token.letter, param: None }], vec![]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::channel::ChannelId;

    #[test]
    fn applying_key_and_limit_sets_channel_fields() {
        let mut chan = Channel::new("#y", ModeFlags::NONE);
        let now = Instant::now();
        let tokens = super::super::tokenize("+kl", vec!["secret".into(), "50".into()], super::super::CHANNEL_MODES);
        let mut all_applied = vec![];
        for t in &tokens {
            let (applied, _) = apply_channel_token(&mut chan, t, "alice", |_| None, now).unwrap();
            all_applied.extend(applied);
        }
        assert_eq!(chan.key.as_deref(), Some("secret"));
        assert_eq!(chan.limit, Some(50));
        assert_eq!(all_applied.len(), 2);
    }

    #[test]
    fn op_mode_requires_resolvable_target() {
        let mut chan = Channel::new("#y", ModeFlags::NONE);
        let now = Instant::now();
        let client = ClientId(1);
        chan.add_member(client, ModeFlags::NONE, now);
        let tokens = super::super::tokenize("+o", vec!["bob".into()], super::super::MEMBER_MODES);
        let (applied, _) = apply_channel_token(&mut chan, &tokens[0], "alice", |n| if n == "bob" { Some(client) } else { None }, now).unwrap();
        assert_eq!(applied[0].letter, 'o');
        assert!(chan.member(client).unwrap().modes.contains(ModeFlags::A_OP));
    }

    #[test]
    fn ban_add_cancels_narrower_existing_mask() {
        let mut chan = Channel::new("#y", ModeFlags::NONE);
        let now = Instant::now();
        chan.bans.push(ListEntry { mask: "bob!*@host.example.com".into(), set_by: "alice".into(), set_at: now });
        let tokens = super::super::tokenize("+b", vec!["*!*@*.example.com".into()], super::super::CHANNEL_MODES);
        let (applied, removed) = apply_list_mode(&mut chan, &tokens[0], "alice", now).unwrap();
        assert_eq!(removed, vec!["bob!*@host.example.com".to_string()]);
        assert_eq!(applied.len(), 2);
        assert_eq!(chan.bans.len(), 1);
    }
}
