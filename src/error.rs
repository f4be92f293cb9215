//! Error types for the command pipeline.
//!
//! Each enum mirrors an RFC error family and carries both an `error_code()`
//! for metrics/logging and a `to_irc_reply()` that produces the wire
//! numeric.

use ircd_proto::{Message, Response};
use thiserror::Error;

pub type HandlerResult<T> = Result<T, HandlerError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HandlerError {
    #[error("need more params")]
    NeedMoreParams,
    #[error("no text to send")]
    NoTextToSend,
    #[error("nickname in use: {0}")]
    NicknameInUse(String),
    #[error("erroneous nickname: {0}")]
    ErroneousNickname(String),
    #[error("not registered")]
    NotRegistered,
    #[error("access denied")]
    AccessDenied,
    #[error("already registered")]
    AlreadyRegistered,
    #[error("no such nick: {0}")]
    NoSuchNick(String),
    #[error("no such server: {0}")]
    NoSuchServer(String),
    #[error("unknown command: {0}")]
    UnknownCommand(String),
    #[error("quit: {0:?}")]
    Quit(Option<String>),
    #[error("internal: {0}")]
    Internal(String),
    #[error("password mismatch")]
    PasswordMismatch,
    #[error("not an operator host")]
    NoOperHost,
    #[error("banned: {0}")]
    YoureBannedCreep(String),
    #[error("cannot kill a server")]
    CantKillServer,
    #[error("no motd")]
    NoMotd,
    /// Authorized REHASH request; carries no wire reply of its own since
    /// the caller needs `&mut Config` to act on it (see `dispatch::handle_event`).
    #[error("rehash")]
    Rehash,
}

impl HandlerError {
    pub fn error_code(&self) -> &'static str {
        match self {
            HandlerError::NeedMoreParams => "need_more_params",
            HandlerError::NoTextToSend => "no_text_to_send",
            HandlerError::NicknameInUse(_) => "nickname_in_use",
            HandlerError::ErroneousNickname(_) => "erroneous_nickname",
            HandlerError::NotRegistered => "not_registered",
            HandlerError::AccessDenied => "access_denied",
            HandlerError::AlreadyRegistered => "already_registered",
            HandlerError::NoSuchNick(_) => "no_such_nick",
            HandlerError::NoSuchServer(_) => "no_such_server",
            HandlerError::UnknownCommand(_) => "unknown_command",
            HandlerError::Quit(_) => "quit",
            HandlerError::Internal(_) => "internal",
            HandlerError::PasswordMismatch => "passwd_mismatch",
            HandlerError::NoOperHost => "no_oper_host",
            HandlerError::YoureBannedCreep(_) => "youre_banned_creep",
            HandlerError::CantKillServer => "cant_kill_server",
            HandlerError::NoMotd => "no_motd",
            HandlerError::Rehash => "rehash",
        }
    }

    pub fn to_irc_reply(&self, server_name: &str, nick: &str, cmd_name: &str) -> Option<Message> {
        let me = server_name.to_string();
        let nick = nick.to_string();
        let reply = |code: Response, params: Vec<String>| {
            let mut full = vec![nick.clone()];
            full.extend(params);
            Message::numeric(code, full).with_prefix(ircd_proto::Prefix::server(me.clone()))
        };

        Some(match self {
            HandlerError::NeedMoreParams => {
                reply(Response::ERR_NEEDMOREPARAMS, vec![cmd_name.to_string(), "Not enough parameters".into()])
            }
            HandlerError::NoTextToSend => reply(Response::ERR_NOTEXTTOSEND, vec!["No text to send".into()]),
            HandlerError::NicknameInUse(n) => {
                reply(Response::ERR_NICKNAMEINUSE, vec![n.clone(), "Nickname is already in use".into()])
            }
            HandlerError::ErroneousNickname(n) => {
                reply(Response::ERR_ERRONEUSNICKNAME, vec![n.clone(), "Erroneous nickname".into()])
            }
            HandlerError::NotRegistered => {
                reply(Response::ERR_NOTREGISTERED, vec!["You have not registered".into()])
            }
            HandlerError::AccessDenied => reply(Response::ERR_NOPRIVILEGES, vec!["Permission Denied".into()]),
            HandlerError::AlreadyRegistered => {
                reply(Response::ERR_ALREADYREGISTERED, vec!["You may not reregister".into()])
            }
            HandlerError::NoSuchNick(n) => {
                reply(Response::ERR_NOSUCHNICK, vec![n.clone(), "No such nick/channel".into()])
            }
            HandlerError::NoSuchServer(n) => {
                reply(Response::ERR_NOSUCHSERVER, vec![n.clone(), "No such server".into()])
            }
            HandlerError::UnknownCommand(c) => {
                reply(Response::ERR_UNKNOWNCOMMAND, vec![c.clone(), "Unknown command".into()])
            }
            HandlerError::PasswordMismatch => {
                reply(Response::ERR_PASSWDMISMATCH, vec!["Password incorrect".into()])
            }
            HandlerError::NoOperHost => reply(Response::ERR_NOOPERHOST, vec!["No O-lines for your host".into()]),
            HandlerError::YoureBannedCreep(reason) => reply(Response::ERR_YOUREBANNEDCREEP, vec![reason.clone()]),
            HandlerError::CantKillServer => {
                reply(Response::ERR_CANTKILLSERVER, vec!["You cannot kill a server".into()])
            }
            HandlerError::NoMotd => reply(Response::ERR_NOMOTD, vec!["MOTD File is missing".into()]),
            HandlerError::Quit(_) | HandlerError::Internal(_) | HandlerError::Rehash => return None,
        })
    }
}

pub type ChannelResult<T> = Result<T, ChannelError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChannelError {
    #[error("not on channel")]
    NotOnChannel,
    #[error("chanop privileges needed")]
    ChanOpPrivsNeeded,
    #[error("user not in channel: {0}")]
    UserNotInChannel(String),
    #[error("user already on channel: {0}")]
    UserOnChannel(String),
    #[error("channel held")]
    ChannelHeld,
    #[error("banned from channel")]
    BannedFromChan,
    #[error("invite only channel")]
    InviteOnlyChan,
    #[error("channel is full")]
    ChannelIsFull,
    #[error("bad channel key")]
    BadChannelKey,
    #[error("unknown mode {0} on {1}")]
    UnknownMode(char, String),
    #[error("no such channel: {0}")]
    NoSuchChannel(String),
    #[error("too many channels")]
    TooManyChannels(String),
}

impl ChannelError {
    pub fn error_code(&self) -> &'static str {
        match self {
            ChannelError::NotOnChannel => "not_on_channel",
            ChannelError::ChanOpPrivsNeeded => "chanop_privs_needed",
            ChannelError::UserNotInChannel(_) => "user_not_in_channel",
            ChannelError::UserOnChannel(_) => "user_on_channel",
            ChannelError::ChannelHeld => "channel_held",
            ChannelError::BannedFromChan => "banned_from_chan",
            ChannelError::InviteOnlyChan => "invite_only_chan",
            ChannelError::ChannelIsFull => "channel_is_full",
            ChannelError::BadChannelKey => "bad_channel_key",
            ChannelError::UnknownMode(..) => "unknown_mode",
            ChannelError::NoSuchChannel(_) => "no_such_channel",
            ChannelError::TooManyChannels(_) => "too_many_channels",
        }
    }

    pub fn to_irc_reply(&self, server_name: &str, nick: &str, channel: &str) -> Message {
        let me = server_name.to_string();
        let nick = nick.to_string();
        let reply = |code: Response, params: Vec<String>| {
            let mut full = vec![nick.clone()];
            full.extend(params);
            Message::numeric(code, full).with_prefix(ircd_proto::Prefix::server(me.clone()))
        };

        match self {
            ChannelError::NotOnChannel => {
                reply(Response::ERR_NOTONCHANNEL, vec![channel.to_string(), "You're not on that channel".into()])
            }
            ChannelError::ChanOpPrivsNeeded => {
                reply(Response::ERR_CHANOPRIVSNEEDED, vec![channel.to_string(), "You're not channel operator".into()])
            }
            ChannelError::UserNotInChannel(u) => reply(
                Response::ERR_USERNOTINCHANNEL,
                vec![u.clone(), channel.to_string(), "They aren't on that channel".into()],
            ),
            ChannelError::UserOnChannel(u) => {
                reply(Response::ERR_USERONCHANNEL, vec![u.clone(), channel.to_string(), "is already on channel".into()])
            }
            ChannelError::ChannelHeld | ChannelError::NoSuchChannel(_) => {
                reply(Response::ERR_NOSUCHCHANNEL, vec![channel.to_string(), "No such channel".into()])
            }
            ChannelError::BannedFromChan => {
                reply(Response::ERR_BANNEDFROMCHAN, vec![channel.to_string(), "Cannot join channel (+b)".into()])
            }
            ChannelError::InviteOnlyChan => {
                reply(Response::ERR_INVITEONLYCHAN, vec![channel.to_string(), "Cannot join channel (+i)".into()])
            }
            ChannelError::ChannelIsFull => {
                reply(Response::ERR_CHANNELISFULL, vec![channel.to_string(), "Cannot join channel (+l)".into()])
            }
            ChannelError::BadChannelKey => {
                reply(Response::ERR_BADCHANNELKEY, vec![channel.to_string(), "Cannot join channel (+k)".into()])
            }
            ChannelError::UnknownMode(c, chan) => {
                reply(Response::ERR_UNKNOWNMODE, vec![c.to_string(), chan.clone(), "is unknown mode char".into()])
            }
            ChannelError::TooManyChannels(chan) => {
                reply(Response::ERR_TOOMANYCHANNELS, vec![chan.clone(), "You have joined too many channels".into()])
            }
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ModeError {
    #[error("unknown mode letter {0}")]
    UnknownLetter(char),
    #[error("missing parameter for mode {0}")]
    MissingParam(char),
    #[error("mode change vetoed: {0}")]
    Vetoed(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LinkError {
    #[error("handshake failed: {0}")]
    HandshakeFailed(String),
    #[error("password mismatch")]
    PasswordMismatch,
    #[error("server name collision: {0}")]
    NameCollision(String),
    #[error("link flood: {0}")]
    Flood(String),
    #[error("max sendq exceeded")]
    SendQExceeded,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("failed to read config {0}: {1}")]
    Io(String, String),
    #[error("failed to parse config: {0}")]
    Parse(String),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nickname_in_use_renders_433() {
        let err = HandlerError::NicknameInUse("bob".into());
        let msg = err.to_irc_reply("irc.example", "alice", "NICK").unwrap();
        assert_eq!(msg.to_string(), ":irc.example 433 alice bob :Nickname is already in use");
    }

    #[test]
    fn quit_has_no_wire_reply() {
        assert!(HandlerError::Quit(Some("bye".into())).to_irc_reply("irc.example", "alice", "QUIT").is_none());
    }

    #[test]
    fn channel_error_renders_482() {
        let err = ChannelError::ChanOpPrivsNeeded;
        let msg = err.to_irc_reply("irc.example", "alice", "#chan");
        assert_eq!(msg.to_string(), ":irc.example 482 alice #chan :You're not channel operator");
    }
}
