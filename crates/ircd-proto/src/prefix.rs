//! IRC message prefix: identifies the origin of a message.

use std::fmt;

/// Either a server name or a user's `nick!user@host` mask.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub enum Prefix {
    ServerName(String),
    Nickname(String, Option<String>, Option<String>),
}

impl Prefix {
    pub fn server(name: impl Into<String>) -> Self {
        Prefix::ServerName(name.into())
    }

    pub fn nick(nick: impl Into<String>, user: impl Into<String>, host: impl Into<String>) -> Self {
        Prefix::Nickname(nick.into(), Some(user.into()), Some(host.into()))
    }

    /// Lenient parse; does not validate components, matching how IRC servers
    /// accept whatever the wire hands them for a prefix.
    pub fn parse(s: &str) -> Self {
        if let Some(bang) = s.find('!') {
            let nick = &s[..bang];
            let rest = &s[bang + 1..];
            if let Some(at) = rest.find('@') {
                return Prefix::Nickname(
                    nick.to_string(),
                    Some(rest[..at].to_string()),
                    Some(rest[at + 1..].to_string()),
                );
            }
            return Prefix::Nickname(nick.to_string(), Some(rest.to_string()), None);
        }
        if let Some(at) = s.find('@') {
            return Prefix::Nickname(s[..at].to_string(), None, Some(s[at + 1..].to_string()));
        }
        if s.contains('.') {
            Prefix::ServerName(s.to_string())
        } else {
            Prefix::Nickname(s.to_string(), None, None)
        }
    }

    pub fn nickname(&self) -> Option<&str> {
        match self {
            Prefix::Nickname(n, ..) => Some(n),
            Prefix::ServerName(_) => None,
        }
    }
}

impl fmt::Display for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Prefix::ServerName(name) => write!(f, "{name}"),
            Prefix::Nickname(nick, user, host) => {
                write!(f, "{nick}")?;
                if let Some(u) = user {
                    write!(f, "!{u}")?;
                }
                if let Some(h) = host {
                    write!(f, "@{h}")?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_nickmask() {
        let p = Prefix::parse("alice!a@host.example");
        assert_eq!(
            p,
            Prefix::Nickname(
                "alice".into(),
                Some("a".into()),
                Some("host.example".into())
            )
        );
    }

    #[test]
    fn parses_server_name() {
        assert_eq!(
            Prefix::parse("irc.example.com"),
            Prefix::ServerName("irc.example.com".into())
        );
    }

    #[test]
    fn round_trips_display() {
        let p = Prefix::nick("bob", "b", "host");
        assert_eq!(p.to_string(), "bob!b@host");
    }
}
