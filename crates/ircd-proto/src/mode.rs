//! The shared mode-flag bitset.
//!
//! Unlike a split `ChannelMode`/`UserMode` pair, spanircd keeps one bitset
//! whose bit meaning depends on the entity kind it's read against (user,
//! channel, channel-member, link) — the wire-level mode letters and the
//! in-memory bits are related but not 1:1, so `ModeFlags` is a plain `u64`
//! newtype rather than a derive-per-context enum.

use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign, BitXor, Not};

macro_rules! mode_flags {
    ($($name:ident = $bit:expr),+ $(,)?) => {
        #[derive(Copy, Clone, Eq, PartialEq, Default, Hash)]
        pub struct ModeFlags(u64);

        impl ModeFlags {
            pub const NONE: ModeFlags = ModeFlags(0);
            $(pub const $name: ModeFlags = ModeFlags(1u64 << $bit);)+

            pub const fn bits(self) -> u64 {
                self.0
            }

            pub const fn from_bits(bits: u64) -> Self {
                ModeFlags(bits)
            }

            pub fn contains(self, other: ModeFlags) -> bool {
                self.0 & other.0 == other.0
            }

            pub fn insert(&mut self, other: ModeFlags) {
                self.0 |= other.0;
            }

            pub fn remove(&mut self, other: ModeFlags) {
                self.0 &= !other.0;
            }

            pub fn is_empty(self) -> bool {
                self.0 == 0
            }

            fn name(self) -> Option<&'static str> {
                $(if self == ModeFlags::$name { return Some(stringify!($name)); })+
                None
            }
        }
    };
}

mode_flags! {
    A_ISON = 0,
    A_SERVER = 1,
    A_OP = 2,
    A_HALFOP = 3,
    A_ADMIN = 4,
    A_VOICE = 5,
    A_INVISIBLE = 6,
    A_WALLOP = 7,
    A_RESTRICTED = 8,
    A_AWAY = 9,
    A_MASKED = 10,
    A_SSL = 11,
    A_MULTI = 12,
    A_SECRET = 13,
    A_PRIVATE = 14,
    A_MODERATED = 15,
    A_NOOUTSIDE = 16,
    A_TOPICLOCK = 17,
    A_INVITEONLY = 18,
    A_LIMIT = 19,
    A_KEYSET = 20,
    A_ANONYMOUS = 21,
    A_QUIET = 22,
    A_DENIED = 23,
    A_EXEMPT = 24,
    A_INVITED = 25,
    A_NOCOLOR = 26,
    A_ASCIINICK = 27,
    A_REOP = 28,
    A_SERVICE = 29,
    A_PINGED = 30,
    A_ISUPLINK = 31,
}

impl BitOr for ModeFlags {
    type Output = ModeFlags;
    fn bitor(self, rhs: Self) -> Self {
        ModeFlags(self.0 | rhs.0)
    }
}

impl BitOrAssign for ModeFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for ModeFlags {
    type Output = ModeFlags;
    fn bitand(self, rhs: Self) -> Self {
        ModeFlags(self.0 & rhs.0)
    }
}

impl BitXor for ModeFlags {
    type Output = ModeFlags;
    fn bitxor(self, rhs: Self) -> Self {
        ModeFlags(self.0 ^ rhs.0)
    }
}

impl Not for ModeFlags {
    type Output = ModeFlags;
    fn not(self) -> Self {
        ModeFlags(!self.0)
    }
}

impl fmt::Debug for ModeFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(n) => write!(f, "ModeFlags::{n}"),
            None => write!(f, "ModeFlags({:#x})", self.0),
        }
    }
}

/// Direction of a single token in a `[+|-]chars` mode string.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Sign {
    Add,
    Remove,
}

/// One parsed `+x`/`-x` letter, with its parameter slot already pulled if
/// the letter is known to require one (see [`parse_mode_string`]).
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct ModeToken {
    pub sign: Sign,
    pub letter: char,
    pub param: Option<String>,
}

/// Tokenize a mode-change line into signed letters, consuming a parameter
/// from `params` whenever `takes_param` says the letter needs one for this
/// sign. Unknown letters still tokenize; the caller's registry decides
/// whether to reject them.
pub fn parse_mode_string<F>(modes: &str, mut params: std::vec::IntoIter<String>, takes_param: F) -> Vec<ModeToken>
where
    F: Fn(char, Sign) -> bool,
{
    let mut out = Vec::new();
    let mut sign = Sign::Add;
    for c in modes.chars() {
        match c {
            '+' => sign = Sign::Add,
            '-' => sign = Sign::Remove,
            letter => {
                let param = if takes_param(letter, sign) {
                    params.next()
                } else {
                    None
                };
                out.push(ModeToken { sign, letter, param });
            }
        }
    }
    out
}

/// Prefix character for a membership flag, highest privilege first.
pub fn prefix_char(flags: ModeFlags) -> Option<char> {
    if flags.contains(ModeFlags::A_ADMIN) {
        Some('&')
    } else if flags.contains(ModeFlags::A_OP) {
        Some('@')
    } else if flags.contains(ModeFlags::A_HALFOP) {
        Some('%')
    } else if flags.contains(ModeFlags::A_VOICE) {
        Some('+')
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_contains() {
        let mut f = ModeFlags::NONE;
        f.insert(ModeFlags::A_OP);
        assert!(f.contains(ModeFlags::A_OP));
        assert!(!f.contains(ModeFlags::A_VOICE));
    }

    #[test]
    fn remove_clears_only_that_bit() {
        let mut f = ModeFlags::A_OP | ModeFlags::A_VOICE;
        f.remove(ModeFlags::A_OP);
        assert!(!f.contains(ModeFlags::A_OP));
        assert!(f.contains(ModeFlags::A_VOICE));
    }

    #[test]
    fn parse_simple_toggle() {
        let toks = parse_mode_string("+nt", vec![].into_iter(), |_, _| false);
        assert_eq!(
            toks,
            vec![
                ModeToken { sign: Sign::Add, letter: 'n', param: None },
                ModeToken { sign: Sign::Add, letter: 't', param: None },
            ]
        );
    }

    #[test]
    fn parse_pulls_param_only_when_claimed() {
        let params = vec!["secret".to_string(), "50".to_string()];
        let toks = parse_mode_string("+kl", params.into_iter(), |c, s| {
            matches!((c, s), ('k', Sign::Add) | ('l', Sign::Add))
        });
        assert_eq!(toks[0].param.as_deref(), Some("secret"));
        assert_eq!(toks[1].param.as_deref(), Some("50"));
    }

    #[test]
    fn prefix_char_picks_highest_privilege() {
        let f = ModeFlags::A_OP | ModeFlags::A_VOICE;
        assert_eq!(prefix_char(f), Some('@'));
    }
}
