//! Mode algebra: per-letter handlers over the shared `ModeFlags` bitset,
//! shared by user modes and channel modes.

pub mod channel;
pub mod user;

use ircd_proto::mode::{ModeToken, Sign};
use ircd_proto::ModeFlags;

/// Max mode changes a single MODE command processes; RFC 2812's 512-byte
/// line limit makes a command with more than this many tokens malformed
/// on a normal link, so excess tokens are silently dropped rather than
/// processed.
pub const MAX_MODES_PER_COMMAND: usize = 20;

/// One applied mode change, ready for the output batch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppliedMode {
    pub sign: Sign,
    pub letter: char,
    pub param: Option<String>,
}

/// Groups applied changes by sign the way the wire format wants them
/// (`+ntk secret` rather than `+n +t +k secret`).
pub fn format_mode_batch(applied: &[AppliedMode]) -> (String, Vec<String>) {
    let mut letters = String::new();
    let mut params = Vec::new();
    let mut last_sign: Option<Sign> = None;
    for m in applied {
        if last_sign != Some(m.sign) {
            letters.push(match m.sign {
                Sign::Add => '+',
                Sign::Remove => '-',
            });
            last_sign = Some(m.sign);
        }
        letters.push(m.letter);
        if let Some(p) = &m.param {
            params.push(p.clone());
        }
    }
    (letters, params)
}

/// A single mode letter's binding: which flag it claims, whether it takes
/// a parameter for a given sign, and whether it is a list mode (b/e/I).
pub struct ModeLetter {
    pub letter: char,
    pub flag: ModeFlags,
    pub takes_param: fn(Sign) -> bool,
    pub is_list: bool,
}

impl ModeLetter {
    const fn simple(letter: char, flag: ModeFlags) -> Self {
        ModeLetter { letter, flag, takes_param: |_| false, is_list: false }
    }
}

fn no_param(_: Sign) -> bool {
    false
}

fn add_only_param(sign: Sign) -> bool {
    matches!(sign, Sign::Add)
}

fn always_param(_: Sign) -> bool {
    true
}

/// Channel mode letters (channel subset).
pub const CHANNEL_MODES: &[ModeLetter] = &[
    ModeLetter::simple('s', ModeFlags::A_SECRET),
    ModeLetter::simple('p', ModeFlags::A_PRIVATE),
    ModeLetter::simple('m', ModeFlags::A_MODERATED),
    ModeLetter::simple('n', ModeFlags::A_NOOUTSIDE),
    ModeLetter::simple('t', ModeFlags::A_TOPICLOCK),
    ModeLetter::simple('i', ModeFlags::A_INVITEONLY),
    ModeLetter::simple('a', ModeFlags::A_ANONYMOUS),
    ModeLetter::simple('q', ModeFlags::A_QUIET),
    ModeLetter::simple('R', ModeFlags::A_REOP),
    ModeLetter::simple('c', ModeFlags::A_NOCOLOR),
    ModeLetter { letter: 'l', flag: ModeFlags::A_LIMIT, takes_param: add_only_param, is_list: false },
    ModeLetter { letter: 'k', flag: ModeFlags::A_KEYSET, takes_param: always_param, is_list: false },
    ModeLetter { letter: 'b', flag: ModeFlags::NONE, takes_param: always_param, is_list: true },
    ModeLetter { letter: 'e', flag: ModeFlags::NONE, takes_param: always_param, is_list: true },
    ModeLetter { letter: 'I', flag: ModeFlags::NONE, takes_param: always_param, is_list: true },
];

/// Per-member privilege letters, applied to a `Member`'s modes rather than
/// the channel's own bitset.
pub const MEMBER_MODES: &[ModeLetter] = &[
    ModeLetter { letter: 'o', flag: ModeFlags::A_OP, takes_param: always_param, is_list: false },
    ModeLetter { letter: 'h', flag: ModeFlags::A_HALFOP, takes_param: always_param, is_list: false },
    ModeLetter { letter: 'v', flag: ModeFlags::A_VOICE, takes_param: always_param, is_list: false },
];

/// User mode letters.
pub const USER_MODES: &[ModeLetter] = &[
    ModeLetter::simple('i', ModeFlags::A_INVISIBLE),
    ModeLetter::simple('w', ModeFlags::A_WALLOP),
    ModeLetter::simple('a', ModeFlags::A_AWAY),
    ModeLetter { letter: 'o', flag: ModeFlags::A_OP, takes_param: no_param, is_list: false },
];

pub fn find_letter(table: &[ModeLetter], letter: char) -> Option<&ModeLetter> {
    table.iter().find(|m| m.letter == letter)
}

pub fn takes_param(table: &[ModeLetter], letter: char, sign: Sign) -> bool {
    find_letter(table, letter).is_some_and(|m| (m.takes_param)(sign))
}

/// Convenience: turn a raw mode-string + trailing params into tokens using
/// a given letter table's parameter rules.
pub fn tokenize(modes: &str, params: Vec<String>, table: &[ModeLetter]) -> Vec<ModeToken> {
    ircd_proto::mode::parse_mode_string(modes, params.into_iter(), |c, s| takes_param(table, c, s))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ircd_proto::mode::Sign;

    #[test]
    fn format_mode_batch_groups_by_sign() {
        let applied = vec![
            AppliedMode { sign: Sign::Add, letter: 'n', param: None },
            AppliedMode { sign: Sign::Add, letter: 't', param: None },
            AppliedMode { sign: Sign::Add, letter: 'k', param: Some("secret".into()) },
            AppliedMode { sign: Sign::Remove, letter: 'i', param: None },
        ];
        let (letters, params) = format_mode_batch(&applied);
        assert_eq!(letters, "+ntk-i");
        assert_eq!(params, vec!["secret".to_string()]);
    }

    #[test]
    fn list_modes_always_take_a_param() {
        assert!(takes_param(CHANNEL_MODES, 'b', Sign::Add));
        assert!(takes_param(CHANNEL_MODES, 'b', Sign::Remove));
    }

    #[test]
    fn limit_only_takes_a_param_when_adding() {
        assert!(takes_param(CHANNEL_MODES, 'l', Sign::Add));
        assert!(!takes_param(CHANNEL_MODES, 'l', Sign::Remove));
    }
}
