//! Applies a parsed user MODE batch against a `Client`.

use ircd_proto::mode::{ModeToken, Sign};
use ircd_proto::ModeFlags;

use crate::directory::client::Client;
use crate::error::ModeError;

use super::{find_letter, AppliedMode, USER_MODES};

/// `+o` can never be *set* by a plain user MODE command (it's granted via
/// OPER), only cleared; enforced here rather than in the parse layer so
/// the wire grammar stays uniform.
pub fn apply_user_token(client: &mut Client, token: &ModeToken) -> Result<Option<AppliedMode>, ModeError> {
    let letter = find_letter(USER_MODES, token.letter).ok_or(ModeError::UnknownLetter(token.letter))?;
    if token.letter == 'o' && token.sign == Sign::Add {
        return Ok(None);
    }
    let already = client.modes.contains(letter.flag);
    match token.sign {
        Sign::Add if already => return Ok(None),
        Sign::Remove if !already => return Ok(None),
        Sign::Add => client.modes.insert(letter.flag),
        Sign::Remove => client.modes.remove(letter.flag),
    }
    Ok(Some(AppliedMode { sign: token.sign, letter: token.letter, param: None }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::class::ClassId;
    use std::time::Instant;

    fn client() -> Client {
        Client::new_local_user("alice", "a", "h", ClassId(0), Instant::now())
    }

    #[test]
    fn plus_o_via_mode_command_is_ignored() {
        let mut c = client();
        let tokens = super::super::tokenize("+o", vec![], USER_MODES);
        let applied = apply_user_token(&mut c, &tokens[0]).unwrap();
        assert!(applied.is_none());
        assert!(!c.modes.contains(ModeFlags::A_OP));
    }

    #[test]
    fn minus_o_deopers_a_client() {
        let mut c = client();
        c.modes.insert(ModeFlags::A_OP);
        let tokens = super::super::tokenize("-o", vec![], USER_MODES);
        let applied = apply_user_token(&mut c, &tokens[0]).unwrap();
        assert!(applied.is_some());
        assert!(!c.modes.contains(ModeFlags::A_OP));
    }

    #[test]
    fn setting_invisible_twice_is_a_no_op_the_second_time() {
        let mut c = client();
        let tokens = super::super::tokenize("+i", vec![], USER_MODES);
        assert!(apply_user_token(&mut c, &tokens[0]).unwrap().is_some());
        assert!(apply_user_token(&mut c, &tokens[0]).unwrap().is_none());
    }
}
