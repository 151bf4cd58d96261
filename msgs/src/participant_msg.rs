use std::io::{self, Write};

use crate::{framing::Framing, violation::ProtocolViolation, SCORED_TOKEN, WIN_TOKEN};

/// Participant to coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticipantMsg {
    /// Does the participant claim to hold the drawn word.
    Answer (bool),
    /// Confirms that a cell was marked.
    Scored,
    /// Claims a winning line.
    Win,
}

impl ParticipantMsg {
    pub fn dequeue_and_decode(input_buffer: &[u8], framing: Framing) -> Option<(usize, Result<ParticipantMsg, ProtocolViolation>)> {
        let Some((begin, end)) = framing.dequeue(input_buffer) else { return None };
        let msg = Self::decode(&input_buffer[begin..end]);
        Some((end, msg))
    }

    pub fn decode(payload: &[u8]) -> Result<ParticipantMsg, ProtocolViolation> {
        let text = std::str::from_utf8(payload).map_err(|_| ProtocolViolation::InvalidUtf8)?;
        let token = text.trim();
        match token {
            "" => Err(ProtocolViolation::Empty),
            SCORED_TOKEN => Ok(ParticipantMsg::Scored),
            WIN_TOKEN => Ok(ParticipantMsg::Win),
            _ => match parse_answer(token) {
                Some(answer) => Ok(ParticipantMsg::Answer (answer)),
                None => Err(ProtocolViolation::UnrecognizedToken(token.to_owned())),
            },
        }
    }

    pub fn pack(&self, framing: Framing, wtr: &mut impl Write) -> io::Result<()> {
        match self {
            ParticipantMsg::Answer (true) => framing.pack(b"j", wtr),
            ParticipantMsg::Answer (false) => framing.pack(b"n", wtr),
            ParticipantMsg::Scored => framing.pack(SCORED_TOKEN.as_bytes(), wtr),
            ParticipantMsg::Win => framing.pack(WIN_TOKEN.as_bytes(), wtr),
        }
    }
}

/// Single-character yes/no, case-insensitive. Accepts `j` as well as `y`.
pub fn parse_answer(input: &str) -> Option<bool> {
    match input.trim() {
        "j" | "J" | "y" | "Y" => Some(true),
        "n" | "N" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_answers_case_insensitively() {
        assert_eq!(ParticipantMsg::decode(b"j"), Ok(ParticipantMsg::Answer (true)));
        assert_eq!(ParticipantMsg::decode(b"Y\n"), Ok(ParticipantMsg::Answer (true)));
        assert_eq!(ParticipantMsg::decode(b"N"), Ok(ParticipantMsg::Answer (false)));
    }

    #[test]
    fn control_tokens_are_exact() {
        assert_eq!(ParticipantMsg::decode(b"SCORED"), Ok(ParticipantMsg::Scored));
        assert_eq!(ParticipantMsg::decode(b"WIN"), Ok(ParticipantMsg::Win));
        assert_eq!(
            ParticipantMsg::decode(b"scored"),
            Err(ProtocolViolation::UnrecognizedToken("scored".to_owned())),
        );
    }

    #[test]
    fn coalesced_legacy_read_is_a_violation() {
        let (cursor, msg) = ParticipantMsg::dequeue_and_decode(b"jSCORED", Framing::Legacy).unwrap();
        assert_eq!(cursor, 7);
        assert_eq!(msg, Err(ProtocolViolation::UnrecognizedToken("jSCORED".to_owned())));
    }

    #[test]
    fn empty_answer_is_a_violation() {
        assert_eq!(ParticipantMsg::decode(b"  "), Err(ProtocolViolation::Empty));
    }
}
