use std::io::{self, Write};

use crate::{framing::Framing, violation::ProtocolViolation, WIN_TOKEN};

/// Coordinator to participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoordinatorMsg {
    Word (String),
    Win,
}

impl CoordinatorMsg {
    pub fn dequeue_and_decode(input_buffer: &[u8], framing: Framing) -> Option<(usize, Result<CoordinatorMsg, ProtocolViolation>)> {
        let Some((begin, end)) = framing.dequeue(input_buffer) else { return None };
        let msg = Self::decode(&input_buffer[begin..end]);
        Some((end, msg))
    }

    pub fn decode(payload: &[u8]) -> Result<CoordinatorMsg, ProtocolViolation> {
        let text = std::str::from_utf8(payload).map_err(|_| ProtocolViolation::InvalidUtf8)?;
        match text {
            "" => Err(ProtocolViolation::Empty),
            WIN_TOKEN => Ok(CoordinatorMsg::Win),
            word => Ok(CoordinatorMsg::Word (word.to_owned())),
        }
    }

    pub fn pack(&self, framing: Framing, wtr: &mut impl Write) -> io::Result<()> {
        match self {
            CoordinatorMsg::Word (word) => framing.pack(word.as_bytes(), wtr),
            CoordinatorMsg::Win => framing.pack(WIN_TOKEN.as_bytes(), wtr),
        }
    }
}
