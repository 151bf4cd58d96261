use std::{fmt, io::{self, Write}, str::FromStr};

use byteorder::{LittleEndian, WriteBytesExt};

use crate::dequeue::dequeue_msg;

/// How messages are delimited on the stream.
///
/// `Legacy` is the original unframed protocol, where every read is taken to
/// be exactly one message. `LengthPrefixed` puts a little-endian `u32`
/// payload length in front of every message. Both ends must agree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Framing {
    #[default]
    LengthPrefixed,
    Legacy,
}

impl Framing {
    /// Payload range of the next complete message in `input_buffer`.
    ///
    /// In legacy mode the whole buffer is one message, so callers must run
    /// this once per read.
    pub fn dequeue(self, input_buffer: &[u8]) -> Option<(usize, usize)> {
        match self {
            Framing::LengthPrefixed => dequeue_msg(input_buffer),
            Framing::Legacy => {
                if input_buffer.is_empty() {
                    None
                }
                else {
                    Some((0, input_buffer.len()))
                }
            }
        }
    }

    pub fn pack(self, payload: &[u8], wtr: &mut impl Write) -> io::Result<()> {
        if self == Framing::LengthPrefixed {
            wtr.write_u32::<LittleEndian>(payload.len() as u32)?;
        }
        wtr.write_all(payload)
    }
}

impl FromStr for Framing {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "length-prefixed" => Ok(Framing::LengthPrefixed),
            "legacy" => Ok(Framing::Legacy),
            other => Err(format!("unknown framing {other:?}, expected length-prefixed or legacy")),
        }
    }
}

impl fmt::Display for Framing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Framing::LengthPrefixed => write!(f, "length-prefixed"),
            Framing::Legacy => write!(f, "legacy"),
        }
    }
}
