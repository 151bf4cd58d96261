use std::io::Cursor;

use byteorder::{LittleEndian, ReadBytesExt};
use tracing::warn;

pub const LONG_MSG_LEN: usize = 2000;

/// Finds the first complete length-prefixed message in `input_buffer`.
///
/// Returns the payload range `(begin, end)`; `end` is also the number of
/// bytes to drain once the payload has been handled.
pub fn dequeue_msg(input_buffer: &[u8]) -> Option<(usize, usize)> {
    if input_buffer.len() < 4 {
        return None
    }

    let mut rdr = Cursor::new(input_buffer);

    let Ok(msg_ln) = rdr.read_u32::<LittleEndian>() else { return None };
    let msg_ln = msg_ln as usize;

    if msg_ln > LONG_MSG_LEN {
        warn!("long message: {msg_ln}");
    }

    let end = msg_ln + 4;

    if input_buffer.len() < end {
        return None
    }

    Some((4, end))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn waits_for_the_length_header() {
        assert_eq!(dequeue_msg(&[3, 0]), None);
    }

    #[test]
    fn waits_for_the_full_payload() {
        let buffer = [5, 0, 0, 0, b'c', b'l', b'o'];
        assert_eq!(dequeue_msg(&buffer), None);
    }

    #[test]
    fn finds_first_message_and_leaves_the_rest() {
        let buffer = [1, 0, 0, 0, b'j', 6, 0, 0, 0, b'S'];
        assert_eq!(dequeue_msg(&buffer), Some((4, 5)));
        assert_eq!(dequeue_msg(&buffer[5..]), None);
    }

    #[test]
    fn zero_length_message_is_complete() {
        assert_eq!(dequeue_msg(&[0, 0, 0, 0]), Some((4, 4)));
    }
}
