use std::mem::size_of;

use crate::SPSC::Structs::MessageHeader;

/// Alignment granularity of the variable queue.
///
/// Every message starts on a block boundary and occupies a whole number of blocks; a wrap
/// sentinel is exactly one block. Producer and consumer builds must agree on it.
pub const BLOCK: usize = 8;

/// Size of [`MessageHeader`] in bytes.
pub const HEADER_SIZE: usize = size_of::<MessageHeader>();

const _: () = assert!(BLOCK.is_power_of_two());
const _: () = assert!(HEADER_SIZE == BLOCK);

/// Bytes a message with `payload_len` bytes of payload takes in the ring, header included.
///
/// Returns `None` if the size overflows `usize`.
#[inline]
pub const fn frame_size(payload_len: usize) -> Option<usize> {
    match HEADER_SIZE.checked_add(payload_len) {
        Some(raw) => match raw.checked_add(BLOCK - 1) {
            Some(padded) => Some(padded & !(BLOCK - 1)),
            None => None,
        },
        None => None,
    }
}

/// Decoded form of a [`MessageHeader`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Frame {
    /// A committed message.
    Message(MessageHeader),
    /// Skip marker: the next record starts at offset 0.
    Wrap,
}

impl Frame {
    #[inline]
    pub fn decode(header: MessageHeader) -> Frame {
        if header.is_wrap() {
            Frame::Wrap
        } else {
            Frame::Message(header)
        }
    }

    #[inline]
    pub fn encode(self) -> MessageHeader {
        match self {
            Frame::Message(header) => header,
            Frame::Wrap => MessageHeader::WRAP,
        }
    }

    /// Checks that a message header read at `offset` describes a record that fits inside a
    /// buffer of `capacity` bytes.
    pub(crate) fn fits(header: &MessageHeader, offset: usize, capacity: usize) -> bool {
        let total = header.total_size as usize;
        total >= HEADER_SIZE
            && total % BLOCK == 0
            && frame_size(header.payload_len as usize) == Some(total)
            && offset + total <= capacity
    }
}
