// Framing record of the variable-length queue

// no atomics in MessageHeader; keep as plain integral types for ABI

/// Header written immediately before every payload in a variable queue.
///
/// ABI-stable: any two processes sharing a queue must agree on this layout. A header with
/// `total_size == 0` is a wrap sentinel telling the reader to continue at the start of the
/// buffer; real messages always have `total_size >= HEADER_SIZE`.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct MessageHeader {
    /// Bytes taken by header + payload, rounded up to a multiple of `BLOCK`.
    pub total_size: u32,
    /// Bytes of payload the producer asked for.
    pub payload_len: u32,
}

impl MessageHeader {
    /// The wrap sentinel.
    pub const WRAP: MessageHeader = MessageHeader {
        total_size: 0,
        payload_len: 0,
    };

    pub fn is_wrap(&self) -> bool {
        self.total_size == 0
    }
}
