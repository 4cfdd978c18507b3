// Memory layout checks for everything that is shared between processes

use dmxp_spsc::Core::region::{SharedRegion, RegionHeader, REGION_ALIGN};
use dmxp_spsc::SPSC::Fixed::FixedQueue;
use dmxp_spsc::SPSC::Structs::MessageHeader;
use dmxp_spsc::SPSC::Variable::{Frame, VariableQueue, BLOCK, HEADER_SIZE};
use crossbeam_utils::CachePadded;
use memoffset::offset_of;
use std::mem::{align_of, size_of};
use std::sync::atomic::AtomicU64;

#[test]
fn message_header_layout() {
    assert_eq!(size_of::<MessageHeader>(), 8);
    assert_eq!(align_of::<MessageHeader>(), 4);
    assert_eq!(offset_of!(MessageHeader, total_size), 0);
    assert_eq!(offset_of!(MessageHeader, payload_len), 4);
    assert_eq!(HEADER_SIZE, size_of::<MessageHeader>());
    assert_eq!(HEADER_SIZE, BLOCK);
}

#[test]
fn wrap_sentinel_encoding() {
    assert!(MessageHeader::WRAP.is_wrap());
    assert_eq!(Frame::decode(MessageHeader::WRAP), Frame::Wrap);
    assert_eq!(Frame::Wrap.encode(), MessageHeader::WRAP);

    let header = MessageHeader {
        total_size: 16,
        payload_len: 3,
    };
    assert!(!header.is_wrap());
    assert_eq!(Frame::decode(header), Frame::Message(header));
    assert_eq!(Frame::Message(header).encode(), header);
}

#[test]
fn region_header_layout() {
    assert_eq!(size_of::<RegionHeader>(), 128);
    assert_eq!(align_of::<RegionHeader>(), REGION_ALIGN);
    assert_eq!(offset_of!(RegionHeader, magic), 0);
    assert_eq!(offset_of!(RegionHeader, version), 8);
    assert_eq!(offset_of!(RegionHeader, kind), 12);
    assert_eq!(offset_of!(RegionHeader, block), 16);
    assert_eq!(offset_of!(RegionHeader, reserved), 20);
    assert_eq!(offset_of!(RegionHeader, queue_offset), 24);
    assert_eq!(offset_of!(RegionHeader, queue_size), 32);
    assert_eq!(offset_of!(RegionHeader, queue_align), 40);
    assert_eq!(offset_of!(RegionHeader, capacity), 48);
    assert_eq!(offset_of!(RegionHeader, element_size), 56);
    assert_eq!(offset_of!(RegionHeader, ready), 64);
}

#[test]
fn queue_placement() {
    type Variable = VariableQueue<4096>;
    type Fixed = FixedQueue<u64, 64>;

    let offset = SharedRegion::<Variable>::queue_offset();
    assert_eq!(offset % REGION_ALIGN, 0);
    assert_eq!(offset % align_of::<Variable>(), 0);
    assert!(offset >= size_of::<RegionHeader>());
    assert_eq!(
        SharedRegion::<Variable>::required_size(),
        offset + size_of::<Variable>()
    );

    let offset = SharedRegion::<Fixed>::queue_offset();
    assert_eq!(offset % align_of::<Fixed>(), 0);
    assert_eq!(
        SharedRegion::<Fixed>::required_size(),
        offset + size_of::<Fixed>()
    );
}

#[test]
fn queue_sizes() {
    // Cursors sit on their own cache lines ahead of the storage.
    let cursors = 2 * size_of::<CachePadded<AtomicU64>>();
    assert!(size_of::<VariableQueue<4096>>() >= 4096 + cursors);
    assert!(size_of::<FixedQueue<u64, 64>>() >= 64 * 8 + cursors);
    assert_eq!(align_of::<VariableQueue<4096>>() % 64, 0);
}
