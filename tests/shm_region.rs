// Queues placed in named shared memory, exercised through two independent mappings
// Run with: cargo test --test shm_region -- --nocapture

#[cfg(target_os = "linux")]
mod linux_tests {
    use dmxp_spsc::Core::region::{SharedRegion, LAYOUT_VERSION, REGION_ALIGN};
    use dmxp_spsc::Core::unlink_shared_memory;
    use dmxp_spsc::SPSC::Fixed::FixedQueue;
    use dmxp_spsc::SPSC::Variable::VariableQueue;
    use dmxp_spsc::SPSC::RegionBuilder;
    use serial_test::serial;
    use std::io::ErrorKind;
    use std::mem::size_of;
    use std::thread;

    type Queue = VariableQueue<{ 64 * 1024 }>;

    fn fresh_name(tag: &str) -> String {
        let name = format!("dmxp_spsc_region_{}_{}", tag, std::process::id());
        let _ = unlink_shared_memory(&name);
        name
    }

    #[test]
    #[serial]
    fn test_create_and_attach() {
        let name = fresh_name("attach");
        let created = SharedRegion::<Queue>::create(&name).unwrap();
        assert!(created.is_creator());
        assert!(created.is_initialized());
        assert_eq!(created.name(), name);
        assert!(created.mapped_size() >= SharedRegion::<Queue>::required_size());
        assert_eq!(created.header_ptr() as usize % REGION_ALIGN, 0);

        let attached = SharedRegion::<Queue>::attach(&name).unwrap();
        assert!(!attached.is_creator());
        assert!(attached.is_initialized());
        unsafe {
            assert_eq!((*attached.header_ptr()).version, LAYOUT_VERSION);
        }

        let mut tx = created.producer().unwrap();
        let mut rx = attached.consumer().unwrap();
        tx.send(b"across mappings").unwrap();
        assert_eq!(rx.front().unwrap().payload(), b"across mappings");
        assert!(rx.pop());
        assert!(attached.is_empty());
        assert!(created.is_empty());
    }

    #[test]
    #[serial]
    fn test_roles_are_shared_between_mappings() {
        let name = fresh_name("roles");
        let created = SharedRegion::<Queue>::create(&name).unwrap();
        let attached = SharedRegion::<Queue>::attach(&name).unwrap();

        let producer = created.producer().unwrap();
        assert!(attached.producer().is_none());
        drop(producer);
        assert!(attached.producer().is_some());
    }

    #[test]
    #[serial]
    fn test_threads_on_separate_mappings() {
        const COUNT: u32 = 100_000;
        let name = fresh_name("threads");
        let created = SharedRegion::<Queue>::create(&name).unwrap();
        let attached = SharedRegion::<Queue>::attach(&name).unwrap();
        let mut tx = created.producer().unwrap();
        let mut rx = attached.consumer().unwrap();

        thread::scope(|s| {
            s.spawn(move || {
                for i in 0..COUNT {
                    let msg = format!("message_{}", i);
                    while tx.send(&msg).is_err() {
                        thread::yield_now();
                    }
                }
            });
            s.spawn(move || {
                let mut next = 0;
                while next < COUNT {
                    match rx.front() {
                        Some(msg) => {
                            assert_eq!(msg.payload(), format!("message_{}", next).as_bytes());
                        }
                        None => {
                            thread::yield_now();
                            continue;
                        }
                    }
                    assert!(rx.pop());
                    next += 1;
                }
            });
        });

        assert!(created.is_empty());
    }

    #[test]
    #[serial]
    fn test_fixed_queue_region() {
        let name = fresh_name("fixed");
        let created = RegionBuilder::new()
            .with_name(name.as_str())
            .create::<FixedQueue<u64, 256>>()
            .unwrap();
        let attached = RegionBuilder::new()
            .with_name(name.as_str())
            .attach::<FixedQueue<u64, 256>>()
            .unwrap();

        let mut tx = attached.producer().unwrap();
        let mut rx = created.consumer().unwrap();
        for i in 0..255u64 {
            tx.send(i * 3).unwrap();
        }
        assert_eq!(tx.send(0).unwrap_err().kind(), ErrorKind::WouldBlock);
        for i in 0..255u64 {
            assert_eq!(rx.receive(), Some(i * 3));
        }
        assert_eq!(rx.receive(), None);
    }

    #[test]
    #[serial]
    fn test_open_or_create() {
        let name = fresh_name("open");
        let first = RegionBuilder::new()
            .with_name(name.as_str())
            .open_or_create::<Queue>()
            .unwrap();
        assert!(first.is_creator());

        let second = RegionBuilder::new()
            .with_name(name.as_str())
            .open_or_create::<Queue>()
            .unwrap();
        assert!(!second.is_creator());
    }

    #[test]
    #[serial]
    fn test_queue_type_mismatch() {
        let name = fresh_name("kind");
        let _created = SharedRegion::<Queue>::create(&name).unwrap();

        let err = SharedRegion::<FixedQueue<u64, 256>>::attach(&name).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidData);

        // Same kind, different capacity.
        let err = SharedRegion::<VariableQueue<1024>>::attach(&name).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidData);
    }

    #[test]
    #[serial]
    fn test_capacity_mismatch_with_equal_size() {
        // Storage padding makes both queues the same size.
        assert_eq!(
            size_of::<VariableQueue<528>>(),
            size_of::<VariableQueue<576>>()
        );
        let name = fresh_name("capacity");
        let created = SharedRegion::<VariableQueue<528>>::create(&name).unwrap();
        assert_eq!(created.capacity(), 528);

        let err = SharedRegion::<VariableQueue<576>>::attach(&name).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidData);
        assert!(SharedRegion::<VariableQueue<528>>::attach(&name).is_ok());
    }

    #[test]
    #[serial]
    fn test_fixed_shape_mismatch() {
        let name = fresh_name("shape");
        let created = SharedRegion::<FixedQueue<u16, 64>>::create(&name).unwrap();

        // Same slot bytes, different slot count.
        let err = SharedRegion::<FixedQueue<u8, 128>>::attach(&name).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidData);

        // Same slot count, different element size.
        let err = SharedRegion::<FixedQueue<u8, 64>>::attach(&name).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidData);
        let err = SharedRegion::<FixedQueue<u32, 64>>::attach(&name).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidData);

        // Another plain element type of the same size reads the same bytes.
        let attached = SharedRegion::<FixedQueue<[u8; 2], 64>>::attach(&name).unwrap();
        let mut tx = created.producer().unwrap();
        let mut rx = attached.consumer().unwrap();
        tx.send(0x0102).unwrap();
        assert_eq!(rx.receive(), Some(0x0102u16.to_ne_bytes()));
    }

    #[test]
    #[serial]
    fn test_create_twice_fails() {
        let name = fresh_name("twice");
        let _created = SharedRegion::<Queue>::create(&name).unwrap();

        let err = SharedRegion::<Queue>::create(&name).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
    }

    #[test]
    #[serial]
    fn test_attach_missing() {
        let name = fresh_name("missing");
        let err = SharedRegion::<Queue>::attach(&name).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    #[serial]
    fn test_creator_removes_name_on_drop() {
        let name = fresh_name("drop");
        let created = SharedRegion::<Queue>::create(&name).unwrap();
        let attached = SharedRegion::<Queue>::attach(&name).unwrap();
        let mut tx = attached.producer().unwrap();
        let mut rx = attached.consumer().unwrap();
        drop(created);

        let err = SharedRegion::<Queue>::attach(&name).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        // The remaining mapping still works.
        tx.send("still here").unwrap();
        assert_eq!(rx.receive().as_deref(), Some(&b"still here"[..]));
    }
}
