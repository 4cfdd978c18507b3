// Behaviour of the fixed-slot queue: boundaries, FIFO order, protocol misuse, and a
// long seeded producer/consumer exchange.
use dmxp_spsc::SPSC::Fixed::FixedQueue;
use std::mem::MaybeUninit;
use std::thread;

#[test]
fn build() {
    let queue = FixedQueue::<u8, 64>::new();
    assert_eq!(queue.capacity(), 63);
    assert_eq!(queue.len(), 0);
    assert!(queue.is_empty());
}

#[test]
fn push_pop_string() {
    let orig: &[u8] = b"My perfect_string\0";
    assert_eq!(orig.len(), 18);

    let mut queue = FixedQueue::<u8, 64>::new();
    let (mut tx, mut rx) = queue.split();
    for &c in orig {
        let slot = tx.alloc().expect("queue has room");
        *slot = c;
        assert!(tx.push());
    }

    let mut got = Vec::with_capacity(orig.len());
    for _ in 0..orig.len() {
        let v = *rx.front().expect("queue has data");
        got.push(v);
        assert!(rx.pop());
    }

    assert_eq!(got, orig);
    assert!(rx.front().is_none());
}

#[test]
fn overflow() {
    const QUEUE_SIZE: usize = 64;
    let queue = FixedQueue::<u8, QUEUE_SIZE>::new();
    let mut tx = queue.producer().unwrap();
    let mut rx = queue.consumer().unwrap();

    let mut i = 0;
    while i < QUEUE_SIZE - 1 {
        match tx.alloc() {
            Some(v) => *v = 5,
            None => break,
        }
        tx.push();
        i += 1;
    }
    assert_eq!(i, QUEUE_SIZE - 1);
    assert_eq!(queue.len(), QUEUE_SIZE - 1);

    // One slot always stays empty.
    assert!(tx.alloc().is_none());
    assert!(!tx.push());

    assert!(rx.pop());
    assert!(tx.alloc().is_some());
    assert!(tx.push());
    assert!(tx.alloc().is_none());
}

#[test]
fn underflow() {
    const QUEUE_SIZE: usize = 64;
    let queue = FixedQueue::<u8, QUEUE_SIZE>::new();
    let mut tx = queue.producer().unwrap();
    let mut rx = queue.consumer().unwrap();

    for i in 0..QUEUE_SIZE - 1 {
        *tx.alloc().unwrap() = i as u8;
        tx.push();
    }

    let mut i = 0;
    while i < QUEUE_SIZE - 1 {
        match rx.front() {
            Some(&v) => assert_eq!(v, i as u8),
            None => break,
        }
        rx.pop();
        i += 1;
    }
    assert_eq!(i, QUEUE_SIZE - 1);
    assert!(rx.front().is_none());
    assert!(!rx.pop());
    assert!(queue.is_empty());
}

#[test]
fn wraparound_keeps_fifo_order() {
    let queue = FixedQueue::<u32, 4>::new();
    let mut tx = queue.producer().unwrap();
    let mut rx = queue.consumer().unwrap();

    let mut next_in = 0u32;
    let mut next_out = 0u32;
    for round in 0..100 {
        // Alternate between filling up and draining a little.
        let burst = 1 + round % 3;
        for _ in 0..burst {
            if tx.send(next_in).is_ok() {
                next_in += 1;
            }
        }
        for _ in 0..(round % 2 + 1) {
            if let Some(v) = rx.receive() {
                assert_eq!(v, next_out);
                next_out += 1;
            }
        }
    }
    while let Some(v) = rx.receive() {
        assert_eq!(v, next_out);
        next_out += 1;
    }
    assert_eq!(next_in, next_out);
    assert!(next_in > 100);
}

#[test]
fn alloc_and_front_are_pure_observers() {
    let queue = FixedQueue::<u64, 8>::new();
    let mut tx = queue.producer().unwrap();
    let rx = queue.consumer().unwrap();

    let first = tx.alloc().unwrap() as *mut u64;
    let second = tx.alloc().unwrap() as *mut u64;
    assert_eq!(first, second);
    assert!(queue.is_empty());
    assert!(rx.front().is_none());

    *tx.alloc().unwrap() = 42;
    assert!(tx.push());
    // A second commit for the same alloc is refused.
    assert!(!tx.push());

    let a = rx.front().unwrap() as *const u64;
    let b = rx.front().unwrap() as *const u64;
    assert_eq!(a, b);
    assert_eq!(*rx.front().unwrap(), 42);
    assert_eq!(queue.len(), 1);
}

#[test]
fn send_reports_would_block_when_full() {
    let queue = FixedQueue::<u16, 3>::new();
    let mut tx = queue.producer().unwrap();
    let mut rx = queue.consumer().unwrap();

    tx.send(1).unwrap();
    tx.send(2).unwrap();
    let err = tx.send(3).unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::WouldBlock);

    assert_eq!(rx.receive(), Some(1));
    tx.send(3).unwrap();
    assert_eq!(rx.receive(), Some(2));
    assert_eq!(rx.receive(), Some(3));
    assert_eq!(rx.receive(), None);
}

#[test]
fn roles_can_only_be_claimed_once() {
    let queue = FixedQueue::<u32, 8>::new();

    let producer = queue.producer().expect("first producer");
    assert!(queue.producer().is_none());
    let consumer = queue.consumer().expect("first consumer");
    assert!(queue.consumer().is_none());

    drop(producer);
    drop(consumer);
    assert!(queue.producer().is_some());
    assert!(queue.consumer().is_some());
}

#[test]
fn handles_resume_from_shared_indices() {
    let queue = FixedQueue::<u32, 8>::new();
    {
        let mut tx = queue.producer().unwrap();
        tx.send(7).unwrap();
        tx.send(8).unwrap();
    }
    {
        let mut rx = queue.consumer().unwrap();
        assert_eq!(rx.receive(), Some(7));
    }
    let mut tx = queue.producer().unwrap();
    tx.send(9).unwrap();
    let mut rx = queue.consumer().unwrap();
    assert_eq!(rx.receive(), Some(8));
    assert_eq!(rx.receive(), Some(9));
    assert!(rx.is_empty());
}

#[test]
fn in_place_and_boxed_construction() {
    let mut storage = MaybeUninit::<FixedQueue<u64, 16>>::uninit();
    let queue = FixedQueue::init(&mut storage);
    let (mut tx, mut rx) = queue.split();
    tx.send(11).unwrap();
    assert_eq!(rx.receive(), Some(11));

    let boxed = FixedQueue::<[u8; 32], 4096>::boxed();
    assert_eq!(boxed.capacity(), 4095);
    assert!(boxed.is_empty());
    let mut tx = boxed.producer().unwrap();
    let mut rx = boxed.consumer().unwrap();
    tx.send([3; 32]).unwrap();
    assert_eq!(rx.receive(), Some([3; 32]));
}

#[test]
fn any_copy_element_works_in_process() {
    // Elements that may not be placed in shared memory still queue locally.
    let queue = FixedQueue::<bool, 4>::boxed();
    let mut tx = queue.producer().unwrap();
    let mut rx = queue.consumer().unwrap();
    tx.send(true).unwrap();
    tx.send(false).unwrap();
    assert_eq!(rx.receive(), Some(true));
    assert_eq!(rx.receive(), Some(false));

    let mut storage = MaybeUninit::<FixedQueue<char, 4>>::uninit();
    let (mut tx, mut rx) = FixedQueue::init(&mut storage).split();
    tx.send('q').unwrap();
    assert_eq!(rx.receive(), Some('q'));
}

#[test]
fn concurrent_threads() {
    const QUEUE_SIZE: usize = 1024;
    const CHECK_LEN: usize = 1 << 20;
    const SEED: u64 = CHECK_LEN as u64;

    let queue = FixedQueue::<u8, QUEUE_SIZE>::boxed();
    let mut tx = queue.producer().unwrap();
    let mut rx = queue.consumer().unwrap();

    thread::scope(|s| {
        s.spawn(move || {
            let mut rng = fastrand::Rng::with_seed(SEED);
            for _ in 0..CHECK_LEN {
                let value = rng.u8(..);
                loop {
                    if let Some(slot) = tx.alloc() {
                        *slot = value;
                        break;
                    }
                    std::hint::spin_loop();
                }
                tx.push();
            }
        });

        s.spawn(move || {
            let mut rng = fastrand::Rng::with_seed(SEED);
            for i in 0..CHECK_LEN {
                let expected = rng.u8(..);
                let got = loop {
                    if let Some(&v) = rx.front() {
                        break v;
                    }
                    std::hint::spin_loop();
                };
                assert_eq!(got, expected, "value {} differs", i);
                rx.pop();
            }
        });
    });

    assert!(queue.is_empty());
}

#[test]
fn concurrent_wide_elements() {
    // Elements wider than a machine word must never be observed half-written.
    const COUNT: u64 = 200_000;
    let queue = FixedQueue::<[u64; 4], 64>::boxed();
    let mut tx = queue.producer().unwrap();
    let mut rx = queue.consumer().unwrap();

    let producer = thread::scope(|s| {
        let producer = s.spawn(move || {
            for i in 0..COUNT {
                while tx.send([i, i + 1, i + 2, i + 3]).is_err() {
                    thread::yield_now();
                }
            }
        });
        s.spawn(move || {
            let mut next = 0u64;
            while next < COUNT {
                match rx.receive() {
                    Some(v) => {
                        assert_eq!(v, [next, next + 1, next + 2, next + 3]);
                        next += 1;
                    }
                    None => thread::yield_now(),
                }
            }
        });
        producer.join()
    });
    assert!(producer.is_ok());
}
