// In demos/producer.rs
//
// cargo run --example producer -- 10000
// cargo run --example consumer -- 10000   (in a second terminal)
use dmxp_spsc::SPSC::Variable::VariableQueue;
use dmxp_spsc::SPSC::RegionBuilder;
use sha2::{Digest, Sha256};
use std::env;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

const DEMO_REGION: &str = "dmxp_spsc_demo";
type DemoQueue = VariableQueue<{ 1024 * 1024 }>;

fn main() -> std::io::Result<()> {
    dmxp_spsc::init_tracing();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <num_messages> [--auto-exit]", args[0]);
        std::process::exit(1);
    }

    let num_messages: usize = args[1].parse().expect("Invalid number of messages");
    let auto_exit = args.get(2).map(|s| s == "--auto-exit").unwrap_or(false);

    println!("Producer: Precomputing {} hashes...", num_messages);

    let start_precompute = std::time::Instant::now();
    let hashes: Vec<String> = (0..num_messages)
        .map(|i| format!("{:x}", Sha256::digest(format!("message_{}", i).as_bytes())))
        .collect();
    println!(
        "Producer: Precomputed {} hashes in {:.2?}",
        num_messages,
        start_precompute.elapsed()
    );

    let region = RegionBuilder::new()
        .with_name(DEMO_REGION)
        .create::<DemoQueue>()?;
    let mut producer = region
        .queue()
        .producer()
        .expect("a fresh region has no producer yet");

    let keep_alive = Arc::new(AtomicBool::new(true));
    let keep_alive_for_handler = Arc::clone(&keep_alive);

    // Handle Ctrl+C to clean up
    ctrlc::set_handler(move || {
        keep_alive_for_handler.store(false, Ordering::SeqCst);
    })
    .expect("Error setting Ctrl+C handler");

    println!("Producer: Created region {}", region.name());
    println!("Producer: Sending {} hashes to shared memory...", num_messages);

    let start_send = std::time::Instant::now();
    let mut sent = 0;

    'messages: for (i, hash) in hashes.iter().enumerate() {
        // Format: "message_number:hash"
        let message = format!("{}:{}", i, hash);

        loop {
            match producer.send(&message) {
                Ok(()) => {
                    sent += 1;
                    if sent % 1000 == 0 {
                        println!("Sent {} messages", sent);
                    }
                    break;
                }
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    if !keep_alive.load(Ordering::SeqCst) {
                        break 'messages;
                    }
                    // Queue full, retry
                    std::thread::sleep(std::time::Duration::from_micros(10));
                }
                Err(e) => {
                    eprintln!("Failed to send message {}: {}", i, e);
                    break;
                }
            }
        }
    }

    let send_time = start_send.elapsed();
    println!("Producer: Sent {} messages in {:.2?}", sent, send_time);
    println!(
        "Producer: Throughput: {:.2} messages/sec",
        sent as f64 / send_time.as_secs_f64()
    );

    if auto_exit {
        println!("Producer: Auto-exit mode, waiting 2 seconds for consumer...");
        std::thread::sleep(std::time::Duration::from_secs(2));
    } else {
        // The region is removed when the producer exits; wait for the consumer to drain it
        println!("Waiting for consumer to finish processing (press Ctrl+C to exit)...");
        while keep_alive.load(Ordering::SeqCst) && !region.queue().is_empty() {
            std::thread::sleep(std::time::Duration::from_millis(100));
        }
    }

    println!("Producer: Shutting down");
    Ok(())
}
