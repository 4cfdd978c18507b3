// In demos/consumer.rs
use dmxp_spsc::SPSC::Variable::VariableQueue;
use dmxp_spsc::SPSC::RegionBuilder;
use sha2::{Digest, Sha256};
use std::env;
use std::time::{Duration, Instant};

const DEMO_REGION: &str = "dmxp_spsc_demo";
type DemoQueue = VariableQueue<{ 1024 * 1024 }>;

fn main() -> std::io::Result<()> {
    dmxp_spsc::init_tracing();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <expected_messages>", args[0]);
        std::process::exit(1);
    }

    let expected_messages: usize = args[1].parse().expect("Invalid number of messages");
    let mut received = 0;
    let mut corrupted = 0;

    println!("Consumer: Waiting for region {}...", DEMO_REGION);

    let region = match RegionBuilder::new()
        .with_name(DEMO_REGION)
        .attach::<DemoQueue>()
    {
        Ok(region) => {
            println!("Consumer: Found region {}", DEMO_REGION);
            region
        }
        Err(e) => {
            eprintln!("Failed to attach to region: {}", e);
            return Ok(());
        }
    };
    let mut consumer = match region.queue().consumer() {
        Some(consumer) => consumer,
        None => {
            eprintln!("Another consumer is already attached");
            return Ok(());
        }
    };

    let start = Instant::now();
    let mut last_message = Instant::now();
    println!("\n{:<10} {}", "Msg #", "Hash");
    println!("{}", "=".repeat(80));

    while received < expected_messages {
        let Some(message) = consumer.front() else {
            if last_message.elapsed() > Duration::from_secs(5) {
                eprintln!("Timeout waiting for messages");
                break;
            }
            std::thread::yield_now();
            continue;
        };

        // Parse "message_number:hash" format, straight from the ring
        match std::str::from_utf8(message.payload())
            .ok()
            .and_then(|text| text.split_once(':'))
        {
            Some((num_str, hash)) => {
                let expected = format!("{:x}", Sha256::digest(format!("message_{}", num_str)));
                if expected != hash {
                    corrupted += 1;
                }
                if received % 1000 == 0 {
                    println!("{:<10} {}", num_str, hash);
                }
            }
            None => {
                corrupted += 1;
                println!("Invalid format: {:?}", message.payload());
            }
        }
        consumer.pop();
        received += 1;
        last_message = Instant::now();
    }

    let elapsed = start.elapsed();
    println!("\n{}", "=".repeat(80));
    println!("Consumer: Received {} messages in {:.2?}", received, elapsed);
    println!(
        "Average: {:.2} messages/second",
        received as f64 / elapsed.as_secs_f64()
    );

    if received == expected_messages && corrupted == 0 {
        println!("All messages received and verified");
    } else if corrupted > 0 {
        eprintln!("{} messages failed hash verification", corrupted);
    }

    Ok(())
}
