//! Basic example: Discover nearby kettles
//!
//! Run with: cargo run --example discover_kettles
//!
//! To filter by name:
//!   cargo run --example discover_kettles -- --name "EKG Pro"

use stagg_rust_ble::{format_temperature, BleScanner, Discovery, Kettle, Result, SessionConfig};
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("stagg_rust_ble=debug".parse().unwrap()),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    let name_filter = args
        .iter()
        .position(|arg| arg == "--name")
        .and_then(|i| args.get(i + 1))
        .cloned();

    println!("Scanning for kettles...");
    println!("Make sure the kettle base is powered!\n");

    let scanner = BleScanner::new().await?;
    let devices = scanner
        .scan(Duration::from_secs(5), name_filter.clone())
        .await?;

    if devices.is_empty() {
        println!("No kettles found.");
        return Ok(());
    }

    for (i, device) in devices.iter().enumerate() {
        println!(
            "{}. {} ({}) RSSI: {:?} dBm",
            i + 1,
            device.name.as_deref().unwrap_or("Unknown"),
            device.address,
            device.rssi
        );
    }

    // Read the full state of the strongest one
    let nearest = &devices[0];
    println!("\nReading state from {}...", nearest.address);

    let config = SessionConfig::new()
        .with_device_name(name_filter.unwrap_or_else(|| "EKG".to_string()))
        .with_address(nearest.address.clone());
    let kettle = Kettle::new(config).await?;

    let state = kettle.get_state().await?;
    let summary = state.summary();

    println!(
        "  Target: {}",
        format_temperature(state.target_temperature(), state.units())
    );
    println!("  Units: {}", summary.units);
    println!("  Pre-boil: {}", summary.pre_boil_enabled);
    println!("  Altitude: {} m", summary.altitude_meters);
    println!("  Clock: {} ({})", summary.clock_time, summary.clock_mode);
    println!("  Hold: {} min", summary.hold_time_minutes);
    println!("  Chime: {}", summary.chime_volume);
    println!("  Language: {}", summary.language);
    match summary.schedule.time {
        Some(time) => println!("  Schedule: {} at {}", summary.schedule.mode.name(), time),
        None => println!("  Schedule: off"),
    }
    println!("  Raw: {}", summary.raw_data);

    kettle.disconnect().await;
    Ok(())
}
