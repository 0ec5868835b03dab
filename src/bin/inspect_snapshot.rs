//! Print an overview of a battery snapshot file.
//!
//! Usage: cargo run --bin inspect_snapshot [data/day1.json]

use battery_buddy::battery::{BatterySnapshot, StatusFigures};

fn main() {
    let args: Vec<String> = std::env::args().collect();
    if args.iter().any(|a| a == "-h" || a == "--help") {
        eprintln!("Usage: {} [snapshot.json]", args[0]);
        eprintln!();
        eprintln!("Prints record count, time range and per-column statistics.");
        return;
    }
    let path = args.get(1).map(String::as_str).unwrap_or("data/day1.json");

    let snapshot = match BatterySnapshot::load(path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    println!("{path}: {} records", snapshot.len());
    println!(
        "Range: {} .. {}",
        snapshot.first().timestamp.format("%Y-%m-%d %H:%M"),
        snapshot.last().timestamp.format("%Y-%m-%d %H:%M")
    );
    println!();
    println!("{:<28} {:>10} {:>10} {:>10} {:>10}", "column", "min", "mean", "max", "sum");

    let columns = snapshot.first().columns().map(|(name, _)| name);
    for (i, name) in columns.iter().enumerate() {
        let values: Vec<f64> = snapshot.records().iter().map(|r| r.columns()[i].1).collect();
        let sum: f64 = values.iter().sum();
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let mean = sum / values.len() as f64;
        println!("{name:<28} {min:>10.3} {mean:>10.3} {max:>10.3} {sum:>10.3}");
    }

    let status = StatusFigures::from_snapshot(&snapshot);
    println!();
    println!(
        "Last SOC {:.1}% ({}), peak price {:.3} EUR/kWh at {}",
        status.current_soc * 100.0,
        status.level().label(),
        status.peak_price,
        status.peak_time
    );
}
