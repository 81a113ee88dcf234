use clap::{Parser, Subcommand};
use std::fs::File;
use std::path::PathBuf;

use blflib::Session;

#[derive(Parser)]
#[command(name = "blfdump", version = "1.0.0", about = "Binary Log File (BLF) inspection CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print file-header summary: container count, total virtual length
    Info { input: PathBuf },
    /// Sequentially decode the whole file and list every interface seen
    ListInterfaces { input: PathBuf },
    /// Sequentially decode and print packet records
    Dump {
        input: PathBuf,
        /// Print each record as a JSON object instead of a text line
        #[arg(long)]
        json: bool,
        /// Stop after this many records
        #[arg(long)]
        limit: Option<usize>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    match Cli::parse().command {
        Commands::Info { input } => {
            let mut session = Session::open(File::open(&input)?)?;
            session.decode_all()?;
            println!("── BLF file ──────────────────────────────────────────────");
            println!("  Path             {}", input.display());
            println!("  Containers       {}", session.container_count());
            println!("  Virtual length   {} B", session.total_virt_len());
            println!("  Interfaces seen  {}", session.interfaces().len());
        }

        Commands::ListInterfaces { input } => {
            let mut session = Session::open(File::open(&input)?)?;
            session.decode_all()?;
            println!("{:<4} {:<10} {:<8} {:<11} name", "id", "encap", "channel", "hw_channel");
            for iface in session.interfaces() {
                println!(
                    "{:<4} {:<10} {:<8} {:<11} {}",
                    iface.interface_id,
                    format!("{:?}", iface.encap),
                    iface.channel,
                    iface.hw_channel,
                    iface.name,
                );
            }
        }

        Commands::Dump { input, json, limit } => {
            let mut session = Session::open(File::open(&input)?)?;
            let mut count = 0usize;
            while let Some(rec) = session.sequential_read()? {
                if json {
                    let obj = serde_json::json!({
                        "timestamp_ns": rec.timestamp_ns,
                        "encap": format!("{:?}", rec.encap),
                        "interface_id": rec.interface_id,
                        "direction": format!("{:?}", rec.direction),
                        "pkt_queue": rec.pkt_queue,
                        "start_of_last_obj": rec.start_of_last_obj,
                        "capture_len": rec.capture_len,
                        "wire_len": rec.wire_len,
                        "payload": hex::encode(&rec.payload),
                    });
                    println!("{obj}");
                } else {
                    println!(
                        "{:>15} {:<10} if={:<3} {:<8?} len={:<4} {}",
                        rec.timestamp_ns,
                        format!("{:?}", rec.encap),
                        rec.interface_id,
                        rec.direction,
                        rec.wire_len,
                        hex::encode(&rec.payload),
                    );
                }
                count += 1;
                if limit.map(|l| count >= l).unwrap_or(false) {
                    break;
                }
            }
        }
    }

    Ok(())
}
