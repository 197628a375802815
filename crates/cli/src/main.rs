//! MedBench CLI entry point.

fn main() {
    if let Err(e) = medbench_cli::run() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
