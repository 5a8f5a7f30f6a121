#[tokio::main]
async fn main() {
    if let Err(e) = witness_scan::cli::run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
