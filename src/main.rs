use firescan::cli::run;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("firescan: {}", e);
        std::process::exit(1);
    }
}
