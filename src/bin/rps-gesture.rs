//! Rock-paper-scissors gesture CLI tool
//!
//! Interactive menu for downloading or capturing the dataset, training a
//! model and detecting moves from the webcam.

#[cfg(feature = "cli")]
use rps_gesture::cli;

#[cfg(feature = "cli")]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    cli::main().await
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("CLI feature not enabled. Please rebuild with --features cli");
    std::process::exit(1);
}
