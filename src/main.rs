// src/main.rs
use tracing::error;

#[tokio::main]
async fn main() {
    if let Err(e) = poll_search_backend::start_server().await {
        error!("Server failed: {e}");
        eprintln!("Server failed: {e}");
        std::process::exit(1);
    }
}
