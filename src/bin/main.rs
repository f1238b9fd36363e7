//! Binary entrypoint for the goal-architect tool

#[tokio::main]
async fn main() {
    if let Err(e) = goal_architect::cli::run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
