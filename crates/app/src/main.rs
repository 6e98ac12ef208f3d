//! Tally - shared watch-party scorekeeper
//!
//! Command line front end. Runs local hotseat sessions: several
//! players share one screen, taking turns as the active player.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod state;

fn main() {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    tracing::info!("Starting Tally");

    let display_name = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "Player".to_string());

    let mut app = match state::AppState::new(&display_name) {
        Ok(state) => state,
        Err(e) => {
            tracing::error!("Failed to initialize application: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = commands::run(&mut app) {
        tracing::error!("Session ended with error: {}", e);
        std::process::exit(1);
    }
}
