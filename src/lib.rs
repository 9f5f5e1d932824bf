use anyhow::Result;
use dotenvy::dotenv;

pub mod config;
pub mod connections;
pub mod errors;
pub mod files;
pub mod interface;
pub mod logger;
pub mod network;
pub mod registry;
pub mod session;
pub mod snippets;
pub mod system;
pub mod transcript;
pub mod utils;
pub mod venice;

/// Run the application: load `.env`, load config, and start the REPL.
pub async fn run() -> Result<()> {
    // Load environment variables from .env (VENICE_API_KEY)
    dotenv().ok();

    let config = config::AppConfig::load();
    interface::start_repl(config).await;

    Ok(())
}

// Re-exports for library consumers: common useful types
pub use config::AppConfig;
pub use errors::{CommandError, CommandResult};
pub use session::{Session, Theme};
