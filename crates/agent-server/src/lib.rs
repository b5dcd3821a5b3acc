pub mod assistant;
pub mod config;
pub mod handlers;
pub mod logging;
pub mod prompt;
pub mod repl;
pub mod server;
pub mod state;

pub use assistant::Assistant;
pub use config::AssistantArgs;
pub use server::{app_config, run_server};
pub use state::AppState;
