pub mod error;
pub mod events;
pub mod types;

pub use error::AgentError;
pub use events::{AgentEvent, ToolActivity};
pub use types::{TurnOutcome, TurnStatus};
