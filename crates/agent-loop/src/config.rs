pub const DEFAULT_MAX_ROUNDS: usize = 6;

pub const DEFAULT_ROUND_LIMIT_MESSAGE: &str = "I'm sorry, I wasn't able to complete your request. Please try rephrasing your question or ask one of our pharmacists for help.";

/// Configuration for the agent loop.
#[derive(Debug, Clone)]
pub struct AgentLoopConfig {
    /// Model invocations allowed per user turn. Every invocation counts: tool
    /// rounds, answers held back by the safety policy, and the closing answer.
    /// A model that spends all of them on tool calls gets no further call and
    /// the turn ends with the round limit message.
    pub max_rounds: usize,
    pub system_prompt: Option<String>,
    /// Final answer used when `max_rounds` is spent without an allowed reply.
    pub round_limit_message: String,
}

impl Default for AgentLoopConfig {
    fn default() -> Self {
        Self {
            max_rounds: DEFAULT_MAX_ROUNDS,
            system_prompt: None,
            round_limit_message: DEFAULT_ROUND_LIMIT_MESSAGE.to_string(),
        }
    }
}

impl AgentLoopConfig {
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn with_max_rounds(mut self, max_rounds: usize) -> Self {
        self.max_rounds = max_rounds;
        self
    }
}
