use crate::transcript::Turn;

/// Read-only projection handed to the model client: system instructions,
/// every committed turn, and the corrective notes pending for the current
/// user turn. Notes are never transcript turns.
#[derive(Debug, Clone, Copy)]
pub struct TranscriptView<'a> {
    system_prompt: Option<&'a str>,
    turns: &'a [Turn],
    notes: &'a [String],
}

impl<'a> TranscriptView<'a> {
    pub fn new(system_prompt: Option<&'a str>, turns: &'a [Turn], notes: &'a [String]) -> Self {
        Self {
            system_prompt,
            turns,
            notes,
        }
    }

    pub fn system_prompt(&self) -> Option<&'a str> {
        self.system_prompt
    }

    pub fn turns(&self) -> &'a [Turn] {
        self.turns
    }

    pub fn notes(&self) -> &'a [String] {
        self.notes
    }

    /// Text of the most recent user turn.
    pub fn latest_user_text(&self) -> Option<&'a str> {
        self.turns.iter().rev().find_map(|turn| match turn {
            Turn::User { text } => Some(text.as_str()),
            _ => None,
        })
    }
}
