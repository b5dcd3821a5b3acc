use std::collections::BTreeMap;

use uuid::Uuid;

use crate::tools::ToolCallRequest;

/// One streamed fragment of a tool call, addressed by its position in the batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolCallDelta {
    pub index: usize,
    pub id: Option<String>,
    pub name: Option<String>,
    pub arguments: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartialToolCall {
    pub id: String,
    pub name: String,
    pub arguments: String,
}

/// Merges streamed tool-call fragments into complete requests.
///
/// Backends send the id and name once and then the argument JSON in pieces;
/// fragments are grouped by `index` and finished in index order.
#[derive(Debug, Default, Clone)]
pub struct ToolCallAccumulator {
    parts: BTreeMap<usize, PartialToolCall>,
}

impl ToolCallAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, delta: ToolCallDelta) {
        let part = self.parts.entry(delta.index).or_default();

        if let Some(id) = delta.id.filter(|id| !id.is_empty()) {
            part.id = id;
        }

        if let Some(name) = delta.name.filter(|name| !name.is_empty()) {
            part.name = name;
        }

        if let Some(arguments) = delta.arguments {
            part.arguments.push_str(&arguments);
        }
    }

    pub fn extend<I>(&mut self, deltas: I)
    where
        I: IntoIterator<Item = ToolCallDelta>,
    {
        for delta in deltas {
            self.push(delta);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn parts(&self) -> impl Iterator<Item = &PartialToolCall> {
        self.parts.values()
    }

    /// Completes the batch. Fragments that never received a name are dropped;
    /// calls without an id get a synthesized `call_<uuid>`. Argument text that
    /// does not parse is recorded on the request, not raised.
    pub fn finish(self) -> Vec<ToolCallRequest> {
        self.parts
            .into_values()
            .filter(|part| !part.name.trim().is_empty())
            .map(|part| {
                let id = if part.id.is_empty() {
                    format!("call_{}", Uuid::new_v4())
                } else {
                    part.id
                };
                ToolCallRequest::from_raw_arguments(id, part.name, &part.arguments)
            })
            .collect()
    }
}
