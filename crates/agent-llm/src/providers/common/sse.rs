//! Server-sent chat-completion chunks.

use std::pin::Pin;

use eventsource_stream::Eventsource;
use futures::Stream;
use futures_util::StreamExt;
use reqwest::Response;

use crate::error::ModelError;
use crate::provider::Result;

use super::openai_compat::{parse_openai_compat_sse_data_strict, CompatChunk};

pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<CompatChunk>> + Send>>;

/// Parses the `data:` payload of every event in a streaming completion.
///
/// Keep-alive events with an empty payload are skipped. Body read failures
/// surface as `BackendUnavailable`, unparseable payloads as `BackendProtocol`.
pub fn completion_chunks(response: Response) -> ChunkStream {
    let stream = response
        .bytes_stream()
        .eventsource()
        .filter_map(|event| async move {
            match event {
                Err(error) => Some(Err(ModelError::BackendUnavailable(format!(
                    "stream interrupted: {}",
                    error
                )))),
                Ok(event) if event.data.trim().is_empty() => None,
                Ok(event) => Some(parse_openai_compat_sse_data_strict(&event.data)),
            }
        });

    Box::pin(stream)
}
