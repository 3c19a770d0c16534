use std::collections::VecDeque;
use std::pin::Pin;

use futures_util::stream::{self, BoxStream, Stream};
use futures_util::StreamExt;
use serde_json::json;

use crate::error::{LucidAiError, LucidAiErrorCode};
use crate::types::ChatCompletionChunk;

pub(super) type ChunkStream =
    Pin<Box<dyn Stream<Item = Result<ChatCompletionChunk, LucidAiError>> + Send>>;

const DONE_MARKER: &str = "[DONE]";

/// Incremental Server-Sent Events decoder yielding the `data` payload of each event.
///
/// Bytes are buffered until a full line is available, so multi-byte characters
/// split across network reads decode correctly.
#[derive(Debug, Default)]
pub(super) struct SseDecoder {
    buffer: Vec<u8>,
    data_lines: Vec<String>,
}

impl SseDecoder {
    pub(super) fn feed(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(bytes);
        let mut events = Vec::new();
        while let Some(position) = self.buffer.iter().position(|byte| *byte == b'\n') {
            let line = self.buffer.drain(..=position).collect::<Vec<_>>();
            let line = String::from_utf8_lossy(&line);
            if let Some(data) = self.accept_line(line.trim_end_matches(&['\r', '\n'][..])) {
                events.push(data);
            }
        }
        events
    }

    /// Flushes an event left unterminated when the body ends.
    pub(super) fn finish(&mut self) -> Option<String> {
        if !self.buffer.is_empty() {
            let rest = std::mem::take(&mut self.buffer);
            let rest = String::from_utf8_lossy(&rest).into_owned();
            if let Some(data) = self.accept_line(rest.trim_end_matches('\r')) {
                return Some(data);
            }
        }
        self.take_event()
    }

    fn accept_line(&mut self, line: &str) -> Option<String> {
        if line.is_empty() {
            return self.take_event();
        }
        if let Some(data) = line.strip_prefix("data:") {
            self.data_lines.push(data.trim_start().to_string());
        }
        None
    }

    fn take_event(&mut self) -> Option<String> {
        if self.data_lines.is_empty() {
            return None;
        }
        let data = self.data_lines.join("\n");
        self.data_lines.clear();
        Some(data)
    }
}

struct ChunkReader {
    body: BoxStream<'static, reqwest::Result<Vec<u8>>>,
    decoder: SseDecoder,
    pending: VecDeque<String>,
    exhausted: bool,
}

/// Decodes a streaming chat-completions body into chunks as bytes arrive.
///
/// Ends at `[DONE]` or end of body. Read failures map to `Transport`, malformed
/// chunks to `Protocol`; either ends the stream after the error item.
pub(super) fn chat_completion_chunks(response: reqwest::Response) -> ChunkStream {
    let body = response
        .bytes_stream()
        .map(|chunk| chunk.map(|bytes| bytes.to_vec()))
        .boxed();
    chunks_from_body(body)
}

fn chunks_from_body(body: BoxStream<'static, reqwest::Result<Vec<u8>>>) -> ChunkStream {
    let reader = ChunkReader {
        body,
        decoder: SseDecoder::default(),
        pending: VecDeque::new(),
        exhausted: false,
    };

    Box::pin(stream::unfold(reader, |mut reader| async move {
        loop {
            if let Some(data) = reader.pending.pop_front() {
                if data == DONE_MARKER {
                    return None;
                }
                return match serde_json::from_str::<ChatCompletionChunk>(&data) {
                    Ok(chunk) => Some((Ok(chunk), reader)),
                    Err(error) => {
                        reader.exhausted = true;
                        reader.pending.clear();
                        let error = LucidAiError::new(
                            LucidAiErrorCode::Protocol,
                            format!("Invalid chunk JSON: {error}"),
                        )
                        .with_details(json!({ "chunk": data }));
                        Some((Err(error), reader))
                    }
                };
            }

            if reader.exhausted {
                return None;
            }

            match reader.body.next().await {
                Some(Ok(bytes)) => {
                    let events = reader.decoder.feed(&bytes);
                    reader.pending.extend(events);
                }
                Some(Err(error)) => {
                    reader.exhausted = true;
                    let error = LucidAiError::new(
                        LucidAiErrorCode::Transport,
                        format!("Stream read failed: {error}"),
                    );
                    return Some((Err(error), reader));
                }
                None => {
                    reader.exhausted = true;
                    let tail = reader.decoder.finish();
                    reader.pending.extend(tail);
                }
            }
        }
    }))
}
