use futures_util::StreamExt;
use tracing::{debug, info};

use super::common::{build_chat_payload, join_url, shared_http_client};
use super::sse::chat_completion_chunks;
use crate::backend::{BackendFuture, StreamBackend};
use crate::error::{LucidAiError, LucidAiErrorCode};
use crate::event_stream::DeltaStreamWriter;
use crate::types::{BackendKind, ChatRequest};

/// OpenAI-compatible chat completions endpoint reached over the network.
///
/// Reasoning arrives on its own channel (`reasoning_content` or `reasoning`)
/// and maps to reasoning deltas; `content` maps to text deltas.
#[derive(Debug, Clone)]
pub struct RemoteBackend {
    base_url: String,
    api_key: String,
}

impl RemoteBackend {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl StreamBackend for RemoteBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Remote
    }

    fn stream(&self, request: ChatRequest, writer: DeltaStreamWriter) -> BackendFuture {
        let backend = self.clone();
        Box::pin(async move { run_remote_completions(backend, request, writer).await })
    }
}

async fn run_remote_completions(
    backend: RemoteBackend,
    request: ChatRequest,
    writer: DeltaStreamWriter,
) -> Result<(), LucidAiError> {
    if backend.api_key.trim().is_empty() {
        return Err(LucidAiError::new(
            LucidAiErrorCode::AuthMissing,
            format!("Missing API key for {}", backend.base_url),
        ));
    }

    let endpoint = join_url(&backend.base_url, "chat/completions");
    let payload = build_chat_payload(&request);
    let client = shared_http_client(&backend.base_url);
    info!(endpoint = %endpoint, model = %request.model, "remote completions request");

    let response = client
        .post(endpoint.as_str())
        .bearer_auth(&backend.api_key)
        .json(&payload)
        .send()
        .await
        .map_err(|error| {
            LucidAiError::new(
                LucidAiErrorCode::Transport,
                format!("Remote transport failed: {error}"),
            )
        })?;

    if !response.status().is_success() {
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "unable to read error body".to_string());
        return Err(LucidAiError::new(
            LucidAiErrorCode::Http,
            format!("HTTP {status}: {body}"),
        ));
    }

    let mut chunks = chat_completion_chunks(response);
    let mut chunk_count = 0usize;
    while let Some(chunk) = chunks.next().await {
        let chunk = chunk?;
        chunk_count += 1;
        let Some(delta) = chunk.first_delta() else {
            continue;
        };

        if let Some(reasoning) = delta.reasoning_fragment() {
            if !writer.push_reasoning(reasoning) {
                debug!(chunk_count, "remote stream abandoned by consumer");
                return Ok(());
            }
        }
        if let Some(text) = delta.content.as_deref().filter(|text| !text.is_empty()) {
            if !writer.push_text(text) {
                debug!(chunk_count, "remote stream abandoned by consumer");
                return Ok(());
            }
        }
    }

    debug!(chunk_count, "remote completions stream finished");
    Ok(())
}
