use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::{Stream, StreamExt};
use tracing::{debug, info};

use super::common::{build_chat_payload, join_url, shared_http_client};
use super::sse::chat_completion_chunks;
use crate::backend::{BackendFuture, StreamBackend};
use crate::error::{LucidAiError, LucidAiErrorCode};
use crate::event_stream::DeltaStreamWriter;
use crate::types::{BackendKind, ChatCompletionChunk, ChatRequest};

pub type EngineChunkStream =
    Pin<Box<dyn Stream<Item = Result<ChatCompletionChunk, LucidAiError>> + Send>>;

/// A chat-completion-compatible engine running next to the panel.
///
/// Only `choices[0].delta.content` carries output; there is no reasoning
/// channel, so inline `<think>` tags are the only way reasoning shows up.
#[async_trait]
pub trait LocalEngine: Send + Sync {
    fn model_id(&self) -> &str;

    async fn stream_chat(&self, request: ChatRequest) -> Result<EngineChunkStream, LucidAiError>;

    /// Drops any conversation state the engine keeps between requests.
    async fn reset_chat(&self) -> Result<(), LucidAiError> {
        Ok(())
    }
}

#[derive(Clone)]
pub struct LocalBackend {
    engine: Arc<dyn LocalEngine>,
}

impl LocalBackend {
    pub fn new(engine: Arc<dyn LocalEngine>) -> Self {
        Self { engine }
    }
}

impl StreamBackend for LocalBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Local
    }

    fn stream(&self, request: ChatRequest, writer: DeltaStreamWriter) -> BackendFuture {
        let engine = Arc::clone(&self.engine);
        Box::pin(async move { run_local_engine(engine, request, writer).await })
    }
}

async fn run_local_engine(
    engine: Arc<dyn LocalEngine>,
    request: ChatRequest,
    writer: DeltaStreamWriter,
) -> Result<(), LucidAiError> {
    let mut chunks = engine.stream_chat(request).await.map_err(as_engine_error)?;
    let mut chunk_count = 0usize;
    while let Some(chunk) = chunks.next().await {
        let chunk = chunk.map_err(as_engine_error)?;
        chunk_count += 1;
        let fragment = chunk.content_fragment().unwrap_or_default();
        if !writer.push_text(fragment) {
            debug!(chunk_count, "local stream abandoned by consumer");
            return Ok(());
        }
    }
    debug!(chunk_count, model = engine.model_id(), "local engine stream finished");
    Ok(())
}

fn as_engine_error(error: LucidAiError) -> LucidAiError {
    match error.code {
        LucidAiErrorCode::Engine | LucidAiErrorCode::EngineUnavailable => error,
        _ => error.recode(LucidAiErrorCode::Engine),
    }
}

/// [`LocalEngine`] served by a loopback chat-completions server such as
/// llama.cpp's `llama-server` or ollama's OpenAI-compatible endpoint.
#[derive(Debug, Clone)]
pub struct HttpLocalEngine {
    base_url: String,
    model_id: String,
}

impl HttpLocalEngine {
    /// Probes `{base_url}/models` and returns the engine once it answers.
    pub async fn load(
        base_url: impl Into<String>,
        model_id: impl Into<String>,
    ) -> Result<Self, LucidAiError> {
        let engine = Self::new(base_url, model_id);
        let endpoint = join_url(&engine.base_url, "models");
        let response = shared_http_client(&engine.base_url)
            .get(endpoint.as_str())
            .send()
            .await
            .map_err(|error| {
                LucidAiError::new(
                    LucidAiErrorCode::EngineUnavailable,
                    format!("Local engine at {} is not reachable: {error}", engine.base_url),
                )
            })?;
        if !response.status().is_success() {
            return Err(LucidAiError::new(
                LucidAiErrorCode::EngineUnavailable,
                format!("Local engine probe failed: HTTP {}", response.status().as_u16()),
            ));
        }
        info!(base_url = %engine.base_url, model = %engine.model_id, "local engine ready");
        Ok(engine)
    }

    pub fn new(base_url: impl Into<String>, model_id: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            model_id: model_id.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl LocalEngine for HttpLocalEngine {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    async fn stream_chat(&self, request: ChatRequest) -> Result<EngineChunkStream, LucidAiError> {
        let endpoint = join_url(&self.base_url, "chat/completions");
        let payload = build_chat_payload(&request);
        debug!(endpoint = %endpoint, model = %request.model, "local engine request");

        let response = shared_http_client(&self.base_url)
            .post(endpoint.as_str())
            .json(&payload)
            .send()
            .await
            .map_err(|error| {
                LucidAiError::new(
                    LucidAiErrorCode::Engine,
                    format!("Local engine request failed: {error}"),
                )
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unable to read error body".to_string());
            return Err(LucidAiError::new(
                LucidAiErrorCode::Engine,
                format!("Local engine HTTP {status}: {body}"),
            ));
        }

        Ok(Box::pin(
            chat_completion_chunks(response).map(|chunk| chunk.map_err(as_engine_error)),
        ))
    }
}
