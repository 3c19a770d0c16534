use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::error::LucidAiError;
use crate::event_stream::DeltaStreamWriter;
use crate::types::{BackendKind, ChatRequest};

pub type BackendFuture = Pin<Box<dyn Future<Output = Result<(), LucidAiError>> + Send>>;

pub type BackendStreamFunction =
    Arc<dyn Fn(ChatRequest, DeltaStreamWriter) -> BackendFuture + Send + Sync>;

/// A model backend that turns a chat request into ordered deltas.
///
/// Implementations push into `writer` as output arrives and return once the
/// underlying stream ends. A returned error becomes the terminal item of the
/// consumer's stream; anything pushed before it stays delivered.
pub trait StreamBackend: Send + Sync {
    fn kind(&self) -> BackendKind;
    fn stream(&self, request: ChatRequest, writer: DeltaStreamWriter) -> BackendFuture;
}

pub type StreamBackendRef = Arc<dyn StreamBackend>;

#[derive(Clone)]
pub struct ClosureBackend {
    pub kind: BackendKind,
    pub stream: BackendStreamFunction,
}

impl ClosureBackend {
    pub fn new<F>(kind: BackendKind, stream: F) -> Self
    where
        F: Fn(ChatRequest, DeltaStreamWriter) -> BackendFuture + Send + Sync + 'static,
    {
        Self {
            kind,
            stream: Arc::new(stream),
        }
    }
}

impl StreamBackend for ClosureBackend {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    fn stream(&self, request: ChatRequest, writer: DeltaStreamWriter) -> BackendFuture {
        (self.stream)(request, writer)
    }
}
