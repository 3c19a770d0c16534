//! Backend-agnostic streaming of model output as reasoning/text deltas.

mod backend;
mod budget;
mod catalog;
mod error;
mod event_stream;
mod providers;
mod stream;
mod think;
mod types;

pub use backend::{BackendFuture, BackendStreamFunction, ClosureBackend, StreamBackend, StreamBackendRef};
pub use budget::{
    available_input_chars, output_token_budget, plan, truncate_to_chars, BudgetPlan,
    CHARS_PER_TOKEN, MAX_OUTPUT_TOKENS, MIN_INPUT_TOKENS, SYSTEM_PROMPT_TOKENS,
};
pub use catalog::{
    descriptor_for, find_local_model, model_context, LocalModel, DEFAULT_CONTEXT_WINDOW,
    DEFAULT_LOCAL_MODEL, LOCAL_MODELS,
};
pub use error::{LucidAiError, LucidAiErrorCode};
pub use event_stream::{DeltaItem, DeltaStream, DeltaStreamWriter};
pub use providers::{
    fetch_models, EngineChunkStream, HttpLocalEngine, LocalBackend, LocalEngine, RemoteBackend,
};
pub use stream::stream;
pub use think::{split, SplitResult, ThinkSplitter, THINK_CLOSE, THINK_OPEN};
pub use types::{
    BackendKind, ChatCompletionChunk, ChatMessage, ChatRequest, ChunkChoice, ChunkDelta,
    DeltaKind, ModelDescriptor, StreamDelta, PAGE_ANALYSIS_SYSTEM_PROMPT,
};
