//! Panel core built on top of `lucid-ai`: turn rendering, the busy gate and
//! prompt construction.

mod context;
mod controller;
mod error;
mod markdown;
mod page;
mod prompt;
mod settings;

pub use context::{AppContext, BusyGuard, CHAT_CLEARED_NOTICE};
pub use controller::{
    GenerationTurn, MessageHandle, ReasoningState, ReasoningView, RenderController, RenderSink,
    RenderStep, TurnOutcome,
};
pub use error::PanelError;
pub use markdown::{HtmlMarkdown, MarkdownRenderer, PlainText};
pub use page::{NoPage, PageContent, PageContentProvider, StaticPage};
pub use prompt::{question_prompt, summarize_prompt, TurnPrompt};
pub use settings::{LogSettings, Settings, DEFAULT_LOCAL_URL};
