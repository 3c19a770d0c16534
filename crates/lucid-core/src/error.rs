use lucid_ai::LucidAiError;
use thiserror::Error;

/// Failures surfaced to the user by the panel.
///
/// Everything except `Backend` is raised before a turn starts and is shown
/// as a system notification instead.
#[derive(Debug, Error)]
pub enum PanelError {
    #[error("No active tab")]
    NoActiveTab,
    #[error("Cannot read this page: {0}")]
    PageUnreadable(String),
    #[error("Please enter a question.")]
    EmptyInput,
    #[error(transparent)]
    Backend(#[from] LucidAiError),
}
