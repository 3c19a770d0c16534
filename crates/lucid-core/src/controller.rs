use std::sync::Arc;
use std::time::Duration;

use lucid_ai::{
    BackendKind, DeltaItem, DeltaKind, DeltaStream, LucidAiError, LucidAiErrorCode, StreamDelta,
    ThinkSplitter,
};
use tracing::{debug, info, warn};

use crate::markdown::MarkdownRenderer;

/// Identifies an assistant message created by [`RenderSink::begin_assistant_message`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageHandle(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReasoningView {
    pub visible: bool,
    pub expanded: bool,
}

/// Display surface for the transcript. Calls are made synchronously from the
/// turn loop, one group per delta.
pub trait RenderSink: Send {
    fn append_user_message(&mut self, label: &str);
    fn begin_assistant_message(&mut self) -> MessageHandle;
    fn update_reasoning(&mut self, handle: MessageHandle, content: &str, view: ReasoningView);
    fn update_answer(&mut self, handle: MessageHandle, content: &str);
    fn finalize(&mut self, handle: MessageHandle, error: Option<&str>);
    /// Transient system line outside any turn.
    fn notify(&mut self, text: &str);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    Pending,
    Completed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationTurn {
    pub prompt: String,
    pub label: String,
    pub backend_kind: BackendKind,
    pub outcome: TurnOutcome,
}

impl GenerationTurn {
    pub fn new(prompt: impl Into<String>, label: impl Into<String>, backend_kind: BackendKind) -> Self {
        Self {
            prompt: prompt.into(),
            label: label.into(),
            backend_kind,
            outcome: TurnOutcome::Pending,
        }
    }
}

/// Accumulated view of one turn's output.
#[derive(Debug, Clone, Default)]
pub struct ReasoningState {
    text: ThinkSplitter,
    explicit_reasoning: String,
    revealed: bool,
    closed: bool,
}

/// What one delta changes on screen. Content is unrendered text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderStep {
    pub reasoning: Option<(String, ReasoningView)>,
    pub answer: Option<String>,
}

impl ReasoningState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raw_text(&self) -> &str {
        self.text.raw_text()
    }

    pub fn explicit_reasoning(&self) -> &str {
        &self.explicit_reasoning
    }

    pub fn revealed(&self) -> bool {
        self.revealed
    }

    pub fn closed(&self) -> bool {
        self.closed
    }

    pub fn apply(&mut self, delta: &StreamDelta) -> RenderStep {
        match delta.kind {
            DeltaKind::Reasoning => {
                self.explicit_reasoning.push_str(&delta.fragment);
                self.revealed = true;
                RenderStep {
                    reasoning: Some((
                        self.explicit_reasoning.clone(),
                        ReasoningView {
                            visible: true,
                            expanded: true,
                        },
                    )),
                    answer: None,
                }
            }
            DeltaKind::Text => {
                let split = self.text.push(&delta.fragment);
                if !self.explicit_reasoning.is_empty() {
                    // The reasoning channel owns the reasoning region; inline
                    // tags in the text channel never reopen it.
                    self.closed = true;
                    let answer = if split.response.is_empty() {
                        self.text.raw_text().to_string()
                    } else {
                        split.response
                    };
                    return RenderStep {
                        reasoning: Some((
                            self.explicit_reasoning.clone(),
                            ReasoningView {
                                visible: true,
                                expanded: false,
                            },
                        )),
                        answer: Some(answer),
                    };
                }

                if !split.thinking.is_empty() {
                    self.revealed = true;
                }
                if self.revealed && !split.response.is_empty() {
                    self.closed = true;
                }
                let reasoning = self.revealed.then(|| {
                    (
                        split.thinking,
                        ReasoningView {
                            visible: true,
                            expanded: !self.closed,
                        },
                    )
                });
                RenderStep {
                    reasoning,
                    answer: Some(split.response),
                }
            }
        }
    }
}

/// Drives one turn: consumes deltas in order and renders after each one.
#[derive(Clone)]
pub struct RenderController {
    renderer: Arc<dyn MarkdownRenderer>,
    delta_timeout: Option<Duration>,
}

impl RenderController {
    pub fn new(renderer: Arc<dyn MarkdownRenderer>) -> Self {
        Self {
            renderer,
            delta_timeout: None,
        }
    }

    /// Fails the turn when the next delta takes longer than `timeout`.
    pub fn with_delta_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.delta_timeout = timeout;
        self
    }

    pub async fn run(
        &self,
        turn: &mut GenerationTurn,
        mut deltas: DeltaStream,
        sink: &mut dyn RenderSink,
    ) -> TurnOutcome {
        sink.append_user_message(&turn.label);
        let handle = sink.begin_assistant_message();
        let mut state = ReasoningState::new();
        turn.outcome = TurnOutcome::Pending;
        info!(backend = ?turn.backend_kind, label = %turn.label, "turn started");

        let mut delta_count = 0usize;
        let failure = loop {
            let item = match self.next_delta(&mut deltas).await {
                Ok(Some(item)) => item,
                Ok(None) => break None,
                Err(error) => break Some(error),
            };
            let delta = match item {
                Ok(delta) => delta,
                Err(error) => break Some(error),
            };
            delta_count += 1;
            debug!(kind = ?delta.kind, len = delta.fragment.len(), "delta");
            let step = state.apply(&delta);
            self.render(sink, handle, step);
        };

        match failure {
            None => {
                turn.outcome = TurnOutcome::Completed;
                sink.finalize(handle, None);
                info!(delta_count, "turn completed");
            }
            Some(error) => {
                turn.outcome = TurnOutcome::Failed;
                warn!(delta_count, "turn failed: {error}");
                sink.finalize(handle, Some(&format!("Error: {error}")));
            }
        }
        turn.outcome
    }

    async fn next_delta(
        &self,
        deltas: &mut DeltaStream,
    ) -> Result<Option<DeltaItem>, LucidAiError> {
        let Some(limit) = self.delta_timeout else {
            return Ok(deltas.next().await);
        };
        tokio::time::timeout(limit, deltas.next())
            .await
            .map_err(|_| {
                LucidAiError::new(
                    LucidAiErrorCode::Timeout,
                    format!("no output for {}s", limit.as_secs_f64()),
                )
            })
    }

    fn render(&self, sink: &mut dyn RenderSink, handle: MessageHandle, step: RenderStep) {
        if let Some((reasoning, view)) = step.reasoning {
            sink.update_reasoning(handle, &self.renderer.render(&reasoning), view);
        }
        if let Some(answer) = step.answer {
            sink.update_answer(handle, &self.renderer.render(&answer));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expanded() -> ReasoningView {
        ReasoningView {
            visible: true,
            expanded: true,
        }
    }

    fn collapsed() -> ReasoningView {
        ReasoningView {
            visible: true,
            expanded: false,
        }
    }

    #[test]
    fn plain_text_is_answer_without_reasoning_region() {
        let mut state = ReasoningState::new();
        let step = state.apply(&StreamDelta::text("Hello"));
        assert_eq!(step.reasoning, None);
        assert_eq!(step.answer.as_deref(), Some("Hello"));
        assert!(!state.revealed());
    }

    #[test]
    fn inline_reasoning_stays_expanded_until_answer_starts() {
        let mut state = ReasoningState::new();

        let step = state.apply(&StreamDelta::text("<think>"));
        assert_eq!(step.reasoning, None);
        assert_eq!(step.answer.as_deref(), Some(""));

        let step = state.apply(&StreamDelta::text("plan"));
        assert_eq!(step.reasoning, Some(("plan".to_string(), expanded())));

        let step = state.apply(&StreamDelta::text("</think>"));
        assert_eq!(step.reasoning, Some(("plan".to_string(), expanded())));
        assert_eq!(step.answer.as_deref(), Some(""));

        let step = state.apply(&StreamDelta::text("Done."));
        assert_eq!(step.reasoning, Some(("plan".to_string(), collapsed())));
        assert_eq!(step.answer.as_deref(), Some("Done."));
        assert!(state.closed());
    }

    #[test]
    fn explicit_reasoning_collapses_on_first_text() {
        let mut state = ReasoningState::new();
        let step = state.apply(&StreamDelta::reasoning("thought"));
        assert_eq!(step.reasoning, Some(("thought".to_string(), expanded())));
        assert_eq!(step.answer, None);

        let step = state.apply(&StreamDelta::text("final"));
        assert_eq!(step.reasoning, Some(("thought".to_string(), collapsed())));
        assert_eq!(step.answer.as_deref(), Some("final"));
        assert!(state.revealed() && state.closed());
    }

    #[test]
    fn explicit_channel_wins_over_inline_tags() {
        let mut state = ReasoningState::new();
        state.apply(&StreamDelta::reasoning("channel"));

        let step = state.apply(&StreamDelta::text("<think>inline"));
        assert_eq!(step.reasoning, Some(("channel".to_string(), collapsed())));
        assert_eq!(step.answer.as_deref(), Some("<think>inline"));

        let step = state.apply(&StreamDelta::text("</think>answer"));
        assert_eq!(step.reasoning, Some(("channel".to_string(), collapsed())));
        assert_eq!(step.answer.as_deref(), Some("answer"));
    }

    #[test]
    fn reasoning_after_text_reopens_region_but_stays_closed() {
        let mut state = ReasoningState::new();
        state.apply(&StreamDelta::reasoning("a"));
        state.apply(&StreamDelta::text("b"));
        let step = state.apply(&StreamDelta::reasoning("c"));
        assert_eq!(step.reasoning, Some(("ac".to_string(), expanded())));
        assert!(state.closed());
        assert_eq!(state.raw_text(), "b");
        assert_eq!(state.explicit_reasoning(), "ac");
    }

    #[test]
    fn whitespace_only_thinking_still_collapses_once_revealed() {
        let mut state = ReasoningState::new();
        state.apply(&StreamDelta::text("<think> "));
        assert!(state.revealed());
        let step = state.apply(&StreamDelta::text("</think>ok"));
        assert_eq!(step.reasoning, Some((String::new(), collapsed())));
        assert_eq!(step.answer.as_deref(), Some("ok"));
    }
}
