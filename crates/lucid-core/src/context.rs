use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use lucid_ai::{
    plan, stream, BackendKind, BudgetPlan, ChatRequest, LocalBackend, LocalEngine, RemoteBackend,
    StreamBackendRef,
};
use tracing::{debug, info, warn};

use crate::controller::{GenerationTurn, RenderController, RenderSink, TurnOutcome};
use crate::error::PanelError;
use crate::markdown::MarkdownRenderer;
use crate::page::PageContentProvider;
use crate::prompt::{question_prompt, summarize_prompt};
use crate::settings::Settings;

pub const CHAT_CLEARED_NOTICE: &str = "Chat cleared.";

/// Process-wide panel state: settings, the loaded engine and the busy gate.
pub struct AppContext {
    settings: Settings,
    engine: Option<Arc<dyn LocalEngine>>,
    loaded_model: Option<String>,
    busy: Arc<AtomicBool>,
    controller: RenderController,
}

/// Holds the busy gate for one turn and releases it on drop.
#[derive(Debug)]
pub struct BusyGuard {
    busy: Arc<AtomicBool>,
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::SeqCst);
    }
}

impl AppContext {
    pub fn new(settings: Settings, renderer: Arc<dyn MarkdownRenderer>) -> Self {
        let controller = RenderController::new(renderer).with_delta_timeout(settings.turn_timeout());
        Self {
            settings,
            engine: None,
            loaded_model: None,
            busy: Arc::new(AtomicBool::new(false)),
            controller,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Swaps settings. Switching to provider mode drops the local engine.
    pub fn update_settings(&mut self, settings: Settings) {
        self.controller = self
            .controller
            .clone()
            .with_delta_timeout(settings.turn_timeout());
        if settings.use_provider {
            self.engine = None;
            self.loaded_model = None;
        }
        self.settings = settings;
    }

    pub fn install_engine(&mut self, engine: Arc<dyn LocalEngine>) {
        let model_id = engine.model_id().to_string();
        info!(model = %model_id, "engine installed");
        self.engine = Some(engine);
        self.loaded_model = Some(model_id);
    }

    pub fn loaded_model(&self) -> Option<&str> {
        self.loaded_model.as_deref()
    }

    /// Local mode whose selected model is not the one loaded.
    pub fn needs_engine_load(&self) -> bool {
        !self.settings.use_provider
            && self.loaded_model.as_deref() != Some(self.settings.local_model_id())
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    pub fn try_begin_turn(&self) -> Option<BusyGuard> {
        self.busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| BusyGuard {
                busy: Arc::clone(&self.busy),
            })
    }

    fn backend(&self) -> Option<StreamBackendRef> {
        let backend: StreamBackendRef = if self.settings.use_provider {
            Arc::new(RemoteBackend::new(
                self.settings.url.trim(),
                self.settings.key.trim(),
            ))
        } else {
            Arc::new(LocalBackend::new(Arc::clone(self.engine.as_ref()?)))
        };
        Some(backend)
    }

    /// `None` when the active model has no known context window.
    fn budget_plan(&self) -> Option<BudgetPlan> {
        self.settings.budget_model().map(|model| plan(&model))
    }

    fn chat_request(&self, prompt: &str, budget: Option<BudgetPlan>) -> ChatRequest {
        if self.settings.use_provider {
            return ChatRequest::page_analysis(self.settings.model.trim(), prompt);
        }
        let model_id = self
            .loaded_model
            .as_deref()
            .unwrap_or_else(|| self.settings.local_model_id());
        ChatRequest::page_analysis(model_id, prompt)
            .with_max_tokens(budget.map(|budget| budget.output_tokens))
    }

    /// Runs one turn with a raw prompt. Returns `None` without touching `sink`
    /// while another turn is in flight or when no backend is ready.
    pub async fn generate(
        &self,
        prompt: &str,
        label: &str,
        sink: &mut dyn RenderSink,
    ) -> Option<TurnOutcome> {
        self.run_turn(prompt, label, self.budget_plan(), sink).await
    }

    async fn run_turn(
        &self,
        prompt: &str,
        label: &str,
        budget: Option<BudgetPlan>,
        sink: &mut dyn RenderSink,
    ) -> Option<TurnOutcome> {
        let Some(_guard) = self.try_begin_turn() else {
            debug!("generation ignored: turn in flight");
            return None;
        };
        let Some(backend) = self.backend() else {
            debug!("generation ignored: no engine loaded");
            return None;
        };

        let mut turn = GenerationTurn::new(prompt, label, backend.kind());
        let deltas = stream(backend, self.chat_request(prompt, budget));
        Some(self.controller.run(&mut turn, deltas, sink).await)
    }

    pub async fn summarize(
        &self,
        page_source: &dyn PageContentProvider,
        sink: &mut dyn RenderSink,
    ) -> Option<TurnOutcome> {
        let page = match page_source.page_content().await {
            Ok(page) => page,
            Err(error) => return notify_error(sink, error),
        };
        let budget = self.budget_plan();
        let turn = summarize_prompt(&page, budget.map(|budget| budget.input_chars));
        self.run_turn(&turn.prompt, &turn.label, budget, sink).await
    }

    pub async fn ask(
        &self,
        page_source: &dyn PageContentProvider,
        question: &str,
        sink: &mut dyn RenderSink,
    ) -> Option<TurnOutcome> {
        let question = question.trim();
        if question.is_empty() {
            return notify_error(sink, PanelError::EmptyInput);
        }
        let page = match page_source.page_content().await {
            Ok(page) => page,
            Err(error) => return notify_error(sink, error),
        };
        let budget = self.budget_plan();
        let turn = question_prompt(&page, question, budget.map(|budget| budget.input_chars));
        self.run_turn(&turn.prompt, &turn.label, budget, sink).await
    }

    pub async fn clear_chat(&self, sink: &mut dyn RenderSink) {
        if let Some(engine) = &self.engine {
            if let Err(error) = engine.reset_chat().await {
                warn!("engine reset failed: {error}");
            }
        }
        sink.notify(CHAT_CLEARED_NOTICE);
    }

    pub fn backend_kind(&self) -> BackendKind {
        if self.settings.use_provider {
            BackendKind::Remote
        } else {
            BackendKind::Local
        }
    }
}

fn notify_error(sink: &mut dyn RenderSink, error: PanelError) -> Option<TurnOutcome> {
    warn!("request rejected: {error}");
    sink.notify(&format!("Error: {error}"));
    None
}
