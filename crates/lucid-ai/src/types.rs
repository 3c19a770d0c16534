use serde::{Deserialize, Serialize};

pub const PAGE_ANALYSIS_SYSTEM_PROMPT: &str =
    "You are a helpful assistant that analyzes web pages. Be concise.";

const PAGE_ANALYSIS_TEMPERATURE: f64 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeltaKind {
    Reasoning,
    Text,
}

/// One increment of model output, consumed once in arrival order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamDelta {
    pub kind: DeltaKind,
    pub fragment: String,
}

impl StreamDelta {
    pub fn text(fragment: impl Into<String>) -> Self {
        Self {
            kind: DeltaKind::Text,
            fragment: fragment.into(),
        }
    }

    pub fn reasoning(fragment: impl Into<String>) -> Self {
        Self {
            kind: DeltaKind::Reasoning,
            fragment: fragment.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    Local,
    Remote,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    pub id: String,
    pub context_window_tokens: u32,
}

impl ModelDescriptor {
    pub fn new(id: impl Into<String>, context_window_tokens: u32) -> Self {
        Self {
            id: id.into(),
            context_window_tokens,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl ChatRequest {
    /// System framing plus the page prompt, the shape every generation turn sends.
    pub fn page_analysis(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            messages: vec![
                ChatMessage::system(PAGE_ANALYSIS_SYSTEM_PROMPT),
                ChatMessage::user(prompt),
            ],
            temperature: Some(PAGE_ANALYSIS_TEMPERATURE),
            max_tokens: None,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// A streamed `chat.completion.chunk` as served by OpenAI-compatible endpoints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletionChunk {
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
}

impl ChatCompletionChunk {
    pub fn from_content(content: impl Into<String>) -> Self {
        Self {
            choices: vec![ChunkChoice {
                delta: ChunkDelta {
                    content: Some(content.into()),
                    ..ChunkDelta::default()
                },
                finish_reason: None,
            }],
        }
    }

    pub fn first_delta(&self) -> Option<&ChunkDelta> {
        self.choices.first().map(|choice| &choice.delta)
    }

    pub fn content_fragment(&self) -> Option<&str> {
        self.first_delta()
            .and_then(|delta| delta.content.as_deref())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkChoice {
    #[serde(default)]
    pub delta: ChunkDelta,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkDelta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning_content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

impl ChunkDelta {
    /// Providers disagree on the field name for the reasoning channel.
    pub fn reasoning_fragment(&self) -> Option<&str> {
        [&self.reasoning_content, &self.reasoning]
            .into_iter()
            .filter_map(|field| field.as_deref())
            .find(|fragment| !fragment.is_empty())
    }
}
