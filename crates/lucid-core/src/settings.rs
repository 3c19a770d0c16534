use std::time::Duration;

use lucid_ai::{descriptor_for, ModelDescriptor, DEFAULT_LOCAL_MODEL};
use serde::{Deserialize, Serialize};

pub const DEFAULT_LOCAL_URL: &str = "http://127.0.0.1:8080/v1";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub configured: bool,
    pub use_provider: bool,
    pub local_model: String,
    /// Chat-completions endpoint of the local engine.
    pub local_url: String,
    pub url: String,
    pub key: String,
    pub model: String,
    /// Pins the context window used for budgeting. Remote turns are only
    /// truncated when this is set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context_window: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub turn_timeout_secs: Option<u64>,
    pub log: LogSettings,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stdout: Option<bool>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            configured: false,
            use_provider: false,
            local_model: DEFAULT_LOCAL_MODEL.to_string(),
            local_url: DEFAULT_LOCAL_URL.to_string(),
            url: String::new(),
            key: String::new(),
            model: String::new(),
            context_window: None,
            turn_timeout_secs: None,
            log: LogSettings::default(),
        }
    }
}

impl Settings {
    /// Provider mode with every connection field filled in.
    pub fn provider_ready(&self) -> bool {
        self.use_provider
            && !self.url.trim().is_empty()
            && !self.key.trim().is_empty()
            && !self.model.trim().is_empty()
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.use_provider && !self.provider_ready() {
            return Err("Please fill in all fields before saving.".to_string());
        }
        if !self.use_provider && self.local_model.trim().is_empty() {
            return Err("Please select a local model.".to_string());
        }
        Ok(())
    }

    pub fn local_model_id(&self) -> &str {
        let trimmed = self.local_model.trim();
        if trimmed.is_empty() {
            DEFAULT_LOCAL_MODEL
        } else {
            trimmed
        }
    }

    /// Descriptor used to budget a turn, or `None` when the turn is sent whole.
    pub fn budget_model(&self) -> Option<ModelDescriptor> {
        if self.use_provider {
            return self
                .context_window
                .map(|tokens| ModelDescriptor::new(self.model.trim(), tokens));
        }
        let mut descriptor = descriptor_for(self.local_model_id());
        if let Some(tokens) = self.context_window {
            descriptor.context_window_tokens = tokens;
        }
        Some(descriptor)
    }

    pub fn turn_timeout(&self) -> Option<Duration> {
        self.turn_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_mode_requires_every_connection_field() {
        let mut settings = Settings {
            use_provider: true,
            url: "https://api.example.com/v1".to_string(),
            key: "sk-test".to_string(),
            ..Settings::default()
        };
        assert_eq!(
            settings.validate(),
            Err("Please fill in all fields before saving.".to_string())
        );
        settings.model = "gpt-test".to_string();
        assert_eq!(settings.validate(), Ok(()));
        assert!(settings.provider_ready());
    }

    #[test]
    fn local_mode_requires_a_model() {
        let settings = Settings {
            local_model: "  ".to_string(),
            ..Settings::default()
        };
        assert_eq!(
            settings.validate(),
            Err("Please select a local model.".to_string())
        );
        assert_eq!(settings.local_model_id(), DEFAULT_LOCAL_MODEL);
    }

    #[test]
    fn remote_turns_are_budgeted_only_with_pinned_context() {
        let mut settings = Settings {
            use_provider: true,
            model: "gpt-test".to_string(),
            ..Settings::default()
        };
        assert_eq!(settings.budget_model(), None);
        settings.context_window = Some(8192);
        assert_eq!(
            settings.budget_model(),
            Some(ModelDescriptor::new("gpt-test", 8192))
        );
    }

    #[test]
    fn local_turns_use_catalog_context() {
        let settings = Settings {
            local_model: "TinyLlama-1.1B-Chat-v1.0-q4f16_1-MLC".to_string(),
            ..Settings::default()
        };
        let descriptor = settings.budget_model().expect("local budget");
        assert_eq!(descriptor.context_window_tokens, 2048);
    }

    #[test]
    fn zero_timeout_disables_it() {
        let settings = Settings {
            turn_timeout_secs: Some(0),
            ..Settings::default()
        };
        assert_eq!(settings.turn_timeout(), None);
    }
}
