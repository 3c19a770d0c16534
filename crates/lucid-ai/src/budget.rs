use crate::types::ModelDescriptor;

/// Estimated overhead of the system prompt and message framing.
pub const SYSTEM_PROMPT_TOKENS: u32 = 150;
/// Conservative heuristic for English text plus markup.
pub const CHARS_PER_TOKEN: usize = 3;
pub const MAX_OUTPUT_TOKENS: u32 = 1024;
pub const MIN_INPUT_TOKENS: u32 = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BudgetPlan {
    pub output_tokens: u32,
    pub input_chars: usize,
}

/// One third of the context window, capped at [`MAX_OUTPUT_TOKENS`].
pub fn output_token_budget(model: &ModelDescriptor) -> u32 {
    MAX_OUTPUT_TOKENS.min(model.context_window_tokens / 3)
}

/// Characters of page content that fit in a single inference pass.
pub fn available_input_chars(model: &ModelDescriptor) -> usize {
    let available = i64::from(model.context_window_tokens)
        - i64::from(SYSTEM_PROMPT_TOKENS)
        - i64::from(output_token_budget(model));
    let tokens = available.max(i64::from(MIN_INPUT_TOKENS));
    usize::try_from(tokens).unwrap_or(MIN_INPUT_TOKENS as usize) * CHARS_PER_TOKEN
}

pub fn plan(model: &ModelDescriptor) -> BudgetPlan {
    BudgetPlan {
        output_tokens: output_token_budget(model),
        input_chars: available_input_chars(model),
    }
}

/// Prefix of `text` holding at most `max_chars` characters.
pub fn truncate_to_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_offset, _)) => &text[..byte_offset],
        None => text,
    }
}
