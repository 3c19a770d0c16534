use lucid_ai::truncate_to_chars;

use crate::page::PageContent;

/// Prompt text and the label shown for it in the transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnPrompt {
    pub prompt: String,
    pub label: String,
}

pub fn summarize_prompt(page: &PageContent, max_chars: Option<usize>) -> TurnPrompt {
    let text = page_text(page, max_chars);
    TurnPrompt {
        prompt: format!(
            "Summarize this web page:\n\nTitle: {}\nURL: {}\n\n{}",
            page.title, page.url, text
        ),
        label: format!("Summarize: {}", page.title),
    }
}

/// `question` is expected to be trimmed and non-empty already.
pub fn question_prompt(page: &PageContent, question: &str, max_chars: Option<usize>) -> TurnPrompt {
    let text = page_text(page, max_chars);
    TurnPrompt {
        prompt: format!(
            "Web page: {} ({})\n\n{}\n\nQuestion: {}",
            page.title, page.url, text, question
        ),
        label: question.to_string(),
    }
}

fn page_text(page: &PageContent, max_chars: Option<usize>) -> &str {
    match max_chars {
        Some(limit) => truncate_to_chars(&page.content, limit),
        None => &page.content,
    }
}
