use pulldown_cmark::{html, Event, Options, Parser};

/// Full re-render of accumulated text into display markup.
pub trait MarkdownRenderer: Send + Sync {
    fn render(&self, text: &str) -> String;
}

/// CommonMark to HTML. Raw HTML in model output is escaped, and single line
/// breaks are kept as `<br />`.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlMarkdown;

impl MarkdownRenderer for HtmlMarkdown {
    fn render(&self, text: &str) -> String {
        if text.is_empty() {
            return String::new();
        }
        let mut options = Options::empty();
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TABLES);

        let events = Parser::new_ext(text, options).map(|event| match event {
            Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
            Event::SoftBreak => Event::HardBreak,
            other => other,
        });
        let mut rendered = String::with_capacity(text.len() * 3 / 2);
        html::push_html(&mut rendered, events);
        rendered
    }
}

/// Passes text through, trimmed. Used where markup cannot be displayed.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainText;

impl MarkdownRenderer for PlainText {
    fn render(&self, text: &str) -> String {
        text.trim().to_string()
    }
}
