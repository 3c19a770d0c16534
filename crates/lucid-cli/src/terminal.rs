use std::io::Write;

use lucid_ai::{split, THINK_OPEN};
use lucid_core::{MessageHandle, ReasoningView, RenderSink};

const DIM_STYLE: &str = "\x1b[2m";
const ERROR_STYLE: &str = "\x1b[31m";
const ANSI_STYLE_RESET: &str = "\x1b[0m";

/// Streams a transcript to a terminal.
///
/// Updates carry the full re-rendered text, so only the part past what is
/// already on screen gets written. Notices go to a separate writer.
pub struct TerminalSink<W: Write + Send, E: Write + Send> {
    out: W,
    notices: E,
    styled: bool,
    show_reasoning: bool,
    next_handle: u64,
    reasoning_shown: String,
    reasoning_open: bool,
    answer_shown: String,
    write_error: Option<String>,
}

impl<W: Write + Send, E: Write + Send> TerminalSink<W, E> {
    pub fn new(out: W, notices: E) -> Self {
        Self {
            out,
            notices,
            styled: false,
            show_reasoning: true,
            next_handle: 0,
            reasoning_shown: String::new(),
            reasoning_open: false,
            answer_shown: String::new(),
            write_error: None,
        }
    }

    pub fn with_ansi(mut self, styled: bool) -> Self {
        self.styled = styled;
        self
    }

    pub fn with_reasoning(mut self, show_reasoning: bool) -> Self {
        self.show_reasoning = show_reasoning;
        self
    }

    /// First write failure, if any.
    pub fn take_error(&mut self) -> Option<String> {
        self.write_error.take()
    }

    pub fn into_inner(self) -> (W, E) {
        (self.out, self.notices)
    }

    fn style(&self, code: &'static str) -> &'static str {
        if self.styled {
            code
        } else {
            ""
        }
    }

    fn write_out(&mut self, text: &str) {
        if self.write_error.is_some() {
            return;
        }
        if let Err(error) = self
            .out
            .write_all(text.as_bytes())
            .and_then(|_| self.out.flush())
        {
            self.write_error = Some(format!("stdout write failed: {error}"));
        }
    }

    fn close_reasoning(&mut self) {
        if self.reasoning_open {
            let reset = self.style(ANSI_STYLE_RESET);
            self.write_out(&format!("{reset}\n\n"));
            self.reasoning_open = false;
        }
    }
}

impl<W: Write + Send, E: Write + Send> RenderSink for TerminalSink<W, E> {
    fn append_user_message(&mut self, label: &str) {
        self.write_out(&format!("> {label}\n\n"));
    }

    fn begin_assistant_message(&mut self) -> MessageHandle {
        self.next_handle += 1;
        self.reasoning_shown.clear();
        self.reasoning_open = false;
        self.answer_shown.clear();
        MessageHandle(self.next_handle)
    }

    fn update_reasoning(&mut self, _handle: MessageHandle, content: &str, view: ReasoningView) {
        // Once the answer is on screen the reasoning block is finished.
        if !self.show_reasoning || !view.visible || !self.answer_shown.is_empty() {
            return;
        }
        let Some(suffix) = content.strip_prefix(self.reasoning_shown.as_str()) else {
            return;
        };
        if suffix.is_empty() {
            return;
        }
        let suffix = suffix.to_string();
        if !self.reasoning_open {
            let dim = self.style(DIM_STYLE);
            self.write_out(&format!("{dim}thinking: "));
            self.reasoning_open = true;
        }
        self.write_out(&suffix);
        self.reasoning_shown = content.to_string();
    }

    fn update_answer(&mut self, _handle: MessageHandle, content: &str) {
        if content.is_empty() || is_unfinished_think_block(content) {
            return;
        }
        self.close_reasoning();
        match content.strip_prefix(self.answer_shown.as_str()) {
            Some(suffix) => {
                let suffix = suffix.to_string();
                self.write_out(&suffix);
            }
            None => {
                // The renderer rewrote earlier text; start the answer over.
                self.write_out(&format!("\n{content}"));
            }
        }
        self.answer_shown = content.to_string();
    }

    fn finalize(&mut self, _handle: MessageHandle, error: Option<&str>) {
        self.close_reasoning();
        match error {
            Some(error) => {
                let red = self.style(ERROR_STYLE);
                let reset = self.style(ANSI_STYLE_RESET);
                let lead = if self.answer_shown.is_empty() { "" } else { "\n" };
                self.write_out(&format!("{lead}{red}{error}{reset}\n"));
            }
            None => self.write_out("\n"),
        }
    }

    fn notify(&mut self, text: &str) {
        if let Err(error) = writeln!(self.notices, "* {text}").and_then(|_| self.notices.flush()) {
            self.write_error.get_or_insert(format!("stderr write failed: {error}"));
        }
    }
}

/// Raw `<think>` text shown as the answer until its split response arrives.
fn is_unfinished_think_block(content: &str) -> bool {
    content.contains(THINK_OPEN) && split(content).response.is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sink() -> TerminalSink<Vec<u8>, Vec<u8>> {
        TerminalSink::new(Vec::new(), Vec::new())
    }

    fn output(sink: TerminalSink<Vec<u8>, Vec<u8>>) -> (String, String) {
        let (out, notices) = sink.into_inner();
        (
            String::from_utf8(out).expect("utf8 stdout"),
            String::from_utf8(notices).expect("utf8 notices"),
        )
    }

    const OPEN: ReasoningView = ReasoningView {
        visible: true,
        expanded: true,
    };

    #[test]
    fn writes_only_new_suffixes() {
        let mut sink = sink();
        sink.append_user_message("Summarize: Example");
        let handle = sink.begin_assistant_message();
        sink.update_reasoning(handle, "reason A", OPEN);
        sink.update_reasoning(handle, "reason A reason B", OPEN);
        sink.update_answer(handle, "");
        sink.update_answer(handle, "answer");
        sink.update_answer(handle, "answer X");
        sink.finalize(handle, None);

        let (out, _) = output(sink);
        assert_eq!(
            out,
            "> Summarize: Example\n\nthinking: reason A reason B\n\nanswer X\n"
        );
    }

    #[test]
    fn error_is_appended_after_partial_answer() {
        let mut sink = sink();
        let handle = sink.begin_assistant_message();
        sink.update_answer(handle, "partial");
        sink.finalize(handle, Some("Error: Transport: reset"));

        let (out, _) = output(sink);
        assert_eq!(out, "partial\nError: Transport: reset\n");
    }

    #[test]
    fn hidden_reasoning_is_not_printed() {
        let mut sink = sink().with_reasoning(false);
        let handle = sink.begin_assistant_message();
        sink.update_reasoning(handle, "secret", OPEN);
        sink.update_answer(handle, "shown");
        sink.finalize(handle, None);
        sink.notify("Chat cleared.");

        let (out, notices) = output(sink);
        assert_eq!(out, "shown\n");
        assert_eq!(notices, "* Chat cleared.\n");
    }

    #[test]
    fn rewritten_answer_starts_over_on_a_new_line() {
        let mut sink = sink();
        let handle = sink.begin_assistant_message();
        sink.update_answer(handle, "draft");
        sink.update_answer(handle, "answer");
        let (out, _) = output(sink);
        assert_eq!(out, "draft\nanswer");
    }

    #[test]
    fn raw_think_block_is_held_back_until_the_response_starts() {
        let mut sink = sink();
        let handle = sink.begin_assistant_message();
        sink.update_reasoning(handle, "explicit", OPEN);
        sink.update_answer(handle, "<think>inline");
        sink.update_answer(handle, "<think>inline</think>");
        sink.update_answer(handle, "answer");
        sink.finalize(handle, None);

        let (out, _) = output(sink);
        assert_eq!(out, "thinking: explicit\n\nanswer\n");
    }
}
