//! Partitioning of inline `<think>...</think>` reasoning from the final answer.
//!
//! Reasoning models that lack a dedicated reasoning channel emit their chain of
//! thought inline, opening the output with `<think>`. The text after the
//! closing tag is the answer; until the closing tag arrives there is no answer.

pub const THINK_OPEN: &str = "<think>";
pub const THINK_CLOSE: &str = "</think>";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SplitResult {
    pub thinking: String,
    /// Empty while no closed answer exists yet.
    pub response: String,
}

pub fn split(raw: &str) -> SplitResult {
    match raw.find(THINK_OPEN) {
        None => SplitResult {
            thinking: String::new(),
            response: raw.to_string(),
        },
        Some(open) => split_at_offsets(raw, open, raw.find(THINK_CLOSE)),
    }
}

fn split_at_offsets(raw: &str, open: usize, close: Option<usize>) -> SplitResult {
    let start = open + THINK_OPEN.len();
    let Some(close) = close else {
        return SplitResult {
            thinking: raw[start..].to_string(),
            response: String::new(),
        };
    };

    // A stray closing tag ahead of the opening one leaves nothing in between.
    let thinking = raw.get(start..close).map(str::trim).unwrap_or_default();
    let response = raw[close + THINK_CLOSE.len()..].trim();
    SplitResult {
        thinking: thinking.to_string(),
        response: response.to_string(),
    }
}

/// Incremental form of [`split`] for append-only text.
///
/// Delimiter offsets are found once and cached; each push only rescans the new
/// tail plus enough overlap to catch a tag split across fragments. The result
/// after every push is identical to `split` over the accumulated text.
#[derive(Debug, Clone, Default)]
pub struct ThinkSplitter {
    raw: String,
    open: Option<usize>,
    close: Option<usize>,
    open_scan_from: usize,
    close_scan_from: usize,
}

impl ThinkSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, fragment: &str) -> SplitResult {
        self.raw.push_str(fragment);
        self.locate_delimiters();
        self.current()
    }

    pub fn raw_text(&self) -> &str {
        &self.raw
    }

    pub fn current(&self) -> SplitResult {
        match self.open {
            None => SplitResult {
                thinking: String::new(),
                response: self.raw.clone(),
            },
            Some(open) => split_at_offsets(&self.raw, open, self.close),
        }
    }

    fn locate_delimiters(&mut self) {
        if self.open.is_none() {
            self.open = find_from(&self.raw, THINK_OPEN, self.open_scan_from);
            self.open_scan_from = rescan_start(&self.raw, THINK_OPEN);
        }
        if self.close.is_none() {
            self.close = find_from(&self.raw, THINK_CLOSE, self.close_scan_from);
            self.close_scan_from = rescan_start(&self.raw, THINK_CLOSE);
        }
    }
}

fn find_from(haystack: &str, needle: &str, from: usize) -> Option<usize> {
    haystack
        .get(from..)
        .and_then(|tail| tail.find(needle))
        .map(|offset| from + offset)
}

fn rescan_start(haystack: &str, needle: &str) -> usize {
    let mut start = haystack.len().saturating_sub(needle.len() - 1);
    while !haystack.is_char_boundary(start) {
        start -= 1;
    }
    start
}
