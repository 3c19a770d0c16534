use std::io::Read;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use lucid_core::{PageContent, PageContentProvider, PanelError};
use scraper::{Html, Selector};
use tracing::{debug, info};

const MAIN_CONTENT_SELECTOR: &str = "main, article, [role=\"main\"]";
const SKIPPED_TAGS: &[&str] = &["script", "style", "noscript", "template", "svg", "head"];
const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "blockquote", "body", "dd", "div", "dl", "dt", "figcaption",
    "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "li", "main",
    "nav", "ol", "p", "pre", "section", "table", "td", "th", "tr", "ul",
];
const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Picks a page source for a CLI argument: http(s) URLs are fetched, anything
/// else is read as a file (`-` for stdin).
pub fn page_source_for(target: Option<&str>) -> Box<dyn PageContentProvider> {
    match target.map(str::trim).filter(|value| !value.is_empty()) {
        None => Box::new(lucid_core::NoPage),
        Some(value) if value.starts_with("http://") || value.starts_with("https://") => {
            Box::new(UrlPageSource::new(value))
        }
        Some(value) => Box::new(FilePageSource::new(value)),
    }
}

#[derive(Debug, Clone)]
pub struct UrlPageSource {
    url: String,
}

impl UrlPageSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[async_trait]
impl PageContentProvider for UrlPageSource {
    async fn page_content(&self) -> Result<PageContent, PanelError> {
        let client = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .user_agent(concat!("lucid/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|error| PanelError::PageUnreadable(error.to_string()))?;
        let response = client
            .get(self.url.as_str())
            .send()
            .await
            .map_err(|error| PanelError::PageUnreadable(error.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(PanelError::PageUnreadable(format!("HTTP {}", status.as_u16())));
        }
        let final_url = response.url().to_string();
        let html = response
            .text()
            .await
            .map_err(|error| PanelError::PageUnreadable(error.to_string()))?;
        info!(url = %final_url, bytes = html.len(), "fetched page");
        extract_page(&html, &final_url)
    }
}

#[derive(Debug, Clone)]
pub struct FilePageSource {
    path: PathBuf,
}

impl FilePageSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn is_stdin(&self) -> bool {
        self.path.as_os_str() == "-"
    }

    fn read(&self) -> Result<String, PanelError> {
        if self.is_stdin() {
            let mut content = String::new();
            std::io::stdin()
                .read_to_string(&mut content)
                .map_err(|error| PanelError::PageUnreadable(format!("stdin: {error}")))?;
            return Ok(content);
        }
        std::fs::read_to_string(&self.path).map_err(|error| {
            PanelError::PageUnreadable(format!("{}: {error}", self.path.display()))
        })
    }

    fn location(&self) -> String {
        if self.is_stdin() {
            return "stdin".to_string();
        }
        let absolute = std::fs::canonicalize(&self.path).unwrap_or_else(|_| self.path.clone());
        format!("file://{}", absolute.display())
    }
}

#[async_trait]
impl PageContentProvider for FilePageSource {
    async fn page_content(&self) -> Result<PageContent, PanelError> {
        let content = self.read()?;
        let location = self.location();
        if looks_like_html(&content) {
            return extract_page(&content, &location);
        }
        let text = content.trim();
        if text.is_empty() {
            return Err(PanelError::PageUnreadable("no readable text".to_string()));
        }
        let title = self
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| location.clone());
        Ok(PageContent::new(text, title, location))
    }
}

fn looks_like_html(content: &str) -> bool {
    let head = content
        .chars()
        .take(1024)
        .collect::<String>()
        .to_ascii_lowercase();
    head.contains("<html") || head.contains("<!doctype html") || head.contains("<body")
}

/// Readable text of an HTML document: the first `main`, `article` or
/// `[role="main"]` element, else the body, with one line per block.
pub fn extract_page(html: &str, url: &str) -> Result<PageContent, PanelError> {
    let document = Html::parse_document(html);
    let title_selector = selector("title")?;
    let main_selector = selector(MAIN_CONTENT_SELECTOR)?;
    let body_selector = selector("body")?;

    let title = document
        .select(&title_selector)
        .next()
        .map(|title| normalize_whitespace(&title.text().collect::<String>()))
        .unwrap_or_default();
    let root = document
        .select(&main_selector)
        .next()
        .or_else(|| document.select(&body_selector).next())
        .unwrap_or_else(|| document.root_element());

    let mut raw = String::new();
    let mut last_block = None;
    for node in root.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let skipped = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|element| SKIPPED_TAGS.contains(&element.name()))
        });
        if skipped {
            continue;
        }
        let block = node
            .ancestors()
            .find(|ancestor| {
                ancestor
                    .value()
                    .as_element()
                    .is_some_and(|element| BLOCK_TAGS.contains(&element.name()))
            })
            .map(|ancestor| ancestor.id());
        if block != last_block && !raw.is_empty() {
            raw.push('\n');
        }
        last_block = block;
        raw.extend(text.chars().map(|ch| if ch.is_whitespace() { ' ' } else { ch }));
    }

    let content = raw
        .lines()
        .map(normalize_whitespace)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n");
    if content.is_empty() {
        return Err(PanelError::PageUnreadable("no readable text".to_string()));
    }
    debug!(chars = content.chars().count(), "extracted page text");
    Ok(PageContent::new(content, title, url))
}

fn selector(source: &str) -> Result<Selector, PanelError> {
    Selector::parse(source)
        .map_err(|error| PanelError::PageUnreadable(format!("selector {source}: {error:?}")))
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
