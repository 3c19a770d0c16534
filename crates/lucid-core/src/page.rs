use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::PanelError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageContent {
    pub content: String,
    pub title: String,
    pub url: String,
}

impl PageContent {
    pub fn new(
        content: impl Into<String>,
        title: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            content: content.into(),
            title: title.into(),
            url: url.into(),
        }
    }
}

/// Supplies the text of the page the user is looking at.
#[async_trait]
pub trait PageContentProvider: Send + Sync {
    async fn page_content(&self) -> Result<PageContent, PanelError>;
}

/// A page that is already in memory.
#[derive(Debug, Clone)]
pub struct StaticPage(pub PageContent);

#[async_trait]
impl PageContentProvider for StaticPage {
    async fn page_content(&self) -> Result<PageContent, PanelError> {
        Ok(self.0.clone())
    }
}

/// Used when there is no page to read at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPage;

#[async_trait]
impl PageContentProvider for NoPage {
    async fn page_content(&self) -> Result<PageContent, PanelError> {
        Err(PanelError::NoActiveTab)
    }
}
