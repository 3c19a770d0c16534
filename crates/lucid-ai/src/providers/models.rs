use serde::Deserialize;
use tracing::info;

use super::common::{join_url, shared_http_client};
use crate::error::{LucidAiError, LucidAiErrorCode};

#[derive(Debug, Default, Deserialize)]
struct ModelList {
    #[serde(default)]
    data: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    #[serde(default)]
    id: Option<String>,
}

/// Lists the model ids an OpenAI-compatible server offers, sorted.
pub async fn fetch_models(base_url: &str, api_key: &str) -> Result<Vec<String>, LucidAiError> {
    let endpoint = join_url(base_url, "models");
    let response = shared_http_client(base_url)
        .get(endpoint.as_str())
        .bearer_auth(api_key)
        .send()
        .await
        .map_err(|error| {
            LucidAiError::new(
                LucidAiErrorCode::Transport,
                format!("Model listing failed: {error}"),
            )
        })?;

    if !response.status().is_success() {
        return Err(LucidAiError::new(
            LucidAiErrorCode::Http,
            format!("HTTP {}", response.status().as_u16()),
        ));
    }

    let list = response.json::<ModelList>().await.map_err(|error| {
        LucidAiError::new(
            LucidAiErrorCode::Protocol,
            format!("Invalid model list: {error}"),
        )
    })?;

    let mut ids = list
        .data
        .into_iter()
        .filter_map(|entry| entry.id)
        .filter(|id| !id.is_empty())
        .collect::<Vec<_>>();
    ids.sort();
    info!(count = ids.len(), endpoint = %endpoint, "fetched model list");
    Ok(ids)
}
