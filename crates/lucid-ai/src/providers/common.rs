use std::sync::OnceLock;

use reqwest::Client;
use serde_json::{json, Value};

use crate::types::ChatRequest;

pub(super) fn join_url(base_url: &str, path: &str) -> String {
    format!("{}/{path}", base_url.trim_end_matches('/'))
}

pub(super) fn shared_http_client(base_url: &str) -> &'static Client {
    static DEFAULT_CLIENT: OnceLock<Client> = OnceLock::new();
    static LOOPBACK_CLIENT: OnceLock<Client> = OnceLock::new();

    if is_loopback_base_url(base_url) {
        LOOPBACK_CLIENT.get_or_init(|| {
            Client::builder()
                .no_proxy()
                .build()
                .unwrap_or_else(|_| Client::new())
        })
    } else {
        DEFAULT_CLIENT.get_or_init(Client::new)
    }
}

pub(super) fn is_loopback_base_url(base_url: &str) -> bool {
    let Ok(url) = reqwest::Url::parse(base_url) else {
        return false;
    };
    let Some(host) = url.host_str() else {
        return false;
    };
    host.eq_ignore_ascii_case("localhost") || host == "127.0.0.1" || host == "[::1]"
}

pub(super) fn build_chat_payload(request: &ChatRequest) -> Value {
    let mut payload = json!({
        "model": request.model,
        "stream": true,
        "messages": request.messages,
    });
    if let Some(max_tokens) = request.max_tokens {
        payload["max_tokens"] = json!(max_tokens);
    }
    if let Some(temperature) = request.temperature {
        payload["temperature"] = json!(temperature);
    }
    payload
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_url_drops_trailing_slashes() {
        assert_eq!(
            join_url("https://api.example.com/v1//", "chat/completions"),
            "https://api.example.com/v1/chat/completions"
        );
        assert_eq!(
            join_url("http://127.0.0.1:8080/v1", "models"),
            "http://127.0.0.1:8080/v1/models"
        );
    }

    #[test]
    fn loopback_detection_covers_local_hosts_only() {
        assert!(is_loopback_base_url("http://localhost:11434/v1"));
        assert!(is_loopback_base_url("http://127.0.0.1:8080/v1"));
        assert!(is_loopback_base_url("http://[::1]:8080/v1"));
        assert!(!is_loopback_base_url("https://api.openai.com/v1"));
        assert!(!is_loopback_base_url("not a url"));
    }

    #[test]
    fn http_client_is_reused_across_requests() {
        let first = shared_http_client("https://api.example.com/v1");
        let second = shared_http_client("https://api.example.com/v1");
        assert!(std::ptr::eq(first, second));
    }

    #[test]
    fn payload_includes_optional_limits_only_when_set() {
        let request = ChatRequest::page_analysis("m", "p");
        let payload = build_chat_payload(&request);
        assert_eq!(payload["stream"], true);
        assert_eq!(payload["messages"][1]["content"], "p");
        assert!(payload.get("max_tokens").is_none());

        let bounded = build_chat_payload(&request.with_max_tokens(Some(682)));
        assert_eq!(bounded["max_tokens"], 682);
        assert_eq!(bounded["temperature"], 0.7);
    }
}
