use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream;
use lucid_ai::{
    fetch_models, stream as start_stream, BackendKind, ChatCompletionChunk, ChatRequest,
    ClosureBackend, DeltaItem, DeltaStream, EngineChunkStream, HttpLocalEngine, LocalBackend,
    LocalEngine, LucidAiError, LucidAiErrorCode, RemoteBackend, StreamDelta,
};

struct CannedResponse {
    status_line: &'static str,
    content_type: &'static str,
    body: String,
    /// Declared length when it should differ from the body, to cut a stream short.
    declared_length: Option<usize>,
}

impl CannedResponse {
    fn sse(body: String) -> Self {
        Self {
            status_line: "200 OK",
            content_type: "text/event-stream",
            body,
            declared_length: None,
        }
    }

    fn json(status_line: &'static str, body: &str) -> Self {
        Self {
            status_line,
            content_type: "application/json",
            body: body.to_string(),
            declared_length: None,
        }
    }
}

fn read_request(socket: &mut TcpStream) -> String {
    socket
        .set_read_timeout(Some(Duration::from_secs(2)))
        .expect("set read timeout");
    let mut request = Vec::new();
    let mut buffer = [0_u8; 4096];
    loop {
        let read = socket.read(&mut buffer).unwrap_or(0);
        if read == 0 {
            break;
        }
        request.extend_from_slice(&buffer[..read]);
        let text = String::from_utf8_lossy(&request);
        if let Some(header_end) = text.find("\r\n\r\n") {
            let content_length = text[..header_end]
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            if request.len() >= header_end + 4 + content_length {
                break;
            }
        }
    }
    String::from_utf8_lossy(&request).into_owned()
}

/// Serves `responses` to consecutive connections and records each request.
fn spawn_server(responses: Vec<CannedResponse>) -> (String, Arc<Mutex<Vec<String>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind local test server");
    let address = listener.local_addr().expect("server local addr");
    let requests = Arc::new(Mutex::new(Vec::new()));
    let recorded = Arc::clone(&requests);
    thread::spawn(move || {
        for canned in responses {
            let Ok((mut socket, _)) = listener.accept() else {
                return;
            };
            let request = read_request(&mut socket);
            recorded.lock().expect("requests lock").push(request);
            let length = canned.declared_length.unwrap_or(canned.body.len());
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                canned.status_line, canned.content_type, length, canned.body
            );
            let _ = socket.write_all(response.as_bytes());
            let _ = socket.flush();
        }
    });
    (format!("http://{address}/v1"), requests)
}

fn sse_body(chunks: &[&str]) -> String {
    let mut body = String::new();
    for chunk in chunks {
        body.push_str("data: ");
        body.push_str(chunk);
        body.push_str("\n\n");
    }
    body
}

async fn collect(mut deltas: DeltaStream) -> Vec<DeltaItem> {
    let mut items = Vec::new();
    while let Some(item) = deltas.next().await {
        items.push(item);
    }
    items
}

fn request() -> ChatRequest {
    ChatRequest::page_analysis("test-model", "Summarize this web page:\n\nTitle: T")
}

#[tokio::test]
async fn remote_backend_maps_reasoning_and_text_channels_in_arrival_order() {
    let body = sse_body(&[
        r#"{"choices":[{"delta":{"role":"assistant","content":""}}]}"#,
        r#"{"choices":[{"delta":{"reasoning_content":"thought"}}]}"#,
        r#"{"choices":[{"delta":{"content":"fi"}}]}"#,
        r#"{"choices":[{"delta":{"reasoning":" more"}}]}"#,
        r#"{"choices":[{"delta":{"content":"nal"},"finish_reason":"stop"}]}"#,
        r#"{"choices":[],"usage":{"prompt_tokens":12,"completion_tokens":3}}"#,
        "[DONE]",
    ]);
    let (base_url, requests) = spawn_server(vec![CannedResponse::sse(body)]);
    let backend = Arc::new(RemoteBackend::new(base_url, "sk-test"));

    let items = collect(start_stream(backend, request())).await;

    assert_eq!(
        items,
        vec![
            Ok(StreamDelta::reasoning("thought")),
            Ok(StreamDelta::text("fi")),
            Ok(StreamDelta::reasoning(" more")),
            Ok(StreamDelta::text("nal")),
        ]
    );

    let requests = requests.lock().expect("requests lock");
    let sent = &requests[0];
    assert!(sent.starts_with("POST /v1/chat/completions"), "{sent}");
    assert!(sent.to_ascii_lowercase().contains("authorization: bearer sk-test"));
    assert!(sent.contains("\"stream\":true"));
    assert!(!sent.contains("max_tokens"));
}

#[tokio::test]
async fn remote_backend_reports_http_failure_as_terminal_error() {
    let (base_url, _) = spawn_server(vec![CannedResponse::json(
        "401 Unauthorized",
        r#"{"error":{"message":"bad key"}}"#,
    )]);
    let backend = Arc::new(RemoteBackend::new(base_url, "sk-wrong"));

    let items = collect(start_stream(backend, request())).await;

    assert_eq!(items.len(), 1);
    let error = items[0].clone().expect_err("http error");
    assert_eq!(error.code, LucidAiErrorCode::Http);
    assert!(error.message.contains("HTTP 401"), "{}", error.message);
    assert!(error.message.contains("bad key"));
}

#[tokio::test]
async fn remote_backend_keeps_partial_output_before_transport_failure() {
    let body = sse_body(&[r#"{"choices":[{"delta":{"content":"partial"}}]}"#]);
    let declared = body.len() + 512;
    let (base_url, _) = spawn_server(vec![CannedResponse {
        declared_length: Some(declared),
        ..CannedResponse::sse(body)
    }]);
    let backend = Arc::new(RemoteBackend::new(base_url, "sk-test"));

    let items = collect(start_stream(backend, request())).await;

    assert_eq!(items.len(), 2, "{items:?}");
    assert_eq!(items[0], Ok(StreamDelta::text("partial")));
    let error = items[1].clone().expect_err("transport error");
    assert_eq!(error.code, LucidAiErrorCode::Transport);
}

#[tokio::test]
async fn remote_backend_without_key_fails_before_any_request() {
    let backend = Arc::new(RemoteBackend::new("http://127.0.0.1:9/v1", "  "));
    let items = collect(start_stream(backend, request())).await;
    let error = items[0].clone().expect_err("auth error");
    assert_eq!(error.code, LucidAiErrorCode::AuthMissing);
}

#[tokio::test]
async fn http_local_engine_emits_only_text_even_when_reasoning_fields_appear() {
    let body = sse_body(&[
        r#"{"choices":[{"delta":{"content":"<think>"}}]}"#,
        r#"{"choices":[{"delta":{"content":"reason A ","reasoning_content":"hidden"}}]}"#,
        r#"{"choices":[{"delta":{"content":"reason B</think>"}}]}"#,
        r#"{"choices":[{"delta":{"content":"answer X"}}]}"#,
        r#"{"choices":[{"delta":{},"finish_reason":"stop"}]}"#,
        "[DONE]",
    ]);
    let (base_url, requests) = spawn_server(vec![
        CannedResponse::json("200 OK", r#"{"data":[{"id":"qwen3"}]}"#),
        CannedResponse::sse(body),
    ]);
    let engine = HttpLocalEngine::load(base_url, "qwen3")
        .await
        .expect("engine loads");
    assert_eq!(engine.model_id(), "qwen3");
    let backend = Arc::new(LocalBackend::new(Arc::new(engine)));

    let items = collect(start_stream(
        backend,
        ChatRequest::page_analysis("qwen3", "hi").with_max_tokens(Some(682)),
    ))
    .await;

    assert_eq!(
        items,
        vec![
            Ok(StreamDelta::text("<think>")),
            Ok(StreamDelta::text("reason A ")),
            Ok(StreamDelta::text("reason B</think>")),
            Ok(StreamDelta::text("answer X")),
            Ok(StreamDelta::text("")),
        ]
    );

    let requests = requests.lock().expect("requests lock");
    assert!(requests[0].starts_with("GET /v1/models"));
    assert!(requests[1].starts_with("POST /v1/chat/completions"));
    assert!(requests[1].contains("\"max_tokens\":682"));
}

#[tokio::test]
async fn http_local_engine_load_fails_when_nothing_listens() {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let address = listener.local_addr().expect("addr");
    drop(listener);

    let error = HttpLocalEngine::load(format!("http://{address}/v1"), "qwen3")
        .await
        .expect_err("unreachable engine");
    assert_eq!(error.code, LucidAiErrorCode::EngineUnavailable);
}

struct ScriptedEngine {
    chunks: Mutex<Option<Vec<Result<ChatCompletionChunk, LucidAiError>>>>,
    resets: AtomicUsize,
}

impl ScriptedEngine {
    fn new(chunks: Vec<Result<ChatCompletionChunk, LucidAiError>>) -> Self {
        Self {
            chunks: Mutex::new(Some(chunks)),
            resets: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl LocalEngine for ScriptedEngine {
    fn model_id(&self) -> &str {
        "scripted"
    }

    async fn stream_chat(&self, _request: ChatRequest) -> Result<EngineChunkStream, LucidAiError> {
        let chunks = self
            .chunks
            .lock()
            .expect("chunks lock")
            .take()
            .unwrap_or_default();
        Ok(Box::pin(stream::iter(chunks)))
    }

    async fn reset_chat(&self) -> Result<(), LucidAiError> {
        self.resets.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[tokio::test]
async fn local_backend_converts_mid_stream_failure_into_engine_error() {
    let engine = Arc::new(ScriptedEngine::new(vec![
        Ok(ChatCompletionChunk::from_content("partial")),
        Err(LucidAiError::new(LucidAiErrorCode::Transport, "GPU device lost")),
        Ok(ChatCompletionChunk::from_content("never delivered")),
    ]));
    let backend = Arc::new(LocalBackend::new(engine.clone()));

    let items = collect(start_stream(backend, request())).await;

    assert_eq!(items.len(), 2);
    assert_eq!(items[0], Ok(StreamDelta::text("partial")));
    let error = items[1].clone().expect_err("engine error");
    assert_eq!(error.code, LucidAiErrorCode::Engine);
    assert_eq!(error.message, "GPU device lost");

    engine.reset_chat().await.expect("reset");
    assert_eq!(engine.resets.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn abandoned_stream_stops_the_producer() {
    let stopped = Arc::new(AtomicBool::new(false));
    let pushed = Arc::new(AtomicUsize::new(0));
    let stopped_flag = Arc::clone(&stopped);
    let pushed_count = Arc::clone(&pushed);
    let backend = Arc::new(ClosureBackend::new(BackendKind::Local, move |_, writer| {
        let stopped = Arc::clone(&stopped_flag);
        let pushed = Arc::clone(&pushed_count);
        Box::pin(async move {
            loop {
                if !writer.push_text("tick") {
                    stopped.store(true, Ordering::SeqCst);
                    return Ok(());
                }
                pushed.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
    }));

    let mut deltas = start_stream(backend, request());
    assert_eq!(deltas.next().await, Some(Ok(StreamDelta::text("tick"))));
    drop(deltas);

    for _ in 0..100 {
        if stopped.load(Ordering::SeqCst) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(stopped.load(Ordering::SeqCst), "producer kept running");
    let after_stop = pushed.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(pushed.load(Ordering::SeqCst), after_stop);
}

#[tokio::test]
async fn fetch_models_returns_sorted_non_empty_ids() {
    let (base_url, requests) = spawn_server(vec![CannedResponse::json(
        "200 OK",
        r#"{"object":"list","data":[{"id":"zeta"},{"id":""},{"object":"model"},{"id":"alpha"}]}"#,
    )]);

    let models = fetch_models(&base_url, "sk-test").await.expect("model list");

    assert_eq!(models, vec!["alpha".to_string(), "zeta".to_string()]);
    assert!(requests.lock().expect("requests lock")[0].starts_with("GET /v1/models"));
}

#[tokio::test]
async fn fetch_models_surfaces_http_status() {
    let (base_url, _) = spawn_server(vec![CannedResponse::json("403 Forbidden", "{}")]);
    let error = fetch_models(&base_url, "sk-test").await.expect_err("forbidden");
    assert_eq!(error.code, LucidAiErrorCode::Http);
    assert_eq!(error.message, "HTTP 403");
}
