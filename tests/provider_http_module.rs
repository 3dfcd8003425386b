use botkit::config::{ImageConfig, SpeechConfig};
use botkit::knowledge::{load_document, KnowledgeError};
use botkit::provider::{
    AnthropicClient, ApiEndpoint, ChatBackend, ChatMessage, ChatRequest, CohereClient,
    EmbedInputType, Embedder, OpenAiClient, ProviderError, ProviderKind, Reranker, StopReason,
};
use botkit::tools::MediaTools;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::fs;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::thread;
use tempfile::tempdir;

#[derive(Debug, Clone)]
struct RecordedRequest {
    method: String,
    path: String,
    headers: BTreeMap<String, String>,
    body: String,
}

impl RecordedRequest {
    fn json(&self) -> Value {
        serde_json::from_str(&self.body).expect("json request body")
    }
}

struct MockResponse {
    status: u16,
    content_type: &'static str,
    body: Vec<u8>,
}

impl MockResponse {
    fn json(body: Value) -> Self {
        Self {
            status: 200,
            content_type: "application/json",
            body: body.to_string().into_bytes(),
        }
    }

    fn bytes(content_type: &'static str, body: &[u8]) -> Self {
        Self {
            status: 200,
            content_type,
            body: body.to_vec(),
        }
    }
}

struct MockApiServer {
    base_url: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl MockApiServer {
    /// Serves `expected_requests` connections; the responder also gets the base URL.
    fn start<F>(expected_requests: usize, responder: F) -> Self
    where
        F: Fn(&RecordedRequest, &str) -> MockResponse + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind mock server");
        let addr = listener.local_addr().expect("local addr");
        let base_url = format!("http://{addr}");
        let base_for_thread = base_url.clone();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let requests_for_thread = Arc::clone(&requests);

        let handle = thread::spawn(move || {
            for _ in 0..expected_requests {
                let (mut stream, _) = listener.accept().expect("accept");
                let mut reader = BufReader::new(stream.try_clone().expect("clone stream"));

                let mut request_line = String::new();
                reader
                    .read_line(&mut request_line)
                    .expect("read request line");
                let mut parts = request_line.split_whitespace();
                let method = parts.next().unwrap_or("GET").to_string();
                let path = parts.next().unwrap_or("/").to_string();

                let mut headers = BTreeMap::new();
                loop {
                    let mut line = String::new();
                    reader.read_line(&mut line).expect("read header");
                    if line == "\r\n" || line.is_empty() {
                        break;
                    }
                    if let Some((name, value)) = line.split_once(':') {
                        headers.insert(name.trim().to_ascii_lowercase(), value.trim().to_string());
                    }
                }
                let content_length = headers
                    .get("content-length")
                    .and_then(|v| v.parse::<usize>().ok())
                    .unwrap_or(0);
                let mut body = vec![0_u8; content_length];
                if content_length > 0 {
                    reader.read_exact(&mut body).expect("read body");
                }

                let request = RecordedRequest {
                    method,
                    path,
                    headers,
                    body: String::from_utf8_lossy(&body).to_string(),
                };
                let response = responder(&request, &base_for_thread);
                requests_for_thread
                    .lock()
                    .expect("lock requests")
                    .push(request);

                let head = format!(
                    "HTTP/1.1 {} Mock\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                    response.status,
                    response.content_type,
                    response.body.len()
                );
                stream.write_all(head.as_bytes()).expect("write head");
                stream.write_all(&response.body).expect("write body");
            }
        });

        Self {
            base_url,
            requests,
            handle: Some(handle),
        }
    }

    fn endpoint(&self, provider: ProviderKind) -> ApiEndpoint {
        ApiEndpoint::new(provider, &self.base_url, "test-key")
    }

    fn finish(mut self) -> Vec<RecordedRequest> {
        if let Some(handle) = self.handle.take() {
            handle.join().expect("join mock server");
        }
        self.requests.lock().expect("lock requests").clone()
    }
}

#[test]
fn openai_chat_posts_bearer_auth_and_parses_the_first_choice() {
    let server = MockApiServer::start(1, |_, _| {
        MockResponse::json(json!({
            "choices": [{"message": {"role": "assistant", "content": " Hello there. "}, "finish_reason": "stop"}]
        }))
    });
    let client = OpenAiClient::new(server.endpoint(ProviderKind::OpenAi));
    let mut request = ChatRequest::new("gpt-4o", vec![ChatMessage::user("hi")]);
    request.system = Some("be nice".to_string());

    let completion = client.complete(&request).expect("complete");
    assert_eq!(completion.text(), "Hello there.");

    let requests = server.finish();
    assert_eq!(requests[0].method, "POST");
    assert_eq!(requests[0].path, "/chat/completions");
    assert_eq!(requests[0].headers["authorization"], "Bearer test-key");
    let body = requests[0].json();
    assert_eq!(body["model"], "gpt-4o");
    assert_eq!(body["messages"][0]["content"], "be nice");
}

#[test]
fn anthropic_messages_use_api_key_headers_and_report_tool_use() {
    let server = MockApiServer::start(1, |_, _| {
        MockResponse::json(json!({
            "content": [{"type": "tool_use", "id": "tu_1", "name": "get_knowledge", "input": {"queries": ["hours"]}}],
            "stop_reason": "tool_use"
        }))
    });
    let client = AnthropicClient::new(server.endpoint(ProviderKind::Anthropic));
    let request = ChatRequest::new(
        "claude-3-5-sonnet-20240620",
        vec![ChatMessage::system("rules"), ChatMessage::user("when?")],
    );

    let completion = client.complete(&request).expect("complete");
    assert_eq!(completion.stop_reason, StopReason::ToolUse);
    assert_eq!(completion.tool_uses().count(), 1);

    let requests = server.finish();
    assert_eq!(requests[0].path, "/messages");
    assert_eq!(requests[0].headers["x-api-key"], "test-key");
    assert_eq!(requests[0].headers["anthropic-version"], "2023-06-01");
    assert!(!requests[0].headers.contains_key("authorization"));
    assert_eq!(requests[0].json()["system"], "rules");
}

#[test]
fn cohere_embed_and_rerank_round_trip() {
    let server = MockApiServer::start(2, |request, _| match request.path.as_str() {
        "/embed" => MockResponse::json(json!({"embeddings": [[0.1, 0.2], [0.3, 0.4]]})),
        _ => MockResponse::json(json!({"results": [
            {"index": 1, "relevance_score": 0.92},
            {"index": 0, "relevance_score": 0.15}
        ]})),
    });
    let client = CohereClient::new(
        server.endpoint(ProviderKind::Cohere),
        "embed-english-v3.0",
        "rerank-english-v3.0",
    );

    let vectors = client
        .embed(
            &["a".to_string(), "b".to_string()],
            EmbedInputType::SearchDocument,
        )
        .expect("embed");
    assert_eq!(vectors.len(), 2);
    let hits = client
        .rerank("q", &["a".to_string(), "b".to_string()], 2)
        .expect("rerank");
    assert_eq!(hits[0].index, 1);

    let requests = server.finish();
    assert_eq!(requests[0].json()["input_type"], "search_document");
    assert_eq!(requests[0].json()["model"], "embed-english-v3.0");
    assert_eq!(requests[1].path, "/rerank");
    assert_eq!(requests[1].json()["top_n"], 2);
}

#[test]
fn error_statuses_surface_with_their_body() {
    let server = MockApiServer::start(1, |_, _| MockResponse {
        status: 429,
        content_type: "application/json",
        body: br#"{"error": "rate limited"}"#.to_vec(),
    });
    let client = OpenAiClient::new(server.endpoint(ProviderKind::Groq));
    let err = client
        .complete(&ChatRequest::new("llama3-70b-8192", vec![ChatMessage::user("hi")]))
        .expect_err("429");
    server.finish();

    match err {
        ProviderError::Status {
            provider,
            status,
            body,
        } => {
            assert_eq!(provider, ProviderKind::Groq);
            assert_eq!(status, 429);
            assert!(body.contains("rate limited"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn generated_images_are_downloaded_into_uploads() {
    let server = MockApiServer::start(2, |request, base| match request.path.as_str() {
        "/images/generations" => {
            MockResponse::json(json!({"data": [{"url": format!("{base}/files/cat.png")}]}))
        }
        _ => MockResponse::bytes("image/png", b"\x89PNG fake"),
    });
    let dir = tempdir().expect("tempdir");
    let media = MediaTools::new(
        OpenAiClient::new(server.endpoint(ProviderKind::OpenAi)),
        ImageConfig::default(),
        SpeechConfig::default(),
        &dir.path().join("uploads"),
    );

    let image = media.generate_image("a cat in a hat").expect("image");
    let saved = image.saved_to.clone().expect("downloaded");
    assert_eq!(fs::read(&saved).expect("read png"), b"\x89PNG fake");
    assert!(saved
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with("generated_image_") && n.ends_with(".png")));
    assert_eq!(image.reference(), saved.display().to_string());

    let requests = server.finish();
    assert_eq!(requests[0].json()["prompt"], "a cat in a hat");
    assert_eq!(requests[1].method, "GET");
    assert_eq!(requests[1].path, "/files/cat.png");
}

#[test]
fn speech_is_written_as_mp3() {
    let server = MockApiServer::start(1, |_, _| MockResponse::bytes("audio/mpeg", b"ID3 audio"));
    let dir = tempdir().expect("tempdir");
    let media = MediaTools::new(
        OpenAiClient::new(server.endpoint(ProviderKind::OpenAi)),
        ImageConfig::default(),
        SpeechConfig::default(),
        dir.path(),
    );

    let path = media.text_to_speech("Hello!").expect("speech");
    assert_eq!(path.extension().and_then(|e| e.to_str()), Some("mp3"));
    assert_eq!(fs::read(&path).expect("read mp3"), b"ID3 audio");

    let requests = server.finish();
    assert_eq!(requests[0].path, "/audio/speech");
    let body = requests[0].json();
    assert_eq!(body["input"], "Hello!");
    assert_eq!(body["voice"], "alloy");
}

#[test]
fn knowledge_urls_are_fetched_when_the_content_is_text() {
    let server = MockApiServer::start(2, |request, _| match request.path.as_str() {
        "/guide" => MockResponse::bytes("text/plain; charset=utf-8", b"Open daily from 9."),
        _ => MockResponse::bytes("image/png", b"\x89PNG"),
    });

    let doc = load_document(&format!("{}/guide", server.base_url)).expect("text page");
    assert_eq!(doc.text, "Open daily from 9.");
    let err = load_document(&format!("{}/logo", server.base_url)).expect_err("binary");
    assert!(matches!(err, KnowledgeError::UnsupportedFileType { .. }));
    server.finish();
}
