use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
};
use deepinfra_embed::{
    BlockingEmbedder, DeepInfra, EmbedConfig, EmbedError, Embedder, HttpTransport, blocking,
};
use serde_json::{Value, json};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

const TOKEN: &str = "good-token";

#[derive(Debug, Clone)]
struct Seen {
    model: String,
    auth: Option<String>,
    content_type: Option<String>,
    inputs: Vec<String>,
}

#[derive(Clone, Default)]
struct Inference {
    seen: Arc<Mutex<Vec<Seen>>>,
}

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

async fn infer(
    State(state): State<Inference>,
    Path(model): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let inputs: Vec<String> = serde_json::from_value(body["inputs"].clone()).unwrap_or_default();
    let auth = header(&headers, "authorization");
    state.seen.lock().unwrap().push(Seen {
        model: model.clone(),
        auth: auth.clone(),
        content_type: header(&headers, "content-type"),
        inputs: inputs.clone(),
    });

    if auth.as_deref() != Some("Bearer good-token") {
        return (StatusCode::UNAUTHORIZED, "invalid token").into_response();
    }
    if model == "broken/model" {
        return Json(json!({"detail": "model is loading"})).into_response();
    }
    if inputs.iter().any(|s| s.contains("explode")) {
        return (StatusCode::INTERNAL_SERVER_ERROR, "inference failed").into_response();
    }

    let embeddings: Vec<Vec<f32>> = inputs
        .iter()
        .map(|s| vec![s.len() as f32, 0.5])
        .collect();
    Json(json!({"embeddings": embeddings, "input_tokens": inputs.len()})).into_response()
}

async fn serve() -> (String, Inference) {
    let state = Inference::default();
    let app = Router::new()
        .route("/v1/inference/{*model}", post(infer))
        .with_state(state.clone());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}/v1/inference"), state)
}

fn cfg(base_url: &str) -> EmbedConfig {
    EmbedConfig::default()
        .with_base_url(base_url)
        .with_model("BAAI/bge-base-en-v1.5")
        .with_api_token(TOKEN)
        .with_text_prefix("passage: ")
        .with_query_prefix("query: ")
        .with_max_batch_size(2)
}

const TEXTS: [&str; 5] = ["a", "bb", "ccc", "dddd", "eeeee"];

fn expected() -> Vec<Vec<f32>> {
    TEXTS
        .iter()
        .map(|s| vec![(s.len() + "passage: ".len()) as f32, 0.5])
        .collect()
}

#[tokio::test]
async fn test_async_batches_over_http() {
    let (url, state) = serve().await;
    let e = DeepInfra::new(cfg(&url));

    let out = e.embed_texts(&TEXTS).await.unwrap();
    assert_eq!(out, expected());

    let seen = state.seen.lock().unwrap();
    let sizes: Vec<usize> = seen.iter().map(|s| s.inputs.len()).collect();
    assert_eq!(sizes, vec![2, 2, 1]);
    for s in seen.iter() {
        assert_eq!(s.model, "BAAI/bge-base-en-v1.5");
        assert_eq!(s.auth.as_deref(), Some("Bearer good-token"));
        assert_eq!(s.content_type.as_deref(), Some("application/json"));
    }
    assert_eq!(seen[0].inputs, vec!["passage: a", "passage: bb"]);
    assert_eq!(seen[2].inputs, vec!["passage: eeeee"]);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_blocking_matches_async_over_http() {
    let (url, state) = serve().await;
    let async_out = DeepInfra::new(cfg(&url)).embed_texts(&TEXTS).await.unwrap();

    let e = blocking::DeepInfra::new(cfg(&url));
    let blocking_out = tokio::task::spawn_blocking(move || e.embed_texts(&TEXTS))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(blocking_out, async_out);

    let seen = state.seen.lock().unwrap();
    assert_eq!(seen.len(), 6);
    assert_eq!(seen[3].content_type.as_deref(), Some("application/json"));
    assert_eq!(seen[3].auth.as_deref(), Some("Bearer good-token"));
}

#[tokio::test]
async fn test_single_query() {
    let (url, state) = serve().await;
    let e = DeepInfra::new(cfg(&url));
    let v = e.embed_query("Hello, world!").await.unwrap();
    assert_eq!(v, vec![("query: Hello, world!".len()) as f32, 0.5]);
    assert_eq!(state.seen.lock().unwrap()[0].inputs, vec!["query: Hello, world!"]);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_rejected_token() {
    let (url, _state) = serve().await;

    let err = DeepInfra::new(cfg(&url).with_api_token("wrong"))
        .embed_text("x")
        .await
        .unwrap_err();
    assert!(err.is_auth(), "{err}");
    match err {
        EmbedError::Status { status, body } => {
            assert_eq!(status, 401);
            assert_eq!(body, "invalid token");
        }
        other => panic!("unexpected error: {other}"),
    }

    let e = blocking::DeepInfra::new(cfg(&url).with_api_token("wrong"));
    let err = tokio::task::spawn_blocking(move || e.embed_text("x"))
        .await
        .unwrap()
        .unwrap_err();
    assert_eq!(err.status(), Some(401));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_failing_batch_aborts_call() {
    let (url, state) = serve().await;
    let texts = ["a", "b", "explode", "d", "e"];

    let err = DeepInfra::new(cfg(&url)).embed_texts(&texts).await.unwrap_err();
    assert_eq!(err.status(), Some(500));
    assert_eq!(state.seen.lock().unwrap().len(), 2);

    let e = blocking::DeepInfra::new(cfg(&url));
    let err = tokio::task::spawn_blocking(move || e.embed_texts(&texts))
        .await
        .unwrap()
        .unwrap_err();
    assert_eq!(err.status(), Some(500));
    assert_eq!(state.seen.lock().unwrap().len(), 4);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_missing_embeddings_field() {
    let (url, _state) = serve().await;
    let config = cfg(&url).with_model("broken/model");

    let err = DeepInfra::new(config.clone()).embed_text("x").await.unwrap_err();
    assert!(matches!(err, EmbedError::Json(_)), "{err}");

    let e = blocking::DeepInfra::new(config);
    let err = tokio::task::spawn_blocking(move || e.embed_text("x"))
        .await
        .unwrap()
        .unwrap_err();
    assert!(matches!(err, EmbedError::Json(_)), "{err}");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_no_token_sends_no_authorization() {
    let (url, state) = serve().await;
    let config = EmbedConfig::default()
        .with_base_url(&url)
        .with_model("BAAI/bge-base-en-v1.5")
        .with_token_from_env(false);

    let err = DeepInfra::new(config.clone()).embed_text("x").await.unwrap_err();
    assert!(err.is_auth(), "{err}");

    let e = blocking::DeepInfra::new(config);
    let err = tokio::task::spawn_blocking(move || e.embed_text("x"))
        .await
        .unwrap()
        .unwrap_err();
    assert!(err.is_auth(), "{err}");

    let seen = state.seen.lock().unwrap();
    assert_eq!(seen.len(), 2);
    assert!(seen.iter().all(|s| s.auth.is_none()));
}

/// Reads one request (head and Content-Length body) off the socket.
async fn read_request(sock: &mut TcpStream) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        let n = match sock.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => n,
        };
        buf.extend_from_slice(&chunk[..n]);
        if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            let head = String::from_utf8_lossy(&buf[..end]).to_ascii_lowercase();
            let len = head
                .lines()
                .find_map(|l| l.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() >= end + 4 + len {
                return;
            }
        }
    }
}

/// Answers every request with a 200 that promises more body than it sends.
async fn serve_truncated() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((mut sock, _)) = listener.accept().await {
            tokio::spawn(async move {
                read_request(&mut sock).await;
                let head = "HTTP/1.1 200 OK\r\n\
                    Content-Type: application/json\r\n\
                    Content-Length: 500\r\n\r\n";
                let _ = sock.write_all(head.as_bytes()).await;
                let _ = sock.write_all(br#"{"embeddings": [[0.1,"#).await;
                let _ = sock.shutdown().await;
            });
        }
    });
    format!("http://{addr}/v1/inference")
}

#[tokio::test(flavor = "multi_thread")]
async fn test_truncated_body_is_transport_error() {
    let url = serve_truncated().await;

    let err = DeepInfra::new(cfg(&url)).embed_text("x").await.unwrap_err();
    assert!(matches!(err, EmbedError::Http(_)), "{err:?}");

    let e = blocking::DeepInfra::new(cfg(&url));
    let err = tokio::task::spawn_blocking(move || e.embed_text("x"))
        .await
        .unwrap()
        .unwrap_err();
    assert!(matches!(err, EmbedError::Transport(_)), "{err:?}");
}

#[tokio::test]
async fn test_custom_reqwest_client() {
    let (url, state) = serve().await;
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .unwrap();
    let e = DeepInfra::with_transport(cfg(&url), HttpTransport::with_client(client));

    let out = e.embed_texts(&TEXTS).await.unwrap();
    assert_eq!(out, expected());
    assert_eq!(state.seen.lock().unwrap().len(), 3);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_custom_ureq_agent() {
    let (url, _state) = serve().await;

    let agent: ureq::Agent = ureq::Agent::config_builder()
        .http_status_as_error(false)
        .timeout_global(Some(Duration::from_secs(10)))
        .build()
        .into();
    let e = blocking::DeepInfra::with_transport(
        cfg(&url),
        blocking::HttpTransport::with_agent(agent),
    );
    let out = tokio::task::spawn_blocking(move || e.embed_texts(&TEXTS))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(out, expected());

    // An agent that keeps ureq's status errors still reports the status.
    let e = blocking::DeepInfra::with_transport(
        cfg(&url).with_api_token("wrong"),
        blocking::HttpTransport::with_agent(ureq::Agent::new_with_defaults()),
    );
    let err = tokio::task::spawn_blocking(move || e.embed_text("x"))
        .await
        .unwrap()
        .unwrap_err();
    assert!(err.is_auth(), "{err}");
    assert!(matches!(err, EmbedError::Status { status: 401, .. }));
}
