use std::{net::SocketAddr, path::PathBuf, sync::Arc, time::Duration};

use axum::{Json, Router, extract::State, http::StatusCode, routing::post};
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::net::TcpListener;

use llm_relay::{
    EngineKind, InferenceEngine, SamplingParams, ServiceError, WorkerConfig, model::RemoteEngine,
};

type Seen = Arc<Mutex<Vec<Value>>>;

async fn spawn_fake_engine(reply_status: StatusCode, reply: Value) -> (SocketAddr, Seen) {
    let seen: Seen = Arc::default();
    let router = Router::new()
        .route(
            "/v1/completions",
            post(
                |State((seen, status, reply)): State<(Seen, StatusCode, Value)>,
                 Json(body): Json<Value>| async move {
                    seen.lock().push(body);
                    (status, Json(reply))
                },
            ),
        )
        .with_state((seen.clone(), reply_status, reply));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    (addr, seen)
}

fn config_for(addr: SocketAddr) -> WorkerConfig {
    WorkerConfig {
        listen_addr: "127.0.0.1:0".parse().unwrap(),
        model_name: "served-model".into(),
        model_path: PathBuf::from("/workspace/model"),
        engine: EngineKind::Remote,
        engine_url: format!("http://{addr}/v1"),
        engine_api_key: None,
        engine_connect_timeout: Duration::from_secs(2),
        tokenizer_path: PathBuf::from("/workspace/model/tokenizer.json"),
        module_path: PathBuf::from("/workspace/model/model.ts"),
        eos_token_id: None,
        #[cfg(feature = "tch-backend")]
        device: tch::Device::Cpu,
    }
}

#[tokio::test]
async fn forwards_prompt_and_sampling_params() {
    let (addr, seen) = spawn_fake_engine(
        StatusCode::OK,
        json!({
            "id": "cmpl-abc",
            "object": "text_completion",
            "choices": [{"index": 0, "text": " Hi there.", "finish_reason": "length"}],
            "usage": {"prompt_tokens": 11, "completion_tokens": 4, "total_tokens": 15}
        }),
    )
    .await;
    let engine = RemoteEngine::new(&config_for(addr)).unwrap();

    let params = SamplingParams {
        temperature: 0.2,
        top_k: 8,
        ..SamplingParams::default()
    };
    let outputs = engine
        .generate(&["<|user|>\nhi</s><|assistant|>\n".to_string()], &params)
        .await
        .unwrap();

    assert_eq!(outputs.len(), 1);
    assert_eq!(outputs[0].request_id, "cmpl-abc");
    assert_eq!(outputs[0].text, " Hi there.");
    assert_eq!(outputs[0].prompt_tokens, 11);
    assert_eq!(outputs[0].completion_tokens, 4);
    assert_eq!(outputs[0].finish_reason.as_deref(), Some("length"));

    let seen = seen.lock();
    let body = &seen[0];
    assert_eq!(body["model"], "served-model");
    assert_eq!(body["prompt"], "<|user|>\nhi</s><|assistant|>\n");
    assert_eq!(body["top_k"], 8);
    assert_eq!(body["max_tokens"], 2048);
    assert_eq!(body["stop"], json!(["</s>", "<|user|>", "<|system|>"]));
    assert_eq!(body["temperature"], json!(0.2));
    assert_eq!(body["top_p"], json!(0.9));
}

#[tokio::test]
async fn upstream_error_status_is_surfaced() {
    let (addr, _) = spawn_fake_engine(
        StatusCode::BAD_REQUEST,
        json!({"message": "max_tokens too large"}),
    )
    .await;
    let engine = RemoteEngine::new(&config_for(addr)).unwrap();

    let err = engine
        .generate(&["prompt".to_string()], &SamplingParams::default())
        .await
        .unwrap_err();

    match err {
        ServiceError::Upstream { status, message } => {
            assert_eq!(status, 400);
            assert!(message.contains("max_tokens too large"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn empty_choices_are_an_inference_error() {
    let (addr, _) = spawn_fake_engine(
        StatusCode::OK,
        json!({"id": "cmpl-x", "choices": [], "usage": {"prompt_tokens": 1}}),
    )
    .await;
    let engine = RemoteEngine::new(&config_for(addr)).unwrap();

    let err = engine
        .generate(&["prompt".to_string()], &SamplingParams::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "InferenceError");
}

#[tokio::test]
async fn unreachable_engine_is_a_request_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let engine = RemoteEngine::new(&config_for(addr)).unwrap();

    let err = engine
        .generate(&["prompt".to_string()], &SamplingParams::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "RequestError");
}
