use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    sync::{Arc, Mutex},
};

use approval_relay::application::{config::RuntimeConfig, startup};
use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
};
use serde_json::{Value, json};
use tokio::{net::TcpListener, sync::oneshot, task::JoinHandle};

pub(crate) const TEST_TOKEN: &str = "test-secret";

pub(crate) struct ServerHandle {
    pub(crate) addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    join: JoinHandle<()>,
}

impl ServerHandle {
    pub(crate) async fn stop(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        let _ = self.join.await;
    }
}

pub(crate) async fn spawn_relay(pipeline_api_url: String) -> ServerHandle {
    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0))
        .await
        .expect("listener should bind");
    let addr = listener
        .local_addr()
        .expect("listener should expose local addr");

    let config = RuntimeConfig::for_test(IpAddr::V4(Ipv4Addr::LOCALHOST), addr.port(), pipeline_api_url);

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let join = tokio::spawn(async move {
        let _ = startup::run_with_listener(listener, config, async {
            let _ = shutdown_rx.await;
        })
        .await;
    });

    ServerHandle {
        addr,
        shutdown: Some(shutdown_tx),
        join,
    }
}

/// Stand-in for the CodePipeline endpoint. Records every request body and
/// answers per the chosen behavior.
#[derive(Clone, Copy)]
pub(crate) enum StubBehavior {
    Accept,
    AlreadyCompleted,
    Fail,
}

#[derive(Clone)]
struct StubState {
    behavior: StubBehavior,
    requests: Arc<Mutex<Vec<Value>>>,
}

pub(crate) struct PipelineStub {
    addr: SocketAddr,
    requests: Arc<Mutex<Vec<Value>>>,
    shutdown: Option<oneshot::Sender<()>>,
    join: JoinHandle<()>,
}

impl PipelineStub {
    pub(crate) fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub(crate) fn recorded(&self) -> Vec<Value> {
        self.requests.lock().expect("requests lock").clone()
    }

    pub(crate) async fn stop(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        let _ = self.join.await;
    }
}

pub(crate) async fn spawn_pipeline_stub(behavior: StubBehavior) -> PipelineStub {
    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0))
        .await
        .expect("stub listener should bind");
    let addr = listener
        .local_addr()
        .expect("stub listener should expose local addr");

    let requests = Arc::new(Mutex::new(Vec::new()));
    let state = StubState {
        behavior,
        requests: requests.clone(),
    };
    let router = Router::new().route("/", post(stub_handler)).with_state(state);

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let join = tokio::spawn(async move {
        let _ = axum::serve(listener, router)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await;
    });

    PipelineStub {
        addr,
        requests,
        shutdown: Some(shutdown_tx),
        join,
    }
}

// The relay posts AWS JSON 1.1 (not application/json), so the stub reads
// raw bytes instead of using the Json extractor.
async fn stub_handler(State(state): State<StubState>, body: Bytes) -> impl IntoResponse {
    let decoded: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    state.requests.lock().expect("requests lock").push(decoded);

    match state.behavior {
        StubBehavior::Accept => (StatusCode::OK, Json(json!({}))).into_response(),
        StubBehavior::AlreadyCompleted => (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "__type": "ApprovalAlreadyCompletedException",
                "message": "The approval has already been resolved",
            })),
        )
            .into_response(),
        StubBehavior::Fail => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "__type": "ServiceUnavailableException",
                "message": "backend exploded",
            })),
        )
            .into_response(),
    }
}

pub(crate) fn callback_payload(token: &str, approve: bool) -> String {
    let descriptor = json!({
        "approve": approve,
        "codePipelineToken": "tok-abc",
        "codePipelineName": "MyPipe",
        "codePipelineStage": "Deploy",
        "codePipelineAction": "Approve",
    });
    json!({
        "token": token,
        "user": { "id": "U123" },
        "original_message": {
            "text": "Deploy MyPipe to production?",
            "attachments": [ { "text": "Release v1.2.3" } ],
        },
        "actions": [ { "value": descriptor.to_string() } ],
    })
    .to_string()
}

pub(crate) async fn post_callback(addr: SocketAddr, payload: &str) -> reqwest::Response {
    reqwest::Client::new()
        .post(format!("http://{addr}/slack/actions"))
        .form(&[("payload", payload)])
        .send()
        .await
        .expect("callback request should send")
}
