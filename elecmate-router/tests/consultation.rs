//! End-to-end exchanges against a scripted router.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use elecmate_core::{ConsultationSummary, Error, Message, StreamCallbacks};
use elecmate_router::{RouterClient, RouterConfig, WatchdogConfig};
use serde_json::{json, Value};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Default)]
struct Recorder {
    tokens: Mutex<Vec<String>>,
    errors: Mutex<Vec<String>>,
    completions: Mutex<Vec<ConsultationSummary>>,
    ticks: Mutex<Vec<u64>>,
    notes: Mutex<Vec<String>>,
}

#[async_trait]
impl StreamCallbacks for Recorder {
    async fn on_token(&self, text: &str) {
        self.tokens.lock().unwrap().push(text.to_string());
    }

    async fn on_complete(&self, summary: &ConsultationSummary) {
        self.completions.lock().unwrap().push(summary.clone());
    }

    async fn on_error(&self, message: &str) {
        self.errors.lock().unwrap().push(message.to_string());
    }

    async fn on_elapsed_time(&self, seconds: u64) {
        self.ticks.lock().unwrap().push(seconds);
    }

    async fn on_still_working(&self, note: &str) {
        self.notes.lock().unwrap().push(note.to_string());
    }
}

fn client_for(server: &MockServer) -> RouterClient {
    RouterClient::new(RouterConfig {
        endpoint: format!("{}/consult", server.uri()),
        replay_delay: Duration::from_millis(1),
        ..RouterConfig::default()
    })
}

fn history() -> Vec<Message> {
    vec![Message::user("Design a 9.5kW shower circuit for a 3-bed semi")]
}

fn sse_body(lines: &[Value]) -> String {
    let mut body = String::new();
    for line in lines {
        body.push_str("data: ");
        body.push_str(&line.to_string());
        body.push('\n');
    }
    body.push_str("data: [DONE]\n");
    body
}

async fn mount_sse(server: &MockServer, lines: &[Value]) {
    Mock::given(method("POST"))
        .and(path("/consult"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(sse_body(lines), "text/event-stream"),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn sse_stream_accumulates_in_order() {
    let server = MockServer::start().await;
    mount_sse(
        &server,
        &[
            json!({"type": "plan", "agents": ["designer"], "complexity": "simple"}),
            json!({"type": "agent_start", "agent": "designer", "index": 1, "total": 1}),
            json!({"type": "token", "content": "Sizing "}),
            json!({"type": "token", "content": "the circuit."}),
            json!({"type": "citation", "citation": {"source": "BS 7671", "reference": "411.3.3"}}),
            json!({
                "type": "agent_response",
                "agent": "designer",
                "response": "Use 10mm² on a 40A MCB.",
                "structuredData": {"cable": "10mm²", "mcb": "40A"}
            }),
            json!({"type": "agent_complete", "agent": "designer"}),
            json!({"type": "done", "consultedAgents": ["designer"]}),
        ],
    )
    .await;

    let client = client_for(&server);
    let recorder = Recorder::default();
    let design = json!({"conversationId": "c-1"});

    let summary = client
        .stream_consultation(&history(), &design, None, None, &recorder)
        .await
        .unwrap();

    assert_eq!(
        summary.response,
        "Sizing the circuit.\n\nUse 10mm² on a 40A MCB."
    );
    assert_eq!(summary.citations.len(), 1);
    assert_eq!(
        summary.structured_data.unwrap(),
        json!({"cable": "10mm²", "mcb": "40A"})
    );
    assert_eq!(summary.agents, vec!["designer".to_string()]);
    assert_eq!(summary.consulted_agents, vec!["designer".to_string()]);

    assert_eq!(
        *recorder.tokens.lock().unwrap(),
        vec!["Sizing ", "the circuit.", "Use 10mm² on a 40A MCB."]
    );
    assert_eq!(recorder.completions.lock().unwrap().len(), 1);
    assert!(!client.is_streaming());
}

#[tokio::test]
async fn failed_agent_does_not_fail_the_call() {
    let server = MockServer::start().await;
    mount_sse(
        &server,
        &[
            json!({"type": "agent_start", "agent": "designer", "index": 1, "total": 2}),
            json!({"type": "agent_error", "agent": "designer", "error": "overloaded"}),
            json!({"type": "agent_start", "agent": "installer", "index": 2, "total": 2}),
            json!({
                "type": "agent_response",
                "agent": "installer",
                "response": "Run the cable through the loft on clips."
            }),
            json!({"type": "done"}),
        ],
    )
    .await;

    let client = client_for(&server);
    let recorder = Recorder::default();

    let summary = client
        .stream_consultation(&history(), &Value::Null, None, None, &recorder)
        .await
        .unwrap();

    assert!(summary
        .response
        .contains("[designer] agent failed: overloaded"));
    assert!(summary.response.contains("through the loft"));
    // advisory notification, not a failure
    assert_eq!(recorder.errors.lock().unwrap().len(), 1);
    assert_eq!(recorder.completions.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn fatal_error_chunk_rejects_the_call() {
    let server = MockServer::start().await;
    mount_sse(
        &server,
        &[
            json!({"type": "token", "content": "partial "}),
            json!({"type": "error", "error": "all agents unavailable"}),
        ],
    )
    .await;

    let client = client_for(&server);
    let recorder = Recorder::default();

    let err = client
        .stream_consultation(&history(), &Value::Null, None, None, &recorder)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Protocol(_)));
    assert!(err.to_string().contains("all agents unavailable"));
    // partial output was already delivered and is not rolled back
    assert_eq!(*recorder.tokens.lock().unwrap(), vec!["partial "]);
    assert!(recorder.completions.lock().unwrap().is_empty());
}

#[tokio::test]
async fn json_fallback_replays_word_by_word() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/consult"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "responses": [
                {
                    "agent": "designer",
                    "response": "Six words make up this reply",
                    "structuredData": {"rev": 1}
                },
                {
                    "agent": "installer",
                    "response": "Second agent here",
                    "structuredData": {"rev": 2}
                }
            ],
            "suggestedNextAgents": ["health-safety"],
            "consultedAgents": ["designer", "installer"]
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let recorder = Recorder::default();

    let summary = client
        .stream_consultation(&history(), &Value::Null, None, None, &recorder)
        .await
        .unwrap();

    let tokens = recorder.tokens.lock().unwrap();
    assert_eq!(tokens.len(), 6 + 3);
    assert!(tokens.iter().all(|t| t.ends_with(' ')));

    assert_eq!(
        summary.response,
        "Six words make up this reply\n\nSecond agent here"
    );
    assert_eq!(summary.structured_data.unwrap(), json!({"rev": 2}));
    assert_eq!(
        summary.suggested_next_agents,
        vec!["health-safety".to_string()]
    );
}

#[tokio::test]
async fn json_fallback_failure_body_rejects() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/consult"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false,
            "error": "no agents matched the request"
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client
        .stream_consultation(
            &history(),
            &Value::Null,
            None,
            None,
            &elecmate_core::NoopCallbacks,
        )
        .await
        .unwrap_err();

    assert!(err.to_string().contains("no agents matched"));
}

#[tokio::test]
async fn status_codes_map_to_fixed_messages() {
    for (status, expected) in [
        (429, "Rate limit exceeded. Please try again in a moment."),
        (402, "AI credits exhausted. Please add credits to continue."),
    ] {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/consult"))
            .respond_with(ResponseTemplate::new(status))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let recorder = Recorder::default();
        let err = client
            .stream_consultation(&history(), &Value::Null, None, None, &recorder)
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), expected);
        assert_eq!(*recorder.errors.lock().unwrap(), vec![expected.to_string()]);
    }
}

#[tokio::test]
async fn server_error_keeps_status_and_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/consult"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"error": "boom"})))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client
        .stream_consultation(
            &history(),
            &Value::Null,
            None,
            None,
            &elecmate_core::NoopCallbacks,
        )
        .await
        .unwrap_err();

    let text = err.to_string();
    assert!(text.contains("500"));
    assert!(text.contains("boom"));
}

#[tokio::test]
async fn omitted_selection_sends_the_default_agent() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/consult"))
        .and(body_partial_json(json!({
            "selectedAgents": ["designer"],
            "consultationMode": "user-driven"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "responses": [{"agent": "designer", "response": "ok"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    client
        .stream_consultation(
            &history(),
            &Value::Null,
            None,
            None,
            &elecmate_core::NoopCallbacks,
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn slow_router_times_out_and_cleans_up() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/consult"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"success": true, "responses": []}))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let client = RouterClient::new(RouterConfig {
        endpoint: format!("{}/consult", server.uri()),
        watchdog: WatchdogConfig {
            tick: Duration::from_millis(10),
            warnings: vec![(Duration::from_millis(25), "still working".to_string())],
            timeout: Duration::from_millis(60),
        },
        ..RouterConfig::default()
    });
    let recorder = Recorder::default();

    let err = client
        .stream_consultation(&history(), &Value::Null, None, None, &recorder)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Timeout));
    assert!(err.to_string().contains("timed out"));
    assert!(!recorder.ticks.lock().unwrap().is_empty());
    assert_eq!(
        *recorder.notes.lock().unwrap(),
        vec!["still working".to_string()]
    );
    assert!(!client.is_streaming());
}

#[tokio::test]
async fn blank_prompt_fails_before_any_request() {
    let client = RouterClient::new(RouterConfig::new("http://127.0.0.1:1/consult"));
    let recorder = Recorder::default();

    let err = client
        .stream_consultation(
            &[Message::user("   ")],
            &Value::Null,
            None,
            None,
            &recorder,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Validation(_)));
    assert_eq!(recorder.errors.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn unreachable_router_reports_unavailable() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let client = RouterClient::new(RouterConfig {
        endpoint: format!("http://127.0.0.1:{port}/consult"),
        ..RouterConfig::default()
    });

    let err = client
        .stream_consultation(
            &history(),
            &Value::Null,
            None,
            None,
            &elecmate_core::NoopCallbacks,
        )
        .await
        .unwrap_err();

    assert_eq!(
        err.to_string(),
        "Router unavailable. Please wait a moment and try again."
    );
}
