use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};

use calcio::config::{LlmConfig, MatchRules};
use calcio::error::SimulationError;
use calcio::simulation::{
    rng, EventKind, LocalSimulator, MatchSimulator, Player, RemoteSimulator, SimulationSource,
    Tactic, Team,
};

#[derive(Clone)]
struct MockLlm {
    status: StatusCode,
    reply: Value,
    hits: Arc<AtomicUsize>,
    last_request: Arc<Mutex<Option<(Option<String>, Value)>>>,
}

async fn completion(
    State(mock): State<MockLlm>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    mock.hits.fetch_add(1, Ordering::SeqCst);
    let auth = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    *mock.last_request.lock().unwrap() = Some((auth, body));
    (mock.status, Json(mock.reply.clone()))
}

/// Serve a canned completion on an ephemeral port; returns the endpoint URL.
async fn spawn_mock(status: StatusCode, reply: Value) -> (String, MockLlm) {
    let mock = MockLlm {
        status,
        reply,
        hits: Arc::new(AtomicUsize::new(0)),
        last_request: Arc::new(Mutex::new(None)),
    };
    let app = Router::new()
        .route("/v1/chat/completions", post(completion))
        .with_state(mock.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}/v1/chat/completions"), mock)
}

fn envelope(content: Value) -> Value {
    json!({
        "choices": [
            { "message": { "role": "assistant", "content": content.to_string() } }
        ]
    })
}

fn llm_config(url: &str, key: Option<&str>) -> LlmConfig {
    LlmConfig {
        api_key: key.map(str::to_string),
        api_url: url.to_string(),
        model: "test-model".to_string(),
        ..LlmConfig::default()
    }
}

fn fixture() -> (Team, Team, Tactic, Tactic) {
    (
        Team::new(
            "Leoni",
            vec![
                Player::new("Luca Rossi", "Attaccante"),
                Player::new("Paolo Neri", "Portiere"),
            ],
        ),
        Team::new("Falchi", vec![Player::new("Marco Bianchi", "Difensore")]),
        Tactic::new("attacco"),
        Tactic::new("difesa"),
    )
}

#[tokio::test]
async fn remote_result_is_sanitized_and_sorted() {
    let content = json!({
        "events": [
            { "minute": 77, "type": "goal", "description": "Gol di {{TEAM2_NAME}} su punizione" },
            { "minute": 12, "type": "goal", "description": "{{TEAM1_NAME}} in vantaggio {{SCORER}}" },
            { "minute": 40, "type": "corner", "description": "Angolo per {{TEAM1_NAME}}" }
        ],
        "goals_team_1": 1,
        "goals_team_2": 1,
        "score_string": "{{TEAM1_NAME}} 1 - 1 {{TEAM2_NAME}}"
    });
    let (url, mock) = spawn_mock(StatusCode::OK, envelope(content)).await;
    let remote = RemoteSimulator::new(llm_config(&url, Some("test-key")), MatchRules::default()).unwrap();
    let (home, away, t1, t2) = fixture();

    let result = remote
        .simulate(&home, &away, &t1, &t2, &mut rng::seeded(1))
        .await
        .unwrap();

    assert_eq!(mock.hits.load(Ordering::SeqCst), 1);
    let minutes: Vec<u32> = result.events.iter().map(|e| e.minute).collect();
    assert_eq!(minutes, vec![12, 40, 77]);
    assert_eq!(result.events[0].description, "Leoni in vantaggio");
    assert_eq!(result.events[1].kind, EventKind::Corner);
    assert_eq!(result.events[2].description, "Gol di Falchi su punizione");
    assert_eq!(result.score_string, "Leoni 1 - 1 Falchi");
    for event in &result.events {
        assert!(!event.description.contains("{{"));
    }
}

#[tokio::test]
async fn request_carries_prompt_and_json_mode() {
    let content = json!({ "events": [], "goals_team_1": 0, "goals_team_2": 0 });
    let (url, mock) = spawn_mock(StatusCode::OK, envelope(content)).await;
    let remote = RemoteSimulator::new(llm_config(&url, Some("test-key")), MatchRules::default()).unwrap();
    let (home, away, t1, t2) = fixture();

    let result = remote
        .simulate(&home, &away, &t1, &t2, &mut rng::seeded(2))
        .await
        .unwrap();
    assert_eq!(result.score_string, "Leoni 0 - 0 Falchi");

    let (auth, body) = mock.last_request.lock().unwrap().clone().unwrap();
    assert_eq!(auth.as_deref(), Some("Bearer test-key"));
    assert_eq!(body["model"], "test-model");
    assert_eq!(body["response_format"]["type"], "json_object");
    assert_eq!(body["max_tokens"], 2000);

    let messages = body["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[0]["role"], "system");
    let user = messages[1]["content"].as_str().unwrap();
    assert!(user.contains("Leoni"));
    assert!(user.contains("Luca Rossi (Attaccante)"));
    assert!(user.contains("attacco"));
    assert!(!user.contains("{{TEAM1_NAME}}"));
    assert!(!user.contains("{{ROSTER2}}"));

    let data: Value = serde_json::from_str(messages[2]["content"].as_str().unwrap()).unwrap();
    assert_eq!(data["teams"][1]["name"], "Falchi");
    assert_eq!(data["meta"]["min_events"], 10);
}

#[tokio::test]
async fn missing_credential_fails_without_network() {
    let (url, mock) = spawn_mock(StatusCode::OK, envelope(json!({}))).await;
    let remote = RemoteSimulator::new(llm_config(&url, None), MatchRules::default()).unwrap();
    let (home, away, t1, t2) = fixture();

    let err = remote
        .simulate(&home, &away, &t1, &t2, &mut rng::seeded(3))
        .await
        .unwrap_err();

    assert!(matches!(err, SimulationError::Config(_)));
    assert_eq!(mock.hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn non_success_status_is_transport_error() {
    let (url, mock) = spawn_mock(
        StatusCode::INTERNAL_SERVER_ERROR,
        json!({ "error": "overloaded" }),
    )
    .await;
    let remote = RemoteSimulator::new(llm_config(&url, Some("test-key")), MatchRules::default()).unwrap();
    let (home, away, t1, t2) = fixture();

    let err = remote
        .simulate(&home, &away, &t1, &t2, &mut rng::seeded(4))
        .await
        .unwrap_err();

    assert_eq!(mock.hits.load(Ordering::SeqCst), 1);
    match err {
        SimulationError::Transport(message) => {
            assert!(message.contains("500"));
            assert!(message.contains("overloaded"));
        }
        other => panic!("expected transport error, got {other:?}"),
    }
}

#[tokio::test]
async fn empty_choices_is_format_error() {
    let (url, _mock) = spawn_mock(StatusCode::OK, json!({ "choices": [] })).await;
    let remote = RemoteSimulator::new(llm_config(&url, Some("test-key")), MatchRules::default()).unwrap();
    let (home, away, t1, t2) = fixture();

    let err = remote
        .simulate(&home, &away, &t1, &t2, &mut rng::seeded(5))
        .await
        .unwrap_err();
    assert!(matches!(err, SimulationError::Format(_)));
}

#[tokio::test]
async fn facade_falls_back_on_malformed_content() {
    let content = json!({ "goals_team_1": 2, "goals_team_2": 0 });
    let (url, mock) = spawn_mock(StatusCode::OK, envelope(content)).await;
    let remote = RemoteSimulator::new(llm_config(&url, Some("test-key")), MatchRules::default()).unwrap();
    let simulator = MatchSimulator::new(remote, LocalSimulator::default());
    let (home, away, t1, t2) = fixture();

    let outcome = simulator
        .simulate_seeded(&home, &away, &t1, &t2, &mut rng::seeded(6))
        .await;

    assert_eq!(mock.hits.load(Ordering::SeqCst), 1);
    assert_eq!(outcome.source, SimulationSource::Local);
    let result = outcome.result;
    assert!(!result.events.is_empty());
    assert_eq!(
        result.goals_team_1 + result.goals_team_2,
        result.goal_events() as u32
    );
}

#[tokio::test]
async fn facade_uses_remote_when_it_succeeds() {
    let content = json!({
        "events": [{ "minute": 5, "type": "shot", "description": "Tiro alto" }],
        "goals_team_1": 0,
        "goals_team_2": 0,
        "score_string": "Leoni 0 - 0 Falchi"
    });
    let (url, _mock) = spawn_mock(StatusCode::OK, envelope(content)).await;
    let remote = RemoteSimulator::new(llm_config(&url, Some("test-key")), MatchRules::default()).unwrap();
    let simulator = MatchSimulator::new(remote, LocalSimulator::default());
    let (home, away, t1, t2) = fixture();

    let outcome = simulator
        .simulate_seeded(&home, &away, &t1, &t2, &mut rng::seeded(7))
        .await;

    assert_eq!(outcome.source, SimulationSource::Remote);
    assert_eq!(outcome.result.events.len(), 1);
    assert_eq!(outcome.result.events[0].kind, EventKind::Shot);
}

#[tokio::test]
async fn unconfigured_facade_plays_locally_without_network() {
    let (url, mock) = spawn_mock(StatusCode::OK, envelope(json!({}))).await;
    let remote = RemoteSimulator::new(llm_config(&url, None), MatchRules::default()).unwrap();
    let simulator = MatchSimulator::new(remote, LocalSimulator::default());
    let (home, away, t1, t2) = fixture();

    assert!(!simulator.remote_configured());
    let outcome = simulator
        .simulate_seeded(&home, &away, &t1, &t2, &mut rng::seeded(8))
        .await;

    assert_eq!(mock.hits.load(Ordering::SeqCst), 0);
    assert_eq!(outcome.source, SimulationSource::Local);
    let result = outcome.result;
    assert!(result.score_string.starts_with("Leoni "));
    assert!(result.score_string.ends_with(" Falchi"));
    assert!(result.events.windows(2).all(|w| w[0].minute <= w[1].minute));

    let unseeded = simulator.simulate(&home, &away, &t1, &t2).await;
    assert!(!unseeded.events.is_empty());
    assert_eq!(mock.hits.load(Ordering::SeqCst), 0);
}
