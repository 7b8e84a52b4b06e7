use std::collections::HashMap;
use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;

use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};
use coordinator::config::GatewayConfig;
use coordinator::domain::game::LobbyCode;
use coordinator::domain::player::{Guess, Username};
use coordinator::gateway::types::LeaderboardQuery;
use coordinator::gateway::{BackendGateway, GatewayError, HttpBackendGateway};
use parking_lot::Mutex;
use serde_json::{json, Value};

#[derive(Debug, Clone)]
struct SeenRequest {
    method: String,
    path: String,
    query: String,
    function_key: Option<String>,
    body: Value,
}

/// Records every request and answers with a canned reply per path.
#[derive(Default)]
struct ScriptedBackend {
    seen: Mutex<Vec<SeenRequest>>,
    replies: Mutex<HashMap<String, (u16, String)>>,
}

impl ScriptedBackend {
    fn reply(&self, path: &str, status: u16, body: Value) {
        self.replies
            .lock()
            .insert(path.to_string(), (status, body.to_string()));
    }

    fn reply_raw(&self, path: &str, status: u16, body: &str) {
        self.replies
            .lock()
            .insert(path.to_string(), (status, body.to_string()));
    }

    fn last(&self) -> SeenRequest {
        self.seen.lock().last().cloned().expect("backend saw a request")
    }
}

async fn record(
    req: HttpRequest,
    body: web::Bytes,
    backend: web::Data<ScriptedBackend>,
) -> HttpResponse {
    let path = req.path().to_string();
    backend.seen.lock().push(SeenRequest {
        method: req.method().to_string(),
        path: path.clone(),
        query: req.query_string().to_string(),
        function_key: req
            .headers()
            .get("x-functions-key")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        body: serde_json::from_slice(&body).unwrap_or(Value::Null),
    });

    let (status, reply) = backend
        .replies
        .lock()
        .get(&path)
        .cloned()
        .unwrap_or((200, json!({"result": true, "msg": ""}).to_string()));
    HttpResponse::build(actix_web::http::StatusCode::from_u16(status).unwrap())
        .content_type("application/json")
        .body(reply)
}

async fn start_backend() -> (Arc<ScriptedBackend>, HttpBackendGateway, actix_web::dev::ServerHandle) {
    let backend = web::Data::new(ScriptedBackend::default());
    let shared = backend.clone().into_inner();

    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let server = HttpServer::new(move || {
        App::new()
            .app_data(backend.clone())
            .default_service(web::to(record))
    })
    .workers(1)
    .listen(listener)
    .unwrap()
    .run();
    let handle = server.handle();
    tokio::spawn(server);

    let gateway = HttpBackendGateway::new(&GatewayConfig {
        endpoint: format!("http://{addr}/"),
        function_key: Some("secret-key".to_string()),
        timeout: Duration::from_secs(2),
        max_attempts: 3,
    })
    .unwrap();
    (shared, gateway, handle)
}

#[actix_web::test]
async fn login_posts_credentials_with_function_key() {
    let (backend, gateway, server) = start_backend().await;
    backend.reply("/api/login", 200, json!({"result": true, "msg": "", "userId": 7}));

    let grant = gateway
        .login(&Username::normalize("Alice"), "password1")
        .await
        .unwrap();

    assert_eq!(grant.user_id, 7);
    let seen = backend.last();
    assert_eq!(seen.method, "POST");
    assert_eq!(seen.path, "/api/login");
    assert_eq!(seen.function_key.as_deref(), Some("secret-key"));
    assert_eq!(seen.body, json!({"username": "alice", "password": "password1"}));
    server.stop(true).await;
}

#[actix_web::test]
async fn create_lobby_reads_code_handle_and_settings() {
    let (backend, gateway, server) = start_backend().await;
    backend.reply(
        "/api/lobbies",
        200,
        json!({
            "result": true,
            "msg": "",
            "lobbyCode": "QWER",
            "orchestratorHandle": "game-17",
            "settings": {"rounds": 3, "countdown": 20, "maxPlayers": 4, "theme": "cities"}
        }),
    );

    let created = gateway.create_lobby(7).await.unwrap();

    assert_eq!(created.lobby_code, LobbyCode::new("QWER"));
    assert_eq!(created.orchestrator_handle, "game-17");
    assert_eq!(created.settings.rounds, 3);
    assert_eq!(created.settings.countdown_seconds, 20);
    assert_eq!(created.settings.max_players, 4);
    assert_eq!(created.settings.extra.get("theme"), Some(&json!("cities")));
    assert_eq!(backend.last().body, json!({"playerId": 7}));
    server.stop(true).await;
}

#[actix_web::test]
async fn result_false_is_a_rejection_with_the_backend_message() {
    let (backend, gateway, server) = start_backend().await;
    backend.reply(
        "/api/lobbies/ABCD/join",
        200,
        json!({"result": false, "msg": "Lobby is locked"}),
    );

    let err = gateway.join_game(&LobbyCode::new("ABCD"), 7).await.unwrap_err();

    match err {
        GatewayError::Rejected { operation, message } => {
            assert_eq!(operation, "join_game");
            assert_eq!(message, "Lobby is locked");
        }
        other => panic!("expected a rejection, got {other:?}"),
    }
    server.stop(true).await;
}

#[actix_web::test]
async fn garbage_reply_is_a_protocol_error() {
    let (backend, gateway, server) = start_backend().await;
    backend.reply_raw("/api/health_check", 502, "<html>bad gateway</html>");

    let err = gateway.health_check().await.unwrap_err();

    assert!(matches!(err, GatewayError::Protocol { operation: "health_check", .. }));
    server.stop(true).await;
}

#[actix_web::test]
async fn health_check_accepts_the_bare_status_reply() {
    let (backend, gateway, server) = start_backend().await;
    backend.reply("/api/health_check", 200, json!({"status": "ok"}));

    gateway.health_check().await.unwrap();

    let seen = backend.last();
    assert_eq!(seen.method, "GET");
    assert_eq!(seen.path, "/api/health_check");
    server.stop(true).await;
}

#[actix_web::test]
async fn start_trigger_sends_game_rounds_and_countdown() {
    let (backend, gateway, server) = start_backend().await;
    backend.reply(
        "/api/start_game_trigger",
        200,
        json!({
            "result": true,
            "msg": "",
            "orchestratorId": "orch-1",
            "subscriptionEndpoint": "game:game-17"
        }),
    );

    let started = gateway
        .start_round_orchestration("game-17", 5, 30)
        .await
        .unwrap();

    assert_eq!(started.orchestrator_id, "orch-1");
    assert_eq!(started.subscription_endpoint, "game:game-17");
    assert_eq!(
        backend.last().body,
        json!({"game_id": "game-17", "rounds": 5, "countdown": 30})
    );
    server.stop(true).await;
}

#[actix_web::test]
async fn acks_hit_the_expected_paths() {
    let (backend, gateway, server) = start_backend().await;
    let code = LobbyCode::new("ABCD");

    gateway.quit_game(&code, 7).await.unwrap();
    gateway
        .submit_guess(&code, 7, Guess { lat: 1.5, lon: -2.0 })
        .await
        .unwrap();
    gateway.finalize_results("game-17").await.unwrap();

    let seen = backend.seen.lock().clone();
    let paths: Vec<_> = seen.iter().map(|r| r.path.as_str()).collect();
    assert_eq!(
        paths,
        [
            "/api/lobbies/ABCD/quit",
            "/api/lobbies/ABCD/guesses",
            "/api/games/game-17/finalize"
        ]
    );
    assert_eq!(seen[1].body, json!({"playerId": 7, "lat": 1.5, "lon": -2.0}));
    server.stop(true).await;
}

#[actix_web::test]
async fn leaderboard_passes_scope_and_limit_as_query() {
    let (backend, gateway, server) = start_backend().await;
    backend.reply(
        "/api/leaderboard",
        200,
        json!({
            "result": true,
            "msg": "",
            "entries": [{"rank": 1, "username": "alice", "score": 120}]
        }),
    );

    let entries = gateway
        .get_leaderboard(&LeaderboardQuery::Lobby(LobbyCode::new("ABCD")), 5)
        .await
        .unwrap();

    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].username, "alice");
    let seen = backend.last();
    assert_eq!(seen.method, "GET");
    assert_eq!(seen.query, "limit=5&scope=lobby&lobby=ABCD");
    server.stop(true).await;
}
