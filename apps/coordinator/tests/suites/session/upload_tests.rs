// Uploads, leaderboards and guesses

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use coordinator::config::SessionLimits;
use coordinator::domain::player::UiMode;
use coordinator::gateway::types::{LeaderboardEntry, LocationMetadata};
use coordinator::ws::protocol::{ClientMsg, LeaderboardScope, ServerMsg};

use crate::support::harness::{failure_code, notice_text};
use crate::support::{FakeFailure, Harness};

fn metadata(name: &str) -> LocationMetadata {
    LocationMetadata {
        name: name.to_string(),
        lat: 48.8584,
        lon: 2.2945,
        description: None,
    }
}

fn upload(name: &str, bytes: &[u8]) -> ClientMsg {
    ClientMsg::SubmitUpload {
        metadata: metadata(name),
        image: STANDARD.encode(bytes),
    }
}

fn entries(n: u32) -> Vec<LeaderboardEntry> {
    (1..=n)
        .map(|rank| LeaderboardEntry {
            rank,
            username: format!("player{rank}"),
            score: i64::from(100 - rank),
        })
        .collect()
}

#[tokio::test]
async fn upload_round_trip_returns_to_menu() {
    let h = Harness::new();
    let mut alice = h.logged_in("alice").await;

    alice.send(ClientMsg::EnterUpload).await;
    let prompt = alice.expect("upload_prompt").await;
    assert_eq!(prompt.snapshot().unwrap().ui_mode, UiMode::Uploading);

    alice.send(upload("Eiffel Tower", b"jpeg-bytes")).await;

    let done = alice.expect("notice").await;
    assert_eq!(
        notice_text(&done),
        "Upload complete: https://img.test/upload-1.jpg"
    );
    assert_eq!(done.snapshot().unwrap().ui_mode, UiMode::Menu);
    assert_eq!(h.gateway.calls().last().unwrap(), "upload_image:Eiffel Tower:10");
}

#[tokio::test]
async fn upload_requires_the_upload_screen() {
    let h = Harness::new();
    let mut alice = h.logged_in("alice").await;

    alice.send(upload("Somewhere", b"x")).await;

    assert_eq!(failure_code(&alice.expect("failure").await), "WRONG_MODE");
    assert_eq!(h.gateway.count_calls("upload_image"), 0);
}

#[tokio::test]
async fn upload_screen_is_not_available_in_a_game() {
    let h = Harness::new();
    let (_code, mut alice, _) = h.lobby("alice", &[]).await;

    alice.send(ClientMsg::EnterUpload).await;

    assert_eq!(failure_code(&alice.expect("failure").await), "WRONG_MODE");
}

#[tokio::test]
async fn oversized_or_invalid_uploads_are_refused_locally() {
    let h = Harness::with_limits(SessionLimits {
        max_upload_bytes: 4,
        ..SessionLimits::default()
    });
    let mut alice = h.logged_in("alice").await;
    alice.send(ClientMsg::EnterUpload).await;
    alice.drain();

    alice.send(upload("Too big", b"12345")).await;
    assert_eq!(failure_code(&alice.expect("failure").await), "INVALID_UPLOAD");

    alice
        .send(ClientMsg::SubmitUpload {
            metadata: LocationMetadata {
                lat: 91.0,
                ..metadata("Off the map")
            },
            image: STANDARD.encode(b"ok"),
        })
        .await;
    assert_eq!(failure_code(&alice.expect("failure").await), "INVALID_UPLOAD");

    alice
        .send(ClientMsg::SubmitUpload {
            metadata: metadata("Garbage"),
            image: "not base64!".to_string(),
        })
        .await;
    let failure = alice.expect("failure").await;
    assert_eq!(failure_code(&failure), "INVALID_UPLOAD");
    assert_eq!(failure.snapshot().unwrap().ui_mode, UiMode::Uploading);
    assert_eq!(h.gateway.count_calls("upload_image"), 0);
}

#[tokio::test]
async fn failed_upload_keeps_the_upload_screen() {
    let h = Harness::new();
    let mut alice = h.logged_in("alice").await;
    alice.send(ClientMsg::EnterUpload).await;
    alice.drain();
    h.gateway
        .fail_next("upload_image", FakeFailure::Rejected("Image rejected".to_string()));

    alice.send(upload("Louvre", b"img")).await;

    let failure = alice.expect("failure").await;
    assert_eq!(failure_code(&failure), "BACKEND_REJECTED");
    assert_eq!(failure.snapshot().unwrap().ui_mode, UiMode::Uploading);
}

#[tokio::test]
async fn leaderboard_limit_is_clamped() {
    let h = Harness::with_limits(SessionLimits {
        leaderboard_max_limit: 3,
        ..SessionLimits::default()
    });
    h.gateway.set_leaderboard(entries(5));
    let mut alice = h.logged_in("alice").await;

    alice
        .send(ClientMsg::RequestLeaderboard {
            scope: LeaderboardScope::Global,
            limit: Some(50),
        })
        .await;
    let ServerMsg::LeaderboardResult { entries, .. } = alice.expect("leaderboard_result").await
    else {
        unreachable!()
    };
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0].rank, 1);

    alice
        .send(ClientMsg::RequestLeaderboard {
            scope: LeaderboardScope::Global,
            limit: Some(0),
        })
        .await;
    alice.expect("leaderboard_result").await;

    assert_eq!(
        h.gateway.calls()[1..],
        ["get_leaderboard:global:3", "get_leaderboard:global:1"]
    );
}

#[tokio::test]
async fn lobby_leaderboard_needs_a_game() {
    let h = Harness::new();
    let mut alice = h.logged_in("alice").await;

    alice
        .send(ClientMsg::RequestLeaderboard {
            scope: LeaderboardScope::Lobby,
            limit: None,
        })
        .await;
    assert_eq!(failure_code(&alice.expect("failure").await), "NOT_IN_GAME");

    let (code, mut bob, _) = h.lobby("bob", &[]).await;
    bob.send(ClientMsg::RequestLeaderboard {
        scope: LeaderboardScope::Lobby,
        limit: None,
    })
    .await;
    let result = bob.expect("leaderboard_result").await;
    assert_eq!(result.snapshot().unwrap().lobby_code, Some(code.clone()));
    assert_eq!(h.gateway.count_calls(&format!("get_leaderboard:lobby={code}:10")), 1);
}

#[tokio::test]
async fn guess_outside_a_game_fails() {
    let h = Harness::new();
    let mut alice = h.logged_in("alice").await;

    alice.send(ClientMsg::SubmitGuess { lat: 0.0, lon: 0.0 }).await;

    assert_eq!(failure_code(&alice.expect("failure").await), "NOT_IN_GAME");
    assert_eq!(h.gateway.count_calls("submit_guess"), 0);
}

#[tokio::test]
async fn rejected_guess_is_not_recorded() {
    let h = Harness::new();
    let (code, mut alice, _) = h.lobby("alice", &[]).await;
    h.gateway
        .fail_next("submit_guess", FakeFailure::Rejected("Round is over".to_string()));

    alice.send(ClientMsg::SubmitGuess { lat: 10.0, lon: 20.0 }).await;

    let failure = alice.expect("failure").await;
    assert_eq!(failure_code(&failure), "BACKEND_REJECTED");
    assert!(!failure.snapshot().unwrap().player.as_ref().unwrap().has_guessed);
    assert_eq!(
        h.gateway.calls().last().unwrap(),
        &format!("submit_guess:{code}:{}:10:20", alice.id())
    );
}
