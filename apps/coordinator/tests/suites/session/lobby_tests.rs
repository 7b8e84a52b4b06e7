// Lobby creation, joining and leaving

use coordinator::domain::game::{GamePhase, LobbyCode, MatchSettings};
use coordinator::domain::player::UiMode;
use coordinator::ws::protocol::{ClientMsg, ServerMsg};

use crate::support::harness::{failure_code, notice_text};
use crate::support::{FakeFailure, Harness};

fn usernames(msg: &ServerMsg) -> Vec<String> {
    msg.snapshot()
        .expect("event carries a snapshot")
        .other_players
        .iter()
        .map(|p| p.username.to_string())
        .collect()
}

#[tokio::test]
async fn create_then_join_broadcasts_roster_to_both() {
    let h = Harness::new();
    let mut alice = h.logged_in("alice").await;

    alice.send(ClientMsg::CreateLobby).await;
    let created = alice.expect("notice").await;
    assert!(notice_text(&created).starts_with("Lobby LOB1"));
    let lobby = alice.expect("lobby_snapshot").await;
    let ServerMsg::LobbySnapshot { code, snapshot } = &lobby else {
        unreachable!()
    };
    assert_eq!(code, &LobbyCode::new("LOB1"));
    assert!(snapshot.is_admin);
    assert_eq!(snapshot.ui_mode, UiMode::InGame);
    assert_eq!(snapshot.game_phase, Some(GamePhase::Waiting));
    assert!(snapshot.other_players.is_empty());

    let mut bob = h.logged_in("bob").await;
    bob.send(ClientMsg::JoinLobby { code: code.clone() }).await;

    let to_alice = alice.expect("lobby_snapshot").await;
    let to_bob = bob.expect("lobby_snapshot").await;
    assert_eq!(usernames(&to_alice), vec!["bob"]);
    assert_eq!(usernames(&to_bob), vec!["alice"]);
    assert!(!to_bob.snapshot().unwrap().is_admin);
    assert!(to_bob.snapshot().unwrap().other_players[0].is_admin);

    alice.assert_quiet();
    bob.assert_quiet();
    assert_eq!(h.gateway.count_calls("join_game:LOB1:"), 1);
}

#[tokio::test]
async fn joining_an_unknown_code_fails_without_calling_the_backend() {
    let h = Harness::new();
    let mut bob = h.logged_in("bob").await;

    bob.send(ClientMsg::JoinLobby {
        code: LobbyCode::new("NOPE"),
    })
    .await;

    let failure = bob.expect("failure").await;
    assert_eq!(failure_code(&failure), "LOBBY_NOT_FOUND");
    assert_eq!(h.gateway.count_calls("join_game"), 0);
}

#[tokio::test]
async fn backend_rejection_is_shown_verbatim_and_changes_nothing() {
    let h = Harness::new();
    let (code, mut alice, _) = h.lobby("alice", &[]).await;
    let mut bob = h.logged_in("bob").await;

    h.gateway
        .fail_next("join_game", FakeFailure::Rejected("Lobby is locked".to_string()));
    bob.send(ClientMsg::JoinLobby { code: code.clone() }).await;

    let failure = bob.expect("failure").await;
    assert_eq!(failure_code(&failure), "BACKEND_REJECTED");
    let ServerMsg::Failure { message, snapshot, .. } = &failure else {
        unreachable!()
    };
    assert_eq!(message, "Lobby is locked");
    assert_eq!(snapshot.ui_mode, UiMode::Menu);

    assert_eq!(h.game(&code).await.member_ids(), vec![alice.id()]);
    assert_eq!(h.coordinator.games().game_of(bob.id()), None);
    alice.assert_quiet();
}

#[tokio::test]
async fn unreachable_backend_on_create_leaves_no_game() {
    let h = Harness::new();
    let mut alice = h.logged_in("alice").await;

    h.gateway.fail_next("create_lobby", FakeFailure::Unreachable);
    alice.send(ClientMsg::CreateLobby).await;

    let failure = alice.expect("failure").await;
    assert_eq!(failure_code(&failure), "BACKEND_UNREACHABLE");
    assert!(h.coordinator.games().is_empty());
    assert_eq!(h.coordinator.games().game_of(alice.id()), None);
}

#[tokio::test]
async fn garbled_backend_reply_on_create_is_reported_separately() {
    let h = Harness::new();
    let mut alice = h.logged_in("alice").await;

    h.gateway.fail_next("create_lobby", FakeFailure::Garbage);
    alice.send(ClientMsg::CreateLobby).await;

    let failure = alice.expect("failure").await;
    assert_eq!(failure_code(&failure), "BACKEND_PROTOCOL");
    let ServerMsg::Failure { message, .. } = &failure else {
        unreachable!()
    };
    assert!(!message.contains("502"));
    assert_eq!(failure.snapshot().unwrap().ui_mode, UiMode::Menu);
    assert!(h.coordinator.games().is_empty());
}

#[tokio::test]
async fn cannot_create_or_join_while_in_a_game() {
    let h = Harness::new();
    let (code, mut alice, _) = h.lobby("alice", &[]).await;
    let (_other_code, _carol, _) = h.lobby("carol", &[]).await;

    alice.send(ClientMsg::CreateLobby).await;
    assert_eq!(failure_code(&alice.expect("failure").await), "ALREADY_IN_GAME");

    alice
        .send(ClientMsg::JoinLobby {
            code: LobbyCode::new("LOB2"),
        })
        .await;
    assert_eq!(failure_code(&alice.expect("failure").await), "ALREADY_IN_GAME");
    assert_eq!(h.coordinator.games().game_of(alice.id()), Some(code));
}

#[tokio::test]
async fn full_lobby_rejects_more_players() {
    let h = Harness::new();
    h.gateway.set_lobby_settings(MatchSettings {
        max_players: 2,
        ..MatchSettings::default()
    });
    let (code, _alice, _guests) = h.lobby("alice", &["bob"]).await;
    let mut carol = h.logged_in("carol").await;

    carol.send(ClientMsg::JoinLobby { code: code.clone() }).await;

    assert_eq!(failure_code(&carol.expect("failure").await), "LOBBY_FULL");
    assert_eq!(h.game(&code).await.members().len(), 2);
}

#[tokio::test]
async fn leaving_notifies_the_rest_and_quits_in_the_background() {
    let h = Harness::new();
    let (code, mut alice, mut guests) = h.lobby("alice", &["bob"]).await;
    let bob = &mut guests[0];

    bob.send(ClientMsg::ReturnToMenu).await;

    let menu = bob.expect("menu_snapshot").await;
    let snapshot = menu.snapshot().unwrap();
    assert_eq!(snapshot.ui_mode, UiMode::Menu);
    assert_eq!(snapshot.lobby_code, None);

    let roster = alice.expect("lobby_snapshot").await;
    assert!(usernames(&roster).is_empty());

    assert!(h.gateway.wait_for_call(&format!("quit_game:{code}:{}", bob.id())).await);
    assert_eq!(h.coordinator.games().game_of(bob.id()), None);
}

#[tokio::test]
async fn admin_leaving_orphans_the_game() {
    let h = Harness::new();
    let (code, alice, mut guests) = h.lobby("alice", &["bob"]).await;

    alice.send(ClientMsg::ReturnToMenu).await;

    let game = h.game(&code).await;
    assert_eq!(game.admin(), None);
    assert_eq!(game.member_ids(), vec![guests[0].id()]);

    let bob = &mut guests[0];
    bob.drain();
    bob.send(ClientMsg::Advance).await;
    assert_eq!(failure_code(&bob.expect("failure").await), "ORPHANED_ADMIN");
}

#[tokio::test]
async fn last_member_leaving_an_unstarted_lobby_removes_it() {
    let h = Harness::new();
    let (code, alice, _) = h.lobby("alice", &[]).await;

    alice.send(ClientMsg::ReturnToMenu).await;

    assert!(h.try_game(&code).await.is_none());
    assert!(h.coordinator.games().is_empty());
}

#[tokio::test]
async fn return_to_menu_outside_a_game_just_shows_the_menu() {
    let h = Harness::new();
    let mut alice = h.logged_in("alice").await;

    alice.send(ClientMsg::ReturnToMenu).await;

    alice.expect("menu_snapshot").await;
    assert_eq!(h.gateway.count_calls("quit_game"), 0);
}

#[tokio::test]
async fn intents_before_login_fail_with_not_logged_in() {
    let h = Harness::new();
    let mut anon = h.client();

    anon.send(ClientMsg::CreateLobby).await;

    let failure = anon.expect("failure").await;
    assert_eq!(failure_code(&failure), "NOT_LOGGED_IN");
    assert_eq!(failure.snapshot().unwrap().ui_mode, UiMode::PreLogin);
}

#[tokio::test]
async fn snapshot_is_stable_between_mutations() {
    let h = Harness::new();
    let (code, mut alice, _) = h.lobby("alice", &["bob"]).await;

    let mut carol = h.logged_in("carol").await;
    carol.send(ClientMsg::JoinLobby { code: code.clone() }).await;
    let broadcast = alice.expect("lobby_snapshot").await;
    carol.drain();

    let first = h.coordinator.compute_snapshot(alice.id()).await.unwrap();
    let second = h.coordinator.compute_snapshot(alice.id()).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(broadcast.snapshot(), Some(&first));
    assert_eq!(usernames(&broadcast), vec!["bob", "carol"]);

    let carol_view = h.coordinator.compute_snapshot(carol.id()).await.unwrap();
    assert_eq!(
        h.coordinator.compute_snapshot(carol.id()).await,
        Some(carol_view.clone())
    );
    assert_eq!(carol_view.other_players.len(), 2);
    assert!(!carol_view.is_admin);
}
