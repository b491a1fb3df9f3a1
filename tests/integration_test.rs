use acrodash::config::GameConfig;
use acrodash::protocol::{ClientMessage, ServerMessage};
use acrodash::state::{AppState, GameOptions};
use acrodash::types::{GameStage, Phase};
use acrodash::ws::handlers::handle_message;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::{sleep_until, Instant};

/// Every acronym is "BBB"; one round past the cap triggers a one-round face-off
fn short_game() -> GameOptions {
    GameOptions {
        config: GameConfig {
            char_pool: "B".to_string(),
            min_letters: 3,
            max_letters: 3,
            face_off_min_letters: 3,
            face_off_rounds: 1,
            point_cap: 5,
            secs_per_acro_round: 10,
            secs_per_vote_round: 20,
            secs_per_face_off_round: 10,
            secs_between_face_off_rounds: 5,
            secs_between_messages: 0,
            secs_after_results: 0,
            secs_between_rounds: 0,
            ..GameConfig::default()
        },
        seed: Some(42),
    }
}

async fn say(state: &Arc<AppState>, name: &str, text: &str) {
    let response = handle_message(
        ClientMessage::Say {
            text: text.to_string(),
        },
        "main",
        name,
        state,
    )
    .await;
    assert!(response.is_none(), "Unexpected response: {:?}", response);
}

async fn ballot_number(state: &AppState, id: &str) -> String {
    let snapshot = state.snapshot("main").await.expect("Game should exist");
    let index = snapshot
        .ballot
        .iter()
        .position(|p| p == id)
        .expect("Entry should be on the ballot");
    (index + 1).to_string()
}

fn drain(rx: &mut broadcast::Receiver<ServerMessage>) -> Vec<ServerMessage> {
    let mut messages = Vec::new();
    while let Ok(msg) = rx.try_recv() {
        messages.push(msg);
    }
    messages
}

fn public_texts(messages: &[ServerMessage]) -> Vec<String> {
    messages
        .iter()
        .filter_map(|msg| match msg {
            ServerMessage::Public { text } => Some(text.clone()),
            _ => None,
        })
        .collect()
}

fn private_texts(messages: &[ServerMessage], name: &str) -> Vec<String> {
    messages
        .iter()
        .filter(|msg| matches!(msg, ServerMessage::Private { .. }) && msg.is_for(name))
        .filter_map(|msg| match msg {
            ServerMessage::Private { text, .. } => Some(text.clone()),
            _ => None,
        })
        .collect()
}

/// Standard round past the cap, then a face-off decided by a lone answer
#[tokio::test(start_paused = true)]
async fn test_full_game_flow() {
    let state = Arc::new(AppState::default());
    let mut rx = state.subscribe("main").await;
    let start = Instant::now();

    state.start_game_with("main", short_game()).await.unwrap();

    // 1. Submissions
    sleep_until(start + Duration::from_millis(100)).await;
    let snapshot = state.snapshot("main").await.unwrap();
    assert_eq!(snapshot.stage, GameStage::Standard);
    assert_eq!(snapshot.phase, Phase::CollectingSubmissions);
    assert_eq!(snapshot.acronym.as_deref(), Some("BBB"));

    say(&state, "alice", "big bold bear").await;
    sleep_until(start + Duration::from_millis(200)).await;
    say(&state, "bob", "bring back bread").await;
    sleep_until(start + Duration::from_millis(300)).await;
    say(&state, "carol", "bad bouncy ball").await;
    say(&state, "dave", "not even close").await;

    // 2. Voting
    sleep_until(start + Duration::from_secs(11)).await;
    assert_eq!(
        state.snapshot("main").await.unwrap().phase,
        Phase::CollectingVotes
    );
    let alice = ballot_number(&state, "alice").await;
    let bob = ballot_number(&state, "bob").await;
    say(&state, "bob", &alice).await;
    say(&state, "carol", &alice).await;
    say(&state, "alice", &alice).await;
    say(&state, "alice", &bob).await;

    // 3. alice reaches the cap; face-off alice vs bob
    sleep_until(start + Duration::from_secs(31)).await;
    let snapshot = state.snapshot("main").await.unwrap();
    assert_eq!(snapshot.stage, GameStage::FaceOff);
    assert_eq!(snapshot.scores.get("alice"), Some(&7));
    assert_eq!(snapshot.scores.get("bob"), Some(&2));
    assert_eq!(snapshot.scores.get("carol"), Some(&1));

    // carol is in the audience and can't answer
    say(&state, "carol", "big bold bear").await;
    say(&state, "bob", "big bold bear").await;

    // 4. Result, and the game leaves the table
    sleep_until(start + Duration::from_secs(60)).await;
    assert!(state.get_game("main").await.is_none());

    let messages = drain(&mut rx);
    assert!(matches!(messages.first(), Some(ServerMessage::GameStarted { .. })));

    let public = public_texts(&messages);
    assert!(public.contains(&"[Round 1] The acronym is BBB. Send a phrase whose words start with those letters!".to_string()));
    assert!(public.contains(&"alice wins the round!".to_string()));
    assert!(public.contains(&"Scores: alice 7 | bob 2 | carol 1".to_string()));
    assert!(public.iter().any(|t| t.starts_with("Face-off! alice vs bob")));
    assert!(public.contains(&"[Face-off 1/1] Only bob answered and takes 3 points.".to_string()));
    assert_eq!(public.last().map(String::as_str), Some("Game over! bob is the champion!"));

    assert_eq!(
        private_texts(&messages, "alice"),
        vec![
            "Your entry is in.",
            "You can't vote for your own entry.",
            "Vote counted.",
        ]
    );
    assert_eq!(
        private_texts(&messages, "dave"),
        vec!["That spells 'NEC', which doesn't match."]
    );
    // carol's face-off answer went nowhere
    assert_eq!(
        private_texts(&messages, "carol"),
        vec!["Your entry is in.", "Vote counted."]
    );
}

#[tokio::test(start_paused = true)]
async fn test_stop_game_silences_arena() {
    let state = Arc::new(AppState::default());
    let mut rx = state.subscribe("main").await;

    state.start_game_with("main", short_game()).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    say(&state, "alice", "big bold bear").await;

    let response = handle_message(ClientMessage::StopGame, "main", "host", &state).await;
    assert!(response.is_none());
    let stopped = drain(&mut rx);
    assert!(matches!(stopped.last(), Some(ServerMessage::GameStopped)));

    // Nothing else arrives once stopped
    tokio::time::sleep(Duration::from_secs(120)).await;
    assert!(drain(&mut rx).is_empty());
    assert!(state.snapshot("main").await.is_none());

    // A fresh game can start in the same arena
    let response = handle_message(ClientMessage::StartGame, "main", "host", &state).await;
    assert!(response.is_none());
    handle_message(ClientMessage::StopGame, "main", "host", &state).await;
}

#[tokio::test(start_paused = true)]
async fn test_arenas_are_isolated() {
    let state = Arc::new(AppState::default());
    let mut side_rx = state.subscribe("side").await;

    state.start_game_with("main", short_game()).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    say(&state, "alice", "big bold bear").await;

    assert!(drain(&mut side_rx).is_empty());
    assert!(state.snapshot("side").await.is_none());

    state.stop_game("main").await.unwrap();
}
