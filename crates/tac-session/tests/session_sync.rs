//! Two or more directors sharing an in-process broker and durable store.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tac_core::{
    home_index, initial_fields, marble_count, target_index, ClickOutcome, Field, FieldKind,
    GameId, Marble, MoveError, PlayerId,
};
use tac_realtime::{
    listener, ChannelConfig, ChannelEvent, ChannelEventKind, ConnectionState, MemoryBroker,
    ReplicationChannel,
};
use tac_session::SessionDirector;
use tac_snapshot_store::{GameRecord, LocalCache, MemoryDurableStore, SnapshotStore};

fn player(seat: u8) -> PlayerId {
    PlayerId::new(seat).unwrap()
}

fn client(broker: &MemoryBroker, durable: &Arc<MemoryDurableStore>) -> SessionDirector {
    let cache = Arc::new(LocalCache::in_memory().unwrap());
    let store = SnapshotStore::new(durable.clone(), cache);
    let channel = ReplicationChannel::new(
        ChannelConfig::default(),
        Some(Arc::new(broker.clone())),
        store.clone(),
    );
    SessionDirector::new(store, channel)
}

fn offline_client() -> SessionDirector {
    let store = SnapshotStore::with_local_only(Arc::new(LocalCache::in_memory().unwrap()));
    let channel = ReplicationChannel::new(ChannelConfig::default(), None, store.clone());
    SessionDirector::new(store, channel).with_offline(true)
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(10)).await;
}

fn play(director: &SessionDirector, from: usize, to: usize) -> Vec<Field> {
    assert_eq!(director.click(from), ClickOutcome::Selected(from));
    match director.click(to) {
        ClickOutcome::Moved(fields) => fields,
        other => panic!("move {from} -> {to} failed: {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn live_moves_converge_on_every_client() {
    let broker = MemoryBroker::new();
    let durable = Arc::new(MemoryDurableStore::new());
    let alice = client(&broker, &durable);
    let bob = client(&broker, &durable);

    let game_id = alice.create_session().await.unwrap();
    bob.join_session(game_id.as_str()).await.unwrap();
    settle().await;
    assert_eq!(alice.connection_state(), ConnectionState::Live);
    assert_eq!(bob.connection_state(), ConnectionState::Live);

    let p0 = player(0);
    let p2 = player(2);
    play(&alice, home_index(p0, 0), 0);
    play(&alice, home_index(p2, 1), 32);
    play(&alice, 0, 5);
    let last = play(&alice, 32, target_index(p2, 3));
    settle().await;

    assert_eq!(bob.fields(), last);
    assert_eq!(alice.fields(), last);
    assert_eq!(durable.record(&game_id).unwrap().fields, last);
    // Only the mover broadcast; bob applied without echoing.
    assert_eq!(broker.published(&game_id.topic()).len(), 4);
}

#[tokio::test(start_paused = true)]
async fn remote_updates_are_not_rebroadcast() {
    let broker = MemoryBroker::new();
    let durable = Arc::new(MemoryDurableStore::new());
    let alice = client(&broker, &durable);
    let bob = client(&broker, &durable);

    let game_id = alice.create_session().await.unwrap();
    bob.join_session(game_id.as_str()).await.unwrap();
    settle().await;

    play(&bob, home_index(player(1), 0), 16);
    settle().await;
    play(&alice, home_index(player(3), 0), 48);
    settle().await;

    assert_eq!(broker.published(&game_id.topic()).len(), 2);
    assert_eq!(alice.fields(), bob.fields());
    assert!(!alice.bridge().is_applying_remote());
}

#[tokio::test(start_paused = true)]
async fn join_seeds_board_before_channel_is_live() {
    let broker = MemoryBroker::new();
    let durable = Arc::new(MemoryDurableStore::new());
    let alice = client(&broker, &durable);

    let game_id = alice.create_session().await.unwrap();
    settle().await;
    let board = play(&alice, home_index(player(0), 2), 7);
    settle().await;

    let carol = client(&broker, &durable);
    let link = alice
        .share_link(&url::Url::parse("https://tac.example/").unwrap())
        .unwrap();
    let joined = carol.join_session(link.as_str()).await.unwrap();

    assert_eq!(joined, game_id);
    assert_eq!(carol.connection_state(), ConnectionState::Connecting);
    assert_eq!(carol.fields(), board);
    assert_eq!(carol.history_len(), 0);
}

#[tokio::test(start_paused = true)]
async fn join_falls_back_to_local_cache() {
    let broker = MemoryBroker::new();
    let durable = Arc::new(MemoryDurableStore::new());
    let alice = client(&broker, &durable);

    alice.create_session().await.unwrap();
    settle().await;
    let board = play(&alice, home_index(player(1), 3), 20);
    settle().await;
    let game_id = alice.active_game().unwrap();

    durable.set_fail_reads(true);
    alice.leave_session();
    assert_eq!(alice.active_game(), None);
    alice.join_session(game_id.as_str()).await.unwrap();

    assert_eq!(alice.fields(), board);
}

#[tokio::test(start_paused = true)]
async fn unknown_game_starts_from_initial_board() {
    let broker = MemoryBroker::new();
    let durable = Arc::new(MemoryDurableStore::new());
    let dave = client(&broker, &durable);

    dave.join_session("freshgame").await.unwrap();
    assert_eq!(dave.fields(), initial_fields());
}

#[tokio::test(start_paused = true)]
async fn new_sessions_get_fresh_ids_and_initial_board() {
    let director = offline_client();
    let mut seen = HashSet::new();
    for _ in 0..1000 {
        let game_id = director.create_session().await.unwrap();
        assert!(seen.insert(game_id));
    }

    let game_id = director.active_game().unwrap();
    let stored = director.store().get(&game_id).await.unwrap();
    assert_eq!(stored, initial_fields());
    for field in &stored {
        match field.kind() {
            FieldKind::Circle | FieldKind::Target => assert!(!field.has_marble()),
            FieldKind::Home => {
                assert_eq!(field.marble().map(|m| m.player), field.owner());
            }
        }
    }
    assert_eq!(director.connection_state(), ConnectionState::LocalOnly);
}

#[tokio::test(start_paused = true)]
async fn create_persists_initial_board_remotely() {
    let broker = MemoryBroker::new();
    let durable = Arc::new(MemoryDurableStore::new());
    let alice = client(&broker, &durable);

    let game_id = alice.create_session().await.unwrap();
    assert_eq!(durable.record(&game_id).unwrap().fields, initial_fields());
}

#[tokio::test(start_paused = true)]
async fn create_survives_durable_write_failure() {
    let broker = MemoryBroker::new();
    let durable = Arc::new(MemoryDurableStore::new());
    durable.set_fail_writes(true);
    let alice = client(&broker, &durable);

    let game_id = alice.create_session().await.unwrap();
    assert!(durable.record(&game_id).is_none());
    assert_eq!(alice.store().cache().load(&game_id), Some(initial_fields()));
}

#[tokio::test(start_paused = true)]
async fn foreign_target_move_is_rejected() {
    let director = offline_client();
    director.create_session().await.unwrap();

    play(&director, home_index(player(1), 0), 30);
    let before = director.fields();

    assert_eq!(director.click(30), ClickOutcome::Selected(30));
    let outcome = director.click(target_index(player(2), 0));
    assert!(matches!(
        outcome,
        ClickOutcome::Rejected(MoveError::WrongOwner { .. })
    ));
    assert_eq!(director.fields(), before);
    assert_eq!(director.selected(), None);
}

#[tokio::test(start_paused = true)]
async fn moving_onto_occupied_target_bumps_occupant_home() {
    let broker = MemoryBroker::new();
    let durable = Arc::new(MemoryDurableStore::new());
    let p0 = player(0);
    let p1 = player(1);

    // Player 0's marble sits on target slot 0 of player 1; its home slot 0 is empty.
    let mut seeded = initial_fields();
    let marble = seeded[home_index(p0, 0)].take_marble().unwrap();
    seeded[target_index(p1, 0)].place(marble);
    let game_id = GameId::parse("bumpgame").unwrap();
    durable.insert(GameRecord::now(game_id.clone(), seeded));

    let director = client(&broker, &durable);
    director.join_session(game_id.as_str()).await.unwrap();
    settle().await;

    let next = play(&director, home_index(p1, 0), target_index(p1, 0));

    assert_eq!(next[target_index(p1, 0)].marble(), Some(&Marble::for_player(p1)));
    assert_eq!(next[home_index(p0, 0)].marble(), Some(&Marble::for_player(p0)));
    assert!(!next[home_index(p1, 0)].has_marble());
    assert_eq!(marble_count(&next), 16);
}

#[tokio::test(start_paused = true)]
async fn undo_restores_initial_board_and_is_shared() {
    let broker = MemoryBroker::new();
    let durable = Arc::new(MemoryDurableStore::new());
    let alice = client(&broker, &durable);
    let bob = client(&broker, &durable);

    let game_id = alice.create_session().await.unwrap();
    bob.join_session(game_id.as_str()).await.unwrap();
    settle().await;

    let moves = [
        (home_index(player(0), 0), 0),
        (home_index(player(1), 0), 16),
        (0, 16),
    ];
    for (from, to) in moves {
        play(&alice, from, to);
    }
    settle().await;

    for _ in 0..moves.len() {
        assert!(alice.undo().is_some());
    }
    assert_eq!(alice.undo(), None);
    settle().await;

    assert_eq!(alice.fields(), initial_fields());
    assert_eq!(bob.fields(), initial_fields());
    assert_eq!(durable.record(&game_id).unwrap().fields, initial_fields());
    assert_eq!(broker.published(&game_id.topic()).len(), moves.len() * 2);
}

#[tokio::test(start_paused = true)]
async fn unreachable_realtime_falls_back_and_stays_playable() {
    let broker = MemoryBroker::new();
    broker.fail_next_subscriptions(u32::MAX);
    let durable = Arc::new(MemoryDurableStore::new());
    let alice = client(&broker, &durable);

    let fallbacks = Arc::new(Mutex::new(0));
    let counter = fallbacks.clone();
    alice.events().on(
        ChannelEventKind::Fallback,
        listener(move |event| {
            if matches!(event, ChannelEvent::Fallback { .. }) {
                *counter.lock().unwrap() += 1;
            }
        }),
    );

    let game_id = alice.create_session().await.unwrap();
    tokio::time::sleep(Duration::from_secs(30)).await;

    assert_eq!(*fallbacks.lock().unwrap(), 1);
    assert_eq!(broker.subscribe_attempts(), 5);
    assert_eq!(alice.connection_state(), ConnectionState::LocalOnly);

    let board = play(&alice, home_index(player(3), 2), 50);
    settle().await;
    assert_eq!(alice.fields(), board);
    assert_eq!(durable.record(&game_id).unwrap().fields, board);
    assert!(broker.published(&game_id.topic()).is_empty());
}

#[tokio::test(start_paused = true)]
async fn joining_active_game_again_reconnects() {
    let broker = MemoryBroker::new();
    let durable = Arc::new(MemoryDurableStore::new());
    let alice = client(&broker, &durable);

    let game_id = alice.create_session().await.unwrap();
    settle().await;
    alice.join_session(game_id.as_str()).await.unwrap();
    settle().await;

    assert_eq!(broker.subscribe_attempts(), 2);
    assert_eq!(broker.subscriber_count(&game_id.topic()), 1);
    assert_eq!(alice.connection_state(), ConnectionState::Live);
}
