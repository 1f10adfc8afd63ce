use huddle_core::{ClientMessage, Role, RoomId, ServerMessage};

use crate::integration::{create_test_engine, init_tracing};
use crate::utils::{assert_consistent, connect_and_join, join_msg, set_sharing};

#[tokio::test]
async fn test_rejoin_replays_active_shares() {
    init_tracing();

    let (mut engine, output) = create_test_engine();

    let a = connect_and_join(&mut engine, &output, "A", "R1", Role::Host).await;
    set_sharing(&mut engine, &output, &a, "R1", true).await;
    let b = connect_and_join(&mut engine, &output, "B", "R1", Role::Guest).await;
    output.clear().await;

    // Same id, new session: the old record is still present.
    connect_and_join(&mut engine, &output, "B", "R1", Role::Guest).await;

    let messages = output.messages_for(&b).await;
    let snapshot = messages
        .iter()
        .find(|m| m.op() == "room-snapshot")
        .expect("snapshot");
    assert!(matches!(
        snapshot,
        ServerMessage::RoomSnapshot {
            is_reconnect: true,
            ..
        }
    ));

    let replays: Vec<_> = messages
        .iter()
        .filter_map(|m| match m {
            ServerMessage::ShareStarted { user_id, .. } => Some(user_id.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(replays, vec![a.clone()]);

    assert_eq!(output.count_op_for(&a, "share-started").await, 0);
    assert_eq!(engine.registry().len(), 2);
    assert_consistent(&engine);
}

#[tokio::test]
async fn test_fresh_join_gets_no_replay() {
    init_tracing();

    let (mut engine, output) = create_test_engine();

    let a = connect_and_join(&mut engine, &output, "A", "R1", Role::Host).await;
    set_sharing(&mut engine, &output, &a, "R1", true).await;
    let c = connect_and_join(&mut engine, &output, "C", "R1", Role::Guest).await;

    assert_eq!(output.count_op_for(&c, "share-started").await, 0);

    let members = output.last_presence_for(&c).await.unwrap();
    assert!(members.iter().any(|m| m.id == a && m.is_sharing));
}

#[tokio::test]
async fn test_stale_close_is_ignored_while_new_session_is_open() {
    init_tracing();

    let (mut engine, output) = create_test_engine();
    let a = connect_and_join(&mut engine, &output, "A", "R1", Role::Host).await;
    let stale = output.session_of(&a);

    // A newer session opens before the old close is processed.
    output.connect(&a);
    engine.connection_closed(&a, stale).await;

    assert!(engine.registry().contains(&a));
    assert_consistent(&engine);
}

#[tokio::test]
async fn test_close_of_superseded_session_keeps_rejoined_record() {
    init_tracing();

    let (mut engine, output) = create_test_engine();
    let a = connect_and_join(&mut engine, &output, "A", "R1", Role::Host).await;
    let stale = output.session_of(&a);
    connect_and_join(&mut engine, &output, "A", "R1", Role::Host).await;

    // The new session is gone from the transport too, but its close has not
    // arrived yet.
    output.disconnect(&a);
    engine.connection_closed(&a, stale).await;

    assert!(engine.registry().contains(&a));
    assert_eq!(
        engine.directory().members_of(&RoomId::from("R1")),
        vec![a.clone()]
    );
    assert_consistent(&engine);
}

#[tokio::test]
async fn test_repeated_join_on_same_session_keeps_record() {
    init_tracing();

    let (mut engine, output) = create_test_engine();
    let a = connect_and_join(&mut engine, &output, "A", "R1", Role::Host).await;
    let b = connect_and_join(&mut engine, &output, "B", "R1", Role::Guest).await;
    set_sharing(&mut engine, &output, &b, "R1", true).await;
    engine
        .accept(
            &b,
            output.session_of(&b),
            ClientMessage::SetAudioStatus {
                is_muted: true,
                has_audio: Some(true),
            },
        )
        .await;
    output.clear().await;

    // Same session, same room, asking for a different role.
    engine
        .accept(&b, output.session_of(&b), join_msg("R1", "B", Role::Host))
        .await;

    let record = engine.registry().get(&b).unwrap();
    assert_eq!(record.role, Role::Guest);
    assert!(record.is_sharing);
    assert!(record.is_muted);
    assert!(record.has_audio);

    assert_eq!(output.count_op_for(&a, "share-stopped").await, 0);
    assert!(output.messages_for(&a).await.is_empty());

    let messages = output.messages_for(&b).await;
    assert_eq!(messages.len(), 1);
    assert!(matches!(
        &messages[0],
        ServerMessage::RoomSnapshot {
            is_reconnect: false,
            ..
        }
    ));
    assert_consistent(&engine);
}

#[tokio::test]
async fn test_frames_from_superseded_session_are_dropped() {
    init_tracing();

    let (mut engine, output) = create_test_engine();
    let a = connect_and_join(&mut engine, &output, "A", "R1", Role::Host).await;
    let stale = output.session_of(&a);
    connect_and_join(&mut engine, &output, "A", "R1", Role::Host).await;

    engine
        .accept(
            &a,
            stale,
            ClientMessage::SetSharing {
                room_id: RoomId::from("R1"),
                is_sharing: true,
                has_audio: None,
            },
        )
        .await;

    assert!(!engine.registry().get(&a).unwrap().is_sharing);
}
