use huddle_core::{ClientMessage, ConnectionId, Role, RoomId, ServerMessage};

use crate::integration::{create_test_engine, init_tracing};
use crate::utils::{assert_consistent, connect_and_join};

#[tokio::test]
async fn test_host_and_guest_see_each_other() {
    init_tracing();

    let (mut engine, output) = create_test_engine();

    let a = connect_and_join(&mut engine, &output, "A", "R1", Role::Host).await;
    let b = connect_and_join(&mut engine, &output, "B", "R1", Role::Guest).await;

    for id in [&a, &b] {
        let members = output
            .last_presence_for(id)
            .await
            .expect("member should receive presence");

        assert_eq!(members.len(), 2);
        assert_eq!(members[0].id, a);
        assert_eq!(members[0].role, Role::Host);
        assert_eq!(members[1].id, b);
        assert_eq!(members[1].role, Role::Guest);
    }

    assert_consistent(&engine);
}

#[tokio::test]
async fn test_joiner_receives_private_snapshot() {
    init_tracing();

    let (mut engine, output) = create_test_engine();

    let a = connect_and_join(&mut engine, &output, "A", "R1", Role::Host).await;
    output.clear().await;
    let b = connect_and_join(&mut engine, &output, "B", "R1", Role::Guest).await;

    let snapshots: Vec<_> = output
        .messages_for(&b)
        .await
        .into_iter()
        .filter(|m| m.op() == "room-snapshot")
        .collect();
    assert_eq!(snapshots.len(), 1);

    let ServerMessage::RoomSnapshot {
        room_id,
        members,
        self_id,
        is_reconnect,
    } = &snapshots[0]
    else {
        unreachable!();
    };
    assert_eq!(room_id, &RoomId::from("R1"));
    assert_eq!(self_id, &b);
    assert_eq!(members.len(), 2);
    assert!(!is_reconnect);

    assert_eq!(output.count_op_for(&a, "room-snapshot").await, 0);
}

#[tokio::test]
async fn test_missing_display_name_uses_placeholder() {
    init_tracing();

    let (mut engine, output) = create_test_engine();
    let a = ConnectionId::from("A");
    output.connect(&a);

    engine
        .accept(
            &a,
            output.session_of(&a),
            ClientMessage::Join {
                room_id: RoomId::from("R1"),
                connection_id: Some(a.clone()),
                display_name: None,
                role: Role::Guest,
            },
        )
        .await;

    let members = output.last_presence_for(&a).await.unwrap();
    assert_eq!(members[0].display_name, "Anonymous");
}
