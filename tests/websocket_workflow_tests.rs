use std::time::Duration;

use eventcast::{
    schema::{PacketVersion, WireFormat},
    subscriber::{CloseReason, OverflowPolicy},
    websockets::{ControlMessage, Frame},
};

mod utils;

use utils::*;

async fn expect_frame(client: &mut MockClient) -> FrameAssertion {
    let frame = client.next_frame().await.expect("server should send a frame");
    FrameAssertion::from_frame(&frame)
}

#[tokio::test]
async fn test_client_subscribes_and_receives_events() {
    let setup = TestSetupBuilder::new().build();
    let mut conn = setup.connect(PacketVersion::V1, WireFormat::Json);

    conn.client.subscribe("c1");
    expect_frame(&mut conn.client)
        .await
        .cmd("subscribed")
        .field("topic", "c1");

    setup.bus.submit(setup.reaction("c1", "p1")).await.unwrap();

    let frame = conn.client.next_frame().await.unwrap();
    assert!(matches!(frame, Frame::Text(_)));
    FrameAssertion::from_frame(&frame)
        .cmd("post_reaction_add")
        .field("post_id", "p1");
}

#[tokio::test]
async fn test_msgpack_client_gets_binary_frames() {
    let setup = TestSetupBuilder::new().build();
    let mut conn = setup.connect(PacketVersion::V0, WireFormat::MessagePack);

    conn.client.subscribe("c1");
    let reply = conn.client.next_frame().await.unwrap();
    assert!(matches!(reply, Frame::Binary(_)));
    FrameAssertion::from_frame(&reply).cmd("subscribed");

    setup.bus.submit(setup.reaction("c1", "p1")).await.unwrap();

    let frame = conn.client.next_frame().await.unwrap();
    assert!(matches!(frame, Frame::Binary(_)));
    FrameAssertion::from_frame(&frame)
        .cmd("post_reaction_add")
        .field("emoji", "👍");
}

#[tokio::test]
async fn test_unsubscribe_stops_delivery() {
    let setup = TestSetupBuilder::new().build();
    let mut conn = setup.connect(PacketVersion::V1, WireFormat::Json);
    conn.client.subscribe("c1");
    expect_frame(&mut conn.client).await.cmd("subscribed");

    conn.client.unsubscribe("c1");
    expect_frame(&mut conn.client).await.cmd("unsubscribed");
    setup.bus.submit(setup.reaction("c1", "p1")).await.unwrap();

    assert!(conn.client.is_silent().await);
    assert_eq!(setup.index.topic_count(), 0);
}

#[tokio::test]
async fn test_ping_and_bad_frames_get_replies() {
    let setup = TestSetupBuilder::new().build();
    let mut conn = setup.connect(PacketVersion::V1, WireFormat::Json);

    conn.client.send_control(&ControlMessage::Ping);
    expect_frame(&mut conn.client).await.cmd("pong");

    conn.client.send(Frame::Text("not json".to_string()));
    expect_frame(&mut conn.client).await.cmd("error");

    conn.client.subscribe("   ");
    expect_frame(&mut conn.client).await.cmd("error");
    assert_eq!(setup.index.topic_count(), 0);
}

#[tokio::test]
async fn test_hang_up_disconnects_from_every_topic() {
    let setup = TestSetupBuilder::new().build();
    let mut conn = setup.connect(PacketVersion::V1, WireFormat::Json);
    for topic in ["c1", "c2"] {
        conn.client.subscribe(topic);
        expect_frame(&mut conn.client).await.cmd("subscribed");
    }

    conn.client.hang_up();
    let result = tokio::time::timeout(Duration::from_secs(1), conn.task)
        .await
        .expect("connection should stop")
        .unwrap();

    assert!(result.is_ok());
    assert!(conn.client.was_closed_by_server());
    assert_eq!(conn.subscriber.close_reason(), Some(CloseReason::Disconnected));
    assert_eq!(setup.index.topic_count(), 0);
}

#[tokio::test]
async fn test_failed_close_still_ends_cleanly() {
    let setup = TestSetupBuilder::new().build();
    let mut conn = setup.connect(PacketVersion::V1, WireFormat::Json);
    conn.client.subscribe("c1");
    expect_frame(&mut conn.client).await.cmd("subscribed");

    conn.client.drop_connection();
    let result = tokio::time::timeout(Duration::from_secs(1), conn.task)
        .await
        .expect("connection should stop")
        .unwrap();

    assert!(result.is_ok());
    assert_eq!(conn.subscriber.close_reason(), Some(CloseReason::Disconnected));
    assert_eq!(setup.index.topic_count(), 0);
}

#[tokio::test]
async fn test_server_side_disconnect_flushes_queued_frames() {
    let setup = TestSetupBuilder::new().build();
    let mut conn = setup.connect(PacketVersion::V1, WireFormat::Json);
    conn.client.subscribe("c1");
    expect_frame(&mut conn.client).await.cmd("subscribed");

    setup.bus.submit(setup.reaction("c1", "p1")).await.unwrap();
    setup.index.disconnect(&conn.subscriber);

    expect_frame(&mut conn.client)
        .await
        .cmd("post_reaction_add")
        .field("post_id", "p1");
    let result = tokio::time::timeout(Duration::from_secs(1), conn.task)
        .await
        .expect("connection should stop")
        .unwrap();
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_overflowed_connection_is_closed() {
    let setup = TestSetupBuilder::new()
        .with_capacity(1)
        .with_policy(OverflowPolicy::Disconnect)
        .build();
    let mut conn = setup.connect(PacketVersion::V1, WireFormat::Json);
    conn.client.subscribe("c1");
    expect_frame(&mut conn.client).await.cmd("subscribed");

    // Dispatch without yielding so the connection task cannot drain in between
    for i in 0..3 {
        setup
            .bus
            .dispatcher()
            .dispatch(&setup.reaction("c1", &format!("p{i}")));
    }

    let result = tokio::time::timeout(Duration::from_secs(1), conn.task)
        .await
        .expect("connection should stop")
        .unwrap();
    assert!(result.is_ok());
    assert_eq!(conn.subscriber.close_reason(), Some(CloseReason::Overflow));
    assert_eq!(setup.index.subscriber_count("c1"), 0);
}
