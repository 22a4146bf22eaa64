use std::time::Duration;

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use serde_json::{Map, json};
use tokio::net::TcpStream;
use tokio_util::codec::Framed;

use super::mock_device::{MockSoundbar, MockSoundbarConfig};
use crate::protocol::{Command, FrameCodec, Message, MessageTag};

async fn connect(addr: std::net::SocketAddr) -> Framed<TcpStream, FrameCodec> {
    let stream = TcpStream::connect(addr).await.unwrap();
    Framed::new(stream, FrameCodec::new())
}

async fn send(framed: &mut Framed<TcpStream, FrameCodec>, message: &Message) {
    framed
        .send(Bytes::from(message.to_json().unwrap()))
        .await
        .unwrap();
}

async fn recv(framed: &mut Framed<TcpStream, FrameCodec>) -> Message {
    let payload = tokio::time::timeout(Duration::from_secs(2), framed.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap()
        .unwrap();
    Message::from_json(&payload).unwrap()
}

fn map(value: serde_json::Value) -> Map<String, serde_json::Value> {
    value.as_object().cloned().unwrap()
}

#[tokio::test]
async fn test_mock_soundbar_starts() {
    let mut device = MockSoundbar::default();
    let addr = device.start().await.unwrap();

    assert!(addr.port() > 0);
    assert_eq!(device.address(), Some(addr));

    device.stop().await;
}

#[tokio::test]
async fn test_get_is_answered_from_attributes() {
    let mut device = MockSoundbar::default();
    let addr = device.start().await.unwrap();
    device
        .set_attributes(MessageTag::SpeakerInfo, map(json!({"i_vol": 12})))
        .await;

    let mut framed = connect(addr).await;
    send(&mut framed, &Message::get(MessageTag::SpeakerInfo)).await;

    let reply = recv(&mut framed).await;
    assert_eq!(reply.cmd, None);
    assert_eq!(reply.msg, MessageTag::SpeakerInfo);
    assert_eq!(reply.data.unwrap()["i_vol"], json!(12));

    let received = device.received().await;
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].cmd, Some(Command::Get));

    device.stop().await;
}

#[tokio::test]
async fn test_set_updates_and_echoes() {
    let mut device = MockSoundbar::default();
    let addr = device.start().await.unwrap();

    let mut framed = connect(addr).await;
    send(
        &mut framed,
        &Message::set_field(MessageTag::Equalizer, "i_curr_eq", 3),
    )
    .await;

    let reply = recv(&mut framed).await;
    assert_eq!(reply.data.unwrap()["i_curr_eq"], json!(3));
    assert_eq!(
        device.attributes(&MessageTag::Equalizer).await,
        Some(map(json!({"i_curr_eq": 3})))
    );

    device.stop().await;
}

#[tokio::test]
async fn test_silent_mode() {
    let mut device = MockSoundbar::new(MockSoundbarConfig {
        reply_to_gets: false,
        echo_sets: false,
        ..MockSoundbarConfig::default()
    });
    let addr = device.start().await.unwrap();
    device
        .set_attributes(MessageTag::PlayInfo, map(json!({"s_title": "x"})))
        .await;

    let mut framed = connect(addr).await;
    send(&mut framed, &Message::get(MessageTag::PlayInfo)).await;

    assert!(device.wait_for(Duration::from_secs(2), |m| m.len() == 1).await);
    let reply = tokio::time::timeout(Duration::from_millis(100), framed.next()).await;
    assert!(reply.is_err());

    device.stop().await;
}

#[tokio::test]
async fn test_push_and_drop_connections() {
    let mut device = MockSoundbar::default();
    let addr = device.start().await.unwrap();

    let mut framed = connect(addr).await;
    // Make sure the connection is registered before pushing
    send(&mut framed, &Message::get(MessageTag::ProductInfo)).await;
    assert!(device.wait_for(Duration::from_secs(2), |m| m.len() == 1).await);
    assert_eq!(device.connection_count().await, 1);

    device.push(Message {
        cmd: None,
        msg: MessageTag::Function,
        data: Some(map(json!({"i_curr_func": 6}))),
    });
    let pushed = recv(&mut framed).await;
    assert_eq!(pushed.msg, MessageTag::Function);

    device.drop_connections();
    let closed = tokio::time::timeout(Duration::from_secs(2), framed.next())
        .await
        .unwrap();
    assert!(closed.is_none());

    device.stop().await;
}
