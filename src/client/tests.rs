use std::time::Duration;

use serde_json::{Map, Value, json};

use super::SoundbarClient;
use crate::connection::ConnectionState;
use crate::error::SoundbarError;
use crate::protocol::{Command, Message, MessageTag};
use crate::testing::{MockSoundbar, MockSoundbarConfig, config_for};

fn map(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap()
}

async fn silent_device() -> (MockSoundbar, SoundbarClient) {
    let mut device = MockSoundbar::new(MockSoundbarConfig {
        reply_to_gets: false,
        echo_sets: false,
        ..MockSoundbarConfig::default()
    });
    let addr = device.start().await.unwrap();
    let client = SoundbarClient::connect(config_for(addr)).await.unwrap();
    (device, client)
}

#[tokio::test]
async fn test_set_volume_out_of_range_does_no_io() {
    let (mut device, client) = silent_device().await;

    let err = client.set_volume(150).await.unwrap_err();
    assert!(err.is_validation());
    assert!(matches!(
        err,
        SoundbarError::InvalidValue {
            name: "volume",
            value: 150,
            ..
        }
    ));

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(device.received().await.is_empty());
    assert_eq!(client.stats().await.frames_sent, 0);
    assert_eq!(client.snapshot().await.volume, None);

    device.stop().await;
}

#[tokio::test]
async fn test_validation_happens_before_reconnect() {
    // Nothing listens here; validation must fail first
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let client = SoundbarClient::new(config_for(addr));

    assert!(client.set_eq(19).await.unwrap_err().is_validation());
    assert!(client.set_func(20).await.unwrap_err().is_validation());
    assert!(client.set_setting("", true).await.unwrap_err().is_validation());
    assert_eq!(client.stats().await.reconnect_attempts, 0);
}

#[tokio::test]
async fn test_set_volume_is_optimistic() {
    let (mut device, client) = silent_device().await;

    client.set_volume(50).await.unwrap();
    assert_eq!(client.snapshot().await.volume, Some(50));

    assert!(device.wait_for(Duration::from_secs(2), |m| m.len() == 1).await);
    let sent = &device.received().await[0];
    assert_eq!(sent.cmd, Some(Command::Set));
    assert_eq!(sent.msg, MessageTag::SpeakerInfo);
    assert_eq!(sent.data.as_ref().unwrap()["i_vol"], json!(50));

    device.stop().await;
}

#[tokio::test]
async fn test_other_sets_are_optimistic() {
    let (mut device, client) = silent_device().await;

    client.set_mute(true).await.unwrap();
    client.set_eq(18).await.unwrap();
    client.set_func(19).await.unwrap();
    client.set_night_mode(true).await.unwrap();
    client.set_drc(false).await.unwrap();

    let state = client.snapshot().await;
    assert_eq!(state.mute, Some(true));
    assert_eq!(state.eq, Some(18));
    assert_eq!(state.func, Some(19));
    let settings = state.settings.unwrap();
    assert_eq!(settings["b_night_mode"], json!(true));
    assert_eq!(settings["b_drc"], json!(false));

    assert!(device.wait_for(Duration::from_secs(2), |m| m.len() == 5).await);
    let received = device.received().await;
    assert_eq!(received[1].msg, MessageTag::Equalizer);
    assert_eq!(received[2].msg, MessageTag::Function);
    assert_eq!(received[3].msg, MessageTag::Settings);

    device.stop().await;
}

#[tokio::test]
async fn test_get_returns_cache_without_waiting() {
    let (mut device, client) = silent_device().await;

    // The silent device never answers; the get still returns the cache
    assert_eq!(client.get_volume().await.unwrap(), None);
    assert_eq!(client.get_eq().await.unwrap(), None);
    assert_eq!(client.get_play_info().await.unwrap(), None);

    assert!(device.wait_for(Duration::from_secs(2), |m| m.len() == 3).await);
    let received = device.received().await;
    assert!(received.iter().all(|m| m.cmd == Some(Command::Get)));
    assert_eq!(received[0].msg, MessageTag::SpeakerInfo);
    assert_eq!(received[1].msg, MessageTag::Equalizer);
    assert_eq!(received[2].msg, MessageTag::PlayInfo);

    device.stop().await;
}

#[tokio::test]
async fn test_get_full_status_requests_four_tags() {
    let (mut device, client) = silent_device().await;

    let status = client.get_full_status().await.unwrap();
    assert_eq!(status, client.snapshot().await);

    assert!(device.wait_for(Duration::from_secs(2), |m| m.len() == 4).await);
    let tags: Vec<_> = device
        .received()
        .await
        .into_iter()
        .map(|m| m.msg)
        .collect();
    assert_eq!(
        tags,
        vec![
            MessageTag::SpeakerInfo,
            MessageTag::Function,
            MessageTag::Settings,
            MessageTag::PlayInfo,
        ]
    );

    device.stop().await;
}

#[tokio::test]
async fn test_device_replies_update_cache() {
    let mut device = MockSoundbar::default();
    let addr = device.start().await.unwrap();
    device
        .set_attributes(
            MessageTag::ProductInfo,
            map(json!({"s_model": "SP8YA", "s_version": "1.2"})),
        )
        .await;
    let client = SoundbarClient::connect(config_for(addr)).await.unwrap();
    let mut state = client.subscribe_state();

    client.get_product_info().await.unwrap();
    tokio::time::timeout(
        Duration::from_secs(2),
        state.wait_for(|s| s.product_info.is_some()),
    )
    .await
    .unwrap()
    .unwrap();

    let info = client.snapshot().await.product_info.unwrap();
    assert_eq!(info["s_model"], json!("SP8YA"));

    device.stop().await;
}

#[tokio::test]
async fn test_subscribe_messages() {
    let (mut device, client) = silent_device().await;
    let mut messages = client.subscribe_messages();

    // Let the mock register the connection before pushing
    client.get_mute().await.unwrap();
    assert!(device.wait_for(Duration::from_secs(2), |m| m.len() == 1).await);

    device.push(Message {
        cmd: None,
        msg: MessageTag::Other("MIC_INFO".to_string()),
        data: None,
    });

    let event = tokio::time::timeout(Duration::from_secs(2), messages.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        event.tag(),
        Some(&MessageTag::Other("MIC_INFO".to_string()))
    );

    device.stop().await;
}

#[tokio::test]
async fn test_ensure_connection_reconnects_and_probes() {
    let (mut device, client) = silent_device().await;
    client.disconnect().await.unwrap();
    assert_eq!(client.connection_state().await, ConnectionState::Disconnected);

    client.set_mute(false).await.unwrap();
    assert_eq!(client.connection_state().await, ConnectionState::Connected);

    // Liveness probe first, then the command itself
    assert!(device.wait_for(Duration::from_secs(2), |m| m.len() == 2).await);
    let received = device.received().await;
    assert_eq!(received[0], Message::get(MessageTag::SpeakerInfo));
    assert_eq!(received[1].cmd, Some(Command::Set));

    device.stop().await;
}

#[tokio::test]
async fn test_concurrent_commands_probe_once_after_reconnect() {
    let (mut device, client) = silent_device().await;
    client.disconnect().await.unwrap();

    let tasks: Vec<_> = (0..4)
        .map(|_| {
            let client = client.clone();
            tokio::spawn(async move { client.set_mute(true).await })
        })
        .collect();
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    assert!(device.wait_for(Duration::from_secs(2), |m| m.len() == 5).await);
    tokio::time::sleep(Duration::from_millis(50)).await;
    let received = device.received().await;
    let probes = received
        .iter()
        .filter(|m| m.cmd == Some(Command::Get))
        .count();
    assert_eq!(probes, 1);
    assert_eq!(received.len(), 5);

    device.stop().await;
}

#[tokio::test]
async fn test_connect_rejects_invalid_config() {
    let config = crate::types::SoundbarConfig::builder().host("").build();
    let result = SoundbarClient::connect(config).await;
    assert!(matches!(result, Err(SoundbarError::InvalidConfig { .. })));
}
