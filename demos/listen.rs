//! Print every message the soundbar sends
//!
//! Reads `SOUNDBAR_IP` and `SOUNDBAR_PORT`, then polls speaker info every two
//! seconds so the device keeps reporting.

use std::time::Duration;

use soundbar::state::DeviceEvent;
use soundbar::{SoundbarClient, SoundbarConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = SoundbarConfig::from_env()?;
    println!("Connecting to {}...", config.address());
    let client = SoundbarClient::connect(config).await?;

    let mut messages = client.subscribe_messages();
    tokio::spawn(async move {
        while let Ok(event) = messages.recv().await {
            match event {
                DeviceEvent::MessageReceived { message } => {
                    match serde_json::to_string_pretty(&message) {
                        Ok(json) => println!("{json}"),
                        Err(e) => eprintln!("Unprintable message: {e}"),
                    }
                }
                DeviceEvent::MessageDropped { reason } => eprintln!("Dropped: {reason}"),
            }
        }
    });

    let mut poll = tokio::time::interval(Duration::from_secs(2));
    loop {
        tokio::select! {
            _ = poll.tick() => {
                if let Err(e) = client.get_volume().await {
                    eprintln!("Poll failed: {e}");
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    client.disconnect().await?;
    Ok(())
}
