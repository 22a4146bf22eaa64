//! Mock soundbar for testing purposes.
//!
//! Listens on localhost and speaks the real wire protocol: encrypted frames
//! carrying JSON messages. It keeps its own per-tag attributes, answers `get`
//! requests from them, applies `set` requests and echoes the result, and can
//! push unsolicited messages or drop every open connection on demand.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use serde_json::{Map, Value};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{RwLock, broadcast, mpsc, watch};
use tokio_util::codec::{FramedRead, FramedWrite};

use crate::protocol::{Command, FrameCodec, Message, MessageTag};

/// Configuration for the mock soundbar.
#[derive(Debug, Clone)]
pub struct MockSoundbarConfig {
    /// Port to listen on (0 picks an ephemeral port).
    pub port: u16,
    /// Answer `get` requests with the stored attributes.
    pub reply_to_gets: bool,
    /// Echo the updated attributes after a `set`.
    pub echo_sets: bool,
}

impl Default for MockSoundbarConfig {
    fn default() -> Self {
        Self {
            port: 0,
            reply_to_gets: true,
            echo_sets: true,
        }
    }
}

/// Internal state of the mock.
#[derive(Default)]
struct DeviceModel {
    /// Every message received, in order.
    received: Vec<Message>,
    /// Current attributes per tag.
    attributes: HashMap<MessageTag, Map<String, Value>>,
    /// Number of accepted connections.
    connections: usize,
}

/// A mock soundbar device.
pub struct MockSoundbar {
    config: MockSoundbarConfig,
    model: Arc<RwLock<DeviceModel>>,
    /// Messages pushed to every connection.
    push_tx: broadcast::Sender<Message>,
    /// Bumped to close every open connection.
    kill_tx: watch::Sender<u64>,
    /// Channel to signal shutdown to the accept loop.
    shutdown: Option<mpsc::Sender<()>>,
    address: Option<SocketAddr>,
}

impl MockSoundbar {
    /// Creates a new mock with the specified configuration.
    #[must_use]
    pub fn new(config: MockSoundbarConfig) -> Self {
        let (push_tx, _) = broadcast::channel(64);
        let (kill_tx, _) = watch::channel(0);
        Self {
            config,
            model: Arc::new(RwLock::new(DeviceModel::default())),
            push_tx,
            kill_tx,
            shutdown: None,
            address: None,
        }
    }

    /// Starts the mock and returns the bound address.
    ///
    /// # Errors
    ///
    /// Returns an error if the TCP listener cannot be bound.
    pub async fn start(&mut self) -> Result<SocketAddr, std::io::Error> {
        let listener = TcpListener::bind(("127.0.0.1", self.config.port)).await?;
        let addr = listener.local_addr()?;
        self.address = Some(addr);

        let (shutdown_tx, mut shutdown_rx) = mpsc::channel(1);
        self.shutdown = Some(shutdown_tx);

        let model = self.model.clone();
        let config = self.config.clone();
        let push_tx = self.push_tx.clone();
        let kill_tx = self.kill_tx.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    result = listener.accept() => match result {
                        Ok((stream, peer)) => {
                            tracing::debug!("Mock soundbar accepted {}", peer);
                            let conn = Connection {
                                model: model.clone(),
                                config: config.clone(),
                                push_rx: push_tx.subscribe(),
                                kill_rx: kill_tx.subscribe(),
                            };
                            model.write().await.connections += 1;
                            tokio::spawn(conn.run(stream));
                        }
                        Err(e) => tracing::error!("Accept error: {}", e),
                    },
                    _ = shutdown_rx.recv() => break,
                }
            }
        });

        Ok(addr)
    }

    /// Stops accepting and closes every open connection.
    pub async fn stop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(()).await;
        }
        self.drop_connections();
    }

    /// Returns the address the mock is listening on.
    #[must_use]
    pub fn address(&self) -> Option<SocketAddr> {
        self.address
    }

    /// Closes every open connection, as a device reboot would.
    pub fn drop_connections(&self) {
        self.kill_tx.send_modify(|epoch| *epoch += 1);
    }

    /// Sends an unsolicited message on every open connection.
    pub fn push(&self, message: Message) {
        let _ = self.push_tx.send(message);
    }

    /// Sets the attributes reported for `tag`.
    pub async fn set_attributes(&self, tag: MessageTag, data: Map<String, Value>) {
        self.model.write().await.attributes.insert(tag, data);
    }

    /// Returns the attributes currently stored for `tag`.
    pub async fn attributes(&self, tag: &MessageTag) -> Option<Map<String, Value>> {
        self.model.read().await.attributes.get(tag).cloned()
    }

    /// Returns every message received so far.
    pub async fn received(&self) -> Vec<Message> {
        self.model.read().await.received.clone()
    }

    /// Returns the number of connections accepted so far.
    pub async fn connection_count(&self) -> usize {
        self.model.read().await.connections
    }

    /// Polls until `predicate` holds for the received messages or `limit` passes.
    pub async fn wait_for<F>(&self, limit: Duration, predicate: F) -> bool
    where
        F: Fn(&[Message]) -> bool,
    {
        let deadline = tokio::time::Instant::now() + limit;
        loop {
            if predicate(&self.model.read().await.received) {
                return true;
            }
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

impl Default for MockSoundbar {
    fn default() -> Self {
        Self::new(MockSoundbarConfig::default())
    }
}

impl Drop for MockSoundbar {
    fn drop(&mut self) {
        self.drop_connections();
    }
}

/// One accepted connection.
struct Connection {
    model: Arc<RwLock<DeviceModel>>,
    config: MockSoundbarConfig,
    push_rx: broadcast::Receiver<Message>,
    kill_rx: watch::Receiver<u64>,
}

impl Connection {
    async fn run(mut self, stream: TcpStream) {
        let (read, write) = stream.into_split();
        let mut frames = FramedRead::new(read, FrameCodec::new());
        let mut sink = FramedWrite::new(write, FrameCodec::new());

        loop {
            let outbound = tokio::select! {
                frame = frames.next() => match frame {
                    Some(Ok(Ok(payload))) => self.handle(&payload).await,
                    Some(Ok(Err(e))) => {
                        tracing::warn!("Mock soundbar dropped frame: {}", e);
                        None
                    }
                    Some(Err(_)) | None => break,
                },
                pushed = self.push_rx.recv() => match pushed {
                    Ok(message) => Some(message),
                    Err(broadcast::error::RecvError::Lagged(_)) => None,
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                _ = self.kill_rx.changed() => break,
            };

            if let Some(message) = outbound {
                let Ok(json) = message.to_json() else { continue };
                if sink.send(Bytes::from(json)).await.is_err() {
                    break;
                }
            }
        }
    }

    /// Records a request and builds the reply, if any.
    async fn handle(&self, payload: &[u8]) -> Option<Message> {
        let message = match Message::from_json(payload) {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!("Mock soundbar received invalid message: {}", e);
                return None;
            }
        };

        let mut model = self.model.write().await;
        model.received.push(message.clone());

        let tag = message.msg.clone();
        let reply = match message.cmd {
            Some(Command::Get) if self.config.reply_to_gets => {
                model.attributes.get(&tag).cloned()
            }
            Some(Command::Set) => {
                let current = model.attributes.entry(tag.clone()).or_default();
                current.extend(message.data.unwrap_or_default());
                self.config.echo_sets.then(|| current.clone())
            }
            _ => None,
        };

        reply.map(|data| Message {
            cmd: None,
            msg: tag,
            data: Some(data),
        })
    }
}
