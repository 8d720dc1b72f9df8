//! MQTT client wrapper for the alarm state store.

use crate::config::MqttConfig;
use log::{debug, error, info, warn};
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

/// Raw message received from the store.
#[derive(Debug, Clone)]
pub struct StoreMessage {
    pub topic: String,
    pub payload: String,
}

/// MQTT client for the alarm state store.
pub struct StoreClient {
    client: AsyncClient,
    event_loop: EventLoop,
}

impl StoreClient {
    /// Create a new store client from configuration.
    pub fn new(config: &MqttConfig) -> Self {
        let mut options =
            MqttOptions::new(&config.client_id, &config.broker_host, config.broker_port);
        options.set_keep_alive(Duration::from_secs(30));

        // Set credentials if provided
        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            options.set_credentials(username, password);
        }

        let (client, event_loop) = AsyncClient::new(options, 100);

        Self { client, event_loop }
    }

    /// Run the MQTT event loop, forwarding messages to the provided channel.
    ///
    /// Signals `connected` once on the first broker acknowledgment. Connection
    /// errors are logged and retried by the underlying client; the monitor has
    /// no reconnection logic of its own.
    pub async fn run(mut self, tx: mpsc::Sender<StoreMessage>, connected: Option<oneshot::Sender<()>>) {
        info!("Starting store event loop");
        let mut connected = connected;

        loop {
            match self.event_loop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(_))) => {
                    debug!("Store connection acknowledged");
                    if let Some(sig) = connected.take() {
                        let _ = sig.send(());
                    }
                }
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    let topic = publish.topic.clone();
                    let payload = match String::from_utf8(publish.payload.to_vec()) {
                        Ok(s) => s,
                        Err(e) => {
                            warn!("Invalid UTF-8 in store payload on {}: {}", topic, e);
                            continue;
                        }
                    };

                    debug!("Store update on {}: {:?}", topic, payload);

                    let msg = StoreMessage { topic, payload };
                    if tx.send(msg).await.is_err() {
                        error!("Store message channel closed");
                        break;
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    error!("Store connection error: {:?}", e);
                    // Wait before the client retries
                    tokio::time::sleep(Duration::from_secs(5)).await;
                }
            }
        }
    }

    /// Get a clone of the async client for publishing from other tasks.
    pub fn client(&self) -> AsyncClient {
        self.client.clone()
    }
}
