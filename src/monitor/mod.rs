//! Monitor orchestrator.
//!
//! Connects the store client, subscribes the alarm topics and drives one
//! `select!` loop over the watchdog interval, the store event channel and the
//! user-command channel. The loop task is the only owner of the [`Reconciler`],
//! so every state transition happens on a single execution context.

pub mod history;
pub mod reconciler;

pub use reconciler::{MISS_THRESHOLD, Reconciler};

use crate::config::Config;
use crate::notify::{NotificationMessage, NotifyMode};
use crate::prefs::Preferences;
use crate::presenter::Presenter;
use crate::store::{StoreClient, StoreEvent, StoreMessage, Topics};
use log::{debug, info, warn};
use rumqttc::{AsyncClient, QoS};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// User gestures and lifecycle commands fed into the monitor loop.
#[derive(Debug)]
enum Command {
    ToggleDisabled,
    SetLocalSiren(bool),
    SetNotifyMode(NotifyMode),
    Shutdown,
}

/// Handle for driving a running monitor. Cloneable; all methods are
/// fire-and-forget sends into the monitor loop.
#[derive(Clone)]
pub struct MonitorHandle {
    cmd_tx: mpsc::Sender<Command>,
}

impl MonitorHandle {
    /// Write the negation of the disabled flag to the store.
    pub async fn toggle_disabled(&self) {
        let _ = self.cmd_tx.send(Command::ToggleDisabled).await;
    }

    /// Write the local siren setting to the store.
    pub async fn set_local_siren(&self, enabled: bool) {
        let _ = self.cmd_tx.send(Command::SetLocalSiren(enabled)).await;
    }

    /// Switch notification mode: updates channel subscriptions and persists
    /// the choice.
    pub async fn set_notify_mode(&self, mode: NotifyMode) {
        let _ = self.cmd_tx.send(Command::SetNotifyMode(mode)).await;
    }

    /// Stop the monitor. Safe to call any number of times; sends after the
    /// loop has exited are ignored.
    pub async fn shutdown(&self) {
        let _ = self.cmd_tx.send(Command::Shutdown).await;
    }
}

/// The monitor owns everything needed to run: configuration, presenter and
/// persisted preferences.
pub struct Monitor {
    config: Config,
    presenter: Arc<dyn Presenter>,
    prefs: Preferences,
    prefs_path: Option<PathBuf>,
}

impl Monitor {
    pub fn new(
        config: Config,
        presenter: Arc<dyn Presenter>,
        prefs: Preferences,
        prefs_path: Option<PathBuf>,
    ) -> Self {
        Self {
            config,
            presenter,
            prefs,
            prefs_path,
        }
    }

    /// Start the monitor loop.
    ///
    /// Consumes the monitor, so a second timer can never be started for the
    /// same instance. Returns a handle for user gestures and the loop task.
    pub fn start(self) -> (MonitorHandle, JoinHandle<()>) {
        let (cmd_tx, cmd_rx) = mpsc::channel(16);
        let task = tokio::spawn(self.run(cmd_rx));
        (MonitorHandle { cmd_tx }, task)
    }

    async fn run(mut self, mut cmd_rx: mpsc::Receiver<Command>) {
        let topics = Topics::new(self.config.alarm.base_topic.clone());
        let period = Duration::from_millis(self.config.alarm.heartbeat_period_ms);

        info!(
            "Connecting to store at {}:{}",
            self.config.mqtt.broker_host, self.config.mqtt.broker_port
        );

        let store = StoreClient::new(&self.config.mqtt);
        let publisher = store.client();

        let (msg_tx, mut msg_rx) = mpsc::channel::<StoreMessage>(64);
        let (connected_tx, connected_rx) = oneshot::channel();
        let store_task = tokio::spawn(store.run(msg_tx, Some(connected_tx)));

        // Wait for the broker handshake before subscribing
        match tokio::time::timeout(Duration::from_secs(10), connected_rx).await {
            Ok(Ok(())) => {
                info!("Store connection established, subscribing to topics");
            }
            Ok(Err(_)) => {
                warn!("Store connection signal channel dropped");
                self.presenter.flash("store connection failed");
                return;
            }
            Err(_) => {
                warn!("Store connection timeout after 10 seconds");
                self.presenter.flash("store connection failed");
                store_task.abort();
                return;
            }
        }

        for filter in topics.subscribe_filters() {
            subscribe(&publisher, &filter).await;
        }

        let mut mode = self.prefs.notify_mode();
        info!("Notification mode: {}", mode);
        for &channel in mode.channels() {
            subscribe(&publisher, &topics.notify(channel)).await;
        }

        let mut reconciler = Reconciler::new(
            self.presenter.clone(),
            self.config.alarm.device_label.clone(),
        );
        reconciler.begin();

        // First tick fires one period from now, like the original schedule
        let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!("Monitor running (watchdog period {:?})", period);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    reconciler.on_tick();
                }
                Some(msg) = msg_rx.recv() => {
                    match topics.parse(&msg.topic, &msg.payload) {
                        Some(event) => {
                            Self::handle_event(&mut reconciler, &self.presenter, event);
                        }
                        None => {
                            debug!("Ignoring message on unexpected topic {}", msg.topic);
                        }
                    }
                }
                cmd = cmd_rx.recv() => {
                    match cmd {
                        Some(Command::ToggleDisabled) => {
                            let next = reconciler.toggle_disabled();
                            publish(&publisher, &topics.disabled(), &next.to_string()).await;
                        }
                        Some(Command::SetLocalSiren(enabled)) => {
                            publish(&publisher, &topics.local_siren(), &enabled.to_string()).await;
                        }
                        Some(Command::SetNotifyMode(new_mode)) => {
                            if new_mode != mode {
                                self.switch_notify_mode(&publisher, &topics, mode, new_mode).await;
                                mode = new_mode;
                            }
                        }
                        Some(Command::Shutdown) | None => {
                            info!("Monitor shutting down");
                            break;
                        }
                    }
                }
            }
        }

        store_task.abort();
        info!("Monitor stopped");
    }

    fn handle_event(reconciler: &mut Reconciler, presenter: &Arc<dyn Presenter>, event: StoreEvent) {
        match event {
            StoreEvent::DoorOpen(value) => reconciler.on_door_state(&value),
            StoreEvent::Heartbeat(value) => reconciler.on_heartbeat(&value),
            StoreEvent::LocalSiren(value) => reconciler.on_local_siren(&value),
            StoreEvent::Disabled(value) => reconciler.on_disabled(&value),
            StoreEvent::DoorOpenLong(value) => reconciler.on_door_open_long(&value),
            StoreEvent::DoorOpenLongTime(value) => {
                debug!("Long-open threshold is now {:?}", value);
            }
            StoreEvent::HistoryUpsert { key, value } => reconciler.on_history_upsert(&key, &value),
            StoreEvent::HistoryRemoved { key } => reconciler.on_history_removed(&key),
            StoreEvent::Notification { channel, payload } => {
                match serde_json::from_str::<NotificationMessage>(&payload) {
                    Ok(msg) => {
                        let tone = msg.tone(&channel);
                        presenter.notify(&msg.title, &msg.body, tone);
                    }
                    Err(e) => {
                        warn!("Failed to parse notification on {}: {}", channel, e);
                    }
                }
            }
        }
    }

    async fn switch_notify_mode(
        &mut self,
        publisher: &AsyncClient,
        topics: &Topics,
        old: NotifyMode,
        new: NotifyMode,
    ) {
        info!("Switching notification mode: {} -> {}", old, new);

        for &channel in old.channels() {
            if !new.channels().contains(&channel) {
                let topic = topics.notify(channel);
                if let Err(e) = publisher.unsubscribe(&topic).await {
                    warn!("Failed to unsubscribe from {}: {:?}", topic, e);
                }
            }
        }
        for &channel in new.channels() {
            if !old.channels().contains(&channel) {
                subscribe(publisher, &topics.notify(channel)).await;
            }
        }

        self.prefs.set_notify_mode(new);
        if let Some(path) = &self.prefs_path {
            if let Err(e) = self.prefs.save(path) {
                warn!("Failed to persist preferences: {}", e);
            }
        }
    }
}

async fn subscribe(client: &AsyncClient, filter: &str) {
    info!("Subscribing to {}", filter);
    if let Err(e) = try_subscribe(client, filter).await {
        warn!("Failed to subscribe to {}: {}", filter, e);
    }
}

async fn try_subscribe(client: &AsyncClient, filter: &str) -> crate::error::Result<()> {
    client.subscribe(filter, QoS::AtLeastOnce).await?;
    Ok(())
}

/// Retained fire-and-forget write; errors are logged, never surfaced.
async fn publish(client: &AsyncClient, topic: &str, payload: &str) {
    debug!("Writing {} = {}", topic, payload);
    if let Err(e) = try_publish(client, topic, payload).await {
        warn!("Failed to write {}: {}", topic, e);
    }
}

async fn try_publish(client: &AsyncClient, topic: &str, payload: &str) -> crate::error::Result<()> {
    client
        .publish(topic, QoS::AtLeastOnce, true, payload.as_bytes())
        .await?;
    Ok(())
}
