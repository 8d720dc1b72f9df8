//! Topic layout and the typed event dispatcher.
//!
//! Translates raw `(topic, payload)` pairs from the store into one event per
//! subscription, so the monitor loop can route them without string matching
//! scattered through its handlers.

/// Typed change event from the alarm state store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    /// `door_open` changed (payload is the raw boolean text).
    DoorOpen(String),
    /// `door_heartbeat` republished by the sensor board.
    Heartbeat(String),
    /// `local_siren` setting changed (possibly by another client).
    LocalSiren(String),
    /// `disabled` flag changed.
    Disabled(String),
    /// `door_open_long` flag changed.
    DoorOpenLong(String),
    /// `door_open_long_time` threshold changed.
    DoorOpenLongTime(String),
    /// A history child was added or changed.
    HistoryUpsert { key: String, value: String },
    /// A history child's retained payload was cleared.
    HistoryRemoved { key: String },
    /// A rendered push notification arrived on a notify channel.
    Notification { channel: String, payload: String },
}

/// Topic construction for one alarm base path.
#[derive(Debug, Clone)]
pub struct Topics {
    base: String,
}

impl Topics {
    pub fn new(base: impl Into<String>) -> Self {
        Self { base: base.into() }
    }

    pub fn door_open(&self) -> String {
        format!("{}/door_open", self.base)
    }

    pub fn door_open_long(&self) -> String {
        format!("{}/door_open_long", self.base)
    }

    pub fn door_open_long_time(&self) -> String {
        format!("{}/door_open_long_time", self.base)
    }

    pub fn local_siren(&self) -> String {
        format!("{}/local_siren", self.base)
    }

    pub fn disabled(&self) -> String {
        format!("{}/disabled", self.base)
    }

    pub fn heartbeat(&self) -> String {
        format!("{}/door_heartbeat", self.base)
    }

    /// Wildcard filter covering every history child.
    pub fn history_filter(&self) -> String {
        format!("{}/history/+", self.base)
    }

    /// Topic carrying rendered notifications for one channel.
    pub fn notify(&self, channel: &str) -> String {
        format!("{}/notify/{}", self.base, channel)
    }

    /// All scalar topics plus the history filter, for initial subscription.
    pub fn subscribe_filters(&self) -> Vec<String> {
        vec![
            self.door_open(),
            self.door_open_long(),
            self.door_open_long_time(),
            self.local_siren(),
            self.disabled(),
            self.heartbeat(),
            self.history_filter(),
        ]
    }

    /// Map a raw store message onto a typed event.
    ///
    /// Returns `None` for topics outside the alarm base path.
    pub fn parse(&self, topic: &str, payload: &str) -> Option<StoreEvent> {
        let suffix = topic.strip_prefix(self.base.as_str())?.strip_prefix('/')?;

        if let Some(key) = suffix.strip_prefix("history/") {
            // A cleared retained payload is the store's removal signal.
            if payload.is_empty() {
                return Some(StoreEvent::HistoryRemoved {
                    key: key.to_string(),
                });
            }
            return Some(StoreEvent::HistoryUpsert {
                key: key.to_string(),
                value: payload.to_string(),
            });
        }

        if let Some(channel) = suffix.strip_prefix("notify/") {
            return Some(StoreEvent::Notification {
                channel: channel.to_string(),
                payload: payload.to_string(),
            });
        }

        match suffix {
            "door_open" => Some(StoreEvent::DoorOpen(payload.to_string())),
            "door_heartbeat" => Some(StoreEvent::Heartbeat(payload.to_string())),
            "local_siren" => Some(StoreEvent::LocalSiren(payload.to_string())),
            "disabled" => Some(StoreEvent::Disabled(payload.to_string())),
            "door_open_long" => Some(StoreEvent::DoorOpenLong(payload.to_string())),
            "door_open_long_time" => Some(StoreEvent::DoorOpenLongTime(payload.to_string())),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn topics() -> Topics {
        Topics::new("alarm")
    }

    #[test]
    fn scalar_topics_route_to_events() {
        let t = topics();
        assert_eq!(
            t.parse("alarm/door_open", "true"),
            Some(StoreEvent::DoorOpen("true".to_string()))
        );
        assert_eq!(
            t.parse("alarm/door_heartbeat", "ON"),
            Some(StoreEvent::Heartbeat("ON".to_string()))
        );
        assert_eq!(
            t.parse("alarm/disabled", "false"),
            Some(StoreEvent::Disabled("false".to_string()))
        );
        assert_eq!(
            t.parse("alarm/local_siren", "true"),
            Some(StoreEvent::LocalSiren("true".to_string()))
        );
        assert_eq!(
            t.parse("alarm/door_open_long", "true"),
            Some(StoreEvent::DoorOpenLong("true".to_string()))
        );
    }

    #[test]
    fn history_payload_upserts_and_empty_payload_removes() {
        let t = topics();
        assert_eq!(
            t.parse("alarm/history/-LGuXlb0GZfwbKs0Rf8Y", "1590000000000"),
            Some(StoreEvent::HistoryUpsert {
                key: "-LGuXlb0GZfwbKs0Rf8Y".to_string(),
                value: "1590000000000".to_string(),
            })
        );
        assert_eq!(
            t.parse("alarm/history/-LGuXlb0GZfwbKs0Rf8Y", ""),
            Some(StoreEvent::HistoryRemoved {
                key: "-LGuXlb0GZfwbKs0Rf8Y".to_string(),
            })
        );
    }

    #[test]
    fn notify_channel_is_preserved() {
        let t = topics();
        assert_eq!(
            t.parse("alarm/notify/door_long", "{}"),
            Some(StoreEvent::Notification {
                channel: "door_long".to_string(),
                payload: "{}".to_string(),
            })
        );
    }

    #[test]
    fn foreign_topics_are_rejected() {
        let t = topics();
        assert_eq!(t.parse("other/door_open", "true"), None);
        assert_eq!(t.parse("alarm/unknown_key", "x"), None);
        assert_eq!(t.parse("alarmx/door_open", "true"), None);
    }

    #[test]
    fn base_prefix_is_applied_to_filters() {
        let t = Topics::new("home/alarm");
        assert_eq!(t.door_open(), "home/alarm/door_open");
        assert_eq!(t.history_filter(), "home/alarm/history/+");
        assert_eq!(t.notify("siren"), "home/alarm/notify/siren");
        assert_eq!(t.subscribe_filters().len(), 7);
    }
}
