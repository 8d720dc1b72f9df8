//! Liveness watchdog and state reconciler.
//!
//! Owns every piece of mutable alarm state on the client and exposes one
//! entry point per store event plus the watchdog tick. All calls happen on
//! the monitor's single select loop, so no field needs locking. Display
//! effects go through the [`Presenter`]; remote writes are returned to the
//! caller (write-through-then-listen: local state only changes when the
//! store echoes the write back).

use crate::monitor::history::HistoryView;
use crate::presenter::{DoorChime, Presenter};
use log::{debug, warn};
use std::sync::Arc;

/// Consecutive missed watchdog periods before the sensor counts as dead.
pub const MISS_THRESHOLD: u32 = 2;

pub struct Reconciler {
    presenter: Arc<dyn Presenter>,
    device_label: String,

    /// Unknown until the first parseable door update arrives.
    door_open: Option<bool>,
    /// Ticks since the last heartbeat. Reset to 0 on every heartbeat.
    missed_ticks: u32,
    /// Whether any heartbeat has been seen since start.
    heartbeat_seen: bool,
    disabled: bool,
    local_siren: bool,
    door_open_long: bool,
    history: HistoryView,
}

impl Reconciler {
    pub fn new(presenter: Arc<dyn Presenter>, device_label: impl Into<String>) -> Self {
        Self {
            presenter,
            device_label: device_label.into(),
            door_open: None,
            missed_ticks: 0,
            heartbeat_seen: false,
            disabled: false,
            local_siren: false,
            door_open_long: false,
            history: HistoryView::new(),
        }
    }

    /// Show the initial "waiting" status. Called once when the monitor starts.
    pub fn begin(&self) {
        self.presenter
            .status(&format!("waiting for {}...", self.device_label));
    }

    /// Watchdog tick, every heartbeat period.
    ///
    /// Two consecutive periods without a heartbeat flip the link indicator
    /// red and raise the inactive status. The indicator is re-raised on every
    /// further silent tick; the watchdog never stops itself.
    pub fn on_tick(&mut self) {
        self.missed_ticks = self.missed_ticks.saturating_add(1);

        if self.missed_ticks >= MISS_THRESHOLD {
            self.presenter.link_up(false);
            self.presenter
                .status(&format!("{} inactive", self.device_label));
        }
    }

    /// Heartbeat republished by the sensor board. The value itself carries no
    /// information; only the arrival matters.
    pub fn on_heartbeat(&mut self, _value: &str) {
        self.missed_ticks = 0;

        if !self.heartbeat_seen {
            // First observation after start: no status flip yet.
            self.heartbeat_seen = true;
            return;
        }

        self.presenter.link_up(true);
        // Reachability and the disabled flag share one status line. The
        // wording conflates "reachable" with "enabled" on purpose.
        let status = if self.disabled {
            format!("{} inactive", self.device_label)
        } else {
            format!("{} active", self.device_label)
        };
        self.presenter.status(&status);
    }

    /// `door_open` changed, including the initial retained snapshot.
    ///
    /// The first parseable value establishes the known state silently; every
    /// later one also selects the open or close chime.
    pub fn on_door_state(&mut self, value: &str) {
        let Some(open) = parse_bool_strict(value) else {
            warn!("Ignoring unparseable door state: {:?}", value);
            return;
        };

        let chime = if self.door_open.is_some() {
            Some(if open { DoorChime::Open } else { DoorChime::Close })
        } else {
            None
        };
        self.door_open = Some(open);
        self.presenter.door_moved(open, chime);
    }

    /// `disabled` changed. Affects only status wording, never the watchdog.
    pub fn on_disabled(&mut self, value: &str) {
        self.disabled = value.trim() == "true";
        debug!("Disabled flag is now {}", self.disabled);
    }

    /// `local_siren` changed, here or on another client.
    pub fn on_local_siren(&mut self, value: &str) {
        self.local_siren = value.trim() == "true";
        self.presenter.siren_setting(self.local_siren);
    }

    /// `door_open_long` changed. The audible warning itself arrives through
    /// the notify channels; the flag is only mirrored.
    pub fn on_door_open_long(&mut self, value: &str) {
        self.door_open_long = value.trim() == "true";
        debug!("Door-open-long flag is now {}", self.door_open_long);
    }

    /// History child added or changed; both funnel into one keyed upsert.
    pub fn on_history_upsert(&mut self, key: &str, value: &str) {
        if self.history.upsert(key, value) {
            self.presenter.history_updated(&self.history.lines());
        }
    }

    /// History child removed. Unknown keys are a no-op.
    pub fn on_history_removed(&mut self, key: &str) {
        if self.history.remove(key) {
            self.presenter.history_updated(&self.history.lines());
        }
    }

    /// User toggled the disabled flag. Returns the value to write to the
    /// store; local state is left alone until the echo comes back through
    /// [`Self::on_disabled`].
    pub fn toggle_disabled(&self) -> bool {
        let next = !self.disabled;
        self.presenter.flash(if next {
            "system disabled"
        } else {
            "system enabled"
        });
        next
    }

    /// Derived liveness: dead until the first heartbeat, and whenever two or
    /// more periods have passed without one.
    pub fn is_alive(&self) -> bool {
        self.heartbeat_seen && self.missed_ticks < MISS_THRESHOLD
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    pub fn door_open(&self) -> Option<bool> {
        self.door_open
    }

    pub fn local_siren(&self) -> bool {
        self.local_siren
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }
}

/// Strict boolean parse: exactly "true" or "false", anything else is `None`.
fn parse_bool_strict(value: &str) -> Option<bool> {
    match value.trim() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    enum Ui {
        Link(bool),
        Status(String),
        Door(bool, Option<DoorChime>),
        Siren(bool),
        History(Vec<String>),
        Notify(String),
        Flash(String),
    }

    #[derive(Default)]
    struct RecordingPresenter {
        events: Mutex<Vec<Ui>>,
    }

    impl RecordingPresenter {
        fn take(&self) -> Vec<Ui> {
            std::mem::take(&mut *self.events.lock())
        }
    }

    impl Presenter for RecordingPresenter {
        fn link_up(&self, up: bool) {
            self.events.lock().push(Ui::Link(up));
        }
        fn status(&self, text: &str) {
            self.events.lock().push(Ui::Status(text.to_string()));
        }
        fn door_moved(&self, open: bool, chime: Option<DoorChime>) {
            self.events.lock().push(Ui::Door(open, chime));
        }
        fn siren_setting(&self, enabled: bool) {
            self.events.lock().push(Ui::Siren(enabled));
        }
        fn history_updated(&self, lines: &[String]) {
            self.events.lock().push(Ui::History(lines.to_vec()));
        }
        fn notify(&self, title: &str, body: &str, _tone: crate::notify::AlertTone) {
            self.events.lock().push(Ui::Notify(format!("{}: {}", title, body)));
        }
        fn flash(&self, text: &str) {
            self.events.lock().push(Ui::Flash(text.to_string()));
        }
    }

    fn reconciler() -> (Arc<RecordingPresenter>, Reconciler) {
        let presenter = Arc::new(RecordingPresenter::default());
        let r = Reconciler::new(presenter.clone(), "door sensor");
        (presenter, r)
    }

    #[test]
    fn heartbeats_within_the_period_keep_the_sensor_alive() {
        let (_p, mut r) = reconciler();
        assert!(!r.is_alive());

        r.on_heartbeat("ON");
        assert!(r.is_alive());

        for _ in 0..10 {
            r.on_tick();
            assert!(r.is_alive());
            r.on_heartbeat("OFF");
            assert!(r.is_alive());
        }
    }

    #[test]
    fn two_silent_ticks_flip_to_dead_until_the_next_heartbeat() {
        let (p, mut r) = reconciler();
        r.on_heartbeat("ON");
        r.on_heartbeat("OFF");
        p.take();

        r.on_tick();
        assert!(r.is_alive());
        assert!(p.take().is_empty());

        r.on_tick();
        assert!(!r.is_alive());
        assert_eq!(
            p.take(),
            vec![
                Ui::Link(false),
                Ui::Status("door sensor inactive".to_string())
            ]
        );

        // Stays dead on further silent ticks
        r.on_tick();
        assert!(!r.is_alive());

        r.on_heartbeat("ON");
        assert!(r.is_alive());
    }

    #[test]
    fn watchdog_trace_matches_the_five_second_schedule() {
        // t=0 first heartbeat, ticks at t=5000 and t=10000, heartbeat at t=11000
        let (p, mut r) = reconciler();

        r.on_heartbeat("ON");
        assert!(r.is_alive());
        assert!(p.take().is_empty(), "first heartbeat must not flip status");

        r.on_tick();
        assert!(r.is_alive());

        r.on_tick();
        assert!(!r.is_alive());

        r.on_heartbeat("OFF");
        assert!(r.is_alive());
        assert_eq!(
            p.take(),
            vec![
                Ui::Link(false),
                Ui::Status("door sensor inactive".to_string()),
                Ui::Link(true),
                Ui::Status("door sensor active".to_string()),
            ]
        );
    }

    #[test]
    fn heartbeat_status_wording_follows_the_disabled_flag() {
        let (p, mut r) = reconciler();
        r.on_heartbeat("ON");
        r.on_heartbeat("OFF");
        assert_eq!(
            p.take(),
            vec![Ui::Link(true), Ui::Status("door sensor active".to_string())]
        );

        r.on_disabled("true");
        r.on_heartbeat("ON");
        assert_eq!(
            p.take(),
            vec![
                Ui::Link(true),
                Ui::Status("door sensor inactive".to_string())
            ]
        );
    }

    #[test]
    fn first_door_observation_is_silent_and_later_ones_chime() {
        let (p, mut r) = reconciler();

        r.on_door_state("true");
        assert_eq!(p.take(), vec![Ui::Door(true, None)]);

        r.on_door_state("false");
        assert_eq!(p.take(), vec![Ui::Door(false, Some(DoorChime::Close))]);

        r.on_door_state("true");
        assert_eq!(p.take(), vec![Ui::Door(true, Some(DoorChime::Open))]);
    }

    #[test]
    fn unparseable_door_values_do_not_consume_the_first_observation() {
        let (p, mut r) = reconciler();

        r.on_door_state("maybe");
        assert!(p.take().is_empty());
        assert_eq!(r.door_open(), None);

        // The next valid value is still the silent initial one
        r.on_door_state("false");
        assert_eq!(p.take(), vec![Ui::Door(false, None)]);
    }

    #[test]
    fn toggle_disabled_returns_the_negation_without_local_mutation() {
        let (p, mut r) = reconciler();

        assert!(r.toggle_disabled());
        assert!(!r.is_disabled());
        assert_eq!(p.take(), vec![Ui::Flash("system disabled".to_string())]);

        // Echo arrives from the store, then the toggle flips the other way
        r.on_disabled("true");
        assert!(r.is_disabled());
        assert!(!r.toggle_disabled());
        assert_eq!(p.take(), vec![Ui::Flash("system enabled".to_string())]);
    }

    #[test]
    fn non_true_disabled_values_mean_enabled() {
        let (_p, mut r) = reconciler();
        r.on_disabled("true");
        assert!(r.is_disabled());
        r.on_disabled("no");
        assert!(!r.is_disabled());
    }

    #[test]
    fn history_events_funnel_through_the_keyed_view() {
        let (p, mut r) = reconciler();

        r.on_history_upsert("k1", "1590000000000");
        r.on_history_upsert("k2", "1590000005000");
        let events = p.take();
        assert_eq!(events.len(), 2);
        if let Ui::History(lines) = &events[1] {
            assert_eq!(lines.len(), 2);
        } else {
            panic!("expected history update, got {:?}", events[1]);
        }

        // Same (key, value) again: idempotent, no refresh
        r.on_history_upsert("k2", "1590000005000");
        assert!(p.take().is_empty());
        assert_eq!(r.history_len(), 2);

        // Removing an absent key stays quiet
        r.on_history_removed("k3");
        assert!(p.take().is_empty());

        r.on_history_removed("k1");
        assert_eq!(r.history_len(), 1);
        assert_eq!(p.take().len(), 1);
    }

    #[test]
    fn siren_setting_is_mirrored_to_the_presenter() {
        let (p, mut r) = reconciler();
        r.on_local_siren("true");
        assert!(r.local_siren());
        r.on_local_siren("false");
        assert_eq!(p.take(), vec![Ui::Siren(true), Ui::Siren(false)]);
    }
}
