//! Presentation boundary for the monitor.
//!
//! The reconciler never touches a screen or a speaker directly; it describes
//! what changed through this trait and the frontend decides how to show it.
//! The headless binary ships [`LogPresenter`], which renders everything as
//! log lines.

use crate::notify::AlertTone;
use parking_lot::Mutex;

/// Door movement chime selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoorChime {
    Open,
    Close,
}

/// Receives display effects from the reconciler.
pub trait Presenter: Send + Sync {
    /// Link indicator with the sensor board: green when up, red when down.
    fn link_up(&self, up: bool);

    /// One-line status text ("door sensor active", ...).
    fn status(&self, text: &str);

    /// Door state changed. `chime` is `None` on the initial observation,
    /// which must stay silent.
    fn door_moved(&self, open: bool, chime: Option<DoorChime>);

    /// Local siren setting, mirrored so all clients show the same value.
    fn siren_setting(&self, enabled: bool);

    /// History list changed; `lines` are formatted most-recent-first.
    fn history_updated(&self, lines: &[String]);

    /// Platform notification with a tone selection.
    fn notify(&self, title: &str, body: &str, tone: AlertTone);

    /// Short transient message after a user gesture.
    fn flash(&self, text: &str);
}

/// Presenter that renders everything through the `log` crate.
///
/// Repeated identical status/link updates are suppressed: the watchdog
/// re-raises the dead indicator every tick while the sensor stays silent,
/// and one log line per outage is enough.
#[derive(Default)]
pub struct LogPresenter {
    last: Mutex<PanelState>,
}

#[derive(Default)]
struct PanelState {
    link_up: Option<bool>,
    status: Option<String>,
}

impl LogPresenter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Presenter for LogPresenter {
    fn link_up(&self, up: bool) {
        let mut last = self.last.lock();
        if last.link_up == Some(up) {
            return;
        }
        last.link_up = Some(up);
        log::info!("[panel] link {}", if up { "green" } else { "red" });
    }

    fn status(&self, text: &str) {
        let mut last = self.last.lock();
        if last.status.as_deref() == Some(text) {
            return;
        }
        last.status = Some(text.to_string());
        log::info!("[panel] status: {}", text);
    }

    fn door_moved(&self, open: bool, chime: Option<DoorChime>) {
        log::info!(
            "[panel] door {}{}",
            if open { "opened" } else { "closed" },
            match chime {
                Some(DoorChime::Open) => " (open chime)",
                Some(DoorChime::Close) => " (close chime)",
                None => "",
            }
        );
    }

    fn siren_setting(&self, enabled: bool) {
        log::info!("[panel] local siren {}", if enabled { "on" } else { "off" });
    }

    fn history_updated(&self, lines: &[String]) {
        log::info!("[panel] history ({} entries)", lines.len());
        for line in lines {
            log::debug!("[panel]   {}", line);
        }
    }

    fn notify(&self, title: &str, body: &str, tone: AlertTone) {
        log::info!("[notify] {} - {} (tone: {})", title, body, tone);
    }

    fn flash(&self, text: &str) {
        log::info!("[panel] {}", text);
    }
}
