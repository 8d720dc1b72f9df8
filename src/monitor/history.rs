//! Ordered view of door-opening history entries.

use chrono::{Local, TimeZone};
use log::{debug, warn};

const DATE_FORMAT: &str = "%d/%m/%y  -  %H:%M:%S";

#[derive(Debug, Clone)]
struct HistoryEntry {
    key: String,
    timestamp_ms: i64,
    line: String,
}

/// Keyed, most-recent-first list of formatted history lines.
///
/// Keys are the stable child identifiers assigned by the store; they carry no
/// ordering of their own, so new entries go to the front regardless of arrival
/// order and upserts for a known key replace in place.
#[derive(Debug, Default)]
pub struct HistoryView {
    entries: Vec<HistoryEntry>,
}

impl HistoryView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or update the entry for `key`.
    ///
    /// `raw` must be a non-negative epoch-milliseconds timestamp; anything
    /// else is discarded without touching the view (the backend writes a
    /// placeholder before its timestamping function runs). Returns whether
    /// the view changed.
    pub fn upsert(&mut self, key: &str, raw: &str) -> bool {
        let Ok(timestamp_ms) = raw.trim().parse::<i64>() else {
            debug!("Discarding non-numeric history value for {}: {:?}", key, raw);
            return false;
        };
        if timestamp_ms < 0 {
            debug!("Discarding negative history timestamp for {}", key);
            return false;
        }

        let Some(line) = format_epoch_ms(timestamp_ms) else {
            warn!("History timestamp out of range for {}: {}", key, timestamp_ms);
            return false;
        };

        if let Some(existing) = self.entries.iter_mut().find(|e| e.key == key) {
            if existing.timestamp_ms == timestamp_ms {
                return false;
            }
            existing.timestamp_ms = timestamp_ms;
            existing.line = line;
            return true;
        }

        self.entries.insert(
            0,
            HistoryEntry {
                key: key.to_string(),
                timestamp_ms,
                line,
            },
        );
        true
    }

    /// Remove the entry for `key`. Unknown keys are a no-op.
    pub fn remove(&mut self, key: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.key != key);
        self.entries.len() != before
    }

    /// Formatted lines, most recent first.
    pub fn lines(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.line.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Format epoch milliseconds as local date/time, `dd/MM/yy  -  HH:mm:ss`.
fn format_epoch_ms(timestamp_ms: i64) -> Option<String> {
    let dt = Local.timestamp_millis_opt(timestamp_ms).single()?;
    Some(dt.format(DATE_FORMAT).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newer_entries_appear_first() {
        let mut view = HistoryView::new();
        assert!(view.upsert("k1", "1590000000000"));
        assert!(view.upsert("k2", "1590000005000"));

        let lines = view.lines();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], format_epoch_ms(1_590_000_005_000).unwrap());
        assert_eq!(lines[1], format_epoch_ms(1_590_000_000_000).unwrap());
    }

    #[test]
    fn repeated_upsert_keeps_one_entry_per_key() {
        let mut view = HistoryView::new();
        assert!(view.upsert("k1", "1590000000000"));
        assert!(!view.upsert("k1", "1590000000000"));
        assert_eq!(view.len(), 1);

        // A changed value still yields exactly one entry
        assert!(view.upsert("k1", "1590000009000"));
        assert_eq!(view.len(), 1);
        assert_eq!(view.lines()[0], format_epoch_ms(1_590_000_009_000).unwrap());
    }

    #[test]
    fn non_numeric_values_are_discarded() {
        let mut view = HistoryView::new();
        assert!(!view.upsert("k1", "pending"));
        assert!(!view.upsert("k2", ""));
        assert!(!view.upsert("k3", "-5"));
        assert!(view.is_empty());
    }

    #[test]
    fn removing_unknown_key_is_a_no_op() {
        let mut view = HistoryView::new();
        view.upsert("k1", "1590000000000");
        assert!(!view.remove("missing"));
        assert_eq!(view.len(), 1);

        assert!(view.remove("k1"));
        assert!(view.is_empty());
        assert!(!view.remove("k1"));
    }
}
