//! Door Alarm Monitor library.
//!
//! Client tier of a three-part home door alarm: a sensor board publishes door
//! state and a heartbeat to an MQTT-backed state store, a backend derives
//! history and push notifications, and this crate watches the store, decides
//! whether the sensor is alive and mirrors the alarm state for display.

pub mod config;
pub mod error;
pub mod monitor;
pub mod notify;
pub mod prefs;
pub mod presenter;
pub mod store;
