//! Remote alarm state store over MQTT.
//!
//! The sensor board and backend keep the alarm state as retained topics under
//! a common base path. Retained delivery gives the subscription contract the
//! monitor relies on: current value immediately on subscribe, then every change.

mod client;
mod topics;

pub use client::{StoreClient, StoreMessage};
pub use topics::{StoreEvent, Topics};
