use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum MonitorError {
    #[error("MQTT request failed: {0}")]
    Store(#[from] rumqttc::ClientError),

    #[error("no platform config directory available for preferences")]
    NoConfigDir,

    #[error(transparent)]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    SerdeJsonError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, MonitorError>;
