use clap::Parser;
use door_alarm_monitor::config::{Config, load_dotenv};
use door_alarm_monitor::monitor::{Monitor, MonitorHandle};
use door_alarm_monitor::notify::NotifyMode;
use door_alarm_monitor::prefs::Preferences;
use door_alarm_monitor::presenter::LogPresenter;
use log::{error, info, warn};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;

/// Headless monitor client for an MQTT-backed home door alarm.
#[derive(Parser, Debug)]
#[command(name = "door-alarm-monitor", version)]
struct Cli {
    /// MQTT broker host (overrides MQTT_BROKER_HOST)
    #[arg(long)]
    broker_host: Option<String>,

    /// MQTT broker port (overrides MQTT_BROKER_PORT)
    #[arg(long)]
    broker_port: Option<u16>,

    /// Topic prefix of the alarm state store
    #[arg(long)]
    base_topic: Option<String>,

    /// Heartbeat watchdog period in milliseconds
    #[arg(long)]
    period_ms: Option<u64>,

    /// Preferences file path (defaults to the platform config dir)
    #[arg(long)]
    prefs: Option<PathBuf>,
}

fn init_logger() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();
}

#[tokio::main]
async fn main() {
    // Load .env file before anything else
    load_dotenv();
    init_logger();

    let cli = Cli::parse();

    let mut config = Config::from_env();
    if let Some(host) = cli.broker_host {
        config.mqtt.broker_host = host;
    }
    if let Some(port) = cli.broker_port {
        config.mqtt.broker_port = port;
    }
    if let Some(base) = cli.base_topic {
        config.alarm.base_topic = base;
    }
    if let Some(period) = cli.period_ms {
        config.alarm.heartbeat_period_ms = period;
    }

    info!("Starting Door Alarm Monitor");
    info!("  Broker: {}:{}", config.mqtt.broker_host, config.mqtt.broker_port);
    info!("  Base topic: {}", config.alarm.base_topic);
    info!("  Watchdog period: {} ms", config.alarm.heartbeat_period_ms);

    let prefs_path = match cli.prefs {
        Some(path) => Some(path),
        None => match Preferences::default_path() {
            Ok(path) => Some(path),
            Err(e) => {
                warn!("No preferences location: {}", e);
                None
            }
        },
    };

    let prefs = match &prefs_path {
        Some(path) => match Preferences::load(path) {
            Ok(p) => p,
            Err(e) => {
                warn!("Failed to load preferences, using defaults: {}", e);
                Preferences::default()
            }
        },
        None => Preferences::default(),
    };

    let presenter = Arc::new(LogPresenter::new());
    let monitor = Monitor::new(config, presenter, prefs, prefs_path);
    let (handle, task) = monitor.start();

    // Stdin stands in for the user gestures of a graphical frontend
    let stdin_task = tokio::spawn(command_loop(handle.clone()));

    info!("Door Alarm Monitor is running");
    info!("  Commands: d (toggle disabled), siren on|off, 0|1|2 (notify mode)");
    info!("  Press Ctrl+C to exit");

    match signal::ctrl_c().await {
        Ok(()) => {
            info!("Received shutdown signal");
        }
        Err(e) => {
            error!("Failed to listen for shutdown signal: {}", e);
        }
    }

    stdin_task.abort();
    handle.shutdown().await;
    if let Err(e) = task.await
        && !e.is_cancelled()
    {
        error!("Monitor task failed: {}", e);
    }

    info!("Door Alarm Monitor stopped");
}

/// Read user gestures from stdin and forward them to the monitor.
async fn command_loop(handle: MonitorHandle) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Ok(Some(line)) = lines.next_line().await {
        match line.trim() {
            "" => {}
            "d" | "disable" => handle.toggle_disabled().await,
            "siren on" => handle.set_local_siren(true).await,
            "siren off" => handle.set_local_siren(false).await,
            "0" | "1" | "2" => {
                let index = line.trim().parse::<u8>().unwrap_or(0);
                handle.set_notify_mode(NotifyMode::from_index(index)).await;
            }
            other => {
                info!(
                    "Unknown command {:?} (use: d, siren on, siren off, 0, 1, 2)",
                    other
                );
            }
        }
    }
}
