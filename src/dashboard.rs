//! Owner of the dashboard's mutable state: monitoring flag, live location,
//! battery level and the notification banner. Background work started here
//! (location watch, battery timer, banner dismissal) is tied to cancellation
//! tokens derived from the dashboard's shutdown token.

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::device::{Coordinates, Device};
use crate::status::{Battery, HelmetStatus, CONNECTED};

pub const NOTIFICATION_TTL: Duration = Duration::from_secs(5);

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Notification {
    pub id: u64,
    pub message: String,
    pub shown_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct DashboardState {
    monitoring: bool,
    location: Option<Coordinates>,
    battery: Battery,
    notification: Option<Notification>,
}

pub struct Dashboard {
    state: RwLock<DashboardState>,
    device: Arc<dyn Device>,
    notification_ttl: Duration,
    next_notification: AtomicU64,
    location_watch: Mutex<Option<CancellationToken>>,
    shutdown: CancellationToken,
}

impl Dashboard {
    pub fn new(device: Arc<dyn Device>, notification_ttl: Duration) -> Arc<Self> {
        Arc::new(Self {
            state: RwLock::new(DashboardState::default()),
            device,
            notification_ttl,
            next_notification: AtomicU64::new(1),
            location_watch: Mutex::new(None),
            shutdown: CancellationToken::new(),
        })
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Stops every task this dashboard spawned.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    pub async fn is_monitoring(&self) -> bool {
        self.state.read().await.monitoring
    }

    /// The accident trigger is only live while monitoring.
    pub async fn trigger_enabled(&self) -> bool {
        self.is_monitoring().await
    }

    pub async fn location(&self) -> Option<Coordinates> {
        self.state.read().await.location
    }

    pub async fn notification(&self) -> Option<Notification> {
        self.state.read().await.notification.clone()
    }

    pub async fn battery_level(&self) -> f64 {
        self.state.read().await.battery.level()
    }

    pub async fn status(&self) -> HelmetStatus {
        let state = self.state.read().await;
        HelmetStatus {
            connected: CONNECTED,
            battery_level: state.battery.level(),
            battery_percent: state.battery.level().round() as u8,
            battery_band: state.battery.band(),
            monitoring: state.monitoring,
            location: state.location,
            location_denied: self.device.location_denied(),
            trigger_enabled: state.monitoring,
        }
    }

    pub async fn set_monitoring(self: &Arc<Self>, enabled: bool) {
        if enabled {
            self.start_monitoring().await
        } else {
            self.stop_monitoring().await
        }
    }

    /// Turns monitoring on and starts following the device position, if it can be watched.
    pub async fn start_monitoring(self: &Arc<Self>) {
        let mut watch_slot = self.location_watch.lock().await;
        {
            let mut state = self.state.write().await;
            if state.monitoring {
                return;
            }
            state.monitoring = true;
        }
        info!("Monitoring started");

        let Some(mut positions) = self.device.watch_position() else {
            debug!("Position watch unavailable, live location disabled");
            return;
        };

        let token = self.shutdown.child_token();
        *watch_slot = Some(token.clone());

        let initial = *positions.borrow_and_update();
        if let Some(position) = initial {
            self.record_position(position).await;
        }

        let dashboard = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    changed = positions.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let position = *positions.borrow_and_update();
                        if let Some(position) = position {
                            dashboard.record_position(position).await;
                        }
                    }
                }
            }
            debug!("Position watch released");
        });
    }

    /// Turns monitoring off, cancels the position watch and forgets the live location.
    pub async fn stop_monitoring(&self) {
        let mut watch_slot = self.location_watch.lock().await;
        if let Some(token) = watch_slot.take() {
            token.cancel();
        }

        let mut state = self.state.write().await;
        if state.monitoring {
            info!("Monitoring stopped");
        }
        state.monitoring = false;
        state.location = None;
    }

    /// Position updates only count while monitoring.
    pub async fn record_position(&self, position: Coordinates) {
        let mut state = self.state.write().await;
        if state.monitoring {
            state.location = Some(position);
        }
    }

    /// Shows `message` in the banner and dismisses it after the configured TTL.
    /// A newer banner is never dismissed by an older timer.
    pub async fn notify(self: &Arc<Self>, message: String) -> u64 {
        let id = self.next_notification.fetch_add(1, Ordering::Relaxed);
        self.state.write().await.notification = Some(Notification {
            id,
            message,
            shown_at: Utc::now(),
        });

        let dashboard = Arc::clone(self);
        let ttl = self.notification_ttl;
        let token = self.shutdown.child_token();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(ttl) => dashboard.dismiss(id).await,
            }
        });

        id
    }

    pub async fn dismiss(&self, id: u64) {
        let mut state = self.state.write().await;
        if state.notification.as_ref().map(|n| n.id) == Some(id) {
            state.notification = None;
        }
    }

    pub async fn decay_battery(&self) -> f64 {
        let mut state = self.state.write().await;
        let level = state.battery.decay_random(&mut rand::rng());
        metrics::gauge!("helmet_battery_level").set(level);
        level
    }

    /// Drains the battery once per `interval` until shutdown.
    pub fn spawn_battery_decay(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let dashboard = Arc::clone(self);
        let token = self.shutdown.child_token();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        let level = dashboard.decay_battery().await;
                        debug!(battery_level = level, "Battery decayed");
                    }
                }
            }
        })
    }
}
