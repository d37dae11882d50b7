//! Alert history: recent alerts, operator status decisions, and a live view that
//! re-queries whenever the alert table changes.

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use tokio::sync::broadcast::{
    self,
    error::{RecvError, TryRecvError},
};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::entities::{accident_alert, prelude::*};
use crate::error::{StatusError, StoreError};
use crate::store::{AlertStore, ChangeEvent};

pub const DEFAULT_HISTORY_LIMIT: u64 = 10;
pub const MAX_HISTORY_LIMIT: u64 = 100;

/// Outcome of [`AlertHistory::set_status`].
#[derive(Clone, Debug, PartialEq)]
pub enum StatusChange {
    Applied(accident_alert::Model),
    /// The alert had already left `Active`; nothing was written.
    Unchanged(accident_alert::Model),
}

pub struct AlertHistory {
    store: Arc<dyn AlertStore>,
}

impl AlertHistory {
    pub fn new(store: Arc<dyn AlertStore>) -> Self {
        Self { store }
    }

    pub async fn list_recent_alerts(
        &self,
        limit: u64,
    ) -> Result<Vec<accident_alert::Model>, StoreError> {
        self.store
            .list_recent_alerts(limit.clamp(1, MAX_HISTORY_LIMIT))
            .await
    }

    /// Moves an `Active` alert to `Resolved` (stamping `resolved_at`) or `False Alarm`.
    /// An applied change is reported from the row read before the write, so a
    /// failing read afterwards cannot turn a committed decision into an error.
    pub async fn set_status(
        &self,
        id: Uuid,
        status: AlertStatus,
    ) -> Result<StatusChange, StatusError> {
        if status == AlertStatus::Active {
            return Err(StatusError::InvalidTarget);
        }

        let alert = self
            .store
            .find_alert(id)
            .await?
            .ok_or(StatusError::NotFound(id))?;
        if alert.status != AlertStatus::Active {
            debug!("Alert {} already {}, ignoring {}", id, alert.status.as_str(), status.as_str());
            return Ok(StatusChange::Unchanged(alert));
        }

        let resolved_at =
            (status == AlertStatus::Resolved).then(|| chrono::Utc::now().naive_utc());
        let applied = self
            .store
            .transition_from_active(id, status, resolved_at)
            .await?;

        if !applied {
            // Another decision landed between the read and the write
            let current = self
                .store
                .find_alert(id)
                .await?
                .ok_or(StatusError::NotFound(id))?;
            debug!("Alert {} settled concurrently as {}", id, current.status.as_str());
            return Ok(StatusChange::Unchanged(current));
        }

        info!("Alert {} marked {}", id, status.as_str());
        metrics::counter!("helmet_alert_status_changes_total", "status" => status.as_str())
            .increment(1);
        metrics::gauge!("helmet_active_alerts").decrement(1.0);
        if let Some(resolved_at) = resolved_at {
            let seconds = (resolved_at - alert.created_at).num_milliseconds() as f64 / 1000.0;
            metrics::histogram!("helmet_alert_resolution_duration_seconds").record(seconds);
        }

        Ok(StatusChange::Applied(accident_alert::Model {
            status,
            resolved_at,
            ..alert
        }))
    }
}

/// Drains events already queued behind the one just received, so a burst of
/// changes costs a single re-fetch. Returns how many were dropped.
pub fn drain_pending(changes: &mut broadcast::Receiver<ChangeEvent>) -> usize {
    let mut drained = 0;
    loop {
        match changes.try_recv() {
            Ok(_) | Err(TryRecvError::Lagged(_)) => drained += 1,
            Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return drained,
        }
    }
}

/// The most recent alerts as last fetched. Consistency with the store is eventual.
pub struct AlertHistoryView {
    store: Arc<dyn AlertStore>,
    limit: u64,
    alerts: RwLock<Vec<accident_alert::Model>>,
    fetches: AtomicU64,
}

impl AlertHistoryView {
    pub fn new(store: Arc<dyn AlertStore>, limit: u64) -> Arc<Self> {
        Arc::new(Self {
            store,
            limit,
            alerts: RwLock::new(Vec::new()),
            fetches: AtomicU64::new(0),
        })
    }

    pub async fn snapshot(&self) -> Vec<accident_alert::Model> {
        self.alerts.read().await.clone()
    }

    /// Completed re-fetches so far.
    pub fn fetch_count(&self) -> u64 {
        self.fetches.load(Ordering::Relaxed)
    }

    /// Re-queries the store. On failure the previous contents stay.
    pub async fn refresh(&self) -> bool {
        match self.store.list_recent_alerts(self.limit).await {
            Ok(alerts) => {
                *self.alerts.write().await = alerts;
                self.fetches.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(e) => {
                warn!("Failed to refresh alert history: {}", e);
                false
            }
        }
    }

    /// Loads the view, then re-fetches after every change burst until `cancel` fires.
    /// The change subscription is dropped when the task ends.
    pub fn spawn(self: &Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        // Subscribe before the first fetch so no change slips between the two
        let mut changes = self.store.subscribe();
        let view = Arc::clone(self);

        tokio::spawn(async move {
            view.refresh().await;
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    event = changes.recv() => match event {
                        Ok(_) | Err(RecvError::Lagged(_)) => {
                            let coalesced = drain_pending(&mut changes);
                            debug!(coalesced, "Alert table changed, refreshing history");
                            view.refresh().await;
                        }
                        Err(RecvError::Closed) => break,
                    },
                }
            }
            debug!("Alert history subscription released");
        })
    }
}
