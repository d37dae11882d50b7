use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::contacts::ContactManager;
use crate::dashboard::Dashboard;
use crate::device::BrowserDevice;
use crate::history::{AlertHistory, AlertHistoryView, DEFAULT_HISTORY_LIMIT};
use crate::store::{AlertStore, ChangeEvent, DbStore};
use crate::workflow::AlertWorkflow;

/// Everything the HTTP handlers share, wired to one store and one device.
#[derive(Clone)]
pub struct AppState {
    pub contacts: Arc<ContactManager>,
    pub workflow: Arc<AlertWorkflow>,
    pub history: Arc<AlertHistory>,
    pub history_view: Arc<AlertHistoryView>,
    pub dashboard: Arc<Dashboard>,
    pub device: Arc<BrowserDevice>,
    alerts: Arc<dyn AlertStore>,
}

impl AppState {
    pub fn new(store: DbStore, notification_ttl: Duration) -> Self {
        let store = Arc::new(store);
        let device = Arc::new(BrowserDevice::new());
        let dashboard = Dashboard::new(device.clone(), notification_ttl);

        Self {
            contacts: Arc::new(ContactManager::new(store.clone())),
            workflow: Arc::new(AlertWorkflow::new(
                store.clone(),
                store.clone(),
                device.clone(),
                dashboard.clone(),
            )),
            history: Arc::new(AlertHistory::new(store.clone())),
            history_view: AlertHistoryView::new(store.clone(), DEFAULT_HISTORY_LIMIT),
            dashboard,
            device,
            alerts: store,
        }
    }

    pub fn subscribe_alert_changes(&self) -> broadcast::Receiver<ChangeEvent> {
        self.alerts.subscribe()
    }

    /// Starts the battery timer and the live alert history. Both stop on
    /// [`Dashboard::shutdown`].
    pub fn start_background_tasks(&self, battery_decay_interval: Duration) -> Vec<JoinHandle<()>> {
        vec![
            self.dashboard.spawn_battery_decay(battery_decay_interval),
            self.history_view
                .spawn(self.dashboard.shutdown_token().child_token()),
        ]
    }
}
