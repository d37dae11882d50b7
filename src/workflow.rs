//! Simulated accident detection.
//!
//! A trigger draws a random impact force, grades it, snapshots the current contact
//! list and persists one `Active` alert naming those contacts. Only a persisted
//! alert produces the banner and the haptic pulse.

use std::sync::Arc;

use rand::Rng;
use tracing::{debug, info, warn};

use crate::dashboard::Dashboard;
use crate::device::{Coordinates, Device, DEFAULT_COORDINATES, HAPTIC_PATTERN};
use crate::entities::{accident_alert, prelude::*};
use crate::error::WorkflowError;
use crate::store::{AlertStore, ContactStore, NewAlert};

pub const MIN_IMPACT_FORCE: f64 = 5.0;
pub const IMPACT_FORCE_SPAN: f64 = 10.0;
pub const MEDIUM_IMPACT_THRESHOLD: f64 = 8.0;
pub const HIGH_IMPACT_THRESHOLD: f64 = 12.0;

/// Uniform in `[5, 15)`.
pub fn sample_impact_force<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    rng.random::<f64>() * IMPACT_FORCE_SPAN + MIN_IMPACT_FORCE
}

impl Severity {
    /// Strictly-greater-than thresholds: 12.0 is Medium, 8.0 is Low.
    pub fn from_impact_force(force: f64) -> Self {
        if force > HIGH_IMPACT_THRESHOLD {
            Severity::High
        } else if force > MEDIUM_IMPACT_THRESHOLD {
            Severity::Medium
        } else {
            Severity::Low
        }
    }
}

pub fn notification_message(location: Coordinates, contacts_notified: usize) -> String {
    format!(
        "🚨 ACCIDENT DETECTED! Location: {:.4}, {:.4} | {} contacts notified",
        location.latitude, location.longitude, contacts_notified
    )
}

pub struct AlertWorkflow {
    contacts: Arc<dyn ContactStore>,
    alerts: Arc<dyn AlertStore>,
    device: Arc<dyn Device>,
    dashboard: Arc<Dashboard>,
}

impl AlertWorkflow {
    pub fn new(
        contacts: Arc<dyn ContactStore>,
        alerts: Arc<dyn AlertStore>,
        device: Arc<dyn Device>,
        dashboard: Arc<Dashboard>,
    ) -> Self {
        Self {
            contacts,
            alerts,
            device,
            dashboard,
        }
    }

    /// Runs one simulated accident with a freshly drawn impact force.
    pub async fn trigger_alert(
        &self,
        location: Option<Coordinates>,
    ) -> Result<accident_alert::Model, WorkflowError> {
        let impact_force = {
            let mut rng = rand::rng();
            sample_impact_force(&mut rng)
        };
        self.trigger_with_force(location, impact_force).await
    }

    pub async fn trigger_with_force(
        &self,
        location: Option<Coordinates>,
        impact_force: f64,
    ) -> Result<accident_alert::Model, WorkflowError> {
        if !self.dashboard.trigger_enabled().await {
            return Err(WorkflowError::MonitoringOff);
        }

        let location = self.resolve_location(location).await;
        let severity = Severity::from_impact_force(impact_force);

        let contacts = self
            .contacts
            .list_contacts()
            .await
            .map_err(WorkflowError::ContactRead)?;
        let alerted_contacts: Vec<_> = contacts.iter().map(|c| c.id).collect();

        let alert = self
            .alerts
            .insert_alert(NewAlert {
                latitude: location.latitude,
                longitude: location.longitude,
                severity,
                impact_force,
                alerted_contacts,
            })
            .await
            .map_err(WorkflowError::AlertWrite)?;

        info!(
            alert_id = %alert.id,
            severity = severity.as_str(),
            impact_force,
            contacts = contacts.len(),
            "Accident alert raised"
        );
        metrics::counter!("helmet_accident_alerts_total", "severity" => severity.as_str())
            .increment(1);
        metrics::gauge!("helmet_alerts_total").increment(1.0);
        metrics::gauge!("helmet_active_alerts").increment(1.0);

        self.dashboard
            .notify(notification_message(location, contacts.len()))
            .await;

        if !self.device.vibrate(&HAPTIC_PATTERN) {
            debug!("No haptic device, skipping vibration");
        }

        Ok(alert)
    }

    /// Explicit location, then the live watched one, then a fresh fix, then the default.
    pub async fn resolve_location(&self, location: Option<Coordinates>) -> Coordinates {
        if let Some(location) = location {
            return location;
        }
        if let Some(location) = self.dashboard.location().await {
            return location;
        }
        match self.device.current_position().await {
            Ok(position) => position,
            Err(e) => {
                warn!("Falling back to default coordinates: {}", e);
                DEFAULT_COORDINATES
            }
        }
    }
}
