//! Device capabilities consumed by the dashboard: position fixes, a continuous
//! position watch, and haptic feedback. Each one may be missing and callers skip
//! the effect when it is.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::error::GeolocationError;

#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// Used when no position can be obtained (San Francisco).
pub const DEFAULT_COORDINATES: Coordinates = Coordinates::new(37.7749, -122.4194);

/// Vibrate, pause, vibrate (milliseconds).
pub const HAPTIC_PATTERN: [u32; 3] = [200, 100, 200];

/// Latest fix from a live position watch. Dropping the receiver cancels the watch.
pub type PositionWatch = watch::Receiver<Option<Coordinates>>;

#[async_trait]
pub trait Device: Send + Sync {
    async fn current_position(&self) -> Result<Coordinates, GeolocationError>;

    /// `None` when the device cannot watch its position. A watch stays open
    /// across permission changes and carries `None` while no fix is allowed.
    fn watch_position(&self) -> Option<PositionWatch>;

    /// The user refused location access. Devices without geolocation are not "denied".
    fn location_denied(&self) -> bool {
        false
    }

    /// Returns false when there is no haptic hardware to drive.
    fn vibrate(&self, pattern_ms: &[u32]) -> bool;
}

/// Position source fed by the browser's geolocation watch over HTTP.
///
/// The server has no way to buzz the user's handset, so `vibrate` always reports
/// the capability as absent.
pub struct BrowserDevice {
    positions: watch::Sender<Option<Coordinates>>,
    denied: AtomicBool,
}

impl BrowserDevice {
    pub fn new() -> Self {
        let (positions, _) = watch::channel(None);
        Self {
            positions,
            denied: AtomicBool::new(false),
        }
    }

    pub fn report_position(&self, position: Coordinates) {
        self.denied.store(false, Ordering::Relaxed);
        self.positions.send_replace(Some(position));
    }

    pub fn report_denied(&self) {
        self.denied.store(true, Ordering::Relaxed);
        self.positions.send_replace(None);
    }

    pub fn is_denied(&self) -> bool {
        self.denied.load(Ordering::Relaxed)
    }
}

impl Default for BrowserDevice {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Device for BrowserDevice {
    async fn current_position(&self) -> Result<Coordinates, GeolocationError> {
        if self.is_denied() {
            return Err(GeolocationError::Denied);
        }
        (*self.positions.borrow()).ok_or(GeolocationError::Unavailable)
    }

    fn watch_position(&self) -> Option<PositionWatch> {
        Some(self.positions.subscribe())
    }

    fn location_denied(&self) -> bool {
        self.is_denied()
    }

    fn vibrate(&self, _pattern_ms: &[u32]) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn position_unavailable_until_reported() {
        let device = BrowserDevice::new();
        assert_eq!(
            device.current_position().await,
            Err(GeolocationError::Unavailable)
        );

        device.report_position(Coordinates::new(51.5, -0.12));
        assert_eq!(
            device.current_position().await,
            Ok(Coordinates::new(51.5, -0.12))
        );
    }

    #[tokio::test]
    async fn denial_clears_the_watched_position() {
        let device = BrowserDevice::new();
        device.report_position(Coordinates::new(1.0, 2.0));
        let mut watch = device.watch_position().unwrap();
        device.report_denied();

        assert_eq!(device.current_position().await, Err(GeolocationError::Denied));
        assert!(device.location_denied());
        watch.changed().await.unwrap();
        assert_eq!(*watch.borrow_and_update(), None);
        assert!(!device.vibrate(&HAPTIC_PATTERN));

        device.report_position(Coordinates::new(3.0, 4.0));
        watch.changed().await.unwrap();
        assert_eq!(*watch.borrow(), Some(Coordinates::new(3.0, 4.0)));
        assert!(!device.location_denied());
    }

    #[tokio::test]
    async fn watch_sees_later_reports() {
        let device = BrowserDevice::new();
        let mut watch = device.watch_position().unwrap();

        device.report_position(Coordinates::new(3.0, 4.0));

        watch.changed().await.unwrap();
        assert_eq!(*watch.borrow(), Some(Coordinates::new(3.0, 4.0)));
    }
}
