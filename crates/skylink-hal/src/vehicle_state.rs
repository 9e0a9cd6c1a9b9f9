//! Read access to the latest vehicle attributes.

use std::sync::{Arc, RwLock};

use skylink_types::{AttitudeSample, SpeedSample};

/// The remote state store the link keeps up to date.
///
/// Either attribute may be absent at any time (no fix yet, sensor dropout,
/// link just connected); callers must tolerate `None` on every call.
pub trait VehicleState: Send + Sync {
    fn attitude(&self) -> Option<AttitudeSample>;
    fn speed(&self) -> Option<SpeedSample>;
}

#[derive(Debug, Default)]
struct Snapshot {
    attitude: Option<AttitudeSample>,
    speed: Option<SpeedSample>,
}

/// Cloneable, lock-backed [`VehicleState`]. The link writes, the telemetry
/// core reads. Each write supersedes the previous sample.
#[derive(Debug, Clone, Default)]
pub struct SharedVehicleState {
    inner: Arc<RwLock<Snapshot>>,
}

impl SharedVehicleState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_attitude(&self, attitude: Option<AttitudeSample>) {
        if let Ok(mut snapshot) = self.inner.write() {
            snapshot.attitude = attitude;
        }
    }

    pub fn set_speed(&self, speed: Option<SpeedSample>) {
        if let Ok(mut snapshot) = self.inner.write() {
            snapshot.speed = speed;
        }
    }

    /// Forget every sample, as after a link loss.
    pub fn clear(&self) {
        if let Ok(mut snapshot) = self.inner.write() {
            *snapshot = Snapshot::default();
        }
    }
}

impl VehicleState for SharedVehicleState {
    // A poisoned lock reads as "no data".
    fn attitude(&self) -> Option<AttitudeSample> {
        self.inner.read().ok().and_then(|s| s.attitude)
    }

    fn speed(&self) -> Option<SpeedSample> {
        self.inner.read().ok().and_then(|s| s.speed)
    }
}
