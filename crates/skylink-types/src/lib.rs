use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Named vehicle-state notifications published by the remote link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    /// A fresh attitude sample is available in the state store.
    AttitudeUpdated,
    /// A fresh speed sample is available in the state store.
    SpeedUpdated,
    /// The link (re)established a session with the vehicle.
    LinkConnected,
    /// The link lost its session with the vehicle.
    LinkDisconnected,
    /// Battery telemetry changed. Not consumed by the telemetry core.
    BatteryUpdated,
}

/// Unified event wrapper for the vehicle event bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    /// e.g., "skylink-hal::sim"
    pub source: String,
    pub kind: EventKind,
}

impl Event {
    /// Stamp a new event of `kind` originating from `source`.
    pub fn new(source: impl Into<String>, kind: EventKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            source: source.into(),
            kind,
        }
    }
}

/// Vehicle orientation snapshot, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AttitudeSample {
    pub roll: f64,
    pub pitch: f64,
    pub yaw: f64,
}

/// Vehicle speed snapshot, in the base unit (m/s).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SpeedSample {
    pub ground_speed: f64,
    pub vertical_speed: f64,
}

/// How yaw is presented to the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeadingMode {
    /// Raw signed yaw as reported by the vehicle.
    #[default]
    Fpv,
    /// Yaw wrapped into `[0, 360)`.
    Compass,
}

impl HeadingMode {
    /// Map the boolean `pref_heading_mode` preference onto a mode.
    pub fn from_pref(compass: bool) -> Self {
        if compass { Self::Compass } else { Self::Fpv }
    }
}

/// Display unit family for speed readouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeedUnit {
    #[default]
    Metric,
    Imperial,
}

/// Optional features a link session may or may not support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeatureId {
    VideoStreaming,
}

/// Raw answer of a capability query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeatureSupport {
    Supported,
    Unsupported,
    /// The service failed to answer; carries the service error code.
    Error(i32),
    Timeout,
}

/// What the stream controller currently believes about streaming support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StreamCapability {
    Supported,
    Unsupported,
    /// A probe is pending or none has been issued yet.
    Unknown,
}

impl From<FeatureSupport> for StreamCapability {
    fn from(support: FeatureSupport) -> Self {
        match support {
            FeatureSupport::Supported => Self::Supported,
            // Failed queries degrade to "no video".
            FeatureSupport::Unsupported | FeatureSupport::Error(_) | FeatureSupport::Timeout => {
                Self::Unsupported
            }
        }
    }
}

/// Completion status of a transport command (stream start/stop).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandOutcome {
    Ok,
    Error(i32),
    Timeout,
}

impl CommandOutcome {
    /// Convert into a `Result`, classifying failures with the matching
    /// [`SkyError`] variant.
    pub fn into_stream_result(self) -> Result<(), SkyError> {
        match self {
            CommandOutcome::Ok => Ok(()),
            CommandOutcome::Error(code) => Err(SkyError::StreamStart { code }),
            CommandOutcome::Timeout => Err(SkyError::StreamTimeout),
        }
    }
}

/// Opaque identifier of a ready presentation surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SurfaceHandle(pub u64);

/// Link session state as seen by the telemetry core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connected,
}

/// Error type shared by the SkyLink crates.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SkyError {
    #[error("Channel Error: {0}")]
    Channel(String),

    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("Capability query failed with code {code}")]
    CapabilityQuery { code: i32 },

    #[error("Capability query timed out")]
    CapabilityTimeout,

    #[error("Video stream start failed with code {code}")]
    StreamStart { code: i32 },

    #[error("Video stream start timed out")]
    StreamTimeout,
}

impl FeatureSupport {
    /// The error this answer represents, if the query itself failed.
    pub fn as_error(&self) -> Option<SkyError> {
        match *self {
            FeatureSupport::Error(code) => Some(SkyError::CapabilityQuery { code }),
            FeatureSupport::Timeout => Some(SkyError::CapabilityTimeout),
            FeatureSupport::Supported | FeatureSupport::Unsupported => None,
        }
    }
}
