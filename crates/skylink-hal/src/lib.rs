//! `skylink-hal` – collaborator boundaries of the telemetry core.
//!
//! Everything the core talks to but does not own lives behind a trait in
//! this crate: the vehicle state store, the capability service, the video
//! stream transport, the presentation surface, the readout display, the
//! speed unit formatter and the preference store.
//!
//! # Modules
//!
//! - [`vehicle_state`] – [`VehicleState`] and the lock-backed
//!   [`SharedVehicleState`] store.
//! - [`capability`] – [`CapabilityService`] feature-support queries.
//! - [`stream`] – [`StreamTransport`] start/stop commands.
//! - [`surface`] – [`VideoSurface`] visibility and readiness notifications,
//!   plus the [`HeadlessSurface`] used when no UI is attached.
//! - [`display`] – [`TelemetryDisplay`] readout sink.
//! - [`units`] – [`SpeedFormatter`] implementations.
//! - [`prefs`] – [`Preferences`] lookups.
//! - [`sim`] – [`SimLink`], an in-process vehicle link for demos and CI.

pub mod capability;
pub mod display;
pub mod prefs;
pub mod sim;
pub mod stream;
pub mod surface;
pub mod units;
pub mod vehicle_state;

pub use capability::{CapabilityService, FeatureCallback};
pub use display::{AttitudeReadout, SpeedReadout, TelemetryDisplay};
pub use prefs::{MemoryPreferences, PREF_HEADING_MODE, Preferences};
pub use sim::{SimLink, SimSettings};
pub use stream::{CommandCallback, StreamTransport};
pub use surface::{HeadlessSurface, SurfaceEvent, SurfaceListener, VideoSurface};
pub use units::{ImperialSpeed, MetricSpeed, SpeedFormatter, formatter_for};
pub use vehicle_state::{SharedVehicleState, VehicleState};
