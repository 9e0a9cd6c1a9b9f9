//! `skylink-runtime` – the telemetry core.
//!
//! Turns the vehicle event feed into attitude/speed readouts and decides
//! when the video feed may be shown.
//!
//! # Modules
//!
//! - [`coordinator`] – [`TelemetryCoordinator`][coordinator::TelemetryCoordinator]:
//!   the lifecycle coordinator and its single delivery loop. Activation
//!   subscribes to the bus, seeds the readouts and probes video support;
//!   deactivation stops the stream and unsubscribes.
//! - [`updater`] – [`TelemetryUpdater`][updater::TelemetryUpdater]:
//!   recomputes readouts from the latest samples, applying the heading mode.
//! - [`stream`] – [`StreamController`][stream::StreamController]:
//!   the capability-gated, epoch-guarded video stream state machine.
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]:
//!   initialises the global `tracing` subscriber with an optional OTLP span
//!   exporter.

pub mod coordinator;
pub mod stream;
pub mod telemetry;
pub mod updater;

#[cfg(test)]
mod test_support;

pub use coordinator::{
    Collaborators, TelemetryCoordinator, TelemetryHandle, TelemetryOptions, TelemetryStatus,
};
pub use stream::{Epoch, StartState, StreamController, StreamPhase, VideoStreamHandle};
pub use telemetry::{TracerProviderGuard, init_tracing};
pub use updater::{TelemetryUpdater, format_angle, normalize_yaw};
