//! [`TelemetryCoordinator`] – binds the telemetry core to the link lifecycle.
//!
//! The coordinator owns the [`TelemetryUpdater`], the [`StreamController`]
//! and the [`BusClient`], and runs them on a single Tokio task: vehicle
//! events, asynchronous collaborator answers and lifecycle commands are all
//! delivered from one `select!` loop, one at a time. Nothing else touches
//! the core's state, so no locks are involved.
//!
//! * **Activate** (link API connected) – read the heading-mode preference,
//!   refresh every readout, probe video support, subscribe to the bus.
//! * **Deactivate** (link API disconnected) – stop the video stream
//!   unconditionally and unsubscribe.
//!
//! Callers drive the loop through a cloneable [`TelemetryHandle`]; every
//! call returns as soon as the command is queued.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use skylink_hal::{HeadlessSurface, MemoryPreferences, MetricSpeed, SimLink, SimSettings};
//! use skylink_middleware::EventBus;
//! use skylink_runtime::coordinator::{Collaborators, TelemetryCoordinator, TelemetryOptions};
//!
//! # struct NullDisplay;
//! # impl skylink_hal::TelemetryDisplay for NullDisplay {
//! #     fn show_attitude(&mut self, _: &skylink_hal::AttitudeReadout) {}
//! #     fn show_speed(&mut self, _: &skylink_hal::SpeedReadout) {}
//! # }
//! # async fn demo() -> Result<(), skylink_types::SkyError> {
//! let bus = EventBus::default();
//! let link = SimLink::new(bus.clone(), SimSettings::default());
//! let parts = Collaborators {
//!     state: Arc::new(link.state()),
//!     capability: Arc::new(link.clone()),
//!     transport: Arc::new(link.clone()),
//!     surface: Box::new(HeadlessSurface::new(1280, 720, Duration::from_millis(50))),
//!     display: Box::new(NullDisplay),
//!     formatter: Box::new(MetricSpeed),
//!     preferences: Arc::new(MemoryPreferences::new()),
//! };
//! let (handle, task) = TelemetryCoordinator::new(bus, parts, TelemetryOptions::default()).spawn();
//! link.connect();
//! handle.activate()?;
//! # handle.shutdown()?;
//! # let _ = task.await;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use skylink_hal::{
    CapabilityService, PREF_HEADING_MODE, Preferences, SpeedFormatter, StreamTransport,
    TelemetryDisplay, VehicleState, VideoSurface,
};
use skylink_middleware::{BusClient, EventBus, TELEMETRY_EVENTS};
use skylink_types::{ConnectionState, Event, EventKind, HeadingMode, SkyError, StreamCapability};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, trace};

use crate::stream::{Reply, StreamController, StreamPhase};
use crate::updater::TelemetryUpdater;

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Everything the telemetry core talks to but does not own.
pub struct Collaborators {
    pub state: Arc<dyn VehicleState>,
    pub capability: Arc<dyn CapabilityService>,
    pub transport: Arc<dyn StreamTransport>,
    pub surface: Box<dyn VideoSurface>,
    pub display: Box<dyn TelemetryDisplay>,
    pub formatter: Box<dyn SpeedFormatter>,
    pub preferences: Arc<dyn Preferences>,
}

/// Behaviour switches for [`TelemetryCoordinator`].
#[derive(Debug, Clone, Default)]
pub struct TelemetryOptions {
    /// Hide the video surface when the stream fails to start. When `false`
    /// the surface stays visible awaiting a frame.
    pub hide_video_on_start_failure: bool,
}

// ─────────────────────────────────────────────────────────────────────────────
// Commands and status
// ─────────────────────────────────────────────────────────────────────────────

enum Control {
    Activate,
    Deactivate,
    Status(oneshot::Sender<TelemetryStatus>),
    Shutdown,
}

/// Point-in-time view of the coordinator, for status displays and tests.
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryStatus {
    pub connection: ConnectionState,
    pub heading_mode: HeadingMode,
    pub subscribed: bool,
    pub stream_phase: StreamPhase,
    pub capability: StreamCapability,
    pub surface_visible: bool,
    pub epoch: u64,
}

/// Cloneable front door to a running [`TelemetryCoordinator`].
#[derive(Clone)]
pub struct TelemetryHandle {
    control: mpsc::UnboundedSender<Control>,
}

impl TelemetryHandle {
    /// Queue an activation (link API connected).
    pub fn activate(&self) -> Result<(), SkyError> {
        self.send(Control::Activate)
    }

    /// Queue a deactivation (link API disconnected).
    pub fn deactivate(&self) -> Result<(), SkyError> {
        self.send(Control::Deactivate)
    }

    /// Ask the loop to deactivate and exit.
    pub fn shutdown(&self) -> Result<(), SkyError> {
        self.send(Control::Shutdown)
    }

    /// Snapshot of the coordinator once every previously queued command has
    /// been handled.
    pub async fn status(&self) -> Result<TelemetryStatus, SkyError> {
        let (tx, rx) = oneshot::channel();
        self.send(Control::Status(tx))?;
        rx.await
            .map_err(|_| SkyError::Channel("telemetry loop dropped status request".to_string()))
    }

    fn send(&self, control: Control) -> Result<(), SkyError> {
        self.control
            .send(control)
            .map_err(|_| SkyError::Channel("telemetry loop is not running".to_string()))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// TelemetryCoordinator
// ─────────────────────────────────────────────────────────────────────────────

/// Lifecycle coordinator for the telemetry core.
pub struct TelemetryCoordinator {
    state: Arc<dyn VehicleState>,
    display: Box<dyn TelemetryDisplay>,
    preferences: Arc<dyn Preferences>,
    updater: TelemetryUpdater,
    controller: StreamController,
    client: BusClient,
    connection: ConnectionState,
    control_tx: mpsc::UnboundedSender<Control>,
    control_rx: mpsc::UnboundedReceiver<Control>,
    replies: mpsc::UnboundedReceiver<Reply>,
}

impl TelemetryCoordinator {
    pub fn new(bus: EventBus, parts: Collaborators, options: TelemetryOptions) -> Self {
        let (reply_tx, replies) = mpsc::unbounded_channel();
        let (control_tx, control_rx) = mpsc::unbounded_channel();
        let controller =
            StreamController::new(parts.capability, parts.transport, parts.surface, reply_tx)
                .with_hide_on_start_failure(options.hide_video_on_start_failure);

        Self {
            state: parts.state,
            display: parts.display,
            preferences: parts.preferences,
            updater: TelemetryUpdater::new(parts.formatter),
            controller,
            client: BusClient::new(bus, TELEMETRY_EVENTS),
            connection: ConnectionState::Disconnected,
            control_tx,
            control_rx,
            replies,
        }
    }

    /// A handle for driving this coordinator once it runs.
    pub fn handle(&self) -> TelemetryHandle {
        TelemetryHandle {
            control: self.control_tx.clone(),
        }
    }

    /// Spawn [`TelemetryCoordinator::run`] on the current Tokio runtime.
    pub fn spawn(self) -> (TelemetryHandle, JoinHandle<()>) {
        let handle = self.handle();
        (handle, tokio::spawn(self.run()))
    }

    /// The single delivery loop. Returns after a shutdown request or once
    /// every [`TelemetryHandle`] has been dropped; the core is deactivated
    /// on the way out either way.
    pub async fn run(mut self) {
        // Only handles keep the control channel open.
        let control_tx = std::mem::replace(&mut self.control_tx, closed_sender());
        drop(control_tx);

        loop {
            tokio::select! {
                biased;

                Some(reply) = self.replies.recv() => self.controller.on_reply(reply),

                Some(event) = self.client.next_event() => self.handle_event(&event),

                control = self.control_rx.recv() => match control {
                    Some(Control::Activate) => self.activate(),
                    Some(Control::Deactivate) => self.deactivate(),
                    Some(Control::Status(reply)) => {
                        let _ = reply.send(self.status());
                    }
                    Some(Control::Shutdown) | None => break,
                },
            }
        }

        if self.connection == ConnectionState::Connected {
            self.deactivate();
        }
        info!("telemetry loop stopped");
    }

    /// Bind to a freshly connected link.
    ///
    /// Ignored while already active.
    #[instrument(skip(self))]
    pub fn activate(&mut self) {
        if self.connection == ConnectionState::Connected {
            debug!("telemetry already active");
            return;
        }

        let mode = HeadingMode::from_pref(self.preferences.get_bool(PREF_HEADING_MODE, false));
        self.updater.set_heading_mode(mode);
        self.connection = ConnectionState::Connected;

        self.refresh_all();
        self.client.subscribe();
        info!(?mode, "telemetry activated");
    }

    /// Release the link. The stream stop is issued even when streaming was
    /// never entered.
    #[instrument(skip(self))]
    pub fn deactivate(&mut self) {
        self.controller.teardown();
        self.client.unsubscribe();
        if self.connection == ConnectionState::Connected {
            self.connection = ConnectionState::Disconnected;
            info!("telemetry deactivated");
        }
    }

    /// Seed every readout and probe video support without waiting for the
    /// next event.
    pub fn refresh_all(&mut self) {
        self.updater
            .on_attitude_event(self.state.as_ref(), self.display.as_mut());
        self.updater
            .on_speed_event(self.state.as_ref(), self.display.as_mut());
        self.controller.probe();
    }

    pub fn handle_event(&mut self, event: &Event) {
        trace!(kind = ?event.kind, source = %event.source, "vehicle event");
        match event.kind {
            EventKind::AttitudeUpdated => {
                self.updater
                    .on_attitude_event(self.state.as_ref(), self.display.as_mut());
            }
            EventKind::SpeedUpdated => {
                self.updater
                    .on_speed_event(self.state.as_ref(), self.display.as_mut());
            }
            EventKind::LinkConnected => self.controller.probe(),
            EventKind::LinkDisconnected | EventKind::BatteryUpdated => {}
        }
    }

    pub fn status(&self) -> TelemetryStatus {
        TelemetryStatus {
            connection: self.connection,
            heading_mode: self.updater.heading_mode(),
            subscribed: self.client.is_subscribed(),
            stream_phase: self.controller.phase(),
            capability: self.controller.capability(),
            surface_visible: self.controller.surface_visible(),
            epoch: self.controller.epoch().0,
        }
    }
}

fn closed_sender() -> mpsc::UnboundedSender<Control> {
    let (tx, _) = mpsc::unbounded_channel();
    tx
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::StartState;
    use crate::test_support::{MockCapability, MockSurface, MockTransport, RecordingDisplay};
    use skylink_hal::{
        HeadlessSurface, MemoryPreferences, MetricSpeed, SharedVehicleState, SimLink, SimSettings,
    };
    use skylink_types::{AttitudeSample, CommandOutcome, FeatureSupport, SurfaceHandle};

    struct Rig {
        bus: EventBus,
        state: SharedVehicleState,
        capability: Arc<MockCapability>,
        transport: Arc<MockTransport>,
        surface: MockSurface,
        display: RecordingDisplay,
        prefs: MemoryPreferences,
        handle: TelemetryHandle,
        task: JoinHandle<()>,
    }

    fn rig(options: TelemetryOptions) -> Rig {
        let bus = EventBus::default();
        let state = SharedVehicleState::new();
        let capability = Arc::new(MockCapability::default());
        let transport = Arc::new(MockTransport::default());
        let surface = MockSurface::default();
        let display = RecordingDisplay::default();
        let prefs = MemoryPreferences::new();

        let parts = Collaborators {
            state: Arc::new(state.clone()),
            capability: capability.clone(),
            transport: transport.clone(),
            surface: Box::new(surface.clone()),
            display: Box::new(display.clone()),
            formatter: Box::new(MetricSpeed),
            preferences: Arc::new(prefs.clone()),
        };
        let (handle, task) = TelemetryCoordinator::new(bus.clone(), parts, options).spawn();
        Rig {
            bus,
            state,
            capability,
            transport,
            surface,
            display,
            prefs,
            handle,
            task,
        }
    }

    fn sample(roll: f64, pitch: f64, yaw: f64) -> Option<AttitudeSample> {
        Some(AttitudeSample { roll, pitch, yaw })
    }

    #[tokio::test]
    async fn activation_seeds_display_probes_and_subscribes() -> Result<(), SkyError> {
        let rig = rig(TelemetryOptions::default());
        rig.state.set_attitude(sample(1.0, 2.0, 3.0));

        rig.handle.activate()?;
        let status = rig.handle.status().await?;

        assert_eq!(status.connection, ConnectionState::Connected);
        assert!(status.subscribed);
        assert_eq!(status.stream_phase, StreamPhase::Probing);
        assert_eq!(status.capability, StreamCapability::Unknown);
        assert_eq!(rig.capability.call_count(), 1);
        assert_eq!(rig.display.attitude_count(), 1);
        // Speed is zero-filled even with no sample.
        assert_eq!(
            rig.display.last_speed().map(|s| s.horizontal_text),
            Some("0.0 m/s".to_string())
        );
        Ok(())
    }

    #[tokio::test]
    async fn activate_twice_is_noop() -> Result<(), SkyError> {
        let rig = rig(TelemetryOptions::default());
        rig.handle.activate()?;
        rig.handle.activate()?;
        rig.handle.status().await?;
        assert_eq!(rig.capability.call_count(), 1);
        assert_eq!(rig.bus.receiver_count(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn heading_mode_is_reread_on_each_activation() -> Result<(), Box<dyn std::error::Error>> {
        let rig = rig(TelemetryOptions::default());
        rig.state.set_attitude(sample(5.2, -3.7, -45.0));

        rig.handle.activate()?;
        rig.handle.status().await?;
        let fpv = rig.display.last_attitude().ok_or("no readout")?;
        assert_eq!(fpv.roll_text, "  5°");
        assert_eq!(fpv.pitch_text, " -4°");
        assert_eq!(fpv.yaw_text, "-45°");

        // Changing the preference mid-activation has no effect ...
        rig.prefs.set_bool(PREF_HEADING_MODE, true);
        rig.bus.emit("test", EventKind::AttitudeUpdated)?;
        let status = rig.handle.status().await?;
        assert_eq!(status.heading_mode, HeadingMode::Fpv);
        assert_eq!(rig.display.last_attitude().ok_or("no readout")?.yaw_text, "-45°");

        // ... until the component is re-activated.
        rig.handle.deactivate()?;
        rig.handle.activate()?;
        let status = rig.handle.status().await?;
        assert_eq!(status.heading_mode, HeadingMode::Compass);
        assert_eq!(rig.display.last_attitude().ok_or("no readout")?.yaw_text, "315°");
        Ok(())
    }

    #[tokio::test]
    async fn events_drive_updates_while_active_only() -> Result<(), Box<dyn std::error::Error>> {
        let rig = rig(TelemetryOptions::default());
        rig.handle.activate()?;
        rig.handle.status().await?;
        let seeded = rig.display.attitude_count();

        rig.state.set_attitude(sample(10.0, 0.0, 90.0));
        rig.bus.emit("test", EventKind::AttitudeUpdated)?;
        rig.bus.emit("test", EventKind::SpeedUpdated)?;
        rig.handle.status().await?;
        assert_eq!(rig.display.attitude_count(), seeded + 1);
        assert_eq!(rig.display.speed_count(), 2);

        rig.handle.deactivate()?;
        let status = rig.handle.status().await?;
        assert!(!status.subscribed);
        assert!(rig.bus.emit("test", EventKind::AttitudeUpdated).is_err());
        assert_eq!(rig.display.attitude_count(), seeded + 1);
        Ok(())
    }

    #[tokio::test]
    async fn absent_attitude_event_leaves_display_unchanged() -> Result<(), Box<dyn std::error::Error>> {
        let rig = rig(TelemetryOptions::default());
        rig.state.set_attitude(sample(1.0, 1.0, 1.0));
        rig.handle.activate()?;
        rig.handle.status().await?;

        rig.state.set_attitude(None);
        rig.bus.emit("test", EventKind::AttitudeUpdated)?;
        rig.handle.status().await?;
        assert_eq!(rig.display.attitude_count(), 1);
        assert_eq!(rig.display.last_attitude().ok_or("no readout")?.roll_text, "  1°");
        Ok(())
    }

    #[tokio::test]
    async fn unsupported_then_supported_on_reconnect() -> Result<(), SkyError> {
        let rig = rig(TelemetryOptions::default());
        rig.handle.activate()?;
        rig.handle.status().await?;

        rig.capability.resolve_next(FeatureSupport::Unsupported);
        let status = rig.handle.status().await?;
        assert_eq!(status.capability, StreamCapability::Unsupported);
        assert!(!rig.surface.visible());
        assert_eq!(rig.transport.start_count(), 0);

        rig.bus.emit("test", EventKind::LinkConnected)?;
        rig.handle.status().await?;
        assert_eq!(rig.capability.call_count(), 2);

        rig.capability.resolve_next(FeatureSupport::Supported);
        let status = rig.handle.status().await?;
        assert!(status.surface_visible);
        assert_eq!(rig.transport.start_count(), 0);

        rig.surface.fire_ready(SurfaceHandle(4));
        rig.handle.status().await?;
        assert_eq!(rig.transport.start_count(), 1);

        rig.transport.resolve_start(CommandOutcome::Ok);
        let status = rig.handle.status().await?;
        assert!(matches!(
            status.stream_phase,
            StreamPhase::Streaming(StartState::Running(_))
        ));
        Ok(())
    }

    #[tokio::test]
    async fn reconnect_while_probing_supersedes() -> Result<(), SkyError> {
        let rig = rig(TelemetryOptions::default());
        rig.handle.activate()?;
        // Subscribed once the activation has been handled.
        rig.handle.status().await?;
        rig.bus.emit("test", EventKind::LinkConnected)?;
        rig.handle.status().await?;
        assert_eq!(rig.capability.pending_count(), 2);

        // The superseded probe answers first and is dropped.
        rig.capability.resolve_next(FeatureSupport::Supported);
        let status = rig.handle.status().await?;
        assert_eq!(status.stream_phase, StreamPhase::Probing);
        assert!(!status.surface_visible);

        rig.capability.resolve_next(FeatureSupport::Unsupported);
        let status = rig.handle.status().await?;
        assert_eq!(status.stream_phase, StreamPhase::Unsupported);
        Ok(())
    }

    #[tokio::test]
    async fn every_deactivation_stops_the_stream() -> Result<(), SkyError> {
        let rig = rig(TelemetryOptions::default());
        rig.handle.activate()?;
        rig.handle.deactivate()?;
        rig.handle.status().await?;
        assert_eq!(rig.transport.stop_count(), 1);

        rig.handle.activate()?;
        rig.handle.status().await?;
        rig.capability.resolve_next(FeatureSupport::Unsupported);
        rig.capability.resolve_next(FeatureSupport::Supported);
        rig.surface.fire_ready(SurfaceHandle(1));
        rig.handle.deactivate()?;
        let status = rig.handle.status().await?;
        assert_eq!(rig.transport.stop_count(), 2);
        assert_eq!(status.stream_phase, StreamPhase::Idle);
        assert!(!rig.surface.visible());
        Ok(())
    }

    #[tokio::test]
    async fn late_surface_ready_after_deactivation_starts_nothing() -> Result<(), SkyError> {
        let rig = rig(TelemetryOptions::default());
        rig.handle.activate()?;
        rig.handle.status().await?;
        rig.capability.resolve_next(FeatureSupport::Supported);
        rig.handle.status().await?;
        let stale = rig.surface.listener().ok_or(SkyError::Channel("no listener".into()))?;

        rig.handle.deactivate()?;
        rig.handle.status().await?;
        stale(skylink_hal::SurfaceEvent::Ready {
            handle: SurfaceHandle(2),
            width: 1,
            height: 1,
        });
        rig.handle.status().await?;
        assert_eq!(rig.transport.start_count(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn start_failure_leaves_surface_visible() -> Result<(), SkyError> {
        let rig = rig(TelemetryOptions::default());
        rig.handle.activate()?;
        rig.handle.status().await?;
        rig.capability.resolve_next(FeatureSupport::Supported);
        rig.surface.fire_ready(SurfaceHandle(1));
        rig.handle.status().await?;
        rig.transport.resolve_start(CommandOutcome::Error(12));

        let status = rig.handle.status().await?;
        assert_eq!(status.stream_phase, StreamPhase::Streaming(StartState::StartFailed));
        assert!(status.surface_visible);
        Ok(())
    }

    #[tokio::test]
    async fn start_failure_hides_surface_when_configured() -> Result<(), SkyError> {
        let rig = rig(TelemetryOptions {
            hide_video_on_start_failure: true,
        });
        rig.handle.activate()?;
        rig.handle.status().await?;
        rig.capability.resolve_next(FeatureSupport::Supported);
        rig.surface.fire_ready(SurfaceHandle(1));
        rig.handle.status().await?;
        rig.transport.resolve_start(CommandOutcome::Timeout);

        let status = rig.handle.status().await?;
        assert!(!status.surface_visible);
        Ok(())
    }

    #[tokio::test]
    async fn shutdown_deactivates_and_exits() -> Result<(), Box<dyn std::error::Error>> {
        let rig = rig(TelemetryOptions::default());
        rig.handle.activate()?;
        rig.handle.shutdown()?;
        rig.task.await?;

        assert_eq!(rig.transport.stop_count(), 1);
        assert_eq!(rig.bus.receiver_count(), 0);
        assert!(rig.handle.activate().is_err());
        Ok(())
    }

    #[tokio::test]
    async fn dropping_every_handle_stops_the_loop() -> Result<(), Box<dyn std::error::Error>> {
        let Rig { handle, task, transport, .. } = rig(TelemetryOptions::default());
        handle.activate()?;
        drop(handle);
        tokio::time::timeout(std::time::Duration::from_secs(1), task).await??;
        assert_eq!(transport.stop_count(), 1);
        Ok(())
    }

    // ── Against the simulated link ──────────────────────────────────────

    fn sim_parts(
        bus: &EventBus,
        surface_delay: std::time::Duration,
    ) -> (SimLink, HeadlessSurface, Collaborators) {
        let link = SimLink::new(
            bus.clone(),
            SimSettings {
                video_supported: true,
                reply_latency: std::time::Duration::from_millis(5),
                start_outcome: None,
            },
        );
        let surface = HeadlessSurface::new(640, 480, surface_delay);
        let parts = Collaborators {
            state: Arc::new(link.state()),
            capability: Arc::new(link.clone()),
            transport: Arc::new(link.clone()),
            surface: Box::new(surface.clone()),
            display: Box::new(RecordingDisplay::default()),
            formatter: Box::new(MetricSpeed),
            preferences: Arc::new(MemoryPreferences::new()),
        };
        (link, surface, parts)
    }

    /// Poll the loop until `done` holds, giving up after two seconds.
    async fn wait_for(
        handle: &TelemetryHandle,
        done: impl Fn(&TelemetryStatus) -> bool,
    ) -> Result<TelemetryStatus, Box<dyn std::error::Error>> {
        let status = tokio::time::timeout(std::time::Duration::from_secs(2), async {
            loop {
                let status = handle.status().await?;
                if done(&status) {
                    return Ok::<_, SkyError>(status);
                }
                tokio::time::sleep(std::time::Duration::from_millis(5)).await;
            }
        })
        .await??;
        Ok(status)
    }

    fn running(status: &TelemetryStatus) -> bool {
        matches!(
            status.stream_phase,
            StreamPhase::Streaming(StartState::Running(_))
        )
    }

    #[tokio::test]
    async fn sim_link_keeps_one_stream_across_relinks() -> Result<(), Box<dyn std::error::Error>> {
        let bus = EventBus::default();
        let (link, surface, parts) = sim_parts(&bus, std::time::Duration::ZERO);
        let (handle, task) = TelemetryCoordinator::new(bus, parts, TelemetryOptions::default()).spawn();

        link.connect();
        handle.activate()?;
        let status = wait_for(&handle, running).await?;
        assert!(link.is_streaming());
        assert_eq!(link.start_count(), 1);
        assert_eq!(surface.ready_handle(), Some(SurfaceHandle(1)));

        // The surface is already ready, so the re-probe starts straight away
        // after stopping the previous stream.
        link.connect();
        let epoch = status.epoch;
        wait_for(&handle, |s| running(s) && s.epoch > epoch).await?;
        assert_eq!(link.start_count(), 2);
        assert!(link.stop_count() >= 1);
        assert!(link.is_streaming());

        handle.deactivate()?;
        let stopped = wait_for(&handle, |s| s.connection == ConnectionState::Disconnected).await?;
        assert!(!stopped.surface_visible);
        assert!(!link.is_streaming());
        assert!(surface.ready_handle().is_none());

        handle.activate()?;
        let epoch = stopped.epoch;
        wait_for(&handle, |s| running(s) && s.epoch > epoch).await?;
        assert_eq!(link.start_count(), 3);
        assert_eq!(surface.ready_handle(), Some(SurfaceHandle(2)));
        assert!(link.is_streaming());

        handle.shutdown()?;
        task.await?;
        assert!(!link.is_streaming());
        Ok(())
    }

    #[tokio::test]
    async fn sim_link_starts_once_delayed_surface_is_ready() -> Result<(), Box<dyn std::error::Error>> {
        let bus = EventBus::default();
        let (link, surface, parts) = sim_parts(&bus, std::time::Duration::from_millis(20));
        let (handle, task) = TelemetryCoordinator::new(bus, parts, TelemetryOptions::default()).spawn();

        link.connect();
        handle.activate()?;
        let status = wait_for(&handle, running).await?;
        assert!(status.surface_visible);
        assert_eq!(link.start_count(), 1);
        assert_eq!(link.probe_count(), 1);
        assert!(surface.ready_handle().is_some());

        handle.shutdown()?;
        task.await?;
        Ok(())
    }
}
