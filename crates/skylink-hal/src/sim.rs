//! In-process vehicle link for demos and CI.
//!
//! [`SimLink`] plays the remote side of the telemetry core: it owns a
//! [`SharedVehicleState`], publishes vehicle events on an [`EventBus`],
//! answers capability queries and accepts video stream commands. Every
//! reply is delivered from a spawned task after a configurable latency, the
//! way a real link answers from its own I/O thread.
//!
//! # Example
//!
//! ```rust,no_run
//! use skylink_hal::sim::{SimLink, SimSettings};
//! use skylink_middleware::EventBus;
//!
//! # async fn demo() {
//! let bus = EventBus::default();
//! let link = SimLink::new(bus, SimSettings::default());
//! link.connect();
//! let feed = link.spawn_feed(5);
//! # feed.abort();
//! # }
//! ```

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use skylink_middleware::EventBus;
use skylink_types::{
    AttitudeSample, CommandOutcome, EventKind, FeatureId, FeatureSupport, SpeedSample,
    SurfaceHandle,
};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace};

use crate::capability::{CapabilityService, FeatureCallback};
use crate::stream::{CommandCallback, StreamTransport};
use crate::vehicle_state::SharedVehicleState;

const SOURCE: &str = "skylink-hal::sim";

/// Capability error code returned while the link has no session.
pub const ERR_NOT_CONNECTED: i32 = -1;
/// Stream error code returned when a start arrives while already streaming.
pub const ERR_ALREADY_STREAMING: i32 = -2;

/// Behaviour knobs for [`SimLink`].
#[derive(Debug, Clone)]
pub struct SimSettings {
    /// Whether the vehicle advertises video streaming.
    pub video_supported: bool,
    /// Delay before capability and stream replies are delivered.
    pub reply_latency: Duration,
    /// Forced outcome for stream starts. `None` means succeed unless a
    /// stream is already running.
    pub start_outcome: Option<CommandOutcome>,
}

impl Default for SimSettings {
    fn default() -> Self {
        Self {
            video_supported: true,
            reply_latency: Duration::from_millis(150),
            start_outcome: None,
        }
    }
}

struct SimInner {
    bus: EventBus,
    state: SharedVehicleState,
    settings: Mutex<SimSettings>,
    connected: AtomicBool,
    streaming: AtomicBool,
    probes: AtomicUsize,
    starts: AtomicUsize,
    stops: AtomicUsize,
}

/// Simulated vehicle link. Clone it cheaply – all clones drive the same
/// simulated vehicle.
#[derive(Clone)]
pub struct SimLink {
    inner: Arc<SimInner>,
}

impl SimLink {
    pub fn new(bus: EventBus, settings: SimSettings) -> Self {
        Self {
            inner: Arc::new(SimInner {
                bus,
                state: SharedVehicleState::new(),
                settings: Mutex::new(settings),
                connected: AtomicBool::new(false),
                streaming: AtomicBool::new(false),
                probes: AtomicUsize::new(0),
                starts: AtomicUsize::new(0),
                stops: AtomicUsize::new(0),
            }),
        }
    }

    /// The state store this link writes into.
    pub fn state(&self) -> SharedVehicleState {
        self.inner.state.clone()
    }

    pub fn bus(&self) -> &EventBus {
        &self.inner.bus
    }

    /// Open a session and announce it with [`EventKind::LinkConnected`].
    /// Calling it again while connected re-announces the session, as a
    /// link does after a silent reconnect.
    pub fn connect(&self) {
        self.inner.connected.store(true, Ordering::SeqCst);
        info!("sim link connected");
        self.emit(EventKind::LinkConnected);
    }

    /// Close the session, drop every sample and the running stream.
    pub fn disconnect(&self) {
        self.inner.connected.store(false, Ordering::SeqCst);
        self.inner.streaming.store(false, Ordering::SeqCst);
        self.inner.state.clear();
        info!("sim link disconnected");
        self.emit(EventKind::LinkDisconnected);
    }

    pub fn is_connected(&self) -> bool {
        self.inner.connected.load(Ordering::SeqCst)
    }

    pub fn is_streaming(&self) -> bool {
        self.inner.streaming.load(Ordering::SeqCst)
    }

    pub fn set_video_supported(&self, supported: bool) {
        if let Ok(mut settings) = self.inner.settings.lock() {
            settings.video_supported = supported;
        }
    }

    pub fn set_start_outcome(&self, outcome: Option<CommandOutcome>) {
        if let Ok(mut settings) = self.inner.settings.lock() {
            settings.start_outcome = outcome;
        }
    }

    /// Number of capability queries answered so far.
    pub fn probe_count(&self) -> usize {
        self.inner.probes.load(Ordering::SeqCst)
    }

    pub fn start_count(&self) -> usize {
        self.inner.starts.load(Ordering::SeqCst)
    }

    pub fn stop_count(&self) -> usize {
        self.inner.stops.load(Ordering::SeqCst)
    }

    /// Store a new attitude sample and announce it.
    pub fn push_attitude(&self, attitude: Option<AttitudeSample>) {
        self.inner.state.set_attitude(attitude);
        self.emit(EventKind::AttitudeUpdated);
    }

    /// Store a new speed sample and announce it.
    pub fn push_speed(&self, speed: Option<SpeedSample>) {
        self.inner.state.set_speed(speed);
        self.emit(EventKind::SpeedUpdated);
    }

    /// Spawn a task that flies a slow circle at `hz` updates per second
    /// while the link is connected. Abort the handle to stop it.
    pub fn spawn_feed(&self, hz: u32) -> JoinHandle<()> {
        let link = self.clone();
        let period = Duration::from_secs_f64(1.0 / f64::from(hz.max(1)));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            let mut t = 0.0_f64;
            loop {
                ticker.tick().await;
                if !link.is_connected() {
                    continue;
                }
                t += period.as_secs_f64();
                link.push_attitude(Some(circle_attitude(t)));
                link.push_speed(Some(SpeedSample {
                    ground_speed: 8.0 + (t * 0.3).sin(),
                    vertical_speed: 0.5 * (t * 0.7).cos(),
                }));
                if (t * 10.0).round() as u64 % 50 == 0 {
                    // Occasional battery chatter the telemetry core filters out.
                    link.emit(EventKind::BatteryUpdated);
                }
            }
        })
    }

    fn settings(&self) -> SimSettings {
        self.inner
            .settings
            .lock()
            .map(|s| s.clone())
            .unwrap_or_default()
    }

    fn emit(&self, kind: EventKind) {
        // Nobody listening is normal while the telemetry core is inactive.
        if let Err(e) = self.inner.bus.emit(SOURCE, kind) {
            trace!(?kind, error = %e, "sim event dropped");
        }
    }

    fn reply_later<T: Send + 'static>(
        &self,
        latency: Duration,
        value: T,
        reply: Box<dyn FnOnce(T) + Send + 'static>,
    ) {
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(async move {
                    tokio::time::sleep(latency).await;
                    reply(value);
                });
            }
            Err(_) => reply(value),
        }
    }
}

/// Bank into a constant-rate turn; yaw sweeps the full signed range.
fn circle_attitude(t: f64) -> AttitudeSample {
    let yaw = ((t * 12.0) % 360.0) - 180.0;
    AttitudeSample {
        roll: 15.0 + 3.0 * (t * 1.3).sin(),
        pitch: -2.0 + 1.5 * (t * 0.9).cos(),
        yaw,
    }
}

impl CapabilityService for SimLink {
    fn check_feature_support(&self, feature: FeatureId, on_result: FeatureCallback) {
        self.inner.probes.fetch_add(1, Ordering::SeqCst);
        let settings = self.settings();
        let answer = if !self.is_connected() {
            FeatureSupport::Error(ERR_NOT_CONNECTED)
        } else {
            match feature {
                FeatureId::VideoStreaming if settings.video_supported => FeatureSupport::Supported,
                FeatureId::VideoStreaming => FeatureSupport::Unsupported,
            }
        };
        debug!(?feature, ?answer, "sim capability query");
        self.reply_later(settings.reply_latency, answer, on_result);
    }
}

impl StreamTransport for SimLink {
    fn start_video_stream(&self, surface: SurfaceHandle, on_result: CommandCallback) {
        self.inner.starts.fetch_add(1, Ordering::SeqCst);
        let settings = self.settings();
        let outcome = match settings.start_outcome {
            Some(forced) => forced,
            None if self.inner.streaming.swap(true, Ordering::SeqCst) => {
                CommandOutcome::Error(ERR_ALREADY_STREAMING)
            }
            None => CommandOutcome::Ok,
        };
        debug!(?surface, ?outcome, "sim stream start");
        self.reply_later(settings.reply_latency, outcome, on_result);
    }

    fn stop_video_stream(&self, on_result: Option<CommandCallback>) {
        self.inner.stops.fetch_add(1, Ordering::SeqCst);
        let was_streaming = self.inner.streaming.swap(false, Ordering::SeqCst);
        debug!(was_streaming, "sim stream stop");
        if let Some(reply) = on_result {
            self.reply_later(self.settings().reply_latency, CommandOutcome::Ok, reply);
        }
    }
}
