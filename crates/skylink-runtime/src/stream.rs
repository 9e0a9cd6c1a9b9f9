//! [`StreamController`] – capability-gated video streaming.
//!
//! A small state machine per activation:
//!
//! ```text
//! Idle ──probe──▶ Probing ──Supported──▶ Streaming(AwaitingSurface)
//!                    │                        │ surface ready
//!                    │                        ▼
//!                    │              Streaming(StartRequested) ──▶ Running | StartFailed
//!                    └─Unsupported/error──▶ Unsupported
//! any ──teardown──▶ Idle
//! ```
//!
//! Every asynchronous answer (capability reply, surface notification,
//! stream start result) is posted back to the delivery task tagged with the
//! [`Epoch`] that was current when it was requested. [`StreamController::probe`]
//! and [`StreamController::teardown`] advance the epoch, so answers that
//! belong to a superseded probe or an earlier activation are dropped on
//! arrival.

use std::sync::Arc;

use skylink_hal::{
    CapabilityService, StreamTransport, SurfaceEvent, SurfaceListener, VideoSurface,
};
use skylink_types::{
    CommandOutcome, FeatureId, FeatureSupport, StreamCapability, SurfaceHandle,
};
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

/// Generation counter used to recognise stale asynchronous answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Epoch(pub u64);

impl Epoch {
    fn next(self) -> Self {
        Epoch(self.0 + 1)
    }
}

/// Asynchronous answers routed back to the delivery task.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reply {
    ProbeResolved {
        epoch: Epoch,
        result: FeatureSupport,
    },
    Surface {
        epoch: Epoch,
        event: SurfaceEvent,
    },
    StartResolved {
        epoch: Epoch,
        outcome: CommandOutcome,
    },
}

/// The live video stream bound to a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoStreamHandle {
    pub surface: SurfaceHandle,
    pub epoch: Epoch,
}

/// Progress of the stream start inside [`StreamPhase::Streaming`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartState {
    /// Surface shown; waiting for it to become ready.
    AwaitingSurface,
    /// `start_video_stream` issued; waiting for its outcome.
    StartRequested(VideoStreamHandle),
    Running(VideoStreamHandle),
    /// The start failed. Terminal until the next probe.
    StartFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamPhase {
    Idle,
    Probing,
    Streaming(StartState),
    Unsupported,
}

/// Capability-gated start/stop of the vehicle video feed.
pub struct StreamController {
    capability: Arc<dyn CapabilityService>,
    transport: Arc<dyn StreamTransport>,
    surface: Box<dyn VideoSurface>,
    replies: mpsc::UnboundedSender<Reply>,
    epoch: Epoch,
    phase: StreamPhase,
    hide_on_start_failure: bool,
}

impl StreamController {
    /// Build an idle controller whose asynchronous answers are posted to
    /// `replies`.
    pub fn new(
        capability: Arc<dyn CapabilityService>,
        transport: Arc<dyn StreamTransport>,
        surface: Box<dyn VideoSurface>,
        replies: mpsc::UnboundedSender<Reply>,
    ) -> Self {
        Self {
            capability,
            transport,
            surface,
            replies,
            epoch: Epoch::default(),
            phase: StreamPhase::Idle,
            hide_on_start_failure: false,
        }
    }

    /// Hide the surface again when the stream fails to start (builder-style).
    /// Off by default: the surface stays visible awaiting a frame.
    pub fn with_hide_on_start_failure(mut self, hide: bool) -> Self {
        self.hide_on_start_failure = hide;
        self
    }

    pub fn phase(&self) -> StreamPhase {
        self.phase
    }

    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    pub fn capability(&self) -> StreamCapability {
        match self.phase {
            StreamPhase::Idle | StreamPhase::Probing => StreamCapability::Unknown,
            StreamPhase::Streaming(_) => StreamCapability::Supported,
            StreamPhase::Unsupported => StreamCapability::Unsupported,
        }
    }

    /// The running stream, if any.
    pub fn stream_handle(&self) -> Option<VideoStreamHandle> {
        match self.phase {
            StreamPhase::Streaming(StartState::Running(handle)) => Some(handle),
            _ => None,
        }
    }

    pub fn surface_visible(&self) -> bool {
        self.surface.is_visible()
    }

    /// Ask whether the current link session supports video streaming.
    ///
    /// Supersedes any probe still pending. A stream that was requested or
    /// running under the previous session is stopped first so the next
    /// start cannot stack on top of it.
    pub fn probe(&mut self) {
        if let StreamPhase::Streaming(StartState::StartRequested(_) | StartState::Running(_)) =
            self.phase
        {
            debug!("re-probing with a live stream; stopping it first");
            self.stop_stream();
        }
        self.surface.set_listener(None);
        self.epoch = self.epoch.next();
        self.phase = StreamPhase::Probing;

        let epoch = self.epoch;
        let replies = self.replies.clone();
        debug!(epoch = epoch.0, "probing video streaming support");
        self.capability.check_feature_support(
            FeatureId::VideoStreaming,
            Box::new(move |result| {
                let _ = replies.send(Reply::ProbeResolved { epoch, result });
            }),
        );
    }

    /// Dispatch an asynchronous answer to its handler.
    pub fn on_reply(&mut self, reply: Reply) {
        match reply {
            Reply::ProbeResolved { epoch, result } => self.on_probe_result(epoch, result),
            Reply::Surface { epoch, event } => self.on_surface_event(epoch, event),
            Reply::StartResolved { epoch, outcome } => self.on_start_result(epoch, outcome),
        }
    }

    pub fn on_probe_result(&mut self, epoch: Epoch, result: FeatureSupport) {
        if epoch != self.epoch || self.phase != StreamPhase::Probing {
            debug!(epoch = epoch.0, current = self.epoch.0, "ignoring stale probe result");
            return;
        }

        match result.as_error() {
            Some(err) => warn!(error = %err, "capability probe failed; hiding video"),
            None => info!(?result, "video streaming capability resolved"),
        }

        match StreamCapability::from(result) {
            StreamCapability::Supported => {
                self.surface.set_visible(true);
                self.phase = StreamPhase::Streaming(StartState::AwaitingSurface);
                let replies = self.replies.clone();
                let listener: SurfaceListener = Arc::new(move |event| {
                    let _ = replies.send(Reply::Surface { epoch, event });
                });
                self.surface.set_listener(Some(listener));
                if let Some(handle) = self.surface.ready_handle() {
                    self.request_start(handle);
                }
            }
            StreamCapability::Unsupported | StreamCapability::Unknown => {
                self.surface.set_visible(false);
                self.phase = StreamPhase::Unsupported;
            }
        }
    }

    pub fn on_surface_event(&mut self, epoch: Epoch, event: SurfaceEvent) {
        match event {
            SurfaceEvent::Ready { handle, width, height } => {
                let awaiting =
                    self.phase == StreamPhase::Streaming(StartState::AwaitingSurface);
                if epoch != self.epoch || !awaiting {
                    debug!(epoch = epoch.0, phase = ?self.phase, "ignoring surface ready");
                    return;
                }
                debug!(?handle, width, height, "video surface ready");
                self.request_start(handle);
            }
            SurfaceEvent::SizeChanged { .. } | SurfaceEvent::Destroyed => {
                trace!(?event, "surface notification ignored");
            }
        }
    }

    pub fn on_start_result(&mut self, epoch: Epoch, outcome: CommandOutcome) {
        let StreamPhase::Streaming(StartState::StartRequested(handle)) = self.phase else {
            debug!(epoch = epoch.0, phase = ?self.phase, "ignoring stream start result");
            return;
        };
        if epoch != self.epoch {
            debug!(epoch = epoch.0, current = self.epoch.0, "ignoring stale stream start result");
            return;
        }

        match outcome.into_stream_result() {
            Ok(()) => {
                info!(surface = ?handle.surface, "video stream running");
                self.phase = StreamPhase::Streaming(StartState::Running(handle));
            }
            Err(err) => {
                warn!(error = %err, hide = self.hide_on_start_failure, "video stream failed to start");
                self.phase = StreamPhase::Streaming(StartState::StartFailed);
                if self.hide_on_start_failure {
                    self.surface.set_visible(false);
                }
            }
        }
    }

    /// Release everything: invalidate pending answers, hide the surface and
    /// stop the stream whether or not one was ever started.
    pub fn teardown(&mut self) {
        self.epoch = self.epoch.next();
        self.surface.set_listener(None);
        self.surface.set_visible(false);
        self.stop_stream();
        self.phase = StreamPhase::Idle;
        debug!(epoch = self.epoch.0, "stream controller torn down");
    }

    fn request_start(&mut self, surface: SurfaceHandle) {
        let epoch = self.epoch;
        let handle = VideoStreamHandle { surface, epoch };
        self.phase = StreamPhase::Streaming(StartState::StartRequested(handle));

        let replies = self.replies.clone();
        info!(?surface, "starting video stream");
        self.transport.start_video_stream(
            surface,
            Box::new(move |outcome| {
                let _ = replies.send(Reply::StartResolved { epoch, outcome });
            }),
        );
    }

    fn stop_stream(&mut self) {
        self.transport.stop_video_stream(Some(Box::new(|outcome| {
            if outcome != CommandOutcome::Ok {
                debug!(?outcome, "video stream stop failed; ignoring");
            }
        })));
    }
}
