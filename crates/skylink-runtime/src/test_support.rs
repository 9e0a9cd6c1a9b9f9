//! Recording collaborators shared by the runtime's unit tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use skylink_hal::{
    AttitudeReadout, CapabilityService, CommandCallback, FeatureCallback, SpeedReadout,
    StreamTransport, SurfaceEvent, SurfaceListener, TelemetryDisplay, VideoSurface,
};
use skylink_types::{CommandOutcome, FeatureId, FeatureSupport, SurfaceHandle};

/// Capability service whose answers are delivered by the test.
#[derive(Default)]
pub struct MockCapability {
    pending: Mutex<VecDeque<FeatureCallback>>,
    calls: Mutex<usize>,
}

impl MockCapability {
    /// Answer the oldest outstanding query. Panics if none is pending.
    pub fn resolve_next(&self, result: FeatureSupport) {
        let callback = self
            .pending
            .lock()
            .unwrap()
            .pop_front()
            .expect("no capability query pending");
        callback(result);
    }

    pub fn call_count(&self) -> usize {
        *self.calls.lock().unwrap()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().unwrap().len()
    }
}

impl CapabilityService for MockCapability {
    fn check_feature_support(&self, feature: FeatureId, on_result: FeatureCallback) {
        assert_eq!(feature, FeatureId::VideoStreaming);
        *self.calls.lock().unwrap() += 1;
        self.pending.lock().unwrap().push_back(on_result);
    }
}

/// Stream transport that records commands and lets the test answer starts.
#[derive(Default)]
pub struct MockTransport {
    starts: Mutex<Vec<SurfaceHandle>>,
    pending: Mutex<VecDeque<CommandCallback>>,
    stops: Mutex<usize>,
}

impl MockTransport {
    pub fn resolve_start(&self, outcome: CommandOutcome) {
        let callback = self
            .pending
            .lock()
            .unwrap()
            .pop_front()
            .expect("no stream start pending");
        callback(outcome);
    }

    pub fn start_count(&self) -> usize {
        self.starts.lock().unwrap().len()
    }

    pub fn last_surface(&self) -> Option<SurfaceHandle> {
        self.starts.lock().unwrap().last().copied()
    }

    pub fn stop_count(&self) -> usize {
        *self.stops.lock().unwrap()
    }
}

impl StreamTransport for MockTransport {
    fn start_video_stream(&self, surface: SurfaceHandle, on_result: CommandCallback) {
        self.starts.lock().unwrap().push(surface);
        self.pending.lock().unwrap().push_back(on_result);
    }

    fn stop_video_stream(&self, on_result: Option<CommandCallback>) {
        *self.stops.lock().unwrap() += 1;
        if let Some(callback) = on_result {
            callback(CommandOutcome::Ok);
        }
    }
}

#[derive(Default)]
struct SurfaceState {
    visible: bool,
    ready: Option<SurfaceHandle>,
    listener: Option<SurfaceListener>,
}

/// Surface whose readiness is triggered by the test.
#[derive(Clone, Default)]
pub struct MockSurface {
    state: Arc<Mutex<SurfaceState>>,
}

impl MockSurface {
    pub fn visible(&self) -> bool {
        self.state.lock().unwrap().visible
    }

    pub fn listener(&self) -> Option<SurfaceListener> {
        self.state.lock().unwrap().listener.clone()
    }

    /// Mark the surface ready without notifying anyone.
    pub fn make_ready(&self, handle: SurfaceHandle) {
        self.state.lock().unwrap().ready = Some(handle);
    }

    /// Mark the surface ready and notify the installed listener.
    pub fn fire_ready(&self, handle: SurfaceHandle) {
        let listener = {
            let mut state = self.state.lock().unwrap();
            state.ready = Some(handle);
            state.listener.clone()
        };
        if let Some(listener) = listener {
            listener(SurfaceEvent::Ready {
                handle,
                width: 640,
                height: 360,
            });
        }
    }
}

impl VideoSurface for MockSurface {
    fn set_visible(&mut self, visible: bool) {
        self.state.lock().unwrap().visible = visible;
    }

    fn is_visible(&self) -> bool {
        self.visible()
    }

    fn set_listener(&mut self, listener: Option<SurfaceListener>) {
        self.state.lock().unwrap().listener = listener;
    }

    fn ready_handle(&self) -> Option<SurfaceHandle> {
        self.state.lock().unwrap().ready
    }
}

#[derive(Default)]
struct Readouts {
    attitude: Vec<AttitudeReadout>,
    speed: Vec<SpeedReadout>,
}

/// Display that keeps every readout it is handed.
#[derive(Clone, Default)]
pub struct RecordingDisplay {
    readouts: Arc<Mutex<Readouts>>,
}

impl RecordingDisplay {
    pub fn last_attitude(&self) -> Option<AttitudeReadout> {
        self.readouts.lock().unwrap().attitude.last().cloned()
    }

    pub fn last_speed(&self) -> Option<SpeedReadout> {
        self.readouts.lock().unwrap().speed.last().cloned()
    }

    pub fn attitude_count(&self) -> usize {
        self.readouts.lock().unwrap().attitude.len()
    }

    pub fn speed_count(&self) -> usize {
        self.readouts.lock().unwrap().speed.len()
    }
}

impl TelemetryDisplay for RecordingDisplay {
    fn show_attitude(&mut self, readout: &AttitudeReadout) {
        self.readouts.lock().unwrap().attitude.push(readout.clone());
    }

    fn show_speed(&mut self, readout: &SpeedReadout) {
        self.readouts.lock().unwrap().speed.push(readout.clone());
    }
}
