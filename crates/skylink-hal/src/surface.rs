//! Presentation surface for the video feed.
//!
//! A surface is shown or hidden by the telemetry core and becomes *ready*
//! (has a renderable buffer) asynchronously, at a time chosen by the
//! presentation layer. Readiness and size changes are reported to the
//! installed [`SurfaceListener`].

use std::sync::{Arc, Mutex};
use std::time::Duration;

use skylink_types::SurfaceHandle;
use tracing::trace;

/// Notifications emitted by a [`VideoSurface`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceEvent {
    /// A renderable buffer is available. May fire more than once.
    Ready {
        handle: SurfaceHandle,
        width: u32,
        height: u32,
    },
    SizeChanged { width: u32, height: u32 },
    /// The buffer behind the last `Ready` handle is gone.
    Destroyed,
}

/// Callback installed on a surface. Invoked from whatever task the
/// presentation layer runs on.
pub type SurfaceListener = Arc<dyn Fn(SurfaceEvent) + Send + Sync + 'static>;

/// The view that displays the video feed.
pub trait VideoSurface: Send {
    fn set_visible(&mut self, visible: bool);

    fn is_visible(&self) -> bool;

    /// Replace the listener. `None` removes it.
    fn set_listener(&mut self, listener: Option<SurfaceListener>);

    /// Handle of the current buffer if the surface is already ready.
    fn ready_handle(&self) -> Option<SurfaceHandle>;
}

// ────────────────────────────────────────────────────────────────────────────
// Headless surface
// ────────────────────────────────────────────────────────────────────────────

struct HeadlessInner {
    visible: bool,
    ready: Option<SurfaceHandle>,
    listener: Option<SurfaceListener>,
    next_id: u64,
    /// Bumped on every visibility change so a pending allocation can tell
    /// it was overtaken.
    generation: u64,
    width: u32,
    height: u32,
}

/// A surface with no pixels behind it.
///
/// Becomes ready `ready_delay` after being shown (immediately when the delay
/// is zero or no Tokio runtime is running) and releases its buffer when
/// hidden. Clones share state, so a caller can keep a handle to inspect or
/// resize a surface that has been moved into the telemetry core.
#[derive(Clone)]
pub struct HeadlessSurface {
    inner: Arc<Mutex<HeadlessInner>>,
    ready_delay: Duration,
}

impl HeadlessSurface {
    pub fn new(width: u32, height: u32, ready_delay: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(HeadlessInner {
                visible: false,
                ready: None,
                listener: None,
                next_id: 0,
                generation: 0,
                width,
                height,
            })),
            ready_delay,
        }
    }

    /// Change the surface size, notifying the listener when ready.
    pub fn resize(&self, width: u32, height: u32) {
        let listener = {
            let Ok(mut inner) = self.inner.lock() else {
                return;
            };
            inner.width = width;
            inner.height = height;
            match inner.ready {
                Some(_) => inner.listener.clone(),
                None => None,
            }
        };
        if let Some(listener) = listener {
            listener(SurfaceEvent::SizeChanged { width, height });
        }
    }

    fn allocate(inner: &mut HeadlessInner) -> SurfaceEvent {
        inner.next_id += 1;
        let handle = SurfaceHandle(inner.next_id);
        inner.ready = Some(handle);
        trace!(?handle, "headless surface ready");
        SurfaceEvent::Ready {
            handle,
            width: inner.width,
            height: inner.height,
        }
    }

    fn schedule_ready(&self, generation: u64) {
        let runtime = tokio::runtime::Handle::try_current();
        if self.ready_delay.is_zero() || runtime.is_err() {
            let notify = {
                let Ok(mut inner) = self.inner.lock() else {
                    return;
                };
                let event = Self::allocate(&mut inner);
                inner.listener.clone().map(|l| (l, event))
            };
            if let Some((listener, event)) = notify {
                listener(event);
            }
            return;
        }

        let inner = Arc::clone(&self.inner);
        let delay = self.ready_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let notify = {
                let Ok(mut guard) = inner.lock() else {
                    return;
                };
                if !guard.visible || guard.generation != generation || guard.ready.is_some() {
                    return;
                }
                let event = Self::allocate(&mut guard);
                guard.listener.clone().map(|l| (l, event))
            };
            if let Some((listener, event)) = notify {
                listener(event);
            }
        });
    }
}

impl VideoSurface for HeadlessSurface {
    fn set_visible(&mut self, visible: bool) {
        let (schedule, destroyed) = {
            let Ok(mut inner) = self.inner.lock() else {
                return;
            };
            if inner.visible == visible {
                return;
            }
            inner.visible = visible;
            inner.generation += 1;
            if visible {
                let pending = inner.ready.is_none();
                (pending.then_some(inner.generation), None)
            } else {
                let released = inner.ready.take().is_some();
                (None, if released { inner.listener.clone() } else { None })
            }
        };
        if let Some(generation) = schedule {
            self.schedule_ready(generation);
        }
        if let Some(listener) = destroyed {
            listener(SurfaceEvent::Destroyed);
        }
    }

    fn is_visible(&self) -> bool {
        self.inner.lock().map(|inner| inner.visible).unwrap_or(false)
    }

    fn set_listener(&mut self, listener: Option<SurfaceListener>) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.listener = listener;
        }
    }

    fn ready_handle(&self) -> Option<SurfaceHandle> {
        self.inner.lock().ok().and_then(|inner| inner.ready)
    }
}
