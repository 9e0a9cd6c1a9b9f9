//! Video stream transport commands.

use skylink_types::{CommandOutcome, SurfaceHandle};

/// Single-shot completion of a transport command.
pub type CommandCallback = Box<dyn FnOnce(CommandOutcome) + Send + 'static>;

/// Carries the vehicle's video feed onto a presentation surface.
///
/// Decoding happens inside the transport; the telemetry core only decides
/// when to start and stop.
pub trait StreamTransport: Send + Sync {
    /// Bind the feed to `surface`. The outcome is reported through
    /// `on_result` (ok, error code, or timeout).
    fn start_video_stream(&self, surface: SurfaceHandle, on_result: CommandCallback);

    /// Release the feed. Must be safe to call when nothing is streaming.
    fn stop_video_stream(&self, on_result: Option<CommandCallback>);
}
