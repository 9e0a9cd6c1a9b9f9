//! [`TelemetryUpdater`] – turns vehicle samples into display readouts.

use skylink_hal::{
    AttitudeReadout, SpeedFormatter, SpeedReadout, TelemetryDisplay, VehicleState,
};
use skylink_types::HeadingMode;
use tracing::trace;

/// Recomputes attitude and speed readouts from the latest vehicle samples.
///
/// The heading mode is fixed for an activation; the coordinator sets it
/// once when the component is activated.
pub struct TelemetryUpdater {
    heading_mode: HeadingMode,
    formatter: Box<dyn SpeedFormatter>,
}

impl TelemetryUpdater {
    pub fn new(formatter: Box<dyn SpeedFormatter>) -> Self {
        Self {
            heading_mode: HeadingMode::default(),
            formatter,
        }
    }

    pub fn heading_mode(&self) -> HeadingMode {
        self.heading_mode
    }

    pub fn set_heading_mode(&mut self, mode: HeadingMode) {
        self.heading_mode = mode;
    }

    /// Publish the latest attitude sample.
    ///
    /// An absent sample leaves the display untouched; returns whether the
    /// display was updated.
    pub fn on_attitude_event(
        &self,
        state: &dyn VehicleState,
        display: &mut dyn TelemetryDisplay,
    ) -> bool {
        let Some(attitude) = state.attitude() else {
            trace!("attitude sample absent; keeping previous readout");
            return false;
        };

        let yaw = normalize_yaw(attitude.yaw, self.heading_mode);
        display.show_attitude(&AttitudeReadout {
            roll: attitude.roll,
            pitch: attitude.pitch,
            yaw,
            roll_text: format_angle(attitude.roll),
            pitch_text: format_angle(attitude.pitch),
            yaw_text: format_angle(yaw),
        });
        true
    }

    /// Publish the latest speed sample. Absent values show as zero.
    pub fn on_speed_event(&self, state: &dyn VehicleState, display: &mut dyn TelemetryDisplay) {
        let speed = state.speed().unwrap_or_default();
        display.show_speed(&SpeedReadout {
            horizontal_text: self.formatter.format(speed.ground_speed),
            vertical_text: self.formatter.format(speed.vertical_speed),
        });
    }
}

/// Wrap negative yaw into `[0, 360)` in compass mode; FPV keeps the raw value.
pub fn normalize_yaw(yaw: f64, mode: HeadingMode) -> f64 {
    match mode {
        HeadingMode::Compass if yaw < 0.0 => yaw + 360.0,
        _ => yaw,
    }
}

/// Format an angle as a whole number of degrees, right-aligned in three
/// columns: `5.2` → `"  5°"`, `-3.7` → `" -4°"`.
///
/// Halves round away from zero and negative zero prints as `0`.
pub fn format_angle(degrees: f64) -> String {
    let rounded = degrees.round() + 0.0;
    format!("{rounded:3.0}\u{00B0}")
}
