//! Readout sink for attitude and speed values.

/// Attitude values ready for presentation.
///
/// The numeric fields drive the attitude indicator; the text fields are the
/// labels shown next to it.
#[derive(Debug, Clone, PartialEq)]
pub struct AttitudeReadout {
    pub roll: f64,
    pub pitch: f64,
    /// Yaw after heading-mode normalisation.
    pub yaw: f64,
    pub roll_text: String,
    pub pitch_text: String,
    pub yaw_text: String,
}

/// Speed values ready for presentation, already in display units.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeedReadout {
    pub horizontal_text: String,
    pub vertical_text: String,
}

/// Presentation layer for telemetry readouts.
pub trait TelemetryDisplay: Send {
    fn show_attitude(&mut self, readout: &AttitudeReadout);
    fn show_speed(&mut self, readout: &SpeedReadout);
}
