//! Console readout board.
//!
//! The telemetry loop writes the latest readouts here; the REPL renders them
//! on `/status` instead of printing every sample over the prompt.

use colored::Colorize;
use std::sync::{Arc, Mutex};
use tracing::trace;

use skylink_hal::{AttitudeReadout, SpeedReadout, TelemetryDisplay};

#[derive(Debug, Clone, Default)]
pub struct Board {
    pub attitude: Option<AttitudeReadout>,
    pub speed: Option<SpeedReadout>,
    pub updates: u64,
}

/// [`TelemetryDisplay`] that keeps the most recent readouts in a shared board.
#[derive(Debug, Clone, Default)]
pub struct ConsoleDisplay {
    board: Arc<Mutex<Board>>,
}

impl ConsoleDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Board {
        self.board.lock().map(|b| b.clone()).unwrap_or_default()
    }

    /// Multi-line rendering of the board for the REPL.
    pub fn render(&self) -> String {
        let board = self.snapshot();
        let dash = "---".dimmed().to_string();
        let (roll, pitch, yaw) = match &board.attitude {
            Some(a) => (a.roll_text.clone(), a.pitch_text.clone(), a.yaw_text.clone()),
            None => (dash.clone(), dash.clone(), dash.clone()),
        };
        let (hs, vs) = match &board.speed {
            Some(s) => (s.horizontal_text.clone(), s.vertical_text.clone()),
            None => (dash.clone(), dash),
        };
        format!(
            "  roll {}  pitch {}  yaw {}\n  hs {}  vs {}  ({} updates)",
            roll.bold(),
            pitch.bold(),
            yaw.bold(),
            hs.bold(),
            vs.bold(),
            board.updates
        )
    }

    fn update(&self, f: impl FnOnce(&mut Board)) {
        if let Ok(mut board) = self.board.lock() {
            f(&mut board);
            board.updates += 1;
        }
    }
}

impl TelemetryDisplay for ConsoleDisplay {
    fn show_attitude(&mut self, readout: &AttitudeReadout) {
        trace!(roll = %readout.roll_text, pitch = %readout.pitch_text, yaw = %readout.yaw_text, "attitude");
        self.update(|b| b.attitude = Some(readout.clone()));
    }

    fn show_speed(&mut self, readout: &SpeedReadout) {
        trace!(hs = %readout.horizontal_text, vs = %readout.vertical_text, "speed");
        self.update(|b| b.speed = Some(readout.clone()));
    }
}
