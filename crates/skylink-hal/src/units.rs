//! Speed unit conversion and formatting.

use skylink_types::SpeedUnit;

const MPS_TO_MPH: f64 = 2.236_936_292_054_402;

/// Converts a speed in the base unit (m/s) into display text.
pub trait SpeedFormatter: Send + Sync {
    fn format(&self, base_value: f64) -> String;
}

/// Metres per second, one decimal.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricSpeed;

impl SpeedFormatter for MetricSpeed {
    fn format(&self, base_value: f64) -> String {
        format!("{base_value:.1} m/s")
    }
}

/// Miles per hour, one decimal.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImperialSpeed;

impl SpeedFormatter for ImperialSpeed {
    fn format(&self, base_value: f64) -> String {
        format!("{:.1} mph", base_value * MPS_TO_MPH)
    }
}

/// Pick the formatter for a configured [`SpeedUnit`].
pub fn formatter_for(unit: SpeedUnit) -> Box<dyn SpeedFormatter> {
    match unit {
        SpeedUnit::Metric => Box::new(MetricSpeed),
        SpeedUnit::Imperial => Box::new(ImperialSpeed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metric_formatting() {
        assert_eq!(MetricSpeed.format(0.0), "0.0 m/s");
        assert_eq!(MetricSpeed.format(12.34), "12.3 m/s");
        assert_eq!(MetricSpeed.format(-1.24), "-1.2 m/s");
    }

    #[test]
    fn imperial_conversion() {
        assert_eq!(ImperialSpeed.format(0.0), "0.0 mph");
        assert_eq!(ImperialSpeed.format(10.0), "22.4 mph");
    }

    #[test]
    fn formatter_for_unit() {
        assert_eq!(formatter_for(SpeedUnit::Metric).format(1.0), "1.0 m/s");
        assert_eq!(formatter_for(SpeedUnit::Imperial).format(1.0), "2.2 mph");
    }
}
