use chrono::{DateTime, Local, TimeZone, Utc};
use std::fmt::Display;

/// Marker substrings used to split extremes into high and low water
const HIGH_MARKER: &str = "HIGH";
const LOW_MARKER: &str = "LOW";

/// A local maximum or minimum of tide height
#[derive(Debug, Clone, PartialEq)]
pub struct TideExtreme {
    pub time: DateTime<Utc>,
    /// Height in metres relative to the requested datum
    pub height: f64,
    /// Provider state string, e.g. "HIGH TIDE"
    pub state: String,
}

impl TideExtreme {
    pub fn is_high(&self) -> bool {
        self.state.contains(HIGH_MARKER)
    }

    pub fn is_low(&self) -> bool {
        self.state.contains(LOW_MARKER)
    }

    /// Render as "{state} at {time}: {height} m" in the given timezone
    pub fn describe<Tz>(&self, tz: &Tz) -> String
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        format!(
            "{} at {}: {} m",
            self.state,
            format_time(&self.time, tz),
            self.height
        )
    }
}

/// Tide extremes for one location, with the high/low split
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TideReport {
    pub extremes: Vec<TideExtreme>,
}

impl TideReport {
    pub fn new(extremes: Vec<TideExtreme>) -> Self {
        Self { extremes }
    }

    pub fn is_empty(&self) -> bool {
        self.extremes.is_empty()
    }

    pub fn high(&self) -> Vec<&TideExtreme> {
        self.extremes.iter().filter(|e| e.is_high()).collect()
    }

    pub fn low(&self) -> Vec<&TideExtreme> {
        self.extremes.iter().filter(|e| e.is_low()).collect()
    }

    /// Highest extreme in the window, if any
    pub fn peak_height(&self) -> Option<f64> {
        self.extremes.iter().map(|e| e.height).reduce(f64::max)
    }

    /// One line per extreme in local time, or "No tide data"
    pub fn summary(&self) -> String {
        self.summary_in(&Local)
    }

    pub fn summary_in<Tz>(&self, tz: &Tz) -> String
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        if self.extremes.is_empty() {
            return "No tide data".to_string();
        }
        self.extremes
            .iter()
            .map(|e| e.describe(tz))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Format a UTC instant in `tz`, e.g. "May 01, 2024, 17:30:00 +07:00"
pub fn format_time<Tz>(time: &DateTime<Utc>, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    time.with_timezone(tz)
        .format("%b %d, %Y, %H:%M:%S %Z")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extreme(hour: u32, height: f64, state: &str) -> TideExtreme {
        TideExtreme {
            time: Utc.with_ymd_and_hms(2024, 5, 1, hour, 0, 0).unwrap(),
            height,
            state: state.to_string(),
        }
    }

    #[test]
    fn test_partition_by_state() {
        let report = TideReport::new(vec![
            extreme(3, 1.2, "HIGH TIDE"),
            extreme(9, -0.8, "LOW TIDE"),
            extreme(15, 1.1, "HIGH TIDE"),
        ]);

        assert_eq!(report.high().len(), 2);
        assert_eq!(report.low().len(), 1);
        assert_eq!(report.peak_height(), Some(1.2));
    }

    #[test]
    fn test_unknown_state_in_neither_list() {
        let report = TideReport::new(vec![extreme(3, 0.1, "SLACK")]);
        assert!(report.high().is_empty());
        assert!(report.low().is_empty());
    }

    #[test]
    fn test_empty_report() {
        let report = TideReport::default();
        assert!(report.high().is_empty());
        assert!(report.low().is_empty());
        assert_eq!(report.peak_height(), None);
        assert_eq!(report.summary(), "No tide data");
    }

    #[test]
    fn test_summary_lines() {
        let report = TideReport::new(vec![extreme(3, 1.25, "HIGH TIDE")]);
        assert_eq!(
            report.summary_in(&Utc),
            "HIGH TIDE at May 01, 2024, 03:00:00 UTC: 1.25 m"
        );
    }
}
