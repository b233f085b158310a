// GeoTrack — Power Monitor
//
// Samples the supply voltage, derives the low-power condition by threshold
// comparison, and books the time spent in the low-power regime into the
// persisted clock. Accumulation happens only on regime transitions, so the
// totals are exact regardless of how often the loop samples.

use crate::rtc::RtcData;

#[derive(Debug, Default)]
pub struct PowerMonitor {
    /// Most recent supply voltage sample, volts.
    pub voltage: f32,
    /// Voltage below the configured power-save threshold.
    pub is_low_power: bool,
    /// Modem/radio rail currently energized (driven by the orchestrator).
    pub is_power_on: bool,
    /// Lifetime stamp of the start of the current low-power window.
    low_power_start_sec: u32,
}

impl PowerMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the initial sample. Establishes the regime without booking any
    /// time; the window start is recorded in case we boot already low.
    pub fn begin(&mut self, volts: f32, threshold: f32, now_sec: u32) {
        self.voltage = volts;
        self.is_low_power = volts < threshold;
        self.low_power_start_sec = now_sec;
        log::debug!(
            "power monitor: {:.1} V, low power: {}",
            volts,
            self.is_low_power
        );
    }

    /// Re-read the voltage and book regime changes.
    ///
    /// Edge-triggered: a high→low crossing records the window start, a
    /// low→high crossing adds the elapsed window to the low-power
    /// accumulators (and to the power-on variant if the radio rail was up).
    /// Samples that stay in the same regime change nothing.
    pub fn sample(&mut self, volts: f32, threshold: f32, now_sec: u32, rtc: &mut RtcData) {
        let is_low_power = volts < threshold;
        self.voltage = volts;

        if self.is_low_power && !is_low_power {
            // Back to high power: close the window.
            let low_power_sec = now_sec.saturating_sub(self.low_power_start_sec);
            rtc.low_power_active_time_sec += low_power_sec;
            if self.is_power_on {
                rtc.low_power_power_on_time_sec += low_power_sec;
            }
            log::info!("change to high power ({volts:.1} V)");
        }
        if !self.is_low_power && is_low_power {
            self.low_power_start_sec = now_sec;
            log::info!("change to low power ({volts:.1} V)");
        }
        self.is_low_power = is_low_power;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const THRESHOLD: f32 = 15.0;

    #[test]
    fn level_samples_do_not_accumulate() {
        let mut rtc = RtcData::default();
        let mut mon = PowerMonitor::new();
        mon.begin(10.0, THRESHOLD, 0);
        for t in 1..100 {
            mon.sample(10.0, THRESHOLD, t, &mut rtc);
        }
        assert_eq!(rtc.low_power_active_time_sec, 0);
        assert_eq!(rtc.low_power_power_on_time_sec, 0);
    }

    #[test]
    fn low_to_high_edge_books_the_window() {
        let mut rtc = RtcData::default();
        let mut mon = PowerMonitor::new();
        mon.begin(16.0, THRESHOLD, 0);
        mon.sample(10.0, THRESHOLD, 5, &mut rtc); // high -> low
        mon.sample(10.0, THRESHOLD, 20, &mut rtc); // still low
        mon.sample(16.0, THRESHOLD, 35, &mut rtc); // low -> high
        assert_eq!(rtc.low_power_active_time_sec, 30);
        assert_eq!(rtc.low_power_power_on_time_sec, 0);
    }

    #[test]
    fn power_on_window_booked_separately() {
        let mut rtc = RtcData::default();
        let mut mon = PowerMonitor::new();
        mon.begin(16.0, THRESHOLD, 0);
        mon.is_power_on = true;
        mon.sample(14.9, THRESHOLD, 100, &mut rtc);
        mon.sample(15.1, THRESHOLD, 160, &mut rtc);
        assert_eq!(rtc.low_power_active_time_sec, 60);
        assert_eq!(rtc.low_power_power_on_time_sec, 60);
    }

    #[test]
    fn repeated_cycles_are_monotonic() {
        let mut rtc = RtcData::default();
        let mut mon = PowerMonitor::new();
        mon.begin(16.0, THRESHOLD, 0);
        let mut last = 0;
        let mut now = 0;
        for _ in 0..5 {
            now += 10;
            mon.sample(10.0, THRESHOLD, now, &mut rtc);
            now += 10;
            mon.sample(16.0, THRESHOLD, now, &mut rtc);
            assert!(rtc.low_power_active_time_sec >= last);
            last = rtc.low_power_active_time_sec;
        }
        assert_eq!(rtc.low_power_active_time_sec, 50);
    }
}
