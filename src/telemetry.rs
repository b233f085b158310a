// GeoTrack — Telemetry Aggregator
//
// Derived metrics over the persisted clock and the power monitor. Pure
// reads; nothing here mutates state. The energy model splits the device's
// lifetime into three mutually-exclusive regimes (awake with radio off,
// awake with radio on, deep sleep), each with a fixed calibrated draw.

use crate::config::{DRAW_ACTIVE_MA, DRAW_DEEP_SLEEP_MA, DRAW_POWER_ON_MA};
use crate::rtc::RtcData;

/// Cumulative awake time including the in-progress cycle.
pub fn active_time_sec(rtc: &RtcData, uptime_sec: u32) -> u32 {
    rtc.active_time_sec + uptime_sec
}

/// Cumulative radio-powered time including the in-progress cycle.
pub fn power_on_time_sec(rtc: &RtcData, is_power_on: bool, uptime_sec: u32) -> u32 {
    rtc.power_on_time_sec + if is_power_on { uptime_sec } else { 0 }
}

/// Total energy consumed since first power-on, in mAh.
pub fn power_consumption_mah(rtc: &RtcData, is_power_on: bool, uptime_sec: u32) -> f64 {
    let active = active_time_sec(rtc, uptime_sec) as f64;
    let power_on = power_on_time_sec(rtc, is_power_on, uptime_sec) as f64;
    (DRAW_ACTIVE_MA * (active - power_on)
        + DRAW_POWER_ON_MA * power_on
        + DRAW_DEEP_SLEEP_MA * rtc.deep_sleep_time_sec as f64)
        / 3600.0
}

/// Energy consumed while below the power-save threshold, in mAh. Deep sleep
/// only ever happens in the low-power regime, so all accumulated sleep time
/// counts here. Used to judge whether power saving is effective.
pub fn low_power_consumption_mah(rtc: &RtcData) -> f64 {
    let active = rtc.low_power_active_time_sec as f64;
    let power_on = rtc.low_power_power_on_time_sec as f64;
    (DRAW_ACTIVE_MA * (active - power_on)
        + DRAW_POWER_ON_MA * power_on
        + DRAW_DEEP_SLEEP_MA * rtc.deep_sleep_time_sec as f64)
        / 3600.0
}

/// Read-only view handed to the publisher and the web UI.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TelemetrySnapshot {
    pub voltage: f32,
    pub is_low_power: bool,
    pub active_time_sec: u32,
    pub power_on_time_sec: u32,
    pub deep_sleep_time_sec: u32,
    pub power_consumption_mah: f64,
    pub low_power_consumption_mah: f64,
    pub seconds_to_deep_sleep: i64,
}

impl TelemetrySnapshot {
    pub fn collect(
        rtc: &RtcData,
        voltage: f32,
        is_low_power: bool,
        is_power_on: bool,
        uptime_sec: u32,
        seconds_to_deep_sleep: i64,
    ) -> Self {
        Self {
            voltage,
            is_low_power,
            active_time_sec: active_time_sec(rtc, uptime_sec),
            power_on_time_sec: power_on_time_sec(rtc, is_power_on, uptime_sec),
            deep_sleep_time_sec: rtc.deep_sleep_time_sec,
            power_consumption_mah: power_consumption_mah(rtc, is_power_on, uptime_sec),
            low_power_consumption_mah: low_power_consumption_mah(rtc),
            seconds_to_deep_sleep,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consumption_formula() {
        // active 100 s, radio-powered 40 s, asleep 3600 s
        let rtc = RtcData {
            active_time_sec: 100,
            power_on_time_sec: 40,
            deep_sleep_time_sec: 3600,
            ..RtcData::default()
        };
        let expected = (70.0 * (100.0 - 40.0) + 140.0 * 40.0 + 0.407 * 3600.0) / 3600.0;
        let got = power_consumption_mah(&rtc, false, 0);
        assert!((got - expected).abs() < 1e-9, "{got} != {expected}");
    }

    #[test]
    fn in_progress_cycle_counts_toward_active_and_power_on() {
        let rtc = RtcData {
            active_time_sec: 100,
            power_on_time_sec: 40,
            ..RtcData::default()
        };
        assert_eq!(active_time_sec(&rtc, 25), 125);
        assert_eq!(power_on_time_sec(&rtc, true, 25), 65);
        assert_eq!(power_on_time_sec(&rtc, false, 25), 40);
    }

    #[test]
    fn low_power_variant_uses_low_power_accumulators() {
        let rtc = RtcData {
            active_time_sec: 5000,
            power_on_time_sec: 4000,
            low_power_active_time_sec: 100,
            low_power_power_on_time_sec: 40,
            deep_sleep_time_sec: 3600,
            ..RtcData::default()
        };
        let expected = (70.0 * 60.0 + 140.0 * 40.0 + 0.407 * 3600.0) / 3600.0;
        assert!((low_power_consumption_mah(&rtc) - expected).abs() < 1e-9);
    }

    #[test]
    fn snapshot_carries_countdown_through() {
        let snap = TelemetrySnapshot::collect(&RtcData::default(), 12.5, true, false, 3, -1);
        assert_eq!(snap.seconds_to_deep_sleep, -1);
        assert_eq!(snap.active_time_sec, 3);
        assert!(snap.is_low_power);
    }
}
